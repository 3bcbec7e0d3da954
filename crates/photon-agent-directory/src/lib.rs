//! AgentDirectory.
//!
//! Owns only the agent↔transmitter mapping per protocol. Eligibility caps
//! are expressed in terms of personal stake, which lives in
//! `photon-staking`; callers pass the looked-up value in rather than this
//! crate depending on the staking crate, since nothing here needs to call
//! back into it.

use photon_types::{AgentId, ProtocolId, TransmitterId};
use primitive_types::U256;
use std::collections::HashMap;
use thiserror::Error;
use tracing::instrument;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AgentDirectoryError {
    #[error("zero transmitter address")]
    ZeroAddress,
    #[error("protocol id is zero, the gov protocol, or unknown")]
    InvalidProtocolId,
    #[error("transmitter is already mapped to a different agent")]
    DuplicateTransmitter,
    #[error("support already declared for this (agent, protocol)")]
    SupportAlreadyDeclared,
    #[error("no support declared for this (agent, protocol)")]
    SupportNotDeclared,
    #[error("transmitter count exceeds the personal-stake-derived cap")]
    TransmitterCapExceeded,
}

/// Agent↔transmitter mapping, keyed per protocol, plus the reverse index
/// and a per-agent transmitter count used to enforce the personal-stake cap.
#[derive(Default)]
pub struct AgentDirectory {
    support: HashMap<(AgentId, ProtocolId), TransmitterId>,
    agent_by_transmitter: HashMap<TransmitterId, AgentId>,
    transmitter_count: HashMap<AgentId, u32>,
}

impl AgentDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn agent_for_transmitter(&self, transmitter: &TransmitterId) -> Option<AgentId> {
        self.agent_by_transmitter.get(transmitter).copied()
    }

    pub fn transmitter_for(&self, agent: &AgentId, protocol_id: &ProtocolId) -> Option<TransmitterId> {
        self.support.get(&(*agent, *protocol_id)).copied()
    }

    /// All `(agent -> transmitter)` declarations currently on file for a
    /// protocol; feeds `StakingLedger::select_transmitters_for_protocol`.
    pub fn declared_for_protocol(&self, protocol_id: &ProtocolId) -> HashMap<AgentId, TransmitterId> {
        self.support
            .iter()
            .filter_map(|((agent, pid), transmitter)| {
                (pid == protocol_id).then_some((*agent, *transmitter))
            })
            .collect()
    }

    /// `declareProtocolSupport`: rejects a zero transmitter, a zero/gov/
    /// unknown protocol, a transmitter already claimed by another agent,
    /// a repeat declaration, or exceeding the personal-stake-derived cap
    /// (`stake_per_transmitter == 0` means uncapped).
    #[instrument(skip(self))]
    pub fn declare_protocol_support(
        &mut self,
        agent: AgentId,
        protocol_id: ProtocolId,
        transmitter: TransmitterId,
        protocol_known_and_not_gov: bool,
        personal_stake: U256,
        stake_per_transmitter: U256,
    ) -> Result<(), AgentDirectoryError> {
        if transmitter.is_zero() {
            return Err(AgentDirectoryError::ZeroAddress);
        }
        if protocol_id.is_zero() || !protocol_known_and_not_gov {
            return Err(AgentDirectoryError::InvalidProtocolId);
        }
        if self.support.contains_key(&(agent, protocol_id)) {
            return Err(AgentDirectoryError::SupportAlreadyDeclared);
        }
        if let Some(existing) = self.agent_by_transmitter.get(&transmitter) {
            if *existing != agent {
                return Err(AgentDirectoryError::DuplicateTransmitter);
            }
        }

        let count = *self.transmitter_count.get(&agent).unwrap_or(&0);
        if !stake_per_transmitter.is_zero() {
            let cap = (personal_stake / stake_per_transmitter).as_u32();
            if count >= cap {
                return Err(AgentDirectoryError::TransmitterCapExceeded);
            }
        }

        self.support.insert((agent, protocol_id), transmitter);
        self.agent_by_transmitter.insert(transmitter, agent);
        self.transmitter_count.insert(agent, count + 1);
        Ok(())
    }

    /// `revokeProtocolSupport`. Captures the transmitter before clearing
    /// the forward mapping, then clears the reverse index from the
    /// captured value — clearing forward first and reading it back would
    /// hand the reverse-index clear a zeroed key.
    #[instrument(skip(self))]
    pub fn revoke_protocol_support(
        &mut self,
        agent: AgentId,
        protocol_id: ProtocolId,
    ) -> Result<TransmitterId, AgentDirectoryError> {
        let transmitter = self
            .support
            .remove(&(agent, protocol_id))
            .ok_or(AgentDirectoryError::SupportNotDeclared)?;
        self.agent_by_transmitter.remove(&transmitter);
        if let Some(count) = self.transmitter_count.get_mut(&agent) {
            *count = count.saturating_sub(1);
        }
        Ok(transmitter)
    }

    /// Removes every support declaration the agent holds across the given
    /// protocols (`banAgent`'s "walks protocols and removes agent's
    /// transmitter from each"). Returns the `(protocol, transmitter)`
    /// pairs removed so the caller can also evict them from
    /// `OperationRegistry`'s transmitter sets.
    #[instrument(skip(self, protocols))]
    pub fn ban_agent(
        &mut self,
        agent: AgentId,
        protocols: &[ProtocolId],
    ) -> Vec<(ProtocolId, TransmitterId)> {
        let mut removed = Vec::new();
        for protocol_id in protocols {
            if let Ok(transmitter) = self.revoke_protocol_support(agent, *protocol_id) {
                removed.push((*protocol_id, transmitter));
            }
        }
        self.transmitter_count.remove(&agent);
        removed
    }
}
