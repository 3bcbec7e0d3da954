//! BetBook.

use crate::error::BetBookError as Error;
use crate::ports::{OperationRegistryPort, ProtocolPort, StakingPort};
use crate::types::{Bet, BetType, OpBetState};
use photon_types::{AgentId, BetManager, Capability, Clock, OpHash, Pruner, ProtocolId, TransmitterId};
use primitive_types::U256;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Per-(agent, opHash) bet ledger, first-bet tracking, per-(protocol,
/// transmitter) inactivity counters, and the queue of realized rewards
/// `RoundCoordinator` drains into `StakingLedger::distribute_rewards`
/// before each round turn.
pub struct BetBook {
    staking: Arc<dyn StakingPort>,
    protocol: Arc<dyn ProtocolPort>,
    op_registry: Arc<dyn OperationRegistryPort>,
    clock: Arc<dyn Clock>,

    bets: HashMap<(AgentId, OpHash), Bet>,
    op_state: HashMap<OpHash, OpBetState>,
    inactivity: HashMap<(ProtocolId, TransmitterId), u32>,
    pending_rewards: Vec<(AgentId, U256)>,
}

impl BetBook {
    pub fn new(
        staking: Arc<dyn StakingPort>,
        protocol: Arc<dyn ProtocolPort>,
        op_registry: Arc<dyn OperationRegistryPort>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            staking,
            protocol,
            op_registry,
            clock,
            bets: HashMap::new(),
            op_state: HashMap::new(),
            inactivity: HashMap::new(),
            pending_rewards: Vec::new(),
        }
    }

    pub fn bet(&self, agent: &AgentId, op_hash: &OpHash) -> Option<&Bet> {
        self.bets.get(&(*agent, *op_hash))
    }

    pub fn op_state(&self, op_hash: &OpHash) -> Option<&OpBetState> {
        self.op_state.get(op_hash)
    }

    pub fn inactivity_count(&self, protocol_id: ProtocolId, transmitter: TransmitterId) -> u32 {
        self.inactivity.get(&(protocol_id, transmitter)).copied().unwrap_or(0)
    }

    /// Rewards realized by `release_bets_and_reward` since the last drain;
    /// consumed by `RoundCoordinator` just before `StakingLedger::distribute_rewards`.
    pub fn drain_pending_rewards(&mut self) -> Vec<(AgentId, U256)> {
        std::mem::take(&mut self.pending_rewards)
    }

    /// `placeBet(protocolId, transmitter, betType, opHash)`.
    #[instrument(skip(self, _cap))]
    pub fn place_bet(
        &mut self,
        _cap: Capability<BetManager>,
        protocol_id: ProtocolId,
        transmitter: TransmitterId,
        bet_type: BetType,
        op_hash: OpHash,
    ) -> Result<(), Error> {
        if self.protocol.is_paused(protocol_id) {
            return Err(Error::ProtocolPaused);
        }

        if !self.op_state.contains_key(&op_hash) {
            let snapshot = self.protocol.current_transmitters(protocol_id).into_iter().collect();
            self.op_state
                .insert(op_hash, OpBetState::new(bet_type, transmitter, snapshot));
        } else {
            let state = self.op_state.get(&op_hash).expect("checked above");
            if state.bet_type != bet_type {
                return Err(Error::BetTypeMismatch);
            }
        }

        if self.protocol.is_manual_transmitter(protocol_id, transmitter) {
            return Ok(());
        }

        let agent = self
            .protocol
            .agent_for_transmitter(transmitter)
            .ok_or(Error::AgentNotFound)?;
        let amount = self.protocol.bet_amount(protocol_id, bet_type);

        let bet = self.bets.entry((agent, op_hash)).or_default();
        if bet.amount.is_zero() {
            bet.timestamp = self.clock.now_unix();
        }
        bet.amount += amount;

        self.staking
            .lock_agent_stake(agent, amount)
            .map_err(|_| Error::InsufficientPersonalStake)?;
        Ok(())
    }

    /// `releaseBetsAndReward(protocolId, winnerTransmitters, opHash)`.
    #[instrument(skip(self, _cap, winners))]
    pub fn release_bets_and_reward(
        &mut self,
        _cap: Capability<BetManager>,
        protocol_id: ProtocolId,
        winners: &[TransmitterId],
        op_hash: OpHash,
        slashing_border: u32,
    ) -> Result<(), Error> {
        let bet_type = self.op_state.get(&op_hash).ok_or(Error::NoOpState)?.bet_type;
        let first_bet = self.op_state.get(&op_hash).ok_or(Error::NoOpState)?.first_bet;

        for winner in winners {
            if self.protocol.is_manual_transmitter(protocol_id, *winner) {
                if let Some(state) = self.op_state.get_mut(&op_hash) {
                    state.cur_transmitters.remove(winner);
                }
                continue;
            }
            let Some(agent) = self.protocol.agent_for_transmitter(*winner) else {
                continue;
            };
            let Some(bet) = self.bets.get(&(agent, op_hash)).cloned() else {
                continue;
            };
            if bet.amount.is_zero() {
                continue;
            }

            let is_first = *winner == first_bet;
            let reward = self.protocol.reward_amount(protocol_id, bet_type, is_first);
            if self.protocol.deduce_fee(protocol_id, reward) {
                self.pending_rewards.push((agent, reward));
            } else {
                warn!(?protocol_id, ?winner, "reward skipped: protocol paused mid-release");
            }

            self.staking
                .unlock_agent_stake(agent, bet.amount)
                .map_err(|_| Error::UnlockTooMuch)?;
            self.bets.remove(&(agent, op_hash));
            self.inactivity.insert((protocol_id, *winner), 0);
            if let Some(state) = self.op_state.get_mut(&op_hash) {
                state.cur_transmitters.remove(winner);
            }
        }

        if let Some(state) = self.op_state.get_mut(&op_hash) {
            state.processed_timestamp = Some(self.clock.now_unix());
        }

        let missed: Vec<TransmitterId> = self
            .op_state
            .get(&op_hash)
            .map(|s| s.cur_transmitters.iter().copied().collect())
            .unwrap_or_default();
        for transmitter in missed {
            if transmitter.is_zero() || self.protocol.is_manual_transmitter(protocol_id, transmitter) {
                continue;
            }
            let count = self.inactivity.entry((protocol_id, transmitter)).or_insert(0);
            *count += 1;
            if *count >= slashing_border {
                let Some(agent) = self.protocol.agent_for_transmitter(transmitter) else {
                    continue;
                };
                let min_personal = self.protocol.min_personal_amount(protocol_id);
                let _ = self.staking.slash(agent, min_personal);
                self.op_registry.remove_transmitter(protocol_id, transmitter);
                info!(?protocol_id, ?transmitter, "slashed for inactivity");
                self.inactivity.insert((protocol_id, transmitter), 0);
            }
        }

        if !self.protocol.is_gov(protocol_id) {
            let fee = self.protocol.protocol_fee(protocol_id);
            if !fee.is_zero() && self.protocol.deduce_fee(protocol_id, fee) {
                self.protocol.credit_system_fee(fee);
            }
        }
        Ok(())
    }

    /// `refundBet(protocolId, opHash, transmitter)`: unlock without reward,
    /// called when a round rotation evicts a transmitter from the proof set.
    #[instrument(skip(self, _cap))]
    pub fn refund_bet(
        &mut self,
        _cap: Capability<BetManager>,
        protocol_id: ProtocolId,
        op_hash: OpHash,
        transmitter: TransmitterId,
    ) -> Result<(), Error> {
        if self.protocol.is_manual_transmitter(protocol_id, transmitter) {
            return Ok(());
        }
        let Some(agent) = self.protocol.agent_for_transmitter(transmitter) else {
            return Ok(());
        };
        if let Some(bet) = self.bets.remove(&(agent, op_hash)) {
            if !bet.amount.is_zero() {
                self.staking
                    .unlock_agent_stake(agent, bet.amount)
                    .map_err(|_| Error::UnlockTooMuch)?;
            }
        }
        Ok(())
    }

    /// `pruneBet(agent, opHash)`: only once `betTimeout` has elapsed since
    /// the bet's timestamp; forfeits the locked amount to the system fee.
    #[instrument(skip(self, _cap))]
    pub fn prune_bet(
        &mut self,
        _cap: Capability<Pruner>,
        agent: AgentId,
        op_hash: OpHash,
        bet_timeout_secs: u64,
    ) -> Result<(), Error> {
        let bet = self.bets.get(&(agent, op_hash)).ok_or(Error::NoBetRecorded)?;
        let now = self.clock.now_unix();
        if now.saturating_sub(bet.timestamp) < bet_timeout_secs {
            return Err(Error::TimeoutNotElapsed);
        }
        let amount = bet.amount;
        self.bets.remove(&(agent, op_hash));
        self.staking
            .forfeit_locked(agent, amount)
            .map_err(|_| Error::InsufficientPersonalStake)?;
        Ok(())
    }
}
