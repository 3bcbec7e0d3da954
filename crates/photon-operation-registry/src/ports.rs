//! Outbound dependencies.
//! Concrete adapters are assembled by whoever wires the hub together.

use crate::error::OperationRegistryError;
use photon_betbook::BetType;
use photon_types::{ChainId, OpHash, OpaqueAddr, ProtocolId, TransmitterId};
use std::sync::atomic::{AtomicU64, Ordering};

/// This crate's view of `ProtocolRegistry` + `AgentDirectory`: which
/// transmitters a protocol currently allows, consensus parameters, and the
/// gov-contract address on a given destination chain.
pub trait ProtocolPort: Send + Sync {
    fn is_gov(&self, protocol_id: ProtocolId) -> bool;
    fn is_transmitter_allowed(&self, protocol_id: ProtocolId, transmitter: TransmitterId) -> bool;
    fn current_transmitters(&self, protocol_id: ProtocolId) -> Vec<TransmitterId>;
    fn consensus_target_rate(&self, protocol_id: ProtocolId) -> u32;
    fn gov_address(&self, dest_chain_id: ChainId) -> Option<OpaqueAddr>;
}

/// This crate's view of `BetBook`, exercised under the `BET_MANAGER`
/// capability at the adapter.
pub trait BetBookPort: Send + Sync {
    fn place_bet(
        &self,
        protocol_id: ProtocolId,
        transmitter: TransmitterId,
        bet_type: BetType,
        op_hash: OpHash,
    ) -> Result<(), OperationRegistryError>;
    fn refund_bet(&self, protocol_id: ProtocolId, op_hash: OpHash, transmitter: TransmitterId);
    fn release_bets_and_reward(&self, protocol_id: ProtocolId, winners: &[TransmitterId], op_hash: OpHash);
}

/// This crate's view of `EndpointEmitter`:
/// dispatch a typed governance message to a destination chain's gov
/// contract.
pub trait EndpointPort: Send + Sync {
    fn emit(&self, gov_protocol_id: ProtocolId, chain_id: ChainId, dest_gov_address: OpaqueAddr, message: photon_types::GovMessage);
}

/// Stand-in for "block + index on-chain": in this
/// reimplementation, ordering comes from an input queue rather than a
/// chain, so `approveBlock`/`currentBlock` comparisons use a monotonic
/// call-sequence counter supplied through this port instead.
pub trait BlockSource: Send + Sync {
    fn current_block(&self) -> u64;
}

/// Production block source: a process-local monotonic counter, bumped once
/// per external entry point by the hub's dispatcher.
#[derive(Debug, Default)]
pub struct CallSequence(AtomicU64);

impl CallSequence {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn advance(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl BlockSource for CallSequence {
    fn current_block(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Deterministic block source for tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedBlockSource(pub u64);

impl BlockSource for FixedBlockSource {
    fn current_block(&self) -> u64 {
        self.0
    }
}
