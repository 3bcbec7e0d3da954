//! Published events: the protocol-registry
//! events not already covered by `photon-operation-registry::OperationEvent`.
//!
//! Like `photon-staking`, this crate's methods return plain values and the
//! hub wiring layer emits the matching event from a call's arguments and
//! result, keeping the registry itself free of sink plumbing.

use photon_types::{ChainId, OpaqueAddr, ProtocolId};
use primitive_types::U256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolRegistryEvent {
    AddAllowedProtocol { protocol_id: ProtocolId, owner: [u8; 20] },
    SetProtocolPause { protocol_id: ProtocolId, paused: bool },
    AddExecutor { protocol_id: ProtocolId, chain_id: ChainId, executor: OpaqueAddr },
    RemoveExecutor { protocol_id: ProtocolId, chain_id: ChainId, executor: OpaqueAddr },
    SetConsensusTargetRate { protocol_id: ProtocolId, rate: u32 },
    ManualTransmitterFeeCharged { protocol_id: ProtocolId, amount: U256 },
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: ProtocolRegistryEvent);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn emit(&self, _event: ProtocolRegistryEvent) {}
}
