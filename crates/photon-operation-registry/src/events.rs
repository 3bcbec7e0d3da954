//! Published events. Kept as a typed
//! enum dispatched through an injected sink rather than a process-wide bus
//! reference, mirroring the crypto facade's "no singletons" stance.

use photon_types::{ChainId, OpHash, ProtocolId, TransmitterId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationEvent {
    NewOperation { protocol_id: ProtocolId, op_hash: OpHash },
    NewProof { protocol_id: ProtocolId, op_hash: OpHash, transmitter: TransmitterId },
    ProposalApproved { protocol_id: ProtocolId, op_hash: OpHash, approve_block: u64 },
    ProposalExecuted { protocol_id: ProtocolId, op_hash: OpHash },
    AddAllowedProtocolAddress { protocol_id: ProtocolId, chain_id: ChainId },
    RemoveAllowedProtocolAddress { protocol_id: ProtocolId, chain_id: ChainId },
    AddAllowedProposerAddress { protocol_id: ProtocolId, chain_id: ChainId },
    RemoveAllowedProposerAddress { protocol_id: ProtocolId, chain_id: ChainId },
    UpdateTransmitters { protocol_id: ProtocolId },
    RemoveTransmitter { protocol_id: ProtocolId, transmitter: TransmitterId },
}

/// Where published events go. The hub wiring is free to fan this out to
/// `photon-bus` subscribers, a metrics counter, or both.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: OperationEvent);
}

/// Discards every event. Useful as a default in tests that don't assert on
/// the event stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn emit(&self, _event: OperationEvent) {}
}
