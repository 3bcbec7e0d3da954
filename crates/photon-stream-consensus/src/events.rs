//! Published events: the stream events.

use crate::types::{DataKey, SourceId};
use photon_types::ProtocolId;
use primitive_types::U256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    NewStreamDataSpotter { protocol_id: ProtocolId, source_id: SourceId },
    DataFinalized { protocol_id: ProtocolId, source_id: SourceId, data_key: DataKey },
    NewMerkleRoot { protocol_id: ProtocolId, source_id: SourceId, root: [u8; 32] },
    ConsensusReadyToFinalize { protocol_id: ProtocolId, source_id: SourceId, data_key: DataKey },
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: StreamEvent);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn emit(&self, _event: StreamEvent) {}
}
