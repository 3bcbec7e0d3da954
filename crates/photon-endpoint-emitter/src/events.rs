//! Published events. Mirrors the
//! typed-enum/`EventSink` convention established in
//! `photon_operation_registry::events`.

use photon_types::{ChainId, OpaqueAddr, ProtocolId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointEvent {
    GovMessageEmitted {
        protocol_id: ProtocolId,
        chain_id: ChainId,
        dest_gov_address: OpaqueAddr,
        selector: [u8; 4],
    },
}

/// Where published events go. The hub wiring is free to fan this out to
/// `photon-bus` subscribers, a metrics counter, or both.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: EndpointEvent);
}

/// Discards every event. Useful as a default in tests that don't assert on
/// the event stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn emit(&self, _event: EndpointEvent) {}
}
