//! Adapters implementing each component crate's own `EventSink` trait on
//! top of a shared [`InMemoryEventBus`], so the hub wires one bus and hands
//! out a differently-typed sink per crate without those crates depending on
//! `photon-bus` themselves.

use crate::publisher::InMemoryEventBus;
use std::sync::Arc;

/// Wraps a bus and republishes whatever event type is handed to `emit`,
/// via that event's `Into<PhotonEvent>` conversion.
pub struct BusSink(pub Arc<InMemoryEventBus>);

impl photon_operation_registry::EventSink for BusSink {
    fn emit(&self, event: photon_operation_registry::OperationEvent) {
        self.0.publish(event);
    }
}

impl photon_staking::EventSink for BusSink {
    fn emit(&self, event: photon_staking::StakingEvent) {
        self.0.publish(event);
    }
}

impl photon_protocol_registry::EventSink for BusSink {
    fn emit(&self, event: photon_protocol_registry::ProtocolRegistryEvent) {
        self.0.publish(event);
    }
}

impl photon_stream_consensus::EventSink for BusSink {
    fn emit(&self, event: photon_stream_consensus::StreamEvent) {
        self.0.publish(event);
    }
}

impl photon_endpoint_emitter::EventSink for BusSink {
    fn emit(&self, event: photon_endpoint_emitter::EndpointEvent) {
        self.0.publish(event);
    }
}
