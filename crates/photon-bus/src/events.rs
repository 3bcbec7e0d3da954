//! The event enum that flows through the bus, and the topic filter used to
//! subscribe to a subset of it.
//!
//! Wraps each component crate's own typed event enum rather than
//! flattening them into one giant enum, so a subscriber pattern-matching
//! on `PhotonEvent::Operation(OperationEvent::ProposalApproved { .. })`
//! reads the same way the originating crate documents that event.

use photon_endpoint_emitter::EndpointEvent;
use photon_operation_registry::OperationEvent;
use photon_protocol_registry::ProtocolRegistryEvent;
use photon_staking::StakingEvent;
use photon_stream_consensus::StreamEvent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhotonEvent {
    Operation(OperationEvent),
    Staking(StakingEvent),
    ProtocolRegistry(ProtocolRegistryEvent),
    Stream(StreamEvent),
    Endpoint(EndpointEvent),
}

impl PhotonEvent {
    pub fn topic(&self) -> EventTopic {
        match self {
            PhotonEvent::Operation(_) => EventTopic::Operation,
            PhotonEvent::Staking(_) => EventTopic::Staking,
            PhotonEvent::ProtocolRegistry(_) => EventTopic::ProtocolRegistry,
            PhotonEvent::Stream(_) => EventTopic::Stream,
            PhotonEvent::Endpoint(_) => EventTopic::Endpoint,
        }
    }
}

impl From<OperationEvent> for PhotonEvent {
    fn from(e: OperationEvent) -> Self {
        PhotonEvent::Operation(e)
    }
}

impl From<StakingEvent> for PhotonEvent {
    fn from(e: StakingEvent) -> Self {
        PhotonEvent::Staking(e)
    }
}

impl From<ProtocolRegistryEvent> for PhotonEvent {
    fn from(e: ProtocolRegistryEvent) -> Self {
        PhotonEvent::ProtocolRegistry(e)
    }
}

impl From<StreamEvent> for PhotonEvent {
    fn from(e: StreamEvent) -> Self {
        PhotonEvent::Stream(e)
    }
}

impl From<EndpointEvent> for PhotonEvent {
    fn from(e: EndpointEvent) -> Self {
        PhotonEvent::Endpoint(e)
    }
}

/// Subsystem a [`PhotonEvent`] belongs to, for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTopic {
    Operation,
    Staking,
    ProtocolRegistry,
    Stream,
    Endpoint,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to a subset of [`PhotonEvent`]s.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
}

impl EventFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self { topics }
    }

    pub fn matches(&self, event: &PhotonEvent) -> bool {
        self.topics.is_empty() || self.topics.contains(&EventTopic::All) || self.topics.contains(&event.topic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use photon_types::{AgentId, ProtocolId};
    use primitive_types::U256;

    fn staking_event() -> PhotonEvent {
        PhotonEvent::Staking(StakingEvent::AgentRewardClaimed { agent: AgentId::ZERO, amount: U256::one() })
    }

    #[test]
    fn all_filter_matches_everything() {
        assert!(EventFilter::all().matches(&staking_event()));
    }

    #[test]
    fn topic_filter_excludes_other_topics() {
        let filter = EventFilter::topics(vec![EventTopic::ProtocolRegistry]);
        assert!(!filter.matches(&staking_event()));

        let event = PhotonEvent::ProtocolRegistry(ProtocolRegistryEvent::SetProtocolPause {
            protocol_id: ProtocolId::ZERO,
            paused: true,
        });
        assert!(filter.matches(&event));
    }
}
