//! Publishing side of the event bus.
//!
//! Trimmed to a single synchronous process: cross-process deployments
//! guard against replayed messages with a nonce cache and an async publish
//! path, but the hub is one process calling these methods directly, so
//! there is no replay surface and no need for the event send itself to be
//! async — `publish` is a plain synchronous call onto `tokio::sync::broadcast`.

use crate::events::{EventFilter, PhotonEvent};
use crate::subscriber::Subscription;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// In-process event bus. Multi-producer/multi-consumer via
/// `tokio::sync::broadcast`; suitable for a single node, which is this
/// hub's entire deployment model.
pub struct InMemoryEventBus {
    sender: broadcast::Sender<PhotonEvent>,
    subscriptions: Arc<Mutex<HashMap<String, usize>>>,
    events_published: AtomicU64,
    capacity: usize,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            subscriptions: Arc::new(Mutex::new(HashMap::new())),
            events_published: AtomicU64::new(0),
            capacity,
        }
    }

    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        let receiver = self.sender.subscribe();
        let topic_key = format!("{:?}", filter.topics);
        *self.subscriptions.lock().entry(topic_key.clone()).or_insert(0) += 1;
        debug!(topics = ?filter.topics, "new bus subscription");
        Subscription::new(receiver, filter, self.subscriptions.clone(), topic_key)
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Publish an event; returns the number of subscribers it reached.
    /// A `PhotonEvent` dropped with zero receivers is expected during
    /// startup before subscribers attach, not an error.
    pub fn publish(&self, event: impl Into<PhotonEvent>) -> usize {
        let event = event.into();
        let topic = event.topic();
        self.events_published.fetch_add(1, Ordering::Relaxed);
        match self.sender.send(event) {
            Ok(receivers) => {
                debug!(?topic, receivers, "event published");
                receivers
            }
            Err(_) => {
                warn!(?topic, "event dropped: no receivers");
                0
            }
        }
    }

    pub fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventTopic;
    use photon_staking::StakingEvent;
    use photon_types::AgentId;
    use primitive_types::U256;

    fn sample_event() -> StakingEvent {
        StakingEvent::AgentRewardClaimed { agent: AgentId::ZERO, amount: U256::one() }
    }

    #[test]
    fn publish_with_no_subscribers_returns_zero() {
        let bus = InMemoryEventBus::new();
        assert_eq!(bus.publish(sample_event()), 0);
        assert_eq!(bus.events_published(), 1);
    }

    #[tokio::test]
    async fn publish_reaches_matching_subscriber() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(EventFilter::topics(vec![EventTopic::Staking]));
        assert_eq!(bus.publish(sample_event()), 1);
        let received = sub.recv().await.expect("event");
        assert_eq!(received.topic(), EventTopic::Staking);
    }

    #[tokio::test]
    async fn subscription_drop_releases_count() {
        let bus = InMemoryEventBus::new();
        {
            let _sub = bus.subscribe(EventFilter::all());
            assert_eq!(bus.subscriber_count(), 1);
        }
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn custom_capacity_is_reported() {
        assert_eq!(InMemoryEventBus::with_capacity(64).capacity(), 64);
    }
}
