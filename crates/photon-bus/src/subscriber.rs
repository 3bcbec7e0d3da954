//! Subscription side of the event bus.

use crate::events::{EventFilter, PhotonEvent};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    #[error("event bus closed")]
    Closed,
}

/// A subscription handle for receiving events. Dropping it releases the
/// subscriber-count entry it holds.
pub struct Subscription {
    receiver: broadcast::Receiver<PhotonEvent>,
    filter: EventFilter,
    subscriptions: Arc<Mutex<HashMap<String, usize>>>,
    topic_key: String,
}

impl Subscription {
    pub(crate) fn new(
        receiver: broadcast::Receiver<PhotonEvent>,
        filter: EventFilter,
        subscriptions: Arc<Mutex<HashMap<String, usize>>>,
        topic_key: String,
    ) -> Self {
        Self { receiver, filter, subscriptions, topic_key }
    }

    /// Receive the next event that matches this subscription's filter.
    /// Returns `None` once the bus has no more senders.
    pub async fn recv(&mut self) -> Option<PhotonEvent> {
        loop {
            let event = match self.receiver.recv().await {
                Ok(e) => e,
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    debug!(lagged = count, "subscriber lagged, some events dropped");
                    continue;
                }
            };
            if self.filter.matches(&event) {
                return Some(event);
            }
        }
    }

    /// Non-blocking receive.
    pub fn try_recv(&mut self) -> Result<Option<PhotonEvent>, SubscriptionError> {
        loop {
            let event = match self.receiver.try_recv() {
                Ok(e) => e,
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => return Err(SubscriptionError::Closed),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            };
            if self.filter.matches(&event) {
                return Ok(Some(event));
            }
        }
    }

    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut subs = self.subscriptions.lock();
        let Some(count) = subs.get_mut(&self.topic_key) else {
            return;
        };
        *count = count.saturating_sub(1);
        if *count == 0 {
            subs.remove(&self.topic_key);
        }
    }
}
