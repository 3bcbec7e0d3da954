//! # Photon Bus
//!
//! In-process fan-out for every component's published events, so metrics,
//! logging, and any future notification surface can subscribe without the
//! hub's core crates knowing who's listening.

pub mod events;
pub mod publisher;
pub mod sinks;
pub mod subscriber;

pub use events::{EventFilter, EventTopic, PhotonEvent};
pub use publisher::{InMemoryEventBus, DEFAULT_CHANNEL_CAPACITY};
pub use sinks::BusSink;
pub use subscriber::{Subscription, SubscriptionError};
