pub mod error;
pub mod events;
pub mod registry;
pub mod types;

pub use error::ProtocolRegistryError;
pub use events::{EventSink, NullEventSink, ProtocolRegistryEvent};
pub use registry::ProtocolRegistry;
pub use types::{PendingAction, ProtocolInfo, ProtocolParams};
