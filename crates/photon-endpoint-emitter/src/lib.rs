//! # Photon Endpoint Emitter
//!
//! EndpointEmitter: the single choke point every
//! admin mutation across the hub funnels through on its way to a
//! destination-chain gov contract. `emit` encodes the typed
//! [`photon_types::GovMessage`] to its stable selector + opaque payload and
//! hands the bytes to a pluggable [`ports::EndpointTransport`] — modeled
//! only as a wire-protocol sink, per .

pub mod emitter;
pub mod encoding;
pub mod error;
pub mod events;
pub mod ports;

pub use emitter::EndpointEmitter;
pub use encoding::encode_gov_message;
pub use error::EndpointEmitterError;
pub use events::{EndpointEvent, EventSink, NullEventSink};
pub use ports::{EndpointTransport, RecordingTransport};
