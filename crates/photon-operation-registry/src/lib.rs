//! # Photon OperationRegistry
//!
//! The central cross-chain object: operation
//! ingestion, proof-threshold approval, round-aware proof rotation,
//! watcher execution confirmation, in-order nonce tracking, and the
//! per-`(protocol, chain)` admission state machine that drives outbound
//! governance through `photon-endpoint-emitter`.

pub mod error;
pub mod events;
pub mod ports;
pub mod registry;
pub mod types;

pub use error::OperationRegistryError;
pub use events::{EventSink, NullEventSink, OperationEvent};
pub use ports::{BetBookPort, BlockSource, CallSequence, EndpointPort, FixedBlockSource, ProtocolPort};
pub use registry::OperationRegistry;
pub use types::{InitState, Operation, PendingAdmission};
