//! # Photon Stream Consensus
//!
//! Per-`(protocol, source, key)` data vote tallying with deterministic
//! finalization and Merkle-root snapshotting over finalized keys.

pub mod consensus;
pub mod error;
pub mod events;
pub mod ports;
pub mod spotter;
pub mod types;

pub use consensus::StreamConsensus;
pub use error::StreamConsensusError;
pub use events::{EventSink, NullEventSink, StreamEvent};
pub use ports::{BetBookPort, MajorityProcessingLib, ProcessingLib, ProtocolPort};
pub use spotter::MasterStreamDataSpotter;
pub use types::{AgentVote, DataKey, FinalizeOutcome, FinalizedDatum, SourceId, StreamAsset};
