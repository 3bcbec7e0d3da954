//! # Photon Round Coordinator
//!
//! RoundCoordinator: drives the hub's per-round
//! `turnRound` sequence across every component that snapshots
//! realtime→active state at a round boundary, gated by a minimum interval.

pub mod coordinator;
pub mod error;

pub use coordinator::RoundCoordinator;
pub use error::RoundCoordinatorError;
