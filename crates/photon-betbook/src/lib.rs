//! # Photon BetBook
//!
//! Per-`(agent, opHash)` bet accounting, first-bet/follow-bet reward
//! splitting, per-`(protocol, transmitter)` inactivity counting, and
//! timed-out bet forfeiture.

pub mod book;
pub mod error;
pub mod ports;
pub mod types;

pub use book::BetBook;
pub use error::BetBookError;
pub use ports::{OperationRegistryPort, ProtocolPort, StakingPort};
pub use types::{Bet, BetType, OpBetState};
