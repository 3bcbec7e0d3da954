//! # Photon Staking
//!
//! The delegator↔agent DPoS ledger
//! plus the transmitter-election method described separately as C10
//! but implemented here, since election is
//! deterministic given this crate's sorted directory and per-agent
//! eligibility state.
//!
//! All rates are integers scaled so that `10000 == 100%`.

pub mod error;
pub mod events;
pub mod ledger;
pub mod types;

pub use error::StakingError;
pub use events::{EventSink, NullEventSink, StakingEvent};
pub use ledger::StakingLedger;
pub use types::{AgentInfo, DelegatorStake, Reward};
