//! Published events: the staking events.
//!
//! `StakingLedger`'s methods return plain values (claimed reward, released
//! amount, ...) rather than taking an injected sink directly, so that the
//! ledger stays a pure bookkeeping object usable from tests without any
//! event-plumbing boilerplate. The hub wiring layer constructs one of these
//! from a call's arguments and return value and emits it through
//! `photon-bus`; see `photon-hub`'s staking adapter.

use photon_types::{AgentId, DelegatorId};
use primitive_types::U256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StakingEvent {
    Delegate { delegator: DelegatorId, agent: AgentId, amount: U256 },
    Withdraw { delegator: DelegatorId, agent: AgentId, amount: U256 },
    Redelegate { delegator: DelegatorId, from: AgentId, to: AgentId, amount: U256 },
    RewardClaimed { delegator: DelegatorId, agent: AgentId, amount: U256 },
    AgentRewardClaimed { agent: AgentId, amount: U256 },
    UpdateFee { agent: AgentId, fee: u32 },
    DepositPersonalStake { agent: AgentId, amount: U256 },
    RequestWithdrawPersonalStake { agent: AgentId, amount: U256 },
    /// A dedicated cancel event, distinct from `RequestWithdrawPersonalStake`.
    CancelWithdrawPersonalStake { agent: AgentId, amount: U256 },
    /// Carries the amount actually withdrawn, captured before the ledger
    /// field is zeroed.
    WithdrawPersonalStake { agent: AgentId, amount: U256 },
    Slashed { agent: AgentId, amount: U256 },
}

/// Where published staking events go.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: StakingEvent);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn emit(&self, _event: StakingEvent) {}
}
