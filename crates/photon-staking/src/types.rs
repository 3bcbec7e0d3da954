//! Entity shapes for the delegator↔agent DPoS ledger.

use photon_types::RoundId;
use primitive_types::U256;
use std::collections::HashMap;

/// Snapshot taken at a round turn: `totalDelegate` freezes every delegator's
/// share of that round's reward at their round-start stake.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reward {
    pub agent_reward: U256,
    pub delegate_reward: U256,
    pub total_delegate: U256,
    pub slashed: bool,
}

#[derive(Debug, Clone)]
pub struct DelegatorStake {
    pub stake: U256,
    pub last_stake_unstake_round: RoundId,
    pub last_claim_round: RoundId,
}

impl DelegatorStake {
    pub fn new(round: RoundId) -> Self {
        Self {
            stake: U256::zero(),
            last_stake_unstake_round: round,
            last_claim_round: round,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AgentInfo {
    pub approved: bool,
    pub realtime_stake: U256,
    pub active_round_stake: U256,
    /// Scaled /10000.
    pub realtime_fee: u32,
    pub active_fee: u32,
    pub personal_stake: U256,
    pub locked_personal_stake: U256,
    pub withdraw_requested_amount: U256,
    pub withdraw_ready_amount: U256,
    pub last_claim_round: RoundId,
    pub last_slash_round: RoundId,
    pub rewards: HashMap<RoundId, Reward>,
    pub delegators: HashMap<photon_types::DelegatorId, DelegatorStake>,
}

impl AgentInfo {
    pub fn new(round: RoundId, fee: u32) -> Self {
        Self {
            approved: true,
            realtime_stake: U256::zero(),
            active_round_stake: U256::zero(),
            realtime_fee: fee,
            active_fee: fee,
            personal_stake: U256::zero(),
            locked_personal_stake: U256::zero(),
            withdraw_requested_amount: U256::zero(),
            withdraw_ready_amount: U256::zero(),
            last_claim_round: round,
            last_slash_round: 0,
            rewards: HashMap::new(),
            delegators: HashMap::new(),
        }
    }
}
