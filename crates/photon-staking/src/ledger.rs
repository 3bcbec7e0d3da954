//! StakingLedger + the transmitter-election method
//! described as C10 in .

use crate::error::StakingError;
use crate::types::{AgentInfo, DelegatorStake, Reward};
use photon_ordered_list::{Order, OrderedList};
use photon_types::{AbManager, Capability, RoundManager, RoundId, RATE_SCALE};
use photon_types::{AgentId, DelegatorId, TransmitterId};
use primitive_types::U256;
use std::collections::{HashMap, HashSet};
use tracing::{debug, instrument};

fn agent_key(agent: &AgentId) -> Vec<u8> {
    agent.0.to_vec()
}

/// The delegator↔agent DPoS ledger. Round 1 is the first round; round 0 is
/// never observed by callers.
pub struct StakingLedger {
    current_round: RoundId,
    agents: HashMap<AgentId, AgentInfo>,
    /// Sorted descending by `realtime_stake`; back-reference for
    /// [`select_transmitters_for_protocol`](Self::select_transmitters_for_protocol).
    directory: OrderedList<Vec<u8>>,
    /// Fee collected from slashes and reward skims; drained by the caller.
    accumulated_fee: U256,
}

impl Default for StakingLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl StakingLedger {
    pub fn new() -> Self {
        let mut directory = OrderedList::new();
        directory.init(Order::Descending);
        Self {
            current_round: 1,
            agents: HashMap::new(),
            directory,
            accumulated_fee: U256::zero(),
        }
    }

    pub fn current_round(&self) -> RoundId {
        self.current_round
    }

    pub fn accumulated_fee(&self) -> U256 {
        self.accumulated_fee
    }

    pub fn drain_accumulated_fee(&mut self) -> U256 {
        std::mem::take(&mut self.accumulated_fee)
    }

    /// Credits an externally-collected system fee straight into the
    /// accumulated pool (e.g. `BetBook::ProtocolPort::credit_system_fee`),
    /// without touching any agent's stake.
    pub fn credit_fee(&mut self, amount: U256) {
        self.accumulated_fee += amount;
    }

    pub fn agent(&self, agent: &AgentId) -> Option<&AgentInfo> {
        self.agents.get(agent)
    }

    /// Admit a new staking-eligible agent. Idempotent on an already-known
    /// agent (returns the existing record rather than resetting it).
    pub fn admit_agent(&mut self, agent: AgentId, fee: u32) -> Result<(), StakingError> {
        if fee as u64 > RATE_SCALE as u64 {
            return Err(StakingError::InvalidFeeRate);
        }
        self.agents
            .entry(agent)
            .or_insert_with(|| AgentInfo::new(self.current_round, fee));
        Ok(())
    }

    fn agent_mut(&mut self, agent: &AgentId) -> Result<&mut AgentInfo, StakingError> {
        self.agents.get_mut(agent).ok_or(StakingError::AgentNotFound)
    }

    pub fn set_approved(&mut self, agent: &AgentId, approved: bool) -> Result<(), StakingError> {
        self.agent_mut(agent)?.approved = approved;
        Ok(())
    }

    pub fn set_fee(&mut self, agent: &AgentId, fee: u32) -> Result<(), StakingError> {
        if fee as u64 > RATE_SCALE as u64 {
            return Err(StakingError::InvalidFeeRate);
        }
        self.agent_mut(agent)?.realtime_fee = fee;
        Ok(())
    }

    /// `delegate(agent, amount)`: claims pending rewards first so old and
    /// new shares of the current round are never mixed, then moves stake.
    /// Returns the reward amount realized by the prior claim (the caller
    /// transfers this to `reward_collector(sender, agent)` or the sender).
    #[instrument(skip(self))]
    pub fn delegate(
        &mut self,
        delegator: DelegatorId,
        agent: AgentId,
        amount: U256,
    ) -> Result<U256, StakingError> {
        if amount.is_zero() {
            return Err(StakingError::ZeroAmount);
        }
        {
            let info = self.agents.get(&agent).ok_or(StakingError::AgentNotFound)?;
            if !info.approved {
                return Err(StakingError::AgentNotActive);
            }
        }
        let claimed = self.claim_rewards(delegator, agent)?;

        let info = self.agent_mut(&agent)?;
        let d = info
            .delegators
            .entry(delegator)
            .or_insert_with(|| DelegatorStake::new(self.current_round));
        d.stake += amount;
        d.last_stake_unstake_round = self.current_round;
        info.realtime_stake += amount;
        let new_total = info.realtime_stake;

        self.directory
            .set(agent_key(&agent), new_total.low_u128())
            .expect("directory initialized in new()");
        Ok(claimed)
    }

    /// Symmetric to [`delegate`](Self::delegate).
    #[instrument(skip(self))]
    pub fn withdraw(
        &mut self,
        delegator: DelegatorId,
        agent: AgentId,
        amount: U256,
    ) -> Result<U256, StakingError> {
        if amount.is_zero() {
            return Err(StakingError::ZeroAmount);
        }
        let claimed = self.claim_rewards(delegator, agent)?;

        let info = self.agent_mut(&agent)?;
        let d = info.delegators.get_mut(&delegator).ok_or(StakingError::InsufficientStake)?;
        if d.stake < amount {
            return Err(StakingError::InsufficientStake);
        }
        d.stake -= amount;
        d.last_stake_unstake_round = self.current_round;
        info.realtime_stake -= amount;
        let new_total = info.realtime_stake;

        self.directory
            .set(agent_key(&agent), new_total.low_u128())
            .expect("directory initialized in new()");
        Ok(claimed)
    }

    /// `redelegate(from, to, amount)`: `withdraw` then `delegate`. Returns
    /// `(claimed_from, claimed_to)`.
    pub fn redelegate(
        &mut self,
        delegator: DelegatorId,
        from: AgentId,
        to: AgentId,
        amount: U256,
    ) -> Result<(U256, U256), StakingError> {
        let claimed_from = self.withdraw(delegator, from, amount)?;
        let claimed_to = self.delegate(delegator, to, amount)?;
        Ok((claimed_from, claimed_to))
    }

    /// Enumerate rounds `[delegator.lastClaimRound, round)`, summing
    /// `delegateReward * stake / totalDelegate` for each non-slashed round
    /// with nonzero denominators. Safe to call with unchanged stake across
    /// the whole gap because `delegate`/`withdraw` always claim first.
    #[instrument(skip(self))]
    pub fn claim_rewards(
        &mut self,
        delegator: DelegatorId,
        agent: AgentId,
    ) -> Result<U256, StakingError> {
        let current_round = self.current_round;
        let info = self.agent_mut(&agent)?;
        let d = info
            .delegators
            .entry(delegator)
            .or_insert_with(|| DelegatorStake::new(current_round));

        let mut total = U256::zero();
        let mut round = d.last_claim_round;
        while round < current_round {
            if let Some(reward) = info.rewards.get(&round) {
                if !reward.slashed && !reward.total_delegate.is_zero() && !reward.delegate_reward.is_zero() {
                    total += reward.delegate_reward * d.stake / reward.total_delegate;
                }
            }
            round += 1;
        }
        d.last_claim_round = current_round;
        debug!(?delegator, ?agent, %total, "claimed delegate rewards");
        Ok(total)
    }

    /// The agent's own share of reward, accrued separately from delegator
    /// shares (`AgentInfo.lastClaimRound`).
    pub fn claim_agent_rewards(&mut self, agent: AgentId) -> Result<U256, StakingError> {
        let current_round = self.current_round;
        let info = self.agent_mut(&agent)?;
        let mut total = U256::zero();
        let mut round = info.last_claim_round;
        while round < current_round {
            if let Some(reward) = info.rewards.get(&round) {
                if !reward.slashed {
                    total += reward.agent_reward;
                }
            }
            round += 1;
        }
        info.last_claim_round = current_round;
        Ok(total)
    }

    pub fn deposit_personal(&mut self, agent: AgentId, amount: U256) -> Result<(), StakingError> {
        if amount.is_zero() {
            return Err(StakingError::ZeroAmount);
        }
        self.agent_mut(&agent)?.personal_stake += amount;
        Ok(())
    }

    /// `requestWithdraw`: checks `requested <= personal + locked`.
    pub fn request_withdraw_personal(
        &mut self,
        agent: AgentId,
        amount: U256,
    ) -> Result<(), StakingError> {
        let info = self.agent_mut(&agent)?;
        if amount > info.personal_stake + info.locked_personal_stake {
            return Err(StakingError::InsufficientPersonalStake);
        }
        info.withdraw_requested_amount = amount;
        Ok(())
    }

    /// Returns the amount that had been requested, for the caller's event.
    pub fn cancel_withdraw_personal(&mut self, agent: AgentId) -> Result<U256, StakingError> {
        let info = self.agent_mut(&agent)?;
        if info.withdraw_requested_amount.is_zero() {
            return Err(StakingError::NoWithdrawRequested);
        }
        Ok(std::mem::take(&mut info.withdraw_requested_amount))
    }

    /// Withdraws only `withdrawReadyAmount`. Returns the pre-zero amount —
    /// emit the *returned* value as the event payload, not the
    /// now-zeroed ledger field.
    pub fn withdraw_personal(&mut self, agent: AgentId) -> Result<U256, StakingError> {
        let info = self.agent_mut(&agent)?;
        let amount = info.withdraw_ready_amount;
        if amount.is_zero() {
            return Err(StakingError::ZeroAmount);
        }
        info.withdraw_ready_amount = U256::zero();
        Ok(amount)
    }

    /// Lock/unlock are callable only by BetBook, modeled here as requiring
    /// an `AB_MANAGER` capability token.
    pub fn lock_agent_stake(
        &mut self,
        _cap: Capability<AbManager>,
        agent: AgentId,
        amount: U256,
    ) -> Result<(), StakingError> {
        let info = self.agent_mut(&agent)?;
        if info.personal_stake < amount {
            return Err(StakingError::InsufficientPersonalStake);
        }
        info.personal_stake -= amount;
        info.locked_personal_stake += amount;
        Ok(())
    }

    pub fn unlock_agent_stake(
        &mut self,
        _cap: Capability<AbManager>,
        agent: AgentId,
        amount: U256,
    ) -> Result<(), StakingError> {
        let info = self.agent_mut(&agent)?;
        if info.locked_personal_stake < amount {
            return Err(StakingError::UnlockTooMuch);
        }
        info.locked_personal_stake -= amount;
        info.personal_stake += amount;
        Ok(())
    }

    /// Move up to `amount` from personal stake to the accumulated fee and
    /// mark the current round's reward as slashed. Returns the amount
    /// actually moved.
    pub fn slash(
        &mut self,
        _cap: Capability<AbManager>,
        agent: AgentId,
        amount: U256,
    ) -> Result<U256, StakingError> {
        let current_round = self.current_round;
        let info = self.agent_mut(&agent)?;
        let moved = amount.min(info.personal_stake);
        info.personal_stake -= moved;
        info.last_slash_round = current_round;
        info.rewards.entry(current_round).or_default().slashed = true;
        let new_total = info.realtime_stake;
        self.accumulated_fee += moved;
        self.directory
            .set(agent_key(&agent), new_total.low_u128())
            .expect("directory initialized in new()");
        Ok(moved)
    }

    /// Forfeit up to `amount` of *already-locked* personal stake straight to
    /// the accumulated fee, without touching unlocked personal stake or
    /// marking the round slashed. Used by `BetBook::prune_bet` to sweep a
    /// timed-out bet's locked collateral to the system fee — distinct from
    /// [`slash`](Self::slash), which is a punitive action against unlocked
    /// personal stake.
    pub fn forfeit_locked(
        &mut self,
        _cap: Capability<AbManager>,
        agent: AgentId,
        amount: U256,
    ) -> Result<U256, StakingError> {
        let info = self.agent_mut(&agent)?;
        let moved = amount.min(info.locked_personal_stake);
        info.locked_personal_stake -= moved;
        self.accumulated_fee += moved;
        Ok(moved)
    }

    /// Slash the agent's entire personal stake (used by `AgentDirectory::ban_agent`).
    pub fn slash_all_personal(
        &mut self,
        cap: Capability<AbManager>,
        agent: AgentId,
    ) -> Result<U256, StakingError> {
        let all = self.agent(&agent).map(|a| a.personal_stake).unwrap_or_default();
        self.slash(cap, agent, all)
    }

    /// Consume `(agent, rewardAmount)` pairs produced by BetBook, skim the
    /// system's cut (`agent_reward_fee`, the process-wide tunable scaled
    /// /10000), and split the remainder between the agent and its
    /// delegators for the *current* round. Must be called before
    /// [`turn_round`](Self::turn_round) in the same round.
    #[instrument(skip(self, items))]
    pub fn distribute_rewards(
        &mut self,
        _cap: Capability<RoundManager>,
        items: &[(AgentId, U256)],
        agent_reward_fee: u32,
    ) -> Result<(), StakingError> {
        let current_round = self.current_round;
        for (agent_id, reward_amount) in items {
            let info = self.agent_mut(agent_id)?;
            let reward = info.rewards.entry(current_round).or_default();
            if reward.slashed {
                self.accumulated_fee += *reward_amount;
                continue;
            }
            let skim = *reward_amount * agent_reward_fee as u64 / RATE_SCALE as u64;
            self.accumulated_fee += skim;
            let remainder = *reward_amount - skim;
            let agent_share = remainder * info.active_fee as u64 / RATE_SCALE as u64;
            reward.agent_reward += agent_share;
            reward.delegate_reward += remainder - agent_share;
        }
        Ok(())
    }

    /// Drives the round forward: promotes realtime→active snapshots,
    /// flushes withdraw requests, and increments the round counter.
    #[instrument(skip(self))]
    pub fn turn_round(&mut self, _cap: Capability<RoundManager>) -> RoundId {
        let round = self.current_round;
        for info in self.agents.values_mut() {
            info.active_round_stake = info.realtime_stake;
            info.rewards.entry(round).or_default().total_delegate = info.realtime_stake;
            info.active_fee = info.realtime_fee;

            let req = info.withdraw_requested_amount.min(info.personal_stake);
            info.personal_stake -= req;
            info.withdraw_ready_amount += req;
            info.withdraw_requested_amount = U256::zero();
        }
        self.current_round += 1;
        self.current_round
    }

    /// Sorted agent ids, descending by total delegation.
    pub fn sorted_agents_desc(&self) -> Vec<AgentId> {
        self.directory
            .enumerate()
            .expect("directory initialized in new()")
            .into_iter()
            .filter_map(|(key, _)| {
                let mut bytes = [0u8; 20];
                if key.len() == 20 {
                    bytes.copy_from_slice(&key);
                    Some(AgentId(bytes))
                } else {
                    None
                }
            })
            .collect()
    }

    /// C10: manual transmitters are kept verbatim and first; the gov
    /// protocol never fills beyond its manuals. Otherwise fill up to
    /// `max_transmitters` with eligible agents in sorted order.
    /// `declared` maps an agent to the transmitter it has declared for
    /// this protocol.
    #[instrument(skip(self, declared))]
    pub fn select_transmitters_for_protocol(
        &self,
        manual_transmitters: &[TransmitterId],
        is_gov: bool,
        max_transmitters: usize,
        min_delegate: U256,
        min_personal: U256,
        protocol_paused: bool,
        declared: &HashMap<AgentId, TransmitterId>,
    ) -> Vec<TransmitterId> {
        let mut selected: Vec<TransmitterId> = manual_transmitters.to_vec();
        if is_gov || protocol_paused {
            return selected;
        }

        let mut seen: HashSet<TransmitterId> = selected.iter().copied().collect();
        for agent_id in self.sorted_agents_desc() {
            if selected.len() >= max_transmitters {
                break;
            }
            let Some(&transmitter) = declared.get(&agent_id) else {
                continue;
            };
            if seen.contains(&transmitter) {
                continue;
            }
            let Some(info) = self.agents.get(&agent_id) else {
                continue;
            };
            let eligible = info.approved
                && info.active_round_stake >= min_delegate
                && info.personal_stake >= min_personal;
            if eligible {
                selected.push(transmitter);
                seen.insert(transmitter);
            }
        }
        selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use photon_types::AuthorityTable;

    fn agent(byte: u8) -> AgentId {
        AgentId([byte; 20])
    }

    fn delegator(byte: u8) -> DelegatorId {
        DelegatorId([byte; 20])
    }

    #[test]
    fn delegate_then_withdraw_round_trips_stake() {
        let mut ledger = StakingLedger::new();
        ledger.admit_agent(agent(1), 1000).unwrap();
        ledger.delegate(delegator(1), agent(1), U256::from(100)).unwrap();
        assert_eq!(ledger.agent(&agent(1)).unwrap().realtime_stake, U256::from(100));
        ledger.withdraw(delegator(1), agent(1), U256::from(40)).unwrap();
        assert_eq!(ledger.agent(&agent(1)).unwrap().realtime_stake, U256::from(60));
    }

    #[test]
    fn credit_fee_adds_to_accumulated_pool_only() {
        let mut ledger = StakingLedger::new();
        ledger.admit_agent(agent(1), 0).unwrap();
        ledger.credit_fee(U256::from(50));
        assert_eq!(ledger.accumulated_fee(), U256::from(50));
        assert_eq!(ledger.agent(&agent(1)).unwrap().personal_stake, U256::zero());
    }

    #[test]
    fn withdraw_more_than_staked_is_rejected() {
        let mut ledger = StakingLedger::new();
        ledger.admit_agent(agent(1), 0).unwrap();
        ledger.delegate(delegator(1), agent(1), U256::from(10)).unwrap();
        assert_eq!(
            ledger.withdraw(delegator(1), agent(1), U256::from(20)),
            Err(StakingError::InsufficientStake)
        );
    }

    #[test]
    fn reward_snapshot_is_proportional_to_round_start_stake() {
        let table = AuthorityTable::new();
        let round_cap: Capability<RoundManager> = table.grant();
        let ab_cap: Capability<AbManager> = table.grant();

        let mut ledger = StakingLedger::new();
        ledger.admit_agent(agent(1), 0).unwrap();
        ledger.delegate(delegator(1), agent(1), U256::from(100)).unwrap();
        ledger.delegate(delegator(2), agent(1), U256::from(300)).unwrap();

        ledger
            .distribute_rewards(round_cap, &[(agent(1), U256::from(1000))], 1000)
            .unwrap();
        ledger.turn_round(round_cap);

        let c1 = ledger.claim_rewards(delegator(1), agent(1)).unwrap();
        let c2 = ledger.claim_rewards(delegator(2), agent(1)).unwrap();
        // 1000 reward, 10% system skim -> 900 remainder, 0% agent fee -> all
        // delegate reward; split 100:300 between delegators 1 and 2.
        assert_eq!(c1, U256::from(225));
        assert_eq!(c2, U256::from(675));
        let _ = ab_cap;
    }

    #[test]
    fn slashed_round_yields_no_delegate_reward() {
        let table = AuthorityTable::new();
        let round_cap: Capability<RoundManager> = table.grant();
        let ab_cap: Capability<AbManager> = table.grant();

        let mut ledger = StakingLedger::new();
        ledger.admit_agent(agent(1), 0).unwrap();
        ledger.deposit_personal(agent(1), U256::from(500)).unwrap();
        ledger.delegate(delegator(1), agent(1), U256::from(100)).unwrap();

        ledger.slash(ab_cap, agent(1), U256::from(500)).unwrap();
        ledger
            .distribute_rewards(round_cap, &[(agent(1), U256::from(1000))], 0)
            .unwrap();
        ledger.turn_round(round_cap);

        assert_eq!(ledger.claim_rewards(delegator(1), agent(1)).unwrap(), U256::zero());
        assert_eq!(ledger.accumulated_fee(), U256::from(500) + U256::from(1000));
    }

    #[test]
    fn lock_and_unlock_move_between_personal_and_locked() {
        let table = AuthorityTable::new();
        let cap: Capability<AbManager> = table.grant();

        let mut ledger = StakingLedger::new();
        ledger.admit_agent(agent(1), 0).unwrap();
        ledger.deposit_personal(agent(1), U256::from(50)).unwrap();

        ledger.lock_agent_stake(cap, agent(1), U256::from(30)).unwrap();
        assert_eq!(ledger.agent(&agent(1)).unwrap().personal_stake, U256::from(20));
        assert_eq!(ledger.agent(&agent(1)).unwrap().locked_personal_stake, U256::from(30));

        assert_eq!(
            ledger.unlock_agent_stake(cap, agent(1), U256::from(31)),
            Err(StakingError::UnlockTooMuch)
        );
        ledger.unlock_agent_stake(cap, agent(1), U256::from(30)).unwrap();
        assert_eq!(ledger.agent(&agent(1)).unwrap().personal_stake, U256::from(50));
    }

    #[test]
    fn forfeit_locked_moves_only_locked_stake_to_fee() {
        let table = AuthorityTable::new();
        let cap: Capability<AbManager> = table.grant();

        let mut ledger = StakingLedger::new();
        ledger.admit_agent(agent(1), 0).unwrap();
        ledger.deposit_personal(agent(1), U256::from(100)).unwrap();
        ledger.lock_agent_stake(cap, agent(1), U256::from(40)).unwrap();

        let moved = ledger.forfeit_locked(cap, agent(1), U256::from(1000)).unwrap();
        assert_eq!(moved, U256::from(40), "caps at what is actually locked");
        assert_eq!(ledger.agent(&agent(1)).unwrap().locked_personal_stake, U256::zero());
        assert_eq!(ledger.agent(&agent(1)).unwrap().personal_stake, U256::from(60));
        assert_eq!(ledger.accumulated_fee(), U256::from(40));
    }

    #[test]
    fn withdraw_personal_only_moves_ready_amount() {
        let table = AuthorityTable::new();
        let round_cap: Capability<RoundManager> = table.grant();

        let mut ledger = StakingLedger::new();
        ledger.admit_agent(agent(1), 0).unwrap();
        ledger.deposit_personal(agent(1), U256::from(100)).unwrap();
        ledger.request_withdraw_personal(agent(1), U256::from(40)).unwrap();
        ledger.turn_round(round_cap);

        assert_eq!(ledger.withdraw_personal(agent(1)).unwrap(), U256::from(40));
        assert_eq!(
            ledger.withdraw_personal(agent(1)),
            Err(StakingError::ZeroAmount)
        );
    }

    #[test]
    fn selection_keeps_manual_first_then_fills_by_descending_stake() {
        let mut ledger = StakingLedger::new();
        ledger.admit_agent(agent(1), 0).unwrap();
        ledger.admit_agent(agent(2), 0).unwrap();
        ledger.delegate(delegator(1), agent(1), U256::from(100)).unwrap();
        ledger.delegate(delegator(1), agent(2), U256::from(500)).unwrap();

        let table = AuthorityTable::new();
        let round_cap: Capability<RoundManager> = table.grant();
        ledger.turn_round(round_cap); // promote realtime -> active

        let mut declared = HashMap::new();
        declared.insert(agent(1), TransmitterId([10u8; 20]));
        declared.insert(agent(2), TransmitterId([20u8; 20]));

        let manual = [TransmitterId([1u8; 20])];
        let selected = ledger.select_transmitters_for_protocol(
            &manual,
            false,
            3,
            U256::zero(),
            U256::zero(),
            false,
            &declared,
        );
        assert_eq!(
            selected,
            vec![TransmitterId([1u8; 20]), TransmitterId([20u8; 20]), TransmitterId([10u8; 20])]
        );
    }

    #[test]
    fn gov_protocol_selection_is_manual_only() {
        let mut ledger = StakingLedger::new();
        ledger.admit_agent(agent(1), 0).unwrap();
        ledger.delegate(delegator(1), agent(1), U256::from(100)).unwrap();

        let declared = HashMap::new();
        let manual = [TransmitterId([9u8; 20])];
        let selected = ledger.select_transmitters_for_protocol(
            &manual,
            true,
            10,
            U256::zero(),
            U256::zero(),
            false,
            &declared,
        );
        assert_eq!(selected, vec![TransmitterId([9u8; 20])]);
    }
}
