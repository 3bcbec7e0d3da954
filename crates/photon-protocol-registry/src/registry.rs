//! ProtocolRegistry.

use crate::error::ProtocolRegistryError as Error;
use crate::types::{PendingAction, ProtocolInfo, ProtocolParams};
use photon_types::{ChainId, OpaqueAddr, ProtocolId, TransmitterId};
use primitive_types::U256;
use std::collections::{HashMap, HashSet};
use tracing::instrument;

pub struct ProtocolRegistry {
    gov_protocol_id: ProtocolId,
    protocols: HashMap<ProtocolId, ProtocolInfo>,
    /// Which protocol currently claims a manual transmitter, globally.
    manual_owner: HashMap<TransmitterId, ProtocolId>,
}

impl ProtocolRegistry {
    pub fn new(gov_protocol_id: ProtocolId) -> Self {
        Self {
            gov_protocol_id,
            protocols: HashMap::new(),
            manual_owner: HashMap::new(),
        }
    }

    pub fn is_gov(&self, protocol_id: &ProtocolId) -> bool {
        *protocol_id == self.gov_protocol_id
    }

    pub fn get(&self, protocol_id: &ProtocolId) -> Option<&ProtocolInfo> {
        self.protocols.get(protocol_id)
    }

    /// Every currently-registered protocol id, including the gov protocol
    /// (`RoundCoordinator`'s per-protocol transmitter-election pass).
    pub fn protocol_ids(&self) -> Vec<ProtocolId> {
        self.protocols.keys().copied().collect()
    }

    fn get_mut(&mut self, protocol_id: &ProtocolId) -> Result<&mut ProtocolInfo, Error> {
        self.protocols.get_mut(protocol_id).ok_or(Error::UnknownProtocol)
    }

    fn check_owner(&self, protocol_id: &ProtocolId, caller: &[u8; 20]) -> Result<(), Error> {
        let info = self.protocols.get(protocol_id).ok_or(Error::UnknownProtocol)?;
        if &info.owner != caller {
            return Err(Error::IsNotOwner);
        }
        Ok(())
    }

    fn validate_manual_list(
        &self,
        protocol_id: &ProtocolId,
        manual: &[TransmitterId],
    ) -> Result<(), Error> {
        if manual.is_empty() {
            return Err(Error::EmptyManualTransmitters);
        }
        let mut seen = HashSet::new();
        for t in manual {
            if t.is_zero() {
                return Err(Error::ZeroAddress);
            }
            if !seen.insert(*t) {
                return Err(Error::DuplicateTransmitter);
            }
            if let Some(owner) = self.manual_owner.get(t) {
                if owner != protocol_id {
                    return Err(Error::TransmitterClaimedElsewhere);
                }
            }
        }
        Ok(())
    }

    /// `requireParamsValid`, enforced after every mutator.
    /// `global_max_transmitters` is the admin cap
    /// (`GlobalConfig::max_transmitters_count`).
    fn require_params_valid(
        &self,
        protocol_id: &ProtocolId,
        info: &ProtocolInfo,
        global_max_transmitters: u32,
    ) -> Result<(), Error> {
        if info.owner == [0u8; 20] {
            return Err(Error::IsNotOwner);
        }
        if !info.is_active {
            return Err(Error::ProtocolNotActive);
        }
        if info.manual_transmitters.is_empty() {
            return Err(Error::EmptyManualTransmitters);
        }
        let rate = info.realtime.consensus_target_rate;
        if !(5500 < rate && rate <= 10000) {
            return Err(Error::InvalidConsensusRate);
        }
        if info.realtime.max_transmitters > global_max_transmitters {
            return Err(Error::InvalidMaxTransmitters);
        }
        if !self.is_gov(protocol_id) {
            let cap = (info.realtime.max_transmitters as u64 * (10000 - rate) as u64) / 10000 + 1;
            if info.manual_transmitters.len() as u64 > cap {
                return Err(Error::ManualTransmittersLimitExceeded);
            }
        }
        Ok(())
    }

    /// `registerProtocol`. Token-side fee charging is the caller's
    /// responsibility (the ledger is a non-callback sink); this validates
    /// and admits the protocol.
    #[instrument(skip(self, params, manual_transmitters))]
    pub fn register_protocol(
        &mut self,
        protocol_id: ProtocolId,
        owner: [u8; 20],
        params: ProtocolParams,
        manual_transmitters: Vec<TransmitterId>,
        global_max_transmitters: u32,
    ) -> Result<(), Error> {
        if self.protocols.contains_key(&protocol_id) {
            return Err(Error::AlreadyRegistered);
        }
        if owner == [0u8; 20] {
            return Err(Error::IsNotOwner);
        }
        self.validate_manual_list(&protocol_id, &manual_transmitters)?;

        let info = ProtocolInfo::new(owner, params, manual_transmitters.clone());
        self.require_params_valid(&protocol_id, &info, global_max_transmitters)?;

        for t in &manual_transmitters {
            self.manual_owner.insert(*t, protocol_id);
        }
        self.protocols.insert(protocol_id, info);
        Ok(())
    }

    pub fn set_owner(
        &mut self,
        protocol_id: ProtocolId,
        caller: [u8; 20],
        new_owner: [u8; 20],
    ) -> Result<(), Error> {
        self.check_owner(&protocol_id, &caller)?;
        if new_owner == [0u8; 20] {
            return Err(Error::ZeroAddress);
        }
        self.get_mut(&protocol_id)?.owner = new_owner;
        Ok(())
    }

    pub fn set_realtime_params(
        &mut self,
        protocol_id: ProtocolId,
        caller: [u8; 20],
        params: ProtocolParams,
        global_max_transmitters: u32,
    ) -> Result<(), Error> {
        self.check_owner(&protocol_id, &caller)?;
        let info = self.get_mut(&protocol_id)?;
        let previous = info.realtime.clone();
        info.realtime = params;
        if let Err(e) = self.require_params_valid(&protocol_id, self.protocols.get(&protocol_id).unwrap(), global_max_transmitters) {
            self.protocols.get_mut(&protocol_id).unwrap().realtime = previous;
            return Err(e);
        }
        Ok(())
    }

    pub fn set_fee(&mut self, protocol_id: ProtocolId, caller: [u8; 20], fee: U256) -> Result<(), Error> {
        self.check_owner(&protocol_id, &caller)?;
        self.get_mut(&protocol_id)?.fee = fee;
        Ok(())
    }

    /// `setManualTransmitters`. Returns the number of *newly added*
    /// addresses (non-gov protocols owe `manualTransmitterFee` per new one).
    #[instrument(skip(self, new_list))]
    pub fn set_manual_transmitters(
        &mut self,
        protocol_id: ProtocolId,
        caller: [u8; 20],
        new_list: Vec<TransmitterId>,
        global_max_transmitters: u32,
    ) -> Result<usize, Error> {
        self.check_owner(&protocol_id, &caller)?;
        self.validate_manual_list(&protocol_id, &new_list)?;

        let old: HashSet<TransmitterId> =
            self.protocols.get(&protocol_id).unwrap().manual_transmitters.iter().copied().collect();
        let new_count = new_list.iter().filter(|t| !old.contains(t)).count();

        for t in &old {
            self.manual_owner.remove(t);
        }
        for t in &new_list {
            self.manual_owner.insert(*t, protocol_id);
        }

        let info = self.get_mut(&protocol_id)?;
        let previous = std::mem::replace(&mut info.manual_transmitters, new_list);
        if let Err(e) = self.require_params_valid(&protocol_id, self.protocols.get(&protocol_id).unwrap(), global_max_transmitters) {
            let info = self.protocols.get_mut(&protocol_id).unwrap();
            for t in &info.manual_transmitters {
                self.manual_owner.remove(t);
            }
            for t in &previous {
                self.manual_owner.insert(*t, protocol_id);
            }
            info.manual_transmitters = previous;
            return Err(e);
        }
        Ok(new_count)
    }

    /// `deduceFee`: on success, debits the balance; on failure, pauses the
    /// protocol and reports failure so the caller can skip the write that
    /// depended on it while letting the surrounding flow continue.
    #[instrument(skip(self))]
    pub fn deduce_fee(&mut self, protocol_id: ProtocolId, amount: U256) -> bool {
        let Some(info) = self.protocols.get_mut(&protocol_id) else {
            return false;
        };
        if info.balance > amount {
            info.balance -= amount;
            true
        } else {
            info.paused = true;
            false
        }
    }

    pub fn is_paused(&self, protocol_id: &ProtocolId) -> bool {
        self.protocols.get(protocol_id).map(|p| p.paused).unwrap_or(true)
    }

    pub fn credit_balance(&mut self, protocol_id: ProtocolId, amount: U256) -> Result<(), Error> {
        self.get_mut(&protocol_id)?.balance += amount;
        Ok(())
    }

    pub fn add_executor(
        &mut self,
        protocol_id: ProtocolId,
        chain_id: ChainId,
        executor: OpaqueAddr,
        chain_is_inited: bool,
    ) -> Result<(), Error> {
        if !chain_is_inited {
            return Err(Error::ChainNotInited);
        }
        let info = self.get_mut(&protocol_id)?;
        let list = info.executors.entry(chain_id).or_default();
        if !list.contains(&executor) {
            list.push(executor);
        }
        Ok(())
    }

    pub fn remove_executor(
        &mut self,
        protocol_id: ProtocolId,
        chain_id: ChainId,
        executor: &OpaqueAddr,
    ) -> Result<(), Error> {
        let is_gov = self.is_gov(&protocol_id);
        let info = self.get_mut(&protocol_id)?;
        let list = info.executors.entry(chain_id).or_default();
        if is_gov && list.len() <= 1 && list.iter().any(|e| e == executor) {
            return Err(Error::LastGovExecutorRemovalForbidden);
        }
        list.retain(|e| e != executor);
        Ok(())
    }

    /// `turnRound`: copies realtime→active params for every protocol and
    /// returns the actions an orchestrator must carry out elsewhere
    /// (propagate rate changes, pause unhealthy protocols, empty their
    /// transmitter set, and release an inactive protocol's balance to its
    /// owner).
    #[instrument(skip(self))]
    pub fn turn_round(&mut self, min_protocol_balance: U256) -> Vec<PendingAction> {
        let mut actions = Vec::new();
        let protocol_ids: Vec<ProtocolId> = self.protocols.keys().copied().collect();

        for protocol_id in protocol_ids {
            let is_gov = self.is_gov(&protocol_id);
            let info = self.protocols.get_mut(&protocol_id).unwrap();

            if info.active.consensus_target_rate != info.realtime.consensus_target_rate {
                actions.push(PendingAction::PropagateConsensusRate {
                    protocol_id,
                    new_rate: info.realtime.consensus_target_rate,
                });
            }
            info.active = info.realtime.clone();

            if !is_gov {
                let unhealthy = info.balance < min_protocol_balance || !info.is_active;
                if unhealthy && !info.paused {
                    info.paused = true;
                    actions.push(PendingAction::PauseProtocol { protocol_id });
                }
            }

            if !info.is_active {
                if !info.balance.is_zero() {
                    let amount = std::mem::take(&mut info.balance);
                    actions.push(PendingAction::ReleaseBalanceToOwner {
                        protocol_id,
                        owner: info.owner,
                        amount,
                    });
                }
                actions.push(PendingAction::ReplaceTransmittersEmpty { protocol_id });
            }
        }
        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ProtocolParams {
        ProtocolParams {
            consensus_target_rate: 7000,
            max_transmitters: 10,
            ..ProtocolParams::default()
        }
    }

    fn manual(b: u8) -> TransmitterId {
        TransmitterId([b; 20])
    }

    #[test]
    fn register_protocol_requires_valid_params() {
        let mut reg = ProtocolRegistry::new(ProtocolId::ZERO);
        let res = reg.register_protocol(
            ProtocolId([1u8; 32]),
            [9u8; 20],
            params(),
            vec![manual(1)],
            100,
        );
        assert!(res.is_ok());
    }

    #[test]
    fn manual_cap_matches_worked_example() {
        // maxTransmitters=10, consensusTargetRate=7000 -> floor(10*3000/10000)+1 = 4.
        let mut reg = ProtocolRegistry::new(ProtocolId::ZERO);
        let five = (1..=5).map(manual).collect::<Vec<_>>();
        let err = reg
            .register_protocol(ProtocolId([2u8; 32]), [9u8; 20], params(), five, 100)
            .unwrap_err();
        assert_eq!(err, Error::ManualTransmittersLimitExceeded);

        let four = (1..=4).map(manual).collect::<Vec<_>>();
        assert!(reg
            .register_protocol(ProtocolId([3u8; 32]), [9u8; 20], params(), four, 100)
            .is_ok());
    }

    #[test]
    fn deduce_fee_pauses_protocol_on_insufficient_balance() {
        let mut reg = ProtocolRegistry::new(ProtocolId::ZERO);
        let pid = ProtocolId([1u8; 32]);
        reg.register_protocol(pid, [9u8; 20], params(), vec![manual(1)], 100).unwrap();
        reg.credit_balance(pid, U256::from(10)).unwrap();

        assert!(!reg.deduce_fee(pid, U256::from(50)));
        assert!(reg.is_paused(&pid));
    }

    #[test]
    fn turn_round_propagates_rate_change_and_copies_params() {
        let mut reg = ProtocolRegistry::new(ProtocolId::ZERO);
        let pid = ProtocolId([1u8; 32]);
        reg.register_protocol(pid, [9u8; 20], params(), vec![manual(1)], 100).unwrap();
        reg.set_realtime_params(
            pid,
            [9u8; 20],
            ProtocolParams { consensus_target_rate: 8000, ..params() },
            100,
        )
        .unwrap();

        let actions = reg.turn_round(U256::zero());
        assert!(actions.iter().any(|a| matches!(
            a,
            PendingAction::PropagateConsensusRate { new_rate: 8000, .. }
        )));
        assert_eq!(reg.get(&pid).unwrap().active.consensus_target_rate, 8000);
    }

    #[test]
    fn inactive_protocol_releases_balance_and_empties_transmitters() {
        let mut reg = ProtocolRegistry::new(ProtocolId::ZERO);
        let pid = ProtocolId([1u8; 32]);
        reg.register_protocol(pid, [9u8; 20], params(), vec![manual(1)], 100).unwrap();
        reg.credit_balance(pid, U256::from(500)).unwrap();
        reg.get_mut(&pid).unwrap().is_active = false;

        let actions = reg.turn_round(U256::zero());
        assert!(actions.contains(&PendingAction::ReleaseBalanceToOwner {
            protocol_id: pid,
            owner: [9u8; 20],
            amount: U256::from(500),
        }));
        assert!(actions.contains(&PendingAction::ReplaceTransmittersEmpty { protocol_id: pid }));
    }
}
