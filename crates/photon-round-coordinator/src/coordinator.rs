//! `turnRound()` orchestration:
//!
//! 1. `StakingLedger::distribute_rewards` consumes `BetBook`'s drained
//!    pending rewards.
//! 2. `ProtocolRegistry::turn_round` snapshots realtime→active params and
//!    returns the actions it cannot itself carry out.
//! 3. `StakingLedger::turn_round` advances the round, and the new round id
//!    is pushed into `OperationRegistry::set_current_round` so the proof
//!    rotation branch in `ingest_known_proof` can see the round change.
//! 4. Per active protocol, transmitters are re-elected from
//!    `StakingLedger::select_transmitters_for_protocol` and pushed through
//!    `OperationRegistry::update_transmitters`.
//! 5. `StreamConsensus::turn_round` promotes pended interval changes.
//! 6. The round timestamp is stamped, gating the next call.

use crate::error::RoundCoordinatorError as Error;
use parking_lot::Mutex;
use photon_agent_directory::AgentDirectory;
use photon_betbook::BetBook;
use photon_config::GlobalConfig;
use photon_operation_registry::OperationRegistry;
use photon_protocol_registry::{PendingAction, ProtocolRegistry};
use photon_staking::StakingLedger;
use photon_stream_consensus::StreamConsensus;
use photon_types::{Clock, Capability, ProtocolId, RoundId, RoundManager, RoundTrigger};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub struct RoundCoordinator {
    staking: Arc<Mutex<StakingLedger>>,
    betbook: Arc<Mutex<BetBook>>,
    protocol_registry: Arc<Mutex<ProtocolRegistry>>,
    operation_registry: Arc<Mutex<OperationRegistry>>,
    stream_consensus: Arc<Mutex<StreamConsensus>>,
    // Mutex-wrapped because the hub's support-declaration API mutates this
    // directory concurrently with round turns; both sides share one instance.
    agent_directory: Arc<Mutex<AgentDirectory>>,
    config: Arc<Mutex<GlobalConfig>>,
    clock: Arc<dyn Clock>,
    round_cap: Capability<RoundManager>,
    last_round_timestamp: Mutex<u64>,
}

impl RoundCoordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        staking: Arc<Mutex<StakingLedger>>,
        betbook: Arc<Mutex<BetBook>>,
        protocol_registry: Arc<Mutex<ProtocolRegistry>>,
        operation_registry: Arc<Mutex<OperationRegistry>>,
        stream_consensus: Arc<Mutex<StreamConsensus>>,
        agent_directory: Arc<Mutex<AgentDirectory>>,
        config: Arc<Mutex<GlobalConfig>>,
        clock: Arc<dyn Clock>,
        round_cap: Capability<RoundManager>,
    ) -> Self {
        Self {
            staking,
            betbook,
            protocol_registry,
            operation_registry,
            stream_consensus,
            agent_directory,
            config,
            clock,
            round_cap,
            last_round_timestamp: Mutex::new(0),
        }
    }

    pub fn last_round_timestamp(&self) -> u64 {
        *self.last_round_timestamp.lock()
    }

    /// Advances the round, gated by `GlobalConfig::min_round_time_secs`
    /// since the last successful call. Requires `Capability<RoundTrigger>`
    /// so only the hub's scheduler may call it.
    #[instrument(skip(self, _trigger))]
    pub fn turn_round(&self, _trigger: Capability<RoundTrigger>) -> Result<RoundId, Error> {
        let now = self.clock.now_unix();
        let (agent_reward_fee, min_protocol_balance, min_round_time_secs) = {
            let cfg = self.config.lock();
            (cfg.agent_reward_fee, cfg.min_protocol_balance, cfg.min_round_time_secs)
        };

        {
            let last = self.last_round_timestamp.lock();
            if now < last.saturating_add(min_round_time_secs) {
                return Err(Error::TooSoon);
            }
        }

        let pending_rewards = self.betbook.lock().drain_pending_rewards();
        self.staking
            .lock()
            .distribute_rewards(self.round_cap, &pending_rewards, agent_reward_fee)?;

        let actions = self.protocol_registry.lock().turn_round(min_protocol_balance);
        let replaced_empty = self.apply_pending_actions(&actions);

        let round = self.staking.lock().turn_round(self.round_cap);
        self.operation_registry
            .lock()
            .set_current_round(self.round_cap, round);

        self.elect_transmitters(&replaced_empty);

        self.stream_consensus.lock().turn_round(self.round_cap);

        *self.last_round_timestamp.lock() = now;
        info!(round, "round turned");
        Ok(round)
    }

    /// Applies every `PendingAction` `ProtocolRegistry::turn_round` could
    /// not carry out itself.
    /// Returns the protocols whose transmitter set was already emptied, so
    /// the election pass below skips re-electing for them this round.
    fn apply_pending_actions(&self, actions: &[PendingAction]) -> HashSet<ProtocolId> {
        let mut replaced_empty = HashSet::new();
        let mut registry = self.operation_registry.lock();
        for action in actions {
            match action {
                PendingAction::PropagateConsensusRate { protocol_id, new_rate } => {
                    registry.propagate_consensus_rate(self.round_cap, *protocol_id, *new_rate);
                }
                PendingAction::ReplaceTransmittersEmpty { protocol_id } => {
                    registry.update_transmitters(self.round_cap, *protocol_id, Vec::new());
                    replaced_empty.insert(*protocol_id);
                }
                PendingAction::PauseProtocol { protocol_id } => {
                    warn!(?protocol_id, "protocol paused for insufficient balance");
                }
                PendingAction::ReleaseBalanceToOwner { protocol_id, owner, amount } => {
                    info!(?protocol_id, ?owner, %amount, "protocol balance released to owner (external transfer is out of scope)");
                }
            }
        }
        replaced_empty
    }

    /// TransmitterElector.updateAgents(activeProtocols): re-derives each
    /// protocol's transmitter set from the freshly-rotated stake snapshot
    /// and pushes it through `OperationRegistry::update_transmitters`,
    /// which diffs and propagates to every `Inited` chain.
    fn elect_transmitters(&self, skip: &HashSet<ProtocolId>) {
        let protocol_ids = self.protocol_registry.lock().protocol_ids();
        for protocol_id in protocol_ids {
            if skip.contains(&protocol_id) {
                continue;
            }
            let registry = self.protocol_registry.lock();
            let Some(info) = registry.get(&protocol_id) else { continue };
            if info.paused {
                drop(registry);
                self.operation_registry.lock().update_transmitters(self.round_cap, protocol_id, Vec::new());
                continue;
            }
            let is_gov = registry.is_gov(&protocol_id);
            let manual_transmitters = info.manual_transmitters.clone();
            let max_transmitters = info.active.max_transmitters as usize;
            let min_delegate = info.active.min_delegate_stake;
            let min_personal = info.active.min_personal_stake;
            drop(registry);

            let declared = self.agent_directory.lock().declared_for_protocol(&protocol_id);
            let selected = self.staking.lock().select_transmitters_for_protocol(
                &manual_transmitters,
                is_gov,
                max_transmitters,
                min_delegate,
                min_personal,
                false,
                &declared,
            );
            self.operation_registry.lock().update_transmitters(self.round_cap, protocol_id, selected);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use photon_agent_directory::AgentDirectory;
    use photon_betbook::BetBook;
    use photon_operation_registry::{CallSequence, NullEventSink as OpNullSink};
    use photon_protocol_registry::ProtocolParams;
    use photon_stream_consensus::{MajorityProcessingLib, NullEventSink as StreamNullSink};
    use photon_types::{AuthorityTable, FixedClock, ProtocolId, TransmitterId};
    use primitive_types::U256;

    struct FakeBetBookPort;
    impl photon_operation_registry::BetBookPort for FakeBetBookPort {
        fn place_bet(
            &self,
            _protocol_id: ProtocolId,
            _transmitter: TransmitterId,
            _bet_type: photon_betbook::BetType,
            _op_hash: photon_types::OpHash,
        ) -> Result<(), photon_operation_registry::OperationRegistryError> {
            Ok(())
        }
        fn refund_bet(&self, _protocol_id: ProtocolId, _op_hash: photon_types::OpHash, _transmitter: TransmitterId) {}
        fn release_bets_and_reward(&self, _protocol_id: ProtocolId, _winners: &[TransmitterId], _op_hash: photon_types::OpHash) {}
    }

    struct FakeOpProtocolPort;
    impl photon_operation_registry::ProtocolPort for FakeOpProtocolPort {
        fn is_gov(&self, _protocol_id: ProtocolId) -> bool {
            false
        }
        fn is_transmitter_allowed(&self, _protocol_id: ProtocolId, _transmitter: TransmitterId) -> bool {
            true
        }
        fn current_transmitters(&self, _protocol_id: ProtocolId) -> Vec<TransmitterId> {
            vec![]
        }
        fn consensus_target_rate(&self, _protocol_id: ProtocolId) -> u32 {
            6000
        }
        fn gov_address(&self, _dest_chain_id: photon_types::ChainId) -> Option<photon_types::OpaqueAddr> {
            None
        }
    }

    struct FakeEndpointPort;
    impl photon_operation_registry::EndpointPort for FakeEndpointPort {
        fn emit(
            &self,
            _gov_protocol_id: ProtocolId,
            _chain_id: photon_types::ChainId,
            _dest_gov_address: photon_types::OpaqueAddr,
            _message: photon_types::GovMessage,
        ) {
        }
    }

    struct FakeStreamProtocolPort;
    impl photon_stream_consensus::ProtocolPort for FakeStreamProtocolPort {
        fn current_transmitters(&self, _p: ProtocolId) -> Vec<TransmitterId> {
            vec![]
        }
        fn consensus_target_rate(&self, _p: ProtocolId) -> u32 {
            6000
        }
    }

    struct FakeStreamBetBookPort;
    impl photon_stream_consensus::BetBookPort for FakeStreamBetBookPort {
        fn place_bet(
            &self,
            _protocol_id: ProtocolId,
            _transmitter: TransmitterId,
            _bet_type: photon_betbook::BetType,
            _op_hash: photon_types::OpHash,
        ) -> Result<(), photon_stream_consensus::StreamConsensusError> {
            Ok(())
        }
        fn release_bets_and_reward(&self, _protocol_id: ProtocolId, _winners: &[TransmitterId], _op_hash: photon_types::OpHash) {}
    }

    fn harness() -> RoundCoordinator {
        let staking = Arc::new(Mutex::new(StakingLedger::new()));
        let betbook_stub_staking: Arc<dyn photon_betbook::StakingPort> = Arc::new(NoopStakingPort);
        let betbook_stub_protocol: Arc<dyn photon_betbook::ProtocolPort> = Arc::new(NoopBetBookProtocolPort);
        let betbook_stub_opreg: Arc<dyn photon_betbook::OperationRegistryPort> = Arc::new(NoopOperationRegistryPort);
        let betbook = Arc::new(Mutex::new(BetBook::new(
            betbook_stub_staking,
            betbook_stub_protocol,
            betbook_stub_opreg,
            Arc::new(FixedClock(1_000)),
        )));

        let protocol_registry = Arc::new(Mutex::new(ProtocolRegistry::new(ProtocolId::ZERO)));
        let operation_registry = Arc::new(Mutex::new(OperationRegistry::new(
            Arc::new(FakeOpProtocolPort),
            Arc::new(FakeBetBookPort),
            Arc::new(FakeEndpointPort),
            Arc::new(OpNullSink),
            Arc::new(CallSequence::new()),
        )));
        let stream_consensus = Arc::new(Mutex::new(StreamConsensus::new(
            Arc::new(FakeStreamProtocolPort),
            Arc::new(FakeStreamBetBookPort),
            Arc::new(MajorityProcessingLib),
            Arc::new(StreamNullSink),
            Arc::new(FixedClock(1_000)),
        )));
        let agent_directory = Arc::new(Mutex::new(AgentDirectory::new()));
        let config = Arc::new(Mutex::new(GlobalConfig { min_round_time_secs: 10, ..GlobalConfig::default() }));
        let clock = Arc::new(FixedClock(1_000));
        let table = AuthorityTable::new();

        RoundCoordinator::new(
            staking,
            betbook,
            protocol_registry,
            operation_registry,
            stream_consensus,
            agent_directory,
            config,
            clock,
            table.grant(),
        )
    }

    struct NoopStakingPort;
    impl photon_betbook::StakingPort for NoopStakingPort {
        fn lock_agent_stake(&self, _agent: photon_types::AgentId, _amount: U256) -> Result<(), photon_betbook::BetBookError> {
            Ok(())
        }
        fn unlock_agent_stake(&self, _agent: photon_types::AgentId, _amount: U256) -> Result<(), photon_betbook::BetBookError> {
            Ok(())
        }
        fn slash(&self, _agent: photon_types::AgentId, amount: U256) -> Result<U256, photon_betbook::BetBookError> {
            Ok(amount)
        }
        fn forfeit_locked(&self, _agent: photon_types::AgentId, amount: U256) -> Result<U256, photon_betbook::BetBookError> {
            Ok(amount)
        }
    }

    struct NoopBetBookProtocolPort;
    impl photon_betbook::ProtocolPort for NoopBetBookProtocolPort {
        fn is_gov(&self, _protocol_id: ProtocolId) -> bool {
            false
        }
        fn is_paused(&self, _protocol_id: ProtocolId) -> bool {
            false
        }
        fn is_manual_transmitter(&self, _protocol_id: ProtocolId, _transmitter: TransmitterId) -> bool {
            false
        }
        fn agent_for_transmitter(&self, _transmitter: TransmitterId) -> Option<photon_types::AgentId> {
            None
        }
        fn bet_amount(&self, _protocol_id: ProtocolId, _bet_type: photon_betbook::BetType) -> U256 {
            U256::zero()
        }
        fn reward_amount(&self, _protocol_id: ProtocolId, _bet_type: photon_betbook::BetType, _is_first: bool) -> U256 {
            U256::zero()
        }
        fn min_personal_amount(&self, _protocol_id: ProtocolId) -> U256 {
            U256::zero()
        }
        fn deduce_fee(&self, _protocol_id: ProtocolId, _amount: U256) -> bool {
            true
        }
        fn protocol_fee(&self, _protocol_id: ProtocolId) -> U256 {
            U256::zero()
        }
        fn credit_system_fee(&self, _amount: U256) {}
        fn current_transmitters(&self, _protocol_id: ProtocolId) -> Vec<TransmitterId> {
            vec![]
        }
    }

    struct NoopOperationRegistryPort;
    impl photon_betbook::OperationRegistryPort for NoopOperationRegistryPort {
        fn remove_transmitter(&self, _protocol_id: ProtocolId, _transmitter: TransmitterId) {}
    }

    #[test]
    fn turn_round_advances_the_round_counter() {
        let coordinator = harness();
        let table = AuthorityTable::new();
        let round = coordinator.turn_round(table.grant()).unwrap();
        assert_eq!(round, 2);
    }

    #[test]
    fn turn_round_rejects_before_min_interval_elapses() {
        let coordinator = harness();
        let table = AuthorityTable::new();
        coordinator.turn_round(table.grant()).unwrap();
        assert_eq!(coordinator.turn_round(table.grant()), Err(Error::TooSoon));
    }

    #[test]
    fn turn_round_elects_registered_protocol_transmitters() {
        let coordinator = harness();
        coordinator
            .protocol_registry
            .lock()
            .register_protocol(
                ProtocolId([7u8; 32]),
                [1u8; 20],
                ProtocolParams { max_transmitters: 5, ..ProtocolParams::default() },
                vec![TransmitterId([9u8; 20])],
                100,
            )
            .unwrap();

        let table = AuthorityTable::new();
        coordinator.turn_round(table.grant()).unwrap();

        assert_eq!(
            coordinator.operation_registry.lock().admission_state(ProtocolId([7u8; 32]), U256::zero()),
            photon_operation_registry::InitState::NotInited
        );
    }
}
