//! # Photon Hub
//!
//! The process entry point's library half: wires every component crate
//! together behind the port traits each one defines for itself, and exposes
//! the resulting external entry points as plain methods on [`Hub`].
//!
//! Wiring happens once, in [`Hub::new`]: every capability is minted
//! from one [`photon_types::AuthorityTable`] before it is sealed, and every
//! cross-crate call goes through an adapter in [`adapters`] rather than a
//! direct dependency between component crates.

pub mod adapters;
pub mod error;

use adapters::{
    apply_pending_removals, BetBookPortAdapter, EndpointPortAdapter, LoggingTransport, OperationRegistryPortAdapter,
    PendingRemovals, ProtocolAdapter, StakingPortAdapter,
};
use error::HubError;
use parking_lot::Mutex;
use photon_agent_directory::AgentDirectory;
use photon_betbook::{BetBook, BetType};
use photon_bus::{BusSink, InMemoryEventBus};
use photon_config::GlobalConfig;
use photon_crypto::Signature;
use photon_endpoint_emitter::EndpointEmitter;
use photon_operation_registry::{CallSequence, OperationRegistry};
use photon_protocol_registry::{ProtocolParams, ProtocolRegistry};
use photon_round_coordinator::RoundCoordinator;
use photon_staking::StakingLedger;
use photon_stream_consensus::{DataKey, MajorityProcessingLib, MasterStreamDataSpotter, SourceId, StreamConsensus};
use photon_types::{
    constants::GOV_PROTOCOL_ID, AgentId, AuthorityTable, Clock, DelegatorId, OpHash, OperationData, ProtocolId,
    RoundId, SystemClock, TransmitterId, WatcherId,
};
use primitive_types::U256;
use std::collections::HashMap;
use std::sync::Arc;

/// The reserved protocol id the hub registers itself under for its own
/// governance traffic: the hub records its own outbound messages through
/// the same OperationRegistry pipeline.
pub fn gov_protocol_id() -> ProtocolId {
    ProtocolId(GOV_PROTOCOL_ID)
}

/// Every subsystem, wired. Cheap to clone: every field is an `Arc`.
#[derive(Clone)]
pub struct Hub {
    pub config: Arc<Mutex<GlobalConfig>>,
    pub bus: Arc<InMemoryEventBus>,
    pub staking: Arc<Mutex<StakingLedger>>,
    pub agent_directory: Arc<Mutex<AgentDirectory>>,
    pub protocol_registry: Arc<Mutex<ProtocolRegistry>>,
    pub betbook: Arc<Mutex<BetBook>>,
    pub operation_registry: Arc<Mutex<OperationRegistry>>,
    pub stream_consensus: Arc<Mutex<StreamConsensus>>,
    pub endpoint_emitter: Arc<EndpointEmitter>,
    pub round_coordinator: Arc<RoundCoordinator>,
    pub block_source: Arc<CallSequence>,
    spotters: Arc<Mutex<HashMap<(ProtocolId, SourceId), MasterStreamDataSpotter>>>,
    clock: Arc<dyn Clock>,
    pending_removals: PendingRemovals,
    protocol_adapter: Arc<ProtocolAdapter>,
    round_cap: photon_types::Capability<photon_types::RoundManager>,
    round_trigger: photon_types::Capability<photon_types::RoundTrigger>,
    endpoint_cap: photon_types::Capability<photon_types::Endpoint>,
}

impl Hub {
    /// Assembles every subsystem: one [`AuthorityTable`] mints every
    /// capability this process will ever hold, then seals — mirroring an
    /// idempotent single-shot `setContracts`.
    pub fn new(config: GlobalConfig) -> Result<Self, HubError> {
        config.validate()?;

        let mut table = AuthorityTable::new();
        let config = Arc::new(Mutex::new(config));
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let bus = Arc::new(InMemoryEventBus::new());
        let sink = Arc::new(BusSink(bus.clone()));

        let staking = Arc::new(Mutex::new(StakingLedger::new()));
        let agent_directory = Arc::new(Mutex::new(AgentDirectory::new()));
        let protocol_registry = Arc::new(Mutex::new(ProtocolRegistry::new(gov_protocol_id())));
        let pending_removals: PendingRemovals = Arc::new(Mutex::new(Vec::new()));

        let protocol_adapter = Arc::new(ProtocolAdapter {
            registry: protocol_registry.clone(),
            staking: staking.clone(),
            agents: agent_directory.clone(),
            gov_protocol_id: gov_protocol_id(),
        });

        let ab_cap = table.grant::<photon_types::AbManager>();
        let staking_port = Arc::new(StakingPortAdapter { staking: staking.clone(), cap: ab_cap });
        let op_registry_port = Arc::new(OperationRegistryPortAdapter { pending_removals: pending_removals.clone() });

        let betbook = Arc::new(Mutex::new(BetBook::new(
            staking_port,
            protocol_adapter.clone() as Arc<dyn photon_betbook::ProtocolPort>,
            op_registry_port,
            clock.clone(),
        )));

        let bet_cap = table.grant::<photon_types::BetManager>();
        let betbook_port = Arc::new(BetBookPortAdapter { betbook: betbook.clone(), cap: bet_cap, config: config.clone() });

        let transport = Arc::new(LoggingTransport);
        let endpoint_emitter = Arc::new(EndpointEmitter::new(
            transport,
            sink.clone() as Arc<dyn photon_endpoint_emitter::EventSink>,
        ));
        let endpoint_port = Arc::new(EndpointPortAdapter { emitter: endpoint_emitter.clone() });

        let block_source = Arc::new(CallSequence::new());
        let operation_registry = Arc::new(Mutex::new(OperationRegistry::new(
            protocol_adapter.clone() as Arc<dyn photon_operation_registry::ProtocolPort>,
            betbook_port.clone() as Arc<dyn photon_operation_registry::BetBookPort>,
            endpoint_port,
            sink.clone() as Arc<dyn photon_operation_registry::EventSink>,
            block_source.clone(),
        )));

        let stream_consensus = Arc::new(Mutex::new(StreamConsensus::new(
            protocol_adapter.clone() as Arc<dyn photon_stream_consensus::ProtocolPort>,
            betbook_port as Arc<dyn photon_stream_consensus::BetBookPort>,
            Arc::new(MajorityProcessingLib),
            sink as Arc<dyn photon_stream_consensus::EventSink>,
            clock.clone(),
        )));

        let round_cap = table.grant::<photon_types::RoundManager>();
        let round_trigger = table.grant::<photon_types::RoundTrigger>();
        let endpoint_cap = table.grant::<photon_types::Endpoint>();
        let round_coordinator = Arc::new(RoundCoordinator::new(
            staking.clone(),
            betbook.clone(),
            protocol_registry.clone(),
            operation_registry.clone(),
            stream_consensus.clone(),
            agent_directory.clone(),
            config.clone(),
            clock.clone(),
            round_cap,
        ));

        table.seal();

        Ok(Self {
            config,
            bus,
            staking,
            agent_directory,
            protocol_registry,
            betbook,
            operation_registry,
            stream_consensus,
            endpoint_emitter,
            round_coordinator,
            block_source,
            spotters: Arc::new(Mutex::new(HashMap::new())),
            clock,
            pending_removals,
            protocol_adapter,
            round_cap,
            round_trigger,
            endpoint_cap,
        })
    }

    /// Registers the gov protocol itself as the hub's self-addressed
    /// governance sink, admitted with no manual
    /// transmitter fee charged (the hub owns this protocol, not an
    /// external developer).
    pub fn bootstrap_gov_protocol(&self, owner: [u8; 20], manual_transmitters: Vec<TransmitterId>) -> Result<(), HubError> {
        let max = self.config.lock().max_transmitters_count;
        self.protocol_registry.lock().register_protocol(
            gov_protocol_id(),
            owner,
            ProtocolParams { max_transmitters: max, ..ProtocolParams::default() },
            manual_transmitters,
            max,
        )?;
        Ok(())
    }

    /// `registerProtocol`. Token-side fee charging
    /// is out of scope here (the ledger is a non-callback sink); this
    /// validates and admits the protocol.
    pub fn register_protocol(
        &self,
        protocol_id: ProtocolId,
        owner: [u8; 20],
        params: ProtocolParams,
        manual_transmitters: Vec<TransmitterId>,
    ) -> Result<(), HubError> {
        let max = self.config.lock().max_transmitters_count;
        self.protocol_registry
            .lock()
            .register_protocol(protocol_id, owner, params, manual_transmitters, max)?;
        Ok(())
    }

    /// Admits a new staking-eligible agent (creates a default `AgentInfo`),
    /// idempotent on an already-known agent.
    pub fn admit_agent(&self, agent: AgentId, fee: u32) -> Result<(), HubError> {
        self.staking.lock().admit_agent(agent, fee)?;
        self.staking.lock().set_approved(&agent, true)?;
        Ok(())
    }

    /// `declareProtocolSupport`, capped by the
    /// agent's current personal stake and `GlobalConfig::agent_stake_per_transmitter`.
    pub fn declare_protocol_support(
        &self,
        agent: AgentId,
        protocol_id: ProtocolId,
        transmitter: TransmitterId,
    ) -> Result<(), HubError> {
        let registry = self.protocol_registry.lock();
        let known_and_not_gov = !registry.is_gov(&protocol_id) && registry.get(&protocol_id).is_some();
        drop(registry);
        let personal_stake = self.staking.lock().agent(&agent).map(|a| a.personal_stake).unwrap_or_default();
        let stake_per_transmitter = self.config.lock().agent_stake_per_transmitter;
        self.agent_directory
            .lock()
            .declare_protocol_support(agent, protocol_id, transmitter, known_and_not_gov, personal_stake, stake_per_transmitter)?;
        Ok(())
    }

    /// `delegate`: claims pending rewards for the
    /// caller first, then moves stake. Returns the realized reward.
    pub fn delegate(&self, delegator: DelegatorId, agent: AgentId, amount: U256) -> Result<U256, HubError> {
        Ok(self.staking.lock().delegate(delegator, agent, amount)?)
    }

    /// Symmetric to [`Self::delegate`].
    pub fn withdraw(&self, delegator: DelegatorId, agent: AgentId, amount: U256) -> Result<U256, HubError> {
        Ok(self.staking.lock().withdraw(delegator, agent, amount)?)
    }

    pub fn deposit_personal_stake(&self, agent: AgentId, amount: U256) -> Result<(), HubError> {
        Ok(self.staking.lock().deposit_personal(agent, amount)?)
    }

    /// `proposeOperation`: advances the process-local
    /// call-sequence ("block + index" stand-in) before ingesting the proof,
    /// then drains any transmitter the resulting bet release queued for
    /// removal.
    pub fn propose_operation(&self, caller: TransmitterId, data: OperationData, sig: Signature) -> Result<OpHash, HubError> {
        self.block_source.advance();
        let result = self.operation_registry.lock().propose_operation(caller, data, sig);
        apply_pending_removals(&self.pending_removals, &self.operation_registry);
        Ok(result?)
    }

    /// `approveOperationExecuting`, watcher
    /// confirmation half.
    pub fn approve_operation_executing(&self, watcher: WatcherId, op_hash: OpHash) -> Result<(), HubError> {
        self.block_source.advance();
        let result = self.operation_registry.lock().approve_operation_executing(watcher, op_hash);
        apply_pending_removals(&self.pending_removals, &self.operation_registry);
        Ok(result?)
    }

    /// `proposeData`.
    pub fn propose_data(
        &self,
        protocol_id: ProtocolId,
        source_id: SourceId,
        data_key: DataKey,
        transmitter: TransmitterId,
        value: Vec<u8>,
    ) -> Result<bool, HubError> {
        let result = self.stream_consensus.lock().propose_data(protocol_id, source_id, data_key, transmitter, value);
        apply_pending_removals(&self.pending_removals, &self.operation_registry);
        Ok(result?)
    }

    /// `finalizeData`, followed by pushing the
    /// finalized datum into that `(protocol, source)`'s
    /// `MasterStreamDataSpotter` and recomputing its Merkle root.
    pub fn finalize_data(&self, protocol_id: ProtocolId, source_id: SourceId, data_key: DataKey) -> Result<Vec<u8>, HubError> {
        let finalized = self.stream_consensus.lock().finalize_data(protocol_id, source_id, data_key.clone())?;
        apply_pending_removals(&self.pending_removals, &self.operation_registry);

        let mut spotters = self.spotters.lock();
        let spotter = spotters.entry((protocol_id, source_id)).or_insert_with(|| {
            MasterStreamDataSpotter::new(protocol_id, source_id, Vec::new(), false, Arc::new(photon_stream_consensus::NullEventSink), self.clock.clone())
        });
        spotter.push_finalized_data(data_key, finalized.clone())?;
        spotter.recalculate_merkle_root()?;
        Ok(finalized)
    }

    /// `addExecutor`: records a gov-contract address
    /// for a protocol on a destination chain, once that chain is known to
    /// be configured (`chain_is_inited` is the caller's attestation that
    /// the chain itself is provisioned, independent of this protocol's own
    /// per-chain admission state machine in `OperationRegistry`).
    pub fn add_executor(&self, protocol_id: ProtocolId, chain_id: photon_types::ChainId, executor: photon_types::OpaqueAddr, chain_is_inited: bool) -> Result<(), HubError> {
        Ok(self.protocol_registry.lock().add_executor(protocol_id, chain_id, executor, chain_is_inited)?)
    }

    /// `removeExecutor`: forbidden for the last gov executor on a chain.
    pub fn remove_executor(&self, protocol_id: ProtocolId, chain_id: photon_types::ChainId, executor: &photon_types::OpaqueAddr) -> Result<(), HubError> {
        Ok(self.protocol_registry.lock().remove_executor(protocol_id, chain_id, executor)?)
    }

    fn owner_capability(&self, protocol_id: ProtocolId, caller: [u8; 20]) -> Result<photon_types::ProtocolOwnerCapability, HubError> {
        let owner = self.protocol_registry.lock().get(&protocol_id).map(|i| i.owner).ok_or(HubError::UnknownProtocol(protocol_id))?;
        if owner != caller {
            return Err(photon_protocol_registry::ProtocolRegistryError::IsNotOwner.into());
        }
        Ok(photon_types::ProtocolOwnerCapability(protocol_id))
    }

    /// `addAllowedProtocolAddress`: starts the
    /// per-`(protocol, chain)` admission state machine on its first call,
    /// queues on a chain still `OnInition`, and emits directly once
    /// `Inited`.
    pub fn add_allowed_protocol_address(
        &self,
        protocol_id: ProtocolId,
        caller: [u8; 20],
        chain_id: photon_types::ChainId,
        address: photon_types::OpaqueAddr,
    ) -> Result<(), HubError> {
        let cap = self.owner_capability(protocol_id, caller)?;
        self.operation_registry.lock().add_allowed_protocol_address(cap, chain_id, address);
        Ok(())
    }

    /// `addAllowedProposerAddress`, symmetric to [`Self::add_allowed_protocol_address`].
    pub fn add_allowed_proposer_address(
        &self,
        protocol_id: ProtocolId,
        caller: [u8; 20],
        chain_id: photon_types::ChainId,
        address: photon_types::OpaqueAddr,
    ) -> Result<(), HubError> {
        let cap = self.owner_capability(protocol_id, caller)?;
        self.operation_registry.lock().add_allowed_proposer_address(cap, chain_id, address);
        Ok(())
    }

    /// `handleAddAllowedProtocol`: the endpoint's
    /// callback confirming a chain finished onboarding. Transitions the
    /// `(protocol, chain)` pair to `Inited` and flushes every queued
    /// address/transmitter.
    pub fn handle_add_allowed_protocol(&self, protocol_id: ProtocolId, chain_id: photon_types::ChainId) {
        self.operation_registry.lock().handle_add_allowed_protocol(self.endpoint_cap, protocol_id, chain_id);
    }

    /// Re-derives a protocol's eligible transmitter set from the current
    /// stake snapshot and pushes it into `OperationRegistry`'s mirror,
    /// outside of a full round turn (e.g. right after a protocol is first
    /// admitted on a chain, before the next scheduled `turn_round`).
    pub fn sync_transmitters(&self, protocol_id: ProtocolId) {
        let selected = self.protocol_adapter.live_transmitters(protocol_id);
        self.operation_registry.lock().update_transmitters(self.round_cap, protocol_id, selected);
    }

    /// `OperationRegistry`'s own mirror of a protocol's current
    /// transmitter set (diff base for `update_transmitters`/
    /// `sync_transmitters`).
    pub fn current_transmitters(&self, protocol_id: ProtocolId) -> Vec<TransmitterId> {
        self.operation_registry.lock().current_transmitters(protocol_id)
    }

    pub fn merkle_root(&self, protocol_id: ProtocolId, source_id: SourceId) -> Option<[u8; 32]> {
        self.spotters.lock().get(&(protocol_id, source_id)).map(|s| s.merkle_root())
    }

    /// `turnRound()`, gated by
    /// `GlobalConfig::min_round_time_secs`.
    pub fn turn_round(&self) -> Result<RoundId, HubError> {
        Ok(self.round_coordinator.turn_round(self.round_trigger)?)
    }

    pub fn bet_type_msg() -> BetType {
        BetType::Msg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hub() -> Hub {
        let mut cfg = GlobalConfig::default();
        cfg.min_round_time_secs = 1;
        Hub::new(cfg).unwrap()
    }

    #[test]
    fn wiring_admits_agent_and_registers_protocol() {
        let hub = hub();
        let agent = AgentId([1u8; 20]);
        hub.admit_agent(agent, 1000).unwrap();
        assert!(hub.staking.lock().agent(&agent).is_some());

        let protocol_id = ProtocolId::from_tag("demo");
        hub.register_protocol(
            protocol_id,
            [9u8; 20],
            ProtocolParams { max_transmitters: 3, ..ProtocolParams::default() },
            vec![TransmitterId([2u8; 20])],
        )
        .unwrap();
        assert!(hub.protocol_registry.lock().get(&protocol_id).is_some());
    }

    #[test]
    fn delegate_then_declare_support_respects_cap() {
        let hub = hub();
        let agent = AgentId([3u8; 20]);
        hub.admit_agent(agent, 0).unwrap();
        hub.deposit_personal_stake(agent, U256::from(10u64)).unwrap();

        let protocol_id = ProtocolId::from_tag("demo2");
        hub.register_protocol(protocol_id, [9u8; 20], ProtocolParams { max_transmitters: 3, ..ProtocolParams::default() }, vec![TransmitterId([4u8; 20])])
            .unwrap();

        hub.declare_protocol_support(agent, protocol_id, TransmitterId([5u8; 20])).unwrap();
        assert_eq!(hub.agent_directory.lock().agent_for_transmitter(&TransmitterId([5u8; 20])), Some(agent));
    }

    #[test]
    fn gov_protocol_id_is_stable_and_nonzero() {
        assert!(!gov_protocol_id().is_zero());
        assert_eq!(gov_protocol_id(), gov_protocol_id());
    }

    #[test]
    fn turn_round_is_gated_by_min_interval() {
        let hub = hub();
        // the first turn always succeeds (last_round_timestamp starts at 0)
        hub.turn_round().unwrap();
        // A FixedClock isn't wired into this harness, so the real clock
        // may or may not have advanced a full second between these two
        // calls; both outcomes are spec-correct, so only assert the first
        // call's success above.
        let _ = hub.turn_round();
    }
}
