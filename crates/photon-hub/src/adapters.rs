//! Port adapters wiring the hub's concrete components across the trait
//! boundaries each component crate defines for itself. None of these
//! adapters hold a lock on
//! `OperationRegistry` or `BetBook` themselves — see the deadlock note on
//! [`PendingRemovals`] and [`ProtocolAdapter`].

use parking_lot::Mutex;
use photon_agent_directory::AgentDirectory;
use photon_betbook::{BetBook, BetType};
use photon_config::GlobalConfig;
use photon_protocol_registry::ProtocolRegistry;
use photon_staking::StakingLedger;
use photon_types::{AbManager, AgentId, BetManager, Capability, ChainId, OpaqueAddr, ProtocolId, TransmitterId};
use primitive_types::U256;
use std::sync::Arc;
use tracing::info;

/// Transmitters `BetBook::release_bets_and_reward` wants evicted from
/// `OperationRegistry` for inactivity, queued instead of applied inline.
///
/// `BetBook::release_bets_and_reward` is itself called from inside
/// `OperationRegistry::approve_operation_executing` (via its
/// `BetBookPort` adapter) and from `StreamConsensus::finalize_data`. If its
/// `OperationRegistryPort::remove_transmitter` adapter tried to lock
/// `OperationRegistry` directly, a hub entry point that already holds that
/// same lock would deadlock against itself — `parking_lot::Mutex` is not
/// reentrant. Every entry point that can reach `release_bets_and_reward`
/// must drain this queue with [`apply_pending_removals`] after it has
/// dropped its own `OperationRegistry` guard.
pub type PendingRemovals = Arc<Mutex<Vec<(ProtocolId, TransmitterId)>>>;

/// Drains `queue` and applies every removal against `registry`. Call this
/// only after releasing any lock guard the caller itself was holding on
/// `registry` — see [`PendingRemovals`].
pub fn apply_pending_removals(queue: &PendingRemovals, registry: &Mutex<photon_operation_registry::OperationRegistry>) {
    let drained = std::mem::take(&mut *queue.lock());
    if drained.is_empty() {
        return;
    }
    let mut registry = registry.lock();
    for (protocol_id, transmitter) in drained {
        registry.remove_transmitter(protocol_id, transmitter);
    }
}

/// Shared view of `ProtocolRegistry` + `StakingLedger` + `AgentDirectory`
/// implementing every component crate's own `ProtocolPort` variant on one
/// struct. The eligible-transmitter set is always recomputed live from
/// `StakingLedger::select_transmitters_for_protocol` rather than read from
/// `OperationRegistry`'s internal mirror, so this adapter never needs to
/// lock `OperationRegistry` — the same reentrancy hazard `PendingRemovals`
/// exists for would otherwise apply here too, since `OperationRegistry`
/// calls back into this port while its own lock is held.
pub struct ProtocolAdapter {
    pub registry: Arc<Mutex<ProtocolRegistry>>,
    pub staking: Arc<Mutex<StakingLedger>>,
    pub agents: Arc<Mutex<AgentDirectory>>,
    pub gov_protocol_id: ProtocolId,
}

impl ProtocolAdapter {
    /// Live-recomputed eligible transmitter set for a protocol
    /// (`selectTransmittersForProtocol`). Exposed beyond this
    /// module so `Hub` can re-sync `OperationRegistry`'s mirror outside a
    /// round turn (e.g. right after a protocol is admitted on a new chain).
    pub fn live_transmitters(&self, protocol_id: ProtocolId) -> Vec<TransmitterId> {
        let registry = self.registry.lock();
        let Some(info) = registry.get(&protocol_id) else { return Vec::new() };
        let is_gov = registry.is_gov(&protocol_id);
        let manual = info.manual_transmitters.clone();
        let max_transmitters = info.active.max_transmitters as usize;
        let min_delegate = info.active.min_delegate_stake;
        let min_personal = info.active.min_personal_stake;
        let paused = info.paused;
        drop(registry);

        let declared = self.agents.lock().declared_for_protocol(&protocol_id);
        self.staking
            .lock()
            .select_transmitters_for_protocol(&manual, is_gov, max_transmitters, min_delegate, min_personal, paused, &declared)
    }
}

impl photon_betbook::ProtocolPort for ProtocolAdapter {
    fn is_gov(&self, protocol_id: ProtocolId) -> bool {
        self.registry.lock().is_gov(&protocol_id)
    }
    fn is_paused(&self, protocol_id: ProtocolId) -> bool {
        self.registry.lock().is_paused(&protocol_id)
    }
    fn is_manual_transmitter(&self, protocol_id: ProtocolId, transmitter: TransmitterId) -> bool {
        self.registry.lock().get(&protocol_id).map(|i| i.manual_transmitters.contains(&transmitter)).unwrap_or(false)
    }
    fn agent_for_transmitter(&self, transmitter: TransmitterId) -> Option<AgentId> {
        self.agents.lock().agent_for_transmitter(&transmitter)
    }
    fn bet_amount(&self, protocol_id: ProtocolId, bet_type: BetType) -> U256 {
        self.registry
            .lock()
            .get(&protocol_id)
            .map(|i| match bet_type {
                BetType::Msg => i.active.bet_amount_msg,
                BetType::Data => i.active.bet_amount_data,
            })
            .unwrap_or_default()
    }
    fn reward_amount(&self, protocol_id: ProtocolId, bet_type: BetType, is_first: bool) -> U256 {
        self.registry
            .lock()
            .get(&protocol_id)
            .map(|i| match (bet_type, is_first) {
                (BetType::Msg, true) => i.active.reward_msg_first,
                (BetType::Msg, false) => i.active.reward_msg,
                (BetType::Data, true) => i.active.reward_data_first,
                (BetType::Data, false) => i.active.reward_data,
            })
            .unwrap_or_default()
    }
    fn min_personal_amount(&self, protocol_id: ProtocolId) -> U256 {
        self.registry.lock().get(&protocol_id).map(|i| i.active.min_personal_stake).unwrap_or_default()
    }
    fn deduce_fee(&self, protocol_id: ProtocolId, amount: U256) -> bool {
        self.registry.lock().deduce_fee(protocol_id, amount)
    }
    fn protocol_fee(&self, protocol_id: ProtocolId) -> U256 {
        self.registry.lock().get(&protocol_id).map(|i| i.fee).unwrap_or_default()
    }
    fn credit_system_fee(&self, amount: U256) {
        self.staking.lock().credit_fee(amount);
    }
    fn current_transmitters(&self, protocol_id: ProtocolId) -> Vec<TransmitterId> {
        self.live_transmitters(protocol_id)
    }
}

impl photon_operation_registry::ProtocolPort for ProtocolAdapter {
    fn is_gov(&self, protocol_id: ProtocolId) -> bool {
        self.registry.lock().is_gov(&protocol_id)
    }
    fn is_transmitter_allowed(&self, protocol_id: ProtocolId, transmitter: TransmitterId) -> bool {
        self.live_transmitters(protocol_id).contains(&transmitter)
    }
    fn current_transmitters(&self, protocol_id: ProtocolId) -> Vec<TransmitterId> {
        self.live_transmitters(protocol_id)
    }
    fn consensus_target_rate(&self, protocol_id: ProtocolId) -> u32 {
        self.registry
            .lock()
            .get(&protocol_id)
            .map(|i| i.active.consensus_target_rate)
            .unwrap_or(photon_types::DEFAULT_WATCHER_CONSENSUS_RATE)
    }
    fn gov_address(&self, dest_chain_id: ChainId) -> Option<OpaqueAddr> {
        self.registry.lock().get(&self.gov_protocol_id)?.executors.get(&dest_chain_id)?.first().cloned()
    }
}

impl photon_stream_consensus::ProtocolPort for ProtocolAdapter {
    fn current_transmitters(&self, protocol_id: ProtocolId) -> Vec<TransmitterId> {
        self.live_transmitters(protocol_id)
    }
    fn consensus_target_rate(&self, protocol_id: ProtocolId) -> u32 {
        self.registry
            .lock()
            .get(&protocol_id)
            .map(|i| i.active.consensus_target_rate)
            .unwrap_or(photon_types::DEFAULT_WATCHER_CONSENSUS_RATE)
    }
}

/// `BetBook`'s view of `StakingLedger`, exercised under `Capability<AbManager>`.
pub struct StakingPortAdapter {
    pub staking: Arc<Mutex<StakingLedger>>,
    pub cap: Capability<AbManager>,
}

fn map_staking_err(e: photon_staking::StakingError) -> photon_betbook::BetBookError {
    use photon_betbook::BetBookError;
    use photon_staking::StakingError;
    match e {
        StakingError::InsufficientPersonalStake => BetBookError::InsufficientPersonalStake,
        StakingError::UnlockTooMuch => BetBookError::UnlockTooMuch,
        // No dedicated BetBookError variant for an unknown/unapproved agent
        // reaching this far; treat it the same as "no agent declared".
        _ => BetBookError::AgentNotFound,
    }
}

impl photon_betbook::StakingPort for StakingPortAdapter {
    fn lock_agent_stake(&self, agent: AgentId, amount: U256) -> Result<(), photon_betbook::BetBookError> {
        self.staking.lock().lock_agent_stake(self.cap, agent, amount).map_err(map_staking_err)
    }
    fn unlock_agent_stake(&self, agent: AgentId, amount: U256) -> Result<(), photon_betbook::BetBookError> {
        self.staking.lock().unlock_agent_stake(self.cap, agent, amount).map_err(map_staking_err)
    }
    fn slash(&self, agent: AgentId, amount: U256) -> Result<U256, photon_betbook::BetBookError> {
        self.staking.lock().slash(self.cap, agent, amount).map_err(map_staking_err)
    }
    fn forfeit_locked(&self, agent: AgentId, amount: U256) -> Result<U256, photon_betbook::BetBookError> {
        self.staking.lock().forfeit_locked(self.cap, agent, amount).map_err(map_staking_err)
    }
}

/// `BetBook`'s view of `OperationRegistry::remove_transmitter`: pushes onto
/// the shared [`PendingRemovals`] queue instead of locking the registry
/// directly.
pub struct OperationRegistryPortAdapter {
    pub pending_removals: PendingRemovals,
}

impl photon_betbook::OperationRegistryPort for OperationRegistryPortAdapter {
    fn remove_transmitter(&self, protocol_id: ProtocolId, transmitter: TransmitterId) {
        self.pending_removals.lock().push((protocol_id, transmitter));
    }
}

/// `OperationRegistry`'s and `StreamConsensus`'s shared view of `BetBook`,
/// exercised under `Capability<BetManager>`. `slashing_border` is read from
/// `GlobalConfig` at call time since the narrower external ports don't
/// carry it as a parameter.
pub struct BetBookPortAdapter {
    pub betbook: Arc<Mutex<BetBook>>,
    pub cap: Capability<BetManager>,
    pub config: Arc<Mutex<GlobalConfig>>,
}

impl photon_operation_registry::BetBookPort for BetBookPortAdapter {
    fn place_bet(
        &self,
        protocol_id: ProtocolId,
        transmitter: TransmitterId,
        bet_type: BetType,
        op_hash: photon_types::OpHash,
    ) -> Result<(), photon_operation_registry::OperationRegistryError> {
        self.betbook
            .lock()
            .place_bet(self.cap, protocol_id, transmitter, bet_type, op_hash)
            .map_err(|_| photon_operation_registry::OperationRegistryError::BetBookCallFailed)
    }
    fn refund_bet(&self, protocol_id: ProtocolId, op_hash: photon_types::OpHash, transmitter: TransmitterId) {
        if let Err(e) = self.betbook.lock().refund_bet(self.cap, protocol_id, op_hash, transmitter) {
            tracing::warn!(?protocol_id, ?transmitter, %e, "refund_bet failed");
        }
    }
    fn release_bets_and_reward(&self, protocol_id: ProtocolId, winners: &[TransmitterId], op_hash: photon_types::OpHash) {
        let slashing_border = self.config.lock().slashing_border;
        if let Err(e) = self.betbook.lock().release_bets_and_reward(self.cap, protocol_id, winners, op_hash, slashing_border) {
            tracing::warn!(?protocol_id, %e, "release_bets_and_reward failed");
        }
    }
}

impl photon_stream_consensus::BetBookPort for BetBookPortAdapter {
    fn place_bet(
        &self,
        protocol_id: ProtocolId,
        transmitter: TransmitterId,
        bet_type: BetType,
        op_hash: photon_types::OpHash,
    ) -> Result<(), photon_stream_consensus::StreamConsensusError> {
        self.betbook
            .lock()
            .place_bet(self.cap, protocol_id, transmitter, bet_type, op_hash)
            .map_err(|_| photon_stream_consensus::StreamConsensusError::BetBookCallFailed)
    }
    fn release_bets_and_reward(&self, protocol_id: ProtocolId, winners: &[TransmitterId], op_hash: photon_types::OpHash) {
        let slashing_border = self.config.lock().slashing_border;
        if let Err(e) = self.betbook.lock().release_bets_and_reward(self.cap, protocol_id, winners, op_hash, slashing_border) {
            tracing::warn!(?protocol_id, %e, "release_bets_and_reward failed");
        }
    }
}

/// `OperationRegistry`'s view of `EndpointEmitter`.
pub struct EndpointPortAdapter {
    pub emitter: Arc<photon_endpoint_emitter::EndpointEmitter>,
}

impl photon_operation_registry::EndpointPort for EndpointPortAdapter {
    fn emit(&self, gov_protocol_id: ProtocolId, chain_id: ChainId, dest_gov_address: OpaqueAddr, message: photon_types::GovMessage) {
        if let Err(e) = self.emitter.emit(gov_protocol_id, chain_id, dest_gov_address, message) {
            tracing::warn!(?gov_protocol_id, %chain_id, %e, "gov message emit failed");
        }
    }
}

/// Default `EndpointTransport`: no production RPC client is shipped by any
/// crate in this workspace (wiring one is explicitly out of scope — see
/// `photon-endpoint-emitter/src/ports.rs`), so the hub logs the outbound
/// call instead of silently dropping it.
#[derive(Debug, Default)]
pub struct LoggingTransport;

impl photon_endpoint_emitter::ports::EndpointTransport for LoggingTransport {
    fn send(&self, chain_id: ChainId, dest_gov_address: OpaqueAddr, wire_bytes: Vec<u8>) {
        info!(%chain_id, ?dest_gov_address, bytes = wire_bytes.len(), "endpoint transport: no production sink wired, logging instead");
    }
}
