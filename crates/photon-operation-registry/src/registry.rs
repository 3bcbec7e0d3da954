//! OperationRegistry: the central object — operation
//! ingestion, proof aggregation, round-aware proof rotation, watcher
//! execution confirmation, in-order nonce tracking, and the per-chain
//! protocol admission state machine.

use crate::error::OperationRegistryError as Error;
use crate::events::{EventSink, OperationEvent};
use crate::ports::{BetBookPort, BlockSource, EndpointPort, ProtocolPort};
use crate::types::{InitState, Operation, PendingAdmission};
use photon_betbook::BetType;
use photon_crypto::{eth_signed_digest, verify_signer, Identity};
use photon_types::{
    constants::{MAX_CONSENSUS_RATE, MIN_CONSENSUS_RATE_EXCLUSIVE, RATE_SCALE},
    Admin, ActorKind, Capability, ChainId, Endpoint, GovMessage, OpHash, OpaqueAddr, OperationData,
    ProtocolId, ProtocolOwnerCapability, RoundId, RoundManager, TransmitterId, WatcherId, FIRST_ROUND,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub struct OperationRegistry {
    operations: HashMap<OpHash, Operation>,
    admission: HashMap<(ProtocolId, ChainId), InitState>,
    pending: HashMap<(ProtocolId, ChainId), PendingAdmission>,
    /// This crate's own mirror of each protocol's current transmitter set,
    /// fed by [`Self::update_transmitters`]; used to diff additions and
    /// removals and to derive the global watcher set.
    current_transmitters: HashMap<ProtocolId, HashSet<TransmitterId>>,
    watcher_refcount: HashMap<WatcherId, u32>,
    last_executed_nonce_in_order: HashMap<(ProtocolId, ChainId), primitive_types::U256>,
    watchers_consensus_target_rate: u32,
    current_round: RoundId,

    protocol: Arc<dyn ProtocolPort>,
    betbook: Arc<dyn BetBookPort>,
    endpoint: Arc<dyn EndpointPort>,
    events: Arc<dyn EventSink>,
    blocks: Arc<dyn BlockSource>,
}

impl OperationRegistry {
    pub fn new(
        protocol: Arc<dyn ProtocolPort>,
        betbook: Arc<dyn BetBookPort>,
        endpoint: Arc<dyn EndpointPort>,
        events: Arc<dyn EventSink>,
        blocks: Arc<dyn BlockSource>,
    ) -> Self {
        Self {
            operations: HashMap::new(),
            admission: HashMap::new(),
            pending: HashMap::new(),
            current_transmitters: HashMap::new(),
            watcher_refcount: HashMap::new(),
            last_executed_nonce_in_order: HashMap::new(),
            watchers_consensus_target_rate: photon_types::constants::DEFAULT_WATCHER_CONSENSUS_RATE,
            current_round: FIRST_ROUND,
            protocol,
            betbook,
            endpoint,
            events,
            blocks,
        }
    }

    pub fn operation(&self, op_hash: &OpHash) -> Option<&Operation> {
        self.operations.get(op_hash)
    }

    pub fn admission_state(&self, protocol_id: ProtocolId, chain_id: ChainId) -> InitState {
        self.admission
            .get(&(protocol_id, chain_id))
            .copied()
            .unwrap_or(InitState::NotInited)
    }

    pub fn last_executed_nonce_in_order(&self, protocol_id: ProtocolId, chain_id: ChainId) -> Option<primitive_types::U256> {
        self.last_executed_nonce_in_order.get(&(protocol_id, chain_id)).copied()
    }

    pub fn watchers_consensus_target_rate(&self) -> u32 {
        self.watchers_consensus_target_rate
    }

    /// This crate's own mirror of a protocol's current transmitter set, as
    /// last pushed through [`Self::update_transmitters`]. Callers outside
    /// this crate (e.g. `BetBook`'s view of "who missed this bet") read it
    /// through this getter rather than recomputing it themselves.
    pub fn current_transmitters(&self, protocol_id: ProtocolId) -> Vec<TransmitterId> {
        self.current_transmitters.get(&protocol_id).map(|s| s.iter().copied().collect()).unwrap_or_default()
    }

    /// `setWatchersConsensusTargetRate`, admin-only.
    pub fn set_watchers_consensus_target_rate(&mut self, _cap: Capability<Admin>, rate: u32) -> Result<(), Error> {
        if rate <= MIN_CONSENSUS_RATE_EXCLUSIVE || rate > MAX_CONSENSUS_RATE {
            return Err(Error::InvalidConsensusRate);
        }
        self.watchers_consensus_target_rate = rate;
        Ok(())
    }

    /// Stamped by `RoundCoordinator` as part of its `turnRound` sequence,
    /// right after `StakingLedger::turn_round` advances the round.
    pub fn set_current_round(&mut self, _cap: Capability<RoundManager>, round: RoundId) {
        self.current_round = round;
    }

    /// `proposeOperation(opData, sig)`.
    #[instrument(skip(self, data, sig))]
    pub fn propose_operation(
        &mut self,
        caller: TransmitterId,
        data: OperationData,
        sig: photon_crypto::Signature,
    ) -> Result<OpHash, Error> {
        data.validate_sizes().map_err(|_| Error::InvalidOperationData)?;
        let protocol_id = data.protocol_id;

        if !self.protocol.is_transmitter_allowed(protocol_id, caller) {
            return Err(Error::TransmitterIsNotAllowed);
        }
        if self.admission_state(protocol_id, data.dest_chain_id) != InitState::Inited {
            return Err(Error::ProtocolIsNotInitedOnChain);
        }
        if self.protocol.gov_address(data.dest_chain_id).is_none() {
            return Err(Error::UnknownGovAddress);
        }

        let packed = data.pack();
        let op_hash = OpHash(eth_signed_digest(&packed));
        let caller_identity: Identity = caller.0;
        if !verify_signer(&op_hash.0, &sig, &caller_identity) {
            return Err(Error::SignatureCheckFailed);
        }

        self.betbook
            .place_bet(protocol_id, caller, BetType::Msg, op_hash)
            .map_err(|_| Error::BetBookCallFailed)?;

        let current_block = self.blocks.current_block();

        if !self.operations.contains_key(&op_hash) {
            let op = Operation::seed(data, self.current_round, caller, sig);
            self.operations.insert(op_hash, op);
            self.events.emit(OperationEvent::NewOperation { protocol_id, op_hash });
            self.maybe_approve(protocol_id, op_hash, current_block);
            return Ok(op_hash);
        }

        let was_approved = self.ingest_known_proof(protocol_id, op_hash, current_block, caller, sig)?;
        self.events.emit(OperationEvent::NewProof { protocol_id, op_hash, transmitter: caller });
        if !was_approved {
            self.maybe_approve(protocol_id, op_hash, current_block);
        }
        Ok(op_hash)
    }

    fn ingest_known_proof(
        &mut self,
        protocol_id: ProtocolId,
        op_hash: OpHash,
        current_block: u64,
        caller: TransmitterId,
        sig: photon_crypto::Signature,
    ) -> Result<bool, Error> {
        let op = self.operations.get_mut(&op_hash).expect("checked by caller");
        let was_approved = op.approved;

        if op.approved {
            if current_block > op.approve_block + 1 {
                return Err(Error::OperationIsAlreadyApproved);
            }
            if op.has_proof_from(caller) {
                return Err(Error::TransmitterIsAlreadyApproved);
            }
            op.proofs.push((caller, sig));
            op.proofs_count += 1;
            return Ok(was_approved);
        }

        if op.has_proof_from(caller) {
            return Err(Error::TransmitterIsAlreadyApproved);
        }

        if op.round != self.current_round {
            let mut kept = Vec::with_capacity(op.proofs.len());
            for (t, s) in op.proofs.drain(..) {
                if self.protocol.is_transmitter_allowed(protocol_id, t) {
                    kept.push((t, s));
                } else {
                    self.betbook.refund_bet(protocol_id, op_hash, t);
                }
            }
            kept.push((caller, sig));
            let op = self.operations.get_mut(&op_hash).expect("checked by caller");
            op.proofs_count = kept.len() as u32;
            op.proofs = kept;
            op.round = self.current_round;
        } else {
            op.proofs.push((caller, sig));
            op.proofs_count += 1;
        }
        Ok(was_approved)
    }

    fn maybe_approve(&mut self, protocol_id: ProtocolId, op_hash: OpHash, current_block: u64) {
        let rate = self.protocol.consensus_target_rate(protocol_id);
        let total = self.protocol.current_transmitters(protocol_id).len() as u64;
        if total == 0 {
            return;
        }
        let op = self.operations.get_mut(&op_hash).expect("exists");
        if op.approved {
            return;
        }
        if (op.proofs_count as u64) * (RATE_SCALE as u64) >= (rate as u64) * total {
            op.approved = true;
            op.approve_block = current_block;
            info!(?protocol_id, ?op_hash, approve_block = current_block, "operation approved");
            self.events.emit(OperationEvent::ProposalApproved { protocol_id, op_hash, approve_block: current_block });
        }
    }

    /// `approveOperationExecuting(opHash)` by a whitelisted watcher.
    #[instrument(skip(self))]
    pub fn approve_operation_executing(&mut self, watcher: WatcherId, op_hash: OpHash) -> Result<(), Error> {
        if !self.is_watcher_allowed(watcher) {
            return Err(Error::WatcherIsNotAllowed);
        }
        let op = self.operations.get_mut(&op_hash).ok_or(Error::UnknownOperation)?;
        if op.executed {
            // Soft no-op: an already-executed op is accepted silently so
            // racing watchers are never penalized.
            return Ok(());
        }
        if !op.approved {
            return Err(Error::OpIsNotApproved);
        }
        if op.has_watcher(watcher) {
            return Err(Error::WatcherIsAlreadyApproved);
        }
        op.watchers.push(watcher);
        op.watcher_count += 1;

        let total_watchers = self.watcher_refcount.len() as u64;
        let watcher_count = op.watcher_count as u64;
        let threshold_met = total_watchers > 0
            && watcher_count * (RATE_SCALE as u64) >= (self.watchers_consensus_target_rate as u64) * total_watchers;

        if !threshold_met {
            return Ok(());
        }

        let protocol_id = op.data.protocol_id;
        let src_chain_id = op.data.src_chain_id;
        let nonce = op.data.nonce;
        let in_order = photon_meta_codec::is_in_order(op.data.meta);
        let winners: Vec<TransmitterId> = op.proofs.iter().map(|(t, _)| *t).collect();
        op.executed = true;

        if in_order {
            self.last_executed_nonce_in_order.insert((protocol_id, src_chain_id), nonce);
        }
        self.betbook.release_bets_and_reward(protocol_id, &winners, op_hash);
        info!(?protocol_id, ?op_hash, "operation executed");
        self.events.emit(OperationEvent::ProposalExecuted { protocol_id, op_hash });
        Ok(())
    }

    fn is_watcher_allowed(&self, watcher: WatcherId) -> bool {
        self.watcher_refcount.get(&watcher).copied().unwrap_or(0) > 0
    }

    /// `updateTransmitters(protocolId, newSet)`.
    /// Diffs the previously-recorded set against `new_set`: removed
    /// transmitters lose a watcher-set reference, added ones gain one; the
    /// narrowest governance message (add/remove/update) is emitted for
    /// every `Inited` chain, and the full new set is queued for every
    /// `OnInition` chain (the fixed version of the source's queued-index
    /// mixup: the intended behavior is to copy the whole current set).
    #[instrument(skip(self, new_set))]
    pub fn update_transmitters(&mut self, _cap: Capability<RoundManager>, protocol_id: ProtocolId, new_set: Vec<TransmitterId>) {
        let old: HashSet<TransmitterId> = self.current_transmitters.get(&protocol_id).cloned().unwrap_or_default();
        let new: HashSet<TransmitterId> = new_set.iter().copied().collect();

        let added: Vec<TransmitterId> = new.difference(&old).copied().collect();
        let removed: Vec<TransmitterId> = old.difference(&new).copied().collect();

        for t in &removed {
            self.dec_watcher(*t);
        }
        for t in &added {
            self.inc_watcher(*t);
        }
        self.current_transmitters.insert(protocol_id, new);

        for chain_id in self.chains_for_protocol(protocol_id) {
            match self.admission_state(protocol_id, chain_id) {
                InitState::Inited => {
                    let Some(addr) = self.protocol.gov_address(chain_id) else { continue };
                    let message = match (!added.is_empty(), !removed.is_empty()) {
                        (true, true) => GovMessage::UpdateTransmitters {
                            protocol_id,
                            to_add: added.clone(),
                            to_remove: removed.clone(),
                        },
                        (true, false) => GovMessage::AddOrRemoveTransmitters { protocol_id, transmitters: added.clone(), add: true },
                        (false, true) => GovMessage::AddOrRemoveTransmitters { protocol_id, transmitters: removed.clone(), add: false },
                        (false, false) => continue,
                    };
                    self.endpoint.emit(protocol_id, chain_id, addr, message);
                }
                InitState::OnInition => {
                    self.pending.entry((protocol_id, chain_id)).or_default().transmitters = new_set.clone();
                }
                InitState::NotInited => {}
            }
        }
        self.events.emit(OperationEvent::UpdateTransmitters { protocol_id });
    }

    /// Propagates a protocol's post-`turnRound` consensus-rate change to
    /// every `Inited` chain, driven by
    /// `ProtocolRegistry::turn_round`'s `PendingAction::PropagateConsensusRate`.
    #[instrument(skip(self))]
    pub fn propagate_consensus_rate(&mut self, _cap: Capability<RoundManager>, protocol_id: ProtocolId, new_rate: u32) {
        for chain_id in self.chains_for_protocol(protocol_id) {
            if self.admission_state(protocol_id, chain_id) == InitState::Inited {
                if let Some(addr) = self.protocol.gov_address(chain_id) {
                    self.endpoint.emit(
                        protocol_id,
                        chain_id,
                        addr,
                        GovMessage::SetConsensusTargetRate { protocol_id, consensus_target_rate: new_rate },
                    );
                }
            }
        }
    }

    /// Called by `BetBook` (through its own `OperationRegistryPort`
    /// adapter) on the `slashingBorder`-th consecutive inactivity miss.
    pub fn remove_transmitter(&mut self, protocol_id: ProtocolId, transmitter: TransmitterId) {
        let Some(set) = self.current_transmitters.get_mut(&protocol_id) else { return };
        if set.remove(&transmitter) {
            self.dec_watcher(transmitter);
            self.events.emit(OperationEvent::RemoveTransmitter { protocol_id, transmitter });
            warn!(?protocol_id, ?transmitter, "transmitter removed for inactivity");
        }
    }

    fn inc_watcher(&mut self, transmitter: TransmitterId) {
        *self.watcher_refcount.entry(WatcherId(transmitter.0)).or_insert(0) += 1;
    }

    fn dec_watcher(&mut self, transmitter: TransmitterId) {
        let watcher = WatcherId(transmitter.0);
        if let Some(count) = self.watcher_refcount.get_mut(&watcher) {
            *count -= 1;
            if *count == 0 {
                self.watcher_refcount.remove(&watcher);
            }
        }
    }

    fn chains_for_protocol(&self, protocol_id: ProtocolId) -> Vec<ChainId> {
        self.admission
            .keys()
            .filter(|(p, _)| *p == protocol_id)
            .map(|(_, c)| *c)
            .collect()
    }

    fn ensure_admission_started(&mut self, protocol_id: ProtocolId, chain_id: ChainId) {
        let needs_start = !matches!(self.admission.get(&(protocol_id, chain_id)), Some(InitState::OnInition) | Some(InitState::Inited));
        if needs_start {
            self.admission.insert((protocol_id, chain_id), InitState::OnInition);
            let rate = self.protocol.consensus_target_rate(protocol_id);
            let transmitters = self.protocol.current_transmitters(protocol_id);
            if let Some(addr) = self.protocol.gov_address(chain_id) {
                self.endpoint.emit(
                    protocol_id,
                    chain_id,
                    addr,
                    GovMessage::AddAllowedProtocol { protocol_id, consensus_target_rate: rate, transmitters },
                );
            }
        }
    }

    /// `addAllowedProtocolAddress`, protocol-owner-gated.
    pub fn add_allowed_protocol_address(&mut self, cap: ProtocolOwnerCapability, chain_id: ChainId, address: OpaqueAddr) {
        let protocol_id = cap.0;
        self.ensure_admission_started(protocol_id, chain_id);
        match self.admission_state(protocol_id, chain_id) {
            InitState::Inited => {
                if let Some(addr) = self.protocol.gov_address(chain_id) {
                    self.endpoint.emit(
                        protocol_id,
                        chain_id,
                        addr,
                        GovMessage::AddOrRemoveActorAddress {
                            protocol_id,
                            actor_address: address,
                            kind: ActorKind::Protocol,
                            add: true,
                        },
                    );
                }
                self.events.emit(OperationEvent::AddAllowedProtocolAddress { protocol_id, chain_id });
            }
            InitState::OnInition | InitState::NotInited => {
                self.pending.entry((protocol_id, chain_id)).or_default().protocol_addresses.push(address);
            }
        }
    }

    /// `addAllowedProposerAddress`, protocol-owner-gated.
    pub fn add_allowed_proposer_address(&mut self, cap: ProtocolOwnerCapability, chain_id: ChainId, address: OpaqueAddr) {
        let protocol_id = cap.0;
        self.ensure_admission_started(protocol_id, chain_id);
        match self.admission_state(protocol_id, chain_id) {
            InitState::Inited => {
                if let Some(addr) = self.protocol.gov_address(chain_id) {
                    self.endpoint.emit(
                        protocol_id,
                        chain_id,
                        addr,
                        GovMessage::AddOrRemoveActorAddress {
                            protocol_id,
                            actor_address: address,
                            kind: ActorKind::Proposer,
                            add: true,
                        },
                    );
                }
                self.events.emit(OperationEvent::AddAllowedProposerAddress { protocol_id, chain_id });
            }
            InitState::OnInition | InitState::NotInited => {
                self.pending.entry((protocol_id, chain_id)).or_default().proposer_addresses.push(address);
            }
        }
    }

    /// `handleAddAllowedProtocol(chainId)` callback from the endpoint
    ///: transitions to `Inited` and flushes the
    /// three queues in order.
    pub fn handle_add_allowed_protocol(&mut self, _cap: Capability<Endpoint>, protocol_id: ProtocolId, chain_id: ChainId) {
        self.admission.insert((protocol_id, chain_id), InitState::Inited);
        let Some(pending) = self.pending.remove(&(protocol_id, chain_id)) else { return };
        let Some(addr) = self.protocol.gov_address(chain_id) else { return };

        for proto_addr in pending.protocol_addresses {
            self.endpoint.emit(
                protocol_id,
                chain_id,
                addr.clone(),
                GovMessage::AddOrRemoveActorAddress {
                    protocol_id,
                    actor_address: proto_addr,
                    kind: ActorKind::Protocol,
                    add: true,
                },
            );
        }
        for proposer_addr in pending.proposer_addresses {
            self.endpoint.emit(
                protocol_id,
                chain_id,
                addr.clone(),
                GovMessage::AddOrRemoveActorAddress {
                    protocol_id,
                    actor_address: proposer_addr,
                    kind: ActorKind::Proposer,
                    add: true,
                },
            );
        }

        let allowed: HashSet<TransmitterId> = self.protocol.current_transmitters(protocol_id).into_iter().collect();
        let filtered: Vec<TransmitterId> = pending.transmitters.into_iter().filter(|t| allowed.contains(t)).collect();
        if !filtered.is_empty() {
            self.endpoint.emit(
                protocol_id,
                chain_id,
                addr,
                GovMessage::AddOrRemoveTransmitters { protocol_id, transmitters: filtered, add: true },
            );
        }
    }
}
