//! # Hub Scenario Tests
//!
//! End-to-end scenarios driven against a fully wired [`photon_hub::Hub`] —
//! no mocked ports, no direct subsystem calls. Each test plays out a
//! concrete flow from Photon Hub's external entry points: propose an
//! operation, gather proofs, confirm execution with watchers, propose and
//! finalize stream data.
//!
//! ## Test Strategy
//!
//! Every scenario wires its own `Hub`, admits a protocol on one
//! destination chain through the real admission state machine
//! (`addAllowedProtocolAddress` -> `handleAddAllowedProtocol` ->
//! `turnRound`), then exercises the behavior under test. Transmitters are
//! real secp256k1 keypairs recovered the same way the hub recovers them,
//! not placeholder byte arrays, so signature checks are exercised for
//! real.

use k256::ecdsa::{signature::hazmat::PrehashSigner, RecoveryId, Signature as K256Signature, SigningKey, VerifyingKey};
use photon_config::GlobalConfig;
use photon_crypto::{eth_signed_digest, Signature};
use photon_hub::Hub;
use photon_protocol_registry::ProtocolParams;
use photon_types::{
    AgentId, ChainId, FunctionSelector, OpaqueAddr, OperationData, ProtocolId, TransmitterId,
};
use primitive_types::U256;
use sha3::{Digest, Keccak256};

/// A transmitter's real keypair plus its recovered on-hub identity.
struct Signer {
    key: SigningKey,
    id: TransmitterId,
}

impl Signer {
    fn new() -> Self {
        let key = SigningKey::random(&mut rand::thread_rng());
        let verifying = VerifyingKey::from(&key);
        Self { key, id: TransmitterId(identity_from_verifying_key(&verifying)) }
    }

    fn sign(&self, digest: &[u8; 32]) -> Signature {
        let (sig, recid): (K256Signature, RecoveryId) = self.key.sign_prehash_recoverable(digest).unwrap();
        let bytes = sig.to_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);
        Signature::new(r, s, recid.to_byte() + 27)
    }
}

/// Same derivation `photon-crypto` uses internally: low 20 bytes of
/// `keccak(uncompressed_pubkey[1..])`.
fn identity_from_verifying_key(key: &VerifyingKey) -> [u8; 20] {
    let uncompressed = key.to_encoded_point(false);
    let mut hasher = Keccak256::new();
    hasher.update(&uncompressed.as_bytes()[1..]);
    let hash: [u8; 32] = hasher.finalize().into();
    let mut out = [0u8; 20];
    out.copy_from_slice(&hash[12..]);
    out
}

fn test_config() -> GlobalConfig {
    let mut cfg = GlobalConfig::default();
    // The first `turn_round()` always succeeds (last_round_timestamp
    // starts at 0); a short interval just keeps `GlobalConfig::validate`
    // happy without requiring these tests to wait a real hour.
    cfg.min_round_time_secs = 1;
    cfg
}

/// `requireParamsValid` caps how many manual
/// seats a non-gov protocol may hold relative to its `max_transmitters`
/// and consensus rate: `manual.len() <= floor(max * (10000 - rate) /
/// 10000) + 1`. Picks a `max_transmitters` generous enough that an
/// all-manual roster of `manual_count` seats always clears that cap.
fn max_transmitters_for(manual_count: u32, consensus_target_rate: u32) -> u32 {
    if manual_count <= 1 {
        return manual_count.max(1);
    }
    let needed = (manual_count as u64 - 1) * 10_000 / (10_000 - consensus_target_rate as u64) + 1;
    needed as u32
}

/// Registers `protocol_id` with `manual_transmitters`, runs it through the
/// admission state machine on `chain_id` against a gov contract address
/// already recorded for that chain, then runs one `turn_round()` so
/// `OperationRegistry`'s transmitter/watcher mirror is populated. Mirrors
/// the sequence a protocol owner plus the hub's own scheduler would
/// perform in production.
fn admit_protocol(
    hub: &Hub,
    protocol_id: ProtocolId,
    owner: [u8; 20],
    chain_id: ChainId,
    manual_transmitters: Vec<TransmitterId>,
    consensus_target_rate: u32,
) {
    let max_transmitters = max_transmitters_for(manual_transmitters.len() as u32, consensus_target_rate);
    hub.register_protocol(
        protocol_id,
        owner,
        ProtocolParams { consensus_target_rate, max_transmitters, ..ProtocolParams::default() },
        manual_transmitters,
    )
    .expect("register_protocol");

    hub.add_allowed_protocol_address(protocol_id, owner, chain_id, OpaqueAddr::new(vec![0xAB; 20]))
        .expect("add_allowed_protocol_address");
    hub.handle_add_allowed_protocol(protocol_id, chain_id);
    hub.turn_round().expect("turn_round");
}

fn wire_hub_with_gov(chain_id: ChainId) -> Hub {
    let hub = Hub::new(test_config()).expect("Hub::new");
    hub.bootstrap_gov_protocol([1u8; 20], vec![TransmitterId([0xFFu8; 20])]).expect("bootstrap_gov_protocol");
    hub.add_executor(photon_hub::gov_protocol_id(), chain_id, OpaqueAddr::new(vec![0x99; 20]), true)
        .expect("add_executor");
    hub
}

fn sample_operation_data(protocol_id: ProtocolId, dest_chain_id: ChainId, nonce: u64, meta: U256) -> OperationData {
    OperationData {
        protocol_id,
        meta,
        src_chain_id: ChainId::from(1u64),
        src_block_number: U256::from(1u64),
        src_op_tx_id: ([0x11u8; 32], [0x22u8; 32]),
        nonce: U256::from(nonce),
        dest_chain_id,
        protocol_addr: OpaqueAddr::new(vec![0xCCu8; 20]),
        function_selector: FunctionSelector::evm([0x01, 0x02, 0x03, 0x04]),
        params: vec![],
        reserved: vec![],
    }
}

/// Scenario 1: with 10
/// transmitters and a 60% consensus rate, the 6th distinct proof flips
/// `approved`; the `approveBlock + 1` grace window accepts one more late
/// proof and then starts rejecting.
#[test]
fn approval_flips_at_threshold_then_grace_window_closes() {
    // Arrange
    let chain_id = ChainId::from(7u64);
    let hub = wire_hub_with_gov(chain_id);
    let protocol_id = ProtocolId::from_tag("msg-proto");
    let owner = [0x42u8; 20];
    let signers: Vec<Signer> = (0..10).map(|_| Signer::new()).collect();
    let transmitters: Vec<TransmitterId> = signers.iter().map(|s| s.id).collect();
    admit_protocol(&hub, protocol_id, owner, chain_id, transmitters, 6000);

    let data = sample_operation_data(protocol_id, chain_id, 1, photon_meta_codec::pack(0, false));
    let digest = eth_signed_digest(&data.pack());

    // Act: the first 5 proofs must not approve yet.
    let mut op_hash = None;
    for signer in &signers[..5] {
        let sig = signer.sign(&digest);
        let hash = hub.propose_operation(signer.id, data.clone(), sig).expect("proof accepted");
        op_hash = Some(hash);
    }
    let op_hash = op_hash.unwrap();
    assert!(
        !hub.operation_registry.lock().operation(&op_hash).unwrap().approved,
        "5 of 10 proofs must not reach a 60% threshold"
    );

    // Act: the 6th proof crosses 6/10 = 60%.
    let sig6 = signers[5].sign(&digest);
    hub.propose_operation(signers[5].id, data.clone(), sig6).expect("6th proof accepted");

    // Assert: approved, stamped with the call-sequence block it approved on.
    {
        let registry = hub.operation_registry.lock();
        let op = registry.operation(&op_hash).unwrap();
        assert!(op.approved, "6th of 10 proofs must cross the 60% threshold");
        assert_eq!(op.approve_block, 6, "one call-sequence tick per propose_operation call");
    }

    // Act + Assert: the very next call (still inside the grace window) is accepted.
    let sig7 = signers[6].sign(&digest);
    hub.propose_operation(signers[6].id, data.clone(), sig7)
        .expect("a proof landing at approve_block + 1 is still within the grace window");

    // Act + Assert: the call after that falls outside the grace window.
    let sig8 = signers[7].sign(&digest);
    let err = hub.propose_operation(signers[7].id, data.clone(), sig8).unwrap_err();
    assert_eq!(
        err,
        photon_hub::error::HubError::OperationRegistry(photon_operation_registry::OperationRegistryError::OperationIsAlreadyApproved),
    );
}

/// Scenario 3:
/// once enough watchers confirm execution, the operation executes exactly
/// once, its in-order nonce is recorded, and a confirmation arriving after
/// execution is a silent no-op rather than an error.
///
/// The global watcher set spans every registered protocol, not just this
/// one: `wire_hub_with_gov`
/// seats one gov transmitter, and this protocol adds 5 more, so the 60%
/// confirmation threshold is taken over 6 watchers, not 5.
#[test]
fn watcher_confirmation_executes_and_records_in_order_nonce() {
    // Arrange: 5 protocol transmitters plus 1 gov transmitter = 6 watchers total, 60% consensus.
    let chain_id = ChainId::from(9u64);
    let hub = wire_hub_with_gov(chain_id);
    let protocol_id = ProtocolId::from_tag("watch-proto");
    let owner = [0x43u8; 20];
    let signers: Vec<Signer> = (0..5).map(|_| Signer::new()).collect();
    let transmitters: Vec<TransmitterId> = signers.iter().map(|s| s.id).collect();
    admit_protocol(&hub, protocol_id, owner, chain_id, transmitters, 6000);

    let nonce = 42u64;
    let data = sample_operation_data(protocol_id, chain_id, nonce, photon_meta_codec::pack(0, true));
    let digest = eth_signed_digest(&data.pack());

    // Act: 3 of 5 proofs (60%) approve the operation (a per-protocol threshold).
    let mut op_hash = None;
    for signer in &signers[..3] {
        let sig = signer.sign(&digest);
        op_hash = Some(hub.propose_operation(signer.id, data.clone(), sig).unwrap());
    }
    let op_hash = op_hash.unwrap();
    assert!(hub.operation_registry.lock().operation(&op_hash).unwrap().approved);

    // Act: the first 3 watcher confirmations (3 of 6 = 50%) do not yet execute.
    for signer in &signers[..3] {
        let watcher = photon_types::WatcherId(signer.id.0);
        hub.approve_operation_executing(watcher, op_hash).expect("watcher is allowed");
    }
    assert!(!hub.operation_registry.lock().operation(&op_hash).unwrap().executed);

    // A watcher confirming twice is rejected, distinct from "already executed".
    let repeat_watcher = photon_types::WatcherId(signers[0].id.0);
    let err = hub.approve_operation_executing(repeat_watcher, op_hash).unwrap_err();
    assert_eq!(
        err,
        photon_hub::error::HubError::OperationRegistry(photon_operation_registry::OperationRegistryError::WatcherIsAlreadyApproved),
    );

    // Act: the 4th confirmation crosses 4 of 6 = 66% and executes.
    let watcher4 = photon_types::WatcherId(signers[3].id.0);
    hub.approve_operation_executing(watcher4, op_hash).unwrap();

    // Assert: executed exactly once, in-order nonce recorded.
    {
        let registry = hub.operation_registry.lock();
        let op = registry.operation(&op_hash).unwrap();
        assert!(op.executed);
        assert_eq!(registry.last_executed_nonce_in_order(protocol_id, chain_id), Some(U256::from(nonce)));
    }

    // Act + Assert: a confirmation arriving after execution is a no-op, not an error.
    let watcher5 = photon_types::WatcherId(signers[4].id.0);
    hub.approve_operation_executing(watcher5, op_hash).expect("post-execution confirmation is a silent no-op");
}

/// Scenario 6: two independently
/// wired hubs that finalize the same two data keys in opposite orders
/// converge on the same Merkle root, since leaves are sorted before
/// folding rather than accumulated in insertion order.
#[test]
fn merkle_root_is_independent_of_finalization_order() {
    let chain_id = ChainId::from(11u64);
    let protocol_id = ProtocolId::from_tag("oracle-proto");
    let owner = [0x44u8; 20];
    let source_id: u64 = 1;

    let setup = |key_order: [&str; 2]| -> [u8; 32] {
        let hub = wire_hub_with_gov(chain_id);
        let signers: Vec<Signer> = (0..3).map(|_| Signer::new()).collect();
        let transmitters: Vec<TransmitterId> = signers.iter().map(|s| s.id).collect();

        // A single `turn_round()` call both seats the transmitter set and
        // promotes the pended 0-second finalization interval — two calls
        // would collide with `GlobalConfig::min_round_time_secs`'s
        // real-clock gate, so the interval is pended before this one call
        // rather than via a second round turn.
        hub.register_protocol(
            protocol_id,
            owner,
            ProtocolParams {
                consensus_target_rate: 6000,
                max_transmitters: max_transmitters_for(transmitters.len() as u32, 6000),
                ..ProtocolParams::default()
            },
            transmitters,
        )
        .unwrap();
        hub.stream_consensus.lock().set_min_finalization_interval(protocol_id, 0);
        hub.add_allowed_protocol_address(protocol_id, owner, chain_id, OpaqueAddr::new(vec![0xAB; 20])).unwrap();
        hub.handle_add_allowed_protocol(protocol_id, chain_id);
        hub.turn_round().expect("turn_round");

        for key in key_order {
            let data_key = key.as_bytes().to_vec();
            let value = format!("value-{key}").into_bytes();
            for signer in &signers[..2] {
                hub.propose_data(protocol_id, source_id, data_key.clone(), signer.id, value.clone()).unwrap();
            }
            hub.finalize_data(protocol_id, source_id, data_key).expect("2 of 3 votes clears 60%");
        }
        hub.merkle_root(protocol_id, source_id).expect("both keys finalized a root")
    };

    let forward = setup(["alpha", "beta"]);
    let reverse = setup(["beta", "alpha"]);
    assert_eq!(forward, reverse, "the Merkle root must not depend on finalization order");
}

/// Property P3: an unknown transmitter can never place
/// a proof, regardless of how well-formed its signature is.
#[test]
fn unregistered_transmitter_is_rejected_before_signature_check() {
    let chain_id = ChainId::from(13u64);
    let hub = wire_hub_with_gov(chain_id);
    let protocol_id = ProtocolId::from_tag("closed-proto");
    let owner = [0x45u8; 20];
    let allowed = Signer::new();
    admit_protocol(&hub, protocol_id, owner, chain_id, vec![allowed.id], 6000);

    let stranger = Signer::new();
    let data = sample_operation_data(protocol_id, chain_id, 1, photon_meta_codec::pack(0, false));
    let digest = eth_signed_digest(&data.pack());
    let sig = stranger.sign(&digest);

    let err = hub.propose_operation(stranger.id, data, sig).unwrap_err();
    assert_eq!(
        err,
        photon_hub::error::HubError::OperationRegistry(photon_operation_registry::OperationRegistryError::TransmitterIsNotAllowed),
    );
}

/// Admitting a protocol before its gov contract address is known on the
/// destination chain must not silently succeed — `proposeOperation` has
/// to see `UnknownGovAddress` rather than treat a missing gov address as
/// "not yet inited".
#[test]
fn propose_operation_without_admission_is_rejected() {
    let hub = Hub::new(test_config()).unwrap();
    let chain_id = ChainId::from(5u64);
    let protocol_id = ProtocolId::from_tag("never-admitted");
    let signer = Signer::new();
    hub.register_protocol(protocol_id, [0x46u8; 20], ProtocolParams { max_transmitters: 1, ..ProtocolParams::default() }, vec![signer.id])
        .unwrap();

    let data = sample_operation_data(protocol_id, chain_id, 1, photon_meta_codec::pack(0, false));
    let digest = eth_signed_digest(&data.pack());
    let sig = signer.sign(&digest);

    let err = hub.propose_operation(signer.id, data, sig).unwrap_err();
    assert_eq!(
        err,
        photon_hub::error::HubError::OperationRegistry(photon_operation_registry::OperationRegistryError::ProtocolIsNotInitedOnChain),
    );
}

/// Agent-backed (non-manual) transmitters: `selectTransmittersForProtocol`
/// only seats a declared transmitter once its
/// agent's personal stake clears the protocol's `min_personal_stake`, so a
/// declared-but-unstaked agent's transmitter never becomes eligible and is
/// rejected the same way an unknown transmitter would be.
#[test]
fn declared_transmitter_without_stake_is_not_eligible() {
    let chain_id = ChainId::from(17u64);
    let hub = wire_hub_with_gov(chain_id);
    let protocol_id = ProtocolId::from_tag("staked-proto");
    let owner = [0x47u8; 20];

    let agent = AgentId([0x50u8; 20]);
    hub.admit_agent(agent, 0).unwrap();
    // No personal stake deposited: the agent is known but not yet eligible.

    let signer = Signer::new();
    hub.register_protocol(
        protocol_id,
        owner,
        ProtocolParams {
            consensus_target_rate: 6000,
            max_transmitters: 3,
            min_personal_stake: U256::from(100u64),
            ..ProtocolParams::default()
        },
        // A manual seat keeps `requireParamsValid` happy; the transmitter
        // under test is declared separately below.
        vec![TransmitterId([0x51u8; 20])],
    )
    .unwrap();
    hub.declare_protocol_support(agent, protocol_id, signer.id).unwrap();
    hub.add_allowed_protocol_address(protocol_id, owner, chain_id, OpaqueAddr::new(vec![0xAB; 20])).unwrap();
    hub.handle_add_allowed_protocol(protocol_id, chain_id);
    hub.turn_round().unwrap();

    let data = sample_operation_data(protocol_id, chain_id, 1, photon_meta_codec::pack(0, false));
    let digest = eth_signed_digest(&data.pack());
    let sig = signer.sign(&digest);

    // `current_transmitters` never includes a declared-but-unstaked agent,
    // so this is rejected the same way an unknown transmitter would be.
    let err = hub.propose_operation(signer.id, data, sig).unwrap_err();
    assert_eq!(
        err,
        photon_hub::error::HubError::OperationRegistry(photon_operation_registry::OperationRegistryError::TransmitterIsNotAllowed),
    );
}
