//! Entity shapes for the central operation ledger.

use photon_crypto::Signature;
use photon_types::{OperationData, RoundId, TransmitterId, WatcherId};

/// Lives in this crate, created on first proof, never destroyed while
/// history may be queried.
///
/// Invariants: `proofs` unique by transmitter; once `approved == true`,
/// `approve_block` is set exactly once per approval epoch; `executed ⇒
/// approved`; `watcher_count == watchers.len()`.
#[derive(Debug, Clone)]
pub struct Operation {
    pub data: OperationData,
    pub approved: bool,
    pub executed: bool,
    pub proofs_count: u32,
    pub watcher_count: u32,
    pub round: RoundId,
    pub approve_block: u64,
    pub proofs: Vec<(TransmitterId, Signature)>,
    pub watchers: Vec<WatcherId>,
}

impl Operation {
    pub fn seed(data: OperationData, round: RoundId, caller: TransmitterId, sig: Signature) -> Self {
        Self {
            data,
            approved: false,
            executed: false,
            proofs_count: 1,
            watcher_count: 0,
            round,
            approve_block: 0,
            proofs: vec![(caller, sig)],
            watchers: Vec::new(),
        }
    }

    pub fn has_proof_from(&self, transmitter: TransmitterId) -> bool {
        self.proofs.iter().any(|(t, _)| *t == transmitter)
    }

    pub fn has_watcher(&self, watcher: WatcherId) -> bool {
        self.watchers.contains(&watcher)
    }
}

/// Per-`(protocolId, chainId)` admission state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitState {
    NotInited,
    OnInition,
    Inited,
}

/// Queued addresses/transmitters accumulated while a chain is
/// `OnInition`, flushed in order (protocol addresses, then proposer
/// addresses, then transmitters) once the endpoint confirms admission.
#[derive(Debug, Clone, Default)]
pub struct PendingAdmission {
    pub protocol_addresses: Vec<photon_types::OpaqueAddr>,
    pub proposer_addresses: Vec<photon_types::OpaqueAddr>,
    pub transmitters: Vec<TransmitterId>,
}
