//! Entity shapes for the data-streaming consensus ledger.

use photon_types::{OpHash, TransmitterId};
use std::collections::{HashMap, HashSet};

/// Caller-chosen tag for a data source feeding a protocol, e.g. a price
/// oracle's internal index. Opaque to this crate.
pub type SourceId = u64;

/// Caller-chosen key identifying one data stream within a source, e.g. a
/// trading pair. Opaque to this crate.
pub type DataKey = Vec<u8>;

/// One transmitter's vote for the value of `dataKey` in the current
/// window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentVote {
    pub value: Vec<u8>,
    pub timestamp: u64,
}

/// Per-`(protocolId, sourceId, dataKey)` vote-tally state (`StreamAsset`).
#[derive(Debug, Clone)]
pub struct StreamAsset {
    pub accepted_value: Option<Vec<u8>>,
    pub current_round_op_hash: OpHash,
    pub update_timestamp: u64,
    pub n_votes: u32,
    pub votes: HashMap<TransmitterId, AgentVote>,
    pub participants: HashSet<TransmitterId>,
}

impl StreamAsset {
    pub fn new(current_round_op_hash: OpHash, update_timestamp: u64) -> Self {
        Self {
            accepted_value: None,
            current_round_op_hash,
            update_timestamp,
            n_votes: 0,
            votes: HashMap::new(),
            participants: HashSet::new(),
        }
    }

    /// Clears per-window vote state after a successful `finalizeData`,
    /// keeping `accepted_value`.
    pub fn reset_window(&mut self, new_op_hash: OpHash, now: u64) {
        self.current_round_op_hash = new_op_hash;
        self.update_timestamp = now;
        self.n_votes = 0;
        self.votes.clear();
        self.participants.clear();
    }
}

/// One finalized datum for a `dataKey`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizedDatum {
    pub timestamp: u64,
    pub data: Vec<u8>,
    pub data_key: DataKey,
}

/// Result of a `ProcessingLib::finalize` callback invoked from
/// `finalizeData`: `(ok, finalizedBytes, winners)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizeOutcome {
    pub ok: bool,
    pub finalized: Vec<u8>,
    pub winners: Vec<TransmitterId>,
}
