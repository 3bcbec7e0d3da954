//! MasterStreamDataSpotter: per-`(protocolId,
//! sourceId)` snapshot of finalized data plus the Merkle root taken over it.
//!
//! A leaf-sort-then-fold tree: plain structs, `thiserror` errors, and a
//! `tracing`-instrumented mutator API matching the rest of this crate.

use crate::error::StreamConsensusError as Error;
use crate::events::{EventSink, StreamEvent};
use crate::types::{DataKey, FinalizedDatum, SourceId};
use photon_crypto::keccak;
use photon_types::{Clock, ProtocolId};
use primitive_types::U256;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::instrument;

pub struct MasterStreamDataSpotter {
    protocol_id: ProtocolId,
    source_id: SourceId,
    allowed_keys: HashSet<DataKey>,
    only_allowed_keys: bool,
    merkle_root: [u8; 32],
    finalized_data: HashMap<DataKey, FinalizedDatum>,
    latest_snapshot: HashMap<DataKey, FinalizedDatum>,
    finalizations_since_root: u64,

    events: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
}

impl MasterStreamDataSpotter {
    pub fn new(
        protocol_id: ProtocolId,
        source_id: SourceId,
        allowed_keys: Vec<DataKey>,
        only_allowed_keys: bool,
        events: Arc<dyn EventSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            protocol_id,
            source_id,
            allowed_keys: allowed_keys.into_iter().collect(),
            only_allowed_keys,
            merkle_root: [0u8; 32],
            finalized_data: HashMap::new(),
            latest_snapshot: HashMap::new(),
            finalizations_since_root: 0,
            events,
            clock,
        }
    }

    pub fn merkle_root(&self) -> [u8; 32] {
        self.merkle_root
    }

    pub fn finalized(&self, data_key: &DataKey) -> Option<&FinalizedDatum> {
        self.finalized_data.get(data_key)
    }

    pub fn latest_snapshot(&self, data_key: &DataKey) -> Option<&FinalizedDatum> {
        self.latest_snapshot.get(data_key)
    }

    /// `pushFinalizedData(dataKey, data)`.
    #[instrument(skip(self, data))]
    pub fn push_finalized_data(&mut self, data_key: DataKey, data: Vec<u8>) -> Result<(), Error> {
        if self.only_allowed_keys && !self.allowed_keys.contains(&data_key) {
            return Err(Error::KeyNotAllowed);
        }
        let now = self.clock.now_unix();
        self.finalized_data.insert(
            data_key.clone(),
            FinalizedDatum { timestamp: now, data, data_key: data_key.clone() },
        );
        self.finalizations_since_root += 1;
        self.events.emit(StreamEvent::DataFinalized {
            protocol_id: self.protocol_id,
            source_id: self.source_id,
            data_key,
        });
        Ok(())
    }

    /// `recalculateMerkleRoot()`: sort `keccak(keccak(encode(datum)))`
    /// leaves ascending as 256-bit big-endian integers, fold pairwise as
    /// `keccak(min||max)` up to a single root.
    /// An `only_allowed_keys` spotter snapshots exactly its allow-list;
    /// an unrestricted one snapshots every key finalized so far.
    #[instrument(skip(self))]
    pub fn recalculate_merkle_root(&mut self) -> Result<[u8; 32], Error> {
        if self.finalizations_since_root == 0 {
            return Err(Error::NothingToSnapshot);
        }

        let mut leaves: Vec<[u8; 32]> = if self.only_allowed_keys {
            self.allowed_keys
                .iter()
                .filter_map(|key| self.finalized_data.get(key))
                .map(|datum| keccak(&keccak(&encode_datum(datum))))
                .collect()
        } else {
            self.finalized_data
                .values()
                .map(|datum| keccak(&keccak(&encode_datum(datum))))
                .collect()
        };
        leaves.sort_by(|a, b| U256::from_big_endian(a).cmp(&U256::from_big_endian(b)));

        self.merkle_root = fold_tree(leaves);
        self.latest_snapshot = self.finalized_data.clone();
        self.finalizations_since_root = 0;

        self.events.emit(StreamEvent::NewMerkleRoot {
            protocol_id: self.protocol_id,
            source_id: self.source_id,
            root: self.merkle_root,
        });
        Ok(self.merkle_root)
    }
}

/// Deterministic preimage for a finalized datum: timestamp then bytes,
/// big-endian, length-delimited so no two distinct `(timestamp, data)`
/// pairs collide.
fn encode_datum(datum: &FinalizedDatum) -> Vec<u8> {
    let mut buf = Vec::with_capacity(8 + 8 + datum.data.len());
    buf.extend_from_slice(&datum.timestamp.to_be_bytes());
    buf.extend_from_slice(&(datum.data.len() as u64).to_be_bytes());
    buf.extend_from_slice(&datum.data);
    buf
}

/// Complete binary tree over `leaves`, leaves placed at the tail, each
/// non-leaf hashed as `keccak(min(children)||max(children))`. A single
/// leaf is its own root; an empty set is the zero hash.
fn fold_tree(leaves: Vec<[u8; 32]>) -> [u8; 32] {
    if leaves.is_empty() {
        return [0u8; 32];
    }
    let mut level = leaves;
    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        let mut i = 0;
        while i < level.len() {
            if i + 1 < level.len() {
                let (min, max) = order_pair(level[i], level[i + 1]);
                let mut buf = [0u8; 64];
                buf[..32].copy_from_slice(&min);
                buf[32..].copy_from_slice(&max);
                next.push(keccak(&buf));
            } else {
                next.push(level[i]);
            }
            i += 2;
        }
        level = next;
    }
    level[0]
}

fn order_pair(a: [u8; 32], b: [u8; 32]) -> ([u8; 32], [u8; 32]) {
    if U256::from_big_endian(&a) <= U256::from_big_endian(&b) {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use photon_types::{FixedClock, ProtocolId};

    fn spotter(keys: Vec<DataKey>) -> MasterStreamDataSpotter {
        MasterStreamDataSpotter::new(
            ProtocolId::from_tag("oracle"),
            1,
            keys,
            true,
            Arc::new(crate::events::NullEventSink),
            Arc::new(FixedClock(1_000)),
        )
    }

    #[test]
    fn rejects_unknown_key_when_restricted() {
        let mut s = spotter(vec![b"btc".to_vec()]);
        assert_eq!(s.push_finalized_data(b"eth".to_vec(), vec![1]), Err(Error::KeyNotAllowed));
    }

    #[test]
    fn root_is_deterministic_for_identical_inputs() {
        let mut a = spotter(vec![b"k1".to_vec(), b"k2".to_vec(), b"k3".to_vec()]);
        let mut b = spotter(vec![b"k1".to_vec(), b"k2".to_vec(), b"k3".to_vec()]);
        for (key, val) in [(b"k1".to_vec(), vec![1u8]), (b"k2".to_vec(), vec![2u8]), (b"k3".to_vec(), vec![3u8])] {
            a.push_finalized_data(key.clone(), val.clone()).unwrap();
            b.push_finalized_data(key, val).unwrap();
        }
        assert_eq!(a.recalculate_merkle_root().unwrap(), b.recalculate_merkle_root().unwrap());
    }

    #[test]
    fn root_changes_with_different_values() {
        let mut a = spotter(vec![b"k1".to_vec()]);
        let mut b = spotter(vec![b"k1".to_vec()]);
        a.push_finalized_data(b"k1".to_vec(), vec![1u8]).unwrap();
        b.push_finalized_data(b"k1".to_vec(), vec![2u8]).unwrap();
        assert_ne!(a.recalculate_merkle_root().unwrap(), b.recalculate_merkle_root().unwrap());
    }

    #[test]
    fn rejects_recompute_with_no_new_finalizations() {
        let mut s = spotter(vec![b"k1".to_vec()]);
        s.push_finalized_data(b"k1".to_vec(), vec![1u8]).unwrap();
        s.recalculate_merkle_root().unwrap();
        assert_eq!(s.recalculate_merkle_root(), Err(Error::NothingToSnapshot));
    }
}
