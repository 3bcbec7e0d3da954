//! StreamConsensus: per-`(protocolId, sourceId,
//! dataKey)` vote tallying, pluggable finalization, and the interval/rate
//! realtime→active split mirrored from `photon-protocol-registry`.

use crate::error::StreamConsensusError as Error;
use crate::events::{EventSink, StreamEvent};
use crate::ports::{BetBookPort, ProcessingLib, ProtocolPort};
use crate::types::{AgentVote, DataKey, SourceId, StreamAsset};
use photon_betbook::BetType;
use photon_crypto::keccak_many;
use photon_types::{Capability, Clock, OpHash, ProtocolId, RoundManager, TransmitterId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};

const DEFAULT_MIN_FINALIZATION_INTERVAL_SECS: u64 = 60;

pub struct StreamConsensus {
    assets: HashMap<(ProtocolId, SourceId, DataKey), StreamAsset>,
    realtime_min_interval: HashMap<ProtocolId, u64>,
    active_min_interval: HashMap<ProtocolId, u64>,

    protocol: Arc<dyn ProtocolPort>,
    betbook: Arc<dyn BetBookPort>,
    processing: Arc<dyn ProcessingLib>,
    events: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
}

impl StreamConsensus {
    pub fn new(
        protocol: Arc<dyn ProtocolPort>,
        betbook: Arc<dyn BetBookPort>,
        processing: Arc<dyn ProcessingLib>,
        events: Arc<dyn EventSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            assets: HashMap::new(),
            realtime_min_interval: HashMap::new(),
            active_min_interval: HashMap::new(),
            protocol,
            betbook,
            processing,
            events,
            clock,
        }
    }

    pub fn asset(&self, protocol_id: ProtocolId, source_id: SourceId, data_key: &DataKey) -> Option<&StreamAsset> {
        self.assets.get(&(protocol_id, source_id, data_key.clone()))
    }

    fn min_finalization_interval(&self, protocol_id: ProtocolId) -> u64 {
        self.active_min_interval
            .get(&protocol_id)
            .copied()
            .unwrap_or(DEFAULT_MIN_FINALIZATION_INTERVAL_SECS)
    }

    /// Settable any time; takes effect on the next `turn_round`, which
    /// applies pended consensus-rate and interval changes.
    pub fn set_min_finalization_interval(&mut self, protocol_id: ProtocolId, secs: u64) {
        self.realtime_min_interval.insert(protocol_id, secs);
    }

    fn round_op_hash(&self, protocol_id: ProtocolId, source_id: SourceId, data_key: &DataKey, now: u64) -> OpHash {
        let mut buf = Vec::with_capacity(32 + 8 + data_key.len() + 8);
        buf.extend_from_slice(&protocol_id.0);
        buf.extend_from_slice(&source_id.to_be_bytes());
        buf.extend_from_slice(data_key);
        buf.extend_from_slice(&now.to_be_bytes());
        OpHash(keccak_many(&[&buf]))
    }

    /// `proposeData(protocolId, sourceId, dataKey, transmitter, value)`.
    #[instrument(skip(self, value))]
    pub fn propose_data(
        &mut self,
        protocol_id: ProtocolId,
        source_id: SourceId,
        data_key: DataKey,
        transmitter: TransmitterId,
        value: Vec<u8>,
    ) -> Result<bool, Error> {
        let now = self.clock.now_unix();
        let key = (protocol_id, source_id, data_key.clone());
        let is_new = !self.assets.contains_key(&key);
        if is_new {
            let op_hash = self.round_op_hash(protocol_id, source_id, &data_key, now);
            self.assets.insert(key.clone(), StreamAsset::new(op_hash, now));
            self.events.emit(StreamEvent::NewStreamDataSpotter { protocol_id, source_id });
        }
        let asset = self.assets.get_mut(&key).expect("just inserted or present");

        if asset.participants.insert(transmitter) {
            asset.n_votes += 1;
            self.betbook
                .place_bet(protocol_id, transmitter, BetType::Data, asset.current_round_op_hash)
                .map_err(|_| Error::BetBookCallFailed)?;
        }
        asset.votes.insert(transmitter, AgentVote { value, timestamp: now });

        let allowed = self.protocol.current_transmitters(protocol_id);
        let rate = self.protocol.consensus_target_rate(protocol_id);
        let ready = !allowed.is_empty()
            && (asset.n_votes as u64) * 10_000 / allowed.len() as u64 >= rate as u64
            && now >= asset.update_timestamp + self.min_finalization_interval(protocol_id);

        if ready {
            self.events.emit(StreamEvent::ConsensusReadyToFinalize { protocol_id, source_id, data_key });
        }
        Ok(ready)
    }

    /// `finalizeData(protocolId, sourceId, dataKey)`, called by an executor
    /// once `ConsensusReadyToFinalize` fired.
    #[instrument(skip(self))]
    pub fn finalize_data(
        &mut self,
        protocol_id: ProtocolId,
        source_id: SourceId,
        data_key: DataKey,
    ) -> Result<Vec<u8>, Error> {
        let now = self.clock.now_unix();
        let allowed = self.protocol.current_transmitters(protocol_id);
        let rate = self.protocol.consensus_target_rate(protocol_id);

        let key = (protocol_id, source_id, data_key.clone());
        let asset = self.assets.get(&key).ok_or(Error::UnknownDataKey)?;

        if now < asset.update_timestamp + self.min_finalization_interval(protocol_id) {
            return Err(Error::IntervalNotElapsed);
        }
        if allowed.is_empty() || (asset.n_votes as u64) * 10_000 / allowed.len() as u64 < rate as u64 {
            return Err(Error::ThresholdNotReached);
        }

        let (votes, agents): (Vec<Vec<u8>>, Vec<TransmitterId>) = allowed
            .iter()
            .filter_map(|t| asset.votes.get(t).map(|v| (v.value.clone(), *t)))
            .unzip();

        let outcome = self.processing.finalize(&data_key, &votes, &agents);
        if !outcome.ok {
            return Err(Error::ProcessingRejected);
        }

        let current_op_hash = asset.current_round_op_hash;
        let new_op_hash = self.round_op_hash(protocol_id, source_id, &data_key, now);

        let asset = self.assets.get_mut(&key).expect("checked above");
        asset.accepted_value = Some(outcome.finalized.clone());
        asset.reset_window(new_op_hash, now);

        self.betbook.release_bets_and_reward(protocol_id, &outcome.winners, current_op_hash);
        self.events.emit(StreamEvent::DataFinalized { protocol_id, source_id, data_key });

        info!(?protocol_id, source_id, "data finalized");
        Ok(outcome.finalized)
    }

    /// `turnRound()`'s StreamConsensus leg: promote pended interval changes
    ///. Consensus rate itself is read live from
    /// `ProtocolPort`, which `ProtocolRegistry::turn_round` already rotated.
    pub fn turn_round(&mut self, _cap: Capability<RoundManager>) {
        for (protocol_id, secs) in self.realtime_min_interval.iter() {
            self.active_min_interval.insert(*protocol_id, *secs);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::MajorityProcessingLib;
    use photon_types::{AuthorityTable, FixedClock};
    use std::sync::Mutex;

    struct FakeProtocol {
        transmitters: Vec<TransmitterId>,
        rate: u32,
    }
    impl ProtocolPort for FakeProtocol {
        fn current_transmitters(&self, _p: ProtocolId) -> Vec<TransmitterId> {
            self.transmitters.clone()
        }
        fn consensus_target_rate(&self, _p: ProtocolId) -> u32 {
            self.rate
        }
    }

    #[derive(Default)]
    struct FakeBetBook {
        placed: Mutex<Vec<(ProtocolId, TransmitterId, OpHash)>>,
        released: Mutex<Vec<(ProtocolId, Vec<TransmitterId>, OpHash)>>,
    }
    impl BetBookPort for FakeBetBook {
        fn place_bet(&self, protocol_id: ProtocolId, transmitter: TransmitterId, _bet_type: BetType, op_hash: OpHash) -> Result<(), Error> {
            self.placed.lock().unwrap().push((protocol_id, transmitter, op_hash));
            Ok(())
        }
        fn release_bets_and_reward(&self, protocol_id: ProtocolId, winners: &[TransmitterId], op_hash: OpHash) {
            self.released.lock().unwrap().push((protocol_id, winners.to_vec(), op_hash));
        }
    }

    fn agent(n: u8) -> TransmitterId {
        TransmitterId([n; 20])
    }

    fn consensus(transmitters: Vec<TransmitterId>, rate: u32) -> (StreamConsensus, Arc<FakeBetBook>) {
        let betbook = Arc::new(FakeBetBook::default());
        let sc = StreamConsensus::new(
            Arc::new(FakeProtocol { transmitters, rate }),
            betbook.clone(),
            Arc::new(MajorityProcessingLib),
            Arc::new(crate::events::NullEventSink),
            Arc::new(FixedClock(1_000)),
        );
        (sc, betbook)
    }

    #[test]
    fn propose_data_withholds_ready_until_interval_elapses() {
        let (mut sc, _betbook) = consensus(vec![agent(1), agent(2)], 5_000);
        let protocol_id = ProtocolId::from_tag("oracle");
        // One of two voters clears the 50% threshold, but the window just
        // opened at the same timestamp, so the minimum interval has not
        // elapsed yet.
        let ready = sc.propose_data(protocol_id, 1, b"btc".to_vec(), agent(1), vec![1]).unwrap();
        assert!(!ready);
    }

    #[test]
    fn finalize_data_rejects_before_interval_elapses() {
        let (mut sc, _betbook) = consensus(vec![agent(1)], 5_000);
        let protocol_id = ProtocolId::from_tag("oracle");
        sc.propose_data(protocol_id, 1, b"btc".to_vec(), agent(1), vec![1]).unwrap();
        assert_eq!(
            sc.finalize_data(protocol_id, 1, b"btc".to_vec()),
            Err(Error::IntervalNotElapsed)
        );
    }

    #[test]
    fn finalize_data_places_and_releases_bets() {
        let protocol_id = ProtocolId::from_tag("oracle");
        let betbook = Arc::new(FakeBetBook::default());
        let mut sc = StreamConsensus::new(
            Arc::new(FakeProtocol { transmitters: vec![agent(1)], rate: 5_000 }),
            betbook.clone(),
            Arc::new(MajorityProcessingLib),
            Arc::new(crate::events::NullEventSink),
            Arc::new(FixedClock(0)),
        );

        sc.propose_data(protocol_id, 1, b"btc".to_vec(), agent(1), vec![7]).unwrap();
        assert_eq!(betbook.placed.lock().unwrap().len(), 1);

        // Advance past the default minimum finalization interval.
        sc.clock = Arc::new(FixedClock(1_000));
        let result = sc.finalize_data(protocol_id, 1, b"btc".to_vec()).unwrap();
        assert_eq!(result, vec![7]);
        assert_eq!(betbook.released.lock().unwrap().len(), 1);
    }

    #[test]
    fn turn_round_promotes_pending_interval() {
        let (mut sc, _betbook) = consensus(vec![agent(1)], 5_000);
        let protocol_id = ProtocolId::from_tag("oracle");
        sc.set_min_finalization_interval(protocol_id, 10);
        assert_eq!(sc.min_finalization_interval(protocol_id), 60);
        let table = AuthorityTable::new();
        sc.turn_round(table.grant());
        assert_eq!(sc.min_finalization_interval(protocol_id), 10);
    }
}
