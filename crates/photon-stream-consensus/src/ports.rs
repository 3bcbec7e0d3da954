//! Outbound dependencies.
//! Concrete adapters are assembled by whoever wires the hub together.

use photon_betbook::BetType;
use photon_types::{OpHash, ProtocolId, TransmitterId};

/// This crate's view of `ProtocolRegistry` + `AgentDirectory`: which
/// transmitters a protocol currently allows and its active consensus rate.
pub trait ProtocolPort: Send + Sync {
    fn current_transmitters(&self, protocol_id: ProtocolId) -> Vec<TransmitterId>;
    fn consensus_target_rate(&self, protocol_id: ProtocolId) -> u32;
}

/// This crate's view of `BetBook`, exercised under the `BET_MANAGER`
/// capability at the adapter.
pub trait BetBookPort: Send + Sync {
    fn place_bet(&self, protocol_id: ProtocolId, transmitter: TransmitterId, bet_type: BetType, op_hash: OpHash) -> Result<(), crate::error::StreamConsensusError>;
    fn release_bets_and_reward(&self, protocol_id: ProtocolId, winners: &[TransmitterId], op_hash: OpHash);
}

/// Pluggable finalization logic a protocol owner supplies out-of-band
///: given the current window's
/// per-transmitter votes (in transmitter order), decide the finalized
/// bytes and which transmitters voted the accepted value.
pub trait ProcessingLib: Send + Sync {
    fn finalize(
        &self,
        data_key: &[u8],
        votes: &[Vec<u8>],
        agents: &[TransmitterId],
    ) -> crate::types::FinalizeOutcome;
}

/// Majority-of-identical-bytes processing: the value voted by the most
/// transmitters wins verbatim; everyone who voted it is a winner. A
/// reasonable default for callers that don't need custom aggregation
/// (e.g. numeric median).
#[derive(Debug, Default, Clone, Copy)]
pub struct MajorityProcessingLib;

impl ProcessingLib for MajorityProcessingLib {
    fn finalize(&self, _data_key: &[u8], votes: &[Vec<u8>], agents: &[TransmitterId]) -> crate::types::FinalizeOutcome {
        use std::collections::HashMap;

        let mut tally: HashMap<&Vec<u8>, Vec<TransmitterId>> = HashMap::new();
        for (vote, agent) in votes.iter().zip(agents.iter()) {
            tally.entry(vote).or_default().push(*agent);
        }
        match tally.into_iter().max_by_key(|(_, winners)| winners.len()) {
            Some((value, winners)) => crate::types::FinalizeOutcome {
                ok: true,
                finalized: value.clone(),
                winners,
            },
            None => crate::types::FinalizeOutcome {
                ok: false,
                finalized: Vec::new(),
                winners: Vec::new(),
            },
        }
    }
}
