//! Entity shapes for the per-(agent, opHash) bet ledger.

use photon_types::TransmitterId;
use primitive_types::U256;
use std::collections::HashSet;

/// The kind of consensus an operation hash belongs to. Recorded once per
/// `opHash` and never changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BetType {
    Msg,
    Data,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bet {
    pub amount: U256,
    pub timestamp: u64,
}

/// Per-`opHash` bookkeeping established on the first bet placed against it.
#[derive(Debug, Clone)]
pub struct OpBetState {
    pub bet_type: BetType,
    pub first_bet: TransmitterId,
    /// Transmitters current at bet-start. Winners are removed as they are
    /// released; whoever remains at `releaseBetsAndReward` time absorbed an
    /// inactivity miss.
    pub cur_transmitters: HashSet<TransmitterId>,
    pub processed_timestamp: Option<u64>,
}

impl OpBetState {
    pub fn new(bet_type: BetType, first_bet: TransmitterId, cur_transmitters: HashSet<TransmitterId>) -> Self {
        Self {
            bet_type,
            first_bet,
            cur_transmitters,
            processed_timestamp: None,
        }
    }
}
