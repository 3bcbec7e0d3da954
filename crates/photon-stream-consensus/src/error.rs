use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StreamConsensusError {
    #[error("data key is not in the allowed-keys list for this (protocol, source)")]
    KeyNotAllowed,
    #[error("no vote state recorded for this (protocol, source, key)")]
    UnknownDataKey,
    #[error("minimum finalization interval has not elapsed yet")]
    IntervalNotElapsed,
    #[error("vote threshold has not been reached yet")]
    ThresholdNotReached,
    #[error("processing callback rejected this finalization")]
    ProcessingRejected,
    #[error("no finalizations recorded since the last Merkle root computation")]
    NothingToSnapshot,
    #[error("downstream bet-book call failed")]
    BetBookCallFailed,
}
