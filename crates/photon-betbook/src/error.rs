use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BetBookError {
    #[error("protocol is paused")]
    ProtocolPaused,
    #[error("bet type does not match the type recorded for this operation hash")]
    BetTypeMismatch,
    #[error("no agent declared for this transmitter")]
    AgentNotFound,
    #[error("insufficient personal stake to lock this bet")]
    InsufficientPersonalStake,
    #[error("unlocking more than is locked")]
    UnlockTooMuch,
    #[error("bet has not timed out yet")]
    TimeoutNotElapsed,
    #[error("no bet recorded for this (agent, opHash)")]
    NoBetRecorded,
    #[error("no bet state recorded for this opHash")]
    NoOpState,
}
