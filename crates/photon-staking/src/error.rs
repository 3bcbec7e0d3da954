use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StakingError {
    #[error("agent not found")]
    AgentNotFound,
    #[error("agent is not an approved staking participant")]
    NotApprovedAgent,
    #[error("agent is not active")]
    AgentNotActive,
    #[error("zero amount")]
    ZeroAmount,
    #[error("insufficient delegated stake")]
    InsufficientStake,
    #[error("insufficient personal stake")]
    InsufficientPersonalStake,
    #[error("invalid fee rate")]
    InvalidFeeRate,
    #[error("unlocking more than is locked")]
    UnlockTooMuch,
    #[error("no withdraw request pending")]
    NoWithdrawRequested,
}
