use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RoundCoordinatorError {
    #[error("minimum round interval has not elapsed since the last turn_round")]
    TooSoon,
    #[error("reward distribution failed: {0}")]
    RewardDistributionFailed(#[from] photon_staking::StakingError),
}
