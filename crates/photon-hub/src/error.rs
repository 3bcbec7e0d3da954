//! Hub-facade error type: every subsystem error folded into one enum so
//! the process entry point has a single `Result` to match on.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HubError {
    #[error(transparent)]
    Config(#[from] photon_config::ConfigError),
    #[error(transparent)]
    Staking(#[from] photon_staking::StakingError),
    #[error(transparent)]
    BetBook(#[from] photon_betbook::BetBookError),
    #[error(transparent)]
    ProtocolRegistry(#[from] photon_protocol_registry::ProtocolRegistryError),
    #[error(transparent)]
    AgentDirectory(#[from] photon_agent_directory::AgentDirectoryError),
    #[error(transparent)]
    OperationRegistry(#[from] photon_operation_registry::OperationRegistryError),
    #[error(transparent)]
    StreamConsensus(#[from] photon_stream_consensus::StreamConsensusError),
    #[error(transparent)]
    RoundCoordinator(#[from] photon_round_coordinator::RoundCoordinatorError),
    #[error(transparent)]
    Endpoint(#[from] photon_endpoint_emitter::EndpointEmitterError),
    #[error("unknown protocol {0:?}")]
    UnknownProtocol(photon_types::ProtocolId),
}
