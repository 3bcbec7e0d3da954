use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolRegistryError {
    #[error("protocol id already registered")]
    AlreadyRegistered,
    #[error("unknown protocol id")]
    UnknownProtocol,
    #[error("caller is not the protocol owner")]
    IsNotOwner,
    #[error("zero address")]
    ZeroAddress,
    #[error("duplicate transmitter in manual list")]
    DuplicateTransmitter,
    #[error("manual transmitter already claimed by a different protocol")]
    TransmitterClaimedElsewhere,
    #[error("manual transmitters list must be nonempty")]
    EmptyManualTransmitters,
    #[error("consensus target rate must satisfy 5500 < r <= 10000")]
    InvalidConsensusRate,
    #[error("maxTransmitters exceeds the configured cap")]
    InvalidMaxTransmitters,
    #[error("too many manual transmitters for this consensus rate")]
    ManualTransmittersLimitExceeded,
    #[error("protocol is not active")]
    ProtocolNotActive,
    #[error("removing the last gov executor on a chain is forbidden")]
    LastGovExecutorRemovalForbidden,
    #[error("chain is not yet inited for this protocol")]
    ChainNotInited,
}
