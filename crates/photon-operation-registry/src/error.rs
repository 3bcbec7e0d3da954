use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OperationRegistryError {
    #[error("transmitter is not allowed for this protocol")]
    TransmitterIsNotAllowed,
    #[error("watcher is not allowed")]
    WatcherIsNotAllowed,
    #[error("protocol is not inited on this destination chain")]
    ProtocolIsNotInitedOnChain,
    #[error("no gov contract address is known for this destination chain")]
    UnknownGovAddress,
    #[error("operation payload failed size validation")]
    InvalidOperationData,
    #[error("signature does not recover to the declared caller")]
    SignatureCheckFailed,
    #[error("operation is already approved")]
    OperationIsAlreadyApproved,
    #[error("transmitter already submitted a proof for this operation")]
    TransmitterIsAlreadyApproved,
    #[error("watcher already confirmed execution of this operation")]
    WatcherIsAlreadyApproved,
    #[error("operation is not known")]
    UnknownOperation,
    #[error("operation is not approved yet")]
    OpIsNotApproved,
    #[error("invalid consensus rate")]
    InvalidConsensusRate,
    #[error("downstream bet-book call failed")]
    BetBookCallFailed,
}
