use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EndpointEmitterError {
    #[error("destination address too big")]
    AddressTooBig,
    #[error("encoded payload too big")]
    PayloadTooBig,
}
