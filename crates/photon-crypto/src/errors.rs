//! Crypto error types.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CryptoError {
    /// Signature recovery failed outright (malformed curve point).
    #[error("signature verification failed")]
    SignatureVerificationFailed,

    /// Signature fields are structurally invalid (bad `v`, bad scalar).
    #[error("invalid signature")]
    InvalidSignature,
}
