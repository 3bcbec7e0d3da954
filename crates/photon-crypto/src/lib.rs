//! # Photon Crypto
//!
//! Keccak256 hashing, the Ethereum "personal sign" digest, and recoverable
//! ECDSA identity recovery.
//!
//! Signature verification in this crate means exactly one thing:
//! recovering an identity from `(digest, signature)`. Callers compare the
//! recovered identity against whatever declared sender they expect;
//! non-recoverable signatures are always rejected, never treated as "no
//! signer."

pub mod ecdsa;
pub mod errors;
pub mod hashing;

pub use ecdsa::{recover, verify_signer, Identity, Signature};
pub use errors::CryptoError;
pub use hashing::{eth_signed_digest, keccak, keccak_many, Hash};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
