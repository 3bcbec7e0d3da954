//! # Recoverable ECDSA (secp256k1)
//!
//! Transmitters sign operation digests with an ordinary secp256k1 key; the
//! hub recovers the signer's 20-byte identity from the signature rather
//! than requiring the signer to additionally declare a public key.

use crate::errors::CryptoError;
use k256::ecdsa::{RecoveryId, Signature as K256Signature, VerifyingKey};
use sha3::{Digest, Keccak256};

/// A recovered signer identity: the low 20 bytes of `keccak(uncompressed_pubkey[1..])`,
/// the same derivation Ethereum uses for addresses.
pub type Identity = [u8; 20];

/// `r || s || v` signature, `v` in `{27, 28}` (Ethereum convention).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Signature {
    pub r: [u8; 32],
    pub s: [u8; 32],
    pub v: u8,
}

impl Signature {
    pub fn new(r: [u8; 32], s: [u8; 32], v: u8) -> Self {
        Self { r, s, v }
    }

    fn recovery_id(&self) -> Result<RecoveryId, CryptoError> {
        let normalized = match self.v {
            27 => 0,
            28 => 1,
            0 | 1 => self.v,
            _ => return Err(CryptoError::InvalidSignature),
        };
        RecoveryId::from_byte(normalized).ok_or(CryptoError::InvalidSignature)
    }

    fn to_k256(&self) -> Result<K256Signature, CryptoError> {
        let mut bytes = [0u8; 64];
        bytes[..32].copy_from_slice(&self.r);
        bytes[32..].copy_from_slice(&self.s);
        K256Signature::from_slice(&bytes).map_err(|_| CryptoError::InvalidSignature)
    }
}

/// Recover the signer identity from a prehashed digest and signature.
/// Returns `Err` for any non-recoverable signature — callers must not treat
/// recovery failure as "no signer", only as a rejected transaction.
pub fn recover(digest: &[u8; 32], sig: &Signature) -> Result<Identity, CryptoError> {
    let recovery_id = sig.recovery_id()?;
    let k256_sig = sig.to_k256()?;
    let verifying_key = VerifyingKey::recover_from_prehash(digest, &k256_sig, recovery_id)
        .map_err(|_| CryptoError::SignatureVerificationFailed)?;
    Ok(identity_from_verifying_key(&verifying_key))
}

fn identity_from_verifying_key(key: &VerifyingKey) -> Identity {
    let uncompressed = key.to_encoded_point(false);
    let mut hasher = Keccak256::new();
    hasher.update(&uncompressed.as_bytes()[1..]);
    let hash: [u8; 32] = hasher.finalize().into();
    let mut out = [0u8; 20];
    out.copy_from_slice(&hash[12..]);
    out
}

/// Verify that `sig` over `digest` recovers to exactly `expected`.
pub fn verify_signer(digest: &[u8; 32], sig: &Signature, expected: &Identity) -> bool {
    matches!(recover(digest, sig), Ok(identity) if &identity == expected)
}
