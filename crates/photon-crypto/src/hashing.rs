//! # Keccak256 Hashing
//!
//! The hub hashes operation payloads and signs them the same way an
//! Ethereum "personal sign" wallet would, so off-chain transmitters can use
//! standard signing tooling.

use sha3::{Digest, Keccak256};

/// Keccak256 digest output.
pub type Hash = [u8; 32];

/// One-shot Keccak256 hash.
pub fn keccak(data: &[u8]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Hash multiple inputs as if concatenated.
pub fn keccak_many(inputs: &[&[u8]]) -> Hash {
    let mut hasher = Keccak256::new();
    for input in inputs {
        hasher.update(input);
    }
    hasher.finalize().into()
}

const ETH_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n32";

/// `keccak("\x19Ethereum Signed Message:\n32" || keccak(msg))`.
///
/// This is the digest that is actually signed/recovered; it ties every
/// signature to the standard personal-sign path so off-chain transmitters
/// can use ordinary wallet tooling.
pub fn eth_signed_digest(msg: &[u8]) -> Hash {
    let inner = keccak(msg);
    keccak_many(&[ETH_PREFIX, &inner])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        assert_eq!(keccak(b"hello"), keccak(b"hello"));
    }

    #[test]
    fn different_inputs_differ() {
        assert_ne!(keccak(b"hello"), keccak(b"world"));
    }

    #[test]
    fn many_matches_concatenation() {
        let a = keccak(b"helloworld");
        let b = keccak_many(&[b"hello", b"world"]);
        assert_eq!(a, b);
    }

    #[test]
    fn eth_signed_digest_is_not_the_raw_hash() {
        assert_ne!(eth_signed_digest(b"msg"), keccak(b"msg"));
    }
}
