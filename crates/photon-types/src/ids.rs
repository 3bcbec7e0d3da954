//! Identifier types.

use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 32-byte application-chosen protocol tag.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProtocolId(pub [u8; 32]);

impl ProtocolId {
    pub const ZERO: ProtocolId = ProtocolId([0u8; 32]);

    pub fn from_tag(tag: &str) -> Self {
        let mut bytes = [0u8; 32];
        let src = tag.as_bytes();
        let len = src.len().min(32);
        bytes[..len].copy_from_slice(&src[..len]);
        Self(bytes)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Debug for ProtocolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProtocolId(0x{})", hex::encode(self.0))
    }
}

/// Unsigned 256-bit destination/source chain identifier.
pub type ChainId = U256;

/// Variable-length destination-chain address (1..=128 bytes).
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OpaqueAddr(pub Vec<u8>);

impl OpaqueAddr {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn is_zero_length(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for OpaqueAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OpaqueAddr(0x{})", hex::encode(&self.0))
    }
}

macro_rules! ident20 {
    ($name:ident) => {
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub [u8; 20]);

        impl $name {
            pub const ZERO: $name = $name([0u8; 20]);

            pub fn is_zero(&self) -> bool {
                self.0 == [0u8; 20]
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "(0x{})"), hex::encode(self.0))
            }
        }
    };
}

ident20!(TransmitterId);
ident20!(AgentId);
ident20!(DelegatorId);
ident20!(WatcherId);

/// 256-bit digest of the canonical operation encoding; primary key of an
/// [`crate::wire::OperationData`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OpHash(pub [u8; 32]);

impl OpHash {
    pub fn as_u256(&self) -> U256 {
        U256::from_big_endian(&self.0)
    }
}

impl fmt::Debug for OpHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OpHash(0x{})", hex::encode(self.0))
    }
}

/// Monotonically increasing round counter. Rounds start at 1.
pub type RoundId = u64;

pub const FIRST_ROUND: RoundId = 1;
