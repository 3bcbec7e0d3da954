//! Canonical operation wire format and governance message payloads.

use crate::constants::{ADDRESS_MAX_LEN, PARAMS_MAX_LEN, SELECTOR_MAX_LEN};
use crate::ids::{ChainId, OpaqueAddr, ProtocolId};
use primitive_types::U256;
use serde::{Deserialize, Serialize};

/// One leg of the cross-chain tx id pair (`srcOpTxId`, 2x32 bytes).
pub type TxIdHalf = [u8; 32];

/// The operation payload that is hashed, signed, and eventually carried to
/// the destination-chain endpoint.
///
/// Invariants: `protocol_addr.len() <= ADDRESS_MAX_LEN`,
/// `params.len() <= PARAMS_MAX_LEN`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationData {
    pub protocol_id: ProtocolId,
    /// Packed meta word; use `photon-meta-codec` to read/write fields.
    pub meta: U256,
    pub src_chain_id: ChainId,
    pub src_block_number: U256,
    pub src_op_tx_id: (TxIdHalf, TxIdHalf),
    pub nonce: U256,
    pub dest_chain_id: ChainId,
    pub protocol_addr: OpaqueAddr,
    pub function_selector: FunctionSelector,
    pub params: Vec<u8>,
    pub reserved: Vec<u8>,
}

/// Errors raised while validating or packing an [`OperationData`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("protocol address too big: {0} > {max}", max = ADDRESS_MAX_LEN)]
    AddrTooBig(usize),
    #[error("params too big: {0} > {max}", max = PARAMS_MAX_LEN)]
    ParamsTooBig(usize),
    #[error("selector too big: {0} > {max}", max = SELECTOR_MAX_LEN)]
    SelectorTooBig(usize),
}

impl OperationData {
    pub fn validate_sizes(&self) -> Result<(), WireError> {
        if self.protocol_addr.0.len() > ADDRESS_MAX_LEN {
            return Err(WireError::AddrTooBig(self.protocol_addr.0.len()));
        }
        if self.params.len() > PARAMS_MAX_LEN {
            return Err(WireError::ParamsTooBig(self.params.len()));
        }
        if self.function_selector.bytes.len() > SELECTOR_MAX_LEN {
            return Err(WireError::SelectorTooBig(self.function_selector.bytes.len()));
        }
        Ok(())
    }

    /// Deterministic big-endian tight packing, in the exact field order.
    /// This is the preimage hashed to produce `msgHash`.
    pub fn pack(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(256 + self.params.len());
        buf.extend_from_slice(&self.protocol_id.0);
        let mut meta_be = [0u8; 32];
        self.meta.to_big_endian(&mut meta_be);
        buf.extend_from_slice(&meta_be);
        let mut chain_be = [0u8; 32];
        self.src_chain_id.to_big_endian(&mut chain_be);
        buf.extend_from_slice(&chain_be);
        let mut blk_be = [0u8; 32];
        self.src_block_number.to_big_endian(&mut blk_be);
        buf.extend_from_slice(&blk_be);
        buf.extend_from_slice(&self.src_op_tx_id.0);
        buf.extend_from_slice(&self.src_op_tx_id.1);
        let mut nonce_be = [0u8; 32];
        self.nonce.to_big_endian(&mut nonce_be);
        buf.extend_from_slice(&nonce_be);
        let mut dest_be = [0u8; 32];
        self.dest_chain_id.to_big_endian(&mut dest_be);
        buf.extend_from_slice(&dest_be);
        buf.extend_from_slice(&self.protocol_addr.0);
        buf.extend_from_slice(&self.function_selector.encode());
        buf.extend_from_slice(&self.params);
        buf.extend_from_slice(&self.reserved);
        buf
    }
}

/// `selectorType` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum SelectorType {
    EvmAbi = 0,
    SolanaAnchor = 1,
    SolanaNative = 2,
}

impl SelectorType {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::EvmAbi),
            1 => Some(Self::SolanaAnchor),
            2 => Some(Self::SolanaNative),
            _ => None,
        }
    }
}

/// One byte `selectorType`, one byte `len` (<=32), then `len` bytes.
///
/// EVM selectors are carried as the 32-byte ABI-encoded form of a 4-byte
/// tag, so `len == 32` for `EvmAbi`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSelector {
    pub selector_type: SelectorType,
    pub bytes: Vec<u8>,
}

impl FunctionSelector {
    pub fn evm(tag: [u8; 4]) -> Self {
        let mut bytes = vec![0u8; 32];
        bytes[28..32].copy_from_slice(&tag);
        Self {
            selector_type: SelectorType::EvmAbi,
            bytes,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(2 + self.bytes.len());
        out.push(self.selector_type as u8);
        out.push(self.bytes.len() as u8);
        out.extend_from_slice(&self.bytes);
        out
    }
}

/// Stable EVM 4-byte tags for governance selectors.
pub mod gov_selectors {
    pub const ADD_ALLOWED_PROTOCOL: [u8; 4] = [0x45, 0xa0, 0x04, 0xb9];
    pub const ADD_ALLOWED_PROTOCOL_ADDRESS: [u8; 4] = [0xd2, 0x96, 0xa0, 0xff];
    pub const REMOVE_ALLOWED_PROTOCOL_ADDRESS: [u8; 4] = [0xb0, 0xa4, 0xca, 0x98];
    pub const ADD_ALLOWED_PROPOSER_ADDRESS: [u8; 4] = [0xce, 0x09, 0x40, 0xa5];
    pub const REMOVE_ALLOWED_PROPOSER_ADDRESS: [u8; 4] = [0xb8, 0xe5, 0xf3, 0xf4];
    pub const ADD_EXECUTOR: [u8; 4] = [0xe0, 0xaa, 0xfb, 0x68];
    pub const REMOVE_EXECUTOR: [u8; 4] = [0x04, 0xfa, 0x38, 0x4a];
    pub const ADD_TRANSMITTERS: [u8; 4] = [0x6c, 0x5f, 0x56, 0x66];
    pub const REMOVE_TRANSMITTERS: [u8; 4] = [0x52, 0x06, 0xda, 0x70];
    pub const UPDATE_TRANSMITTERS: [u8; 4] = [0x65, 0x4b, 0x46, 0xe1];
    pub const SET_CONSENSUS_TARGET_RATE: [u8; 4] = [0x97, 0x0b, 0x61, 0x09];
    pub const SET_DAO_PROTOCOL_OWNER: [u8; 4] = [0x1a, 0x2f, 0x6c, 0x83];
}

/// Which allow-list `AddOrRemoveActorAddress` is mutating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActorKind {
    Protocol,
    Proposer,
}

/// Tagged governance message payloads. Every admin
/// mutation maps to exactly one of these before being handed to
/// `photon-endpoint-emitter`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GovMessage {
    AddAllowedProtocol {
        protocol_id: ProtocolId,
        consensus_target_rate: u32,
        transmitters: Vec<crate::ids::TransmitterId>,
    },
    AddOrRemoveActorAddress {
        protocol_id: ProtocolId,
        actor_address: OpaqueAddr,
        kind: ActorKind,
        add: bool,
    },
    AddOrRemoveExecutor {
        protocol_id: ProtocolId,
        executor: OpaqueAddr,
        add: bool,
    },
    AddOrRemoveTransmitters {
        protocol_id: ProtocolId,
        transmitters: Vec<crate::ids::TransmitterId>,
        add: bool,
    },
    UpdateTransmitters {
        protocol_id: ProtocolId,
        to_add: Vec<crate::ids::TransmitterId>,
        to_remove: Vec<crate::ids::TransmitterId>,
    },
    SetConsensusTargetRate {
        protocol_id: ProtocolId,
        consensus_target_rate: u32,
    },
    SetDaoProtocolOwner {
        protocol_id: ProtocolId,
        protocol_owner: OpaqueAddr,
    },
}

impl GovMessage {
    /// The stable EVM selector this message maps to.
    pub fn selector_tag(&self) -> [u8; 4] {
        use gov_selectors::*;
        match self {
            GovMessage::AddAllowedProtocol { .. } => ADD_ALLOWED_PROTOCOL,
            GovMessage::AddOrRemoveActorAddress { kind, add, .. } => match (kind, add) {
                (ActorKind::Protocol, true) => ADD_ALLOWED_PROTOCOL_ADDRESS,
                (ActorKind::Protocol, false) => REMOVE_ALLOWED_PROTOCOL_ADDRESS,
                (ActorKind::Proposer, true) => ADD_ALLOWED_PROPOSER_ADDRESS,
                (ActorKind::Proposer, false) => REMOVE_ALLOWED_PROPOSER_ADDRESS,
            },
            GovMessage::AddOrRemoveExecutor { add, .. } => {
                if *add {
                    ADD_EXECUTOR
                } else {
                    REMOVE_EXECUTOR
                }
            }
            GovMessage::AddOrRemoveTransmitters { add, .. } => {
                if *add {
                    ADD_TRANSMITTERS
                } else {
                    REMOVE_TRANSMITTERS
                }
            }
            GovMessage::UpdateTransmitters { .. } => UPDATE_TRANSMITTERS,
            GovMessage::SetConsensusTargetRate { .. } => SET_CONSENSUS_TARGET_RATE,
            GovMessage::SetDaoProtocolOwner { .. } => SET_DAO_PROTOCOL_OWNER,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_is_deterministic() {
        let op = sample_op();
        assert_eq!(op.pack(), op.pack());
    }

    #[test]
    fn pack_changes_with_nonce() {
        let mut op = sample_op();
        let a = op.pack();
        op.nonce = U256::from(2u64);
        let b = op.pack();
        assert_ne!(a, b);
    }

    fn sample_op() -> OperationData {
        OperationData {
            protocol_id: ProtocolId::from_tag("demo"),
            meta: U256::zero(),
            src_chain_id: ChainId::from(1u64),
            src_block_number: U256::from(100u64),
            src_op_tx_id: ([1u8; 32], [2u8; 32]),
            nonce: U256::from(1u64),
            dest_chain_id: ChainId::from(2u64),
            protocol_addr: OpaqueAddr::new(vec![0xAA; 20]),
            function_selector: FunctionSelector::evm([0x01, 0x02, 0x03, 0x04]),
            params: vec![0xBB; 10],
            reserved: vec![],
        }
    }
}
