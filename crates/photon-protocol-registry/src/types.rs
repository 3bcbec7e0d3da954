use photon_types::{ChainId, OpaqueAddr, TransmitterId};
use primitive_types::U256;
use std::collections::HashMap;

/// Consensus/economic knobs that exist in a `realtime` (settable any time)
/// and `active` (used by the current round) pair — .
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolParams {
    pub consensus_target_rate: u32,
    pub max_transmitters: u32,
    pub min_delegate_stake: U256,
    pub min_personal_stake: U256,
    pub bet_amount_msg: U256,
    pub bet_amount_data: U256,
    pub reward_msg_first: U256,
    pub reward_msg: U256,
    pub reward_data_first: U256,
    pub reward_data: U256,
}

impl Default for ProtocolParams {
    fn default() -> Self {
        Self {
            consensus_target_rate: 6000,
            max_transmitters: 1,
            min_delegate_stake: U256::zero(),
            min_personal_stake: U256::zero(),
            bet_amount_msg: U256::zero(),
            bet_amount_data: U256::zero(),
            reward_msg_first: U256::zero(),
            reward_msg: U256::zero(),
            reward_data_first: U256::zero(),
            reward_data: U256::zero(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProtocolInfo {
    pub owner: [u8; 20],
    pub realtime: ProtocolParams,
    pub active: ProtocolParams,
    pub balance: U256,
    /// Per-operation fee deducted alongside bet rewards (`ProtocolInfo.fee`).
    pub fee: U256,
    pub manual_transmitters: Vec<TransmitterId>,
    pub is_active: bool,
    pub paused: bool,
    pub executors: HashMap<ChainId, Vec<OpaqueAddr>>,
}

impl ProtocolInfo {
    pub fn new(owner: [u8; 20], params: ProtocolParams, manual_transmitters: Vec<TransmitterId>) -> Self {
        Self {
            owner,
            realtime: params.clone(),
            active: params,
            balance: U256::zero(),
            fee: U256::zero(),
            manual_transmitters,
            is_active: true,
            paused: false,
            executors: HashMap::new(),
        }
    }
}

/// An action `ProtocolRegistry::turn_round` cannot carry out itself — it has
/// no handle to `OperationRegistry`/`EndpointEmitter` by design, so it is
/// returned for the round orchestrator to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    PropagateConsensusRate { protocol_id: photon_types::ProtocolId, new_rate: u32 },
    PauseProtocol { protocol_id: photon_types::ProtocolId },
    ReplaceTransmittersEmpty { protocol_id: photon_types::ProtocolId },
    ReleaseBalanceToOwner { protocol_id: photon_types::ProtocolId, owner: [u8; 20], amount: U256 },
}
