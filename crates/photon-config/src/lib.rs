//! Process-wide tunables.
//!
//! Modeled as a plain configuration value constructed once at startup and
//! passed down by reference — not a process-wide mutable static.

use photon_types::RATE_SCALE;
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("agentRewardFee must be <= {RATE_SCALE}")]
    InvalidAgentRewardFee,
    #[error("betTimeout must be >= 30 days")]
    BetTimeoutTooShort,
    #[error("maxTransmittersCount must be nonzero")]
    InvalidMaxTransmitters,
    #[error("minRoundTime must be nonzero")]
    InvalidMinRoundTime,
    #[error("slashingBorder must be nonzero")]
    InvalidSlashingBorder,
}

/// Process-wide tunables. Every field here corresponds 1:1 to a named
/// setter; all setters are admin-only at the call site (the config value
/// itself has no authorization concept — the caller applying a capability
/// check owns that).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Destination for collected protocol/system fees.
    pub fee_collector: [u8; 20],
    pub protocol_register_fee: U256,
    pub manual_transmitter_fee: U256,
    pub change_protocol_params_fee: U256,
    pub min_protocol_balance: U256,
    pub max_transmitters_count: u32,
    /// Scaled /10000; system's cut of every bet reward.
    pub agent_reward_fee: u32,
    pub agent_stake_per_transmitter: U256,
    /// Consecutive-miss count before an inactive transmitter is slashed.
    pub slashing_border: u32,
    pub protocol_operation_fee: U256,
    pub init_new_chain_fee: U256,
    /// Seconds; must be >= 30 days.
    pub bet_timeout_secs: u64,
    /// Seconds; minimum gap between round turns.
    pub min_round_time_secs: u64,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            fee_collector: [0u8; 20],
            protocol_register_fee: U256::zero(),
            manual_transmitter_fee: U256::zero(),
            change_protocol_params_fee: U256::zero(),
            min_protocol_balance: U256::zero(),
            max_transmitters_count: 100,
            agent_reward_fee: 1000,
            agent_stake_per_transmitter: U256::zero(),
            slashing_border: 3,
            protocol_operation_fee: U256::zero(),
            init_new_chain_fee: U256::zero(),
            bet_timeout_secs: 30 * 24 * 60 * 60,
            min_round_time_secs: 3600,
        }
    }
}

impl GlobalConfig {
    /// Reject an internally-inconsistent config before it is ever wired in.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agent_reward_fee as u64 > RATE_SCALE as u64 {
            return Err(ConfigError::InvalidAgentRewardFee);
        }
        if self.bet_timeout_secs < photon_types::MIN_BET_TIMEOUT_SECS {
            return Err(ConfigError::BetTimeoutTooShort);
        }
        if self.max_transmitters_count == 0 {
            return Err(ConfigError::InvalidMaxTransmitters);
        }
        if self.min_round_time_secs == 0 {
            return Err(ConfigError::InvalidMinRoundTime);
        }
        if self.slashing_border == 0 {
            return Err(ConfigError::InvalidSlashingBorder);
        }
        Ok(())
    }

    pub fn set_agent_reward_fee(&mut self, fee: u32) -> Result<(), ConfigError> {
        if fee as u64 > RATE_SCALE as u64 {
            return Err(ConfigError::InvalidAgentRewardFee);
        }
        self.agent_reward_fee = fee;
        Ok(())
    }

    pub fn set_bet_timeout_secs(&mut self, secs: u64) -> Result<(), ConfigError> {
        if secs < photon_types::MIN_BET_TIMEOUT_SECS {
            return Err(ConfigError::BetTimeoutTooShort);
        }
        self.bet_timeout_secs = secs;
        Ok(())
    }

    pub fn set_min_round_time_secs(&mut self, secs: u64) -> Result<(), ConfigError> {
        if secs == 0 {
            return Err(ConfigError::InvalidMinRoundTime);
        }
        self.min_round_time_secs = secs;
        Ok(())
    }

    pub fn set_slashing_border(&mut self, border: u32) -> Result<(), ConfigError> {
        if border == 0 {
            return Err(ConfigError::InvalidSlashingBorder);
        }
        self.slashing_border = border;
        Ok(())
    }

    pub fn set_max_transmitters_count(&mut self, count: u32) -> Result<(), ConfigError> {
        if count == 0 {
            return Err(ConfigError::InvalidMaxTransmitters);
        }
        self.max_transmitters_count = count;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(GlobalConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_agent_reward_fee_over_scale() {
        let mut cfg = GlobalConfig::default();
        assert_eq!(
            cfg.set_agent_reward_fee(RATE_SCALE + 1),
            Err(ConfigError::InvalidAgentRewardFee)
        );
    }

    #[test]
    fn rejects_short_bet_timeout() {
        let mut cfg = GlobalConfig::default();
        assert_eq!(
            cfg.set_bet_timeout_secs(60),
            Err(ConfigError::BetTimeoutTooShort)
        );
    }

    #[test]
    fn rejects_zero_slashing_border() {
        let mut cfg = GlobalConfig::default();
        assert_eq!(cfg.set_slashing_border(0), Err(ConfigError::InvalidSlashingBorder));
    }
}
