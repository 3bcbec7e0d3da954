//! Outbound dependencies BetBook calls into. Concrete adapters (holding a lock-guarded
//! `StakingLedger` / `ProtocolRegistry` / `OperationRegistry`) are injected
//! as `Arc<dyn Trait>` by whoever wires the hub together, which is how the
//! BetBook<->StakingLedger and BetBook<->ProtocolRegistry reference cycles
//! are broken without either crate depending on the other.

use crate::error::BetBookError;
use crate::types::BetType;
use photon_types::{AgentId, ProtocolId, TransmitterId};
use primitive_types::U256;

/// BetBook's view of `StakingLedger`, exercised under the `AB_MANAGER`
/// capability at the adapter.
pub trait StakingPort: Send + Sync {
    fn lock_agent_stake(&self, agent: AgentId, amount: U256) -> Result<(), BetBookError>;
    fn unlock_agent_stake(&self, agent: AgentId, amount: U256) -> Result<(), BetBookError>;
    /// Slash up to `amount` of unlocked personal stake; returns the amount moved.
    fn slash(&self, agent: AgentId, amount: U256) -> Result<U256, BetBookError>;
    /// Forfeit up to `amount` of already-locked personal stake straight to
    /// the system fee (timed-out bets).
    fn forfeit_locked(&self, agent: AgentId, amount: U256) -> Result<U256, BetBookError>;
}

/// BetBook's view of `ProtocolRegistry` plus the agent/transmitter
/// directory and the live transmitter set `OperationRegistry` maintains.
pub trait ProtocolPort: Send + Sync {
    fn is_gov(&self, protocol_id: ProtocolId) -> bool;
    fn is_paused(&self, protocol_id: ProtocolId) -> bool;
    fn is_manual_transmitter(&self, protocol_id: ProtocolId, transmitter: TransmitterId) -> bool;
    fn agent_for_transmitter(&self, transmitter: TransmitterId) -> Option<AgentId>;
    fn bet_amount(&self, protocol_id: ProtocolId, bet_type: BetType) -> U256;
    fn reward_amount(&self, protocol_id: ProtocolId, bet_type: BetType, is_first: bool) -> U256;
    fn min_personal_amount(&self, protocol_id: ProtocolId) -> U256;
    /// `true` on success (balance debited); `false` pauses the protocol and
    /// leaves the balance untouched.
    fn deduce_fee(&self, protocol_id: ProtocolId, amount: U256) -> bool;
    fn protocol_fee(&self, protocol_id: ProtocolId) -> U256;
    /// Best-effort system fee credit; failures here are swallowed by the
    /// caller.
    fn credit_system_fee(&self, amount: U256);
    /// Transmitter set currently allowed for the protocol.
    fn current_transmitters(&self, protocol_id: ProtocolId) -> Vec<TransmitterId>;
}

/// BetBook's view of `OperationRegistry::removeTransmitter`, invoked on the
/// `slashingBorder`-th consecutive inactivity miss.
pub trait OperationRegistryPort: Send + Sync {
    fn remove_transmitter(&self, protocol_id: ProtocolId, transmitter: TransmitterId);
}
