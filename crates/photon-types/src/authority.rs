//! Capability tokens.
//!
//! Roles are modeled as zero-sized marker types rather than a string-keyed
//! role set: holding a `Capability<Admin>` is a compile-time proof the
//! caller was handed admin authority by whoever assembled the hub, not a
//! runtime string comparison. `setContracts`-style one-shot wiring is
//! expressed by [`AuthorityTable`], built once at startup and then passed
//! down by reference.

use crate::ids::ProtocolId;
use std::marker::PhantomData;

/// Marker for a role. Implemented only by the role marker types below.
pub trait Role: Send + Sync + 'static {}

macro_rules! role {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $name;
        impl Role for $name {}
    };
}

role!(Admin, "Global configuration and parameter authority.");
role!(Approver, "Whitelisted external developer allowed to register protocols.");
role!(Endpoint, "The pluggable outbound transport's callback identity.");
role!(StakingContracts, "Capability held by the hub's own staking wiring.");
role!(AbManager, "Lock/unlock authority over agent personal stake (BetBook).");
role!(BetManager, "Authority to place/release/refund/prune bets.");
role!(RoundManager, "Authority to advance per-round state.");
role!(RoundTrigger, "Authority to call RoundCoordinator::turn_round.");
role!(Pruner, "Authority to prune timed-out bets.");

/// A capability token: proof the caller holds `R` authority. Does not carry
/// any data — it is a unit witness, constructed only by
/// [`AuthorityTable::grant`].
#[derive(Debug, Clone, Copy)]
pub struct Capability<R: Role>(PhantomData<R>);

impl<R: Role> Capability<R> {
    fn new() -> Self {
        Self(PhantomData)
    }
}

/// Per-protocol owner capability. Unlike the role markers above, protocol
/// ownership is keyed data (any of many protocol ids), so it is represented
/// as a value rather than a marker type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolOwnerCapability(pub ProtocolId);

/// Assembled once at process setup and handed to every component
/// constructor; mirrors the single-shot `setContracts` wiring call.
///
/// Holding an `AuthorityTable` does not itself prove authority — it is the
/// *issuer*. Call [`AuthorityTable::grant`] once per subsystem during
/// wiring and thread the resulting [`Capability`] down through that
/// subsystem's constructor, not through the table itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct AuthorityTable {
    sealed: bool,
}

impl AuthorityTable {
    pub fn new() -> Self {
        Self { sealed: false }
    }

    /// Grant a capability. Panics if called after [`AuthorityTable::seal`] —
    /// wiring is one-shot, mirroring an idempotent single-shot `setContracts`.
    pub fn grant<R: Role>(&self) -> Capability<R> {
        assert!(!self.sealed, "AuthorityTable is sealed: wiring is one-shot");
        Capability::new()
    }

    /// Freeze the table so no further capabilities can be minted.
    pub fn seal(&mut self) {
        self.sealed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grant_before_seal_succeeds() {
        let table = AuthorityTable::new();
        let _cap: Capability<Admin> = table.grant();
    }

    #[test]
    #[should_panic(expected = "sealed")]
    fn grant_after_seal_panics() {
        let mut table = AuthorityTable::new();
        table.seal();
        let _cap: Capability<Admin> = table.grant();
    }
}
