//! Size caps and rate-scaling constants from .

/// Rate values are integers scaled so that 10000 == 100%.
pub const RATE_SCALE: u32 = 10000;

/// Consensus target rates must be strictly greater than this...
pub const MIN_CONSENSUS_RATE_EXCLUSIVE: u32 = 5500;

/// ...and at most this.
pub const MAX_CONSENSUS_RATE: u32 = 10000;

/// Default watcher consensus target rate.
pub const DEFAULT_WATCHER_CONSENSUS_RATE: u32 = 6000;

/// Maximum length of a protocol-side destination address.
pub const ADDRESS_MAX_LEN: usize = 128;

/// Maximum length of an operation's `params` payload.
pub const PARAMS_MAX_LEN: usize = 4096;

/// Maximum length of a function selector payload.
pub const SELECTOR_MAX_LEN: usize = 32;

/// Minimum bet timeout: 30 days, in seconds.
pub const MIN_BET_TIMEOUT_SECS: u64 = 30 * 24 * 60 * 60;

/// Reserved protocol id for the hub's own governance traffic.
///
/// Distinct from the zero id: a zero `ProtocolId` is rejected everywhere as
/// "unset", while this sentinel is a valid, well-known protocol id that
/// routes through the same consensus pipeline as user traffic.
pub const GOV_PROTOCOL_ID: [u8; 32] = *b"__PHOTON_GOV_PROTOCOL___________";
