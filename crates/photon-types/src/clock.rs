//! Wall-clock and external-ordering abstractions shared by every component
//! that needs "now" or "the current externally-ordered sequence number"
//! (block + index on-chain, input queue order here). Kept as a trait rather
//! than a direct `SystemTime::now()` call so tests can drive deterministic
//! time.

/// Unix-epoch seconds.
pub trait Clock: Send + Sync {
    fn now_unix(&self) -> u64;
}

/// Production clock backed by `SystemTime`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}

/// Deterministic clock for tests: advances only when told to.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub u64);

impl Clock for FixedClock {
    fn now_unix(&self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_is_nonzero_after_epoch() {
        assert!(SystemClock.now_unix() > 0);
    }

    #[test]
    fn fixed_clock_returns_fixed_value() {
        assert_eq!(FixedClock(42).now_unix(), 42);
    }
}
