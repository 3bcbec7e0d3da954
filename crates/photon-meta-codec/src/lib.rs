//! Operation-meta word codec.
//!
//! The meta is a 256-bit word: byte 0 is the version, byte 1 is the
//! in-order flag (0 or 1), bytes 2..31 are reserved and must survive every
//! setter call untouched.

use primitive_types::U256;

/// Read the version byte (byte 0).
pub fn get_version(meta: U256) -> u8 {
    let mut bytes = [0u8; 32];
    meta.to_little_endian(&mut bytes);
    bytes[0]
}

/// Set the version byte (byte 0), preserving every other byte.
pub fn set_version(meta: U256, version: u8) -> U256 {
    let mut bytes = [0u8; 32];
    meta.to_little_endian(&mut bytes);
    bytes[0] = version;
    U256::from_little_endian(&bytes)
}

/// Read the in-order flag (byte 1). Any nonzero byte reads as `true`.
pub fn is_in_order(meta: U256) -> bool {
    let mut bytes = [0u8; 32];
    meta.to_little_endian(&mut bytes);
    bytes[1] != 0
}

/// Set the in-order flag (byte 1), preserving every other byte.
pub fn set_in_order(meta: U256, in_order: bool) -> U256 {
    let mut bytes = [0u8; 32];
    meta.to_little_endian(&mut bytes);
    bytes[1] = u8::from(in_order);
    U256::from_little_endian(&bytes)
}

/// Build a meta word from scratch, reserved bytes zeroed.
pub fn pack(version: u8, in_order: bool) -> U256 {
    set_in_order(set_version(U256::zero(), version), in_order)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_round_trips() {
        let m = pack(0, false);
        let m = set_version(m, 7);
        assert_eq!(get_version(m), 7);
    }

    #[test]
    fn in_order_round_trips() {
        let m = pack(1, false);
        assert!(!is_in_order(m));
        let m = set_in_order(m, true);
        assert!(is_in_order(m));
        assert_eq!(get_version(m), 1, "setting in_order must not disturb version");
    }

    #[test]
    fn setters_preserve_reserved_bytes() {
        let mut bytes = [0u8; 32];
        bytes[2] = 0xAB;
        bytes[31] = 0xCD;
        let meta = U256::from_little_endian(&bytes);

        let meta = set_version(meta, 3);
        let meta = set_in_order(meta, true);

        let mut out = [0u8; 32];
        meta.to_little_endian(&mut out);
        assert_eq!(out[0], 3);
        assert_eq!(out[1], 1);
        assert_eq!(out[2], 0xAB);
        assert_eq!(out[31], 0xCD);
    }
}
