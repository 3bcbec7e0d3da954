//! Outbound transport boundary: the destination-chain governance mirror is
//! modeled only as a wire-protocol sink. Wiring a production transport (an
//! EVM/Solana RPC client) is explicitly out of scope — this crate ships
//! only the trait and an in-memory recording double for tests, in a
//! mock-friendly shape.

use photon_types::{ChainId, OpaqueAddr};

/// Delivers already-encoded wire bytes to a destination chain's gov
/// contract address. Implementations own retries, confirmation tracking,
/// and `handleAddAllowedProtocol`-style callbacks; none of that is this
/// crate's concern.
pub trait EndpointTransport: Send + Sync {
    fn send(&self, chain_id: ChainId, dest_gov_address: OpaqueAddr, wire_bytes: Vec<u8>);
}

/// Test double: records every send in order instead of delivering it
/// anywhere.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: parking_lot::Mutex<Vec<(ChainId, OpaqueAddr, Vec<u8>)>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(ChainId, OpaqueAddr, Vec<u8>)> {
        self.sent.lock().clone()
    }
}

impl EndpointTransport for RecordingTransport {
    fn send(&self, chain_id: ChainId, dest_gov_address: OpaqueAddr, wire_bytes: Vec<u8>) {
        self.sent.lock().push((chain_id, dest_gov_address, wire_bytes));
    }
}
