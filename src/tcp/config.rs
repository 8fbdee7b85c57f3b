//! Typed configuration surface. There is no file, environment, or
//! persisted configuration anywhere in this crate -- a `TcpConfig` is
//! just a grouping of the handful of scalar knobs a sender/receiver pair
//! needs, so callers pass one value instead of four.

/// Conventional default: bounds payload size per outgoing segment.
pub const DEFAULT_MAX_PAYLOAD_SIZE: usize = 1000;
/// Conventional default initial retransmission timeout.
pub const DEFAULT_INITIAL_RTO_MS: u64 = 1000;
/// Conventional default stream capacity.
pub const DEFAULT_CAPACITY: u64 = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpConfig {
    pub capacity: u64,
    pub initial_rto_ms: u64,
    pub max_payload_size: usize,
}

impl Default for TcpConfig {
    fn default() -> Self {
        TcpConfig {
            capacity: DEFAULT_CAPACITY,
            initial_rto_ms: DEFAULT_INITIAL_RTO_MS,
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
        }
    }
}
