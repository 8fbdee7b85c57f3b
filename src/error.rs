//! Construction-time failures.
//!
//! Protocol-level failures (bad acks, out-of-window data, RST) are not
//! represented here -- they are silent and observable only through the
//! sticky flags described on [`crate::byte_stream`]. This type exists only
//! for the handful of preconditions a caller can get wrong when wiring a
//! connection together.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("byte stream capacity must be strictly positive")]
    ZeroCapacity,
    #[error("initial RTO must be strictly positive")]
    ZeroInitialRto,
}

pub type Result<T> = std::result::Result<T, Error>;
