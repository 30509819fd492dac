//! Check Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction. Per-image problems (an unreachable registry, a garbled
//! digest) are absorbed where they happen; only what aborts a whole cycle
//! ends up here.

use derive_more::{Display, Error};

/// A check error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for check operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The layer store failed; the cycle was abandoned without committing.
    #[display("layer store failed during check cycle")]
    Store,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
