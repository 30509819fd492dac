//! Store Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction. Every variant here is fatal to the running check cycle:
//! the caller abandons the store and the live generation stays untouched.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A store error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The backing file could not be created, opened or written.
    #[display("layer store unavailable: {}", _0.display())]
    Unavailable(#[error(not(source))] PathBuf),
    /// A statement against an open store failed.
    #[display("database error")]
    Database,
    /// The backing file could not be removed.
    #[display("could not reset layer store: {}", _0.display())]
    Reset(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
