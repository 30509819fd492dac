//! Runtime Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};

/// An external command error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for external command operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("{_0} not found in PATH")]
    NotFound(#[error(not(source))] &'static str),
    #[display("{_0} did not finish in time")]
    Timeout(#[error(not(source))] &'static str),
    /// The program ran but reported failure.
    #[display("{program} exited unsuccessfully ({status}): {stderr}")]
    Failed {
        program: &'static str,
        status: String,
        stderr: String,
    },
    /// The program could not be spawned or waited on.
    Io,
    /// The program succeeded but printed something we can't understand.
    #[display("unexpected output from {_0}")]
    InvalidOutput(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Failed { .. })
    }
}
