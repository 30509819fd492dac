//! Application Error Types

use derive_more::{Display, Error};

/// An application error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for the application.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("could not load configuration")]
    Config,
    #[display("could not reset the layer store")]
    Reset,
    #[display("required tooling is missing")]
    Tooling,
    #[display("could not open the layer store")]
    Store,
    #[display("check cycle failed")]
    Check,
}
