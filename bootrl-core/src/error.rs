//! Errors in the core crate.
use thiserror::Error;

/// Error type of the core crate.
#[derive(Debug, Error)]
pub enum BootrlError {
    /// A record value was accessed with a type it does not hold.
    #[error("Record value type mismatch for key {0}")]
    RecordValueTypeError(String),

    /// A record key was not found.
    #[error("Record key {0} was not found")]
    RecordKeyError(String),
}
