//! Error types for prefstore
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use std::io;
use thiserror::Error;

/// Result type alias for prefstore operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the preference store
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error on the backing file (open/read/write)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A stored cell does not decode as the requested type
    ///
    /// Raised when a getter is called with a type different from the one
    /// used to write the key, or when the persisted cell is corrupt.
    #[error("cannot decode {value:?} as {type_name}")]
    Decode {
        /// Name of the type the caller requested
        type_name: &'static str,
        /// The raw cell content that failed to parse
        value: String,
    },

    /// A persisted record does not match the backend's file layout
    #[error("malformed record: {0}")]
    MalformedRecord(String),

    /// A store operation was invoked with no backend bound
    #[error("no storage backend bound")]
    NoBackend,
}

impl Error {
    /// Build a decode error for the given requested type and raw cell.
    pub fn decode(type_name: &'static str, value: &str) -> Self {
        Error::Decode {
            type_name,
            value: value.to_string(),
        }
    }
}
