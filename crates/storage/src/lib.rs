//! Storage backends for prefstore
//!
//! This crate defines the pluggable backend contract and the two concrete
//! file backends:
//! - Backend / BackendExt: the raw and typed storage contracts
//! - StoreConfig: host-supplied paths and application identity
//! - FlatFileBackend: line-oriented `key=value` text
//! - DelimitedTextBackend: delimiter-escaped JSON records
//!
//! The two file layouts are mutually incompatible on the same file; no
//! format version marker exists.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod config;
pub mod delimited;
pub mod flat_file;

pub use backend::{Backend, BackendExt};
pub use config::{StoreConfig, PREFS_FILE_NAME};
pub use delimited::DelimitedTextBackend;
pub use flat_file::FlatFileBackend;
