//! prefstore - typed key-value preference store with pluggable file backends
//!
//! A small embedded preference store: typed values under string keys, with
//! durability delegated to an interchangeable storage backend. Two backends
//! ship with the crate, each with its own textual on-disk layout:
//! [`FlatFileBackend`] (line-oriented `key=value`) and
//! [`DelimitedTextBackend`] (delimiter-escaped JSON records).
//!
//! # Quick Start
//!
//! ```ignore
//! use prefstore::{FlatFileBackend, PrefStore, StoreConfig, Vec3};
//!
//! let config = StoreConfig::new("/var/lib/myapp", "AcmeCo", "Launcher");
//! let mut store = PrefStore::with_backend(Box::new(FlatFileBackend::new(config)));
//! store.initialize()?;
//!
//! store.set_int("launch_count", 3)?;
//! store.set_vector3("spawn", Vec3::new(3.0, 4.0, 5.0))?;
//! store.save()?; // nothing touches disk until this
//! ```
//!
//! # Architecture
//!
//! Calls flow facade -> codec -> backend: the [`PrefStore`] facade encodes
//! values through the [`PrefValue`] codec, the backend mutates its in-memory
//! map, and an explicit [`PrefStore::save`] flushes the whole map to file.
//! Reads decode straight out of the in-memory map; backends self-initialize
//! lazily on first access.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod store;

pub use store::PrefStore;

pub use prefstore_core::{
    Color, Error, PrefValue, Quat, Rect, Result, Vec2, Vec3, Vec4, COMPONENT_SEPARATOR,
};
pub use prefstore_storage::{
    Backend, BackendExt, DelimitedTextBackend, FlatFileBackend, StoreConfig, PREFS_FILE_NAME,
};
