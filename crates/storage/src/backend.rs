//! Storage backend contract
//!
//! A backend owns the mapping from namespace to key/value cells, persists it
//! to a single backing file, and loads it back. Every value crossing this
//! boundary is an already-encoded string cell; typed access is layered on
//! top by [`BackendExt`] so the trait itself stays object-safe and new
//! backends (encrypted, remote, ...) only implement the raw contract.
//!
//! ## Lifecycle
//!
//! Backends self-initialize lazily: any read or write on an uninitialized
//! backend first runs `initialize()`. The in-memory map is populated once at
//! initialize and mutated in place; it is persisted only on an explicit
//! `save()` — with one documented exception: `delete_key` is write-through.
//!
//! ## Concurrency
//!
//! Single-threaded cooperative model. All operations take `&mut self`, run
//! to completion on the caller's thread, and hold no locks.

use prefstore_core::{PrefValue, Result};
use std::collections::BTreeMap;

/// Namespace -> (key -> encoded cell). Ordered so saves are deterministic.
pub(crate) type NamespaceData = BTreeMap<String, BTreeMap<String, String>>;

/// Pluggable storage backend contract.
///
/// Both concrete backends ([`FlatFileBackend`](crate::FlatFileBackend) and
/// [`DelimitedTextBackend`](crate::DelimitedTextBackend)) implement this
/// full set; so must any external collaborator providing durable storage.
pub trait Backend {
    /// Open or create the backing file and populate the in-memory map.
    ///
    /// Idempotent: returns `Ok(true)` immediately when already initialized.
    /// When the file exists its contents are parsed and the namespace
    /// identifier found there is adopted; otherwise an empty namespace is
    /// created under a freshly generated identifier. Acquires the write
    /// handle that `save()` reuses until [`Backend::dispose`].
    fn initialize(&mut self) -> Result<bool>;

    /// Membership test within the active namespace.
    ///
    /// Lazily initializes. An empty key is never present.
    fn has_key(&mut self, key: &str) -> Result<bool>;

    /// Re-parse the backing file, replacing in-memory contents for all
    /// namespaces found.
    fn load(&mut self) -> Result<()>;

    /// Serialize every namespace to the backing file, truncating to exactly
    /// the current in-memory state. Idempotent.
    fn save(&mut self) -> Result<()>;

    /// Upsert `key -> cell` into the active namespace.
    ///
    /// No dirty-flag bookkeeping happens here; that is the store facade's
    /// responsibility.
    fn write_cell(&mut self, key: &str, cell: String) -> Result<()>;

    /// Raw cell lookup in the active namespace; `None` when absent.
    fn read_cell(&mut self, key: &str) -> Result<Option<String>>;

    /// Remove the key from the active namespace, then persist immediately.
    ///
    /// Deletion is always write-through; other mutations wait for `save()`.
    fn delete_key(&mut self, key: &str) -> Result<()>;

    /// Clear the active namespace. When no write handle is held, the
    /// backing file is also deleted from disk.
    fn delete_all(&mut self) -> Result<()>;

    /// Release the write handle. Also happens on drop.
    fn dispose(&mut self);
}

/// Typed read/write surface over any [`Backend`].
///
/// Blanket-implemented for every backend (including trait objects), this
/// collapses the per-type read/write capability set into two generic
/// functions routed through the value codec.
pub trait BackendExt {
    /// Encode `value` and upsert it under `key`.
    fn write_value<T: PrefValue>(&mut self, key: &str, value: &T) -> Result<()>;

    /// Read and decode the cell under `key` as `T`.
    ///
    /// Returns `T::zero()` when the key is absent; decode failures (wrong
    /// type requested for the key) propagate as errors.
    fn read_value<T: PrefValue>(&mut self, key: &str) -> Result<T>;
}

impl<B: Backend + ?Sized> BackendExt for B {
    fn write_value<T: PrefValue>(&mut self, key: &str, value: &T) -> Result<()> {
        self.write_cell(key, value.encode())
    }

    fn read_value<T: PrefValue>(&mut self, key: &str) -> Result<T> {
        match self.read_cell(key)? {
            Some(cell) => T::decode(&cell),
            None => Ok(T::zero()),
        }
    }
}
