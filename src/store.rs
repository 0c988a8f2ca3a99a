//! Store facade: the single entry point application code calls
//!
//! A [`PrefStore`] owns one boxed backend and a dirty flag. Typed setters
//! encode through the value codec and mark the store dirty; typed getters
//! decode and return the type's zero value for absent keys. Nothing is
//! persisted until the caller flushes with [`PrefStore::save`] — except
//! `delete_key`, which the backend writes through immediately.
//!
//! The store is an explicit object, not process-wide state: hosts own it,
//! pass it by reference, and may create several independent stores (which
//! is also what makes it testable).

use prefstore_core::{Color, Error, PrefValue, Quat, Rect, Result, Vec2, Vec3, Vec4};
use prefstore_storage::{Backend, BackendExt};

/// Typed key-value store over a pluggable storage backend.
///
/// # Example
///
/// ```ignore
/// use prefstore::{FlatFileBackend, PrefStore, StoreConfig};
///
/// let config = StoreConfig::new(data_dir, "AcmeCo", "Launcher");
/// let mut store = PrefStore::with_backend(Box::new(FlatFileBackend::new(config)));
/// store.initialize()?;
///
/// store.set_int("launch_count", 3)?;
/// store.set_string("last_user", "alice")?;
/// store.save()?;
/// ```
#[derive(Default)]
pub struct PrefStore {
    backend: Option<Box<dyn Backend>>,
    dirty: bool,
}

impl PrefStore {
    /// Create a store with no backend bound.
    ///
    /// Every operation except [`PrefStore::set_backend`] fails with
    /// [`Error::NoBackend`] until a backend is bound.
    pub fn new() -> Self {
        Self {
            backend: None,
            dirty: false,
        }
    }

    /// Create a store bound to the given backend.
    pub fn with_backend(backend: Box<dyn Backend>) -> Self {
        Self {
            backend: Some(backend),
            dirty: false,
        }
    }

    /// Bind or replace the active backend.
    pub fn set_backend(&mut self, backend: Box<dyn Backend>) {
        self.backend = Some(backend);
    }

    /// Whether unsaved writes exist since the last successful flush.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn backend_mut(&mut self) -> Result<&mut (dyn Backend + '_)> {
        match self.backend.as_deref_mut() {
            Some(backend) => Ok(backend),
            None => Err(Error::NoBackend),
        }
    }

    /// Initialize the bound backend (open or create the backing file).
    pub fn initialize(&mut self) -> Result<bool> {
        self.backend_mut()?.initialize()
    }

    /// Re-parse the backing file, replacing in-memory contents.
    pub fn load(&mut self) -> Result<()> {
        self.backend_mut()?.load()
    }

    /// Membership test for `key` in the active namespace.
    pub fn has_key(&mut self, key: &str) -> Result<bool> {
        self.backend_mut()?.has_key(key)
    }

    /// Store a typed value under `key` and mark the store dirty.
    pub fn set<T: PrefValue>(&mut self, key: &str, value: T) -> Result<()> {
        self.backend_mut()?.write_value(key, &value)?;
        self.dirty = true;
        Ok(())
    }

    /// Read the value under `key` as `T`.
    ///
    /// Returns `T::zero()` when the key is absent. Requesting a type other
    /// than the one used to write the key is a contract violation and
    /// surfaces as [`Error::Decode`].
    pub fn get<T: PrefValue>(&mut self, key: &str) -> Result<T> {
        self.backend_mut()?.read_value(key)
    }

    /// Remove `key` from the active namespace (write-through).
    pub fn delete_key(&mut self, key: &str) -> Result<()> {
        self.backend_mut()?.delete_key(key)
    }

    /// Clear the active namespace.
    pub fn delete_all(&mut self) -> Result<()> {
        self.backend_mut()?.delete_all()
    }

    /// Flush pending writes to the backing file.
    ///
    /// No-op when the store is clean; this is the only place persistence
    /// is gated, so hosts must call it explicitly (a final call before
    /// process exit covers the shutdown path).
    pub fn save(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        self.backend_mut()?.save()?;
        self.dirty = false;
        Ok(())
    }

    /// Release the backend's write handle.
    pub fn dispose(&mut self) {
        if let Some(backend) = self.backend.as_deref_mut() {
            backend.dispose();
        }
    }

    // ========== Typed setters ==========

    /// Store a string.
    pub fn set_string(&mut self, key: &str, value: &str) -> Result<()> {
        self.set(key, value.to_string())
    }

    /// Store an `i32`.
    ///
    /// An empty key is rejected silently. Historically only the integer
    /// setter special-cased empty keys; that asymmetry is preserved.
    pub fn set_int(&mut self, key: &str, value: i32) -> Result<()> {
        if key.is_empty() {
            return Ok(());
        }
        self.set(key, value)
    }

    /// Store an `f32`.
    pub fn set_float(&mut self, key: &str, value: f32) -> Result<()> {
        self.set(key, value)
    }

    /// Store an `f64`.
    pub fn set_double(&mut self, key: &str, value: f64) -> Result<()> {
        self.set(key, value)
    }

    /// Store an `i64`.
    pub fn set_long(&mut self, key: &str, value: i64) -> Result<()> {
        self.set(key, value)
    }

    /// Store an `i16`.
    pub fn set_short(&mut self, key: &str, value: i16) -> Result<()> {
        self.set(key, value)
    }

    /// Store a `u32`.
    pub fn set_uint(&mut self, key: &str, value: u32) -> Result<()> {
        self.set(key, value)
    }

    /// Store a `u16`.
    pub fn set_ushort(&mut self, key: &str, value: u16) -> Result<()> {
        self.set(key, value)
    }

    /// Store a `u64`.
    pub fn set_ulong(&mut self, key: &str, value: u64) -> Result<()> {
        self.set(key, value)
    }

    /// Store a boolean.
    pub fn set_bool(&mut self, key: &str, value: bool) -> Result<()> {
        self.set(key, value)
    }

    /// Store a 2-component vector.
    pub fn set_vector2(&mut self, key: &str, value: Vec2) -> Result<()> {
        self.set(key, value)
    }

    /// Store a 3-component vector.
    pub fn set_vector3(&mut self, key: &str, value: Vec3) -> Result<()> {
        self.set(key, value)
    }

    /// Store a 4-component vector.
    pub fn set_vector4(&mut self, key: &str, value: Vec4) -> Result<()> {
        self.set(key, value)
    }

    /// Store a quaternion.
    pub fn set_quaternion(&mut self, key: &str, value: Quat) -> Result<()> {
        self.set(key, value)
    }

    /// Store an RGBA color.
    pub fn set_color(&mut self, key: &str, value: Color) -> Result<()> {
        self.set(key, value)
    }

    /// Store a byte blob.
    pub fn set_byte_array(&mut self, key: &str, value: &[u8]) -> Result<()> {
        self.set(key, value.to_vec())
    }

    /// Store a rectangle.
    pub fn set_rect(&mut self, key: &str, value: Rect) -> Result<()> {
        self.set(key, value)
    }

    // ========== Typed getters ==========

    /// Read a string; `""` when absent.
    pub fn get_string(&mut self, key: &str) -> Result<String> {
        self.get(key)
    }

    /// Read an `i32`; `0` when absent.
    pub fn get_int(&mut self, key: &str) -> Result<i32> {
        self.get(key)
    }

    /// Read an `f32`; `0.0` when absent.
    pub fn get_float(&mut self, key: &str) -> Result<f32> {
        self.get(key)
    }

    /// Read an `f64`; `0.0` when absent.
    pub fn get_double(&mut self, key: &str) -> Result<f64> {
        self.get(key)
    }

    /// Read an `i64`; `0` when absent.
    pub fn get_long(&mut self, key: &str) -> Result<i64> {
        self.get(key)
    }

    /// Read an `i16`; `0` when absent.
    pub fn get_short(&mut self, key: &str) -> Result<i16> {
        self.get(key)
    }

    /// Read a `u32`; `0` when absent.
    pub fn get_uint(&mut self, key: &str) -> Result<u32> {
        self.get(key)
    }

    /// Read a `u16`; `0` when absent.
    pub fn get_ushort(&mut self, key: &str) -> Result<u16> {
        self.get(key)
    }

    /// Read a `u64`; `0` when absent.
    pub fn get_ulong(&mut self, key: &str) -> Result<u64> {
        self.get(key)
    }

    /// Read a boolean; `false` when absent.
    pub fn get_bool(&mut self, key: &str) -> Result<bool> {
        self.get(key)
    }

    /// Read a 2-component vector; zero vector when absent.
    pub fn get_vector2(&mut self, key: &str) -> Result<Vec2> {
        self.get(key)
    }

    /// Read a 3-component vector; zero vector when absent.
    pub fn get_vector3(&mut self, key: &str) -> Result<Vec3> {
        self.get(key)
    }

    /// Read a 4-component vector; zero vector when absent.
    pub fn get_vector4(&mut self, key: &str) -> Result<Vec4> {
        self.get(key)
    }

    /// Read a quaternion; zero quaternion when absent.
    pub fn get_quaternion(&mut self, key: &str) -> Result<Quat> {
        self.get(key)
    }

    /// Read an RGBA color; transparent black when absent.
    pub fn get_color(&mut self, key: &str) -> Result<Color> {
        self.get(key)
    }

    /// Read a byte blob; empty when absent.
    pub fn get_byte_array(&mut self, key: &str) -> Result<Vec<u8>> {
        self.get(key)
    }

    /// Read a rectangle; zero rectangle when absent.
    pub fn get_rect(&mut self, key: &str) -> Result<Rect> {
        self.get(key)
    }
}
