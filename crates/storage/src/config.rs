//! Host configuration and namespace identity
//!
//! The core never discovers file system paths or application identity on its
//! own; the hosting application supplies both through [`StoreConfig`]. The
//! namespace identifier is derived deterministically from that identity, so
//! the same application always reopens the same namespace.

use std::path::{Path, PathBuf};
use xxhash_rust::xxh3::xxh3_64;

/// Fixed conventional name of the backing file inside the data directory
pub const PREFS_FILE_NAME: &str = "prefs.dat";

/// Host-supplied configuration for a storage backend.
///
/// # Example
///
/// ```ignore
/// let config = StoreConfig::new("/var/lib/myapp", "AcmeCo", "Launcher")
///     .with_build_id("1.4.2");
/// let backend = FlatFileBackend::new(config);
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Persistent-storage directory supplied by the host environment
    pub data_dir: PathBuf,
    /// Company / vendor name, part of the application identity
    pub company: String,
    /// Product name, part of the application identity
    pub product: String,
    /// Optional build identifier folded into the namespace id
    pub build_id: Option<String>,
}

impl StoreConfig {
    /// Create a configuration from the host-supplied directory and identity.
    pub fn new(
        data_dir: impl AsRef<Path>,
        company: impl Into<String>,
        product: impl Into<String>,
    ) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            company: company.into(),
            product: product.into(),
            build_id: None,
        }
    }

    /// Fold a build identifier into the application identity.
    pub fn with_build_id(mut self, build_id: impl Into<String>) -> Self {
        self.build_id = Some(build_id.into());
        self
    }

    /// Derive the stable namespace identifier for this application identity.
    ///
    /// The identifier is a decimal rendering of a 64-bit hash over
    /// company + product (+ build id when present). It is deterministic
    /// across runs and platforms.
    pub fn namespace_id(&self) -> String {
        let mut identity = String::with_capacity(
            self.company.len()
                + self.product.len()
                + self.build_id.as_deref().map_or(0, str::len),
        );
        identity.push_str(&self.company);
        identity.push_str(&self.product);
        if let Some(build_id) = &self.build_id {
            identity.push_str(build_id);
        }
        xxh3_64(identity.as_bytes()).to_string()
    }

    /// Full path of the backing file.
    pub fn file_path(&self) -> PathBuf {
        self.data_dir.join(PREFS_FILE_NAME)
    }
}
