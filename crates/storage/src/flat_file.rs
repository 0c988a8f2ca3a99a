//! Flat-file backend: line-oriented `key=value` text
//!
//! ## File layout
//!
//! Each namespace is introduced by a header line `<namespace-id>`; every
//! following line until the next header is `key=value`. The first `=` is
//! the separator, so values may themselves contain `=`. Keys and values are
//! percent-escaped (`%` -> `%25`, `\n` -> `%0A`, `\r` -> `%0D`) so a cell
//! never spans lines; legacy files without escapes still parse. On save the
//! file is truncated and rewritten from scratch (write position reset to
//! start, never appended).
//!
//! ## Parser leniency
//!
//! A blank namespace header adopts a freshly generated identifier instead
//! of failing, and a key that is empty after trimming terminates parsing of
//! the current namespace early. Both are deliberate: availability over
//! strict validation.

use crate::backend::{Backend, NamespaceData};
use crate::config::StoreConfig;
use prefstore_core::Result;
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::PathBuf;
use tracing::{debug, warn};

const HEADER_START: char = '<';
const HEADER_END: char = '>';
const KEY_VALUE_SEPARATOR: char = '=';

/// Escape `%` and line breaks so a key or cell stays on one line.
fn escape_cell(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '%' => out.push_str("%25"),
            '\n' => out.push_str("%0A"),
            '\r' => out.push_str("%0D"),
            c => out.push(c),
        }
    }
    out
}

/// Reverse [`escape_cell`]. A `%` not followed by a known code passes
/// through untouched, so legacy unescaped cells survive.
fn unescape_cell(escaped: &str) -> String {
    let mut out = String::with_capacity(escaped.len());
    let bytes = escaped.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 3 <= bytes.len() {
            let decoded = match &bytes[i + 1..i + 3] {
                b"25" => Some('%'),
                b"0A" => Some('\n'),
                b"0D" => Some('\r'),
                _ => None,
            };
            if let Some(c) = decoded {
                out.push(c);
                i += 3;
                continue;
            }
        }
        match escaped[i..].chars().next() {
            Some(c) => {
                out.push(c);
                i += c.len_utf8();
            }
            None => break,
        }
    }
    out
}

/// Storage backend persisting to a line-oriented flat text file.
pub struct FlatFileBackend {
    config: StoreConfig,
    path: PathBuf,
    /// Identifier of the active namespace
    namespace: String,
    data: NamespaceData,
    /// Write handle held from initialize until dispose/drop
    writer: Option<File>,
    initialized: bool,
}

impl FlatFileBackend {
    /// Create an uninitialized backend for the given host configuration.
    pub fn new(config: StoreConfig) -> Self {
        let path = config.file_path();
        let namespace = config.namespace_id();
        Self {
            config,
            path,
            namespace,
            data: BTreeMap::new(),
            writer: None,
            initialized: false,
        }
    }

    /// Identifier of the active namespace.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn ensure_initialized(&mut self) -> Result<()> {
        if !self.initialized {
            self.initialize()?;
        }
        Ok(())
    }

    /// Replace in-memory contents with whatever the backing file holds.
    fn reload_from_disk(&mut self) -> Result<()> {
        self.data.clear();
        self.namespace = self.config.namespace_id();
        if self.path.exists() {
            let content = std::fs::read_to_string(&self.path)?;
            self.parse_content(&content);
        }
        // The active namespace always exists, even for a fresh/empty file.
        self.data.entry(self.namespace.clone()).or_default();
        Ok(())
    }

    fn parse_content(&mut self, content: &str) {
        let mut current: Option<String> = None;
        for raw in content.lines() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            if line.starts_with(HEADER_START) && line.ends_with(HEADER_END) {
                let mut id = line[1..line.len() - 1].trim().to_string();
                if id.is_empty() {
                    warn!("blank namespace header, adopting a fresh identifier");
                    id = self.config.namespace_id();
                }
                self.data.entry(id.clone()).or_default();
                self.namespace = id.clone();
                current = Some(id);
                continue;
            }
            let Some(ns) = current.as_ref() else {
                // Data lines before any header have no home; skip them.
                continue;
            };
            if let Some((key, value)) = line.split_once(KEY_VALUE_SEPARATOR) {
                let key = key.trim();
                if key.is_empty() {
                    // Defensive stop for this namespace, not an error.
                    current = None;
                    continue;
                }
                self.data
                    .entry(ns.clone())
                    .or_default()
                    .insert(unescape_cell(key), unescape_cell(value));
            }
        }
    }

    fn render(&self) -> String {
        let mut out = String::new();
        for (namespace, entries) in &self.data {
            out.push(HEADER_START);
            out.push_str(namespace);
            out.push(HEADER_END);
            out.push('\n');
            for (key, cell) in entries {
                out.push_str(&escape_cell(key));
                out.push(KEY_VALUE_SEPARATOR);
                out.push_str(&escape_cell(cell));
                out.push('\n');
            }
        }
        out
    }
}

impl Backend for FlatFileBackend {
    fn initialize(&mut self) -> Result<bool> {
        if self.initialized {
            return Ok(true);
        }
        if !self.config.data_dir.as_os_str().is_empty() {
            std::fs::create_dir_all(&self.config.data_dir)?;
        }
        self.reload_from_disk()?;
        let writer = OpenOptions::new()
            .create(true)
            .write(true)
            .open(&self.path)?;
        self.writer = Some(writer);
        self.initialized = true;
        debug!(
            path = %self.path.display(),
            namespace = %self.namespace,
            "flat-file backend initialized"
        );
        Ok(true)
    }

    fn has_key(&mut self, key: &str) -> Result<bool> {
        self.ensure_initialized()?;
        if key.is_empty() {
            return Ok(false);
        }
        Ok(self
            .data
            .get(&self.namespace)
            .is_some_and(|entries| entries.contains_key(key)))
    }

    fn load(&mut self) -> Result<()> {
        self.ensure_initialized()?;
        self.reload_from_disk()
    }

    fn save(&mut self) -> Result<()> {
        self.ensure_initialized()?;
        let content = self.render();
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::Other, "write handle released")
            })?;
        writer.seek(SeekFrom::Start(0))?;
        writer.set_len(0)?;
        writer.write_all(content.as_bytes())?;
        writer.flush()?;
        debug!(path = %self.path.display(), bytes = content.len(), "flat-file save");
        Ok(())
    }

    fn write_cell(&mut self, key: &str, cell: String) -> Result<()> {
        self.ensure_initialized()?;
        self.data
            .entry(self.namespace.clone())
            .or_default()
            .insert(key.to_string(), cell);
        Ok(())
    }

    fn read_cell(&mut self, key: &str) -> Result<Option<String>> {
        self.ensure_initialized()?;
        Ok(self
            .data
            .get(&self.namespace)
            .and_then(|entries| entries.get(key))
            .cloned())
    }

    fn delete_key(&mut self, key: &str) -> Result<()> {
        self.ensure_initialized()?;
        if let Some(entries) = self.data.get_mut(&self.namespace) {
            entries.remove(key);
        }
        // Deletion is write-through.
        self.save()
    }

    fn delete_all(&mut self) -> Result<()> {
        if let Some(entries) = self.data.get_mut(&self.namespace) {
            entries.clear();
        }
        if self.writer.is_none() && self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    fn dispose(&mut self) {
        self.writer = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendExt;
    use prefstore_core::Vec3;
    use tempfile::TempDir;

    fn setup() -> (TempDir, FlatFileBackend) {
        let temp = TempDir::new().unwrap();
        let config = StoreConfig::new(temp.path(), "AcmeCo", "Launcher");
        (temp, FlatFileBackend::new(config))
    }

    // ========== Initialize / lazy init ==========

    #[test]
    fn test_initialize_is_idempotent() {
        let (_temp, mut backend) = setup();
        assert!(backend.initialize().unwrap());
        assert!(backend.initialize().unwrap());
    }

    #[test]
    fn test_lazy_initialize_on_first_access() {
        let (_temp, mut backend) = setup();
        // No explicit initialize; has_key must self-initialize.
        assert!(!backend.has_key("anything").unwrap());
        assert!(backend.initialized);
    }

    #[test]
    fn test_empty_key_is_never_present() {
        let (_temp, mut backend) = setup();
        backend.write_cell("", "cell".to_string()).unwrap();
        assert!(!backend.has_key("").unwrap());
    }

    // ========== File layout ==========

    #[test]
    fn test_save_emits_header_then_pairs() {
        let (temp, mut backend) = setup();
        backend.write_value("a", &1i32).unwrap();
        backend.write_value("c", &String::from("3")).unwrap();
        backend.save().unwrap();

        let content = std::fs::read_to_string(temp.path().join("prefs.dat")).unwrap();
        let ns = backend.namespace().to_string();
        assert_eq!(content, format!("<{ns}>\na=1\nc=3\n"));
    }

    #[test]
    fn test_escape_cell_keeps_cells_on_one_line() {
        assert_eq!(escape_cell("line1\nline2"), "line1%0Aline2");
        assert_eq!(escape_cell("100%"), "100%25");
        assert_eq!(unescape_cell(&escape_cell("a\r\nb%")), "a\r\nb%");
        // Legacy cells without escapes pass through untouched.
        assert_eq!(unescape_cell("legacy 100%"), "legacy 100%");
    }

    #[test]
    fn test_multiline_string_survives_reload() {
        // A line break in a cell must not be mistaken for a new line of the
        // file, and following keys must stay readable.
        let (temp, mut backend) = setup();
        backend
            .write_value("note", &String::from("line1\nline2"))
            .unwrap();
        backend.write_value("kept", &2i32).unwrap();
        backend.save().unwrap();
        backend.dispose();

        let config = StoreConfig::new(temp.path(), "AcmeCo", "Launcher");
        let mut reopened = FlatFileBackend::new(config);
        reopened.initialize().unwrap();
        assert_eq!(
            reopened.read_value::<String>("note").unwrap(),
            "line1\nline2"
        );
        assert_eq!(reopened.read_value::<i32>("kept").unwrap(), 2);
    }

    #[test]
    fn test_value_may_contain_equals() {
        let (_temp, mut backend) = setup();
        backend
            .write_value("eq", &String::from("a=b=c"))
            .unwrap();
        backend.save().unwrap();

        backend.load().unwrap();
        assert_eq!(backend.read_value::<String>("eq").unwrap(), "a=b=c");
    }

    #[test]
    fn test_vector_cell_layout_on_disk() {
        let (temp, mut backend) = setup();
        backend.write_value("g", &Vec3::new(3.0, 4.0, 5.0)).unwrap();
        backend.save().unwrap();

        let content = std::fs::read_to_string(temp.path().join("prefs.dat")).unwrap();
        assert!(content.contains("g=3|4|5"));
    }

    // ========== Reload semantics ==========

    #[test]
    fn test_fresh_instance_reads_saved_state() {
        let (temp, mut backend) = setup();
        backend.write_value("a", &1i32).unwrap();
        backend.write_value("c", &String::from("3")).unwrap();
        backend.save().unwrap();
        backend.dispose();

        let config = StoreConfig::new(temp.path(), "AcmeCo", "Launcher");
        let mut reopened = FlatFileBackend::new(config);
        assert!(reopened.initialize().unwrap());
        assert_eq!(reopened.read_value::<i32>("a").unwrap(), 1);
        assert_eq!(reopened.read_value::<String>("c").unwrap(), "3");
    }

    #[test]
    fn test_adopts_namespace_found_in_file() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("prefs.dat"), "<legacy-ns>\nk=v\n").unwrap();

        let config = StoreConfig::new(temp.path(), "AcmeCo", "Launcher");
        let mut backend = FlatFileBackend::new(config);
        backend.initialize().unwrap();
        assert_eq!(backend.namespace(), "legacy-ns");
        assert!(backend.has_key("k").unwrap());
    }

    #[test]
    fn test_blank_header_falls_back_to_fresh_namespace() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("prefs.dat"), "<  >\nk=v\n").unwrap();

        let config = StoreConfig::new(temp.path(), "AcmeCo", "Launcher");
        let fresh = config.namespace_id();
        let mut backend = FlatFileBackend::new(config);
        backend.initialize().unwrap();
        assert_eq!(backend.namespace(), fresh);
        assert!(backend.has_key("k").unwrap());
    }

    #[test]
    fn test_empty_key_line_stops_namespace_parse() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("prefs.dat"),
            "<ns1>\na=1\n =halt\nb=2\n",
        )
        .unwrap();

        let config = StoreConfig::new(temp.path(), "AcmeCo", "Launcher");
        let mut backend = FlatFileBackend::new(config);
        backend.initialize().unwrap();
        assert!(backend.has_key("a").unwrap());
        // Everything after the empty-key line is dropped.
        assert!(!backend.has_key("b").unwrap());
    }

    #[test]
    fn test_load_replaces_in_memory_state() {
        let (temp, mut backend) = setup();
        backend.write_value("kept", &1i32).unwrap();
        backend.save().unwrap();
        backend.write_value("pending", &2i32).unwrap();

        // load() re-parses the file, discarding the unsaved write.
        backend.load().unwrap();
        assert!(backend.has_key("kept").unwrap());
        assert!(!backend.has_key("pending").unwrap());
        let _ = temp;
    }

    // ========== Delete semantics ==========

    #[test]
    fn test_delete_key_is_write_through() {
        let (temp, mut backend) = setup();
        backend.write_value("gone", &1i32).unwrap();
        backend.write_value("kept", &2i32).unwrap();
        backend.save().unwrap();

        backend.delete_key("gone").unwrap();
        assert!(!backend.has_key("gone").unwrap());

        // The file was rewritten without an explicit save().
        let content = std::fs::read_to_string(temp.path().join("prefs.dat")).unwrap();
        assert!(!content.contains("gone"));
        assert!(content.contains("kept=2"));
    }

    #[test]
    fn test_delete_all_clears_active_namespace() {
        let (_temp, mut backend) = setup();
        backend.write_value("a", &1i32).unwrap();
        backend.delete_all().unwrap();
        assert!(!backend.has_key("a").unwrap());
    }

    #[test]
    fn test_delete_all_without_handle_removes_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("prefs.dat");
        std::fs::write(&file, "<ns>\na=1\n").unwrap();

        let config = StoreConfig::new(temp.path(), "AcmeCo", "Launcher");
        let mut backend = FlatFileBackend::new(config);
        // Never initialized, so no write handle is held.
        backend.delete_all().unwrap();
        assert!(!file.exists());
    }

    // ========== Save semantics ==========

    #[test]
    fn test_save_truncates_prior_content() {
        let (temp, mut backend) = setup();
        backend
            .write_value("long", &String::from("aaaaaaaaaaaaaaaaaaaaaaaa"))
            .unwrap();
        backend.save().unwrap();

        backend.delete_key("long").unwrap();
        backend.write_value("s", &String::from("x")).unwrap();
        backend.save().unwrap();

        let content = std::fs::read_to_string(temp.path().join("prefs.dat")).unwrap();
        assert!(!content.contains("aaaa"));
        assert!(content.contains("s=x"));
    }

    #[test]
    fn test_save_is_idempotent() {
        let (temp, mut backend) = setup();
        backend.write_value("a", &1i32).unwrap();
        backend.save().unwrap();
        let first = std::fs::read_to_string(temp.path().join("prefs.dat")).unwrap();
        backend.save().unwrap();
        let second = std::fs::read_to_string(temp.path().join("prefs.dat")).unwrap();
        assert_eq!(first, second);
    }
}
