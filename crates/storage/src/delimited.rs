//! Delimited-text backend: one JSON record per namespace
//!
//! ## File layout
//!
//! Each namespace is persisted as a record `{"name": <id>, "data":
//! "key@value|key@value|..."}`. A single namespace is written as one bare
//! record; multiple namespaces are concatenated with the `(&)` separator.
//! Parsing splits on `(&)` first, deserializes each record, then splits the
//! `data` field on `|` and each pair on the first `@`.
//!
//! ## Delimiter escaping
//!
//! `|` doubles as the value codec's composite-scalar separator, so raw
//! cells routinely contain it, and `&` would let a cell smuggle the `(&)`
//! record separator into the file. Keys and cells are therefore
//! percent-escaped (`%` -> `%25`, `&` -> `%26`, `@` -> `%40`, `|` -> `%7C`)
//! inside the `data` field and unescaped on parse, making the flattening
//! unambiguous. Legacy files whose cells never contained the delimiters
//! still parse unchanged.

use crate::backend::{Backend, NamespaceData};
use crate::config::StoreConfig;
use prefstore_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::PathBuf;
use tracing::{debug, warn};

const RECORD_SEPARATOR: &str = "(&)";
const PAIR_SEPARATOR: char = '|';
const KEY_VALUE_SEPARATOR: char = '@';

/// Serialized form of one namespace
#[derive(Debug, Default, Serialize, Deserialize)]
struct NamespaceRecord {
    /// Namespace identifier
    name: String,
    /// All key/value pairs flattened as `key@value|key@value|...`
    data: String,
}

/// Storage backend persisting namespaces as delimiter-escaped JSON records.
pub struct DelimitedTextBackend {
    config: StoreConfig,
    path: PathBuf,
    /// Identifier of the active namespace
    namespace: String,
    data: NamespaceData,
    /// Write handle held from initialize until dispose/drop
    writer: Option<File>,
    initialized: bool,
}

/// Escape `%`, `&`, `@` and `|` so a cell can be embedded in the `data`
/// field without ever reproducing a pair or record separator.
fn escape_cell(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '%' => out.push_str("%25"),
            '&' => out.push_str("%26"),
            '@' => out.push_str("%40"),
            '|' => out.push_str("%7C"),
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
                b"26" => Some('&'),
                b"40" => Some('@'),
                b"7C" => Some('|'),
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

impl DelimitedTextBackend {
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
            self.parse_content(&content)?;
        }
        self.data.entry(self.namespace.clone()).or_default();
        Ok(())
    }

    fn parse_content(&mut self, content: &str) -> Result<()> {
        for chunk in content.split(RECORD_SEPARATOR) {
            let chunk = chunk.trim();
            if chunk.is_empty() {
                continue;
            }
            let record: NamespaceRecord = serde_json::from_str(chunk)
                .map_err(|e| Error::MalformedRecord(e.to_string()))?;
            let mut name = record.name.trim().to_string();
            if name.is_empty() {
                warn!("record with blank namespace, adopting a fresh identifier");
                name = self.config.namespace_id();
            }
            let entries = self.data.entry(name.clone()).or_default();
            for pair in record.data.split(PAIR_SEPARATOR) {
                if pair.is_empty() {
                    continue;
                }
                let Some((key, cell)) = pair.split_once(KEY_VALUE_SEPARATOR) else {
                    warn!(pair, "skipping pair without separator");
                    continue;
                };
                entries.insert(unescape_cell(key), unescape_cell(cell));
            }
            self.namespace = name;
        }
        Ok(())
    }

    fn render(&self) -> Result<String> {
        let mut records = Vec::with_capacity(self.data.len());
        for (namespace, entries) in &self.data {
            let mut data = String::new();
            for (key, cell) in entries {
                if !data.is_empty() {
                    data.push(PAIR_SEPARATOR);
                }
                data.push_str(&escape_cell(key));
                data.push(KEY_VALUE_SEPARATOR);
                data.push_str(&escape_cell(cell));
            }
            let record = NamespaceRecord {
                name: namespace.clone(),
                data,
            };
            // A failure here is a write-side defect, not a malformed file.
            records.push(serde_json::to_string(&record).map_err(|e| Error::Io(e.into()))?);
        }
        Ok(records.join(RECORD_SEPARATOR))
    }
}

impl Backend for DelimitedTextBackend {
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
            "delimited-text backend initialized"
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
        let content = self.render()?;
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
        debug!(path = %self.path.display(), bytes = content.len(), "delimited-text save");
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
