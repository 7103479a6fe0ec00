//! Synchronous key-value slots backing the flat document backend.
//!
//! A slot stores one string per key, the way browser local storage does.
//! [`FileSlot`] is the production implementation (one JSON file per key),
//! [`MemorySlot`] keeps everything in memory for tests.

use crate::error::{BoardzError, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

pub trait KeyValueSlot: Send + Sync {
    /// Returns Ok(None) when nothing was ever written under `key`.
    fn read(&self, key: &str) -> Result<Option<String>>;

    /// Replaces the value under `key`.
    /// MUST be atomic (e.g. write to tmp then rename) to avoid partial writes.
    fn write(&self, key: &str, value: &str) -> Result<()>;
}

pub struct FileSlot {
    root: PathBuf,
}

impl FileSlot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file holding `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", key))
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root).map_err(BoardzError::Io)?;
        }
        Ok(())
    }
}

impl KeyValueSlot for FileSlot {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path).map_err(BoardzError::Io)?;
        Ok(Some(content))
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        self.ensure_dir()?;

        let tmp_path = self.root.join(format!(".{}-{}.tmp", key, Uuid::new_v4()));
        fs::write(&tmp_path, value).map_err(BoardzError::Io)?;
        fs::rename(&tmp_path, self.path_for(key)).map_err(BoardzError::Io)?;

        Ok(())
    }
}

/// In-memory slot for testing.
///
/// Uses a `Mutex` because providers are shared across tasks (`Send + Sync`).
#[derive(Default)]
pub struct MemorySlot {
    entries: Mutex<HashMap<String, String>>,
    simulate_write_error: AtomicBool,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// A slot pre-filled with `value` under `key`.
    pub fn with_entry(key: &str, value: impl Into<String>) -> Self {
        let slot = Self::new();
        if let Ok(mut entries) = slot.entries.lock() {
            entries.insert(key.to_string(), value.into());
        }
        slot
    }

    /// Enable write error simulation for testing error handling.
    pub fn set_simulate_write_error(&self, simulate: bool) {
        self.simulate_write_error.store(simulate, Ordering::SeqCst);
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| BoardzError::Store("memory slot lock poisoned".to_string()))
    }
}

impl KeyValueSlot for MemorySlot {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        if self.simulate_write_error.load(Ordering::SeqCst) {
            return Err(BoardzError::Store("Simulated write error".to_string()));
        }
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_slot_missing_key_reads_none() {
        let dir = tempfile::tempdir().unwrap();
        let slot = FileSlot::new(dir.path());
        assert_eq!(slot.read("nothing").unwrap(), None);
    }

    #[test]
    fn test_file_slot_creates_root_and_leaves_no_tmp_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("nested").join("data");
        let slot = FileSlot::new(&root);

        slot.write("doc", "{\"boards\":[]}").unwrap();
        assert_eq!(slot.read("doc").unwrap().as_deref(), Some("{\"boards\":[]}"));

        for entry in fs::read_dir(&root).unwrap() {
            let path = entry.unwrap().path();
            let name = path.file_name().unwrap().to_str().unwrap();
            assert!(!name.ends_with(".tmp"), "Found leftover tmp file: {}", name);
        }
    }

    #[test]
    fn test_memory_slot_simulated_failure_keeps_old_value() {
        let slot = MemorySlot::with_entry("doc", "old");
        slot.set_simulate_write_error(true);
        assert!(slot.write("doc", "new").is_err());
        assert_eq!(slot.read("doc").unwrap().as_deref(), Some("old"));
    }
}
