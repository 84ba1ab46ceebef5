//! Rolling persona memory and its persistence port.

use std::collections::VecDeque;
use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

/// Most recent entries kept; older ones are evicted first.
pub const MEMORY_LIMIT: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub q: String,
    pub a: String,
}

impl MemoryEntry {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            q: question.into(),
            a: answer.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RollingMemory {
    entries: VecDeque<MemoryEntry>,
    limit: usize,
}

impl Default for RollingMemory {
    fn default() -> Self {
        Self::with_limit(MEMORY_LIMIT)
    }
}

impl RollingMemory {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            limit,
        }
    }

    /// Build from persisted entries, keeping only the newest `MEMORY_LIMIT`.
    pub fn from_entries(entries: Vec<MemoryEntry>) -> Self {
        let mut memory = Self::default();
        for entry in entries {
            memory.push(entry);
        }
        memory
    }

    pub fn push(&mut self, entry: MemoryEntry) {
        self.entries.push_back(entry);
        while self.entries.len() > self.limit {
            self.entries.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MemoryEntry> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<MemoryEntry> {
        self.entries.iter().cloned().collect()
    }

    /// Context block sent along with persona requests: each entry as
    /// `question\nanswer`, entries separated by a newline.
    pub fn context(&self) -> String {
        self.entries
            .iter()
            .map(|entry| format!("{}\n{}", entry.q, entry.a))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Errors raised by a [`MemoryStore`].
#[derive(Debug)]
pub enum MemoryStoreError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    Serialize(serde_json::Error),
}

impl fmt::Display for MemoryStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryStoreError::Read { path, source } => {
                write!(f, "Failed to read memory at {}: {}", path.display(), source)
            }
            MemoryStoreError::Parse { path, source } => {
                write!(f, "Failed to parse memory at {}: {}", path.display(), source)
            }
            MemoryStoreError::Write { path, source } => {
                write!(f, "Failed to write memory to {}: {}", path.display(), source)
            }
            MemoryStoreError::Serialize(source) => {
                write!(f, "Failed to serialize memory: {source}")
            }
        }
    }
}

impl StdError for MemoryStoreError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            MemoryStoreError::Read { source, .. } => Some(source),
            MemoryStoreError::Parse { source, .. } => Some(source),
            MemoryStoreError::Write { source, .. } => Some(source),
            MemoryStoreError::Serialize(source) => Some(source),
        }
    }
}

/// Persistence port for the rolling memory. `save` receives the full
/// sequence every time; implementations overwrite rather than append.
pub trait MemoryStore: Send {
    fn load(&self) -> Result<Vec<MemoryEntry>, MemoryStoreError>;
    fn save(&self, entries: &[MemoryEntry]) -> Result<(), MemoryStoreError>;
}

/// JSON array on disk, replaced atomically on every save.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_error(&self, source: std::io::Error) -> MemoryStoreError {
        MemoryStoreError::Write {
            path: self.path.clone(),
            source,
        }
    }
}

impl MemoryStore for JsonFileStore {
    fn load(&self) -> Result<Vec<MemoryEntry>, MemoryStoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&self.path).map_err(|source| MemoryStoreError::Read {
            path: self.path.clone(),
            source,
        })?;
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&contents).map_err(|source| MemoryStoreError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, entries: &[MemoryEntry]) -> Result<(), MemoryStoreError> {
        let contents = serde_json::to_string(entries).map_err(MemoryStoreError::Serialize)?;

        let parent = self
            .path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty());
        if let Some(dir) = parent {
            fs::create_dir_all(dir).map_err(|e| self.write_error(e))?;
        }

        let mut temp_file = match parent {
            Some(dir) => NamedTempFile::new_in(dir),
            None => NamedTempFile::new(),
        }
        .map_err(|e| self.write_error(e))?;

        temp_file
            .write_all(contents.as_bytes())
            .map_err(|e| self.write_error(e))?;
        temp_file
            .as_file_mut()
            .sync_all()
            .map_err(|e| self.write_error(e))?;
        temp_file
            .persist(&self.path)
            .map_err(|e| self.write_error(e.error))?;
        Ok(())
    }
}

/// Process-local store. Clones share the same backing sequence, which lets a
/// caller keep a handle and inspect what was saved.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<Mutex<InMemoryState>>,
}

#[derive(Debug, Default)]
struct InMemoryState {
    entries: Vec<MemoryEntry>,
    saves: usize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: Vec<MemoryEntry>) -> Self {
        let store = Self::default();
        store.lock().entries = entries;
        store
    }

    pub fn entries(&self) -> Vec<MemoryEntry> {
        self.lock().entries.clone()
    }

    /// Number of `save` calls seen so far.
    pub fn save_count(&self) -> usize {
        self.lock().saves
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, InMemoryState> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl MemoryStore for InMemoryStore {
    fn load(&self) -> Result<Vec<MemoryEntry>, MemoryStoreError> {
        Ok(self.entries())
    }

    fn save(&self, entries: &[MemoryEntry]) -> Result<(), MemoryStoreError> {
        let mut state = self.lock();
        state.entries = entries.to_vec();
        state.saves += 1;
        Ok(())
    }
}
