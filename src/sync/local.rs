// Local mirror backends.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::ranking::{RankingEntry, RankingKind};

#[derive(Debug, thiserror::Error)]
pub enum LocalStoreError {
    #[error("local store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("local store encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Key → list persistence on the client device.
///
/// Reads never fail: a missing or unreadable key is an empty list.
pub trait LocalStore: Send + Sync {
    fn load(&self, kind: RankingKind) -> Vec<RankingEntry>;

    fn store(&self, kind: RankingKind, entries: &[RankingEntry]) -> Result<(), LocalStoreError>;

    /// Empty every list.
    fn clear_all(&self) -> Result<(), LocalStoreError> {
        for kind in RankingKind::ALL {
            self.store(kind, &[])?;
        }
        Ok(())
    }

    /// Backend name for display.
    fn backend_name(&self) -> &'static str;
}

// ==================== In-memory ====================

/// Process-lifetime mirror, used in tests and by frontends with no disk.
#[derive(Default)]
pub struct MemoryStore {
    lists: Mutex<HashMap<RankingKind, Vec<RankingEntry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStore for MemoryStore {
    fn load(&self, kind: RankingKind) -> Vec<RankingEntry> {
        let lists = self.lists.lock().unwrap_or_else(|e| e.into_inner());
        lists.get(&kind).cloned().unwrap_or_default()
    }

    fn store(&self, kind: RankingKind, entries: &[RankingEntry]) -> Result<(), LocalStoreError> {
        let mut lists = self.lists.lock().unwrap_or_else(|e| e.into_inner());
        lists.insert(kind, entries.to_vec());
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "Memory"
    }
}

// ==================== File ====================

/// One JSON file per list, named after the list's local key
/// (e.g. `mazeRanking-easy.json`).
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, kind: RankingKind) -> PathBuf {
        self.dir.join(format!("{}.json", kind.local_key()))
    }
}

impl LocalStore for FileStore {
    fn load(&self, kind: RankingKind) -> Vec<RankingEntry> {
        let path = self.path_for(kind);
        let json = match std::fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                tracing::warn!("Failed to read local ranking {}: {e}", path.display());
                return Vec::new();
            }
        };
        serde_json::from_str(&json).unwrap_or_else(|e| {
            tracing::warn!("Discarding corrupt local ranking {}: {e}", path.display());
            Vec::new()
        })
    }

    fn store(&self, kind: RankingKind, entries: &[RankingEntry]) -> Result<(), LocalStoreError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(kind);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string(entries)?)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "File"
    }
}
