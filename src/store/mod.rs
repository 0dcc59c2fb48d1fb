// Ranking document persistence (one JSON file on disk).
//
// Every mutation is a read-modify-write of the whole document, serialized
// behind an async mutex. Writes land in a sibling temp file and are renamed
// into place, so readers never observe a half-written document.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tokio::sync::Mutex;

use crate::metrics;
use crate::ranking::{RankingDocument, RankingEntry, RankingKind};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("ranking file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("ranking document could not be encoded: {0}")]
    Json(#[from] serde_json::Error),
}

pub struct RankingStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl RankingStore {
    /// Open the store, creating the file with four empty lists if absent.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let store = Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        };

        if !tokio::fs::try_exists(&store.path).await? {
            if let Some(parent) = store.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await?;
            }
            store.write_document(&RankingDocument::default()).await?;
            tracing::info!("Created empty ranking file at {}", store.path.display());
        }

        let doc = store.document().await;
        for kind in RankingKind::ALL {
            record_size(kind, doc.list(kind).len());
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the full document. An unreadable file or one that is not a JSON
    /// object yields an empty document (logged), never an error. Each list and
    /// each entry is decoded on its own: an entry that does not fit its list is
    /// skipped without disturbing the rest.
    pub async fn document(&self) -> RankingDocument {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!("Failed to read rankings from {}: {e}", self.path.display());
                metrics::STORE_FAILURES_TOTAL
                    .with_label_values(&["read"])
                    .inc();
                return RankingDocument::default();
            }
        };

        let root = match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(root)) => root,
            Ok(_) => {
                tracing::error!("Ranking file {} is not a JSON object", self.path.display());
                metrics::STORE_FAILURES_TOTAL
                    .with_label_values(&["parse"])
                    .inc();
                return RankingDocument::default();
            }
            Err(e) => {
                tracing::error!("Corrupt ranking file {}: {e}", self.path.display());
                metrics::STORE_FAILURES_TOTAL
                    .with_label_values(&["parse"])
                    .inc();
                return RankingDocument::default();
            }
        };

        let mut doc = RankingDocument::default();
        for kind in RankingKind::ALL {
            *doc.list_mut(kind) = self.decode_list(kind, root.get(kind.document_key()));
        }
        doc
    }

    fn decode_list(&self, kind: RankingKind, value: Option<&Value>) -> Vec<RankingEntry> {
        let items = match value {
            None | Some(Value::Null) => return Vec::new(),
            Some(Value::Array(items)) => items,
            Some(_) => {
                tracing::warn!(
                    "Ignoring {kind} ranking in {}: not a list",
                    self.path.display()
                );
                metrics::STORE_FAILURES_TOTAL
                    .with_label_values(&["parse"])
                    .inc();
                return Vec::new();
            }
        };

        items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| match kind.decode_entry(item.clone()) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!("Skipping {kind} entry {i} in {}: {e}", self.path.display());
                    metrics::STORE_FAILURES_TOTAL
                        .with_label_values(&["parse"])
                        .inc();
                    None
                }
            })
            .collect()
    }

    pub async fn list(&self, kind: RankingKind) -> Vec<RankingEntry> {
        let mut doc = self.document().await;
        std::mem::take(doc.list_mut(kind))
    }

    /// Add one entry, re-rank and persist. Returns the stored list.
    pub async fn append(
        &self,
        kind: RankingKind,
        entry: RankingEntry,
    ) -> Result<Vec<RankingEntry>, StoreError> {
        self.update(kind, "append", |list| kind.insert(list, entry))
            .await
    }

    /// Replace a list wholesale. The list is still ranked and capped.
    pub async fn replace(
        &self,
        kind: RankingKind,
        entries: Vec<RankingEntry>,
    ) -> Result<Vec<RankingEntry>, StoreError> {
        self.update(kind, "replace", |_| kind.rank(entries)).await
    }

    pub async fn clear(&self, kind: RankingKind) -> Result<(), StoreError> {
        self.update(kind, "clear", |_| Vec::new()).await?;
        Ok(())
    }

    async fn update<F>(
        &self,
        kind: RankingKind,
        operation: &str,
        f: F,
    ) -> Result<Vec<RankingEntry>, StoreError>
    where
        F: FnOnce(Vec<RankingEntry>) -> Vec<RankingEntry>,
    {
        let _guard = self.write_lock.lock().await;

        let mut doc = self.document().await;
        let current = std::mem::take(doc.list_mut(kind));
        let updated = f(current);
        *doc.list_mut(kind) = updated.clone();

        if let Err(e) = self.write_document(&doc).await {
            metrics::STORE_FAILURES_TOTAL
                .with_label_values(&["write"])
                .inc();
            return Err(e);
        }

        metrics::RANKING_WRITES_TOTAL
            .with_label_values(&[kind.slug(), operation])
            .inc();
        record_size(kind, updated.len());
        Ok(updated)
    }

    async fn write_document(&self, doc: &RankingDocument) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(doc)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

fn record_size(kind: RankingKind, len: usize) {
    metrics::RANKING_ENTRIES
        .with_label_values(&[kind.slug()])
        .set(len as i64);
}
