// Ranking sync client: remote-first reads and writes with a local fallback.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::config::SyncConfig;
use crate::ranking::{RankingEntry, RankingKind};
use crate::sync::local::LocalStore;
use crate::sync::remote::{RemoteOutcome, RemoteRankings};

/// Shortest accepted auto-sync probe interval.
pub const MIN_AUTO_SYNC_INTERVAL: Duration = Duration::from_millis(50);

struct AutoSyncTask {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

struct Inner {
    remote: RemoteRankings,
    local: Arc<dyn LocalStore>,
    config: SyncConfig,
    server_available: AtomicBool,
    last_sync: Mutex<Option<DateTime<Utc>>>,
    auto_sync: Mutex<Option<AutoSyncTask>>,
}

/// Cloneable handle to one sync client.
///
/// No method returns an error: every remote failure degrades to the local
/// mirror, which is written on every save regardless of the remote outcome.
#[derive(Clone)]
pub struct RankingSync {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for RankingSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RankingSync")
            .field("base_url", &self.inner.remote.base_url())
            .field("local", &self.inner.local.backend_name())
            .field("server_available", &self.is_server_available())
            .finish()
    }
}

impl RankingSync {
    pub fn new(config: SyncConfig, local: Arc<dyn LocalStore>) -> Self {
        let remote = RemoteRankings::new(config.base_url.clone());
        Self::with_remote(config, remote, local)
    }

    pub fn with_remote(
        config: SyncConfig,
        remote: RemoteRankings,
        local: Arc<dyn LocalStore>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                remote,
                local,
                config,
                server_available: AtomicBool::new(false),
                last_sync: Mutex::new(None),
                auto_sync: Mutex::new(None),
            }),
        }
    }

    pub fn is_server_available(&self) -> bool {
        self.inner.server_available.load(Ordering::Relaxed)
    }

    pub fn last_sync_time(&self) -> Option<DateTime<Utc>> {
        *lock(&self.inner.last_sync)
    }

    fn set_available(&self, available: bool) {
        let was = self.inner.server_available.swap(available, Ordering::Relaxed);
        if was != available {
            tracing::info!(
                "Ranking service at {} is now {}",
                self.inner.remote.base_url(),
                if available { "reachable" } else { "unreachable" }
            );
        }
    }

    /// Probe the service and record whether it answered.
    pub async fn check_server(&self) -> bool {
        let outcome = self
            .inner
            .remote
            .status(self.inner.config.status_timeout)
            .await;
        let available = outcome.is_ok();
        if let Some(reason) = outcome.failure_reason() {
            tracing::debug!("Status probe failed: {reason}");
        }
        self.set_available(available);
        available
    }

    /// Canonical list when the service answers, local mirror otherwise.
    pub async fn get_ranking(&self, kind: RankingKind) -> Vec<RankingEntry> {
        if self.is_server_available() {
            let outcome = self
                .inner
                .remote
                .fetch_list(kind, self.inner.config.request_timeout)
                .await;
            match outcome {
                RemoteOutcome::Ok(list) => {
                    self.mirror(kind, &list);
                    return list;
                }
                failed => self.note_failure("get", kind, &failed),
            }
        }
        self.inner.local.load(kind)
    }

    /// Rank and save a list locally, then push it to the service.
    /// Returns the service's canonical list, or the local one if the push failed.
    pub async fn save_ranking(
        &self,
        kind: RankingKind,
        entries: Vec<RankingEntry>,
    ) -> Vec<RankingEntry> {
        let ranked = kind.rank(entries);
        self.mirror(kind, &ranked);

        if self.is_server_available() {
            let outcome = self
                .inner
                .remote
                .replace(kind, &ranked, self.inner.config.request_timeout)
                .await;
            match outcome {
                RemoteOutcome::Ok(canonical) => {
                    self.mirror(kind, &canonical);
                    return canonical;
                }
                failed => self.note_failure("save", kind, &failed),
            }
        }
        ranked
    }

    /// Merge one entry into the local mirror and save the result.
    pub async fn add_entry(&self, kind: RankingKind, entry: RankingEntry) -> Vec<RankingEntry> {
        let merged = kind.insert(self.inner.local.load(kind), entry);
        self.save_ranking(kind, merged).await
    }

    /// Empty a list locally; the remote delete is best effort.
    pub async fn clear_ranking(&self, kind: RankingKind) {
        self.mirror(kind, &[]);

        if self.is_server_available() {
            let outcome = self
                .inner
                .remote
                .clear(kind, self.inner.config.request_timeout)
                .await;
            if !outcome.is_ok() {
                self.note_failure("clear", kind, &outcome);
            }
        }
    }

    /// Empty every local mirror without touching the service.
    pub fn clear_local_cache(&self) {
        if let Err(e) = self.inner.local.clear_all() {
            tracing::warn!("Failed to clear local ranking cache: {e}");
        }
    }

    /// Pull the whole document and overwrite all four local mirrors.
    /// Probes first when the service is marked unavailable.
    pub async fn sync_all(&self) -> bool {
        if !self.is_server_available() && !self.check_server().await {
            return false;
        }

        let outcome = self
            .inner
            .remote
            .fetch_all(self.inner.config.sync_timeout)
            .await;
        match outcome {
            RemoteOutcome::Ok(doc) => {
                for kind in RankingKind::ALL {
                    self.mirror(kind, doc.list(kind));
                }
                *lock(&self.inner.last_sync) = Some(Utc::now());
                tracing::debug!("Synced all rankings from {}", self.inner.remote.base_url());
                true
            }
            failed => {
                if let Some(reason) = failed.failure_reason() {
                    tracing::debug!("Full sync failed: {reason}");
                }
                if failed.is_unreachable() {
                    self.set_available(false);
                }
                false
            }
        }
    }

    /// Start the background task: probe every `interval`, pull everything
    /// every `2 × interval` while the service is reachable. Replaces any
    /// running task. The first probe happens immediately.
    pub fn start_auto_sync(&self, interval: Duration) {
        let interval = interval.max(MIN_AUTO_SYNC_INTERVAL);
        let (shutdown, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run_auto_sync(
            Arc::downgrade(&self.inner),
            interval,
            shutdown_rx,
        ));

        let previous = lock(&self.inner.auto_sync).replace(AutoSyncTask { shutdown, handle });
        if let Some(previous) = previous {
            let _ = previous.shutdown.send(true);
        }
    }

    /// Stop the background task and wait for it to exit.
    pub async fn stop_auto_sync(&self) {
        let task = lock(&self.inner.auto_sync).take();
        if let Some(task) = task {
            let _ = task.shutdown.send(true);
            if let Err(e) = task.handle.await {
                tracing::warn!("Auto-sync task ended abnormally: {e}");
            }
        }
    }

    pub fn is_auto_syncing(&self) -> bool {
        lock(&self.inner.auto_sync)
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }

    fn mirror(&self, kind: RankingKind, entries: &[RankingEntry]) {
        if let Err(e) = self.inner.local.store(kind, entries) {
            tracing::warn!("Failed to write local {kind} ranking: {e}");
        }
    }

    fn note_failure<T>(&self, operation: &str, kind: RankingKind, outcome: &RemoteOutcome<T>) {
        match outcome {
            RemoteOutcome::Ok(_) => {}
            RemoteOutcome::Unreachable(reason) => {
                tracing::debug!(
                    "Remote {operation} of {kind} failed, using local ranking: {reason}"
                );
                self.set_available(false);
            }
            RemoteOutcome::Rejected { status, reason } => {
                tracing::warn!("Service rejected {operation} of {kind} ({status}): {reason}");
            }
        }
    }
}

async fn run_auto_sync(
    inner: Weak<Inner>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut probe = tokio::time::interval(interval);
    probe.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let pull_every = interval * 2;
    let mut pull = tokio::time::interval_at(Instant::now() + pull_every, pull_every);
    pull.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = probe.tick() => {
                let Some(inner) = inner.upgrade() else { break };
                RankingSync { inner }.check_server().await;
            }
            _ = pull.tick() => {
                let Some(inner) = inner.upgrade() else { break };
                let sync = RankingSync { inner };
                if sync.is_server_available() {
                    sync.sync_all().await;
                }
            }
        }
    }
    tracing::debug!("Auto-sync stopped");
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
