// Client side of ranking synchronization: `RankingSync` prefers the ranking
// service when it answers and falls back to a per-device mirror when it does not.

pub mod client;
pub mod local;
pub mod remote;

pub use client::RankingSync;
pub use local::{FileStore, LocalStore, LocalStoreError, MemoryStore};
pub use remote::{RemoteOutcome, RemoteRankings, ServerStatus};
