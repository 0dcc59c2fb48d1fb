// Ranking service, remote-control relay and sync client.

pub mod api;
pub mod config;
pub mod control;
pub mod metrics;
pub mod ranking;
pub mod report;
pub mod store;
pub mod sync;
