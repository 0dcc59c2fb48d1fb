// Prometheus metrics definitions for the ranking relay.

use std::sync::Once;

use lazy_static::lazy_static;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder,
};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // ── Gauges ───────────────────────────────────────────────────────

    /// Entries currently stored per ranking list.
    pub static ref RANKING_ENTRIES: IntGaugeVec = IntGaugeVec::new(
        Opts::new("ranking_relay_entries", "Entries currently stored per ranking list"),
        &["list"],
    )
    .unwrap();

    /// Remote-control sockets holding a role slot (0 or 1 per role).
    pub static ref CONNECTED_CONTROLLERS: IntGaugeVec = IntGaugeVec::new(
        Opts::new("ranking_relay_connected_controllers", "Registered remote-control clients"),
        &["role"],
    )
    .unwrap();

    // ── Counters ─────────────────────────────────────────────────────

    /// Total API requests, by method/endpoint/status.
    pub static ref API_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("ranking_relay_api_requests_total", "Total API requests"),
        &["method", "endpoint", "status"],
    )
    .unwrap();

    /// Successful ranking mutations, by list and operation (append/replace/clear).
    pub static ref RANKING_WRITES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("ranking_relay_writes_total", "Ranking list mutations persisted"),
        &["list", "operation"],
    )
    .unwrap();

    /// Ranking document read/write failures.
    pub static ref STORE_FAILURES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("ranking_relay_store_failures_total", "Ranking document I/O failures"),
        &["operation"],
    )
    .unwrap();

    /// Remote-control messages forwarded, by event name.
    pub static ref RELAYED_MESSAGES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("ranking_relay_relayed_messages_total", "Remote-control messages forwarded"),
        &["event"],
    )
    .unwrap();

    // ── Histograms ───────────────────────────────────────────────────

    /// API request duration in seconds, by endpoint.
    pub static ref API_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "ranking_relay_api_request_duration_seconds",
            "API request duration in seconds",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0]),
        &["endpoint"],
    )
    .unwrap();
}

static REGISTER: Once = Once::new();

/// Register all metrics with the custom registry. Safe to call more than once.
pub fn register_metrics() {
    REGISTER.call_once(|| {
        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(RANKING_ENTRIES.clone()),
            Box::new(CONNECTED_CONTROLLERS.clone()),
            Box::new(API_REQUESTS_TOTAL.clone()),
            Box::new(RANKING_WRITES_TOTAL.clone()),
            Box::new(STORE_FAILURES_TOTAL.clone()),
            Box::new(RELAYED_MESSAGES_TOTAL.clone()),
            Box::new(API_REQUEST_DURATION_SECONDS.clone()),
        ];

        for c in collectors {
            if let Err(e) = REGISTRY.register(c) {
                tracing::error!("Failed to register metric: {e}");
            }
        }
    });
}

/// Serialize all registered metrics to the Prometheus text exposition format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {e}");
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Normalize a URL path for metric labels: the segment after `rankings` is
/// replaced with `:type` so unknown slugs cannot blow up label cardinality.
pub fn normalize_path(path: &str) -> String {
    let mut after_rankings = false;
    path.split('/')
        .map(|segment| {
            let label = if after_rankings && !segment.is_empty() {
                ":type"
            } else {
                segment
            };
            after_rankings = segment == "rankings";
            label
        })
        .collect::<Vec<_>>()
        .join("/")
}
