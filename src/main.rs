use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};

use ranking_relay::api;
use ranking_relay::config::ServerConfig;
use ranking_relay::control::ControlHub;
use ranking_relay::metrics;
use ranking_relay::store::RankingStore;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = ServerConfig::load();
    metrics::register_metrics();

    let store = RankingStore::open(config.data_file.clone())
        .await
        .expect("Failed to open ranking document");
    tracing::info!("Rankings stored in {}", store.path().display());

    let mut app = api::router(Arc::new(store), ControlHub::new());

    // Serve the frontend build (and the mobile controller page) if configured
    if let Some(dir) = &config.static_dir {
        tracing::info!("Serving static files from {}", dir.display());
        app = app
            .route_service("/mobile", ServeFile::new(dir.join("mobile-control.html")))
            .fallback_service(ServeDir::new(dir));
    }

    let app = app.layer(CorsLayer::permissive());

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind to {addr}: {e}"));

    tracing::info!("Ranking service listening on {addr}");
    axum::serve(listener, app).await.expect("Server error");
}
