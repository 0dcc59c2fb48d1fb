// Configuration for the ranking service (env vars + CLI flags) and the sync client.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_API_URL: &str = "http://localhost:3001/api";

/// Ranking service configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind; all interfaces by default.
    pub bind_addr: String,
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// JSON document holding the four ranking lists.
    pub data_file: PathBuf,
    /// Directory containing a pre-built frontend to serve, if any.
    pub static_dir: Option<PathBuf>,
}

impl ServerConfig {
    /// Load configuration from environment variables and CLI arguments.
    ///
    /// Environment variables:
    /// - `BIND_ADDR` - interface to listen on (default: `0.0.0.0`)
    /// - `PORT` - HTTP server port (default: 3001)
    /// - `RANKINGS_FILE` - ranking document path (default: `rankings.json`)
    /// - `STATIC_DIR` - frontend build directory for static file serving
    ///
    /// CLI flags (take precedence over the environment):
    /// - `--port <PORT>`
    /// - `--data <PATH>`
    pub fn load() -> Self {
        let args: Vec<String> = std::env::args().collect();
        Self::from_args(&args)
    }

    pub fn from_args(args: &[String]) -> Self {
        let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = parse_cli_value(args, "--port")
            .and_then(|v| v.parse().ok())
            .or_else(|| std::env::var("PORT").ok().and_then(|v| v.parse().ok()))
            .unwrap_or(DEFAULT_PORT);

        let data_file = parse_cli_value(args, "--data")
            .or_else(|| std::env::var("RANKINGS_FILE").ok())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("rankings.json"));

        let static_dir = std::env::var("STATIC_DIR").ok().map(PathBuf::from);

        ServerConfig {
            bind_addr,
            port,
            data_file,
            static_dir,
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

/// Parse a CLI flag value like `--port 8080`.
fn parse_cli_value(args: &[String], flag: &str) -> Option<String> {
    args.windows(2).find_map(|pair| {
        if pair[0] == flag {
            Some(pair[1].clone())
        } else {
            None
        }
    })
}

/// Sync client configuration: where the service lives and how long to wait.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// API base URL, including the `/api` prefix.
    pub base_url: String,
    /// Liveness probe timeout.
    pub status_timeout: Duration,
    /// Single-list read/write timeout.
    pub request_timeout: Duration,
    /// Full-document pull timeout.
    pub sync_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            status_timeout: Duration::from_secs(2),
            request_timeout: Duration::from_secs(3),
            sync_timeout: Duration::from_secs(5),
        }
    }
}

impl SyncConfig {
    /// Defaults, with the base URL taken from `RANKING_API_URL` when set.
    pub fn from_env() -> Self {
        match std::env::var("RANKING_API_URL") {
            Ok(url) if !url.trim().is_empty() => Self::with_base_url(url),
            _ => Self::default(),
        }
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }
}
