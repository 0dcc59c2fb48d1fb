// Timeout-bounded calls to the ranking service.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::ranking::{RankingDocument, RankingEntry, RankingKind};

/// Result of one remote call.
///
/// `Unreachable` covers transport errors, timeouts, 5xx answers and
/// undecodable bodies. `Rejected` is a 4xx: the service is up but refused the
/// request, which the caller should treat as a bug rather than retry.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteOutcome<T> {
    Ok(T),
    Unreachable(String),
    Rejected { status: u16, reason: String },
}

impl<T> RemoteOutcome<T> {
    pub fn ok(self) -> Option<T> {
        match self {
            RemoteOutcome::Ok(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, RemoteOutcome::Ok(_))
    }

    pub fn is_unreachable(&self) -> bool {
        matches!(self, RemoteOutcome::Unreachable(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> RemoteOutcome<U> {
        match self {
            RemoteOutcome::Ok(v) => RemoteOutcome::Ok(f(v)),
            RemoteOutcome::Unreachable(reason) => RemoteOutcome::Unreachable(reason),
            RemoteOutcome::Rejected { status, reason } => {
                RemoteOutcome::Rejected { status, reason }
            }
        }
    }

    /// Why the call failed, or `None` on success.
    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            RemoteOutcome::Ok(_) => None,
            RemoteOutcome::Unreachable(reason) | RemoteOutcome::Rejected { reason, .. } => {
                Some(reason)
            }
        }
    }
}

/// Body of `GET /status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerStatus {
    pub status: String,
    pub timestamp: String,
}

#[derive(Deserialize)]
struct RankingResponse {
    ranking: Vec<RankingEntry>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// HTTP client for the ranking service API.
#[derive(Debug, Clone)]
pub struct RemoteRankings {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteRankings {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn status(&self, timeout: Duration) -> RemoteOutcome<ServerStatus> {
        self.execute(self.client.get(self.url("/status")), timeout)
            .await
    }

    pub async fn fetch_list(
        &self,
        kind: RankingKind,
        timeout: Duration,
    ) -> RemoteOutcome<Vec<RankingEntry>> {
        let url = self.url(&format!("/rankings/{}", kind.slug()));
        self.execute(self.client.get(url), timeout).await
    }

    pub async fn fetch_all(&self, timeout: Duration) -> RemoteOutcome<RankingDocument> {
        self.execute(self.client.get(self.url("/rankings")), timeout)
            .await
    }

    /// Replace a list; returns the service's canonical copy.
    pub async fn replace(
        &self,
        kind: RankingKind,
        entries: &[RankingEntry],
        timeout: Duration,
    ) -> RemoteOutcome<Vec<RankingEntry>> {
        let url = self.url(&format!("/rankings/{}/replace", kind.slug()));
        let request = self.client.post(url).json(&json!({ "ranking": entries }));
        self.execute::<RankingResponse>(request, timeout)
            .await
            .map(|r| r.ranking)
    }

    /// Append one entry; returns the service's canonical copy.
    pub async fn append(
        &self,
        kind: RankingKind,
        entry: &RankingEntry,
        timeout: Duration,
    ) -> RemoteOutcome<Vec<RankingEntry>> {
        let url = self.url(&format!("/rankings/{}", kind.slug()));
        let request = self.client.post(url).json(&json!({ "entry": entry }));
        self.execute::<RankingResponse>(request, timeout)
            .await
            .map(|r| r.ranking)
    }

    pub async fn clear(&self, kind: RankingKind, timeout: Duration) -> RemoteOutcome<()> {
        let url = self.url(&format!("/rankings/{}", kind.slug()));
        self.execute::<serde_json::Value>(self.client.delete(url), timeout)
            .await
            .map(|_| ())
    }

    /// Send a request and decode its JSON body. Elapsing `timeout` drops the
    /// in-flight request.
    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        timeout: Duration,
    ) -> RemoteOutcome<T> {
        let call = async move {
            let response = match request.send().await {
                Ok(r) => r,
                Err(e) => return RemoteOutcome::Unreachable(e.to_string()),
            };

            let status = response.status();
            if status.is_server_error() {
                return RemoteOutcome::Unreachable(format!("server answered {status}"));
            }
            if !status.is_success() {
                let reason = match response.json::<ErrorBody>().await {
                    Ok(body) => body.error,
                    Err(_) => status.to_string(),
                };
                return RemoteOutcome::Rejected {
                    status: status.as_u16(),
                    reason,
                };
            }

            match response.json::<T>().await {
                Ok(body) => RemoteOutcome::Ok(body),
                Err(e) => RemoteOutcome::Unreachable(format!("undecodable response: {e}")),
            }
        };

        match tokio::time::timeout(timeout, call).await {
            Ok(outcome) => outcome,
            Err(_) => RemoteOutcome::Unreachable(format!("timed out after {timeout:?}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let remote = RemoteRankings::new("http://localhost:3001/api/");
        assert_eq!(remote.base_url(), "http://localhost:3001/api");
        assert_eq!(remote.url("/status"), "http://localhost:3001/api/status");
    }

    #[test]
    fn test_outcome_helpers() {
        let ok: RemoteOutcome<u8> = RemoteOutcome::Ok(3);
        assert!(ok.is_ok());
        assert_eq!(ok.failure_reason(), None);
        assert_eq!(ok.map(|v| v * 2).ok(), Some(6));

        let down: RemoteOutcome<u8> = RemoteOutcome::Unreachable("refused".into());
        assert!(down.is_unreachable());
        assert_eq!(down.failure_reason(), Some("refused"));
        assert_eq!(down.ok(), None);

        let rejected: RemoteOutcome<u8> = RemoteOutcome::Rejected {
            status: 400,
            reason: "Invalid ranking type".into(),
        };
        assert!(!rejected.is_unreachable());
        assert_eq!(
            rejected.map(|v| v.to_string()),
            RemoteOutcome::Rejected {
                status: 400,
                reason: "Invalid ranking type".into()
            }
        );
    }

    #[tokio::test]
    async fn test_connection_refused_is_unreachable() {
        // Bind then drop to get a port with nothing listening.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let remote = RemoteRankings::new(format!("http://{addr}/api"));
        let outcome = remote.status(Duration::from_secs(2)).await;
        assert!(outcome.is_unreachable(), "got {outcome:?}");
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        // Accepts connections but never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _hold = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let remote = RemoteRankings::new(format!("http://{addr}/api"));
        let started = std::time::Instant::now();
        let outcome = remote
            .fetch_list(RankingKind::Quiz, Duration::from_millis(200))
            .await;
        assert!(matches!(outcome, RemoteOutcome::Unreachable(ref r) if r.contains("timed out")));
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
