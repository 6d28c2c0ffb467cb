//! HTTP client for the difficulty service

use std::time::Duration;

use reqwest::Client;
use tokio::runtime::Handle;
use tokio::sync::oneshot;

use super::{DifficultyRequest, DifficultyResponse, DifficultyService, FeedbackError, PendingFeedback};

/// Path of the player update endpoint
pub const UPDATE_PATH: &str = "/api/player/update";

/// Talks to `POST /api/player/update` on a tokio runtime
#[derive(Clone)]
pub struct HttpDifficultyClient {
    http: Client,
    endpoint: String,
    runtime: Handle,
}

impl HttpDifficultyClient {
    /// Create a client for the service at `base_url`; requests run on `runtime`
    pub fn new(base_url: &str, timeout: Duration, runtime: Handle) -> Result<Self, FeedbackError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: endpoint_url(base_url),
            runtime,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send one snapshot and wait for the answer
    pub async fn update(&self, request: &DifficultyRequest) -> Result<DifficultyResponse, FeedbackError> {
        post_update(&self.http, &self.endpoint, request).await
    }
}

impl DifficultyService for HttpDifficultyClient {
    fn submit(&self, request: DifficultyRequest) -> PendingFeedback {
        let (tx, rx) = oneshot::channel();
        let http = self.http.clone();
        let endpoint = self.endpoint.clone();
        self.runtime.spawn(async move {
            let result = post_update(&http, &endpoint, &request).await;
            // Receiver gone means the run ended; nothing to do
            let _ = tx.send(result);
        });
        rx
    }
}

impl std::fmt::Debug for HttpDifficultyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpDifficultyClient")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

fn endpoint_url(base_url: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), UPDATE_PATH)
}

async fn post_update(
    http: &Client,
    endpoint: &str,
    request: &DifficultyRequest,
) -> Result<DifficultyResponse, FeedbackError> {
    let resp = http.post(endpoint).json(request).send().await?;
    let status = resp.status();
    let text = resp.text().await?;

    if !status.is_success() {
        // Try to parse error message from JSON
        let message = serde_json::from_str::<serde_json::Value>(&text)
            .ok()
            .and_then(|json| json.get("error").and_then(|e| e.as_str()).map(String::from))
            .unwrap_or(text);
        return Err(FeedbackError::Status {
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_str(&text).map_err(|e| FeedbackError::InvalidResponse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url_joins_path() {
        assert_eq!(
            endpoint_url("http://localhost:5000"),
            "http://localhost:5000/api/player/update"
        );
        assert_eq!(
            endpoint_url("http://localhost:5000/"),
            "http://localhost:5000/api/player/update"
        );
    }

    #[tokio::test]
    async fn test_unreachable_service_reports_transport_error() {
        let client = HttpDifficultyClient::new(
            "http://127.0.0.1:1",
            Duration::from_millis(500),
            Handle::current(),
        )
        .unwrap();

        let result = client.submit(DifficultyRequest::default()).await.unwrap();
        assert!(matches!(result, Err(FeedbackError::Http(_))));
    }
}
