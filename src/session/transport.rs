//! HTTP transport seam.
//!
//! The protocol does not define routing — only the payload encoding layered
//! on top of arbitrary GET/POST calls. The [`Transport`] trait is the seam:
//! production uses [`HttpTransport`] over reqwest, tests substitute a mock
//! enclave peer.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

/// Errors from the transport layer.
///
/// Non-success statuses surface any structured detail the server included
/// in the body — a failed encrypted call must fail loudly, not dissolve
/// into a generic status code.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request to {path} returned status {status}: {detail}")]
    Status {
        path: String,
        status: u16,
        detail: String,
    },

    #[error("connection failed: {reason}")]
    ConnectionFailed { reason: String },
}

/// A raw transport response, before any protocol interpretation.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Fail with a [`TransportError::Status`] carrying any structured error
    /// detail from the body, or pass through on success.
    pub fn require_success(self, path: &str) -> Result<Self, TransportError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(TransportError::Status {
                path: path.to_string(),
                status: self.status,
                detail: error_detail(&self.body),
            })
        }
    }

    pub fn json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// Pull a human-usable error message out of a failure body: structured
/// `error`/`detail`/`message` fields when the body is JSON, a truncated
/// text rendering otherwise.
fn error_detail(body: &[u8]) -> String {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
        for key in ["error", "detail", "message"] {
            if let Some(text) = value.get(key).and_then(|v| v.as_str()) {
                return text.to_string();
            }
        }
        return value.to_string();
    }
    let text = String::from_utf8_lossy(body);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        "<empty body>".to_string()
    } else {
        trimmed.chars().take(200).collect()
    }
}

/// Request/response transport the session client drives.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, path: &str) -> Result<TransportResponse, TransportError>;

    async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<TransportResponse, TransportError>;
}

/// reqwest-backed transport against a single base endpoint.
pub struct HttpTransport {
    base_url: String,
    client: Client,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout_ms: u64) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    async fn into_response(
        response: reqwest::Response,
    ) -> Result<TransportResponse, TransportError> {
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
        let body = response.bytes().await?.to_vec();
        Ok(TransportResponse {
            status,
            content_type,
            body,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, path: &str) -> Result<TransportResponse, TransportError> {
        let response = self.client.get(self.url(path)).send().await?;
        Self::into_response(response).await
    }

    async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<TransportResponse, TransportError> {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        Self::into_response(response).await
    }
}
