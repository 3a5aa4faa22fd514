use std::time::Duration;

use bulkops_config::DEFAULT_REQUEST_TIMEOUT_SECS;
use bulkops_core::{ActionError, ErrorDetail};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub mod path;

pub use reqwest::Method;

// Non-JSON error bodies longer than this (HTML error pages) are not shown to users.
const MAX_TEXT_ERROR_LEN: usize = 200;

#[derive(Debug, thiserror::Error)]
pub enum RestError {
    #[error("{detail}")]
    Status {
        status: u16,
        body: Option<Value>,
        detail: ErrorDetail,
    },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("request aborted")]
    Aborted,
    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

impl From<RestError> for ActionError {
    fn from(value: RestError) -> Self {
        match value {
            RestError::Status { status, body, .. } => ActionError::Http { status, body },
            RestError::Transport(e) => ActionError::Transport(e.to_string()),
            RestError::Aborted => ActionError::Aborted,
            RestError::InvalidUrl(msg) => ActionError::Message(format!("invalid url: {msg}")),
        }
    }
}

/// Minimal REST collaborator. Resolves with the decoded body (`Null` when the
/// response has none) and rejects with the server's error detail on non-2xx.
/// Implementations must not cache.
#[async_trait::async_trait]
pub trait RestClient: Send + Sync {
    async fn request(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        signal: Option<&CancellationToken>,
    ) -> Result<Value, RestError>;
}

pub fn default_http_client() -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(concat!("bulkops/", env!("CARGO_PKG_VERSION")))
        .build()
}

pub struct HttpRestClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    timeout: Duration,
}

impl HttpRestClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, RestError> {
        Ok(Self::with_client(default_http_client()?, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn resolve(&self, url: &str) -> Result<String, RestError> {
        if url.starts_with("http://") || url.starts_with("https://") {
            return Ok(url.to_string());
        }
        if !url.starts_with('/') {
            return Err(RestError::InvalidUrl(format!(
                "expected an absolute path or url, got '{url}'"
            )));
        }
        if self.base_url.is_empty() {
            return Err(RestError::InvalidUrl(format!("no base url to resolve '{url}'")));
        }
        Ok(format!("{}{}", self.base_url, url))
    }

    async fn send(
        &self,
        method: Method,
        url: String,
        body: Option<&Value>,
    ) -> Result<Value, RestError> {
        let mut req = self.client.request(method, &url).timeout(self.timeout);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;
        let parsed = if bytes.is_empty() || status == StatusCode::NO_CONTENT {
            None
        } else {
            match serde_json::from_slice::<Value>(&bytes) {
                Ok(v) => Some(v),
                Err(_) => {
                    let text = String::from_utf8_lossy(&bytes).trim().to_string();
                    (!text.is_empty() && text.len() <= MAX_TEXT_ERROR_LEN)
                        .then_some(Value::String(text))
                }
            }
        };

        if status.is_success() {
            debug!(%url, status = status.as_u16(), "Request succeeded");
            return Ok(parsed.unwrap_or(Value::Null));
        }

        let detail = ErrorDetail::from_body(Some(status.as_u16()), parsed.as_ref());
        debug!(%url, status = status.as_u16(), error = %detail, "Request rejected");
        Err(RestError::Status {
            status: status.as_u16(),
            body: parsed,
            detail,
        })
    }
}

#[async_trait::async_trait]
impl RestClient for HttpRestClient {
    async fn request(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        signal: Option<&CancellationToken>,
    ) -> Result<Value, RestError> {
        let url = self.resolve(url)?;
        debug!(%method, %url, "Sending request");
        match signal {
            Some(signal) => {
                tokio::select! {
                    res = self.send(method, url, body) => res,
                    _ = signal.cancelled() => Err(RestError::Aborted),
                }
            }
            None => self.send(method, url, body).await,
        }
    }
}
