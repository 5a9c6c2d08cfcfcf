//! `reqwest`-backed transport.

use std::time::Duration;

use async_trait::async_trait;
use catalog_core::TransportError;
use serde_json::Value;

use crate::transport::Transport;

/// Connection settings for [`HttpTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    /// Base URL, e.g. `http://localhost:8080/api`. A trailing `/` is ignored.
    pub base_url: String,
    pub timeout: Duration,
    pub token: Option<String>,
}

impl HttpConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// Talks to the real API over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    config: HttpConfig,
}

impl HttpTransport {
    pub fn new(config: HttpConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TransportError::network(e.to_string()))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    async fn get(&self, path: &str) -> Result<Value, TransportError> {
        let url = self.config.url(path);
        let mut req = self.client.get(&url);

        if let Some(token) = &self.config.token {
            req = req.bearer_auth(token);
        }

        tracing::debug!(%url, "fetching");
        let resp = req
            .send()
            .await
            .map_err(|e| TransportError::network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::status(status.as_u16(), error_detail(&body)));
        }

        resp.json()
            .await
            .map_err(|e| TransportError::decode(format!("{path}: {e}")))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch_collection(&self, name: &str) -> Result<Value, TransportError> {
        self.get(name).await
    }

    async fn fetch_entity(&self, name: &str, id: u32) -> Result<Value, TransportError> {
        self.get(&format!("{name}/{id}")).await
    }
}

/// Pull the `error` field out of a JSON error body; fall back to the raw text.
fn error_detail(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_owned))
        .unwrap_or_else(|| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_without_double_slash() {
        let config = HttpConfig::new("http://localhost:8080/api/");
        assert_eq!(config.url("products"), "http://localhost:8080/api/products");
        assert_eq!(config.url("suppliers/3"), "http://localhost:8080/api/suppliers/3");
    }

    #[test]
    fn error_detail_prefers_json_error_field() {
        assert_eq!(error_detail(r#"{"error":"Collection `foo` not found"}"#), "Collection `foo` not found");
        assert_eq!(error_detail("  plain text \n"), "plain text");
        assert_eq!(error_detail(r#"{"message":"x"}"#), r#"{"message":"x"}"#);
    }

    #[tokio::test]
    async fn unreachable_host_is_a_network_error() {
        let transport = HttpTransport::new(
            HttpConfig::new("http://127.0.0.1:9").with_timeout(Duration::from_millis(500)),
        )
        .unwrap();

        let err = transport.fetch_collection("products").await.unwrap_err();
        assert!(matches!(err, TransportError::Network(_)));
        assert!(err.to_string().starts_with("An error occurred: "));
    }
}
