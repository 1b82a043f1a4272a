use async_trait::async_trait;
use futures::StreamExt;

use crate::core::error::{ChatError, Result};
use crate::core::{ByteStream, ChatTransport, GenerationParams, Message};

use super::error::BackendError;
use super::http::{HttpClient, HttpConfig};
use super::types::{BaseUrl, ChatRequest};

/// Client for the generation backend: the streaming chat endpoint plus the
/// small control surface around it.
#[derive(Clone)]
pub struct BackendClient {
    http: HttpClient,
    base_url: BaseUrl,
}

impl std::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl BackendClient {
    pub fn new(base_url: impl Into<BaseUrl>) -> std::result::Result<Self, BackendError> {
        Self::with_http_config(base_url, &HttpConfig::default())
    }

    pub fn with_http_config(
        base_url: impl Into<BaseUrl>,
        config: &HttpConfig,
    ) -> std::result::Result<Self, BackendError> {
        Ok(Self {
            http: HttpClient::with_config(config)?,
            base_url: base_url.into(),
        })
    }

    #[must_use]
    pub const fn base_url(&self) -> &BaseUrl {
        &self.base_url
    }

    pub(super) fn endpoint(&self, path: &str) -> String {
        self.base_url.join(path)
    }

    pub(super) const fn http(&self) -> &HttpClient {
        &self.http
    }

    /// Installed model names from `GET /models`.
    pub async fn models(&self) -> std::result::Result<Vec<String>, BackendError> {
        let response = self
            .http
            .get(&self.endpoint("/models"))
            .send()
            .await
            .map_err(|e| BackendError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::from_status(status.as_u16(), &body));
        }

        response
            .json()
            .await
            .map_err(|e| BackendError::ParseError(e.to_string()))
    }
}

#[async_trait]
impl ChatTransport for BackendClient {
    async fn open_stream(
        &self,
        params: &GenerationParams,
        messages: &[Message],
    ) -> Result<ByteStream> {
        let request = ChatRequest::new(params, messages);

        let response = self
            .http
            .post(&self.endpoint("/chat"))
            .json(&request)
            .send()
            .await
            .map_err(|e| ChatError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::from_status(status.as_u16(), &body).into());
        }

        let stream = response
            .bytes_stream()
            .map(|item| item.map_err(|e| ChatError::Transport(e.to_string())));

        Ok(Box::pin(stream))
    }

    async fn stop(&self) {
        // Best-effort courtesy signal; the abort already happened client-side.
        if let Err(e) = self.http.post(&self.endpoint("/stop")).send().await {
            tracing::debug!(error = %e, "Stop notification failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = BackendClient::new("http://localhost:5000").unwrap();
        assert_eq!(client.base_url().as_str(), "http://localhost:5000");
    }

    #[test]
    fn test_endpoint_generation() {
        let client = BackendClient::new("http://localhost:5000/").unwrap();
        assert_eq!(client.endpoint("/chat"), "http://localhost:5000/chat");
    }

    #[test]
    fn test_debug_output() {
        let client = BackendClient::new("http://localhost:5000").unwrap();
        let debug = format!("{client:?}");
        assert!(debug.contains("BackendClient"));
        assert!(debug.contains("localhost:5000"));
    }
}
