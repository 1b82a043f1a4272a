use serde_json::json;

use super::client::BackendClient;
use super::error::BackendError;
use super::types::{SaveResponse, SavedConversation};

/// Server-side conversation archive. The backend owns naming and storage;
/// this client only moves snapshots across the wire.
#[derive(Debug, Clone)]
pub struct ConversationStore {
    client: BackendClient,
}

impl ConversationStore {
    #[must_use]
    pub const fn new(client: BackendClient) -> Self {
        Self { client }
    }

    /// Persists a snapshot and returns the filename the backend chose.
    pub async fn save(
        &self,
        conversation: &SavedConversation,
    ) -> Result<String, BackendError> {
        let response: SaveResponse = self
            .post_json(&self.client.endpoint("/save"), conversation)
            .await?;
        Ok(response.filename)
    }

    pub async fn load(&self, filename: &str) -> Result<SavedConversation, BackendError> {
        self.post_json(
            &self.client.endpoint("/load"),
            &json!({ "filename": filename }),
        )
        .await
    }

    /// Saved conversation filenames, newest first per the backend's ordering.
    pub async fn list(&self) -> Result<Vec<String>, BackendError> {
        let response = self
            .client
            .http()
            .get(&self.client.endpoint("/conversations"))
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

    pub async fn delete(&self, filename: &str) -> Result<(), BackendError> {
        self.post_ack(
            &self.client.endpoint("/delete"),
            &json!({ "filename": filename }),
        )
        .await
    }

    pub async fn delete_all(&self) -> Result<(), BackendError> {
        self.post_ack(&self.client.endpoint("/delete-all"), &json!({})).await
    }

    async fn post_json<B, T>(&self, url: &str, body: &B) -> Result<T, BackendError>
    where
        B: serde::Serialize + Sync,
        T: serde::de::DeserializeOwned,
    {
        let response = self
            .client
            .http()
            .post(url)
            .json(body)
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

    async fn post_ack<B>(&self, url: &str, body: &B) -> Result<(), BackendError>
    where
        B: serde::Serialize + Sync,
    {
        let response = self
            .client
            .http()
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| BackendError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::from_status(status.as_u16(), &body));
        }
        Ok(())
    }
}
