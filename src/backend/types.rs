use std::borrow::Cow;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{GenerationParams, Message, Role};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseUrl(Cow<'static, str>);

impl BaseUrl {
    #[must_use]
    pub fn new(url: impl Into<Cow<'static, str>>) -> Self {
        let url = url.into();
        let url = if url.ends_with('/') {
            Cow::Owned(url.trim_end_matches('/').to_string())
        } else {
            url
        };
        Self(url)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn join(&self, path: &str) -> String {
        format!("{}{}", self.0, path)
    }
}

impl fmt::Display for BaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for BaseUrl {
    fn default() -> Self {
        Self(Cow::Borrowed("http://localhost:5000"))
    }
}

impl From<String> for BaseUrl {
    fn from(url: String) -> Self {
        Self::new(url)
    }
}

impl From<&str> for BaseUrl {
    fn from(url: &str) -> Self {
        Self::new(url.to_string())
    }
}

/// `{role, content}` pair as the chat endpoint expects it; thinking text is
/// client-side only and never sent back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: Role,
    pub content: String,
}

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

/// Body of `POST /chat`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    pub system: String,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
}

impl ChatRequest {
    #[must_use]
    pub fn new(params: &GenerationParams, messages: &[Message]) -> Self {
        Self {
            model: params.model.clone(),
            messages: messages.iter().map(WireMessage::from).collect(),
            system: params.system.clone().unwrap_or_default(),
            temperature: params.temperature,
            top_p: params.top_p,
            max_tokens: params.max_tokens,
        }
    }
}

/// Full conversation snapshot exchanged with the save/load endpoints. Field
/// names follow the backend's camelCase payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedConversation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub messages: Vec<Message>,
    #[serde(default)]
    pub system: String,
    #[serde(default)]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

const fn default_temperature() -> f32 {
    0.7
}

const fn default_top_p() -> f32 {
    0.9
}

const fn default_max_tokens() -> u32 {
    2048
}

impl SavedConversation {
    #[must_use]
    pub fn snapshot(params: &GenerationParams, messages: &[Message]) -> Self {
        Self {
            name: None,
            messages: messages.to_vec(),
            system: params.system.clone().unwrap_or_default(),
            model: params.model.clone(),
            temperature: params.temperature,
            top_p: params.top_p,
            max_tokens: params.max_tokens,
            saved_at: Some(Utc::now()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SaveResponse {
    pub filename: String,
}
