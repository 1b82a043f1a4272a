//! HTTP client for the local generation backend: the streaming chat
//! endpoint, model discovery, and the server-side conversation archive.

pub mod client;
pub mod error;
pub mod http;
pub mod mock;
pub mod store;
pub mod types;

pub use client::BackendClient;
pub use error::BackendError;
pub use http::{HttpClient, HttpConfig};
pub use store::ConversationStore;
pub use types::{BaseUrl, ChatRequest, SaveResponse, SavedConversation, WireMessage};
