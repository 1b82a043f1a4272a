use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use futures::stream;
use parking_lot::Mutex;

use crate::core::error::{ChatError, Result};
use crate::core::{ByteStream, ChatTransport, GenerationParams, Message};

/// One scripted response for a [`MockTransport`] stream.
#[derive(Debug, Clone)]
pub enum MockScript {
    /// Yield these raw chunks, then end the stream.
    Chunks(Vec<Bytes>),
    /// Yield these chunks, then hang until the caller gives up.
    ChunksThenPending(Vec<Bytes>),
    /// Yield these chunks, then fail with a transport error.
    ChunksThenError(Vec<Bytes>, String),
    /// Never yield anything.
    Pending,
}

impl MockScript {
    #[must_use]
    pub fn chunks(chunks: Vec<&str>) -> Self {
        Self::Chunks(to_bytes(chunks))
    }

    #[must_use]
    pub fn chunks_then_pending(chunks: Vec<&str>) -> Self {
        Self::ChunksThenPending(to_bytes(chunks))
    }

    #[must_use]
    pub fn chunks_then_error(chunks: Vec<&str>, error: &str) -> Self {
        Self::ChunksThenError(to_bytes(chunks), error.to_string())
    }
}

fn to_bytes(chunks: Vec<&str>) -> Vec<Bytes> {
    chunks
        .into_iter()
        .map(|c| Bytes::copy_from_slice(c.as_bytes()))
        .collect()
}

/// What the transport saw on each `open_stream` call.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub params: GenerationParams,
    pub messages: Vec<Message>,
}

/// Scripted [`ChatTransport`] for exercising session logic without a server.
/// Scripts are consumed in order; an exhausted queue fails the open.
#[derive(Clone, Default)]
pub struct MockTransport {
    scripts: Arc<Mutex<VecDeque<MockScript>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    stop_calls: Arc<AtomicUsize>,
}

impl MockTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_script(self, script: MockScript) -> Self {
        self.scripts.lock().push_back(script);
        self
    }

    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    #[must_use]
    pub fn stop_calls(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn open_stream(
        &self,
        params: &GenerationParams,
        messages: &[Message],
    ) -> Result<ByteStream> {
        self.requests.lock().push(RecordedRequest {
            params: params.clone(),
            messages: messages.to_vec(),
        });

        let script = self
            .scripts
            .lock()
            .pop_front()
            .ok_or_else(|| ChatError::Transport("mock: no scripted response".to_string()))?;

        let stream: ByteStream = match script {
            MockScript::Chunks(chunks) => {
                Box::pin(stream::iter(chunks.into_iter().map(Ok)))
            }
            MockScript::ChunksThenPending(chunks) => Box::pin(
                stream::iter(chunks.into_iter().map(Ok)).chain(stream::pending()),
            ),
            MockScript::ChunksThenError(chunks, error) => Box::pin(
                stream::iter(chunks.into_iter().map(Ok))
                    .chain(stream::once(async move { Err(ChatError::Transport(error)) })),
            ),
            MockScript::Pending => Box::pin(stream::pending()),
        };

        Ok(stream)
    }

    async fn stop(&self) {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
    }
}
