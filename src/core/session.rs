use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::sync::watch;

use super::decoder::{FrameDecoder, StreamEvent};
use super::error::{ChatError, Result};
use super::transcript::{Message, Transcript};

/// Sampling and routing parameters for one generation request.
#[derive(Debug, Clone)]
pub struct GenerationParams {
    pub model: String,
    pub system: Option<String>,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            model: String::new(),
            system: None,
            temperature: 0.7,
            top_p: 0.9,
            max_tokens: 2048,
        }
    }
}

pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// Seam to the generation endpoint. The real implementation lives in the
/// backend module; tests script it.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Opens the token stream for the given context.
    async fn open_stream(
        &self,
        params: &GenerationParams,
        messages: &[Message],
    ) -> Result<ByteStream>;

    /// Best-effort notification that the client stopped reading; failures
    /// are swallowed by the implementation.
    async fn stop(&self);
}

/// How a session ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Completed,
    Cancelled,
}

/// Clonable cancellation handle. Safe to call repeatedly and after the
/// session has already finished.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// One request/response cycle: appends the user turn and an assistant
/// placeholder, drives the frame decoder over the transport stream, and
/// applies every event to the transcript in arrival order.
pub struct GenerationSession {
    params: GenerationParams,
    cancel: CancelHandle,
    cancel_rx: watch::Receiver<bool>,
}

impl GenerationSession {
    /// Validates the request before any I/O or transcript mutation.
    pub fn new(params: GenerationParams) -> Result<Self> {
        if params.model.trim().is_empty() {
            return Err(ChatError::InvalidRequest("no model selected".to_string()));
        }
        let (tx, cancel_rx) = watch::channel(false);
        Ok(Self {
            params,
            cancel: CancelHandle { tx: Arc::new(tx) },
            cancel_rx,
        })
    }

    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Runs the session to completion, cancellation, or error. The transcript
    /// is owned by the session for the duration: exactly one in-flight
    /// assistant message exists while this future is live.
    ///
    /// On error, accumulated partial content is kept; a message that never
    /// received anything is removed so no half-initialized turn survives.
    pub async fn run<T: ChatTransport + ?Sized>(
        mut self,
        transport: &T,
        transcript: &mut Transcript,
        user_input: &str,
    ) -> Result<SessionOutcome> {
        transcript.push_user(user_input);
        // Snapshot before the placeholder so the request excludes it.
        let context = transcript.messages().to_vec();
        transcript.begin_assistant();

        let open = transport.open_stream(&self.params, &context);
        let mut stream = tokio::select! {
            result = open => match result {
                Ok(stream) => stream,
                Err(e) => {
                    transcript.abort_in_flight();
                    return Err(e);
                }
            },
            _ = self.cancel_rx.changed() => {
                return Self::cancelled(transport, transcript).await;
            }
        };

        let mut decoder = FrameDecoder::new();

        loop {
            let chunk = tokio::select! {
                // The session holds a sender, so this resolves only when the
                // cancel handle fires.
                _ = self.cancel_rx.changed() => {
                    return Self::cancelled(transport, transcript).await;
                }
                chunk = stream.next() => chunk,
            };

            match chunk {
                Some(Ok(bytes)) => {
                    for event in decoder.push_bytes(&bytes) {
                        match event {
                            StreamEvent::Response(text) => transcript.append_content(&text),
                            StreamEvent::Thinking(text) => transcript.append_thinking(&text),
                            StreamEvent::Done => {
                                transcript.finalize_in_flight();
                                return Ok(SessionOutcome::Completed);
                            }
                            StreamEvent::Error(message) => {
                                transcript.abort_in_flight();
                                return Err(ChatError::Stream(message));
                            }
                        }
                    }
                }
                Some(Err(e)) => {
                    transcript.abort_in_flight();
                    return Err(e);
                }
                // Stream closed without [DONE]: a trailing partial frame is
                // dropped and whatever accumulated counts as the answer.
                None => {
                    transcript.finalize_in_flight();
                    return Ok(SessionOutcome::Completed);
                }
            }
        }
    }

    async fn cancelled<T: ChatTransport + ?Sized>(
        transport: &T,
        transcript: &mut Transcript,
    ) -> Result<SessionOutcome> {
        let removed = transcript.abort_in_flight();
        tracing::debug!(removed_empty_turn = removed, "Generation cancelled");
        transport.stop().await;
        Ok(SessionOutcome::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::{MockScript, MockTransport};
    use crate::core::transcript::Role;

    fn params() -> GenerationParams {
        GenerationParams {
            model: "llama3".to_string(),
            ..GenerationParams::default()
        }
    }

    #[test]
    fn empty_model_rejected_before_io() {
        let result = GenerationSession::new(GenerationParams::default());
        assert!(matches!(result, Err(ChatError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn streams_tokens_into_transcript() {
        let transport = MockTransport::new().with_script(MockScript::chunks(vec![
            "data: {\"token\":\"Hel",
            "lo\"}\n\ndata: [DONE]\n\n",
        ]));
        let mut transcript = Transcript::new();

        let session = GenerationSession::new(params()).unwrap();
        let outcome = session
            .run(&transport, &mut transcript, "say hello")
            .await
            .unwrap();

        assert_eq!(outcome, SessionOutcome::Completed);
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.messages()[1].content, "Hello");
        assert!(transcript.in_flight().is_none());
    }

    #[tokio::test]
    async fn thinking_precedes_content() {
        let transport = MockTransport::new().with_script(MockScript::chunks(vec![
            "data: {\"thinking\":\"ponder\"}\n\ndata: {\"token\":\"Hi\"}\n\ndata: [DONE]\n\n",
        ]));
        let mut transcript = Transcript::new();

        let session = GenerationSession::new(params()).unwrap();
        session
            .run(&transport, &mut transcript, "think")
            .await
            .unwrap();

        let reply = &transcript.messages()[1];
        assert_eq!(reply.thinking.as_deref(), Some("ponder"));
        assert_eq!(reply.content, "Hi");
    }

    #[tokio::test]
    async fn request_excludes_placeholder() {
        let transport = MockTransport::new()
            .with_script(MockScript::chunks(vec!["data: [DONE]\n\n"]));
        let mut transcript = Transcript::new();
        transcript.push(Message::user("earlier"));
        transcript.push(Message::assistant("earlier reply"));

        let session = GenerationSession::new(params()).unwrap();
        session
            .run(&transport, &mut transcript, "next")
            .await
            .unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        let sent = &requests[0].messages;
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[2].role, Role::User);
        assert_eq!(sent[2].content, "next");
    }

    #[tokio::test]
    async fn error_frame_keeps_partial_content() {
        let transport = MockTransport::new().with_script(MockScript::chunks(vec![
            "data: {\"token\":\"par\"}\n\ndata: ERROR: backend fell over\n\n",
        ]));
        let mut transcript = Transcript::new();

        let session = GenerationSession::new(params()).unwrap();
        let err = session
            .run(&transport, &mut transcript, "q")
            .await
            .unwrap_err();

        assert!(matches!(err, ChatError::Stream(_)));
        assert_eq!(transcript.messages()[1].content, "par");
        assert!(transcript.in_flight().is_none());
    }

    #[tokio::test]
    async fn error_before_any_token_removes_placeholder() {
        let transport = MockTransport::new()
            .with_script(MockScript::chunks(vec!["data: ERROR: boom\n\n"]));
        let mut transcript = Transcript::new();

        let session = GenerationSession::new(params()).unwrap();
        let err = session
            .run(&transport, &mut transcript, "q")
            .await
            .unwrap_err();

        assert!(matches!(err, ChatError::Stream(_)));
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.messages()[0].role, Role::User);
    }

    #[tokio::test]
    async fn cancel_before_tokens_removes_placeholder() {
        let transport = MockTransport::new().with_script(MockScript::Pending);
        let mut transcript = Transcript::new();

        let session = GenerationSession::new(params()).unwrap();
        let handle = session.cancel_handle();
        handle.cancel();

        let outcome = session.run(&transport, &mut transcript, "q").await.unwrap();
        assert_eq!(outcome, SessionOutcome::Cancelled);
        assert_eq!(transcript.len(), 1);
        assert_eq!(transport.stop_calls(), 1);
    }

    #[tokio::test]
    async fn cancel_after_tokens_keeps_partial() {
        // First chunk delivers a token, then the stream hangs until cancel.
        let transport = MockTransport::new().with_script(MockScript::chunks_then_pending(vec![
            "data: {\"token\":\"part\"}\n\n",
        ]));
        let mut transcript = Transcript::new();

        let session = GenerationSession::new(params()).unwrap();
        let handle = session.cancel_handle();

        let outcome = {
            let run = session.run(&transport, &mut transcript, "q");
            tokio::pin!(run);

            // Let the token land before cancelling.
            for _ in 0..3 {
                tokio::select! {
                    biased;
                    _ = &mut run => panic!("stream should not finish on its own"),
                    () = tokio::task::yield_now() => {}
                }
            }
            handle.cancel();
            run.await.unwrap()
        };

        assert_eq!(outcome, SessionOutcome::Cancelled);
        assert_eq!(transcript.messages()[1].content, "part");
        assert_eq!(transport.stop_calls(), 1);
    }

    #[tokio::test]
    async fn cancel_is_idempotent() {
        let transport = MockTransport::new().with_script(MockScript::Pending);
        let mut transcript = Transcript::new();

        let session = GenerationSession::new(params()).unwrap();
        let handle = session.cancel_handle();
        handle.cancel();
        handle.cancel();
        assert!(handle.is_cancelled());

        let outcome = session.run(&transport, &mut transcript, "q").await.unwrap();
        assert_eq!(outcome, SessionOutcome::Cancelled);

        // After completion the handle is still safe to poke.
        handle.cancel();
    }

    #[tokio::test]
    async fn stream_end_without_done_completes() {
        let transport = MockTransport::new().with_script(MockScript::chunks(vec![
            "data: {\"token\":\"tail\"}\n\ndata: {\"token\":\"trunc",
        ]));
        let mut transcript = Transcript::new();

        let session = GenerationSession::new(params()).unwrap();
        let outcome = session.run(&transport, &mut transcript, "q").await.unwrap();

        assert_eq!(outcome, SessionOutcome::Completed);
        assert_eq!(transcript.messages()[1].content, "tail");
    }

    #[tokio::test]
    async fn transport_failure_on_open_removes_placeholder() {
        let transport = MockTransport::new(); // no script queued
        let mut transcript = Transcript::new();

        let session = GenerationSession::new(params()).unwrap();
        let err = session
            .run(&transport, &mut transcript, "q")
            .await
            .unwrap_err();

        assert!(matches!(err, ChatError::Transport(_)));
        assert_eq!(transcript.len(), 1);
    }

    #[tokio::test]
    async fn mid_stream_transport_failure_keeps_partial() {
        let transport = MockTransport::new().with_script(MockScript::chunks_then_error(
            vec!["data: {\"token\":\"half\"}\n\n"],
            "connection reset",
        ));
        let mut transcript = Transcript::new();

        let session = GenerationSession::new(params()).unwrap();
        let err = session
            .run(&transport, &mut transcript, "q")
            .await
            .unwrap_err();

        assert!(matches!(err, ChatError::Transport(_)));
        assert_eq!(transcript.messages()[1].content, "half");
    }
}
