use std::sync::Arc;

use tokio::sync::mpsc;

use crate::backend::{BackendClient, ConversationStore, SavedConversation};
use crate::core::{
    ChatTransport, GenerationParams, GenerationSession, SessionOutcome, Transcript,
    TranscriptChange,
};
use crate::tui::events::AppEvent;

#[derive(Debug)]
pub enum SessionCommand {
    Submit(String),
    Cancel,
    NewChat,
    SetModel(String),
    ListModels,
    ListConversations,
    LoadConversation(String),
    DeleteConversation(String),
    Save,
    Shutdown,
}

/// Owns the transcript and serializes everything that touches it. Commands
/// arrive over a channel; results go back to the UI as events. A command
/// sent mid-generation cancels the active session first, so the transcript
/// never sees interleaved writes.
pub struct SessionRunner<T: ChatTransport + Send + Sync + 'static> {
    transport: Arc<T>,
    transcript: Transcript,
    params: GenerationParams,
    backend: Option<BackendClient>,
    store: Option<ConversationStore>,
    cmd_rx: mpsc::UnboundedReceiver<SessionCommand>,
    event_tx: mpsc::UnboundedSender<AppEvent>,
}

impl<T: ChatTransport + Send + Sync + 'static> SessionRunner<T> {
    pub fn new(
        transport: Arc<T>,
        params: GenerationParams,
        event_tx: mpsc::UnboundedSender<AppEvent>,
    ) -> (Self, mpsc::UnboundedSender<SessionCommand>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let runner = Self {
            transport,
            transcript: Transcript::new(),
            params,
            backend: None,
            store: None,
            cmd_rx,
            event_tx,
        };
        (runner, cmd_tx)
    }

    #[must_use]
    pub fn with_backend(mut self, backend: BackendClient) -> Self {
        self.store = Some(ConversationStore::new(backend.clone()));
        self.backend = Some(backend);
        self
    }

    pub fn subscribe_transcript(&mut self) -> mpsc::UnboundedReceiver<TranscriptChange> {
        self.transcript.subscribe()
    }

    pub async fn run(mut self) {
        while let Some(cmd) = self.cmd_rx.recv().await {
            let mut next = Some(cmd);
            while let Some(cmd) = next.take() {
                match cmd {
                    SessionCommand::Submit(text) => {
                        next = self.generate(text).await;
                    }
                    SessionCommand::Cancel => {
                        // Nothing in flight; a live session handles this inline.
                    }
                    SessionCommand::NewChat => self.new_chat().await,
                    SessionCommand::SetModel(model) => {
                        self.params.model = model.clone();
                        let _ = self.event_tx.send(AppEvent::ModelChanged(model));
                    }
                    SessionCommand::ListModels => self.list_models().await,
                    SessionCommand::ListConversations => self.list_conversations().await,
                    SessionCommand::LoadConversation(filename) => {
                        self.load_conversation(filename).await;
                    }
                    SessionCommand::DeleteConversation(filename) => {
                        self.delete_conversation(&filename).await;
                    }
                    SessionCommand::Save => self.save_current(true).await,
                    SessionCommand::Shutdown => {
                        tracing::info!("Session runner shutting down");
                        return;
                    }
                }
            }
        }
    }

    /// Runs one generation to completion while keeping the command channel
    /// live. Cancel takes effect immediately; any other command aborts the
    /// session and is replayed by the caller once the transcript settles.
    async fn generate(&mut self, text: String) -> Option<SessionCommand> {
        let session = match GenerationSession::new(self.params.clone()) {
            Ok(session) => session,
            Err(e) => {
                let _ = self.event_tx.send(AppEvent::SessionFinished {
                    cancelled: false,
                    error: Some(e.to_string()),
                });
                return None;
            }
        };
        let cancel = session.cancel_handle();
        let _ = self.event_tx.send(AppEvent::SessionStarted);

        let mut deferred = None;
        let result = {
            let run = session.run(self.transport.as_ref(), &mut self.transcript, &text);
            tokio::pin!(run);

            loop {
                tokio::select! {
                    result = &mut run => break result,
                    cmd = self.cmd_rx.recv() => match cmd {
                        Some(SessionCommand::Cancel) | None => cancel.cancel(),
                        Some(other) => {
                            cancel.cancel();
                            deferred = Some(other);
                        }
                    }
                }
            }
        };

        let (cancelled, error) = match result {
            Ok(SessionOutcome::Completed) => (false, None),
            Ok(SessionOutcome::Cancelled) => (true, None),
            Err(e) => (false, Some(e.to_string())),
        };
        let _ = self
            .event_tx
            .send(AppEvent::SessionFinished { cancelled, error });

        self.save_current(false).await;
        deferred
    }

    async fn new_chat(&mut self) {
        self.save_current(false).await;
        self.transcript.clear();
    }

    /// Persists the transcript to the backend archive. Autosaves stay quiet
    /// on failure; an explicit save reports both outcomes.
    async fn save_current(&mut self, announce: bool) {
        let Some(store) = &self.store else { return };
        if self.transcript.is_empty() {
            return;
        }

        let snapshot = SavedConversation::snapshot(&self.params, self.transcript.messages());
        match store.save(&snapshot).await {
            Ok(filename) => {
                if announce {
                    let _ = self.event_tx.send(AppEvent::Saved(filename));
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "Conversation save failed");
                if announce {
                    let _ = self
                        .event_tx
                        .send(AppEvent::BackendError(format!("Save failed: {e}")));
                }
            }
        }
    }

    async fn list_models(&self) {
        let Some(backend) = &self.backend else { return };
        let result = backend.models().await.map_err(|e| e.to_string());
        let _ = self.event_tx.send(AppEvent::Models(result));
    }

    async fn list_conversations(&self) {
        let Some(store) = &self.store else { return };
        let result = store.list().await.map_err(|e| e.to_string());
        let _ = self.event_tx.send(AppEvent::Conversations(result));
    }

    async fn load_conversation(&mut self, filename: String) {
        let Some(store) = &self.store else { return };
        match store.load(&filename).await {
            Ok(saved) => {
                self.params.model = saved.model.clone();
                self.params.temperature = saved.temperature;
                self.params.top_p = saved.top_p;
                self.params.max_tokens = saved.max_tokens;
                self.transcript.replace(saved.messages);
                let _ = self.event_tx.send(AppEvent::ConversationLoaded {
                    filename,
                    model: saved.model,
                });
            }
            Err(e) => {
                let _ = self
                    .event_tx
                    .send(AppEvent::BackendError(format!("Load failed: {e}")));
            }
        }
    }

    async fn delete_conversation(&self, filename: &str) {
        let Some(store) = &self.store else { return };
        if let Err(e) = store.delete(filename).await {
            let _ = self
                .event_tx
                .send(AppEvent::BackendError(format!("Delete failed: {e}")));
        }
        // Refresh the picker with the surviving entries.
        self.list_conversations().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::{MockScript, MockTransport};
    use crate::core::Role;

    fn runner_with(
        transport: MockTransport,
    ) -> (
        SessionRunner<MockTransport>,
        mpsc::UnboundedSender<SessionCommand>,
        mpsc::UnboundedReceiver<AppEvent>,
    ) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let params = GenerationParams {
            model: "llama3".to_string(),
            ..GenerationParams::default()
        };
        let (runner, cmd_tx) = SessionRunner::new(Arc::new(transport), params, event_tx);
        (runner, cmd_tx, event_rx)
    }

    async fn wait_for_finish(event_rx: &mut mpsc::UnboundedReceiver<AppEvent>) -> (bool, Option<String>) {
        while let Some(event) = event_rx.recv().await {
            if let AppEvent::SessionFinished { cancelled, error } = event {
                return (cancelled, error);
            }
        }
        panic!("Runner dropped without finishing the session");
    }

    #[tokio::test]
    async fn submit_streams_and_notifies() {
        let transport = MockTransport::new().with_script(MockScript::chunks(vec![
            "data: {\"token\":\"ok\"}\n\ndata: [DONE]\n\n",
        ]));
        let (mut runner, cmd_tx, mut event_rx) = runner_with(transport);
        let mut changes = runner.subscribe_transcript();

        cmd_tx.send(SessionCommand::Submit("hi".to_string())).unwrap();
        cmd_tx.send(SessionCommand::Shutdown).unwrap();
        runner.run().await;

        let (cancelled, error) = wait_for_finish(&mut event_rx).await;
        assert!(!cancelled);
        assert!(error.is_none());

        // First change is the user message landing in the transcript.
        match changes.recv().await {
            Some(TranscriptChange::Appended { index: 0, message }) => {
                assert_eq!(message.role, Role::User);
            }
            other => panic!("Expected user append, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancel_reaches_live_session() {
        let transport = MockTransport::new().with_script(MockScript::Pending);
        let (runner, cmd_tx, mut event_rx) = runner_with(transport);

        let handle = tokio::spawn(runner.run());

        cmd_tx.send(SessionCommand::Submit("hi".to_string())).unwrap();

        // Wait until the session is actually running before cancelling.
        loop {
            match event_rx.recv().await {
                Some(AppEvent::SessionStarted) => break,
                Some(_) => {}
                None => panic!("Runner exited early"),
            }
        }
        cmd_tx.send(SessionCommand::Cancel).unwrap();

        let (cancelled, error) = wait_for_finish(&mut event_rx).await;
        assert!(cancelled);
        assert!(error.is_none());

        cmd_tx.send(SessionCommand::Shutdown).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn new_submit_cancels_active_session() {
        let transport = MockTransport::new()
            .with_script(MockScript::Pending)
            .with_script(MockScript::chunks(vec![
                "data: {\"token\":\"second\"}\n\ndata: [DONE]\n\n",
            ]));
        let (runner, cmd_tx, mut event_rx) = runner_with(transport);

        let handle = tokio::spawn(runner.run());

        cmd_tx.send(SessionCommand::Submit("first".to_string())).unwrap();
        loop {
            match event_rx.recv().await {
                Some(AppEvent::SessionStarted) => break,
                Some(_) => {}
                None => panic!("Runner exited early"),
            }
        }
        cmd_tx.send(SessionCommand::Submit("second".to_string())).unwrap();

        let (cancelled, _) = wait_for_finish(&mut event_rx).await;
        assert!(cancelled);

        // The deferred submit runs as a fresh session and completes.
        let (cancelled, error) = wait_for_finish(&mut event_rx).await;
        assert!(!cancelled);
        assert!(error.is_none());

        cmd_tx.send(SessionCommand::Shutdown).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn set_model_takes_effect_for_next_session() {
        let transport = MockTransport::new()
            .with_script(MockScript::chunks(vec!["data: [DONE]\n\n"]));
        let (runner, cmd_tx, mut event_rx) = runner_with(transport.clone());

        let handle = tokio::spawn(runner.run());

        cmd_tx.send(SessionCommand::SetModel("mistral".to_string())).unwrap();
        cmd_tx.send(SessionCommand::Submit("hi".to_string())).unwrap();

        let (_, error) = wait_for_finish(&mut event_rx).await;
        assert!(error.is_none());

        cmd_tx.send(SessionCommand::Shutdown).unwrap();
        handle.await.unwrap();

        assert_eq!(transport.requests()[0].params.model, "mistral");
    }
}
