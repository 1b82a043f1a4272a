pub mod app;
pub mod events;
pub mod layout;
pub mod runner;
pub mod state;
pub mod terminal;
pub mod theme;
pub mod widgets;

pub use app::TuiApp;
pub use runner::{SessionCommand, SessionRunner};

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::backend::BackendClient;
use crate::config::ConfigPersister;
use crate::core::GenerationParams;
use crate::core::error::Result;
use crate::tui::events::forward_transcript_changes;

pub async fn run_tui(backend: BackendClient, params: GenerationParams) -> Result<()> {
    let (event_tx, event_rx) = mpsc::unbounded_channel();

    let persister = ConfigPersister::with_default_path().map(Arc::new);
    if persister.is_none() {
        tracing::warn!("Could not determine config path, model selection will not be persisted");
    }

    let model_name = params.model.clone();
    let base_url = backend.base_url().to_string();

    let (runner, cmd_tx) =
        SessionRunner::new(Arc::new(backend.clone()), params, event_tx.clone());
    let mut runner = runner.with_backend(backend);
    let changes = runner.subscribe_transcript();
    forward_transcript_changes(changes, event_tx.clone());
    tokio::spawn(runner.run());

    let mut app = TuiApp::with_event_channels(
        cmd_tx,
        model_name,
        base_url,
        event_tx,
        event_rx,
        persister,
    )?;
    app.run().await
}
