use crate::core::TranscriptChange;
use crate::core::error::Result;
use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, MouseEventKind};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

/// Everything the UI loop reacts to: terminal input, timer ticks, and
/// results flowing back from the session runner.
#[derive(Debug)]
pub enum AppEvent {
    Input(KeyEvent),
    Paste(String),
    MouseScroll(i16),
    Resize(u16, u16),
    Tick,
    Transcript(TranscriptChange),
    SessionStarted,
    SessionFinished {
        cancelled: bool,
        error: Option<String>,
    },
    ModelChanged(String),
    Models(std::result::Result<Vec<String>, String>),
    Conversations(std::result::Result<Vec<String>, String>),
    ConversationLoaded {
        filename: String,
        model: String,
    },
    Saved(String),
    BackendError(String),
}

pub async fn terminal_event_loop(tx: UnboundedSender<AppEvent>) -> Result<()> {
    loop {
        if event::poll(Duration::from_millis(100))? {
            match event::read()? {
                CrosstermEvent::Key(key) => {
                    if tx.send(AppEvent::Input(key)).is_err() {
                        break;
                    }
                }
                CrosstermEvent::Paste(text) => {
                    if tx.send(AppEvent::Paste(text)).is_err() {
                        break;
                    }
                }
                CrosstermEvent::Resize(w, h) => {
                    if tx.send(AppEvent::Resize(w, h)).is_err() {
                        break;
                    }
                }
                CrosstermEvent::Mouse(mouse) => match mouse.kind {
                    MouseEventKind::ScrollUp => {
                        if tx.send(AppEvent::MouseScroll(-3)).is_err() {
                            break;
                        }
                    }
                    MouseEventKind::ScrollDown => {
                        if tx.send(AppEvent::MouseScroll(3)).is_err() {
                            break;
                        }
                    }
                    _ => {}
                },
                _ => {}
            }
        }
    }
    Ok(())
}

pub async fn tick_loop(tx: UnboundedSender<AppEvent>) {
    let mut interval = tokio::time::interval(Duration::from_millis(16));
    loop {
        interval.tick().await;
        if tx.send(AppEvent::Tick).is_err() {
            break;
        }
    }
}

/// Bridges transcript change notifications into the UI event stream.
pub fn forward_transcript_changes(
    mut rx: tokio::sync::mpsc::UnboundedReceiver<TranscriptChange>,
    tx: UnboundedSender<AppEvent>,
) {
    tokio::spawn(async move {
        while let Some(change) = rx.recv().await {
            if tx.send(AppEvent::Transcript(change)).is_err() {
                break;
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_transcript_changes_forwarded() {
        let (change_tx, change_rx) = mpsc::unbounded_channel();
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();

        forward_transcript_changes(change_rx, event_tx);

        change_tx
            .send(TranscriptChange::Finalized { index: 0 })
            .unwrap();

        match event_rx.recv().await {
            Some(AppEvent::Transcript(TranscriptChange::Finalized { index })) => {
                assert_eq!(index, 0);
            }
            other => panic!("Expected transcript event, got {other:?}"),
        }
    }
}
