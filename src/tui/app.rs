use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use tokio::sync::mpsc;

use crate::config::ConfigPersister;
use crate::core::error::Result;
use crate::tui::events::{AppEvent, terminal_event_loop, tick_loop};
use crate::tui::layout::calculate_layout;
use crate::tui::runner::SessionCommand;
use crate::tui::state::{AppState, NoticeLevel, PickerKind};
use crate::tui::terminal::{Term, restore_terminal, setup_terminal};
use crate::tui::theme::{Spinners, Theme};
use crate::tui::widgets::{ChatWidget, InputAction, InputWidget};

pub const SLASH_COMMANDS: &[&str] = &[
    "/help",
    "/new",
    "/model",
    "/conversations",
    "/save",
    "/exit",
];

const HELP_TEXT: &str = "/new chat | /model [name] | /conversations | /save | /exit \
| Ctrl+C stop | Ctrl+L new | Ctrl+T thinking";

enum SlashCommand {
    Help,
    New,
    Model(Option<String>),
    Conversations,
    Save,
    Exit,
    Unknown(String),
}

impl SlashCommand {
    fn parse(input: &str) -> Self {
        let mut parts = input.split_whitespace();
        let cmd = parts.next().unwrap_or("");
        match cmd {
            "/help" => Self::Help,
            "/new" => Self::New,
            "/model" => Self::Model(parts.next().map(ToString::to_string)),
            "/conversations" => Self::Conversations,
            "/save" => Self::Save,
            "/exit" => Self::Exit,
            _ => Self::Unknown(cmd.to_string()),
        }
    }
}

pub struct TuiApp {
    cmd_tx: mpsc::UnboundedSender<SessionCommand>,
    model_name: String,
    base_url: String,
    state: AppState,
    input_widget: InputWidget<'static>,
    event_rx: mpsc::UnboundedReceiver<AppEvent>,
    event_tx: mpsc::UnboundedSender<AppEvent>,
    persister: Option<Arc<ConfigPersister>>,
    terminal: Term,
}

impl TuiApp {
    pub(crate) fn with_event_channels(
        cmd_tx: mpsc::UnboundedSender<SessionCommand>,
        model_name: String,
        base_url: String,
        event_tx: mpsc::UnboundedSender<AppEvent>,
        event_rx: mpsc::UnboundedReceiver<AppEvent>,
        persister: Option<Arc<ConfigPersister>>,
    ) -> Result<Self> {
        let terminal = setup_terminal()?;

        Ok(Self {
            cmd_tx,
            model_name,
            base_url,
            state: AppState::new(),
            input_widget: InputWidget::new(),
            event_rx,
            event_tx,
            persister,
            terminal,
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        let tx1 = self.event_tx.clone();
        let tx2 = self.event_tx.clone();

        tokio::spawn(async move {
            let _ = terminal_event_loop(tx1).await;
        });

        tokio::spawn(async move {
            tick_loop(tx2).await;
        });

        while !self.state.should_quit {
            let spinner_frame = self.state.spinner_frame();
            let is_generating = self.state.is_generating;
            let elapsed = self.state.elapsed();

            self.terminal.draw(|f| {
                let layout = calculate_layout(f.area());

                render_header(f, layout.header, &self.model_name, &self.base_url);

                let state = &mut self.state;
                let chat = ChatWidget::new(&mut state.view, &mut state.scroll, spinner_frame);
                chat.render(layout.chat, f.buffer_mut());

                self.input_widget.render(layout.input, f);

                render_status(
                    f,
                    layout.status,
                    is_generating,
                    elapsed,
                    spinner_frame,
                    self.state.notice.as_ref(),
                );

                if let Some(picker) = &self.state.picker {
                    render_picker(f, f.area(), picker);
                }
            })?;

            if let Some(event) = self.event_rx.recv().await {
                self.handle_event(event);
            }
        }

        let _ = self.cmd_tx.send(SessionCommand::Shutdown);
        restore_terminal(&mut self.terminal)?;

        Ok(())
    }

    fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Input(key) => self.handle_key_input(key),
            AppEvent::Paste(text) => {
                let action = self.input_widget.handle_paste(&text);
                self.handle_input_action(action);
            }
            AppEvent::Resize(..) => {}
            AppEvent::MouseScroll(delta) => {
                if delta < 0 {
                    self.state.scroll_up(delta.unsigned_abs() as usize);
                } else {
                    #[allow(clippy::cast_sign_loss)]
                    self.state.scroll_down(delta as usize);
                }
            }
            // Ticks only trigger a redraw; the spinner follows the request clock.
            AppEvent::Tick => {}
            AppEvent::Transcript(change) => {
                self.state.scroll.reset_manual_scroll();
                self.state.view.apply(change);
            }
            AppEvent::SessionStarted => self.state.start_generating(),
            AppEvent::SessionFinished { cancelled, error } => {
                self.state.stop_generating();
                if let Some(error) = error {
                    self.state.notify_error(error);
                } else if cancelled {
                    self.state.notify("Generation stopped");
                }
            }
            AppEvent::ModelChanged(model) => {
                self.model_name.clone_from(&model);
                self.state.notify(format!("Model set to {model}"));
                if let Some(persister) = &self.persister
                    && let Err(e) = persister.persist_model(&model)
                {
                    tracing::warn!(error = %e, "Could not persist model selection");
                }
            }
            AppEvent::Models(Ok(models)) => {
                if models.is_empty() {
                    self.state.notify_error("No models installed on the backend");
                } else {
                    self.state.show_picker(PickerKind::Models, models);
                }
            }
            AppEvent::Models(Err(e)) => {
                self.state.notify_error(format!("Could not list models: {e}"));
            }
            AppEvent::Conversations(Ok(conversations)) => {
                if conversations.is_empty() {
                    self.state.close_picker();
                    self.state.notify("No saved conversations");
                } else {
                    self.state.show_picker(PickerKind::Conversations, conversations);
                }
            }
            AppEvent::Conversations(Err(e)) => {
                self.state
                    .notify_error(format!("Could not list conversations: {e}"));
            }
            AppEvent::ConversationLoaded { filename, model } => {
                self.model_name = model;
                self.state.notify(format!("Loaded {filename}"));
            }
            AppEvent::Saved(filename) => {
                self.state.notify(format!("Saved as {filename}"));
            }
            AppEvent::BackendError(e) => self.state.notify_error(e),
        }
    }

    fn handle_key_input(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            if self.state.has_picker() {
                self.state.close_picker();
                return;
            }
            if self.state.is_generating {
                let _ = self.cmd_tx.send(SessionCommand::Cancel);
                return;
            }
            if !self.input_widget.is_empty() {
                self.input_widget.clear();
                return;
            }
            self.state.quit();
            return;
        }

        if key.code == KeyCode::Char('d') && key.modifiers.contains(KeyModifiers::CONTROL) {
            if self.input_widget.is_empty() && !self.state.has_picker() {
                self.state.quit();
            }
            return;
        }

        if self.state.has_picker() {
            self.handle_picker_input(key);
            return;
        }

        if key.code == KeyCode::Char('l') && key.modifiers.contains(KeyModifiers::CONTROL) {
            let _ = self.cmd_tx.send(SessionCommand::NewChat);
            return;
        }

        if key.code == KeyCode::Char('t') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.state.view.toggle_thinking();
            return;
        }

        match key.code {
            KeyCode::PageUp => {
                self.state.scroll_up(10);
                return;
            }
            KeyCode::PageDown => {
                self.state.scroll_down(10);
                return;
            }
            KeyCode::Home if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.state.scroll.scroll_to_top();
                return;
            }
            KeyCode::End if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.state.scroll.scroll_to_bottom();
                return;
            }
            _ => {}
        }

        let action = self.input_widget.handle_key(key);
        self.handle_input_action(action);
    }

    fn handle_picker_input(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                if let Some(picker) = &mut self.state.picker {
                    picker.select_prev();
                }
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if let Some(picker) = &mut self.state.picker {
                    picker.select_next();
                }
            }
            KeyCode::Char('d') => {
                if let Some(picker) = &self.state.picker
                    && picker.kind == PickerKind::Conversations
                    && let Some(item) = picker.selected_item()
                {
                    let _ = self
                        .cmd_tx
                        .send(SessionCommand::DeleteConversation(item.to_string()));
                }
            }
            KeyCode::Enter => {
                if let Some(picker) = self.state.picker.take()
                    && let Some(item) = picker.selected_item()
                {
                    let cmd = match picker.kind {
                        PickerKind::Models => SessionCommand::SetModel(item.to_string()),
                        PickerKind::Conversations => {
                            SessionCommand::LoadConversation(item.to_string())
                        }
                    };
                    let _ = self.cmd_tx.send(cmd);
                }
            }
            KeyCode::Esc => self.state.close_picker(),
            _ => {}
        }
    }

    fn handle_input_action(&mut self, action: InputAction) {
        match action {
            InputAction::Continue | InputAction::Clear => {}

            InputAction::Submit(text) => {
                if text.starts_with('/') {
                    self.handle_slash_command(&text);
                } else {
                    self.state.history.push(text.clone());
                    let _ = self.cmd_tx.send(SessionCommand::Submit(text));
                }
            }

            InputAction::HistoryPrev => {
                if let Some(text) = self.state.history.prev() {
                    self.input_widget.set_text(text);
                }
            }

            InputAction::HistoryNext => {
                if let Some(text) = self.state.history.next() {
                    self.input_widget.set_text(text);
                } else {
                    self.input_widget.clear();
                }
            }
        }
    }

    fn handle_slash_command(&mut self, command: &str) {
        match SlashCommand::parse(command) {
            SlashCommand::Help => self.state.notify(HELP_TEXT),
            SlashCommand::New => {
                let _ = self.cmd_tx.send(SessionCommand::NewChat);
            }
            SlashCommand::Model(Some(name)) => {
                let _ = self.cmd_tx.send(SessionCommand::SetModel(name));
            }
            SlashCommand::Model(None) => {
                let _ = self.cmd_tx.send(SessionCommand::ListModels);
            }
            SlashCommand::Conversations => {
                let _ = self.cmd_tx.send(SessionCommand::ListConversations);
            }
            SlashCommand::Save => {
                let _ = self.cmd_tx.send(SessionCommand::Save);
            }
            SlashCommand::Exit => self.state.quit(),
            SlashCommand::Unknown(cmd) => {
                self.state
                    .notify_error(format!("Unknown command: {cmd}. Type /help for commands."));
            }
        }
    }
}

impl Drop for TuiApp {
    fn drop(&mut self) {
        // Covers panics and early returns; a second restore is harmless.
        let _ = restore_terminal(&mut self.terminal);
    }
}

fn render_header(frame: &mut ratatui::Frame, area: Rect, model: &str, base_url: &str) {
    let title = format!("mallama v{}", env!("CARGO_PKG_VERSION"));
    let model_label = if model.is_empty() { "(none)" } else { model };
    let subtitle = format!("Model: {model_label} | Backend: {base_url}");

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(Theme::border());

    let lines = vec![
        Line::from(vec![
            Span::raw("  "),
            Span::styled(title, Theme::primary_bold()),
        ]),
        Line::from(vec![
            Span::raw("  "),
            Span::styled(subtitle, Theme::muted()),
        ]),
    ];

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

#[allow(clippy::cast_possible_truncation)]
fn render_status(
    frame: &mut ratatui::Frame,
    area: Rect,
    is_generating: bool,
    elapsed: Option<std::time::Duration>,
    spinner_frame: usize,
    notice: Option<&crate::tui::state::Notice>,
) {
    let hints = "/ commands | PgUp/PgDn scroll";
    let left_line = Line::from(vec![Span::raw(" "), Span::styled(hints, Theme::muted())]);
    frame
        .buffer_mut()
        .set_line(area.x, area.y, &left_line, hints.len() as u16 + 2);

    let right_line = if is_generating {
        let frames = Spinners::BRAILLE;
        let frame_char = frames[spinner_frame % frames.len()];
        let elapsed_text = elapsed
            .map(|d| format!(" {}s", d.as_secs()))
            .unwrap_or_default();
        Some(Line::from(vec![
            Span::styled(
                format!("{frame_char} Generating{elapsed_text}"),
                Theme::warning(),
            ),
            Span::raw(" "),
        ]))
    } else {
        notice.map(|n| {
            let style = match n.level {
                NoticeLevel::Info => Theme::muted(),
                NoticeLevel::Error => Theme::error(),
            };
            Line::from(vec![Span::styled(n.text.clone(), style), Span::raw(" ")])
        })
    };

    if let Some(line) = right_line {
        let len = (line.width() + 1) as u16;
        let x = area.x + area.width.saturating_sub(len);
        frame.buffer_mut().set_line(x, area.y, &line, len);
    }
}

#[allow(clippy::cast_possible_truncation)]
fn render_picker(frame: &mut ratatui::Frame, area: Rect, picker: &crate::tui::state::ListPicker) {
    let (title, footer) = match picker.kind {
        PickerKind::Models => (" Models ", " ↑↓ select | Enter confirm | Esc close "),
        PickerKind::Conversations => (
            " Conversations ",
            " ↑↓ select | Enter load | d delete | Esc close ",
        ),
    };

    let height = (picker.items.len().min(12) as u16) + 3;
    let width = 50.min(area.width.saturating_sub(4));
    let modal = Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    };

    let lines: Vec<Line> = picker
        .items
        .iter()
        .enumerate()
        .skip(picker.selected.saturating_sub(11))
        .take(12)
        .map(|(i, item)| {
            let (marker, style) = if i == picker.selected {
                ("❯ ", Theme::primary_bold())
            } else {
                ("  ", Theme::off_white())
            };
            Line::from(vec![Span::raw(marker), Span::styled(item.clone(), style)])
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Theme::primary())
        .border_set(ratatui::symbols::border::ROUNDED)
        .title(title)
        .title_bottom(Line::from(Span::styled(footer, Theme::muted())));

    frame.render_widget(Clear, modal);
    frame.render_widget(Paragraph::new(lines).block(block), modal);
}
