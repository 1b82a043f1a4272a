#![allow(clippy::cast_possible_truncation)]

use crate::tui::app::SLASH_COMMANDS;
use crate::tui::theme::Theme;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::Frame;
use ratatui::buffer::Buffer;
use ratatui::layout::{Position, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Widget};
use tui_textarea::TextArea;

const PROMPT: &str = "> ";
const SEND_HINT: &str = "↵ send";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputAction {
    Continue,
    Submit(String),
    HistoryPrev,
    HistoryNext,
    Clear,
}

/// Slash-command completions matching what is typed so far. Present only
/// while at least one command matches.
struct Suggestions {
    items: Vec<&'static str>,
    selected: usize,
}

impl Suggestions {
    fn matching(typed: &str) -> Option<Self> {
        let items: Vec<&'static str> = SLASH_COMMANDS
            .iter()
            .copied()
            .filter(|cmd| cmd.starts_with(typed))
            .collect();
        (!items.is_empty()).then_some(Self { items, selected: 0 })
    }

    fn select_next(&mut self) {
        self.selected = (self.selected + 1) % self.items.len();
    }

    fn select_prev(&mut self) {
        self.selected = self
            .selected
            .checked_sub(1)
            .unwrap_or(self.items.len() - 1);
    }

    fn current(&self) -> &'static str {
        self.items[self.selected]
    }
}

pub struct InputWidget<'a> {
    textarea: TextArea<'a>,
    suggestions: Option<Suggestions>,
}

fn fresh_textarea(lines: Vec<String>) -> TextArea<'static> {
    let mut textarea = TextArea::new(lines);
    textarea.set_placeholder_text("");
    textarea.set_cursor_line_style(Style::default());
    textarea.set_cursor_style(Theme::white());
    textarea
}

impl InputWidget<'_> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            textarea: fresh_textarea(Vec::new()),
            suggestions: None,
        }
    }

    #[must_use]
    pub fn text(&self) -> String {
        self.textarea.lines().join("\n")
    }

    pub fn set_text(&mut self, text: &str) {
        self.textarea = fresh_textarea(text.lines().map(ToString::to_string).collect());
        self.textarea.move_cursor(tui_textarea::CursorMove::End);
    }

    pub fn clear(&mut self) {
        self.textarea = fresh_textarea(Vec::new());
        self.suggestions = None;
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.textarea.lines().iter().all(String::is_empty)
    }

    pub fn take(&mut self) -> String {
        let text = self.text();
        self.clear();
        text
    }

    pub fn handle_paste(&mut self, text: &str) -> InputAction {
        self.textarea.insert_str(text);
        self.refresh_suggestions();
        InputAction::Continue
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> InputAction {
        match (key.code, key.modifiers) {
            (KeyCode::Tab, KeyModifiers::NONE) if self.suggestions.is_some() => {
                if let Some(list) = self.suggestions.take() {
                    self.set_text(&format!("{} ", list.current()));
                }
                InputAction::Continue
            }

            (KeyCode::Down, KeyModifiers::NONE) => {
                if let Some(list) = &mut self.suggestions {
                    list.select_next();
                    InputAction::Continue
                } else if self.is_empty() {
                    InputAction::HistoryNext
                } else {
                    self.textarea.input(key);
                    InputAction::Continue
                }
            }

            (KeyCode::Up, KeyModifiers::NONE) => {
                if let Some(list) = &mut self.suggestions {
                    list.select_prev();
                    InputAction::Continue
                } else if self.is_empty() || self.textarea.cursor().0 == 0 {
                    InputAction::HistoryPrev
                } else {
                    self.textarea.input(key);
                    InputAction::Continue
                }
            }

            (KeyCode::Enter, KeyModifiers::SHIFT | KeyModifiers::ALT) => {
                self.textarea.insert_newline();
                InputAction::Continue
            }

            (KeyCode::Enter, _) => {
                if let Some(list) = self.suggestions.take() {
                    let command = list.current().to_string();
                    self.clear();
                    return InputAction::Submit(command);
                }

                let text = self.take();
                if text.trim().is_empty() {
                    InputAction::Continue
                } else {
                    InputAction::Submit(text)
                }
            }

            (KeyCode::Char('k'), KeyModifiers::CONTROL) => {
                self.clear();
                InputAction::Clear
            }

            (KeyCode::Esc, _) => {
                self.suggestions = None;
                InputAction::Continue
            }

            _ => {
                self.textarea.input(key);
                self.refresh_suggestions();
                InputAction::Continue
            }
        }
    }

    fn refresh_suggestions(&mut self) {
        let text = self.text();
        self.suggestions = if text.starts_with('/') {
            Suggestions::matching(&text)
        } else {
            None
        };
    }

    pub fn render(&mut self, area: Rect, frame: &mut Frame) {
        let buf = frame.buffer_mut();

        // Row 0 is a horizontal rule, the rest holds the prompt line.
        let separator = Line::from(Span::styled(
            "─".repeat(area.width as usize),
            Theme::border(),
        ));
        Paragraph::new(separator).render(Rect { height: 1, ..area }, buf);

        let input_row = Rect {
            y: area.y + 1,
            height: area.height.saturating_sub(1),
            ..area
        };

        let prompt = Line::from(Span::styled(PROMPT, Theme::white()));
        Paragraph::new(prompt).render(Rect { width: 2, height: 1, ..input_row }, buf);

        let hint_width = SEND_HINT.len() as u16;
        if !self.is_empty() {
            let hint_rect = Rect {
                x: input_row.x + input_row.width - hint_width - 1,
                width: hint_width,
                height: 1,
                ..input_row
            };
            Paragraph::new(Line::from(Span::styled(SEND_HINT, Theme::muted())))
                .render(hint_rect, buf);
        }

        let text_rect = Rect {
            x: input_row.x + 2,
            width: input_row.width.saturating_sub(2 + hint_width + 2),
            ..input_row
        };

        self.textarea
            .set_block(Block::default().borders(Borders::NONE));
        frame.render_widget(&self.textarea, text_rect);

        let (row, col) = self.textarea.cursor();
        frame.set_cursor_position(Position::new(
            text_rect.x + col as u16,
            text_rect.y + row as u16,
        ));

        if let Some(list) = &self.suggestions {
            render_suggestions(list, area, frame.buffer_mut());
        }
    }
}

fn render_suggestions(list: &Suggestions, anchor: Rect, buf: &mut Buffer) {
    let height = list.items.len().min(5) as u16 + 2;
    if anchor.y < height {
        return;
    }

    // Popup sits directly above the input box, aligned with the prompt.
    let popup = Rect {
        x: anchor.x + 2,
        y: anchor.y - height,
        width: 30.min(anchor.width.saturating_sub(4)),
        height,
    };

    let lines: Vec<Line> = list
        .items
        .iter()
        .enumerate()
        .map(|(i, cmd)| {
            if i == list.selected {
                Line::from(vec![
                    Span::raw(" "),
                    Span::styled(*cmd, Theme::primary_bold()),
                    Span::styled(" ←", Theme::primary()),
                ])
            } else {
                Line::from(vec![Span::raw(" "), Span::styled(*cmd, Theme::muted())])
            }
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Theme::primary())
        .border_set(ratatui::symbols::border::ROUNDED)
        .title(" Commands ");

    Paragraph::new(lines).block(block).render(popup, buf);
}

impl Default for InputWidget<'_> {
    fn default() -> Self {
        Self::new()
    }
}
