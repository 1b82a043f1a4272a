use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Widget};

use crate::core::{Message, Role, TranscriptChange};
use crate::tui::theme::{Spinners, Theme};

/// One transcript entry plus its rendered lines. The cache is keyed by the
/// width it was built for; an in-flight entry is rebuilt every frame so the
/// spinner and cursor stay live, settled entries render exactly once.
struct ViewEntry {
    message: Message,
    in_flight: bool,
    thinking_collapsed: bool,
    cache: Option<(u16, Vec<Line<'static>>)>,
}

impl ViewEntry {
    fn new(message: Message, in_flight: bool) -> Self {
        Self {
            message,
            in_flight,
            thinking_collapsed: false,
            cache: None,
        }
    }

    fn invalidate(&mut self) {
        self.cache = None;
    }

    fn lines(&mut self, width: u16, spinner_frame: usize) -> &[Line<'static>] {
        let stale = self.in_flight
            || self.cache.as_ref().is_none_or(|(w, _)| *w != width);
        if stale {
            let lines = render_message(
                &self.message,
                self.in_flight,
                self.thinking_collapsed,
                width,
                spinner_frame,
            );
            self.cache = Some((width, lines));
        }
        match &self.cache {
            Some((_, lines)) => lines,
            None => &[],
        }
    }
}

/// UI-side mirror of the transcript, updated by change notifications.
#[derive(Default)]
pub struct TranscriptView {
    entries: Vec<ViewEntry>,
}

impl TranscriptView {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn apply(&mut self, change: TranscriptChange) {
        match change {
            TranscriptChange::Appended { index, message } => {
                let in_flight =
                    message.role == Role::Assistant && message.is_empty_turn();
                self.entries.truncate(index);
                self.entries.push(ViewEntry::new(message, in_flight));
            }
            TranscriptChange::ContentDelta { index, text } => {
                if let Some(entry) = self.entries.get_mut(index) {
                    entry.message.content.push_str(&text);
                    entry.invalidate();
                }
            }
            TranscriptChange::ThinkingDelta { index, text } => {
                if let Some(entry) = self.entries.get_mut(index) {
                    entry
                        .message
                        .thinking
                        .get_or_insert_with(String::new)
                        .push_str(&text);
                    entry.invalidate();
                }
            }
            TranscriptChange::Finalized { index } => {
                if let Some(entry) = self.entries.get_mut(index) {
                    entry.in_flight = false;
                    entry.invalidate();
                }
            }
            TranscriptChange::Removed { index } => {
                if index < self.entries.len() {
                    self.entries.remove(index);
                }
            }
            TranscriptChange::Replaced { messages } => {
                self.entries = messages
                    .into_iter()
                    .map(|m| ViewEntry::new(m, false))
                    .collect();
            }
        }
    }

    /// Collapses or expands the reasoning block of the newest message that
    /// has one.
    pub fn toggle_thinking(&mut self) {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .rev()
            .find(|e| e.message.thinking.as_ref().is_some_and(|t| !t.is_empty()))
        {
            entry.thinking_collapsed = !entry.thinking_collapsed;
            entry.invalidate();
        }
    }

    /// Flattened lines for the whole conversation, with a blank spacer
    /// between entries.
    pub fn lines(&mut self, width: u16, spinner_frame: usize) -> Vec<Line<'static>> {
        let count = self.entries.len();
        let mut all = Vec::new();
        for (idx, entry) in self.entries.iter_mut().enumerate() {
            all.extend_from_slice(entry.lines(width, spinner_frame));
            if idx < count - 1 {
                all.push(Line::from(""));
            }
        }
        all
    }
}

fn render_message(
    message: &Message,
    in_flight: bool,
    thinking_collapsed: bool,
    width: u16,
    spinner_frame: usize,
) -> Vec<Line<'static>> {
    match message.role {
        Role::User => prefixed_lines(&message.content, "> ", Theme::white(), width),
        Role::System => prefixed_lines(&message.content, "◆ ", Theme::muted(), width),
        Role::Assistant => {
            render_assistant(message, in_flight, thinking_collapsed, width, spinner_frame)
        }
    }
}

fn render_assistant(
    message: &Message,
    in_flight: bool,
    thinking_collapsed: bool,
    width: u16,
    spinner_frame: usize,
) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    if let Some(thinking) = message.thinking.as_ref().filter(|t| !t.is_empty()) {
        if thinking_collapsed {
            lines.push(Line::from(Span::styled(
                "  ⋯ thinking hidden (Ctrl+T)",
                Theme::muted(),
            )));
        } else {
            lines.extend(prefixed_lines(thinking, "  ", Theme::thinking(), width));
        }
    }

    if message.content.is_empty() {
        if in_flight {
            // Nothing streamed yet, show the waiting spinner.
            let frames = Spinners::BRAILLE;
            let frame = frames[spinner_frame % frames.len()];
            lines.push(Line::from(vec![
                Span::styled("● ", Theme::off_white()),
                Span::styled(frame.to_string(), Theme::primary()),
            ]));
        }
        return lines;
    }

    let mut content = prefixed_lines(&message.content, "● ", Theme::off_white(), width);
    if in_flight {
        if let Some(last) = content.last_mut() {
            last.spans.push(Span::styled("▊", Theme::primary()));
        }
    }
    lines.append(&mut content);
    lines
}

fn prefixed_lines(
    text: &str,
    prefix: &str,
    style: ratatui::style::Style,
    width: u16,
) -> Vec<Line<'static>> {
    let indent = " ".repeat(prefix.len());
    let available = (width as usize).saturating_sub(prefix.len() + 1).max(1);

    let wrapped = textwrap::wrap(text, available);
    wrapped
        .into_iter()
        .enumerate()
        .map(|(i, line)| {
            if i == 0 {
                Line::from(vec![
                    Span::styled(prefix.to_string(), style),
                    Span::styled(line.to_string(), style),
                ])
            } else {
                Line::from(Span::styled(format!("{indent}{line}"), style))
            }
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct ScrollState {
    position: usize,
    total_lines: usize,
    viewport_height: usize,
    manual_scroll: bool,
}

impl ScrollState {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            position: 0,
            total_lines: 0,
            viewport_height: 0,
            manual_scroll: false,
        }
    }

    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    #[must_use]
    pub const fn is_manual_scroll(&self) -> bool {
        self.manual_scroll
    }

    #[must_use]
    pub const fn is_at_bottom(&self) -> bool {
        if self.total_lines <= self.viewport_height {
            true
        } else {
            self.position >= self.max_scroll()
        }
    }

    pub fn update(&mut self, total_lines: usize, viewport_height: usize) {
        self.total_lines = total_lines;
        self.viewport_height = viewport_height;
        self.position = self.position.min(self.max_scroll());
    }

    pub const fn scroll_to_bottom(&mut self) {
        self.position = self.max_scroll();
        self.manual_scroll = false;
    }

    pub const fn scroll_to_top(&mut self) {
        self.position = 0;
        self.manual_scroll = true;
    }

    pub const fn scroll_up(&mut self, lines: usize) {
        self.position = self.position.saturating_sub(lines);
        self.manual_scroll = true;
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.position = (self.position + lines).min(self.max_scroll());
        self.manual_scroll = true;
    }

    pub const fn reset_manual_scroll(&mut self) {
        self.manual_scroll = false;
    }

    const fn max_scroll(&self) -> usize {
        self.total_lines.saturating_sub(self.viewport_height)
    }
}

impl Default for ScrollState {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ChatWidget<'a> {
    view: &'a mut TranscriptView,
    scroll: &'a mut ScrollState,
    spinner_frame: usize,
}

impl<'a> ChatWidget<'a> {
    #[must_use]
    pub const fn new(
        view: &'a mut TranscriptView,
        scroll: &'a mut ScrollState,
        spinner_frame: usize,
    ) -> Self {
        Self {
            view,
            scroll,
            spinner_frame,
        }
    }

    pub fn render(self, area: Rect, buf: &mut Buffer) {
        if self.view.is_empty() {
            Self::render_empty_state(area, buf);
            return;
        }

        let content_width = area.width.saturating_sub(4);
        let all_lines = self.view.lines(content_width, self.spinner_frame);

        let total_lines = all_lines.len();
        self.scroll.update(total_lines, area.height as usize);

        if !self.scroll.is_manual_scroll() {
            self.scroll.scroll_to_bottom();
        }

        let offset = self.scroll.position();
        let viewport_height = area.height as usize;
        let end = (offset + viewport_height).min(total_lines);

        for (i, line) in all_lines[offset..end].iter().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            buf.set_line(area.x + 2, area.y + i as u16, line, content_width);
        }

        if !self.scroll.is_at_bottom() {
            Self::render_scroll_indicator(area, buf);
        }
    }

    fn render_empty_state(area: Rect, buf: &mut Buffer) {
        let message = vec![
            Line::from(""),
            Line::from(Span::styled("mallama", Theme::primary_bold()))
                .alignment(Alignment::Center),
            Line::from(""),
            Line::from(Span::styled(
                "Type a message and press Enter to start chatting.",
                Theme::muted(),
            ))
            .alignment(Alignment::Center),
            Line::from(""),
            Line::from(Span::styled(
                "/ commands | Ctrl+C exit",
                Theme::muted(),
            ))
            .alignment(Alignment::Center),
        ];

        let block = Block::default().borders(Borders::NONE);
        Paragraph::new(message).block(block).render(area, buf);
    }

    fn render_scroll_indicator(area: Rect, buf: &mut Buffer) {
        let indicator_area = Rect {
            x: area.x + area.width - 10,
            y: area.y + area.height - 1,
            width: 10,
            height: 1,
        };

        let indicator = Line::from(Span::styled("↓ More", Theme::warning()));
        Paragraph::new(indicator).render(indicator_area, buf);
    }
}
