use std::time::{Duration, Instant};

use crate::tui::widgets::{ScrollState, TranscriptView};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerKind {
    Models,
    Conversations,
}

/// Modal list selector used for both model and conversation pickers.
pub struct ListPicker {
    pub kind: PickerKind,
    pub items: Vec<String>,
    pub selected: usize,
}

impl ListPicker {
    #[must_use]
    pub const fn new(kind: PickerKind, items: Vec<String>) -> Self {
        Self {
            kind,
            items,
            selected: 0,
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.items.len() {
            self.selected += 1;
        }
    }

    #[must_use]
    pub fn selected_item(&self) -> Option<&str> {
        self.items.get(self.selected).map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notice {
    pub text: String,
    pub level: NoticeLevel,
}

/// Recall buffer for submitted prompts. The cursor walks backwards from the
/// newest entry and resets whenever something new is pushed.
#[derive(Debug, Default)]
pub struct InputHistory {
    entries: Vec<String>,
    cursor: Option<usize>,
}

impl InputHistory {
    const CAP: usize = 100;

    pub fn push(&mut self, entry: String) {
        self.cursor = None;
        if entry.trim().is_empty() || self.entries.last() == Some(&entry) {
            return;
        }
        self.entries.push(entry);
        if self.entries.len() > Self::CAP {
            self.entries.remove(0);
        }
    }

    pub fn prev(&mut self) -> Option<&str> {
        let target = match self.cursor {
            None if self.entries.is_empty() => return None,
            None => self.entries.len() - 1,
            Some(i) => i.saturating_sub(1),
        };
        self.cursor = Some(target);
        self.entries.get(target).map(String::as_str)
    }

    pub fn next(&mut self) -> Option<&str> {
        let i = self.cursor?;
        if i + 1 < self.entries.len() {
            self.cursor = Some(i + 1);
            self.entries.get(i + 1).map(String::as_str)
        } else {
            self.cursor = None;
            None
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct AppState {
    pub should_quit: bool,
    pub is_generating: bool,
    pub request_start: Option<Instant>,
    pub history: InputHistory,
    pub view: TranscriptView,
    pub scroll: ScrollState,
    pub picker: Option<ListPicker>,
    pub notice: Option<Notice>,
}

impl AppState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            should_quit: false,
            is_generating: false,
            request_start: None,
            history: InputHistory::default(),
            view: TranscriptView::new(),
            scroll: ScrollState::new(),
            picker: None,
            notice: None,
        }
    }

    pub const fn quit(&mut self) {
        self.should_quit = true;
    }

    pub fn start_generating(&mut self) {
        self.is_generating = true;
        self.request_start = Some(Instant::now());
        self.notice = None;
    }

    pub const fn stop_generating(&mut self) {
        self.is_generating = false;
        self.request_start = None;
    }

    #[must_use]
    pub fn elapsed(&self) -> Option<Duration> {
        self.request_start.map(|start| start.elapsed())
    }

    /// Spinner frame derived from the request clock, so animation speed is
    /// independent of the redraw cadence.
    #[must_use]
    pub fn spinner_frame(&self) -> usize {
        self.elapsed()
            .map_or(0, |elapsed| (elapsed.as_millis() / 80) as usize)
    }

    pub fn notify(&mut self, text: impl Into<String>) {
        self.notice = Some(Notice {
            text: text.into(),
            level: NoticeLevel::Info,
        });
    }

    pub fn notify_error(&mut self, text: impl Into<String>) {
        self.notice = Some(Notice {
            text: text.into(),
            level: NoticeLevel::Error,
        });
    }

    #[must_use]
    pub const fn has_picker(&self) -> bool {
        self.picker.is_some()
    }

    pub fn show_picker(&mut self, kind: PickerKind, items: Vec<String>) {
        self.picker = Some(ListPicker::new(kind, items));
    }

    pub fn close_picker(&mut self) {
        self.picker = None;
    }

    pub const fn scroll_up(&mut self, lines: usize) {
        self.scroll.scroll_up(lines);
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll.scroll_down(lines);
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_creation() {
        let state = AppState::new();
        assert!(!state.should_quit);
        assert!(!state.is_generating);
        assert!(state.picker.is_none());
    }

    #[test]
    fn test_generating_lifecycle() {
        let mut state = AppState::new();
        state.start_generating();
        assert!(state.is_generating);
        assert!(state.elapsed().is_some());

        state.stop_generating();
        assert!(!state.is_generating);
        assert!(state.elapsed().is_none());
        assert_eq!(state.spinner_frame(), 0);
    }

    #[test]
    fn test_history_push_dedupes_and_skips_blank() {
        let mut history = InputHistory::default();
        history.push("first".to_string());
        history.push("  ".to_string());
        history.push("first".to_string());
        assert_eq!(history.len(), 1);

        history.push("second".to_string());
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_history_walks_back_and_forward() {
        let mut history = InputHistory::default();
        history.push("one".to_string());
        history.push("two".to_string());

        assert_eq!(history.prev(), Some("two"));
        assert_eq!(history.prev(), Some("one"));
        // Walking past the oldest entry stays there.
        assert_eq!(history.prev(), Some("one"));
        assert_eq!(history.next(), Some("two"));
        // Walking past the newest entry leaves recall mode.
        assert_eq!(history.next(), None);
        assert_eq!(history.prev(), Some("two"));
    }

    #[test]
    fn test_history_empty() {
        let mut history = InputHistory::default();
        assert_eq!(history.prev(), None);
        assert_eq!(history.next(), None);
    }

    #[test]
    fn test_history_cap() {
        let mut history = InputHistory::default();
        for i in 0..150 {
            history.push(format!("entry {i}"));
        }
        assert_eq!(history.len(), InputHistory::CAP);
        assert_eq!(history.prev(), Some("entry 149"));
    }

    #[test]
    fn test_push_resets_recall_cursor() {
        let mut history = InputHistory::default();
        history.push("one".to_string());
        history.push("two".to_string());
        assert_eq!(history.prev(), Some("two"));

        history.push("three".to_string());
        assert_eq!(history.prev(), Some("three"));
    }

    #[test]
    fn test_picker_navigation() {
        let mut picker =
            ListPicker::new(PickerKind::Models, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(picker.selected_item(), Some("a"));

        picker.select_next();
        assert_eq!(picker.selected_item(), Some("b"));
        picker.select_next();
        assert_eq!(picker.selected_item(), Some("b"));

        picker.select_prev();
        assert_eq!(picker.selected_item(), Some("a"));
    }
}
