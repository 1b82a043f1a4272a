use ratatui::layout::{Constraint, Layout, Rect};

pub struct LayoutAreas {
    pub header: Rect,
    pub chat: Rect,
    pub input: Rect,
    pub status: Rect,
}

/// Splits the screen into header, chat transcript, input box, and a one-line
/// status bar. The chat region absorbs whatever height is left over.
#[must_use]
pub fn calculate_layout(area: Rect) -> LayoutAreas {
    let [header, chat, input, status] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    LayoutAreas {
        header,
        chat,
        input,
        status,
    }
}
