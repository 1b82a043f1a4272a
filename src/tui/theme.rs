use ratatui::style::{Color, Modifier, Style};

pub struct Palette;

impl Palette {
    pub const TEAL: Color = Color::Rgb(45, 212, 191);
    pub const VIOLET: Color = Color::Rgb(139, 92, 246);
    pub const GREEN: Color = Color::Rgb(34, 197, 94);
    pub const AMBER: Color = Color::Rgb(251, 191, 36);
    pub const RED: Color = Color::Rgb(248, 113, 113);
    pub const GRAY: Color = Color::Rgb(115, 115, 115);
    pub const DARK_GRAY: Color = Color::Rgb(64, 64, 64);
    pub const WHITE: Color = Color::Rgb(250, 250, 250);
    pub const OFF_WHITE: Color = Color::Rgb(190, 190, 190);
}

pub struct Spinners;

impl Spinners {
    pub const BRAILLE: &'static [&'static str] =
        &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
}

pub struct Theme;

impl Theme {
    #[must_use]
    pub const fn primary() -> Style {
        Style::new().fg(Palette::TEAL)
    }

    #[must_use]
    pub const fn accent() -> Style {
        Style::new().fg(Palette::VIOLET)
    }

    #[must_use]
    pub const fn success() -> Style {
        Style::new().fg(Palette::GREEN)
    }

    #[must_use]
    pub const fn warning() -> Style {
        Style::new().fg(Palette::AMBER)
    }

    #[must_use]
    pub const fn error() -> Style {
        Style::new().fg(Palette::RED)
    }

    #[must_use]
    pub const fn muted() -> Style {
        Style::new().fg(Palette::GRAY)
    }

    #[must_use]
    pub const fn border() -> Style {
        Style::new().fg(Palette::DARK_GRAY)
    }

    #[must_use]
    pub const fn white() -> Style {
        Style::new().fg(Palette::WHITE)
    }

    #[must_use]
    pub const fn off_white() -> Style {
        Style::new().fg(Palette::OFF_WHITE)
    }

    #[must_use]
    pub const fn thinking() -> Style {
        Style::new()
            .fg(Palette::GRAY)
            .add_modifier(Modifier::ITALIC)
    }

    #[must_use]
    pub const fn primary_bold() -> Style {
        Style::new()
            .fg(Palette::TEAL)
            .add_modifier(Modifier::BOLD)
    }
}
