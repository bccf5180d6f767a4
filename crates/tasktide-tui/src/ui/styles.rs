use ratatui::style::{Color, Modifier, Style};

use tasktide_core::models::Priority;
use tasktide_core::pomodoro::SessionType;

// Tide palette: deep water background, teal focus, seafoam breaks, coral accents
pub const TEAL: Color = Color::Rgb(38, 166, 154);
pub const SEAFOAM: Color = Color::Rgb(128, 203, 172);
pub const CORAL: Color = Color::Rgb(240, 128, 96);
pub const SAND: Color = Color::Rgb(230, 200, 140);
pub const ERROR: Color = Color::Rgb(220, 80, 80);
pub const MUTED: Color = Color::Rgb(112, 128, 140);
pub const DEEP_WATER: Color = Color::Rgb(16, 40, 52);
pub const SHALLOWS: Color = Color::Rgb(28, 64, 76);

// Styles
pub fn title_style() -> Style {
    Style::default().fg(TEAL).add_modifier(Modifier::BOLD)
}

pub fn selected_style() -> Style {
    Style::default()
        .bg(SHALLOWS)
        .add_modifier(Modifier::BOLD)
}

pub fn list_item_style() -> Style {
    Style::default().fg(Color::White)
}

pub fn muted_style() -> Style {
    Style::default().fg(MUTED)
}

pub fn highlight_style() -> Style {
    Style::default().fg(CORAL)
}

pub fn success_style() -> Style {
    Style::default().fg(SEAFOAM)
}

pub fn error_style() -> Style {
    Style::default().fg(ERROR)
}

pub fn tab_style(selected: bool) -> Style {
    if selected {
        Style::default()
            .fg(TEAL)
            .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
    } else {
        Style::default().fg(Color::White)
    }
}

pub fn border_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(TEAL)
    } else {
        Style::default().fg(MUTED)
    }
}

pub fn search_style() -> Style {
    Style::default().fg(SAND)
}

pub fn status_bar_style() -> Style {
    Style::default().bg(DEEP_WATER).fg(Color::White)
}

pub fn help_key_style() -> Style {
    Style::default()
        .fg(SAND)
        .add_modifier(Modifier::BOLD)
}

pub fn help_desc_style() -> Style {
    Style::default().fg(Color::White)
}

/// Focus sessions in the primary color, breaks in green.
pub fn session_style(session: SessionType) -> Style {
    let color = if session.is_break() { SEAFOAM } else { TEAL };
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

pub fn priority_style(priority: Priority) -> Style {
    match priority {
        Priority::High => highlight_style(),
        Priority::Medium => Style::default().fg(SAND),
        Priority::Low => muted_style(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breaks_and_focus_are_distinguishable() {
        assert_ne!(
            session_style(SessionType::Work),
            session_style(SessionType::ShortBreak)
        );
        assert_eq!(
            session_style(SessionType::ShortBreak),
            session_style(SessionType::LongBreak)
        );
    }

    #[test]
    fn test_priorities_have_distinct_colors() {
        let styles = [
            priority_style(Priority::Low),
            priority_style(Priority::Medium),
            priority_style(Priority::High),
        ];
        assert_ne!(styles[0], styles[1]);
        assert_ne!(styles[1], styles[2]);
        assert_ne!(styles[0], styles[2]);
    }
}
