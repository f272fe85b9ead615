// Screen layout: panel arrangement and sizing.
//
// +--------------------------------------------------+
// | Status Bar (1 row)                                |
// +--------------------------------------------------+
// | Standings (fill)                                  |
// |                                                   |
// +--------------------------------------------------+
// | Help Bar (1 row)                                  |
// +--------------------------------------------------+

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Resolved screen areas for each dashboard zone.
#[derive(Debug, Clone)]
pub struct AppLayout {
    /// Top row: status, active category, last update time.
    pub status_bar: Rect,
    /// Standings table, or the message/error replacing it.
    pub main_panel: Rect,
    /// Bottom row: keyboard shortcut hints.
    pub help_bar: Rect,
}

pub fn build_layout(area: Rect) -> AppLayout {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // status bar
            Constraint::Min(3),    // standings
            Constraint::Length(1), // help bar
        ])
        .split(area);

    AppLayout {
        status_bar: vertical[0],
        main_panel: vertical[1],
        help_bar: vertical[2],
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
