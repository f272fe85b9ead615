// Status bar widget: refresh status, active category, last update time.

use chrono::{DateTime, Local};
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use livescores_core::status::Status;

use crate::tui::widgets::standings::sanitize;
use crate::tui::ViewState;

/// Render the status bar into the given area.
///
/// Layout: [status dot + text] | [category] | [last updated]
pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let color = status_color(state.status);
    let mut spans = vec![
        Span::styled(" \u{25cf} ", Style::default().fg(color)),
        Span::styled(state.status.to_string(), Style::default().fg(Color::White)),
        Span::styled(" | ", Style::default().fg(Color::Gray)),
        Span::styled(
            format!("Category: {}", sanitize(state.filter.display_name())),
            Style::default().fg(Color::White),
        ),
    ];

    if let Some(text) = last_updated_text(state.fetched_at) {
        spans.push(Span::styled(" | ", Style::default().fg(Color::Gray)));
        spans.push(Span::styled(text, Style::default().fg(Color::Gray)));
    }

    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
    frame.render_widget(paragraph, area);
}

pub fn status_color(status: Status) -> Color {
    match status {
        Status::Ready => Color::Green,
        Status::LoadingStandings | Status::FetchingData => Color::Yellow,
        Status::Error | Status::NotConfigured => Color::Red,
        Status::Initializing => Color::Gray,
    }
}

pub fn last_updated_text(fetched_at: Option<DateTime<Local>>) -> Option<String> {
    fetched_at.map(|t| format!("Updated {}", t.format("%H:%M:%S")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
