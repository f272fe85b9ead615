// Help bar: keyboard shortcut hints.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

pub const HELP_TEXT: &str =
    " q:Quit | Tab/c:Category | a:All | \u{2191}\u{2193}:Select | Enter:Riders | r:Refresh";

pub fn render(frame: &mut Frame, area: Rect) {
    let paragraph = Paragraph::new(Line::from(vec![Span::styled(
        HELP_TEXT,
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::DIM),
    )]))
    .style(Style::default().bg(Color::DarkGray));
    frame.render_widget(paragraph, area);
}
