// Standings widget: the team table with expandable rider rows.
//
// Rank | Team | point column(s). In category view, teams with riders carry a
// disclosure marker and, when expanded, one indented row per rider beneath
// them. Messages, empty states and errors replace the table. All server text
// is passed through `sanitize` so it cannot inject terminal control
// sequences.

use std::collections::HashSet;

use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap};
use ratatui::Frame;

use livescores_core::model::TeamId;
use livescores_core::projection::{format_points, PointColumns, Projection};

use crate::tui::{Body, ViewState};

/// Render the standings panel into the given area.
pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let block = panel_block(state);

    let projection = match &state.body {
        Body::Pending => {
            render_text(frame, area, block, state.status.to_string(), Style::default());
            return;
        }
        Body::Message(message) => {
            render_text(frame, area, block, sanitize(message), Style::default());
            return;
        }
        Body::Error(message) => {
            render_text(
                frame,
                area,
                block,
                format!("Error: {}", sanitize(message)),
                Style::default().fg(Color::LightRed),
            );
            return;
        }
        Body::Standings(projection) => projection,
    };

    if let Some(empty) = projection.empty_state() {
        render_text(frame, area, block, sanitize(&empty.message()), Style::default());
        return;
    }

    let mut header_cells = vec![Cell::from("Rank"), Cell::from("Team")];
    header_cells.extend(projection.point_headers().iter().map(|h| Cell::from(*h)));
    let header = Row::new(header_cells).style(
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    );

    let height = row_height(state.display.line_spacing);
    let (rows, team_rows) = build_rows(projection, &state.expanded, height);

    let mut widths = vec![Constraint::Length(7), Constraint::Min(16)];
    widths.extend(
        projection
            .point_headers()
            .iter()
            .map(|_| Constraint::Length(13)),
    );

    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .row_highlight_style(Style::default().bg(Color::DarkGray));

    let mut table_state =
        TableState::default().with_selected(team_rows.get(state.selected).copied());
    frame.render_stateful_widget(table, area, &mut table_state);
}

fn panel_block(state: &ViewState) -> Block<'static> {
    let title = format!(" Team Standings: {} ", sanitize(state.filter.display_name()));
    let mut block = Block::default()
        .borders(Borders::ALL)
        .title(Line::from(title));
    if let Some((r, g, b)) = state.display.solid_background_rgb() {
        block = block.style(Style::default().bg(Color::Rgb(r, g, b)));
    }
    block
}

fn render_text(frame: &mut Frame, area: Rect, block: Block<'static>, text: String, style: Style) {
    let paragraph = Paragraph::new(text)
        .style(style)
        .wrap(Wrap { trim: true })
        .block(block);
    frame.render_widget(paragraph, area);
}

/// Table rows for a projection plus the visual index of each team row (rider
/// rows sit between them).
pub fn build_rows(
    projection: &Projection,
    expanded: &HashSet<TeamId>,
    height: u16,
) -> (Vec<Row<'static>>, Vec<usize>) {
    let mut rows = Vec::new();
    let mut team_rows = Vec::with_capacity(projection.rows.len());

    for row in &projection.rows {
        let open = expanded.contains(&row.team_id);
        let marker = match (row.has_riders(), open) {
            (false, _) => ' ',
            (true, false) => '▸',
            (true, true) => '▾',
        };

        let mut cells = vec![
            Cell::from(format!("{marker} {}", row.rank)),
            Cell::from(sanitize(&row.name)),
        ];
        match &row.points {
            PointColumns::Combined {
                league_points,
                raw_points,
            } => {
                cells.push(Cell::from(format_points(*league_points)));
                cells.push(Cell::from(raw_points.to_string()));
            }
            PointColumns::Category { points } => {
                cells.push(Cell::from(points.to_string()));
            }
        }

        team_rows.push(rows.len());
        rows.push(Row::new(cells).height(height));

        if open {
            for rider in &row.riders {
                rows.push(
                    Row::new(vec![
                        Cell::from(""),
                        Cell::from(format!("  {}", sanitize(&rider.name))),
                        Cell::from(format!("{} pts", rider.points)),
                    ])
                    .style(Style::default().fg(Color::Gray))
                    .height(height),
                );
            }
        }
    }

    (rows, team_rows)
}

/// Terminal rows per table row for a line-spacing preference.
pub fn row_height(line_spacing: f64) -> u16 {
    if !line_spacing.is_finite() {
        return 1;
    }
    line_spacing.round().clamp(1.0, 3.0) as u16
}

/// Replace control characters so server text cannot drive the terminal.
pub fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_control() { '\u{fffd}' } else { c })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
