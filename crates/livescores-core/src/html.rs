// HTML overlay fragments.
//
// Streaming overlays embed the standings as a browser source pointed at a
// file on disk. Every piece of server- or operator-supplied text goes through
// `escape_html` before it lands in markup.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::Path;

use crate::model::TeamId;
use crate::projection::{format_points, PointColumns, Projection};
use crate::settings::Settings;

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Standings table. Rider rows are emitted for every team that has riders
/// and start hidden unless the team id is in `expanded`. An empty projection
/// renders its empty-state message instead of a table.
pub fn render_projection(projection: &Projection, expanded: &HashSet<TeamId>) -> String {
    if let Some(empty) = projection.empty_state() {
        return render_message(&empty.message());
    }

    let headers = projection.point_headers();
    let mut html = String::from("<table class=\"teams-table\"><thead><tr><th>Rank</th><th>Team</th>");
    for header in headers {
        let _ = write!(html, "<th>{header}</th>");
    }
    html.push_str("</tr></thead><tbody>");

    for row in &projection.rows {
        let team_id = escape_html(&row.team_id.to_string());
        let _ = write!(
            html,
            "<tr class=\"team-row\" data-team-id=\"{team_id}\"><td class=\"rank\">{}</td><td class=\"team-name\">{}</td>",
            row.rank,
            escape_html(&row.name)
        );
        match &row.points {
            PointColumns::Combined {
                league_points,
                raw_points,
            } => {
                let _ = write!(
                    html,
                    "<td class=\"points\">{}</td><td class=\"points\">{raw_points}</td>",
                    format_points(*league_points)
                );
            }
            PointColumns::Category { points } => {
                let _ = write!(html, "<td class=\"points\">{points}</td>");
            }
        }
        html.push_str("</tr>");

        if row.has_riders() {
            let display = if expanded.contains(&row.team_id) {
                "table-row"
            } else {
                "none"
            };
            let _ = write!(
                html,
                "<tr class=\"riders-row\" style=\"display: {display};\"><td colspan=\"{}\"><div class=\"riders-list\">",
                headers.len() + 2
            );
            for rider in &row.riders {
                let _ = write!(
                    html,
                    "<div class=\"rider\">{}: {} pts</div>",
                    escape_html(&rider.name),
                    rider.points
                );
            }
            html.push_str("</div></td></tr>");
        }
    }

    html.push_str("</tbody></table>");
    html
}

/// Informational message (empty states, "not configured").
pub fn render_message(message: &str) -> String {
    format!("<p style=\"padding: 1em;\">{}</p>", escape_html(message))
}

/// Error region replacing the table.
pub fn render_error(message: &str) -> String {
    format!(
        "<p style=\"padding: 1em; color: #ff6b6b;\">Error: {}</p>",
        escape_html(message)
    )
}

/// Root font size, in em, at a font scale of 1.
pub const BASE_FONT_EM: f64 = 2.8;

/// Wrap a fragment in the overlay container, applying display settings.
pub fn render_overlay(fragment: &str, settings: &Settings) -> String {
    let mut style = format!(
        "font-size: {}em; line-height: {};",
        css_number(BASE_FONT_EM * settings.font_scale),
        css_number(settings.line_spacing)
    );
    if let Some((r, g, b)) = settings.solid_background_rgb() {
        let _ = write!(style, " background-color: #{r:02x}{g:02x}{b:02x};");
    }
    format!("<div class=\"team-live-scores\" style=\"{style}\">{fragment}</div>\n")
}

// Three decimals, so float noise such as 4.199999999999999 prints as 4.2.
fn css_number(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Replace the file at `path` with `html`. Written to a sibling temp file
/// first so a browser source polling the file never reads half a document.
pub fn write_overlay(path: &Path, html: &str) -> std::io::Result<()> {
    let tmp = path.with_extension("html.tmp");
    std::fs::write(&tmp, html)?;
    std::fs::rename(&tmp, path)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, RiderRow, StandingsPayload, TeamRow};
    use crate::projection::{project, CategoryFilter};

    fn payload() -> StandingsPayload {
        StandingsPayload {
            categories: vec![Category {
                label: "A".into(),
                teams: vec![TeamRow {
                    team_id: TeamId::Number(7),
                    team_name: Some("<b>Bold</b> & Co".into()),
                    total_points: Some(12.5),
                    riders: Some(vec![RiderRow {
                        rider_name: Some("O'Neil".into()),
                        points: Some(4.4),
                    }]),
                    ..TeamRow::default()
                }],
            }],
            combined: vec![TeamRow {
                team_id: TeamId::Text("x\"y".into()),
                team_name: Some("Combined".into()),
                league_points: Some(2.5),
                raw_points: Some(9.5),
                ..TeamRow::default()
            }],
        }
    }

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(
            escape_html(r#"<a href="x">&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#39;&lt;/a&gt;"
        );
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn combined_table_has_two_point_columns() {
        let proj = project(&payload(), &CategoryFilter::All);
        let html = render_projection(&proj, &HashSet::new());
        assert!(html.contains("<th>Stage Points</th><th>Raw Points</th>"));
        assert!(html.contains("<td class=\"points\">2.5</td><td class=\"points\">10</td>"));
        assert!(html.contains("data-team-id=\"x&quot;y\""));
        assert!(!html.contains("riders-row"));
    }

    #[test]
    fn category_table_escapes_names_and_hides_riders() {
        let proj = project(&payload(), &CategoryFilter::from_label(Some("A")));
        let html = render_projection(&proj, &HashSet::new());
        assert!(html.contains("<th>Points</th>"));
        assert!(html.contains("&lt;b&gt;Bold&lt;/b&gt; &amp; Co"));
        assert!(!html.contains("<b>Bold</b>"));
        assert!(html.contains("<td class=\"points\">13</td>"));
        assert!(html.contains("style=\"display: none;\""));
        assert!(html.contains("colspan=\"3\""));
        assert!(html.contains("O&#39;Neil: 4 pts"));
    }

    #[test]
    fn expanded_team_shows_riders() {
        let proj = project(&payload(), &CategoryFilter::from_label(Some("A")));
        let expanded: HashSet<TeamId> = [TeamId::Number(7)].into_iter().collect();
        let html = render_projection(&proj, &expanded);
        assert!(html.contains("style=\"display: table-row;\""));
    }

    #[test]
    fn empty_projection_renders_message() {
        let proj = project(&payload(), &CategoryFilter::from_label(Some("Nope")));
        assert_eq!(
            render_projection(&proj, &HashSet::new()),
            "<p style=\"padding: 1em;\">No teams found for category Nope</p>"
        );

        let proj = project(&StandingsPayload::default(), &CategoryFilter::All);
        assert!(render_projection(&proj, &HashSet::new())
            .contains("No team data available yet - waiting for race data..."));
    }

    #[test]
    fn error_text_is_escaped() {
        assert_eq!(
            render_error("<script>"),
            "<p style=\"padding: 1em; color: #ff6b6b;\">Error: &lt;script&gt;</p>"
        );
    }

    #[test]
    fn overlay_applies_display_settings() {
        let mut settings = Settings::default();
        let html = render_overlay("x", &settings);
        assert!(html.contains("font-size: 2.8em; line-height: 1;"));
        assert!(!html.contains("background-color"));

        settings.solid_background = true;
        settings.background_color = "#0A0B0C".into();
        settings.font_scale = 1.5;
        let html = render_overlay("x", &settings);
        assert!(html.contains("font-size: 4.2em;"));
        assert!(html.contains("background-color: #0a0b0c;"));
    }

    #[test]
    fn font_scale_multiplies_base_size() {
        let mut settings = Settings::default();
        settings.font_scale = 0.25;
        assert!(render_overlay("x", &settings).contains("font-size: 0.7em;"));
        settings.font_scale = 4.0;
        assert!(render_overlay("x", &settings).contains("font-size: 11.2em;"));
    }

    #[test]
    fn write_overlay_replaces_file() {
        let dir = std::env::temp_dir().join("livescores_html_write");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("standings.html");

        write_overlay(&path, "first").unwrap();
        write_overlay(&path, "second").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
        assert!(!path.with_extension("html.tmp").exists());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
