// Projection engine: raw payload + category filter -> display-ready rows.
//
// Two shapes are produced. The combined view lists every team with league
// (stage) points and rounded raw points; the category view lists the teams
// of one category with rounded total points and a per-rider breakdown.
// `project` is pure; the filter-change path relies on that to re-render from
// the cache without a network round trip.

use crate::model::{StandingsPayload, TeamId, TeamRow};

/// Shown when a team has no name.
pub const UNKNOWN_TEAM: &str = "Unknown Team";
/// Shown when a rider has no name.
pub const UNKNOWN_RIDER: &str = "Unknown";

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

/// The active category filter. `All` selects the combined view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    All,
    Category(String),
}

impl CategoryFilter {
    /// Build a filter from an optional label; `None` and the empty string
    /// both mean "all categories".
    pub fn from_label(label: Option<&str>) -> Self {
        match label {
            Some(l) if !l.is_empty() => CategoryFilter::Category(l.to_string()),
            _ => CategoryFilter::All,
        }
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            CategoryFilter::All => None,
            CategoryFilter::Category(l) => Some(l),
        }
    }

    /// Label used by filter selectors.
    pub fn display_name(&self) -> &str {
        self.label().unwrap_or("All Categories")
    }
}

// ---------------------------------------------------------------------------
// Projection types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ProjectionMode {
    Combined,
    Category { label: String },
}

/// Point columns for one row; the variant always matches the projection mode.
#[derive(Debug, Clone, PartialEq)]
pub enum PointColumns {
    /// League points are shown verbatim, raw points rounded.
    Combined { league_points: f64, raw_points: i64 },
    Category { points: i64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiderLine {
    pub name: String,
    pub points: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DisplayRow {
    pub team_id: TeamId,
    pub rank: u32,
    pub name: String,
    pub points: PointColumns,
    /// Always empty in combined mode.
    pub riders: Vec<RiderLine>,
}

impl DisplayRow {
    pub fn has_riders(&self) -> bool {
        !self.riders.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub mode: ProjectionMode,
    pub rows: Vec<DisplayRow>,
}

/// Why a projection has nothing to show. Never a fetch failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmptyState {
    NoTeamsForCategory(String),
    AwaitingRaceData,
}

impl EmptyState {
    pub fn message(&self) -> String {
        match self {
            EmptyState::NoTeamsForCategory(label) => {
                format!("No teams found for category {label}")
            }
            EmptyState::AwaitingRaceData => {
                "No team data available yet - waiting for race data...".to_string()
            }
        }
    }
}

impl Projection {
    /// `Some` when there are no rows to render.
    pub fn empty_state(&self) -> Option<EmptyState> {
        if !self.rows.is_empty() {
            return None;
        }
        Some(match &self.mode {
            ProjectionMode::Combined => EmptyState::AwaitingRaceData,
            ProjectionMode::Category { label } => EmptyState::NoTeamsForCategory(label.clone()),
        })
    }

    /// Column headers for the point columns of this mode.
    pub fn point_headers(&self) -> &'static [&'static str] {
        match self.mode {
            ProjectionMode::Combined => &["Stage Points", "Raw Points"],
            ProjectionMode::Category { .. } => &["Points"],
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Project a payload through a filter.
///
/// An unknown label and a category with no teams both yield an empty
/// category-mode projection (see [`Projection::empty_state`]).
pub fn project(payload: &StandingsPayload, filter: &CategoryFilter) -> Projection {
    match filter {
        CategoryFilter::All => Projection {
            mode: ProjectionMode::Combined,
            rows: payload
                .combined
                .iter()
                .enumerate()
                .map(|(i, team)| combined_row(i, team))
                .collect(),
        },
        CategoryFilter::Category(label) => {
            let rows = payload
                .category(label)
                .map(|cat| {
                    cat.teams
                        .iter()
                        .enumerate()
                        .map(|(i, team)| category_row(i, team))
                        .collect()
                })
                .unwrap_or_default();
            Projection {
                mode: ProjectionMode::Category {
                    label: label.clone(),
                },
                rows,
            }
        }
    }
}

/// Category labels in payload order, for filter selectors.
pub fn category_labels(payload: &StandingsPayload) -> Vec<String> {
    payload.categories.iter().map(|c| c.label.clone()).collect()
}

fn combined_row(index: usize, team: &TeamRow) -> DisplayRow {
    DisplayRow {
        team_id: team.team_id.clone(),
        rank: effective_rank(team.rank, index),
        name: team_name(team),
        points: PointColumns::Combined {
            league_points: team.league_points.unwrap_or(0.0),
            raw_points: round_points(team.raw_points.unwrap_or(0.0)),
        },
        riders: Vec::new(),
    }
}

fn category_row(index: usize, team: &TeamRow) -> DisplayRow {
    let riders = team
        .riders
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(|r| RiderLine {
            name: r
                .rider_name
                .clone()
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| UNKNOWN_RIDER.to_string()),
            points: round_points(r.points.unwrap_or(0.0)),
        })
        .collect();

    DisplayRow {
        team_id: team.team_id.clone(),
        rank: effective_rank(team.rank, index),
        name: team_name(team),
        points: PointColumns::Category {
            points: round_points(team.total_points.unwrap_or(0.0)),
        },
        riders,
    }
}

/// Provided rank, or the 1-based position in the sequence being projected.
/// A rank of 0 counts as missing.
fn effective_rank(rank: Option<u32>, index: usize) -> u32 {
    rank.filter(|&r| r > 0).unwrap_or(index as u32 + 1)
}

fn team_name(team: &TeamRow) -> String {
    team.team_name
        .clone()
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| UNKNOWN_TEAM.to_string())
}

/// Round half up (toward positive infinity), matching the scoring site.
pub fn round_points(value: f64) -> i64 {
    if !value.is_finite() {
        return 0;
    }
    (value + 0.5).floor() as i64
}

/// Format an unrounded point value: integral values print without a
/// fractional part.
pub fn format_points(value: f64) -> String {
    if value == 0.0 || !value.is_finite() {
        return "0".to_string();
    }
    value.to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
