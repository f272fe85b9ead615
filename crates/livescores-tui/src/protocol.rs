// Messages between the app loop and the terminal presenter.

use chrono::{DateTime, Local};
use livescores_core::projection::{CategoryFilter, Projection};
use livescores_core::settings::Settings;
use livescores_core::status::Status;

/// App loop -> TUI.
#[derive(Debug, Clone, PartialEq)]
pub enum UiUpdate {
    Status(Status),
    /// A fresh projection of the cache, replacing whatever the body showed.
    Standings {
        projection: Box<Projection>,
        fetched_at: Option<DateTime<Local>>,
    },
    /// Informational body text (e.g. "not configured").
    Message(String),
    /// Error body text; replaces the table until the next success.
    Error(String),
    /// Category labels of the cached payload, in payload order.
    Categories(Vec<String>),
    Filter(CategoryFilter),
    Display(Box<Settings>),
}

/// TUI -> app loop.
#[derive(Debug, Clone, PartialEq)]
pub enum UserCommand {
    SetFilter(CategoryFilter),
    Refresh,
    Quit,
}
