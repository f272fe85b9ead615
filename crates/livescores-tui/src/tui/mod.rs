// TUI dashboard: layout, input handling, and widget rendering.
//
// The TUI owns a `ViewState` that mirrors what the app orchestrator last
// pushed. The orchestrator sends `UiUpdate` messages over an mpsc channel;
// the TUI applies them to `ViewState` and re-renders on a fixed tick. Row
// selection and rider expansion are presenter-local and never reach the app.

pub mod input;
pub mod layout;
pub mod widgets;

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Local};
use crossterm::event::{Event, EventStream};
use futures_util::StreamExt;
use ratatui::Frame;
use tokio::sync::mpsc;

use livescores_core::model::TeamId;
use livescores_core::projection::{CategoryFilter, Projection};
use livescores_core::settings::Settings;
use livescores_core::status::Status;

use crate::protocol::{UiUpdate, UserCommand};
use layout::build_layout;

// ---------------------------------------------------------------------------
// ViewState
// ---------------------------------------------------------------------------

/// What the main panel shows.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Body {
    /// Nothing received yet.
    #[default]
    Pending,
    Standings(Projection),
    Message(String),
    Error(String),
}

/// TUI-local state, updated incrementally via `UiUpdate` messages.
#[derive(Debug, Default)]
pub struct ViewState {
    pub status: Status,
    pub body: Body,
    pub fetched_at: Option<DateTime<Local>>,
    /// Category labels available for cycling, in payload order.
    pub categories: Vec<String>,
    pub filter: CategoryFilter,
    /// Teams whose rider breakdown is open. Survives re-renders of the same
    /// category; cleared when the category changes.
    pub expanded: HashSet<TeamId>,
    /// Index of the highlighted team row.
    pub selected: usize,
    pub display: Settings,
}

impl ViewState {
    /// The projection on screen, if the body is a table.
    pub fn projection(&self) -> Option<&Projection> {
        match &self.body {
            Body::Standings(p) => Some(p),
            _ => None,
        }
    }

    fn row_count(&self) -> usize {
        self.projection().map_or(0, |p| p.rows.len())
    }

    /// Change the category locally. Expansion and selection reset because
    /// they refer to the rows of the previous category.
    pub fn set_filter(&mut self, filter: CategoryFilter) {
        if self.filter != filter {
            self.expanded.clear();
            self.selected = 0;
        }
        self.filter = filter;
    }

    pub fn toggle_selected(&mut self) {
        let Some(row) = self.projection().and_then(|p| p.rows.get(self.selected)) else {
            return;
        };
        if !row.has_riders() {
            return;
        }
        let id = row.team_id.clone();
        if !self.expanded.remove(&id) {
            self.expanded.insert(id);
        }
    }

    pub fn select_next(&mut self) {
        let count = self.row_count();
        if count > 0 {
            self.selected = (self.selected + 1).min(count - 1);
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }
}

// ---------------------------------------------------------------------------
// UiUpdate processing
// ---------------------------------------------------------------------------

/// Apply a single UiUpdate to the ViewState.
pub fn apply_ui_update(state: &mut ViewState, update: UiUpdate) {
    match update {
        UiUpdate::Status(status) => {
            state.status = status;
        }
        UiUpdate::Standings {
            projection,
            fetched_at,
        } => {
            // Keep rider breakdowns open for teams still on screen.
            let present: HashSet<&TeamId> = projection.rows.iter().map(|r| &r.team_id).collect();
            state.expanded.retain(|id| present.contains(id));
            state.selected = state
                .selected
                .min(projection.rows.len().saturating_sub(1));
            state.body = Body::Standings(*projection);
            state.fetched_at = fetched_at;
        }
        UiUpdate::Message(message) => {
            state.body = Body::Message(message);
        }
        UiUpdate::Error(message) => {
            state.body = Body::Error(message);
        }
        UiUpdate::Categories(categories) => {
            state.categories = categories;
        }
        UiUpdate::Filter(filter) => {
            state.set_filter(filter);
        }
        UiUpdate::Display(settings) => {
            state.display = *settings;
        }
    }
}

// ---------------------------------------------------------------------------
// Render frame
// ---------------------------------------------------------------------------

/// Render the complete dashboard frame.
pub fn render_frame(frame: &mut Frame, state: &ViewState) {
    let layout = build_layout(frame.area());

    widgets::status_bar::render(frame, layout.status_bar, state);
    widgets::standings::render(frame, layout.main_panel, state);
    widgets::help_bar::render(frame, layout.help_bar);
}

// ---------------------------------------------------------------------------
// Main TUI loop
// ---------------------------------------------------------------------------

/// Run the TUI event loop.
///
/// Initializes the terminal, installs a panic hook that restores it, then
/// selects over UI updates, keyboard input and render ticks until the user
/// quits or the app closes the update channel.
pub async fn run(
    mut ui_rx: mpsc::Receiver<UiUpdate>,
    cmd_tx: mpsc::Sender<UserCommand>,
    tick_rate: Duration,
) -> anyhow::Result<()> {
    let mut terminal = ratatui::init();

    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        ratatui::restore();
        original_hook(panic_info);
    }));

    let mut view_state = ViewState::default();
    let mut event_stream = EventStream::new();

    let mut render_tick = tokio::time::interval(tick_rate);
    render_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let result = loop {
        tokio::select! {
            // UI updates from the app orchestrator
            update = ui_rx.recv() => {
                match update {
                    Some(ui_update) => apply_ui_update(&mut view_state, ui_update),
                    // Channel closed: app is shutting down
                    None => break Ok(()),
                }
            }

            // Keyboard input
            maybe_event = event_stream.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key_event))) => {
                        if let Some(cmd) = input::handle_key(key_event, &mut view_state) {
                            let quit = cmd == UserCommand::Quit;
                            let _ = cmd_tx.send(cmd).await;
                            if quit {
                                break Ok(());
                            }
                        }
                    }
                    // Resize and mouse events are picked up by the next draw.
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break Err(anyhow::Error::new(e).context("terminal input error")),
                    None => break Ok(()),
                }
            }

            // Render tick
            _ = render_tick.tick() => {
                if let Err(e) = terminal.draw(|frame| render_frame(frame, &view_state)) {
                    break Err(anyhow::Error::new(e).context("failed to draw frame"));
                }
            }
        }
    };

    ratatui::restore();
    result
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
