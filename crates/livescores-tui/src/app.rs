// Application orchestrator.
//
// Owns the refresh pipeline handles and turns refresh events and user
// commands into `UiUpdate`s for the terminal presenter (and, when enabled,
// the HTML overlay file). Every render reads the cache; nothing here waits on
// a fetch to draw.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use livescores_core::cache::StandingsCache;
use livescores_core::html;
use livescores_core::projection::{category_labels, CategoryFilter};
use livescores_core::refresh::{
    CycleKind, RefreshError, RefreshEvent, Refresher, NOT_CONFIGURED_MESSAGE,
};
use livescores_core::scheduler::RefreshScheduler;
use livescores_core::settings::{Settings, SettingsRepository};
use livescores_core::status::Status;

use crate::protocol::{UiUpdate, UserCommand};

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

pub struct AppState {
    pub cache: Arc<StandingsCache>,
    pub refresher: Arc<Refresher>,
    pub scheduler: RefreshScheduler,
    pub settings: SettingsRepository,
    /// Display preferences, loaded once at startup.
    pub display: Settings,
    pub status: Status,
    /// Last status that was not a fetch in progress; restored when an
    /// in-flight cycle turns out to be superseded.
    pub settled: Status,
    pub refresh_interval: Duration,
    /// Where to mirror the standings as an HTML fragment, if anywhere.
    pub html_out: Option<PathBuf>,
}

impl AppState {
    pub fn new(
        refresher: Arc<Refresher>,
        settings: SettingsRepository,
        display: Settings,
        refresh_interval: Duration,
        html_out: Option<PathBuf>,
    ) -> Self {
        AppState {
            cache: Arc::clone(refresher.cache()),
            scheduler: RefreshScheduler::new(Arc::clone(&refresher)),
            refresher,
            settings,
            display,
            status: Status::Initializing,
            settled: Status::Initializing,
            refresh_interval,
            html_out,
        }
    }

    async fn set_status(&mut self, status: Status, ui_tx: &mpsc::Sender<UiUpdate>) {
        if self.status != status {
            debug!("Status: {} -> {}", self.status, status);
        }
        self.status = status;
        if !status.is_in_progress() {
            self.settled = status;
        }
        let _ = ui_tx.send(UiUpdate::Status(status)).await;
    }

    /// Project the cache and push it to the presenters. Returns false when
    /// nothing has been fetched yet.
    pub async fn render_from_cache(&mut self, ui_tx: &mpsc::Sender<UiUpdate>) -> bool {
        let snapshot = self.cache.current();
        let (Some(payload), Some(projection)) = (snapshot.payload.clone(), snapshot.projection())
        else {
            return false;
        };

        let _ = ui_tx
            .send(UiUpdate::Categories(category_labels(&payload)))
            .await;
        self.write_html(&html::render_projection(&projection, &HashSet::new()));
        let _ = ui_tx
            .send(UiUpdate::Standings {
                projection: Box::new(projection),
                fetched_at: snapshot.fetched_at,
            })
            .await;
        true
    }

    /// React to one refresh pipeline event.
    pub async fn handle_refresh_event(
        &mut self,
        event: RefreshEvent,
        ui_tx: &mpsc::Sender<UiUpdate>,
    ) {
        match event {
            RefreshEvent::Started { kind, .. } => {
                let status = match kind {
                    CycleKind::Initial => Status::LoadingStandings,
                    CycleKind::Scheduled => Status::FetchingData,
                };
                self.set_status(status, ui_tx).await;
            }
            RefreshEvent::Updated { generation } => {
                debug!("Rendering generation {}", generation);
                self.render_from_cache(ui_tx).await;
                self.set_status(Status::Ready, ui_tx).await;
                // A manual refresh after configuring the password starts the
                // timer that startup skipped.
                if !self.scheduler.is_running() {
                    self.scheduler.start(self.refresh_interval);
                }
            }
            RefreshEvent::Failed { message, .. } => {
                self.write_html(&html::render_error(&message));
                let _ = ui_tx.send(UiUpdate::Error(message)).await;
                self.set_status(Status::Error, ui_tx).await;
            }
            RefreshEvent::Superseded { generation } => {
                debug!("Generation {} superseded", generation);
                if self.status.is_in_progress() {
                    self.set_status(self.settled, ui_tx).await;
                }
            }
            RefreshEvent::NotConfigured => {
                self.write_html(&html::render_message(NOT_CONFIGURED_MESSAGE));
                let _ = ui_tx
                    .send(UiUpdate::Message(NOT_CONFIGURED_MESSAGE.to_string()))
                    .await;
                self.set_status(Status::NotConfigured, ui_tx).await;
            }
        }
    }

    /// Switch category: persist it, then re-project the cached payload. No
    /// network request is made.
    pub async fn handle_filter_change(
        &mut self,
        filter: CategoryFilter,
        ui_tx: &mpsc::Sender<UiUpdate>,
    ) {
        info!("Category filter: {}", filter.display_name());
        self.cache.set_filter(filter.clone());
        if let Err(e) = self.settings.save_selected_category(&filter) {
            warn!("Failed to persist selected category: {}", e);
        }
        let _ = ui_tx.send(UiUpdate::Filter(filter)).await;
        self.render_from_cache(ui_tx).await;
    }

    /// Start the recurring timer once the startup load has finished, unless
    /// no password is configured.
    pub fn on_initial_load(&mut self, result: Result<(), RefreshError>) {
        match result {
            Err(RefreshError::NotConfigured) => {
                info!("No access password; recurring refresh not scheduled");
            }
            other => {
                if let Err(e) = other {
                    info!("Initial load failed ({}); retrying on schedule", e);
                }
                if !self.scheduler.is_running() {
                    self.scheduler.start(self.refresh_interval);
                }
            }
        }
    }

    fn spawn_cycle(&self) {
        let refresher = Arc::clone(&self.refresher);
        tokio::spawn(async move {
            let _ = refresher.run_cycle().await;
        });
    }

    fn write_html(&self, fragment: &str) {
        let Some(path) = &self.html_out else {
            return;
        };
        let document = html::render_overlay(fragment, &self.display);
        if let Err(e) = html::write_overlay(path, &document) {
            warn!("Failed to write HTML overlay to {}: {}", path.display(), e);
        }
    }
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

/// Run the application event loop until the user quits.
///
/// The initial load runs on its own task so the loop stays responsive; the
/// recurring timer starts when it completes.
pub async fn run(
    mut refresh_rx: mpsc::Receiver<RefreshEvent>,
    mut cmd_rx: mpsc::Receiver<UserCommand>,
    ui_tx: mpsc::Sender<UiUpdate>,
    mut state: AppState,
) -> anyhow::Result<()> {
    info!("Application event loop started");

    let _ = ui_tx
        .send(UiUpdate::Display(Box::new(state.display.clone())))
        .await;
    let _ = ui_tx
        .send(UiUpdate::Filter(state.cache.current().filter))
        .await;
    let _ = ui_tx.send(UiUpdate::Status(state.status)).await;

    let mut initial = {
        let refresher = Arc::clone(&state.refresher);
        tokio::spawn(async move { refresher.initial_load().await })
    };
    let mut initial_done = false;

    loop {
        tokio::select! {
            // --- Startup load ---
            result = &mut initial, if !initial_done => {
                initial_done = true;
                match result {
                    Ok(result) => state.on_initial_load(result),
                    Err(e) => {
                        warn!("Initial load task failed: {}", e);
                        state.scheduler.start(state.refresh_interval);
                    }
                }
            }

            // --- Refresh pipeline ---
            event = refresh_rx.recv() => {
                match event {
                    Some(event) => state.handle_refresh_event(event, &ui_tx).await,
                    None => {
                        info!("Refresh channel closed, shutting down");
                        break;
                    }
                }
            }

            // --- User commands ---
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UserCommand::Quit) => {
                        info!("Quit command received, shutting down");
                        break;
                    }
                    Some(UserCommand::SetFilter(filter)) => {
                        state.handle_filter_change(filter, &ui_tx).await;
                    }
                    Some(UserCommand::Refresh) => {
                        info!("Manual refresh requested");
                        state.spawn_cycle();
                    }
                    None => {
                        info!("Command channel closed, shutting down");
                        break;
                    }
                }
            }
        }
    }

    // Cleanup
    if !initial_done {
        initial.abort();
    }
    state.scheduler.stop();
    info!("Application event loop exiting");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use livescores_core::client::{FetchError, StandingsClient};
    use livescores_core::model::{Category, StandingsPayload, TeamId, TeamRow};
    use livescores_core::projection::ProjectionMode;
    use livescores_core::store::MemoryStore;
    use livescores_core::transport::{Transport, TransportError, TransportResponse};

    struct NoNetwork;

    #[async_trait::async_trait]
    impl Transport for NoNetwork {
        async fn get(
            &self,
            _url: &str,
            _headers: &[(&str, &str)],
        ) -> Result<TransportResponse, TransportError> {
            Err(TransportError::new("offline"))
        }
    }

    fn create_test_app_state() -> (AppState, mpsc::Receiver<RefreshEvent>) {
        let settings = SettingsRepository::new(Arc::new(MemoryStore::new()));
        let (tx, rx) = mpsc::channel(16);
        let refresher = Arc::new(Refresher::new(
            StandingsClient::new(Arc::new(NoNetwork), "http://t"),
            Arc::new(StandingsCache::default()),
            settings.clone(),
            tx,
        ));
        let state = AppState::new(
            refresher,
            settings,
            Settings::default(),
            Duration::from_secs(30),
            None,
        );
        (state, rx)
    }

    fn payload() -> StandingsPayload {
        StandingsPayload {
            categories: vec![Category {
                label: "A".into(),
                teams: vec![TeamRow {
                    team_id: TeamId::Number(2),
                    team_name: Some("Alpha".into()),
                    ..TeamRow::default()
                }],
            }],
            combined: vec![TeamRow {
                team_id: TeamId::Number(1),
                team_name: Some("Everyone".into()),
                ..TeamRow::default()
            }],
        }
    }

    fn drain(rx: &mut mpsc::Receiver<UiUpdate>) -> Vec<UiUpdate> {
        let mut out = Vec::new();
        while let Ok(u) = rx.try_recv() {
            out.push(u);
        }
        out
    }

    #[tokio::test]
    async fn render_without_payload_sends_nothing() {
        let (mut state, _rx) = create_test_app_state();
        let (ui_tx, mut ui_rx) = mpsc::channel(16);
        assert!(!state.render_from_cache(&ui_tx).await);
        assert!(drain(&mut ui_rx).is_empty());
    }

    #[tokio::test]
    async fn updated_event_renders_and_marks_ready() {
        let (mut state, _rx) = create_test_app_state();
        let (ui_tx, mut ui_rx) = mpsc::channel(16);
        state.cache.apply(1, payload());

        state
            .handle_refresh_event(RefreshEvent::Updated { generation: 1 }, &ui_tx)
            .await;

        let updates = drain(&mut ui_rx);
        assert!(updates.contains(&UiUpdate::Categories(vec!["A".into()])));
        assert!(updates.iter().any(|u| matches!(
            u,
            UiUpdate::Standings { projection, .. } if projection.mode == ProjectionMode::Combined
        )));
        assert_eq!(updates.last(), Some(&UiUpdate::Status(Status::Ready)));
        assert_eq!(state.status, Status::Ready);
        assert!(state.scheduler.is_running());
    }

    #[tokio::test]
    async fn failure_shows_error_and_keeps_cache() {
        let (mut state, _rx) = create_test_app_state();
        let (ui_tx, mut ui_rx) = mpsc::channel(16);
        state.cache.apply(1, payload());

        let message = FetchError::RateLimited { message: None }.to_string();
        state
            .handle_refresh_event(
                RefreshEvent::Failed {
                    generation: 2,
                    message: message.clone(),
                },
                &ui_tx,
            )
            .await;

        let updates = drain(&mut ui_rx);
        assert_eq!(
            updates,
            vec![UiUpdate::Error(message), UiUpdate::Status(Status::Error)]
        );
        assert!(state.cache.has_payload());
    }

    #[tokio::test]
    async fn started_event_status_depends_on_kind() {
        let (mut state, _rx) = create_test_app_state();
        let (ui_tx, mut ui_rx) = mpsc::channel(16);

        state
            .handle_refresh_event(
                RefreshEvent::Started {
                    generation: 1,
                    kind: CycleKind::Initial,
                },
                &ui_tx,
            )
            .await;
        state
            .handle_refresh_event(
                RefreshEvent::Started {
                    generation: 2,
                    kind: CycleKind::Scheduled,
                },
                &ui_tx,
            )
            .await;

        assert_eq!(
            drain(&mut ui_rx),
            vec![
                UiUpdate::Status(Status::LoadingStandings),
                UiUpdate::Status(Status::FetchingData)
            ]
        );
    }

    #[tokio::test]
    async fn late_started_cycle_that_is_superseded_restores_ready() {
        let (mut state, _rx) = create_test_app_state();
        let (ui_tx, mut ui_rx) = mpsc::channel(16);
        state.cache.apply(2, payload());

        state
            .handle_refresh_event(RefreshEvent::Updated { generation: 2 }, &ui_tx)
            .await;
        state
            .handle_refresh_event(
                RefreshEvent::Started {
                    generation: 1,
                    kind: CycleKind::Scheduled,
                },
                &ui_tx,
            )
            .await;
        assert_eq!(state.status, Status::FetchingData);
        drain(&mut ui_rx);

        state
            .handle_refresh_event(RefreshEvent::Superseded { generation: 1 }, &ui_tx)
            .await;
        assert_eq!(drain(&mut ui_rx), vec![UiUpdate::Status(Status::Ready)]);
        assert_eq!(state.status, Status::Ready);
    }

    #[tokio::test]
    async fn superseded_leaves_settled_status_alone() {
        let (mut state, _rx) = create_test_app_state();
        let (ui_tx, mut ui_rx) = mpsc::channel(16);
        state
            .handle_refresh_event(
                RefreshEvent::Failed {
                    generation: 3,
                    message: "Server error: 500".into(),
                },
                &ui_tx,
            )
            .await;
        drain(&mut ui_rx);

        state
            .handle_refresh_event(RefreshEvent::Superseded { generation: 1 }, &ui_tx)
            .await;
        assert!(drain(&mut ui_rx).is_empty());
        assert_eq!(state.status, Status::Error);
    }

    #[tokio::test]
    async fn not_configured_shows_instructions() {
        let (mut state, _rx) = create_test_app_state();
        let (ui_tx, mut ui_rx) = mpsc::channel(16);
        state
            .handle_refresh_event(RefreshEvent::NotConfigured, &ui_tx)
            .await;
        assert_eq!(
            drain(&mut ui_rx),
            vec![
                UiUpdate::Message(NOT_CONFIGURED_MESSAGE.into()),
                UiUpdate::Status(Status::NotConfigured)
            ]
        );
    }

    #[tokio::test]
    async fn filter_change_reprojects_and_persists() {
        let (mut state, _rx) = create_test_app_state();
        let (ui_tx, mut ui_rx) = mpsc::channel(16);
        state.cache.apply(1, payload());

        let filter = CategoryFilter::from_label(Some("A"));
        state.handle_filter_change(filter.clone(), &ui_tx).await;

        let updates = drain(&mut ui_rx);
        assert_eq!(updates[0], UiUpdate::Filter(filter.clone()));
        let standings = updates.iter().find_map(|u| match u {
            UiUpdate::Standings { projection, .. } => Some(projection),
            _ => None,
        });
        assert_eq!(standings.unwrap().rows[0].name, "Alpha");
        assert_eq!(state.settings.selected_category().unwrap(), filter);
    }

    #[tokio::test]
    async fn initial_load_not_configured_skips_scheduler() {
        let (mut state, _rx) = create_test_app_state();
        state.on_initial_load(Err(RefreshError::NotConfigured));
        assert!(!state.scheduler.is_running());

        state.on_initial_load(Err(RefreshError::Fetch(FetchError::NetworkError(
            "down".into(),
        ))));
        assert!(state.scheduler.is_running());
        state.scheduler.stop();
    }
}
