// One fetch-and-cache cycle.
//
// Each cycle re-reads the access token, so a password saved through the
// settings surface takes effect on the next tick. Every cycle takes a fresh
// generation number; results from a cycle older than the payload already in
// the cache are dropped, both successes (by `StandingsCache::apply`) and
// failures (here), so a slow request can never overwrite newer data or paint
// an error over it. A dropped result is still reported as `Superseded` so the
// status line does not stay on the cycle's progress text.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cache::StandingsCache;
use crate::client::{FetchError, StandingsClient};
use crate::settings::{SettingsError, SettingsRepository};

/// Shown when no access token is configured.
pub const NOT_CONFIGURED_MESSAGE: &str = "Please configure your access password in settings";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleKind {
    /// The one-off load at startup.
    Initial,
    /// Timer ticks and manual refreshes.
    Scheduled,
}

/// Progress reported to the application loop.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshEvent {
    Started { generation: u64, kind: CycleKind },
    /// The cache now holds this cycle's payload.
    Updated { generation: u64 },
    /// Transient failure; the cache is unchanged.
    Failed { generation: u64, message: String },
    /// The cycle finished after a newer payload was cached; its result was
    /// dropped.
    Superseded { generation: u64 },
    NotConfigured,
}

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("Please configure your access password in settings")]
    NotConfigured,

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("failed to read settings: {0}")]
    Settings(#[from] SettingsError),
}

pub struct Refresher {
    client: StandingsClient,
    cache: Arc<StandingsCache>,
    settings: SettingsRepository,
    events: mpsc::Sender<RefreshEvent>,
    generation: AtomicU64,
}

impl Refresher {
    pub fn new(
        client: StandingsClient,
        cache: Arc<StandingsCache>,
        settings: SettingsRepository,
        events: mpsc::Sender<RefreshEvent>,
    ) -> Self {
        Refresher {
            client,
            cache,
            settings,
            events,
            generation: AtomicU64::new(0),
        }
    }

    pub fn cache(&self) -> &Arc<StandingsCache> {
        &self.cache
    }

    /// The startup load, made once before the timer starts.
    pub async fn initial_load(&self) -> Result<(), RefreshError> {
        self.run(CycleKind::Initial).await
    }

    /// One scheduled (or manually requested) cycle.
    pub async fn run_cycle(&self) -> Result<(), RefreshError> {
        self.run(CycleKind::Scheduled).await
    }

    async fn run(&self, kind: CycleKind) -> Result<(), RefreshError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let token = match self.settings.access_token() {
            Ok(Some(token)) => token,
            Ok(None) => {
                info!("No access token configured, skipping fetch");
                self.emit(RefreshEvent::NotConfigured).await;
                return Err(RefreshError::NotConfigured);
            }
            Err(e) => {
                warn!("Failed to read access token: {}", e);
                self.fail(generation, e.to_string()).await;
                return Err(e.into());
            }
        };

        self.emit(RefreshEvent::Started { generation, kind }).await;

        match self.client.fetch_standings(&token).await {
            Ok(payload) => {
                if self.cache.apply(generation, payload) {
                    info!("Standings updated (gen: {})", generation);
                    self.emit(RefreshEvent::Updated { generation }).await;
                } else {
                    self.emit(RefreshEvent::Superseded { generation }).await;
                }
                Ok(())
            }
            Err(e) => {
                warn!("Standings fetch failed (gen: {}): {}", generation, e);
                self.fail(generation, e.to_string()).await;
                Err(e.into())
            }
        }
    }

    async fn fail(&self, generation: u64, message: String) {
        let applied = self.cache.generation();
        if generation < applied {
            debug!(
                "Dropping failure from stale cycle (gen: {}, applied: {})",
                generation, applied
            );
            self.emit(RefreshEvent::Superseded { generation }).await;
            return;
        }
        self.emit(RefreshEvent::Failed {
            generation,
            message,
        })
        .await;
    }

    async fn emit(&self, event: RefreshEvent) {
        // The app loop may already be gone during shutdown.
        let _ = self.events.send(event).await;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
