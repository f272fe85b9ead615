// Standings cache: last successful payload plus the active category filter.
//
// Both render paths (fetch completion and filter change) read through
// `current()`, so a render never depends on an in-flight request. The state
// sits behind a mutex because refresh cycles run on spawned tasks while the
// app loop changes the filter.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Local};
use tracing::debug;

use crate::model::StandingsPayload;
use crate::projection::{project, CategoryFilter, Projection};

#[derive(Debug, Default)]
struct CacheState {
    payload: Option<Arc<StandingsPayload>>,
    filter: CategoryFilter,
    fetched_at: Option<DateTime<Local>>,
    /// Generation of the payload currently held; 0 before any apply.
    generation: u64,
}

/// Consistent read of the cache taken under a single lock.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSnapshot {
    pub payload: Option<Arc<StandingsPayload>>,
    pub filter: CategoryFilter,
    pub fetched_at: Option<DateTime<Local>>,
}

impl CacheSnapshot {
    /// Project the cached payload through the cached filter. `None` until the
    /// first successful fetch.
    pub fn projection(&self) -> Option<Projection> {
        self.payload
            .as_deref()
            .map(|payload| project(payload, &self.filter))
    }
}

#[derive(Debug, Default)]
pub struct StandingsCache {
    state: Mutex<CacheState>,
}

impl StandingsCache {
    pub fn new(filter: CategoryFilter) -> Self {
        StandingsCache {
            state: Mutex::new(CacheState {
                filter,
                ..CacheState::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        // Every write replaces whole fields, so a poisoned guard still holds
        // a coherent state.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Replace the stored payload wholesale. The filter is untouched.
    pub fn update(&self, payload: StandingsPayload) {
        let mut state = self.lock();
        state.payload = Some(Arc::new(payload));
        state.fetched_at = Some(Local::now());
    }

    /// Replace the stored payload only if `generation` is not older than the
    /// generation already applied. Returns whether the payload was stored.
    pub fn apply(&self, generation: u64, payload: StandingsPayload) -> bool {
        let mut state = self.lock();
        if generation < state.generation {
            debug!(
                "Discarding stale payload (generation {}, applied {})",
                generation, state.generation
            );
            return false;
        }
        state.generation = generation;
        state.payload = Some(Arc::new(payload));
        state.fetched_at = Some(Local::now());
        true
    }

    /// Replace the active filter. Never triggers network activity.
    pub fn set_filter(&self, filter: CategoryFilter) {
        self.lock().filter = filter;
    }

    pub fn current(&self) -> CacheSnapshot {
        let state = self.lock();
        CacheSnapshot {
            payload: state.payload.clone(),
            filter: state.filter.clone(),
            fetched_at: state.fetched_at,
        }
    }

    pub fn has_payload(&self) -> bool {
        self.lock().payload.is_some()
    }

    /// Generation of the payload last committed through `apply`.
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
