// Fixed-cadence refresh timer.
//
// The timer task only spawns cycles; it never awaits them, so a slow request
// does not delay the next tick. At most one timer exists per scheduler:
// `start` aborts the previous one first.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::refresh::Refresher;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
}

pub struct RefreshScheduler {
    refresher: Arc<Refresher>,
    timer: Option<JoinHandle<()>>,
}

impl RefreshScheduler {
    pub fn new(refresher: Arc<Refresher>) -> Self {
        RefreshScheduler {
            refresher,
            timer: None,
        }
    }

    pub fn state(&self) -> SchedulerState {
        match &self.timer {
            Some(handle) if !handle.is_finished() => SchedulerState::Running,
            _ => SchedulerState::Idle,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state() == SchedulerState::Running
    }

    /// Begin ticking every `period`. The first cycle runs one full period
    /// from now; the initial load is the caller's job.
    pub fn start(&mut self, period: Duration) {
        self.stop();

        let refresher = Arc::clone(&self.refresher);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // Consume the first (immediate) tick.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                debug!("Refresh tick");
                let refresher = Arc::clone(&refresher);
                tokio::spawn(async move {
                    // Failures are reported as events; the timer keeps going.
                    let _ = refresher.run_cycle().await;
                });
            }
        });

        info!("Refresh scheduler started (every {:?})", period);
        self.timer = Some(handle);
    }

    /// Stop ticking. In-flight cycles finish on their own.
    pub fn stop(&mut self) {
        if let Some(handle) = self.timer.take() {
            handle.abort();
            info!("Refresh scheduler stopped");
        }
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
