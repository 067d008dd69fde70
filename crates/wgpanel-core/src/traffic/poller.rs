// ── State poll loop ──
//
// Drives a `TrafficSampler` from `GET /interfaces/{id}/clients-state` on a
// `PeriodicTask`, publishing every change through a `watch` channel.
// Poll failures are logged and counted, never returned.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;
use tracing::{debug, warn};
use wgpanel_api::ApiClient;

use super::TrafficDisplayMode;
use super::sampler::TrafficSampler;
use crate::task::PeriodicTask;

/// Consecutive failed polls after which the operator is told.
pub const FAILURE_NOTICE_THRESHOLD: u32 = 3;

/// Polls one interface at a time at the cadence of the display mode.
pub struct StatePoller {
    api: ApiClient,
    sampler: Arc<watch::Sender<TrafficSampler>>,
    /// Bumped on every (re)start so a poll that outlives its loop cannot
    /// write into the sampler of the next interface.
    generation: Arc<AtomicU64>,
    task: PeriodicTask,
    interface_id: Option<String>,
}

impl StatePoller {
    pub fn new(api: ApiClient, mode: TrafficDisplayMode) -> Self {
        let (tx, _) = watch::channel(TrafficSampler::new(mode));
        Self {
            api,
            sampler: Arc::new(tx),
            generation: Arc::new(AtomicU64::new(0)),
            task: PeriodicTask::new(),
            interface_id: None,
        }
    }

    /// Receiver that wakes on every recorded sample, failure or mode change.
    pub fn subscribe(&self) -> watch::Receiver<TrafficSampler> {
        self.sampler.subscribe()
    }

    /// Copy of the sampler as it stands.
    pub fn sampler(&self) -> TrafficSampler {
        self.sampler.borrow().clone()
    }

    pub fn mode(&self) -> TrafficDisplayMode {
        self.sampler.borrow().mode()
    }

    pub fn interface_id(&self) -> Option<&str> {
        self.interface_id.as_deref()
    }

    pub fn is_polling(&self) -> bool {
        self.task.is_running()
    }

    /// Cadence of the running loop.
    pub fn poll_period(&self) -> Option<std::time::Duration> {
        self.task.period()
    }

    /// Start polling `interface_id`, discarding samples of any previous one.
    pub fn watch(&mut self, interface_id: &str) {
        self.sampler.send_modify(TrafficSampler::reset);
        self.interface_id = Some(interface_id.to_owned());
        self.restart();
    }

    /// Change display mode; a running loop is restarted at the new cadence.
    pub fn set_mode(&mut self, mode: TrafficDisplayMode) -> bool {
        let changed = self.sampler.send_if_modified(|s| s.set_mode(mode));
        if changed && self.interface_id.is_some() {
            self.restart();
        }
        changed
    }

    /// Stop polling. Samples stay readable until the next `watch`.
    pub fn stop(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.task.stop();
        if let Some(id) = self.interface_id.take() {
            debug!(interface = %id, "state polling stopped");
        }
    }

    fn restart(&mut self) {
        let Some(interface_id) = self.interface_id.clone() else {
            return;
        };
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let period = self.mode().poll_interval();
        debug!(interface = %interface_id, ?period, "state polling started");

        let api = self.api.clone();
        let sampler = Arc::clone(&self.sampler);
        let current_generation = Arc::clone(&self.generation);
        self.task.start(period, move || {
            let api = api.clone();
            let sampler = Arc::clone(&sampler);
            let current_generation = Arc::clone(&current_generation);
            let interface_id = interface_id.clone();
            async move {
                let result = api.interface_clients_state(&interface_id).await;
                if current_generation.load(Ordering::SeqCst) != generation {
                    return;
                }
                match result {
                    Ok(snapshot) => sampler.send_modify(|s| s.record(snapshot)),
                    Err(e) => {
                        warn!(interface = %interface_id, error = %e, "state poll failed");
                        sampler.send_modify(TrafficSampler::record_failure);
                        let failures = sampler.borrow().consecutive_failures();
                        if failures == FAILURE_NOTICE_THRESHOLD {
                            warn!(
                                interface = %interface_id,
                                failures,
                                "state telemetry unavailable"
                            );
                        }
                    }
                }
            }
        });
    }
}

impl Drop for StatePoller {
    fn drop(&mut self) {
        self.stop();
    }
}
