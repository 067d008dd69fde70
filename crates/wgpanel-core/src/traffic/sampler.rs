// ── Snapshot pair ──
//
// Holds the latest poll result and the one before it. Rates are only
// derived when both exist; the very first poll never produces a rate.

use chrono::{DateTime, Utc};
use tracing::debug;

use super::TrafficDisplayMode;
use super::format::{calculate_rate, format_bytes, format_transfer_rate, is_client_active};
use crate::model::{ClientState, InterfaceStateSnapshot};

/// Per-direction rate in bytes per second.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TransferRates {
    pub rx: f64,
    pub tx: f64,
}

/// Rolling (current, previous) sample pair for one interface.
#[derive(Debug, Clone, Default)]
pub struct TrafficSampler {
    mode: TrafficDisplayMode,
    current: Option<InterfaceStateSnapshot>,
    previous: Option<InterfaceStateSnapshot>,
    consecutive_failures: u32,
}

impl TrafficSampler {
    pub fn new(mode: TrafficDisplayMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn mode(&self) -> TrafficDisplayMode {
        self.mode
    }

    /// Accept a successful poll. The old current sample becomes the
    /// baseline only if there was one.
    pub fn record(&mut self, snapshot: InterfaceStateSnapshot) {
        if let Some(current) = self.current.take() {
            self.previous = Some(current);
        }
        debug!(
            clients = snapshot.state.len(),
            timestamp = %snapshot.timestamp,
            "state sample recorded"
        );
        self.current = Some(snapshot);
        self.consecutive_failures = 0;
    }

    /// Note a failed poll: the current sample is dropped so the display
    /// reads "unknown" rather than frozen values.
    pub fn record_failure(&mut self) {
        self.current = None;
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
    }

    /// Switch display mode. Drops the baseline (never the current sample)
    /// and returns whether the mode changed.
    pub fn set_mode(&mut self, mode: TrafficDisplayMode) -> bool {
        if mode == self.mode {
            return false;
        }
        self.mode = mode;
        self.previous = None;
        true
    }

    /// Forget both samples (interface switch).
    pub fn reset(&mut self) {
        self.current = None;
        self.previous = None;
        self.consecutive_failures = 0;
    }

    pub fn current(&self) -> Option<&InterfaceStateSnapshot> {
        self.current.as_ref()
    }

    pub fn previous(&self) -> Option<&InterfaceStateSnapshot> {
        self.previous.as_ref()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Server-reported time of the current sample.
    pub fn now(&self) -> Option<DateTime<Utc>> {
        self.current.as_ref().map(|s| s.timestamp)
    }

    /// Current counters of one client.
    pub fn state(&self, client_id: &str) -> Option<&ClientState> {
        self.current.as_ref()?.state.get(client_id)
    }

    /// Rates for one client, when both samples carry it.
    pub fn rates(&self, client_id: &str) -> Option<TransferRates> {
        let current = self.current.as_ref()?;
        let previous = self.previous.as_ref()?;
        let now = current.state.get(client_id)?;
        let then = previous.state.get(client_id)?;

        let rate = |cur, prev| {
            calculate_rate(cur, prev, Some(current.timestamp), Some(previous.timestamp))
        };
        Some(TransferRates {
            rx: rate(now.transfer_rx, then.transfer_rx),
            tx: rate(now.transfer_tx, then.transfer_tx),
        })
    }

    /// Handshake freshness against the snapshot's own timestamp.
    pub fn is_active(&self, client_id: &str) -> bool {
        let Some(current) = self.current.as_ref() else {
            return false;
        };
        let last = current
            .state
            .get(client_id)
            .and_then(|s| s.latest_handshake);
        is_client_active(current.timestamp, last)
    }

    /// `"↑ <tx> ↓ <rx>"` in the current display mode.
    pub fn traffic_text(&self, client_id: &str) -> String {
        match self.mode {
            TrafficDisplayMode::Rate => {
                let rates = self.rates(client_id).unwrap_or_default();
                format!(
                    "↑ {} ↓ {}",
                    format_transfer_rate(rates.tx),
                    format_transfer_rate(rates.rx)
                )
            }
            TrafficDisplayMode::Total => {
                let state = self.state(client_id);
                let tx = state.and_then(|s| s.transfer_tx).unwrap_or(0);
                let rx = state.and_then(|s| s.transfer_rx).unwrap_or(0);
                format!("↑ {} ↓ {}", format_bytes(tx), format_bytes(rx))
            }
        }
    }

    /// Status line for the operator once polling has failed repeatedly.
    pub fn failure_notice(&self, threshold: u32) -> Option<String> {
        if self.consecutive_failures >= threshold {
            Some(format!(
                "telemetry unavailable ({} failed polls)",
                self.consecutive_failures
            ))
        } else {
            None
        }
    }
}
