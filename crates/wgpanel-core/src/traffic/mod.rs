// ── Traffic telemetry ──
//
// Rolling (current, previous) snapshot pair per interface, the pure
// rate/format helpers that read it, and the poll loop that feeds it.

mod format;
mod poller;
mod sampler;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

pub use format::{
    ACTIVE_HANDSHAKE_SECS, calculate_rate, format_bytes, format_last_handshake,
    format_transfer_rate, is_client_active,
};
pub use poller::{FAILURE_NOTICE_THRESHOLD, StatePoller};
pub use sampler::{TrafficSampler, TransferRates};

/// How per-client traffic is shown, which also sets the poll cadence.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Display,
    EnumString,
    AsRefStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TrafficDisplayMode {
    /// Cumulative rx/tx bytes.
    #[default]
    Total,
    /// Bits per second derived from the last two samples.
    Rate,
}

impl TrafficDisplayMode {
    /// Poll period for this mode: fast for rates, slow for totals.
    pub fn poll_interval(self) -> Duration {
        match self {
            Self::Rate => Duration::from_secs(1),
            Self::Total => Duration::from_secs(5),
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Rate => Self::Total,
            Self::Total => Self::Rate,
        }
    }
}
