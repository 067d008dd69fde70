//! Rate derivation and human-readable traffic/handshake formatting.
//!
//! All unit steps are base-1024. Byte totals use `B, KB, MB, ...`;
//! rates are shown in bits per second (`Bps, Kbps, Mbps, ...`).

use chrono::{DateTime, Utc};

const BYTE_UNITS: [&str; 9] = ["B", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];
const RATE_UNITS: [&str; 9] = [
    "Bps", "Kbps", "Mbps", "Gbps", "Tbps", "Pbps", "Ebps", "Zbps", "Ybps",
];

/// Seconds since the last handshake within which a client counts as active.
pub const ACTIVE_HANDSHAKE_SECS: i64 = 121;

/// Bytes per second between two cumulative counter samples.
///
/// Returns 0 when any input is missing, when no time has passed (or time
/// went backwards), and when the counter went backwards (interface restart).
#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
pub fn calculate_rate(
    current: Option<u64>,
    previous: Option<u64>,
    current_time: Option<DateTime<Utc>>,
    previous_time: Option<DateTime<Utc>>,
) -> f64 {
    let (Some(current), Some(previous), Some(now), Some(then)) =
        (current, previous, current_time, previous_time)
    else {
        return 0.0;
    };

    let elapsed_ms = (now - then).num_milliseconds();
    if elapsed_ms <= 0 {
        return 0.0;
    }
    let Some(delta) = current.checked_sub(previous) else {
        return 0.0;
    };

    delta as f64 / (elapsed_ms as f64 / 1000.0)
}

/// Step `value` down by 1024 until it fits, returning the scaled value and
/// unit index.
fn scale(mut value: f64, max_index: usize) -> (f64, usize) {
    let mut index = 0;
    while value >= 1024.0 && index < max_index {
        value /= 1024.0;
        index += 1;
    }
    (value, index)
}

/// `1536` → `"1.5 KB"`. Up to two decimals, trailing zeros dropped.
#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".into();
    }
    let (value, index) = scale(bytes as f64, BYTE_UNITS.len() - 1);
    let text = format!("{value:.2}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    format!("{text} {}", BYTE_UNITS[index])
}

/// Bytes/s → bits/s text. `1000.0` → `"7.81 Kbps"`.
///
/// Two decimals below 10, one below 100, none from 100 up.
pub fn format_transfer_rate(bytes_per_second: f64) -> String {
    if !bytes_per_second.is_finite() || bytes_per_second <= 0.0 {
        return "0 Bps".into();
    }
    let (rate, index) = scale(bytes_per_second * 8.0, RATE_UNITS.len() - 1);
    let unit = RATE_UNITS[index];
    if rate < 10.0 {
        format!("{rate:.2} {unit}")
    } else if rate < 100.0 {
        format!("{rate:.1} {unit}")
    } else {
        format!("{:.0} {unit}", rate.round())
    }
}

/// Relative handshake age, measured against `now` (the snapshot time).
pub fn format_last_handshake(now: DateTime<Utc>, last: Option<DateTime<Utc>>) -> String {
    let Some(last) = last else {
        return "Never".into();
    };

    let secs = (now - last).num_milliseconds().div_euclid(1000);
    if secs < 3 {
        return "Just now".into();
    }
    if secs < 60 {
        return format!("{secs} sec ago");
    }

    let (mins, sec) = (secs / 60, secs % 60);
    if mins < 60 {
        return format!("{mins} min {sec} sec ago");
    }

    let (hours, min) = (mins / 60, mins % 60);
    if hours < 24 {
        return format!("{hours} hr {min} min ago");
    }

    let (days, hr) = (hours / 24, hours % 24);
    let plural = if days > 1 { "s" } else { "" };
    format!("{days} day{plural} {hr} hr ago")
}

/// `true` when the last handshake is at most [`ACTIVE_HANDSHAKE_SECS`]
/// (whole seconds, rounded down) before `now`.
pub fn is_client_active(now: DateTime<Utc>, last: Option<DateTime<Utc>>) -> bool {
    last.is_some_and(|last| {
        (now - last).num_milliseconds().div_euclid(1000) <= ACTIVE_HANDSHAKE_SECS
    })
}
