//! Histogram metrics

use super::labels;

/// Time spent establishing one connection
pub fn dial_duration(duration_ms: u64) {
    metrics::histogram!(labels::DIAL_DURATION_MS).record(duration_ms as f64);
}

/// Time spent on one command, including waiting for a slot
pub fn command_duration(command: String, duration_ms: u64) {
    metrics::histogram!(labels::COMMAND_DURATION_MS, labels::COMMAND => command)
        .record(duration_ms as f64);
}

/// Delay applied before a reconnect attempt
pub fn reconnect_delay(delay_ms: u64) {
    metrics::histogram!(labels::RECONNECT_DELAY_MS).record(delay_ms as f64);
}
