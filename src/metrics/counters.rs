//! Counter metrics

use super::labels;
use crate::error::{DialPhase, HandshakeStep};

/// A dial was started
pub fn dial_attempted() {
    metrics::counter!(labels::DIAL_ATTEMPTS).increment(1);
}

/// A dial failed in the given phase
pub fn dial_failed(phase: DialPhase) {
    metrics::counter!(labels::DIAL_FAILURES, labels::PHASE => phase.to_string()).increment(1);
}

/// A pool slot tried to re-establish its connection
pub fn reconnect_attempted() {
    metrics::counter!(labels::RECONNECT_ATTEMPTS).increment(1);
}

/// A broken connection was removed from the pool
pub fn connection_dropped() {
    metrics::counter!(labels::CONNECTIONS_DROPPED).increment(1);
}

/// A post-connect handshake step failed
pub fn handshake_failed(step: HandshakeStep) {
    metrics::counter!(labels::HANDSHAKE_FAILURES, labels::STEP => step.to_string()).increment(1);
}

/// A command finished
pub fn command_completed(command: String, outcome: &'static str) {
    metrics::counter!(
        labels::COMMANDS,
        labels::COMMAND => command,
        labels::OUTCOME => outcome
    )
    .increment(1);
}

/// A pool was closed
pub fn pool_closed() {
    metrics::counter!(labels::POOLS_CLOSED).increment(1);
}
