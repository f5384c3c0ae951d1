//! Metric names and label values

/// Dial attempts
pub const DIAL_ATTEMPTS: &str = "shortkv_dial_attempts_total";
/// Dial failures, labelled by phase
pub const DIAL_FAILURES: &str = "shortkv_dial_failures_total";
/// Reconnect attempts made by pool slots
pub const RECONNECT_ATTEMPTS: &str = "shortkv_reconnect_attempts_total";
/// Connections dropped from the pool
pub const CONNECTIONS_DROPPED: &str = "shortkv_connections_dropped_total";
/// Post-connect handshake failures, labelled by step
pub const HANDSHAKE_FAILURES: &str = "shortkv_handshake_failures_total";
/// Commands completed, labelled by command and outcome
pub const COMMANDS: &str = "shortkv_commands_total";
/// Pools closed
pub const POOLS_CLOSED: &str = "shortkv_pools_closed_total";

/// Dial duration in milliseconds
pub const DIAL_DURATION_MS: &str = "shortkv_dial_duration_ms";
/// Command duration in milliseconds
pub const COMMAND_DURATION_MS: &str = "shortkv_command_duration_ms";
/// Reconnect delay in milliseconds
pub const RECONNECT_DELAY_MS: &str = "shortkv_reconnect_delay_ms";

/// Label keys
pub const PHASE: &str = "phase";
/// Handshake step label key
pub const STEP: &str = "step";
/// Command name label key
pub const COMMAND: &str = "command";
/// Outcome label key
pub const OUTCOME: &str = "outcome";

/// Successful outcome
pub const OUTCOME_OK: &str = "ok";
/// Server replied with an error
pub const OUTCOME_SERVER_ERROR: &str = "server_error";
/// Connection-level failure
pub const OUTCOME_CONNECTION_ERROR: &str = "connection_error";
