//! Metrics for connection lifecycle and command execution
//!
//! All recording goes through the `metrics` facade; nothing is exported
//! unless the embedding application installs a recorder.

pub mod counters;
pub mod histograms;
pub mod labels;
