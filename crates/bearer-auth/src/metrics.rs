//! Authentication attempt counters
//!
//! - `bearer_auth_attempts_total` (counter): labels `strategy`, `outcome`
//!
//! Calls are no-ops until the host installs a recorder.

/// Record one evaluated strategy and its outcome label.
pub fn record_attempt(strategy: &str, outcome: &'static str) {
    metrics::counter!(
        "bearer_auth_attempts_total",
        "strategy" => strategy.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}
