//! Metrics for token refresh sessions
//!
//! Recorded through the `metrics` facade; nothing is exported unless the
//! embedding application installs a recorder.
//!
//! # Metrics
//!
//! - `auth_refresh_sessions_total`: Counter of refresh sessions started
//! - `auth_refresh_joins_total`: Counter of callers that joined a session
//!   already in flight
//! - `auth_refresh_outcomes_total`: Counter of finished sessions by
//!   `outcome` (`success` / `failure`) and `reason`
//! - `auth_refresh_waiters`: Histogram of callers released per session
//! - `auth_refresh_duration_seconds`: Histogram of session duration
//!
//! # Examples
//!
//! ```
//! use madabank_net::metrics::RefreshSessionMetrics;
//!
//! let metrics = RefreshSessionMetrics::start();
//! metrics.finish_success(3);
//! ```

use std::time::Instant;

use metrics::{histogram, increment_counter};

use crate::error::RefreshError;

/// Metrics for one refresh session.
///
/// Created when the session starts; consumed by one of the `finish_*`
/// methods, so a session cannot be recorded twice.
#[derive(Debug)]
pub struct RefreshSessionMetrics {
    start: Instant,
}

impl RefreshSessionMetrics {
    /// Records the start of a session.
    pub fn start() -> Self {
        increment_counter!("auth_refresh_sessions_total");
        Self {
            start: Instant::now(),
        }
    }

    /// Records a caller joining a session that is already in flight.
    pub fn record_join() {
        increment_counter!("auth_refresh_joins_total");
    }

    pub fn finish_success(self, waiters: usize) {
        self.finish("success", "ok", waiters);
    }

    pub fn finish_failure(self, error: &RefreshError, waiters: usize) {
        self.finish("failure", error.reason(), waiters);
    }

    /// Seconds since the session started.
    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    fn finish(self, outcome: &'static str, reason: &'static str, waiters: usize) {
        histogram!("auth_refresh_duration_seconds", self.elapsed_secs(), "outcome" => outcome);
        histogram!("auth_refresh_waiters", waiters as f64);
        increment_counter!(
            "auth_refresh_outcomes_total",
            "outcome" => outcome,
            "reason" => reason
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_record_without_recorder() {
        // With no recorder installed every macro is a no-op.
        let metrics = RefreshSessionMetrics::start();
        assert!(metrics.elapsed_secs() >= 0.0);
        RefreshSessionMetrics::record_join();
        metrics.finish_failure(&RefreshError::MissingRefreshToken, 2);
    }

    #[test]
    fn test_metrics_finish_success() {
        RefreshSessionMetrics::start().finish_success(0);
    }
}
