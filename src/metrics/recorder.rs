//! Metric recording functions

use std::time::Duration;

use crate::pool::FailoverError;
use crate::upstream::Outcome;

use super::{labels, names};

/// Record one upstream attempt
pub fn record_attempt(outcome: &Outcome) {
    metrics::counter!(
        names::ATTEMPTS_TOTAL,
        labels::keys::OUTCOME => labels::outcome_label(outcome)
    )
    .increment(1);
}

/// Record a move to the next credential
pub fn record_failover() {
    metrics::counter!(names::FAILOVERS_TOTAL).increment(1);
}

/// Record a finished generation request
pub fn record_request<T>(result: &Result<T, FailoverError>, duration: Duration) {
    metrics::histogram!(
        names::REQUEST_DURATION,
        labels::keys::RESULT => labels::result_label(result)
    )
    .record(duration.as_secs_f64());

    if let Err(error) = result {
        metrics::counter!(
            names::FAILURES_TOTAL,
            labels::keys::REASON => labels::failure_reason_label(error)
        )
        .increment(1);
    }
}

/// Record a swallowed logging failure
pub fn record_log_failure(stage: &'static str) {
    metrics::counter!(
        names::LOG_FAILURES_TOTAL,
        labels::keys::STAGE => stage
    )
    .increment(1);
}
