//! Label helpers for consistent metric labeling

use crate::pool::FailoverError;
use crate::upstream::Outcome;

/// Standard label keys
pub mod keys {
    /// Attempt outcome label key
    pub const OUTCOME: &str = "outcome";
    /// Failure reason label key
    pub const REASON: &str = "reason";
    /// Logging stage label key
    pub const STAGE: &str = "stage";
    /// Request result label key
    pub const RESULT: &str = "result";
}

/// Convert an attempt Outcome to its label value
pub fn outcome_label(outcome: &Outcome) -> &'static str {
    outcome.label()
}

/// Convert a FailoverError to its reason label value
pub fn failure_reason_label(error: &FailoverError) -> &'static str {
    match error {
        FailoverError::NoCredentials => "no_credentials",
        FailoverError::Rejected(_) => "rejected",
        FailoverError::Exhausted { .. } => "exhausted",
    }
}

/// Result label for a finished generation request
pub fn result_label<T>(result: &Result<T, FailoverError>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(e) => failure_reason_label(e),
    }
}
