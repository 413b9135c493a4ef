use crate::pool::credentials::CredentialPool;
use crate::upstream::{GenerationRequest, Outcome, UpstreamClient};

use log::{debug, error, warn};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// The failure recorded for the last credential tried.
///
/// Serialized as the `details` field of the error body returned to the
/// caller, so it must never contain credential material.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LastError {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl LastError {
    fn quota() -> Self {
        Self {
            status: Some(429),
            message: Some("Rate limit exceeded".to_string()),
            details: None,
        }
    }

    fn network() -> Self {
        Self {
            status: None,
            message: Some("Internal Network Error".to_string()),
            details: None,
        }
    }

    fn upstream(status: u16, details: Value) -> Self {
        Self {
            status: Some(status),
            message: None,
            details: Some(details),
        }
    }
}

/// Terminal failure of a failover run.
#[derive(Debug, Clone, PartialEq)]
pub enum FailoverError {
    /// The pool is empty; no upstream call was made
    NoCredentials,
    /// Upstream rejected the request itself; remaining credentials were skipped
    Rejected(LastError),
    /// Every credential failed with a quota or transport error
    Exhausted { attempts: usize, last: LastError },
}

impl FailoverError {
    /// HTTP status to answer the caller with.
    pub fn status(&self) -> u16 {
        match self {
            FailoverError::NoCredentials => 500,
            FailoverError::Rejected(last) | FailoverError::Exhausted { last, .. } => {
                last.status.unwrap_or(500)
            }
        }
    }

    /// JSON body to answer the caller with: `{error, message, details}`.
    pub fn body(&self) -> Value {
        match self {
            FailoverError::NoCredentials => json!({
                "error": "Server configuration error",
                "message": "No API keys found.",
                "details": Value::Null,
            }),
            FailoverError::Rejected(last) => json!({
                "error": "Generation failed",
                "message": "The upstream API rejected the request.",
                "details": last,
            }),
            FailoverError::Exhausted { last, .. } => json!({
                "error": "Generation failed",
                "message": "All API keys are busy or failing.",
                "details": last,
            }),
        }
    }
}

/// What the coordinator does after one attempt.
#[derive(Debug, PartialEq)]
enum Transition {
    Succeed(Value),
    Advance(LastError),
    Reject(LastError),
}

/// The failover transition table. Exhaustive over [`Outcome`].
fn transition(outcome: Outcome) -> Transition {
    match outcome {
        Outcome::Success(payload) => Transition::Succeed(payload),
        Outcome::QuotaExceeded => Transition::Advance(LastError::quota()),
        Outcome::NetworkError(_) => Transition::Advance(LastError::network()),
        Outcome::UpstreamError { status, details } => {
            Transition::Reject(LastError::upstream(status, details))
        }
    }
}

/// Drives an [`UpstreamClient`] across a [`CredentialPool`].
///
/// Credentials are tried first to last, one upstream call each, and never
/// concurrently. The first success wins; a quota or transport failure
/// moves on to the next credential; any other upstream error stops the
/// run, since it is attributed to the input rather than the credential.
#[derive(Clone)]
pub struct FailoverCoordinator {
    pool: CredentialPool,
    client: Arc<dyn UpstreamClient + Send + Sync>,
}

impl FailoverCoordinator {
    pub fn new(pool: CredentialPool, client: Arc<dyn UpstreamClient + Send + Sync>) -> Self {
        Self { pool, client }
    }

    pub fn pool_size(&self) -> usize {
        self.pool.len()
    }

    /// Runs the request through the pool.
    ///
    /// # Returns
    /// * `Ok(payload)` - The raw upstream success payload
    /// * `Err(FailoverError)` - Empty pool, rejection, or exhaustion
    pub async fn run(&self, request: &GenerationRequest) -> Result<Value, FailoverError> {
        if self.pool.is_empty() {
            error!("No upstream API keys configured; refusing request");
            return Err(FailoverError::NoCredentials);
        }

        let mut last_error: Option<LastError> = None;
        let mut attempts = 0;

        for (index, credential) in self.pool.iter().enumerate() {
            attempts += 1;
            debug!(
                "Attempt {} of {} using key #{} for model {}",
                attempts,
                self.pool.len(),
                index + 1,
                self.client.get_model()
            );

            let outcome = self.client.generate(credential, request).await;

            #[cfg(feature = "metrics")]
            crate::metrics::record_attempt(&outcome);

            match &outcome {
                Outcome::QuotaExceeded => {
                    warn!("Key #{} hit its quota (429), trying the next key", index + 1);
                }
                Outcome::NetworkError(reason) => {
                    error!("Network error with key #{}: {}", index + 1, reason);
                }
                Outcome::UpstreamError { status, details } => {
                    error!("Upstream error {} with key #{}: {}", status, index + 1, details);
                }
                Outcome::Success(_) => {}
            }

            match transition(outcome) {
                Transition::Succeed(payload) => return Ok(payload),
                Transition::Reject(last) => return Err(FailoverError::Rejected(last)),
                Transition::Advance(last) => {
                    last_error = Some(last);
                    #[cfg(feature = "metrics")]
                    if index + 1 < self.pool.len() {
                        crate::metrics::record_failover();
                    }
                }
            }
        }

        warn!("All {} upstream keys failed", attempts);
        Err(FailoverError::Exhausted {
            attempts,
            last: last_error.unwrap_or_default(),
        })
    }
}
