use crate::pool::Credential;
use crate::upstream::outcome::Outcome;
use crate::upstream::types::GenerationRequest;

use async_trait::async_trait;

/// Common interface for upstream generation backends
///
/// An implementation performs exactly one upstream exchange per call and
/// classifies the result. It must not retry on its own: moving on to the
/// next credential is the coordinator's job.
#[async_trait]
pub trait UpstreamClient {
    /// Run one generation call with `credential`
    async fn generate(&self, credential: &Credential, request: &GenerationRequest) -> Outcome;
    /// Get the name of this backend
    fn get_name(&self) -> &str;
    /// Get the configured model name
    fn get_model(&self) -> &str;
}
