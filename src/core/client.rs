use async_trait::async_trait;

use crate::error::ApiError;
use crate::models::GenerationRequest;

/// Stateless completion client: one request in, one response text out
///
/// Implementations must not retry; a failed call is final for its file.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: &GenerationRequest) -> Result<String, ApiError>;
}
