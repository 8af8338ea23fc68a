//! Remote stage trait implemented by every analysis backend.

use async_trait::async_trait;

use crate::error::RemoteError;
use crate::types::{InputSet, SemanticRequest, SemanticResult, StructuralResult};

/// The two request/response operations the pipeline controller invokes.
///
/// Uses `async_trait` because the controller holds an `Arc<dyn RemoteStageClient>`
/// and moves it into spawned tasks. Implementations never retry on their own.
#[async_trait]
pub trait RemoteStageClient: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Extract participants, transcript, and per-item detections.
    async fn run_structural(&self, input: &InputSet) -> Result<StructuralResult, RemoteError>;

    /// Score the transcript and produce narrative insights.
    async fn run_semantic(&self, request: &SemanticRequest)
        -> Result<SemanticResult, RemoteError>;
}

/// Resolve `${ENV_VAR}` references in config strings.
pub fn resolve_env_var(value: &str) -> Option<String> {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        std::env::var(var_name).ok()
    } else if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_env_var() {
        assert_eq!(resolve_env_var("plain-key"), Some("plain-key".to_string()));
        assert_eq!(resolve_env_var(""), None);
        assert_eq!(resolve_env_var("${CHATBRAIN_DEFINITELY_UNSET_42}"), None);
    }
}
