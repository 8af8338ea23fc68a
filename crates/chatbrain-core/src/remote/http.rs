//! HTTP backend for the analysis service.
//!
//! The structural stage receives the raw item bytes as a multipart form (one
//! `files` part per item); the semantic stage receives a JSON record with the
//! transcript and participant list.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};

use super::client::{resolve_env_var, RemoteStageClient};
use super::wire::{SemanticRequestWire, SemanticResponse, StructuralResponse};
use crate::config::RemoteConfig;
use crate::error::RemoteError;
use crate::types::{InputSet, SemanticRequest, SemanticResult, Stage, StructuralResult};

/// Analysis service reached over HTTP.
pub struct HttpStageClient {
    structural_url: String,
    semantic_url: String,
    api_key: Option<String>,
    timeout_ms: Option<u64>,
    client: reqwest::Client,
}

impl HttpStageClient {
    pub fn new(config: &RemoteConfig) -> Result<Self, RemoteError> {
        let mut builder = reqwest::Client::builder();
        if let Some(ms) = config.timeout_ms {
            builder = builder.timeout(Duration::from_millis(ms));
        }
        let client = builder.build().map_err(|e| RemoteError::Request {
            stage: Stage::Structural,
            message: format!("Failed to build HTTP client: {e}"),
        })?;

        let base = config.endpoint.trim_end_matches('/');
        Ok(Self {
            structural_url: format!("{base}{}", config.structural_path),
            semantic_url: format!("{base}{}", config.semantic_path),
            api_key: resolve_env_var(&config.api_key),
            timeout_ms: config.timeout_ms,
            client,
        })
    }

    pub fn structural_url(&self) -> &str {
        &self.structural_url
    }

    pub fn semantic_url(&self) -> &str {
        &self.semantic_url
    }

    fn multipart_form(input: &InputSet) -> Result<Form, RemoteError> {
        let mut form = Form::new();
        for item in input.items() {
            let part = Part::bytes(item.content.clone())
                .file_name(item.name.clone())
                .mime_str(&item.mime_type)
                .map_err(|e| RemoteError::Request {
                    stage: Stage::Structural,
                    message: format!("Invalid mime type '{}' for {}: {e}", item.mime_type, item.name),
                })?;
            form = form.part("files", part);
        }
        Ok(form)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        stage: Stage,
        request: reqwest::RequestBuilder,
    ) -> Result<T, RemoteError> {
        let start = Instant::now();
        let request = match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        };

        let resp = request.send().await.map_err(|e| self.transport_error(stage, e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RemoteError::Http {
                stage,
                status: status.as_u16(),
                body,
            });
        }

        let parsed = resp.json::<T>().await.map_err(|e| {
            if e.is_timeout() {
                self.transport_error(stage, e)
            } else {
                RemoteError::Decode {
                    stage,
                    message: e.to_string(),
                }
            }
        })?;

        tracing::debug!(
            "{stage} call answered in {}ms",
            start.elapsed().as_millis()
        );
        Ok(parsed)
    }

    fn transport_error(&self, stage: Stage, e: reqwest::Error) -> RemoteError {
        match self.timeout_ms {
            Some(timeout_ms) if e.is_timeout() => RemoteError::Timeout { stage, timeout_ms },
            _ => RemoteError::Request {
                stage,
                message: e.to_string(),
            },
        }
    }
}

#[async_trait]
impl RemoteStageClient for HttpStageClient {
    fn name(&self) -> &str {
        "http"
    }

    async fn run_structural(&self, input: &InputSet) -> Result<StructuralResult, RemoteError> {
        let form = Self::multipart_form(input)?;
        let request = self.client.post(&self.structural_url).multipart(form);
        let resp: StructuralResponse = self.send(Stage::Structural, request).await?;
        Ok(resp.into())
    }

    async fn run_semantic(
        &self,
        request: &SemanticRequest,
    ) -> Result<SemanticResult, RemoteError> {
        let body = SemanticRequestWire::from(request);
        let request = self.client.post(&self.semantic_url).json(&body);
        let resp: SemanticResponse = self.send(Stage::Semantic, request).await?;
        Ok(resp.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Generation, InputItem};

    #[test]
    fn test_urls_join_endpoint_and_paths() {
        let config = RemoteConfig {
            endpoint: "http://analysis.local:5000/".to_string(),
            ..Default::default()
        };
        let client = HttpStageClient::new(&config).unwrap();
        assert_eq!(client.structural_url(), "http://analysis.local:5000/metadata");
        assert_eq!(client.semantic_url(), "http://analysis.local:5000/llm");
    }

    #[test]
    fn test_empty_api_key_disables_auth() {
        let client = HttpStageClient::new(&RemoteConfig::default()).unwrap();
        assert!(client.api_key.is_none());
    }

    #[test]
    fn test_multipart_form_builds_one_part_per_item() {
        let items = vec![
            InputItem::new("a.png", "image/png", vec![1, 2, 3]),
            InputItem::new("b.png", "image/png", vec![4, 5]),
        ];
        let input = InputSet::new(Generation(1), items).unwrap();
        assert!(HttpStageClient::multipart_form(&input).is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_service_is_request_error() {
        let config = RemoteConfig {
            endpoint: "http://127.0.0.1:9".to_string(),
            ..Default::default()
        };
        let client = HttpStageClient::new(&config).unwrap();
        let request = SemanticRequest {
            transcript: "alice: hi".to_string(),
            participants: vec!["alice".to_string()],
        };

        let err = client.run_semantic(&request).await.unwrap_err();
        assert!(matches!(err, RemoteError::Request { stage: Stage::Semantic, .. }));
    }
}
