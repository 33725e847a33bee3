//! Completion client for a bound endpoint
//!
//! Renders prompts into the bound payload shape, presents the key with the
//! bound auth scheme and extracts text from whatever layout comes back.
//! Calls go through the regular retrying transport; a failure here is an
//! ordinary error and never triggers a new discovery run.

use async_trait::async_trait;
use secrecy::SecretString;
use std::time::Duration;
use tracing::{debug, instrument};

use super::catalog::CompletionRequest;
use super::extract::{extract_text, matching_layout};
use super::prober::EndpointBinding;
use super::prompts::{SYSTEM_PROMPT, chunk_prompt, overview_prompt};
use crate::config::CompletionConfig;
use crate::content::Chunk;
use crate::http::{HttpRequest, HttpResponse, RetryingTransport};
use crate::types::{ProjectMetadata, RepoDocError, Result};

/// Text per chunk, or the reason it could not be produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionResult {
    Text(String),
    Failed { reason: String },
}

impl From<Result<String>> for CompletionResult {
    fn from(result: Result<String>) -> Self {
        match result {
            Ok(text) => Self::Text(text),
            Err(err) => Self::Failed {
                reason: err.to_string(),
            },
        }
    }
}

impl CompletionResult {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Generates documentation text from project material
#[async_trait]
pub trait DocumentationWriter: Send + Sync {
    /// Project overview, requested once per run
    async fn summarize(&self, project: &ProjectMetadata, files: &[String]) -> Result<String>;

    /// Documentation for one chunk of file sections
    async fn document(&self, chunk: &Chunk, project_name: &str) -> Result<String>;

    /// Endpoint description for the document footer
    fn endpoint(&self) -> String;
}

pub struct CompletionClient {
    transport: RetryingTransport,
    binding: EndpointBinding,
    api_key: Option<SecretString>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    request_timeout: Duration,
}

impl std::fmt::Debug for CompletionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionClient")
            .field("endpoint", &self.binding.candidate.to_string())
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl CompletionClient {
    pub fn new(
        transport: RetryingTransport,
        binding: EndpointBinding,
        config: &CompletionConfig,
        request_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            binding,
            api_key: config.api_key_secret(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            request_timeout,
        }
    }

    pub fn binding(&self) -> &EndpointBinding {
        &self.binding
    }

    async fn complete(&self, prompt: &str, context: &str) -> Result<String> {
        let candidate = &self.binding.candidate;
        let body = candidate.payload.build(&CompletionRequest {
            model: &self.model,
            system: SYSTEM_PROMPT,
            prompt,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        });
        let request = candidate
            .auth
            .apply(HttpRequest::post_json(&candidate.url, body), self.api_key.as_ref());

        let response = self
            .transport
            .send(&request)
            .await
            .and_then(HttpResponse::error_for_status)
            .map_err(|e| RepoDocError::from_transport(e, context, self.request_timeout))?;

        debug!(
            context,
            bytes = response.body.len(),
            layout = matching_layout(&response.body).unwrap_or("none"),
            "Completion received"
        );
        extract_text(&response.body)
    }
}

#[async_trait]
impl DocumentationWriter for CompletionClient {
    #[instrument(skip(self, project, files), fields(project = %project.path, files = files.len()))]
    async fn summarize(&self, project: &ProjectMetadata, files: &[String]) -> Result<String> {
        self.complete(&overview_prompt(project, files), "project overview")
            .await
    }

    #[instrument(skip(self, chunk), fields(files = chunk.files.len(), bytes = chunk.len()))]
    async fn document(&self, chunk: &Chunk, project_name: &str) -> Result<String> {
        self.complete(&chunk_prompt(project_name, chunk), "chunk documentation")
            .await
    }

    fn endpoint(&self) -> String {
        self.binding.candidate.url.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Chunker;
    use crate::http::RetryPolicy;
    use crate::http::testing::ScriptedClient;
    use crate::llm::{AuthScheme, EndpointCandidate, PayloadShape};
    use crate::types::ErrorKind;
    use serde_json::json;
    use std::sync::Arc;

    fn client(scripted: Arc<ScriptedClient>, payload: PayloadShape) -> CompletionClient {
        let config = CompletionConfig {
            api_key: Some("sk-test".to_string()),
            model: "doc-model".to_string(),
            ..CompletionConfig::default()
        };
        let policy = RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            jitter: false,
            ..RetryPolicy::default()
        };
        CompletionClient::new(
            RetryingTransport::new(scripted, policy),
            EndpointBinding {
                candidate: EndpointCandidate {
                    url: "https://llm.local/api/generate".to_string(),
                    auth: AuthScheme::Bearer,
                    payload,
                },
                throttled: false,
            },
            &config,
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_document_uses_bound_shape_and_auth() {
        let scripted = Arc::new(ScriptedClient::new().on(
            "/api/generate",
            Ok(HttpResponse::ok_json(&json!({"response": "## src/a.rs\nDoes a."}))),
        ));
        let chunk = Chunker::new(1000).chunk([("src/a.rs", "fn a() {}")]).remove(0);
        let text = client(scripted.clone(), PayloadShape::OllamaGenerate)
            .document(&chunk, "app")
            .await
            .unwrap();

        assert_eq!(text, "## src/a.rs\nDoes a.");
        let request = &scripted.requests()[0];
        assert_eq!(request.header_value("authorization"), Some("Bearer sk-test"));
        let body = request.body.as_ref().unwrap();
        assert_eq!(body["model"], "doc-model");
        assert_eq!(body["stream"], false);
        assert!(body["prompt"].as_str().unwrap().contains("fn a() {}"));
    }

    #[tokio::test]
    async fn test_failures_surface_as_errors() {
        let scripted = Arc::new(
            ScriptedClient::new().on("/api/generate", Ok(HttpResponse::new(503, "overloaded"))),
        );
        let project = ProjectMetadata::new("app", "group/app");
        let err = client(scripted.clone(), PayloadShape::Chat)
            .summarize(&project, &["a.rs".to_string()])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransientHttp);
        assert_eq!(scripted.request_count(), 2);

        let scripted = Arc::new(
            ScriptedClient::new().on("/api/generate", Ok(HttpResponse::ok_json(&json!({"x": 1})))),
        );
        let err = client(scripted, PayloadShape::Chat)
            .summarize(&project, &[])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedResponseShape);

        let result = CompletionResult::from(Err(err));
        assert!(result.is_failed());
    }
}
