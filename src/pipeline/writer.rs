//! Writer selection
//!
//! The orchestrator asks for a documentation writer once per run. With a
//! completion service configured, the first request runs endpoint discovery
//! and every later request reuses its outcome.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::config::CompletionConfig;
use crate::http::RetryingTransport;
use crate::llm::{CompletionClient, DocumentationWriter, EndpointProber};

/// Supplies the bound writer, or `None` when documentation must be static
#[async_trait]
pub trait WriterSource: Send + Sync {
    async fn writer(&self) -> Option<Arc<dyn DocumentationWriter>>;
}

/// A writer decided up front (tests, `--static`)
#[derive(Clone, Default)]
pub struct FixedWriter(Option<Arc<dyn DocumentationWriter>>);

impl FixedWriter {
    pub fn new(writer: Arc<dyn DocumentationWriter>) -> Self {
        Self(Some(writer))
    }

    /// Always static
    pub fn none() -> Self {
        Self(None)
    }
}

#[async_trait]
impl WriterSource for FixedWriter {
    async fn writer(&self) -> Option<Arc<dyn DocumentationWriter>> {
        self.0.clone()
    }
}

/// Discovers the endpoint on first use and caches the resulting client
pub struct ProbedWriter {
    prober: EndpointProber,
    transport: RetryingTransport,
    config: CompletionConfig,
    request_timeout: Duration,
    client: OnceCell<Option<Arc<dyn DocumentationWriter>>>,
}

impl ProbedWriter {
    pub fn new(
        prober: EndpointProber,
        transport: RetryingTransport,
        config: CompletionConfig,
        request_timeout: Duration,
    ) -> Self {
        Self {
            prober,
            transport,
            config,
            request_timeout,
            client: OnceCell::new(),
        }
    }

    pub fn prober(&self) -> &EndpointProber {
        &self.prober
    }
}

#[async_trait]
impl WriterSource for ProbedWriter {
    async fn writer(&self) -> Option<Arc<dyn DocumentationWriter>> {
        self.client
            .get_or_init(|| async {
                let report = self.prober.discover().await;
                debug!(
                    attempts = report.attempts.len(),
                    bound = report.is_bound(),
                    "Endpoint discovery finished"
                );
                report.binding.clone().map(|binding| {
                    Arc::new(CompletionClient::new(
                        self.transport.clone(),
                        binding,
                        &self.config,
                        self.request_timeout,
                    )) as Arc<dyn DocumentationWriter>
                })
            })
            .await
            .clone()
    }
}
