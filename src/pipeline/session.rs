//! Wiring from configuration to a ready orchestrator

use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::fallback::BasicRenderer;
use super::orchestrator::DocumentationOrchestrator;
use super::writer::{FixedWriter, ProbedWriter, WriterSource};
use crate::config::Config;
use crate::content::FileFilter;
use crate::http::{ReqwestClient, RetryPolicy, RetryingTransport, SharedHttpClient};
use crate::llm::{EndpointCatalog, EndpointProber};
use crate::repository::RepositoryClient;
use crate::types::Result;

/// reqwest transport with the configured retry policy
pub fn build_transport(config: &Config) -> Result<RetryingTransport> {
    let http: SharedHttpClient = Arc::new(ReqwestClient::new(&config.transport)?);
    Ok(RetryingTransport::new(
        http,
        RetryPolicy::from_config(&config.transport),
    ))
}

pub fn build_prober(config: &Config, transport: &RetryingTransport) -> Result<EndpointProber> {
    let catalog = EndpointCatalog::from_config(&config.completion)?;
    Ok(EndpointProber::new(
        transport,
        catalog,
        config.completion.api_key_secret(),
        config.completion.model.clone(),
    ))
}

impl DocumentationOrchestrator {
    /// Full production wiring. `static_only` skips endpoint discovery.
    pub fn from_config(config: &Config, static_only: bool) -> Result<Self> {
        let transport = build_transport(config)?;
        let request_timeout = Duration::from_secs(config.transport.timeout_secs);
        let repository = Arc::new(RepositoryClient::from_config(config, transport.clone())?);

        let completion = &config.completion;
        let writers: Arc<dyn WriterSource> =
            if static_only || !completion.enabled || !completion.has_candidates() {
                info!("No completion service configured, documentation will be static");
                Arc::new(FixedWriter::none())
            } else {
                Arc::new(ProbedWriter::new(
                    build_prober(config, &transport)?,
                    transport,
                    completion.clone(),
                    request_timeout,
                ))
            };

        Ok(Self::new(
            repository,
            writers,
            Arc::new(BasicRenderer),
            FileFilter::from_config(&config.filter),
            &config.generation,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorKind;

    #[test]
    fn test_missing_token_is_a_config_error() {
        let config = Config::default();
        let err = DocumentationOrchestrator::from_config(&config, true)
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_prober_catalog_from_base_url() {
        let mut config = Config::default();
        config.completion.base_url = Some("https://llm.local".into());
        let transport = build_transport(&config).unwrap();
        let prober = build_prober(&config, &transport).unwrap();
        assert!(!prober.catalog().is_empty());
    }
}
