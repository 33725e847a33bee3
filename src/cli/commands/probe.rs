//! Probe Command
//!
//! Runs endpoint discovery alone and prints every attempt, so a completion
//! setup can be checked without touching a repository.
//!
//! Usage:
//!   repodoc probe [--base-url URL] [--api-key KEY]

use console::style;

use crate::cli::commands::generate::Overrides;
use crate::cli::ui::Output;
use crate::config::ConfigLoader;
use crate::llm::{EndpointProber, ProbeOutcome, ProbeReport};
use crate::pipeline::{build_prober, build_transport};
use crate::types::{RepoDocError, Result};

pub async fn run(overrides: Overrides, out: Output) -> Result<()> {
    let mut config = ConfigLoader::load()?;
    overrides.apply(&mut config);

    let transport = build_transport(&config)?;
    let prober = build_prober(&config, &transport)?;
    probe(&prober, &out).await
}

/// Discover and print the trace; an unbound prober is an error
async fn probe(prober: &EndpointProber, out: &Output) -> Result<()> {
    if prober.catalog().is_empty() {
        out.warning(
            "No completion endpoint configured (set completion.base_url or completion.endpoints)",
        );
        return Err(RepoDocError::EndpointsExhausted { tried: 0 });
    }

    out.header(&format!(
        "Probing {} endpoint combinations",
        prober.catalog().len()
    ));
    let report = prober.discover().await;
    print_report(out, report);

    match &report.binding {
        Some(_) => Ok(()),
        None => Err(RepoDocError::EndpointsExhausted {
            tried: report.attempts.len(),
        }),
    }
}

fn print_report(out: &Output, report: &ProbeReport) {
    for (index, attempt) in report.attempts.iter().enumerate() {
        let outcome = match &attempt.outcome {
            ProbeOutcome::Works => style(attempt.outcome.to_string()).green(),
            ProbeOutcome::Throttled => style(attempt.outcome.to_string()).yellow(),
            _ => style(attempt.outcome.to_string()).red(),
        };
        out.result(&format!(
            "{:>3}. {} {} {}",
            index + 1,
            attempt.candidate,
            style("→").dim(),
            outcome
        ));
    }

    match &report.binding {
        Some(binding) => {
            out.success(&format!("Bound to {}", binding.candidate));
            if binding.throttled {
                out.warning("Endpoint is rate limiting; generation requests will be retried");
            }
        }
        None => out.error(&format!(
            "No endpoint bound after {} of {} combinations",
            report.attempts.len(),
            report.catalog_size
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::ScriptedClient;
    use crate::http::{HttpResponse, RetryPolicy, RetryingTransport};
    use crate::llm::{AuthScheme, EndpointCatalog, PayloadShape};
    use crate::types::ErrorKind;
    use serde_json::json;
    use std::sync::Arc;

    fn prober(client: Arc<ScriptedClient>, urls: Vec<String>) -> EndpointProber {
        let transport = RetryingTransport::new(client, RetryPolicy::default());
        let catalog = EndpointCatalog::new(urls, vec![AuthScheme::None], vec![PayloadShape::Chat]);
        EndpointProber::new(&transport, catalog, None, "test-model")
    }

    #[tokio::test]
    async fn test_empty_catalog_fails_without_requests() {
        let client = Arc::new(ScriptedClient::new());
        let prober = prober(client.clone(), Vec::new());

        let err = probe(&prober, &Output::new(true)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EndpointsExhausted);
        assert!(matches!(err, RepoDocError::EndpointsExhausted { tried: 0 }));
        assert_eq!(client.request_count(), 0);
    }

    #[tokio::test]
    async fn test_unbound_catalog_reports_attempts() {
        let client = Arc::new(ScriptedClient::new());
        let prober = prober(client, vec!["https://llm.local/v1/chat/completions".into()]);

        let err = probe(&prober, &Output::new(true)).await.unwrap_err();
        assert!(matches!(err, RepoDocError::EndpointsExhausted { tried: 1 }));
    }

    #[tokio::test]
    async fn test_bound_endpoint_succeeds() {
        let reply = json!({"choices": [{"message": {"content": "ok"}}]});
        let client = Arc::new(
            ScriptedClient::new().on("/v1/chat/completions", Ok(HttpResponse::ok_json(&reply))),
        );
        let prober = prober(client, vec!["https://llm.local/v1/chat/completions".into()]);

        assert!(probe(&prober, &Output::new(true)).await.is_ok());
    }
}
