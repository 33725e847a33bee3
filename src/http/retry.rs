//! Retrying Transport
//!
//! Wraps an [`HttpClient`] with bounded automatic retry and exponential backoff.
//!
//! ## Policy
//!
//! - Transient statuses (429, 5xx by default) are retried until the attempt budget is spent,
//!   then surface as [`TransportError::RetriesExhausted`]
//! - Timeouts and connection failures share the same attempt budget
//! - Every other status is returned to the caller as a normal response
//! - TLS and decode failures are never retried here

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use tracing::{debug, warn};

use super::{HttpClient, HttpRequest, HttpResponse, TransportError};
use crate::config::TransportConfig;
use crate::constants::transport as transport_constants;

/// Retry configuration for one transport
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Backoff multiplier
    pub backoff_factor: f32,
    /// Statuses that trigger a retry
    pub transient_statuses: Vec<u16>,
    /// Randomize delays
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: transport_constants::MAX_ATTEMPTS,
            base_delay: Duration::from_millis(transport_constants::BASE_DELAY_MS),
            max_delay: Duration::from_secs(transport_constants::MAX_DELAY_SECS),
            backoff_factor: transport_constants::BACKOFF_FACTOR,
            transient_statuses: transport_constants::TRANSIENT_STATUSES.to_vec(),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &TransportConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_secs(config.max_delay_secs),
            backoff_factor: config.backoff_factor,
            transient_statuses: config.transient_statuses.clone(),
            jitter: true,
        }
    }

    /// One attempt, every status passed through untouched.
    ///
    /// Used for endpoint probing, where a 429 is a signal rather than a failure.
    pub fn single_attempt() -> Self {
        Self {
            max_attempts: 1,
            transient_statuses: Vec::new(),
            jitter: false,
            ..Self::default()
        }
    }

    pub fn is_transient_status(&self, status: u16) -> bool {
        self.transient_statuses.contains(&status)
    }

    fn should_retry(&self, err: &TransportError) -> bool {
        match err {
            TransportError::HttpStatus { status, .. } => self.is_transient_status(*status),
            other => other.is_network(),
        }
    }

    fn backoff(&self) -> ExponentialBuilder {
        let builder = ExponentialBuilder::default()
            .with_min_delay(self.base_delay)
            .with_max_delay(self.max_delay)
            .with_factor(self.backoff_factor)
            .with_max_times(self.max_attempts.saturating_sub(1) as usize);
        if self.jitter {
            builder.with_jitter()
        } else {
            builder
        }
    }
}

/// Policy wrapper around an [`HttpClient`]
#[derive(Clone)]
pub struct RetryingTransport {
    client: Arc<dyn HttpClient>,
    policy: RetryPolicy,
}

impl RetryingTransport {
    pub fn new(client: Arc<dyn HttpClient>, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Same underlying client, different policy
    pub fn with_policy(&self, policy: RetryPolicy) -> Self {
        Self {
            client: Arc::clone(&self.client),
            policy,
        }
    }

    /// Send a request, retrying transient failures.
    ///
    /// Non-transient statuses (including 4xx other than the configured transient set)
    /// come back as `Ok` so callers can classify them.
    pub async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let counter = AtomicU32::new(0);
        let attempts = &counter;
        let client = &self.client;
        let policy = &self.policy;

        let result = (move || async move {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            debug!(attempt, url = %request.url, "Transport attempt");
            let response = client.execute(request).await?;
            if policy.is_transient_status(response.status) {
                return Err(TransportError::HttpStatus {
                    status: response.status,
                    body: response.body,
                });
            }
            Ok(response)
        })
        .retry(self.policy.backoff())
        .when(|err| self.policy.should_retry(err))
        .notify(|err, delay| {
            warn!(
                url = %request.url,
                error = %err,
                delay_ms = delay.as_millis() as u64,
                "Transient failure, retrying after backoff"
            );
        })
        .await;

        match result {
            Err(TransportError::HttpStatus { status, .. })
                if self.policy.is_transient_status(status) =>
            {
                Err(TransportError::RetriesExhausted {
                    status,
                    attempts: counter.load(Ordering::SeqCst),
                })
            }
            other => other,
        }
    }
}
