//! Endpoint Discovery
//!
//! Walks the candidate catalog once and commits to the first combination the
//! service accepts.
//!
//! ## State machine
//!
//! `Untested -> Probing(candidate) -> Bound(binding) | Exhausted`
//!
//! ## Response classification
//!
//! | Response            | Meaning                     | Next step           |
//! |---------------------|-----------------------------|---------------------|
//! | 2xx                 | works                       | bind                |
//! | 429                 | real service, throttled     | bind                |
//! | 401 / 403           | credentials rejected        | next auth scheme    |
//! | 404                 | path does not exist         | next URL            |
//! | connection, timeout | unreachable                 | next URL            |
//! | 400 / 405 / other   | payload shape not accepted  | next payload shape  |
//!
//! With a single auth scheme, "next auth scheme" is the same as "next URL".
//! The result is cached; later completion failures never trigger a re-probe.

use secrecy::SecretString;
use std::sync::{Mutex, PoisonError};
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

use super::catalog::{CompletionRequest, EndpointCandidate, EndpointCatalog};
use crate::constants::completion::{PROBE_MAX_TOKENS, PROBE_PROMPT};
use crate::http::{HttpRequest, HttpResponse, RetryPolicy, RetryingTransport, TransportError};

const PROBE_SYSTEM: &str = "You are a connectivity check.";

/// Classified response to one probe request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Works,
    Throttled,
    BadCredentials(u16),
    WrongPayload(u16),
    NotFound,
    Unreachable(String),
}

/// Where to go after an outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Bind,
    NextPayload,
    NextAuth,
    NextUrl,
}

impl ProbeOutcome {
    pub fn classify(result: &Result<HttpResponse, TransportError>) -> Self {
        match result {
            Ok(response) if response.is_success() => Self::Works,
            Ok(response) => match response.status {
                429 => Self::Throttled,
                401 | 403 => Self::BadCredentials(response.status),
                404 => Self::NotFound,
                status => Self::WrongPayload(status),
            },
            Err(err) => Self::Unreachable(err.to_string()),
        }
    }

    fn step(&self) -> Step {
        match self {
            Self::Works | Self::Throttled => Step::Bind,
            Self::WrongPayload(_) => Step::NextPayload,
            Self::BadCredentials(_) => Step::NextAuth,
            Self::NotFound | Self::Unreachable(_) => Step::NextUrl,
        }
    }
}

impl std::fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Works => write!(f, "works"),
            Self::Throttled => write!(f, "throttled (429), accepted"),
            Self::BadCredentials(status) => write!(f, "credentials rejected ({})", status),
            Self::WrongPayload(status) => write!(f, "payload rejected ({})", status),
            Self::NotFound => write!(f, "not found (404)"),
            Self::Unreachable(cause) => write!(f, "unreachable: {}", cause),
        }
    }
}

/// The candidate the session is committed to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointBinding {
    pub candidate: EndpointCandidate,
    /// Bound on a 429 rather than a success
    pub throttled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeAttempt {
    pub candidate: EndpointCandidate,
    pub outcome: ProbeOutcome,
}

/// Full discovery trace
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeReport {
    pub attempts: Vec<ProbeAttempt>,
    pub binding: Option<EndpointBinding>,
    /// Combinations in the catalog
    pub catalog_size: usize,
}

impl ProbeReport {
    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeState {
    Untested,
    Probing(EndpointCandidate),
    Bound(EndpointBinding),
    Exhausted,
}

pub struct EndpointProber {
    transport: RetryingTransport,
    catalog: EndpointCatalog,
    api_key: Option<SecretString>,
    model: String,
    state: Mutex<ProbeState>,
    report: OnceCell<ProbeReport>,
}

impl std::fmt::Debug for EndpointProber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointProber")
            .field("catalog", &self.catalog)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .field("state", &self.state())
            .finish()
    }
}

impl EndpointProber {
    /// Probing always uses a single attempt per candidate, whatever policy
    /// `transport` was built with, so a 429 is observed rather than retried.
    pub fn new(
        transport: &RetryingTransport,
        catalog: EndpointCatalog,
        api_key: Option<SecretString>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            transport: transport.with_policy(RetryPolicy::single_attempt()),
            catalog,
            api_key,
            model: model.into(),
            state: Mutex::new(ProbeState::Untested),
            report: OnceCell::new(),
        }
    }

    pub fn catalog(&self) -> &EndpointCatalog {
        &self.catalog
    }

    pub fn state(&self) -> ProbeState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn transition(&self, next: ProbeState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = next;
    }

    /// Run discovery once; later calls return the cached report
    pub async fn discover(&self) -> &ProbeReport {
        self.report.get_or_init(|| self.probe_all()).await
    }

    /// Cached binding, without probing
    pub fn binding(&self) -> Option<&EndpointBinding> {
        self.report.get().and_then(|r| r.binding.as_ref())
    }

    fn probe_request(&self, candidate: &EndpointCandidate) -> HttpRequest {
        let body = candidate.payload.build(&CompletionRequest {
            model: &self.model,
            system: PROBE_SYSTEM,
            prompt: PROBE_PROMPT,
            temperature: 0.0,
            max_tokens: PROBE_MAX_TOKENS,
        });
        candidate
            .auth
            .apply(HttpRequest::post_json(&candidate.url, body), self.api_key.as_ref())
    }

    #[instrument(skip(self), fields(candidates = self.catalog.len()))]
    async fn probe_all(&self) -> ProbeReport {
        let mut report = ProbeReport {
            catalog_size: self.catalog.len(),
            ..ProbeReport::default()
        };

        'urls: for url in &self.catalog.urls {
            'auths: for auth in &self.catalog.auth_schemes {
                for payload in &self.catalog.payload_shapes {
                    let candidate = EndpointCandidate {
                        url: url.clone(),
                        auth: *auth,
                        payload: *payload,
                    };
                    self.transition(ProbeState::Probing(candidate.clone()));

                    let result = self.transport.send(&self.probe_request(&candidate)).await;
                    let outcome = ProbeOutcome::classify(&result);
                    debug!(candidate = %candidate, outcome = %outcome, "Probe attempt");

                    let step = outcome.step();
                    report.attempts.push(ProbeAttempt {
                        candidate: candidate.clone(),
                        outcome: outcome.clone(),
                    });

                    match step {
                        Step::Bind => {
                            let binding = EndpointBinding {
                                candidate,
                                throttled: outcome == ProbeOutcome::Throttled,
                            };
                            info!(
                                endpoint = %binding.candidate,
                                attempts = report.attempts.len(),
                                "Completion endpoint bound"
                            );
                            self.transition(ProbeState::Bound(binding.clone()));
                            report.binding = Some(binding);
                            return report;
                        }
                        Step::NextPayload => continue,
                        Step::NextAuth => continue 'auths,
                        Step::NextUrl => continue 'urls,
                    }
                }
            }
        }

        warn!(
            attempts = report.attempts.len(),
            "No completion endpoint responded, using static documentation"
        );
        self.transition(ProbeState::Exhausted);
        report
    }
}
