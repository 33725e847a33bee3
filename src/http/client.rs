//! reqwest-backed [`HttpClient`]
//!
//! Keeps a verifying and a non-verifying client side by side; the request's
//! `verify_tls` flag picks one. Errors are classified into [`TransportError`]
//! so callers never inspect reqwest types.

use async_trait::async_trait;
use std::error::Error as StdError;
use std::io;
use std::time::Duration;
use tracing::debug;

use super::{HttpClient, HttpRequest, HttpResponse, Method, TransportError};
use crate::config::TransportConfig;
use crate::types::{RepoDocError, Result};

/// Markers in error source chains that identify certificate/handshake failures
const TLS_MARKERS: &[&str] = &["certificate", "tls", "ssl", "handshake"];

pub struct ReqwestClient {
    secure: reqwest::Client,
    insecure: reqwest::Client,
}

impl std::fmt::Debug for ReqwestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestClient").finish_non_exhaustive()
    }
}

impl ReqwestClient {
    pub fn new(config: &TransportConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let connect_timeout = Duration::from_secs(config.connect_timeout_secs);

        let build = |accept_invalid: bool| {
            reqwest::Client::builder()
                .timeout(timeout)
                .connect_timeout(connect_timeout)
                .user_agent(concat!("repodoc/", env!("CARGO_PKG_VERSION")))
                .danger_accept_invalid_certs(accept_invalid)
                .build()
                .map_err(|e| RepoDocError::Config(format!("Failed to create HTTP client: {}", e)))
        };

        Ok(Self {
            secure: build(false)?,
            insecure: build(true)?,
        })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn execute(
        &self,
        request: &HttpRequest,
    ) -> std::result::Result<HttpResponse, TransportError> {
        let client = if request.verify_tls {
            &self.secure
        } else {
            &self.insecure
        };

        let mut builder = match request.method {
            Method::Get => client.get(&request.url),
            Method::Post => client.post(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        debug!(method = %request.method, url = %request.url, "Sending request");

        let response = builder.send().await.map_err(classify_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(classify_error)?;

        Ok(HttpResponse { status, body })
    }
}

/// Map a reqwest error onto the transport taxonomy
fn classify_error(err: reqwest::Error) -> TransportError {
    let message = error_chain(&err);
    if err.is_timeout() {
        TransportError::Timeout
    } else if is_tls_failure(&err) {
        TransportError::Tls(message)
    } else if err.is_decode() || err.is_body() {
        TransportError::Decoded(message)
    } else {
        TransportError::ConnectionFailed(message)
    }
}

/// Flatten an error and its sources into one line
fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(cause) = source {
        parts.push(cause.to_string());
        source = cause.source();
    }
    parts.join(": ")
}

/// Certificate and handshake failures in the source chain.
///
/// rustls errors reach us as `io::ErrorKind::InvalidData`. The outer error is
/// never inspected: its `Display` carries the request URL.
fn is_tls_failure(err: &(dyn StdError + 'static)) -> bool {
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io_err) = cause.downcast_ref::<io::Error>()
            && io_err.kind() == io::ErrorKind::InvalidData
        {
            return true;
        }
        let text = cause.to_string().to_lowercase();
        if TLS_MARKERS.iter().any(|marker| text.contains(marker)) {
            return true;
        }
        source = cause.source();
    }
    false
}
