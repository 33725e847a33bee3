//! HTTP Transport Layer
//!
//! A minimal request/response model shared by the repository client and the
//! completion endpoints, plus the [`HttpClient`] seam they are built on.
//!
//! ## Modules
//!
//! - `client`: reqwest-backed implementation with a TLS-verification toggle
//! - `retry`: bounded retry with exponential backoff on transient statuses

mod client;
mod retry;

pub use client::ReqwestClient;
pub use retry::{RetryPolicy, RetryingTransport};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Headers whose values are never printed
const SENSITIVE_HEADERS: &[&str] = &["authorization", "private-token", "x-api-key", "api-key"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
        }
    }
}

/// Outbound request description
#[derive(Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Verify the server certificate (disabled only for the TLS fallback retry)
    pub verify_tls: bool,
}

impl std::fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let headers: Vec<(&str, &str)> = self
            .headers
            .iter()
            .map(|(name, value)| {
                if SENSITIVE_HEADERS.contains(&name.to_ascii_lowercase().as_str()) {
                    (name.as_str(), "[REDACTED]")
                } else {
                    (name.as_str(), value.as_str())
                }
            })
            .collect();
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &headers)
            .field("has_body", &self.body.is_some())
            .field("verify_tls", &self.verify_tls)
            .finish()
    }
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            verify_tls: true,
        }
    }

    pub fn post_json(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: Some(body),
            verify_tls: true,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn verify_tls(mut self, verify: bool) -> Self {
        self.verify_tls = verify;
        self
    }

    /// Value of the first header with this name (case-insensitive)
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Response with its body fully read as text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn ok_json(value: &Value) -> Self {
        Self::new(200, value.to_string())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-success status into [`TransportError::HttpStatus`]
    pub fn error_for_status(self) -> Result<Self, TransportError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(TransportError::HttpStatus {
                status: self.status,
                body: self.body,
            })
        }
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TransportError> {
        serde_json::from_str(&self.body).map_err(|e| TransportError::Decoded(e.to_string()))
    }
}

/// Classified transport failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("TLS failure: {0}")]
    Tls(String),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// Transient status still returned after the last allowed attempt
    #[error("HTTP {status} after {attempts} attempts")]
    RetriesExhausted { status: u16, attempts: u32 },

    #[error("failed to decode response: {0}")]
    Decoded(String),
}

impl TransportError {
    /// Failures that the retry policy may repeat within its attempt budget
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Timeout | Self::ConnectionFailed(_))
    }
}

/// Executes a single HTTP exchange, no retries
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

pub type SharedHttpClient = Arc<dyn HttpClient>;
