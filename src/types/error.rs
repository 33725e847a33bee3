//! Unified Error Type System
//!
//! Centralized error types for the entire application.
//!
//! ## Propagation Tiers
//!
//! - **Terminal**: project resolution, zero readable files, cancellation. These abort a run.
//! - **Local**: per-file fetch failures and per-chunk completion failures. These are recovered
//!   where they happen and never reach the caller of the pipeline.
//!
//! Every error maps to an [`ErrorKind`] so callers can branch without matching on
//! message text, and every kind carries an actionable hint for the terminal user.

use std::time::Duration;
use thiserror::Error;

use crate::http::TransportError;

// =============================================================================
// Error Kinds
// =============================================================================

/// Flat classification of [`RepoDocError`] for routing decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    AuthenticationFailed,
    NotFound,
    ConnectionFailed,
    Timeout,
    /// Transient status that survived every retry
    TransientHttp,
    /// Any other non-success status
    HttpStatus,
    Tls,
    DecodeFailed,
    NoReadableFiles,
    EndpointsExhausted,
    UnexpectedResponseShape,
    Cancelled,
    Config,
    InvalidUrl,
    Io,
    Json,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::AuthenticationFailed => "AUTH",
            Self::NotFound => "NOT_FOUND",
            Self::ConnectionFailed => "CONNECTION",
            Self::Timeout => "TIMEOUT",
            Self::TransientHttp => "TRANSIENT_HTTP",
            Self::HttpStatus => "HTTP_STATUS",
            Self::Tls => "TLS",
            Self::DecodeFailed => "DECODE",
            Self::NoReadableFiles => "NO_READABLE_FILES",
            Self::EndpointsExhausted => "ENDPOINTS_EXHAUSTED",
            Self::UnexpectedResponseShape => "UNEXPECTED_RESPONSE",
            Self::Cancelled => "CANCELLED",
            Self::Config => "CONFIG",
            Self::InvalidUrl => "INVALID_URL",
            Self::Io => "IO",
            Self::Json => "JSON",
        };
        write!(f, "{}", label)
    }
}

impl ErrorKind {
    /// Actionable hint shown next to terminal errors
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::AuthenticationFailed => {
                Some("check credentials: the access token may be missing, expired or lack scope")
            }
            Self::NotFound => {
                Some("check the repository URL and that the token can see this project")
            }
            Self::ConnectionFailed => Some("check network/VPN connectivity and the host name"),
            Self::Timeout => Some("check network/VPN connectivity or raise transport.timeout_secs"),
            Self::TransientHttp => Some("the server is overloaded or rate limiting; retry later"),
            Self::Tls => Some(
                "check the server certificate or set repository.verify_tls = false for self-signed hosts",
            ),
            Self::NoReadableFiles => Some(
                "check the branch list and the extension allow-list; no file could be fetched",
            ),
            Self::EndpointsExhausted => {
                Some("check completion.base_url and completion.api_key, or run 'repodoc probe'")
            }
            Self::Config => {
                Some("run 'repodoc config show' to inspect the effective configuration")
            }
            Self::InvalidUrl => {
                Some("expected a URL like https://gitlab.example.com/group/project")
            }
            _ => None,
        }
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum RepoDocError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // -------------------------------------------------------------------------
    // Remote API Errors
    // -------------------------------------------------------------------------
    #[error("Authentication failed for {context} (HTTP {status})")]
    AuthenticationFailed { context: String, status: u16 },

    #[error("Not found: {context}")]
    NotFound { context: String },

    #[error("Connection failed for {context}: {cause}")]
    ConnectionFailed { context: String, cause: String },

    #[error("Timeout after {duration:?}: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    #[error("HTTP {status} persisted after {attempts} attempts: {context}")]
    TransientHttp {
        context: String,
        status: u16,
        attempts: u32,
    },

    #[error("HTTP {status} for {context}: {body}")]
    HttpStatus {
        context: String,
        status: u16,
        body: String,
    },

    #[error("TLS failure for {context}: {cause}")]
    Tls { context: String, cause: String },

    #[error("Failed to decode {path}: {reason}")]
    DecodeFailed { path: String, reason: String },

    // -------------------------------------------------------------------------
    // Pipeline Errors
    // -------------------------------------------------------------------------
    #[error("No readable files in {project} ({attempted} attempted)")]
    NoReadableFiles { project: String, attempted: usize },

    #[error("No completion endpoint responded ({tried} candidates tried)")]
    EndpointsExhausted { tried: usize },

    #[error("Unexpected response format: {0}")]
    UnexpectedResponseShape(String),

    #[error("Cancelled during {operation}")]
    Cancelled { operation: String },

    // -------------------------------------------------------------------------
    // Input Errors
    // -------------------------------------------------------------------------
    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid repository URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

pub type Result<T> = std::result::Result<T, RepoDocError>;

// =============================================================================
// Helper Functions
// =============================================================================

impl RepoDocError {
    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a cancellation error
    pub fn cancelled(operation: impl Into<String>) -> Self {
        Self::Cancelled {
            operation: operation.into(),
        }
    }

    /// Convert a transport failure into a classified error.
    ///
    /// `context` names what was being requested ("project lookup for group/app").
    /// `timeout` is the configured per-request timeout, used for the message only.
    pub fn from_transport(err: TransportError, context: &str, timeout: Duration) -> Self {
        let context = context.to_string();
        match err {
            TransportError::Timeout => Self::Timeout {
                operation: context,
                duration: timeout,
            },
            TransportError::ConnectionFailed(cause) => Self::ConnectionFailed { context, cause },
            TransportError::Tls(cause) => Self::Tls { context, cause },
            TransportError::Decoded(reason) => Self::DecodeFailed {
                path: context,
                reason,
            },
            TransportError::RetriesExhausted { status, attempts } => Self::TransientHttp {
                context,
                status,
                attempts,
            },
            TransportError::HttpStatus { status, body } => Self::from_status(status, body, context),
        }
    }

    /// Classify a final HTTP status
    pub fn from_status(status: u16, body: String, context: String) -> Self {
        match status {
            401 | 403 => Self::AuthenticationFailed { context, status },
            404 => Self::NotFound { context },
            _ => Self::HttpStatus {
                context,
                status,
                body,
            },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) => ErrorKind::Io,
            Self::Json(_) => ErrorKind::Json,
            Self::AuthenticationFailed { .. } => ErrorKind::AuthenticationFailed,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::ConnectionFailed { .. } => ErrorKind::ConnectionFailed,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::TransientHttp { .. } => ErrorKind::TransientHttp,
            Self::HttpStatus { .. } => ErrorKind::HttpStatus,
            Self::Tls { .. } => ErrorKind::Tls,
            Self::DecodeFailed { .. } => ErrorKind::DecodeFailed,
            Self::NoReadableFiles { .. } => ErrorKind::NoReadableFiles,
            Self::EndpointsExhausted { .. } => ErrorKind::EndpointsExhausted,
            Self::UnexpectedResponseShape(_) => ErrorKind::UnexpectedResponseShape,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::Config(_) => ErrorKind::Config,
            Self::InvalidUrl { .. } => ErrorKind::InvalidUrl,
        }
    }

    /// Actionable hint for this error, if one applies
    pub fn hint(&self) -> Option<&'static str> {
        self.kind().hint()
    }

    /// Render the error with its hint for terminal output
    pub fn with_hint(&self) -> String {
        match self.hint() {
            Some(hint) => format!("{}\n  hint: {}", self, hint),
            None => self.to_string(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
