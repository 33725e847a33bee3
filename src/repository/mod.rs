//! Remote Repository Access
//!
//! Resolves a project URL, lists its files and fetches their contents over a
//! GitLab-style REST API.
//!
//! ## Modules
//!
//! - `locator`: URL parsing and API URL construction
//! - `client`: project lookup, paginated tree listing, branch fallback
//! - `decode`: base64 / UTF-8 / single-byte content decoding

mod client;
mod decode;
mod locator;

pub use client::RepositoryClient;
pub use decode::{binary_placeholder, decode_bytes, decode_content};
pub use locator::ProjectLocator;

use async_trait::async_trait;
use serde::Deserialize;

use crate::types::{ProjectMetadata, Result};

/// Immutable identity of the project being documented
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryReference {
    pub locator: ProjectLocator,
    /// Numeric project id as returned by the lookup
    pub project_id: String,
    /// Branches tried in order when fetching contents
    pub branches: Vec<String>,
    pub metadata: ProjectMetadata,
}

impl RepositoryReference {
    pub fn display_url(&self) -> String {
        if self.metadata.web_url.is_empty() {
            self.locator.to_string()
        } else {
            self.metadata.web_url.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Blob,
    Tree,
    /// Submodules and anything else the server reports
    #[serde(other)]
    Other,
}

/// One record from the tree listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: String,
    pub kind: EntryKind,
}

impl FileEntry {
    pub fn blob(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::Blob,
        }
    }

    /// Lowercased extension of the final path component
    pub fn extension(&self) -> Option<String> {
        let name = self.file_name();
        let (stem, ext) = name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }

    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// Why a file produced no content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    /// Every candidate branch answered 404
    NotFound { branches: Vec<String> },
    /// A non-404 status ended the branch walk
    Status { branch: String, status: u16 },
    /// Transport failure after retries
    Transport { branch: String, message: String },
    /// The file URL could not be built
    InvalidPath(String),
}

impl std::fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { branches } => {
                write!(f, "not found on any branch ({})", branches.join(", "))
            }
            Self::Status { branch, status } => write!(f, "HTTP {} on branch {}", status, branch),
            Self::Transport { branch, message } => write!(f, "{} (branch {})", message, branch),
            Self::InvalidPath(reason) => write!(f, "invalid path: {}", reason),
        }
    }
}

/// How a file's text was obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeOutcome {
    Utf8,
    BinaryPlaceholder { bytes: usize },
    Undecodable { reason: String },
    FetchError(FetchFailure),
}

impl DecodeOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Utf8 => "utf8",
            Self::BinaryPlaceholder { .. } => "binary",
            Self::Undecodable { .. } => "undecodable",
            Self::FetchError(_) => "fetch-error",
        }
    }
}

/// Result of fetching one path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContent {
    pub path: String,
    pub text: String,
    pub outcome: DecodeOutcome,
    /// Branch the content came from
    pub branch: Option<String>,
}

impl FileContent {
    pub fn failed(path: impl Into<String>, failure: FetchFailure) -> Self {
        Self {
            path: path.into(),
            text: String::new(),
            outcome: DecodeOutcome::FetchError(failure),
            branch: None,
        }
    }

    /// Whether this content is forwarded to chunking and rendering
    pub fn is_readable(&self) -> bool {
        matches!(
            self.outcome,
            DecodeOutcome::Utf8 | DecodeOutcome::BinaryPlaceholder { .. }
        )
    }

    /// Human-readable reason for unreadable content
    pub fn failure_reason(&self) -> Option<String> {
        match &self.outcome {
            DecodeOutcome::Undecodable { reason } => Some(reason.clone()),
            DecodeOutcome::FetchError(failure) => Some(failure.to_string()),
            _ => None,
        }
    }
}

/// Repository capability consumed by the pipeline
#[async_trait]
pub trait RepositorySource: Send + Sync {
    async fn resolve_project(&self, url: &str) -> Result<RepositoryReference>;

    /// Blob entries only, in server order
    async fn list_files(&self, reference: &RepositoryReference) -> Result<Vec<FileEntry>>;

    /// Never fails; failures are recorded in the returned outcome
    async fn fetch_file(&self, reference: &RepositoryReference, path: &str) -> FileContent;
}
