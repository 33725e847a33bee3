//! repodoc - Documentation Generator for Remote Repositories
//!
//! Fetches the text files of a GitLab-style repository over its REST API,
//! groups them into size-bounded chunks and asks a completion service to
//! document each chunk. The completion endpoint is discovered at runtime by
//! probing URL, auth scheme and payload shape combinations; when none works
//! the document is rendered statically instead.
//!
//! ## Quick Start
//!
//! ```ignore
//! use repodoc::{ConfigLoader, DocumentationOrchestrator};
//!
//! let config = ConfigLoader::load()?;
//! let orchestrator = DocumentationOrchestrator::from_config(&config, false)?;
//! let document = orchestrator.run("https://gitlab.example.com/group/app").await?;
//! println!("{}", document.text);
//! ```
//!
//! ## Modules
//!
//! - [`http`]: transport seam, reqwest client, retry with backoff
//! - [`repository`]: project resolution, file listing, content decoding
//! - [`content`]: file filtering and chunking
//! - [`llm`]: endpoint catalog, prober, completion client, prompts
//! - [`pipeline`]: orchestration, cancellation, static fallback, assembly
//! - [`config`]: layered configuration

pub mod cli;
pub mod config;
pub mod constants;
pub mod content;
pub mod http;
pub mod llm;
pub mod pipeline;
pub mod repository;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

pub use config::{Config, ConfigLoader};
pub use types::{ErrorKind, ProjectMetadata, RepoDocError, Result};

// =============================================================================
// Pipeline Re-exports
// =============================================================================

pub use pipeline::{
    DocumentationOrchestrator, GeneratedDocument, GenerationMode, RunMetadata, StatusEvent,
    StatusSink,
};

pub use content::{Chunk, Chunker, FileFilter};
pub use llm::{EndpointCatalog, EndpointProber, ProbeReport, ProbeState};
pub use repository::{RepositoryClient, RepositorySource};
