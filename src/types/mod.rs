pub mod error;
pub mod project;

pub use error::{ErrorKind, RepoDocError, Result};
pub use project::ProjectMetadata;
