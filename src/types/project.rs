//! Project-level type definitions
//!
//! Metadata describing the repository being documented. Shared by the completion
//! prompts, the static renderer and the document footer.

use serde::{Deserialize, Serialize};

/// Descriptive metadata resolved from the repository API
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    /// Short project name
    pub name: String,
    /// Namespaced path (`group/sub/project`)
    pub path: String,
    /// Free-form description, if the host provides one
    pub description: Option<String>,
    /// Browser URL of the project
    pub web_url: String,
    /// Default branch reported by the host
    pub default_branch: Option<String>,
}

impl ProjectMetadata {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_web_url(mut self, web_url: impl Into<String>) -> Self {
        self.web_url = web_url.into();
        self
    }

    /// Description or a placeholder suitable for prompts and headers
    pub fn description_or_default(&self) -> &str {
        self.description
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or("No description provided")
    }
}
