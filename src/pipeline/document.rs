//! Document assembly
//!
//! Stitches the title, the body (AI sections or static rendering) and the
//! metadata footer into the final Markdown document.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::content::Chunk;
use crate::llm::CompletionResult;
use crate::types::ProjectMetadata;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    Ai,
    Static,
}

impl std::fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ai => write!(f, "ai"),
            Self::Static => write!(f, "static"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub path: String,
    pub reason: String,
}

/// Facts about one run, rendered into the footer
#[derive(Debug, Clone, Serialize)]
pub struct RunMetadata {
    pub project: ProjectMetadata,
    pub repository_url: String,
    pub branches: Vec<String>,
    pub files_listed: usize,
    pub files_selected: usize,
    pub files_processed: usize,
    pub skipped: Vec<SkippedFile>,
    pub chunks: usize,
    pub failed_chunks: usize,
    pub mode: GenerationMode,
    pub endpoint: Option<String>,
    pub generated_at: DateTime<Utc>,
}

/// Final output of a run
#[derive(Debug, Clone)]
pub struct GeneratedDocument {
    pub text: String,
    pub metadata: RunMetadata,
}

/// Text embedded in place of a section whose completion failed
pub fn diagnostic(reason: &str) -> String {
    format!("> **Documentation unavailable for this section.** {}", reason)
}

fn title(project: &ProjectMetadata) -> String {
    let mut out = format!("# {} Documentation\n\n", project.name);
    if let Some(description) = project.description.as_deref().filter(|d| !d.trim().is_empty()) {
        out.push_str(&format!("> {}\n\n", description.trim()));
    }
    out
}

/// Body for AI mode: overview, then one section per chunk in chunk order
pub fn assemble_ai(
    project: &ProjectMetadata,
    overview: &CompletionResult,
    chunks: &[Chunk],
    sections: &[CompletionResult],
) -> String {
    let mut out = title(project);

    out.push_str("## Overview\n\n");
    out.push_str(&section_text(overview));
    out.push_str("\n\n");

    for (index, (chunk, section)) in chunks.iter().zip(sections).enumerate() {
        let paths: Vec<String> = chunk.paths().map(|p| format!("`{}`", p)).collect();
        out.push_str(&format!(
            "## Part {} of {}\n\n*Files: {}*\n\n",
            index + 1,
            chunks.len(),
            paths.join(", ")
        ));
        out.push_str(&section_text(section));
        out.push_str("\n\n");
    }

    out
}

/// Body for static mode
pub fn assemble_static(project: &ProjectMetadata, rendered: &str) -> String {
    format!("{}{}\n\n", title(project), rendered.trim_end())
}

fn section_text(result: &CompletionResult) -> String {
    match result {
        CompletionResult::Text(text) => text.trim().to_string(),
        CompletionResult::Failed { reason } => diagnostic(reason),
    }
}

pub fn footer(metadata: &RunMetadata) -> String {
    let mut out = String::from("---\n\n## Generation Metadata\n\n");
    out.push_str(&format!(
        "- Generated: {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out.push_str(&format!("- Repository: {}\n", metadata.repository_url));
    out.push_str(&format!("- Branches tried: {}\n", metadata.branches.join(", ")));
    out.push_str(&format!(
        "- Files processed: {} of {} selected ({} listed)\n",
        metadata.files_processed, metadata.files_selected, metadata.files_listed
    ));
    out.push_str(&format!("- Files skipped: {}\n", metadata.skipped.len()));
    out.push_str(&format!("- Chunks: {}", metadata.chunks));
    if metadata.failed_chunks > 0 {
        out.push_str(&format!(" ({} failed)", metadata.failed_chunks));
    }
    out.push('\n');
    out.push_str(&format!("- Mode: {}\n", metadata.mode));
    if let Some(endpoint) = &metadata.endpoint {
        out.push_str(&format!("- Endpoint: {}\n", endpoint));
    }

    if !metadata.skipped.is_empty() {
        out.push_str("\n### Skipped Files\n\n");
        for file in &metadata.skipped {
            out.push_str(&format!("- `{}`: {}\n", file.path, file.reason));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Chunker;

    fn metadata() -> RunMetadata {
        RunMetadata {
            project: ProjectMetadata::new("app", "group/app"),
            repository_url: "https://gitlab.example.com/group/app".into(),
            branches: vec!["main".into(), "master".into()],
            files_listed: 10,
            files_selected: 4,
            files_processed: 3,
            skipped: vec![SkippedFile {
                path: "bad.rs".into(),
                reason: "not found on any branch (main, master)".into(),
            }],
            chunks: 2,
            failed_chunks: 1,
            mode: GenerationMode::Ai,
            endpoint: Some("https://llm.local/v1/chat/completions".into()),
            generated_at: Utc::now(),
        }
    }

    #[test]
    fn test_footer_reports_counts() {
        let text = footer(&metadata());
        assert!(text.contains("- Files processed: 3 of 4 selected (10 listed)"));
        assert!(text.contains("- Files skipped: 1"));
        assert!(text.contains("- Chunks: 2 (1 failed)"));
        assert!(text.contains("- Mode: ai"));
        assert!(text.contains("- Endpoint: https://llm.local/v1/chat/completions"));
        assert!(text.contains("- `bad.rs`: not found on any branch"));
    }

    #[test]
    fn test_ai_sections_follow_chunk_order_with_diagnostics() {
        let chunks = Chunker::new(10).chunk([("a.rs", "aaaaaaaaaaaa"), ("b.rs", "bbbbbbbbbbbb")]);
        let sections = vec![
            CompletionResult::Text("about a".into()),
            CompletionResult::Failed {
                reason: "HTTP 500".into(),
            },
        ];
        let project = ProjectMetadata::new("app", "group/app").with_description("Billing");
        let text = assemble_ai(
            &project,
            &CompletionResult::Text("overview".into()),
            &chunks,
            &sections,
        );

        assert!(text.starts_with("# app Documentation\n\n> Billing\n\n## Overview\n\noverview"));
        let first = text.find("## Part 1 of 2").unwrap();
        let second = text.find("## Part 2 of 2").unwrap();
        assert!(first < text.find("about a").unwrap());
        assert!(second > text.find("about a").unwrap());
        assert!(text.contains("*Files: `b.rs`*"));
        assert!(text.contains(&diagnostic("HTTP 500")));
    }
}
