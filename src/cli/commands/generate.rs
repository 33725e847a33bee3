//! Generate Command
//!
//! Usage:
//!   repodoc generate <url> [-o FILE | --stdout] [--static] [--max-files N]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::cli::progress::ConsoleSink;
use crate::cli::ui::Output;
use crate::config::{Config, ConfigLoader};
use crate::pipeline::{DocumentationOrchestrator, GeneratedDocument, GenerationMode};
use crate::types::Result;

/// Command-line overrides layered over the loaded configuration
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub token: Option<String>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub max_files: Option<usize>,
    pub max_chunk_size: Option<usize>,
    pub deadline_secs: Option<u64>,
    pub insecure: bool,
}

impl Overrides {
    pub fn apply(&self, config: &mut Config) {
        if let Some(token) = &self.token {
            config.repository.token = Some(token.clone());
        }
        if let Some(key) = &self.api_key {
            config.completion.api_key = Some(key.clone());
        }
        if let Some(url) = &self.base_url {
            config.completion.base_url = Some(url.clone());
        }
        if let Some(max) = self.max_files {
            config.generation.max_files = max;
        }
        if let Some(size) = self.max_chunk_size {
            config.generation.max_chunk_size = size;
        }
        if self.deadline_secs.is_some() {
            config.generation.deadline_secs = self.deadline_secs;
        }
        if self.insecure {
            config.repository.verify_tls = false;
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub url: String,
    pub output: Option<PathBuf>,
    pub stdout: bool,
    pub static_only: bool,
    pub overrides: Overrides,
}

pub async fn run(options: GenerateOptions, out: Output, token: CancellationToken) -> Result<()> {
    let mut config = ConfigLoader::load()?;
    options.overrides.apply(&mut config);
    config.validate()?;

    let mut orchestrator = DocumentationOrchestrator::from_config(&config, options.static_only)?
        .with_cancellation(token);
    if !out.is_quiet() && !options.stdout {
        orchestrator = orchestrator.with_sink(Arc::new(ConsoleSink::new()));
    }

    out.header(&format!("Documenting {}", options.url));
    let document = orchestrator.run(&options.url).await?;

    if options.stdout {
        out.result(&document.text);
        return Ok(());
    }

    let path = options
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&config.generation.output_dir, &document));
    write_document(&path, &document.text)?;
    info!(path = %path.display(), bytes = document.text.len(), "Document written");

    summarize(&out, &document, &path);
    Ok(())
}

fn summarize(out: &Output, document: &GeneratedDocument, path: &Path) {
    let meta = &document.metadata;
    out.success(&format!("Documentation written to {}", path.display()));
    out.field("Project", &meta.project.path);
    out.field(
        "Files",
        format!(
            "{} processed, {} skipped",
            meta.files_processed,
            meta.skipped.len()
        ),
    );
    out.field("Chunks", meta.chunks);
    match meta.mode {
        GenerationMode::Ai => {
            out.field("Mode", "ai");
            if let Some(endpoint) = &meta.endpoint {
                out.field("Endpoint", endpoint);
            }
        }
        GenerationMode::Static => out.field("Mode", "static (no completion endpoint)"),
    }
    if meta.failed_chunks > 0 {
        out.warning(&format!(
            "{} of {} sections could not be generated and contain diagnostics",
            meta.failed_chunks, meta.chunks
        ));
    }
}

/// `<output_dir>/<project>-docs.md`
pub fn default_output_path(output_dir: &Path, document: &GeneratedDocument) -> PathBuf {
    let name: String = document
        .metadata
        .project
        .name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '-'
            }
        })
        .collect();
    let name = name.trim_matches(['-', '.']);
    let name = if name.is_empty() { "project" } else { name };
    output_dir.join(format!("{}-docs.md", name))
}

fn write_document(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, text)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::RunMetadata;
    use crate::types::ProjectMetadata;
    use chrono::Utc;

    fn document(name: &str) -> GeneratedDocument {
        GeneratedDocument {
            text: "# Docs\n".into(),
            metadata: RunMetadata {
                project: ProjectMetadata::new(name, "group/app"),
                repository_url: "https://gitlab.example.com/group/app".into(),
                branches: vec!["main".into()],
                files_listed: 1,
                files_selected: 1,
                files_processed: 1,
                skipped: Vec::new(),
                chunks: 1,
                failed_chunks: 0,
                mode: GenerationMode::Static,
                endpoint: None,
                generated_at: Utc::now(),
            },
        }
    }

    #[test]
    fn test_default_output_path_sanitizes_name() {
        let dir = Path::new("out");
        assert_eq!(
            default_output_path(dir, &document("billing-api")),
            PathBuf::from("out/billing-api-docs.md")
        );
        assert_eq!(
            default_output_path(dir, &document("My App")),
            PathBuf::from("out/My-App-docs.md")
        );
        assert_eq!(
            default_output_path(dir, &document("../")),
            PathBuf::from("out/project-docs.md")
        );
    }

    #[test]
    fn test_overrides_layer_over_config() {
        let mut config = Config::default();
        Overrides {
            token: Some("glpat-x".into()),
            max_files: Some(7),
            deadline_secs: Some(60),
            insecure: true,
            ..Overrides::default()
        }
        .apply(&mut config);

        assert_eq!(config.repository.token.as_deref(), Some("glpat-x"));
        assert_eq!(config.generation.max_files, 7);
        assert_eq!(config.generation.deadline_secs, Some(60));
        assert!(!config.repository.verify_tls);
        assert_eq!(config.completion.api_key, None);
    }

    #[test]
    fn test_write_document_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/docs.md");
        write_document(&path, "hello").unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "hello");
    }
}
