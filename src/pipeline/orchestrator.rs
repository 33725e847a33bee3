//! Documentation Orchestrator
//!
//! Runs one generation request end to end:
//!
//! 1. resolve the project
//! 2. list and filter files
//! 3. fetch up to `max_files` contents (per-file failures are skipped)
//! 4. chunk the readable contents
//! 5. with a bound endpoint: overview plus one completion per chunk, in order;
//!    otherwise the static renderer
//! 6. assemble the document and footer
//!
//! Project resolution, an empty fetch result and cancellation abort the run.
//! Per-chunk completion failures become diagnostics inside the document.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use super::cancel::RunGuard;
use super::document::{
    GeneratedDocument, GenerationMode, RunMetadata, SkippedFile, assemble_ai, assemble_static,
    footer,
};
use super::fallback::FallbackRenderer;
use super::progress::{NoopSink, Stage, StatusEvent, StatusSink};
use super::writer::WriterSource;
use crate::config::GenerationConfig;
use crate::content::{Chunk, Chunker, FileFilter};
use crate::llm::{CompletionResult, DocumentationWriter};
use crate::repository::{FileContent, RepositoryReference, RepositorySource};
use crate::types::{RepoDocError, Result};

pub struct DocumentationOrchestrator {
    repository: Arc<dyn RepositorySource>,
    writers: Arc<dyn WriterSource>,
    fallback: Arc<dyn FallbackRenderer>,
    filter: FileFilter,
    chunker: Chunker,
    max_files: usize,
    sink: Arc<dyn StatusSink>,
    token: CancellationToken,
    deadline: Option<Duration>,
}

/// What the fetch stage produced
struct Fetched {
    files: Vec<FileContent>,
    skipped: Vec<SkippedFile>,
    listed: usize,
    selected: usize,
}

impl DocumentationOrchestrator {
    pub fn new(
        repository: Arc<dyn RepositorySource>,
        writers: Arc<dyn WriterSource>,
        fallback: Arc<dyn FallbackRenderer>,
        filter: FileFilter,
        config: &GenerationConfig,
    ) -> Self {
        Self {
            repository,
            writers,
            fallback,
            filter,
            chunker: Chunker::new(config.max_chunk_size),
            max_files: config.max_files,
            sink: Arc::new(NoopSink),
            token: CancellationToken::new(),
            deadline: config.deadline_secs.map(Duration::from_secs),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn StatusSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    fn emit(&self, event: StatusEvent) {
        self.sink.emit(&event);
    }

    fn started(&self, stage: Stage) {
        self.emit(StatusEvent::StageStarted { stage });
    }

    fn completed(&self, stage: Stage, detail: impl Into<String>) {
        self.emit(StatusEvent::StageCompleted {
            stage,
            detail: detail.into(),
        });
    }

    fn guard(&self) -> RunGuard {
        let guard = RunGuard::new(self.token.clone());
        match self.deadline {
            Some(budget) => guard.with_deadline(budget),
            None => guard,
        }
    }

    /// Generate documentation for the repository at `url`
    #[instrument(skip(self))]
    pub async fn run(&self, url: &str) -> Result<GeneratedDocument> {
        let guard = self.guard();

        self.started(Stage::Resolve);
        let reference = guard
            .run("project lookup", self.repository.resolve_project(url))
            .await?;
        self.completed(Stage::Resolve, reference.metadata.path.clone());

        let fetched = self.collect_files(&guard, &reference).await?;

        self.started(Stage::Chunk);
        let chunks = self.chunker.chunk(
            fetched
                .files
                .iter()
                .map(|f| (f.path.as_str(), f.text.as_str())),
        );
        let stats = self.chunker.stats(&chunks);
        info!(
            chunks = stats.chunks,
            bytes = stats.total_bytes,
            largest = stats.largest,
            oversized = stats.oversized,
            "Content chunked"
        );
        self.completed(Stage::Chunk, format!("{} chunks", chunks.len()));

        self.started(Stage::Probe);
        let writer = guard
            .guard("endpoint discovery", self.writers.writer())
            .await?;
        self.completed(
            Stage::Probe,
            writer
                .as_ref()
                .map(|w| w.endpoint())
                .unwrap_or_else(|| "none, using static documentation".to_string()),
        );

        let project = &reference.metadata;
        let (body, mode, endpoint, failed_chunks) = match writer {
            Some(writer) => {
                let (body, failed) = self
                    .generate_ai(&guard, writer.as_ref(), &reference, &fetched, &chunks)
                    .await?;
                (body, GenerationMode::Ai, Some(writer.endpoint()), failed)
            }
            None => {
                self.started(Stage::Generate);
                let rendered = self.fallback.render(&fetched.files, project);
                self.completed(Stage::Generate, "static");
                (
                    assemble_static(project, &rendered),
                    GenerationMode::Static,
                    None,
                    0,
                )
            }
        };

        self.started(Stage::Assemble);
        let metadata = RunMetadata {
            project: project.clone(),
            repository_url: reference.display_url(),
            branches: reference.branches.clone(),
            files_listed: fetched.listed,
            files_selected: fetched.selected,
            files_processed: fetched.files.len(),
            skipped: fetched.skipped,
            chunks: chunks.len(),
            failed_chunks,
            mode,
            endpoint,
            generated_at: Utc::now(),
        };
        let text = format!("{}{}", body, footer(&metadata));
        self.completed(Stage::Assemble, format!("{} bytes", text.len()));

        info!(
            project = %metadata.project.path,
            mode = %metadata.mode,
            files = metadata.files_processed,
            chunks = metadata.chunks,
            "Documentation generated"
        );

        Ok(GeneratedDocument { text, metadata })
    }

    async fn collect_files(
        &self,
        guard: &RunGuard,
        reference: &RepositoryReference,
    ) -> Result<Fetched> {
        self.started(Stage::List);
        let entries = guard
            .run("file listing", self.repository.list_files(reference))
            .await?;
        self.completed(Stage::List, format!("{} files", entries.len()));

        self.started(Stage::Filter);
        let selected = self.filter.filter(&entries);
        if selected.len() > self.max_files {
            info!(
                selected = selected.len(),
                max_files = self.max_files,
                "File budget reached, remaining files are not fetched"
            );
        }
        let candidates = &selected[..selected.len().min(self.max_files)];
        self.completed(
            Stage::Filter,
            format!("{} of {} selected", candidates.len(), entries.len()),
        );

        self.started(Stage::Fetch);
        let total = candidates.len();
        let mut files = Vec::with_capacity(total);
        let mut skipped = Vec::new();
        for (index, entry) in candidates.iter().enumerate() {
            let content = guard
                .guard("file fetch", self.repository.fetch_file(reference, &entry.path))
                .await?;
            let readable = content.is_readable();
            self.emit(StatusEvent::FileFetched {
                index: index + 1,
                total,
                path: entry.path.clone(),
                readable,
            });

            if readable {
                files.push(content);
            } else {
                let reason = content
                    .failure_reason()
                    .unwrap_or_else(|| content.outcome.label().to_string());
                warn!(path = %entry.path, %reason, "Skipping file");
                skipped.push(SkippedFile {
                    path: entry.path.clone(),
                    reason,
                });
            }
        }
        self.completed(
            Stage::Fetch,
            format!("{} readable, {} skipped", files.len(), skipped.len()),
        );

        if files.is_empty() {
            return Err(RepoDocError::NoReadableFiles {
                project: reference.metadata.path.clone(),
                attempted: total,
            });
        }

        Ok(Fetched {
            files,
            skipped,
            listed: entries.len(),
            selected: selected.len(),
        })
    }

    /// Overview then chunks, strictly sequential. Returns the body and the
    /// number of sections replaced by diagnostics.
    async fn generate_ai(
        &self,
        guard: &RunGuard,
        writer: &dyn DocumentationWriter,
        reference: &RepositoryReference,
        fetched: &Fetched,
        chunks: &[Chunk],
    ) -> Result<(String, usize)> {
        let project = &reference.metadata;
        self.started(Stage::Generate);

        let paths: Vec<String> = fetched.files.iter().map(|f| f.path.clone()).collect();
        let overview: CompletionResult = guard
            .guard("project overview", writer.summarize(project, &paths))
            .await?
            .into();
        if let CompletionResult::Failed { reason } = &overview {
            warn!(%reason, "Overview generation failed");
        }

        let total = chunks.len();
        let mut sections = Vec::with_capacity(total);
        for (index, chunk) in chunks.iter().enumerate() {
            self.emit(StatusEvent::ChunkStarted {
                index: index + 1,
                total,
                files: chunk.files.len(),
            });
            let section: CompletionResult = guard
                .guard("chunk documentation", writer.document(chunk, &project.name))
                .await?
                .into();
            if let CompletionResult::Failed { reason } = &section {
                warn!(chunk = index + 1, %reason, "Chunk documentation failed");
                self.emit(StatusEvent::Warning {
                    message: format!("Part {} of {}: {}", index + 1, total, reason),
                });
            }
            self.emit(StatusEvent::ChunkCompleted {
                index: index + 1,
                total,
                failed: section.is_failed(),
            });
            sections.push(section);
        }

        let failed = sections.iter().filter(|s| s.is_failed()).count();
        self.completed(
            Stage::Generate,
            format!("{} sections, {} failed", total, failed),
        );

        Ok((assemble_ai(project, &overview, chunks, &sections), failed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::fallback::BasicRenderer;
    use crate::pipeline::progress::RecordingSink;
    use crate::pipeline::writer::FixedWriter;
    use crate::repository::{DecodeOutcome, FetchFailure, FileEntry, ProjectLocator};
    use crate::types::{ErrorKind, ProjectMetadata};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory repository; paths missing from `contents` fail to fetch
    struct FakeRepository {
        listing: Vec<&'static str>,
        contents: HashMap<&'static str, &'static str>,
        fetches: Mutex<Vec<String>>,
        hang_on_fetch: bool,
    }

    impl FakeRepository {
        fn new(files: &[(&'static str, &'static str)]) -> Self {
            Self {
                listing: files.iter().map(|(p, _)| *p).collect(),
                contents: files.iter().cloned().collect(),
                fetches: Mutex::new(Vec::new()),
                hang_on_fetch: false,
            }
        }

        fn with_missing(mut self, path: &'static str) -> Self {
            self.listing.push(path);
            self
        }
    }

    #[async_trait]
    impl RepositorySource for FakeRepository {
        async fn resolve_project(&self, url: &str) -> Result<RepositoryReference> {
            let locator = ProjectLocator::parse(url)?;
            Ok(RepositoryReference {
                metadata: ProjectMetadata::new("app", locator.path.clone())
                    .with_description("Billing service")
                    .with_web_url(url),
                locator,
                project_id: "1".into(),
                branches: vec!["main".into(), "master".into(), "develop".into()],
            })
        }

        async fn list_files(&self, _reference: &RepositoryReference) -> Result<Vec<FileEntry>> {
            Ok(self.listing.iter().map(|p| FileEntry::blob(*p)).collect())
        }

        async fn fetch_file(&self, _reference: &RepositoryReference, path: &str) -> FileContent {
            self.fetches.lock().unwrap().push(path.to_string());
            if self.hang_on_fetch {
                std::future::pending::<()>().await;
            }
            match self.contents.get(path) {
                Some(text) => FileContent {
                    path: path.to_string(),
                    text: text.to_string(),
                    outcome: DecodeOutcome::Utf8,
                    branch: Some("main".into()),
                },
                None => FileContent::failed(
                    path,
                    FetchFailure::NotFound {
                        branches: vec!["main".into()],
                    },
                ),
            }
        }
    }

    /// Writer that echoes chunk paths and fails on request
    struct EchoWriter {
        fail_chunk: Option<usize>,
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl DocumentationWriter for EchoWriter {
        async fn summarize(&self, project: &ProjectMetadata, files: &[String]) -> Result<String> {
            Ok(format!("{} has {} files", project.name, files.len()))
        }

        async fn document(&self, chunk: &Chunk, _project_name: &str) -> Result<String> {
            let call = {
                let mut calls = self.calls.lock().unwrap();
                *calls += 1;
                *calls
            };
            if self.fail_chunk == Some(call) {
                return Err(RepoDocError::UnexpectedResponseShape("{\"odd\":1}".into()));
            }
            Ok(format!("DOC[{}]", chunk.paths().collect::<Vec<_>>().join("+")))
        }

        fn endpoint(&self) -> String {
            "https://llm.local/v1/chat/completions".into()
        }
    }

    const URL: &str = "https://gitlab.example.com/group/app";

    fn config(max_files: usize, max_chunk_size: usize) -> GenerationConfig {
        GenerationConfig {
            max_files,
            max_chunk_size,
            ..GenerationConfig::default()
        }
    }

    fn orchestrator(
        repository: Arc<FakeRepository>,
        writers: FixedWriter,
        config: &GenerationConfig,
    ) -> DocumentationOrchestrator {
        DocumentationOrchestrator::new(
            repository,
            Arc::new(writers),
            Arc::new(BasicRenderer),
            FileFilter::default(),
            config,
        )
    }

    fn sample_repository() -> FakeRepository {
        FakeRepository::new(&[
            ("src/main.rs", "//! Entry point\nfn main() {}\n"),
            ("logo.png", "binary"),
            ("node_modules/x/index.js", "ignored"),
            ("src/lib.rs", "pub mod billing;\n"),
        ])
        .with_missing("src/gone.rs")
    }

    #[tokio::test]
    async fn test_static_fallback_when_no_endpoint() {
        let repository = Arc::new(sample_repository());
        let document = orchestrator(repository.clone(), FixedWriter::none(), &config(100, 4000))
            .run(URL)
            .await
            .unwrap();

        assert_eq!(document.metadata.mode, GenerationMode::Static);
        assert_eq!(document.metadata.files_processed, 2);
        assert_eq!(document.metadata.skipped.len(), 1);
        assert_eq!(document.metadata.files_listed, 5);
        assert_eq!(document.metadata.files_selected, 3);

        let text = &document.text;
        assert!(text.starts_with("# app Documentation"));
        assert!(text.contains("### `src/main.rs`"));
        assert!(text.contains("### `src/lib.rs`"));
        assert!(text.contains("- Files processed: 2"));
        assert!(text.contains("- Mode: static"));
        assert!(!text.contains("- Endpoint:"));

        // Filtered paths are never fetched
        let fetched = repository.fetches.lock().unwrap().clone();
        assert_eq!(fetched, vec!["src/main.rs", "src/lib.rs", "src/gone.rs"]);
    }

    #[tokio::test]
    async fn test_ai_sections_preserve_chunk_order() {
        let repository = Arc::new(FakeRepository::new(&[
            ("a.rs", "// a\nfn a() {}"),
            ("b.rs", "// b\nfn b() {}"),
            ("c.rs", "// c\nfn c() {}"),
        ]));
        let writer = Arc::new(EchoWriter {
            fail_chunk: Some(2),
            calls: Mutex::new(0),
        });
        // Each section is ~30 bytes, so every file lands in its own chunk
        let document = orchestrator(repository, FixedWriter::new(writer), &config(100, 40))
            .run(URL)
            .await
            .unwrap();

        let text = &document.text;
        assert_eq!(document.metadata.mode, GenerationMode::Ai);
        assert_eq!(document.metadata.chunks, 3);
        assert_eq!(document.metadata.failed_chunks, 1);
        assert!(text.contains("app has 3 files"));

        let a = text.find("DOC[a.rs]").unwrap();
        let b = text.find("Documentation unavailable").unwrap();
        let c = text.find("DOC[c.rs]").unwrap();
        assert!(a < b && b < c);
        assert!(text.contains("- Endpoint: https://llm.local/v1/chat/completions"));
    }

    #[tokio::test]
    async fn test_max_files_bounds_fetches() {
        let repository = Arc::new(FakeRepository::new(&[
            ("a.rs", "a"),
            ("b.rs", "b"),
            ("c.rs", "c"),
        ]));
        let document = orchestrator(repository.clone(), FixedWriter::none(), &config(2, 4000))
            .run(URL)
            .await
            .unwrap();

        assert_eq!(repository.fetches.lock().unwrap().len(), 2);
        assert_eq!(document.metadata.files_processed, 2);
        assert_eq!(document.metadata.files_selected, 3);
    }

    #[tokio::test]
    async fn test_no_readable_files_is_terminal() {
        let repository = Arc::new(FakeRepository::new(&[]).with_missing("src/gone.rs"));
        let err = orchestrator(repository, FixedWriter::none(), &config(100, 4000))
            .run(URL)
            .await
            .unwrap_err();

        assert!(matches!(err, RepoDocError::NoReadableFiles { attempted: 1, .. }));
        assert!(err.with_hint().contains("hint"));
    }

    #[tokio::test]
    async fn test_sink_observes_without_changing_output() {
        let run = |sink: Option<Arc<RecordingSink>>| async move {
            let repository = Arc::new(sample_repository());
            let mut orchestrator =
                orchestrator(repository, FixedWriter::none(), &config(100, 4000));
            if let Some(sink) = sink {
                orchestrator = orchestrator.with_sink(sink);
            }
            orchestrator.run(URL).await.unwrap()
        };

        let sink = Arc::new(RecordingSink::new());
        let observed = run(Some(sink.clone())).await;
        let silent = run(None).await;

        let strip = |text: &str| {
            text.lines()
                .filter(|l| !l.starts_with("- Generated:"))
                .collect::<Vec<_>>()
                .join("\n")
        };
        assert_eq!(strip(&observed.text), strip(&silent.text));
        assert_eq!(
            sink.stages(),
            vec![
                Stage::Resolve,
                Stage::List,
                Stage::Filter,
                Stage::Fetch,
                Stage::Chunk,
                Stage::Probe,
                Stage::Generate,
                Stage::Assemble
            ]
        );
        let fetched = sink
            .events()
            .iter()
            .filter(|e| matches!(e, StatusEvent::FileFetched { .. }))
            .count();
        assert_eq!(fetched, 3);
    }

    #[tokio::test]
    async fn test_cancellation_aborts_run() {
        let mut fake = sample_repository();
        fake.hang_on_fetch = true;
        let token = CancellationToken::new();
        let orchestrator = orchestrator(Arc::new(fake), FixedWriter::none(), &config(100, 4000))
            .with_cancellation(token.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });
        let err = orchestrator.run(URL).await.unwrap_err();
        canceller.await.unwrap();

        assert_eq!(err.kind(), ErrorKind::Cancelled);
    }

    #[tokio::test]
    async fn test_invalid_url_is_terminal() {
        let repository = Arc::new(sample_repository());
        let err = orchestrator(repository, FixedWriter::none(), &config(100, 4000))
            .run("not a url at all")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidUrl);
    }
}
