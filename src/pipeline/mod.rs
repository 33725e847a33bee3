//! Documentation Pipeline
//!
//! Turns a repository URL into a Markdown document. The orchestrator owns the
//! stage order; everything it talks to sits behind a trait so runs can be
//! driven without a network.

pub mod cancel;
pub mod document;
pub mod fallback;
pub mod orchestrator;
pub mod progress;
pub mod session;
pub mod writer;

pub use cancel::RunGuard;
pub use document::{GeneratedDocument, GenerationMode, RunMetadata, SkippedFile};
pub use fallback::{BasicRenderer, FallbackRenderer};
pub use orchestrator::DocumentationOrchestrator;
pub use progress::{NoopSink, RecordingSink, Stage, StatusEvent, StatusSink};
pub use session::{build_prober, build_transport};
pub use writer::{FixedWriter, ProbedWriter, WriterSource};
