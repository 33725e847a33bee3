//! Pipeline status reporting
//!
//! Events are emitted synchronously at fixed points of a run. Sinks only
//! observe; nothing a sink does can change the outcome of a run.

use std::sync::{Mutex, PoisonError};

/// Major pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Resolve,
    List,
    Filter,
    Fetch,
    Chunk,
    Probe,
    Generate,
    Assemble,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Resolve => "Resolving project",
            Self::List => "Listing files",
            Self::Filter => "Filtering files",
            Self::Fetch => "Fetching contents",
            Self::Chunk => "Chunking content",
            Self::Probe => "Discovering completion endpoint",
            Self::Generate => "Generating documentation",
            Self::Assemble => "Assembling document",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    StageStarted {
        stage: Stage,
    },
    StageCompleted {
        stage: Stage,
        detail: String,
    },
    FileFetched {
        index: usize,
        total: usize,
        path: String,
        readable: bool,
    },
    ChunkStarted {
        index: usize,
        total: usize,
        files: usize,
    },
    ChunkCompleted {
        index: usize,
        total: usize,
        failed: bool,
    },
    Warning {
        message: String,
    },
}

/// Receiver of status events
pub trait StatusSink: Send + Sync {
    fn emit(&self, event: &StatusEvent);
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl StatusSink for NoopSink {
    fn emit(&self, _event: &StatusEvent) {}
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<StatusEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<StatusEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Stages that started, in order
    pub fn stages(&self) -> Vec<Stage> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                StatusEvent::StageStarted { stage } => Some(stage),
                _ => None,
            })
            .collect()
    }
}

impl StatusSink for RecordingSink {
    fn emit(&self, event: &StatusEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}
