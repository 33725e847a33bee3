//! Console Progress
//!
//! Renders pipeline status events on stderr. Item progress (files, chunks)
//! redraws a single line when stderr is a terminal and is summarized once
//! per stage otherwise.

use console::{Term, style};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use crate::pipeline::{Stage, StatusEvent, StatusSink};

pub struct ConsoleSink {
    term: Term,
    interactive: bool,
    started: Mutex<Option<Instant>>,
}

impl ConsoleSink {
    pub fn new() -> Self {
        let term = Term::stderr();
        let interactive = term.is_term();
        Self {
            term,
            interactive,
            started: Mutex::new(None),
        }
    }

    fn line(&self, text: &str) {
        let _ = self.term.write_line(text);
    }

    fn redraw(&self, text: &str) {
        if self.interactive {
            let _ = self.term.clear_line();
            let _ = self.term.write_str(text);
        }
    }

    fn finish_redraw(&self) {
        if self.interactive {
            let _ = self.term.clear_line();
        }
    }

    fn elapsed(&self) -> String {
        self.started
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .map(|s| format_duration(s.elapsed().as_secs()))
            .unwrap_or_default()
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusSink for ConsoleSink {
    fn emit(&self, event: &StatusEvent) {
        match event {
            StatusEvent::StageStarted { .. } => {
                self.started
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .get_or_insert_with(Instant::now);
            }
            StatusEvent::StageCompleted { stage, detail } => {
                if matches!(stage, Stage::Fetch | Stage::Generate) {
                    self.finish_redraw();
                }
                self.line(&format!(
                    "{} {} {} {}",
                    style("✓").green(),
                    stage,
                    style(detail).dim(),
                    style(self.elapsed()).dim()
                ));
            }
            StatusEvent::FileFetched {
                index,
                total,
                path,
                readable,
            } => {
                let marker = if *readable {
                    style("·").dim()
                } else {
                    style("✗").red()
                };
                self.redraw(&format!(
                    "  {} {} {}/{} {}",
                    render_progress_bar(*index, *total, 24),
                    marker,
                    index,
                    total,
                    truncate_path(path, 60)
                ));
            }
            StatusEvent::ChunkStarted {
                index,
                total,
                files,
            } => {
                self.redraw(&format!(
                    "  {} part {}/{} ({} files)",
                    render_progress_bar(index.saturating_sub(1), *total, 24),
                    index,
                    total,
                    files
                ));
            }
            StatusEvent::ChunkCompleted { .. } => {}
            StatusEvent::Warning { message } => {
                self.finish_redraw();
                self.line(&format!("{} {}", style("⚠").yellow(), message));
            }
        }
    }
}

fn render_progress_bar(completed: usize, total: usize, width: usize) -> String {
    if total == 0 {
        return format!("[{}]", " ".repeat(width));
    }

    let progress = (completed as f32 / total as f32).min(1.0);
    let filled = (progress * width as f32) as usize;
    let empty = width.saturating_sub(filled);

    format!("[{}{}]", "█".repeat(filled), "░".repeat(empty))
}

/// Keeps the tail of long paths
fn truncate_path(path: &str, max_chars: usize) -> String {
    let count = path.chars().count();
    if count <= max_chars {
        return path.to_string();
    }
    let tail: String = path.chars().skip(count - max_chars + 1).collect();
    format!("…{}", tail)
}

fn format_duration(secs: u64) -> String {
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_bar() {
        assert_eq!(render_progress_bar(0, 0, 4), "[    ]");
        assert_eq!(render_progress_bar(1, 2, 4), "[██░░]");
        assert_eq!(render_progress_bar(5, 2, 4), "[████]");
    }

    #[test]
    fn test_truncate_path_keeps_tail() {
        assert_eq!(truncate_path("src/lib.rs", 20), "src/lib.rs");
        let long = truncate_path("very/deep/nested/module/file.rs", 10);
        assert_eq!(long.chars().count(), 10);
        assert!(long.ends_with("file.rs"));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(5), "5s");
        assert_eq!(format_duration(125), "2m 5s");
        assert_eq!(format_duration(3720), "1h 2m");
    }
}
