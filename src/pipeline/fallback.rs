//! Static documentation
//!
//! Used when no completion endpoint is bound. Works from the fetched files
//! alone: a file-type breakdown and a per-file listing with line counts and
//! the first descriptive comment or heading found near the top of the file.

use std::collections::BTreeMap;

use crate::repository::{DecodeOutcome, FileContent, FileEntry};
use crate::types::ProjectMetadata;

/// Lines inspected when looking for a leading description
const DOC_SCAN_LINES: usize = 30;

/// Longest description kept per file
const DOC_LINE_MAX_CHARS: usize = 160;

/// Renders documentation without a language model
pub trait FallbackRenderer: Send + Sync {
    fn render(&self, files: &[FileContent], project: &ProjectMetadata) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BasicRenderer;

impl FallbackRenderer for BasicRenderer {
    fn render(&self, files: &[FileContent], project: &ProjectMetadata) -> String {
        let mut out = String::new();

        out.push_str("## Overview\n\n");
        out.push_str(&format!(
            "{}\n\nThis document was generated by static analysis of {} files.\n\n",
            project.description_or_default(),
            files.len()
        ));

        out.push_str("## File Types\n\n| Extension | Files |\n|-----------|-------|\n");
        for (ext, count) in extension_breakdown(files) {
            out.push_str(&format!("| {} | {} |\n", ext, count));
        }
        out.push('\n');

        out.push_str("## Files\n\n");
        for file in files {
            out.push_str(&format!("### `{}`\n\n", file.path));
            match &file.outcome {
                DecodeOutcome::BinaryPlaceholder { bytes } => {
                    out.push_str(&format!("- Binary content ({} bytes)\n", bytes));
                }
                _ => {
                    out.push_str(&format!("- Lines: {}\n", file.text.lines().count()));
                    if let Some(doc) = first_doc_line(&file.text) {
                        out.push_str(&format!("- Summary: {}\n", doc));
                    }
                }
            }
            out.push('\n');
        }

        out.trim_end().to_string()
    }
}

/// Extension counts, most common first, ties by name
fn extension_breakdown(files: &[FileContent]) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for file in files {
        let ext = FileEntry::blob(file.path.clone())
            .extension()
            .unwrap_or_else(|| "(none)".to_string());
        *counts.entry(ext).or_default() += 1;
    }
    let mut breakdown: Vec<_> = counts.into_iter().collect();
    breakdown.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    breakdown
}

/// First comment or heading text before any code
pub fn first_doc_line(text: &str) -> Option<String> {
    const MARKERS: &[&str] = &["//!", "///", "//", "/**", "/*", "*", "#", "\"\"\"", "'''", "--"];

    for line in text.lines().take(DOC_SCAN_LINES) {
        let line = line.trim();
        if line.is_empty() || line.starts_with("#!") || line == "*/" {
            continue;
        }
        // `#include`, `#define`, `#[derive]`: code, not a comment
        if let Some(rest) = line.strip_prefix('#') {
            if !(rest.is_empty() || rest.starts_with([' ', '\t', '#'])) {
                return None;
            }
        }
        let marker = MARKERS.iter().find(|m| line.starts_with(**m))?;
        let body = line[marker.len()..]
            .trim_start_matches(['#', '/', '*', '!', '-'])
            .trim_end_matches("*/")
            .trim_end_matches("\"\"\"")
            .trim_end_matches("'''")
            .trim();
        if !body.is_empty() {
            return Some(body.chars().take(DOC_LINE_MAX_CHARS).collect());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str, text: &str) -> FileContent {
        FileContent {
            path: path.to_string(),
            text: text.to_string(),
            outcome: DecodeOutcome::Utf8,
            branch: Some("main".into()),
        }
    }

    #[test]
    fn test_first_doc_line() {
        assert_eq!(
            first_doc_line("//! Config loader\n\nuse std::fs;").as_deref(),
            Some("Config loader")
        );
        assert_eq!(
            first_doc_line("#!/usr/bin/env python\n\"\"\"Sync job.\"\"\"\n").as_deref(),
            Some("Sync job.")
        );
        assert_eq!(first_doc_line("# Title\n\ntext").as_deref(), Some("Title"));
        assert_eq!(first_doc_line("/**\n * Entry point.\n */").as_deref(), Some("Entry point."));
        assert_eq!(first_doc_line("fn main() {}\n// late comment"), None);
        assert_eq!(first_doc_line("#[derive(Debug)]\nstruct A;"), None);
        assert_eq!(first_doc_line("## Usage\n").as_deref(), Some("Usage"));
        assert_eq!(first_doc_line("#include <stdio.h>\n/* Entry point */"), None);
        assert_eq!(first_doc_line("#define MAX 4\nint x;"), None);
        assert_eq!(first_doc_line("#pragma once\n// Buffer helpers"), None);
    }

    #[test]
    fn test_render_lists_every_file() {
        let files = vec![
            file("src/main.rs", "//! Entry point\nfn main() {}\n"),
            file("src/lib.rs", "pub mod a;\n"),
            file("README.md", "# Demo\n"),
            FileContent {
                path: "assets/icon.ico".into(),
                text: "[binary content: 9 bytes]".into(),
                outcome: DecodeOutcome::BinaryPlaceholder { bytes: 9 },
                branch: None,
            },
        ];
        let project = ProjectMetadata::new("demo", "group/demo");
        let text = BasicRenderer.render(&files, &project);

        assert!(text.contains("static analysis of 4 files"));
        assert!(text.contains("| rs | 2 |"));
        assert!(text.contains("| ico | 1 |"));
        assert!(text.find("| rs | 2 |").unwrap() < text.find("| ico | 1 |").unwrap());
        assert!(text.contains("### `src/main.rs`\n\n- Lines: 2\n- Summary: Entry point"));
        assert!(text.contains("### `src/lib.rs`\n\n- Lines: 1\n"));
        assert!(text.contains("- Binary content (9 bytes)"));
    }
}
