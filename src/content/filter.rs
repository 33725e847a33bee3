//! File selection
//!
//! Keeps text-like files by extension (or by exact name for extension-less files
//! such as `Makefile`) and drops anything below a skipped directory.

use std::collections::HashSet;

use crate::config::FilterConfig;
use crate::repository::{EntryKind, FileEntry};

#[derive(Debug, Clone)]
pub struct FileFilter {
    extensions: HashSet<String>,
    file_names: HashSet<String>,
    skip_dirs: HashSet<String>,
}

impl Default for FileFilter {
    fn default() -> Self {
        Self::from_config(&FilterConfig::default())
    }
}

impl FileFilter {
    pub fn from_config(config: &FilterConfig) -> Self {
        Self {
            extensions: config
                .extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            file_names: config.file_names.iter().cloned().collect(),
            skip_dirs: config.skip_dirs.iter().cloned().collect(),
        }
    }

    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .collect();
        self
    }

    pub fn with_skip_dirs<I, S>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip_dirs = dirs.into_iter().map(Into::into).collect();
        self
    }

    /// Order-preserving selection; the input is left untouched
    pub fn filter(&self, entries: &[FileEntry]) -> Vec<FileEntry> {
        entries
            .iter()
            .filter(|entry| self.accepts(entry))
            .cloned()
            .collect()
    }

    pub fn accepts(&self, entry: &FileEntry) -> bool {
        entry.kind == EntryKind::Blob && self.is_supported(entry) && !self.is_skipped(&entry.path)
    }

    fn is_supported(&self, entry: &FileEntry) -> bool {
        match entry.extension() {
            Some(ext) => self.extensions.contains(&ext),
            None => self.file_names.contains(entry.file_name()),
        }
    }

    /// Whole-component match against the directory part of the path
    fn is_skipped(&self, path: &str) -> bool {
        let mut components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
        components.pop();
        components.iter().any(|c| self.skip_dirs.contains(*c))
    }
}
