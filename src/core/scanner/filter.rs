//! File filtering logic for the scanner.

use super::DEFAULT_EXTENSIONS;
use std::collections::HashSet;
use std::path::Path;

/// Decides which files get the face-blur transform
pub struct ImageFilter {
    /// Lowercase extensions without the leading dot
    extensions: HashSet<String>,
    /// Whether dot-files are left out
    skip_hidden: bool,
}

impl ImageFilter {
    /// Create a new filter with default supported extensions
    pub fn new() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            skip_hidden: false,
        }
    }

    /// Leave out files whose name starts with a dot
    pub fn skip_hidden(mut self, skip: bool) -> Self {
        self.skip_hidden = skip;
        self
    }

    /// Override the list of extensions to accept.
    ///
    /// Matching is case-insensitive and a leading dot is ignored, so
    /// `".JPG"` and `"jpg"` mean the same thing.
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        self
    }

    /// Whether the name starts with a dot
    pub fn is_hidden(path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .map(|name| name.starts_with('.'))
            .unwrap_or(false)
    }

    /// Whether the file should be transformed
    pub fn should_include(&self, path: &Path) -> bool {
        if self.skip_hidden && Self::is_hidden(path) {
            return false;
        }

        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| self.extensions.contains(&ext.to_lowercase()))
            .unwrap_or(false)
    }
}

impl Default for ImageFilter {
    fn default() -> Self {
        Self::new()
    }
}
