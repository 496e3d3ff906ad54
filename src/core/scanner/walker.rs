//! Directory walking and mirroring using walkdir.

use super::{filter::ImageFilter, ScanResult};
use crate::core::transform::{copy_bytes, ImageTask};
use crate::error::ScanError;
use crate::events::{EventSender, ScanEvent};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// What happens to files that are not recognised images
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnmatchedFilePolicy {
    /// Leave them out of the destination tree
    #[default]
    Skip,
    /// Copy them byte for byte
    Copy,
}

/// Configuration for the directory walk
#[derive(Debug, Clone, Default)]
pub struct ScanConfig {
    /// Whether to follow symbolic links
    pub follow_symlinks: bool,
    /// Leave out files and directories whose name starts with a dot
    pub skip_hidden: bool,
    /// Custom extensions to include (None = use defaults)
    pub extensions: Option<Vec<String>>,
    /// Handling of non-image files
    pub unmatched: UnmatchedFilePolicy,
}

/// Walks a source tree, recreating its directories under a destination root
pub struct TreeMirror {
    config: ScanConfig,
    filter: ImageFilter,
}

impl TreeMirror {
    /// Create a new mirror with the given configuration
    pub fn new(config: ScanConfig) -> Self {
        let mut filter = ImageFilter::new().skip_hidden(config.skip_hidden);

        if let Some(ref extensions) = config.extensions {
            filter = filter.with_extensions(extensions.clone());
        }

        Self { config, filter }
    }

    /// Mirror every directory under `source_root` into `destination_root`
    /// and collect one task per eligible file.
    ///
    /// Every task's destination directory exists when this returns. Only a
    /// missing source or an uncreatable destination root is an `Err`; all
    /// other problems end up in [`ScanResult::errors`].
    pub fn mirror(
        &self,
        source_root: &Path,
        destination_root: &Path,
        zoom_factor: u32,
        events: &EventSender,
    ) -> Result<ScanResult, ScanError> {
        if !source_root.is_dir() {
            return Err(ScanError::SourceNotFound {
                path: source_root.to_path_buf(),
            });
        }

        fs::create_dir_all(destination_root).map_err(|e| ScanError::DestinationRoot {
            path: destination_root.to_path_buf(),
            source: e,
        })?;

        // keep a destination nested in the source from being walked into
        let destination_canonical = fs::canonicalize(destination_root).ok();

        events.send(ScanEvent::Started {
            source: source_root.to_path_buf(),
            destination: destination_root.to_path_buf(),
        });

        let mut result = ScanResult::default();
        let mut unmirrored: HashSet<PathBuf> = HashSet::new();

        let walker = WalkDir::new(source_root)
            .follow_links(self.config.follow_symlinks)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                self.should_descend(entry) && !is_same_dir(entry, destination_canonical.as_deref())
            });

        for entry_result in walker {
            let entry = match entry_result {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(|p| p.to_path_buf()).unwrap_or_default();

                    let error = if e.io_error().map(|e| e.kind())
                        == Some(std::io::ErrorKind::PermissionDenied)
                    {
                        ScanError::PermissionDenied { path }
                    } else {
                        ScanError::ReadDirectory {
                            path,
                            reason: e.to_string(),
                        }
                    };
                    self.record_error(&mut result, error, events);
                    continue;
                }
            };

            let path = entry.path();
            let Ok(relative) = path.strip_prefix(source_root) else {
                continue;
            };
            let target = destination_root.join(relative);

            if entry.file_type().is_dir() {
                match fs::create_dir_all(&target) {
                    Ok(()) => {
                        result.directories += 1;
                        events.send(ScanEvent::DirectoryMirrored {
                            source: path.to_path_buf(),
                            destination: target,
                        });
                    }
                    Err(e) => {
                        unmirrored.insert(path.to_path_buf());
                        let error = ScanError::DirectoryCreate {
                            path: target,
                            source: e,
                        };
                        self.record_error(&mut result, error, events);
                    }
                }
                continue;
            }

            let is_file = if entry.file_type().is_symlink() {
                // links are not followed, but a link to a file is still a file
                match fs::metadata(path) {
                    Ok(metadata) if metadata.is_file() => true,
                    Ok(_) => {
                        tracing::debug!(path = %path.display(), "not following directory link");
                        false
                    }
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "dangling link");
                        result.skipped += 1;
                        false
                    }
                }
            } else {
                entry.file_type().is_file()
            };
            if !is_file {
                continue;
            }

            // the directory error already covers its files
            if path.parent().map(|p| unmirrored.contains(p)).unwrap_or(false) {
                continue;
            }

            if self.filter.should_include(path) {
                result
                    .tasks
                    .push(ImageTask::new(path, target, zoom_factor));
                continue;
            }

            match self.config.unmatched {
                UnmatchedFilePolicy::Skip => {
                    tracing::trace!(path = %path.display(), "skipping non-image file");
                    result.skipped += 1;
                }
                UnmatchedFilePolicy::Copy => match copy_bytes(path, &target) {
                    Ok(()) => {
                        result.copied += 1;
                        events.send(ScanEvent::FileCopied {
                            source: path.to_path_buf(),
                            destination: target,
                        });
                    }
                    Err(e) => {
                        let error = ScanError::CopyThrough {
                            path: path.to_path_buf(),
                            source: e,
                        };
                        self.record_error(&mut result, error, events);
                    }
                },
            }
        }

        events.send(ScanEvent::Completed {
            total_tasks: result.tasks.len(),
        });

        Ok(result)
    }

    fn should_descend(&self, entry: &DirEntry) -> bool {
        !self.config.skip_hidden || entry.depth() == 0 || !ImageFilter::is_hidden(entry.path())
    }

    fn record_error(&self, result: &mut ScanResult, error: ScanError, events: &EventSender) {
        let path = match &error {
            ScanError::PermissionDenied { path }
            | ScanError::ReadDirectory { path, .. }
            | ScanError::DirectoryCreate { path, .. }
            | ScanError::CopyThrough { path, .. } => path.clone(),
            _ => PathBuf::new(),
        };
        tracing::warn!(path = %path.display(), %error, "scan error");
        events.send(ScanEvent::Error {
            path,
            message: error.to_string(),
        });
        result.errors.push(error);
    }
}

fn is_same_dir(entry: &DirEntry, destination: Option<&Path>) -> bool {
    match destination {
        Some(destination) if entry.depth() > 0 && entry.file_type().is_dir() => fs::canonicalize(entry.path())
            .map(|p| p == destination)
            .unwrap_or(false),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::null_sender;
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, [0xFF, 0xD8, 0xFF, 0xE0]).unwrap();
    }

    fn mirror(config: ScanConfig, source: &Path, destination: &Path) -> ScanResult {
        TreeMirror::new(config)
            .mirror(source, destination, 1, &null_sender())
            .unwrap()
    }

    #[test]
    fn empty_tree_creates_destination_root() {
        let source = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let destination = out.path().join("blurred");

        let result = mirror(ScanConfig::default(), source.path(), &destination);

        assert!(destination.is_dir());
        assert!(result.tasks.is_empty());
        assert_eq!(result.directories, 1);
    }

    #[test]
    fn nested_directories_are_mirrored() {
        let source = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        touch(source.path(), "a/1.jpg");
        touch(source.path(), "a/b/2.jpg");
        fs::create_dir_all(source.path().join("empty/deeper")).unwrap();

        let result = mirror(ScanConfig::default(), source.path(), out.path());

        assert!(out.path().join("a/b").is_dir());
        assert!(out.path().join("empty/deeper").is_dir());
        assert_eq!(result.tasks.len(), 2);
        assert_eq!(result.tasks[0].source, source.path().join("a/1.jpg"));
        assert_eq!(result.tasks[0].destination, out.path().join("a/1.jpg"));
        assert_eq!(result.tasks[1].destination, out.path().join("a/b/2.jpg"));
    }

    #[test]
    fn non_images_are_skipped_by_default() {
        let source = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        touch(source.path(), "photo.jpg");
        touch(source.path(), "notes.txt");

        let result = mirror(ScanConfig::default(), source.path(), out.path());

        assert_eq!(result.tasks.len(), 1);
        assert_eq!(result.skipped, 1);
        assert!(!out.path().join("notes.txt").exists());
    }

    #[test]
    fn non_images_can_be_copied_through() {
        let source = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        touch(source.path(), "docs/notes.txt");

        let config = ScanConfig {
            unmatched: UnmatchedFilePolicy::Copy,
            ..Default::default()
        };
        let result = mirror(config, source.path(), out.path());

        assert_eq!(result.copied, 1);
        assert!(out.path().join("docs/notes.txt").is_file());
    }

    #[test]
    fn hidden_directories_are_mirrored_by_default() {
        let source = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        touch(source.path(), ".album/p.jpg");
        touch(source.path(), "visible.jpg");

        let result = mirror(ScanConfig::default(), source.path(), out.path());

        assert_eq!(result.tasks.len(), 2);
        assert!(out.path().join(".album").is_dir());
        assert!(result
            .tasks
            .iter()
            .any(|t| t.destination == out.path().join(".album/p.jpg")));
    }

    #[test]
    fn hidden_entries_can_be_skipped() {
        let source = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        touch(source.path(), ".thumbnails/t.jpg");
        touch(source.path(), ".cover.jpg");
        touch(source.path(), "visible.jpg");

        let config = ScanConfig {
            skip_hidden: true,
            ..Default::default()
        };
        let result = mirror(config, source.path(), out.path());

        assert_eq!(result.tasks.len(), 1);
        assert!(!out.path().join(".thumbnails").exists());
    }

    #[cfg(unix)]
    #[test]
    fn linked_files_are_processed_without_following_links() {
        let source = TempDir::new().unwrap();
        let elsewhere = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        touch(elsewhere.path(), "real.jpg");
        touch(elsewhere.path(), "album/inside.jpg");
        std::os::unix::fs::symlink(elsewhere.path().join("real.jpg"), source.path().join("link.jpg"))
            .unwrap();
        std::os::unix::fs::symlink(elsewhere.path().join("album"), source.path().join("album"))
            .unwrap();

        let result = mirror(ScanConfig::default(), source.path(), out.path());

        assert_eq!(result.tasks.len(), 1);
        assert_eq!(result.tasks[0].source, source.path().join("link.jpg"));
        assert_eq!(result.tasks[0].destination, out.path().join("link.jpg"));
    }

    #[cfg(unix)]
    #[test]
    fn dangling_links_are_counted_as_skipped() {
        let source = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        std::os::unix::fs::symlink(source.path().join("gone.jpg"), source.path().join("link.jpg"))
            .unwrap();

        let result = mirror(ScanConfig::default(), source.path(), out.path());

        assert!(result.tasks.is_empty());
        assert_eq!(result.skipped, 1);
    }

    #[test]
    fn uncreatable_directory_is_recoverable() {
        let source = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        touch(source.path(), "blocked/a.jpg");
        touch(source.path(), "open/b.jpg");
        // a file where the mirrored directory should go
        fs::write(out.path().join("blocked"), b"in the way").unwrap();

        let result = mirror(ScanConfig::default(), source.path(), out.path());

        assert_eq!(result.tasks.len(), 1);
        assert_eq!(result.tasks[0].source, source.path().join("open/b.jpg"));
        assert!(matches!(
            result.errors.as_slice(),
            [ScanError::DirectoryCreate { .. }]
        ));
        assert!(out.path().join("open").is_dir());
    }

    #[test]
    fn copy_through_onto_itself_is_refused() {
        let source = TempDir::new().unwrap();
        fs::write(source.path().join("notes.txt"), "keep me").unwrap();

        let config = ScanConfig {
            unmatched: UnmatchedFilePolicy::Copy,
            ..Default::default()
        };
        let result = mirror(config, source.path(), source.path());

        assert_eq!(result.copied, 0);
        assert!(matches!(
            result.errors.as_slice(),
            [ScanError::CopyThrough { .. }]
        ));
        assert_eq!(fs::read_to_string(source.path().join("notes.txt")).unwrap(), "keep me");
    }

    #[test]
    fn destination_inside_source_is_not_walked() {
        let source = TempDir::new().unwrap();
        touch(source.path(), "a.jpg");
        let destination = source.path().join("blurred");

        let first = mirror(ScanConfig::default(), source.path(), &destination);
        touch(&destination, "a.jpg");
        let second = mirror(ScanConfig::default(), source.path(), &destination);

        assert_eq!(first.tasks.len(), 1);
        assert_eq!(second.tasks.len(), 1);
    }

    #[test]
    fn missing_source_is_fatal_and_creates_nothing() {
        let out = TempDir::new().unwrap();
        let destination = out.path().join("blurred");

        let result = TreeMirror::new(ScanConfig::default()).mirror(
            Path::new("/nonexistent/path/12345"),
            &destination,
            1,
            &null_sender(),
        );

        assert!(matches!(result, Err(ScanError::SourceNotFound { .. })));
        assert!(!destination.exists());
    }

    #[test]
    fn zoom_factor_is_carried_into_tasks() {
        let source = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        touch(source.path(), "a.png");

        let result = TreeMirror::new(ScanConfig::default())
            .mirror(source.path(), out.path(), 3, &null_sender())
            .unwrap();

        assert_eq!(result.tasks[0].zoom_factor, 3);
    }
}
