//! # Scanner Module
//!
//! Walks the source tree, mirrors its directories under the destination
//! root and turns every eligible file into an [`ImageTask`].
//!
//! ## Supported Formats
//! Formats the codec can both read and write:
//! - JPEG (.jpg, .jpeg)
//! - PNG (.png)
//! - WebP (.webp)
//! - BMP (.bmp)
//! - TIFF (.tiff, .tif)
//!
//! ## Example
//! ```rust,ignore
//! use faceblur::core::scanner::{ScanConfig, TreeMirror};
//!
//! let mirror = TreeMirror::new(ScanConfig::default());
//! let result = mirror.mirror(&source, &destination, 1, &null_sender())?;
//! ```

mod filter;
mod walker;

pub use filter::ImageFilter;
pub use walker::{ScanConfig, TreeMirror, UnmatchedFilePolicy};

use crate::core::transform::ImageTask;
use crate::error::ScanError;
use std::path::Path;

/// Extensions transformed when none are configured
pub const DEFAULT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "bmp", "tiff", "tif"];

/// Supported image formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    WebP,
    Bmp,
    Tiff,
    Unknown,
}

impl ImageFormat {
    /// Detect format from file extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" => ImageFormat::Jpeg,
            "png" => ImageFormat::Png,
            "webp" => ImageFormat::WebP,
            "bmp" => ImageFormat::Bmp,
            "tiff" | "tif" => ImageFormat::Tiff,
            _ => ImageFormat::Unknown,
        }
    }

    /// Detect format from a path's extension
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(ImageFormat::Unknown)
    }
}

/// Result of walking and mirroring a tree
#[derive(Debug, Default)]
pub struct ScanResult {
    /// One task per eligible file, in walk order
    pub tasks: Vec<ImageTask>,
    /// Destination directories that exist after the walk
    pub directories: usize,
    /// Non-image files copied through
    pub copied: usize,
    /// Non-image files ignored
    pub skipped: usize,
    /// Errors that occurred during scanning (non-fatal)
    pub errors: Vec<ScanError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_format_from_extension_any_case() {
        assert_eq!(ImageFormat::from_extension("jpg"), ImageFormat::Jpeg);
        assert_eq!(ImageFormat::from_extension("JPEG"), ImageFormat::Jpeg);
        assert_eq!(ImageFormat::from_extension("Png"), ImageFormat::Png);
        assert_eq!(ImageFormat::from_extension("TIF"), ImageFormat::Tiff);
    }

    #[test]
    fn unknown_extension_returns_unknown() {
        assert_eq!(ImageFormat::from_extension("txt"), ImageFormat::Unknown);
        assert_eq!(ImageFormat::from_path(Path::new("/photos/no_ext")), ImageFormat::Unknown);
    }

    #[test]
    fn every_default_extension_has_a_format() {
        for ext in DEFAULT_EXTENSIONS {
            assert_ne!(ImageFormat::from_extension(ext), ImageFormat::Unknown, "{ext}");
        }
    }
}
