//! # Codec Module
//!
//! Decoding files into pixel buffers and writing them back out.
//!
//! The transform talks to an [`ImageCodec`]; [`FastCodec`] is the real one.
//! - JPEG input goes through `zune-jpeg`, falling back to the
//!   image crate when zune cannot handle a file
//! - everything else, and all output, goes through the image crate
//!
//! The output format is chosen from the destination extension, so a mirrored
//! `photo.png` stays a PNG.

mod fast_decode;

pub use fast_decode::FastDecoder;

use crate::error::TaskError;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageError};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Default JPEG quality for re-encoded output
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Turns files into pixel buffers and back
pub trait ImageCodec: Send + Sync {
    /// Decode `path` into a full-resolution buffer
    fn decode(&self, path: &Path) -> Result<DynamicImage, TaskError>;

    /// Encode `image` to `path`. The parent directory must already exist.
    fn encode(&self, image: &DynamicImage, path: &Path) -> Result<(), TaskError>;
}

/// Codec using zune-jpeg for JPEG decoding and the image crate for the rest
#[derive(Debug, Clone)]
pub struct FastCodec {
    jpeg_quality: u8,
}

impl FastCodec {
    pub fn new() -> Self {
        Self {
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }

    /// Set the quality used when writing JPEG files (1-100)
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    fn write(&self, image: &DynamicImage, path: &Path) -> Result<(), TaskError> {
        let format = image::ImageFormat::from_path(path).map_err(|e| TaskError::Encode {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let file = File::create(path).map_err(|e| TaskError::DestinationUnwritable {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut writer = BufWriter::new(file);

        let encoded = match format {
            // JPEG has no alpha channel
            image::ImageFormat::Jpeg => JpegEncoder::new_with_quality(&mut writer, self.jpeg_quality)
                .encode_image(&image.to_rgb8()),
            other => image.write_to(&mut writer, other),
        };
        encoded.map_err(|e| encode_error(path, e))?;

        writer.flush().map_err(|e| TaskError::DestinationUnwritable {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

impl Default for FastCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageCodec for FastCodec {
    fn decode(&self, path: &Path) -> Result<DynamicImage, TaskError> {
        FastDecoder::decode(path)
    }

    fn encode(&self, image: &DynamicImage, path: &Path) -> Result<(), TaskError> {
        let result = self.write(image, path);
        if result.is_err() {
            // never leave a truncated image behind
            let _ = fs::remove_file(path);
        }
        result
    }
}

fn encode_error(path: &Path, error: ImageError) -> TaskError {
    match error {
        ImageError::IoError(source) => TaskError::DestinationUnwritable {
            path: path.to_path_buf(),
            source,
        },
        other => TaskError::Encode {
            path: path.to_path_buf(),
            reason: other.to_string(),
        },
    }
}
