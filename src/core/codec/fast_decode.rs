//! Fast image decoding with format-specific optimizations.
//!
//! JPEG files go through zune-jpeg, everything else (and any JPEG zune
//! rejects) through the image crate.

use crate::core::scanner::ImageFormat;
use crate::error::TaskError;
use image::{DynamicImage, ImageBuffer, Luma, Rgb, Rgba};
use std::fs;
use std::path::Path;
use zune_core::colorspace::ColorSpace;
use zune_core::options::DecoderOptions;
use zune_jpeg::JpegDecoder;

/// Fast image decoder that uses optimized decoders per format
pub struct FastDecoder;

impl FastDecoder {
    /// Decode an image from a file path using the fastest available decoder.
    ///
    /// - JPEG: Uses zune-jpeg, retrying with the image crate on failure
    /// - Other formats: image crate
    pub fn decode(path: &Path) -> Result<DynamicImage, TaskError> {
        match ImageFormat::from_path(path) {
            ImageFormat::Jpeg => Self::decode_jpeg(path).or_else(|e| {
                tracing::debug!(path = %path.display(), error = %e, "zune-jpeg failed, retrying");
                Self::decode_fallback(path)
            }),
            _ => Self::decode_fallback(path),
        }
    }

    /// Fast JPEG decoding using zune-jpeg
    fn decode_jpeg(path: &Path) -> Result<DynamicImage, TaskError> {
        let file_bytes = fs::read(path).map_err(|e| decode_error(path, e.to_string()))?;

        let options = DecoderOptions::new_fast().jpeg_set_out_colorspace(ColorSpace::RGB);
        let mut decoder = JpegDecoder::new_with_options(&file_bytes, options);

        let pixels = decoder
            .decode()
            .map_err(|e| decode_error(path, format!("zune-jpeg decode failed: {:?}", e)))?;

        let info = decoder
            .info()
            .ok_or_else(|| decode_error(path, "Failed to get image info".to_string()))?;

        let width = info.width as u32;
        let height = info.height as u32;

        // the decoder may ignore the requested colorspace
        let out_colorspace = decoder.get_output_colorspace().unwrap_or(ColorSpace::RGB);

        let image = match out_colorspace {
            ColorSpace::RGB => {
                let buffer: ImageBuffer<Rgb<u8>, Vec<u8>> =
                    ImageBuffer::from_raw(width, height, pixels).ok_or_else(|| {
                        decode_error(path, "Failed to create RGB buffer".to_string())
                    })?;
                DynamicImage::ImageRgb8(buffer)
            }
            ColorSpace::RGBA => {
                let buffer: ImageBuffer<Rgba<u8>, Vec<u8>> =
                    ImageBuffer::from_raw(width, height, pixels).ok_or_else(|| {
                        decode_error(path, "Failed to create RGBA buffer".to_string())
                    })?;
                DynamicImage::ImageRgba8(buffer)
            }
            ColorSpace::Luma => {
                let buffer: ImageBuffer<Luma<u8>, Vec<u8>> =
                    ImageBuffer::from_raw(width, height, pixels).ok_or_else(|| {
                        decode_error(path, "Failed to create Luma buffer".to_string())
                    })?;
                DynamicImage::ImageLuma8(buffer)
            }
            _ => return Self::decode_fallback(path),
        };

        Ok(image)
    }

    fn decode_fallback(path: &Path) -> Result<DynamicImage, TaskError> {
        image::open(path).map_err(|e| decode_error(path, e.to_string()))
    }
}

fn decode_error(path: &Path, reason: String) -> TaskError {
    TaskError::Decode {
        path: path.to_path_buf(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::jpeg::JpegEncoder;
    use tempfile::TempDir;

    #[test]
    fn decodes_jpeg_through_zune() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("photo.JPG");
        let rgb = ImageBuffer::from_pixel(40, 24, Rgb([200u8, 100, 50]));
        let mut bytes = Vec::new();
        JpegEncoder::new_with_quality(&mut bytes, 95)
            .encode_image(&rgb)
            .unwrap();
        fs::write(&path, bytes).unwrap();

        let image = FastDecoder::decode(&path).unwrap();

        assert_eq!((image.width(), image.height()), (40, 24));
    }

    #[test]
    fn missing_file_is_a_decode_error() {
        let result = FastDecoder::decode(Path::new("/nonexistent/photo.jpg"));
        match result {
            Err(TaskError::Decode { path, .. }) => {
                assert_eq!(path, Path::new("/nonexistent/photo.jpg"));
            }
            other => panic!("expected decode error, got {:?}", other.map(|_| ())),
        }
    }
}
