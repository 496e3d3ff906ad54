//! Downsampling for the detection copy.
//!
//! The detector only ever sees this copy, so it is always RGB and its size is
//! a plain integer division of the source size.

use crate::error::DetectionError;
use fast_image_resize::{images::Image, FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::{DynamicImage, ImageBuffer, Rgb};
use serde::{Deserialize, Serialize};

/// Resampling used when shrinking the detection copy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResampleFilter {
    /// Pick the nearest source pixel
    Nearest,
    /// Bilinear convolution
    #[default]
    Bilinear,
}

impl ResampleFilter {
    fn algorithm(self) -> ResizeAlg {
        match self {
            ResampleFilter::Nearest => ResizeAlg::Nearest,
            ResampleFilter::Bilinear => ResizeAlg::Convolution(FilterType::Bilinear),
        }
    }
}

/// Size of a `width` x `height` image shrunk by `zoom_factor`, never below 1x1
pub fn downsampled_size(width: u32, height: u32, zoom_factor: u32) -> (u32, u32) {
    let zoom = zoom_factor.max(1);
    ((width / zoom).max(1), (height / zoom).max(1))
}

/// Shrinks images for detection, reusing one `fast_image_resize` resizer
pub struct FastResizer {
    resizer: Resizer,
    filter: ResampleFilter,
}

impl FastResizer {
    pub fn new(filter: ResampleFilter) -> Self {
        Self {
            resizer: Resizer::new(),
            filter,
        }
    }

    /// Shrink `image` by `zoom_factor` on both axes into an RGB copy.
    ///
    /// Alpha is dropped; the copy is only ever looked at by the detector.
    pub fn downsample(
        &mut self,
        image: &DynamicImage,
        zoom_factor: u32,
    ) -> Result<DynamicImage, DetectionError> {
        let rgb = image.to_rgb8();
        let (src_width, src_height) = rgb.dimensions();

        if src_width == 0 || src_height == 0 {
            return Err(DetectionError("Invalid source dimensions".to_string()));
        }

        if zoom_factor <= 1 {
            return Ok(DynamicImage::ImageRgb8(rgb));
        }

        let (width, height) = downsampled_size(src_width, src_height, zoom_factor);

        let src_image = Image::from_vec_u8(src_width, src_height, rgb.into_raw(), PixelType::U8x3)
            .map_err(|e| DetectionError(format!("Failed to create source image: {}", e)))?;

        let mut dst_image = Image::new(width, height, PixelType::U8x3);

        let options = ResizeOptions::new().resize_alg(self.filter.algorithm());

        self.resizer
            .resize(&src_image, &mut dst_image, &options)
            .map_err(|e| DetectionError(format!("Resize failed: {}", e)))?;

        let result_buffer: ImageBuffer<Rgb<u8>, Vec<u8>> =
            ImageBuffer::from_raw(width, height, dst_image.into_vec())
                .ok_or_else(|| DetectionError("Failed to create result buffer".to_string()))?;

        Ok(DynamicImage::ImageRgb8(result_buffer))
    }
}

impl Default for FastResizer {
    fn default() -> Self {
        Self::new(ResampleFilter::default())
    }
}
