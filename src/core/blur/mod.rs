//! # Blur Module
//!
//! Obscures rectangular regions of a pixel buffer in place.
//!
//! The kernel is a fixed 31x31 Gaussian. Sigma is derived from the kernel
//! size the same way OpenCV does when sigma is left at zero:
//! `0.3 * ((k - 1) / 2 - 1) + 0.8`, which gives 5.0 for k = 31.
//!
//! Only the pixels inside the region are read, so edges of the face do not
//! bleed in surrounding background.

use crate::core::detector::BoundingBox;
use image::{imageops, DynamicImage};

/// Kernel width and height used for face regions
pub const KERNEL_SIZE: u32 = 31;

/// Replaces a region of an image with a blurred version of itself
pub trait RegionBlur: Send + Sync {
    /// Blur `region` of `image` in place. Parts of the region outside the
    /// image are ignored.
    fn blur_region(&self, image: &mut DynamicImage, region: &BoundingBox);
}

/// Gaussian blur restricted to the region
#[derive(Debug, Clone, Copy)]
pub struct GaussianRegionBlur {
    kernel_size: u32,
}

impl GaussianRegionBlur {
    /// The production 31x31 kernel
    pub fn new() -> Self {
        Self {
            kernel_size: KERNEL_SIZE,
        }
    }

    /// A kernel of another size. Sizes 0 and 1 leave the image untouched.
    pub fn with_kernel_size(kernel_size: u32) -> Self {
        Self { kernel_size }
    }

    pub fn kernel_size(&self) -> u32 {
        self.kernel_size
    }

    /// Gaussian sigma for the kernel size
    pub fn sigma(&self) -> f32 {
        0.3 * ((self.kernel_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
    }
}

impl Default for GaussianRegionBlur {
    fn default() -> Self {
        Self::new()
    }
}

impl RegionBlur for GaussianRegionBlur {
    fn blur_region(&self, image: &mut DynamicImage, region: &BoundingBox) {
        if self.kernel_size <= 1 {
            return;
        }
        let Some(region) = region.clamp(image.width(), image.height()) else {
            return;
        };

        let face = image
            .crop_imm(region.left, region.top, region.width(), region.height())
            .blur(self.sigma());
        imageops::replace(image, &face, region.left as i64, region.top as i64);
    }
}
