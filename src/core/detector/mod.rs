//! # Detector Module
//!
//! Face detection behind the [`FaceDetector`] trait.
//!
//! The transform only needs "pixels in, boxes out". Boxes come back in the
//! coordinate space of the buffer they were detected on; the caller is
//! responsible for rescaling them with [`BoundingBox::scale`] when that
//! buffer was downsampled.
//!
//! ## Backends
//! - [`RustfaceDetector`] (feature `rustface`) - SeetaFace frontal model
//! - anything else implementing [`FaceDetector`], e.g. test stubs

#[cfg(feature = "rustface")]
mod rustface_backend;

#[cfg(feature = "rustface")]
pub use rustface_backend::{RustfaceConfig, RustfaceDetector};

use crate::error::DetectionError;
use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// A rectangular face region. `bottom` and `right` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

impl BoundingBox {
    /// Create a box from its four edges, in (top, right, bottom, left) order
    pub fn new(top: u32, right: u32, bottom: u32, left: u32) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    /// Build a box from an origin and a size, as most detectors report them.
    ///
    /// Negative origins are cut off at zero.
    pub fn from_xywh(x: i64, y: i64, width: u32, height: u32) -> Self {
        let left = x.max(0);
        let top = y.max(0);
        let right = (x + width as i64).max(0);
        let bottom = (y + height as i64).max(0);
        Self::new(
            saturate(top),
            saturate(right),
            saturate(bottom),
            saturate(left),
        )
    }

    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }

    /// True when the box covers no pixel
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Multiply every edge by `factor`, mapping a box found on a
    /// `1/factor` downsampled copy back to full resolution.
    pub fn scale(&self, factor: u32) -> Self {
        Self::new(
            self.top.saturating_mul(factor),
            self.right.saturating_mul(factor),
            self.bottom.saturating_mul(factor),
            self.left.saturating_mul(factor),
        )
    }

    /// Clip the box to a `width` x `height` image.
    ///
    /// Returns `None` when nothing of the box is left inside the image.
    pub fn clamp(&self, width: u32, height: u32) -> Option<Self> {
        let clipped = Self::new(
            self.top.min(height),
            self.right.min(width),
            self.bottom.min(height),
            self.left.min(width),
        );
        if clipped.is_empty() {
            None
        } else {
            Some(clipped)
        }
    }

    /// Whether pixel (`x`, `y`) lies inside the box
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.left && x < self.right && y >= self.top && y < self.bottom
    }
}

fn saturate(value: i64) -> u32 {
    value.clamp(0, u32::MAX as i64) as u32
}

/// Pluggable face detection backend.
///
/// Implementations are shared by reference across the worker pool, so they
/// must be `Send + Sync` and must not keep per-call state in `&self`.
pub trait FaceDetector: Send + Sync {
    /// Find faces in `image`, in that image's own coordinates.
    fn detect(&self, image: &DynamicImage) -> Result<Vec<BoundingBox>, DetectionError>;
}

impl<T: FaceDetector + ?Sized> FaceDetector for Box<T> {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<BoundingBox>, DetectionError> {
        (**self).detect(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_multiplies_every_edge() {
        let scaled = BoundingBox::new(10, 50, 60, 5).scale(2);
        assert_eq!(scaled, BoundingBox::new(20, 100, 120, 10));
    }

    #[test]
    fn scale_by_one_is_identity() {
        let bbox = BoundingBox::new(3, 9, 7, 1);
        assert_eq!(bbox.scale(1), bbox);
    }

    #[test]
    fn from_xywh_cuts_negative_origin() {
        let bbox = BoundingBox::from_xywh(-4, -2, 10, 6);
        assert_eq!(bbox, BoundingBox::new(0, 6, 4, 0));
    }

    #[test]
    fn clamp_keeps_box_inside_image() {
        let bbox = BoundingBox::new(90, 130, 140, 80).clamp(100, 100).unwrap();
        assert_eq!(bbox, BoundingBox::new(90, 100, 100, 80));
        assert!(bbox.top < bbox.bottom);
        assert!(bbox.left < bbox.right);
    }

    #[test]
    fn clamp_drops_box_outside_image() {
        assert!(BoundingBox::new(120, 50, 140, 10).clamp(100, 100).is_none());
    }

    #[test]
    fn contains_excludes_far_edges() {
        let bbox = BoundingBox::new(0, 4, 4, 0);
        assert!(bbox.contains(0, 0));
        assert!(bbox.contains(3, 3));
        assert!(!bbox.contains(4, 3));
        assert!(!bbox.contains(3, 4));
    }
}
