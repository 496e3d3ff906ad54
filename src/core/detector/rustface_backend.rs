use super::{BoundingBox, FaceDetector};
use crate::error::{DetectionError, FaceBlurError};
use image::DynamicImage;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Tuning knobs for the SeetaFace cascade
#[derive(Debug, Clone)]
pub struct RustfaceConfig {
    /// Smallest face (in detection-space pixels) the cascade looks for
    pub min_face_size: u32,
    /// Minimum classifier score for a window to count as a face
    pub score_threshold: f64,
    /// Shrink factor between pyramid levels
    pub pyramid_scale_factor: f32,
    /// Sliding window step in both directions
    pub window_step: u32,
}

impl Default for RustfaceConfig {
    fn default() -> Self {
        Self {
            min_face_size: 20,
            score_threshold: 2.0,
            pyramid_scale_factor: 0.8,
            window_step: 4,
        }
    }
}

/// Face detector backed by the `rustface` crate (SeetaFace engine).
///
/// The model is read once; every call clones it into a fresh detector, so a
/// single instance can serve all workers at once.
pub struct RustfaceDetector {
    model: rustface::Model,
    config: RustfaceConfig,
}

impl RustfaceDetector {
    /// Load a SeetaFace frontal model (`seeta_fd_frontal_v1.0.bin`) from disk
    pub fn from_file(path: &Path, config: RustfaceConfig) -> Result<Self, FaceBlurError> {
        let file = File::open(path).map_err(|e| {
            FaceBlurError::Config(format!("cannot open face model {}: {}", path.display(), e))
        })?;
        let model = rustface::read_model(BufReader::new(file)).map_err(|e| {
            FaceBlurError::Config(format!("invalid face model {}: {}", path.display(), e))
        })?;

        tracing::debug!(model = %path.display(), "loaded SeetaFace model");

        Ok(Self { model, config })
    }

    /// Default model location: `$FACEBLUR_MODEL`, else the file name in the
    /// working directory.
    pub fn default_model_path() -> PathBuf {
        std::env::var_os("FACEBLUR_MODEL")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("seeta_fd_frontal_v1.0.bin"))
    }
}

impl FaceDetector for RustfaceDetector {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<BoundingBox>, DetectionError> {
        let gray = image.to_luma8();
        let (width, height) = gray.dimensions();
        if width == 0 || height == 0 {
            return Err(DetectionError("image has no pixels".to_string()));
        }

        let mut detector = rustface::create_detector_with_model(self.model.clone());
        detector.set_min_face_size(self.config.min_face_size);
        detector.set_score_thresh(self.config.score_threshold);
        detector.set_pyramid_scale_factor(self.config.pyramid_scale_factor);
        detector.set_slide_window_step(self.config.window_step, self.config.window_step);

        let faces = detector.detect(&rustface::ImageData::new(gray.as_raw(), width, height));

        Ok(faces
            .iter()
            .filter_map(|face| {
                let bbox = face.bbox();
                BoundingBox::from_xywh(
                    bbox.x() as i64,
                    bbox.y() as i64,
                    bbox.width(),
                    bbox.height(),
                )
                .clamp(width, height)
            })
            .collect())
    }
}
