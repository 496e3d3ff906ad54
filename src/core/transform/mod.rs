//! # Transform Module
//!
//! Blurs every face in exactly one image.
//!
//! ## Steps
//! 1. **Decode** the source into a full-resolution buffer
//! 2. **Downsample** a copy by `1/zoom_factor` for the detector
//! 3. **Detect** faces on the copy
//! 4. **Rescale** each box by `zoom_factor` and clamp it to the image
//! 5. **Blur** each box on the full-resolution buffer, in detection order
//! 6. **Write** the result, or pass the image through when there were no faces
//!
//! Overlapping boxes are blurred once per box, so the overlap gets blurred
//! twice. That is accepted, not merged away.

pub mod fast_resize;

pub use fast_resize::{FastResizer, ResampleFilter};

use crate::core::blur::{GaussianRegionBlur, RegionBlur};
use crate::core::codec::{FastCodec, ImageCodec};
use crate::core::detector::{BoundingBox, FaceDetector};
use crate::error::{DetectionError, TaskError};
use crate::events::{TaskReport, TaskStatus};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One image to process. Built by discovery, consumed by one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageTask {
    pub source: PathBuf,
    pub destination: PathBuf,
    /// Detection downsample divisor, at least 1
    pub zoom_factor: u32,
}

impl ImageTask {
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>, zoom_factor: u32) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            zoom_factor: zoom_factor.max(1),
        }
    }
}

/// How faceless images reach the destination
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PassThroughMode {
    /// Write the decoded buffer back out through the codec
    #[default]
    Reencode,
    /// Copy the source bytes verbatim
    Copy,
}

/// What to do when the detector itself fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectionFailurePolicy {
    /// Count the image as failed and write nothing
    #[default]
    Fail,
    /// Treat the image as having no faces
    PassThrough,
}

/// Per-image behaviour
#[derive(Debug, Clone, Default)]
pub struct TransformConfig {
    /// Resampling for the detection copy
    pub resample: ResampleFilter,
    /// Output for images without faces
    pub pass_through: PassThroughMode,
    /// Reaction to detector errors
    pub on_detection_error: DetectionFailurePolicy,
}

/// Terminal state of one task
#[derive(Debug)]
pub enum TaskOutcome {
    /// Faces were blurred; boxes are in full-resolution coordinates
    Blurred { faces: Vec<BoundingBox> },
    /// No faces found, image passed through
    NoFaces,
    /// Processing stopped; nothing usable was written
    Failed(TaskError),
    /// Never started because the run was cancelled
    Cancelled,
}

impl TaskOutcome {
    pub fn status(&self) -> TaskStatus {
        match self {
            TaskOutcome::Blurred { .. } => TaskStatus::Blurred,
            TaskOutcome::NoFaces => TaskStatus::NoFaces,
            TaskOutcome::Failed(_) => TaskStatus::Failed,
            TaskOutcome::Cancelled => TaskStatus::Cancelled,
        }
    }

    /// Blurred regions, empty unless faces were found
    pub fn faces(&self) -> &[BoundingBox] {
        match self {
            TaskOutcome::Blurred { faces } => faces,
            _ => &[],
        }
    }

    /// Flatten into the serialisable form sent with events
    pub fn into_report(self, task: &ImageTask, duration_ms: u64) -> TaskReport {
        let status = self.status();
        let (faces, message) = match self {
            TaskOutcome::Blurred { faces } => (faces, None),
            TaskOutcome::Failed(error) => (Vec::new(), Some(error.to_string())),
            TaskOutcome::NoFaces | TaskOutcome::Cancelled => (Vec::new(), None),
        };
        TaskReport {
            source: task.source.clone(),
            destination: task.destination.clone(),
            status,
            faces,
            message,
            duration_ms,
        }
    }
}

/// Detector, blur and codec wired together for single images
pub struct FaceBlurTransform {
    detector: Box<dyn FaceDetector>,
    blur: Box<dyn RegionBlur>,
    codec: Box<dyn ImageCodec>,
    config: TransformConfig,
}

impl FaceBlurTransform {
    /// Use `detector` with the 31x31 Gaussian blur and the default codec
    pub fn new(detector: impl FaceDetector + 'static) -> Self {
        Self {
            detector: Box::new(detector),
            blur: Box::new(GaussianRegionBlur::new()),
            codec: Box::new(FastCodec::new()),
            config: TransformConfig::default(),
        }
    }

    /// Replace the region blur
    pub fn blur(mut self, blur: impl RegionBlur + 'static) -> Self {
        self.blur = Box::new(blur);
        self
    }

    /// Replace the codec
    pub fn codec(mut self, codec: impl ImageCodec + 'static) -> Self {
        self.codec = Box::new(codec);
        self
    }

    /// Replace the per-image behaviour
    pub fn config(mut self, config: TransformConfig) -> Self {
        self.config = config;
        self
    }

    /// Process one image. Never panics on bad input; failures come back as
    /// [`TaskOutcome::Failed`].
    pub fn run(&self, task: &ImageTask) -> TaskOutcome {
        match self.apply(task) {
            Ok(faces) if faces.is_empty() => {
                info!(path = %task.source.display(), "no faces found");
                TaskOutcome::NoFaces
            }
            Ok(faces) => {
                info!(
                    path = %task.source.display(),
                    faces = faces.len(),
                    destination = %task.destination.display(),
                    "faces blurred"
                );
                TaskOutcome::Blurred { faces }
            }
            Err(error) => {
                warn!(path = %task.source.display(), %error, "image failed");
                TaskOutcome::Failed(error)
            }
        }
    }

    fn apply(&self, task: &ImageTask) -> Result<Vec<BoundingBox>, TaskError> {
        debug!(path = %task.source.display(), "decoding");
        let mut image = self.codec.decode(&task.source)?;

        debug!(path = %task.source.display(), zoom = task.zoom_factor, "detecting");
        let faces = match self.detect(&image, task) {
            Ok(faces) => faces,
            Err(error) => match self.config.on_detection_error {
                DetectionFailurePolicy::Fail => return Err(error),
                DetectionFailurePolicy::PassThrough => {
                    warn!(path = %task.source.display(), %error, "detection failed, passing through");
                    Vec::new()
                }
            },
        };

        if faces.is_empty() {
            self.pass_through(&image, task)?;
            return Ok(faces);
        }

        for face in &faces {
            debug!(path = %task.source.display(), ?face, "blurring");
            self.blur.blur_region(&mut image, face);
        }

        self.codec.encode(&image, &task.destination)?;
        Ok(faces)
    }

    /// Detect on the downsampled copy and map the boxes back to full size
    fn detect(&self, image: &DynamicImage, task: &ImageTask) -> Result<Vec<BoundingBox>, TaskError> {
        let detection_error = |e: DetectionError| TaskError::Detection {
            path: task.source.clone(),
            reason: e.to_string(),
        };

        let small = FastResizer::new(self.config.resample)
            .downsample(image, task.zoom_factor)
            .map_err(detection_error)?;
        let boxes = self.detector.detect(&small).map_err(detection_error)?;

        Ok(rescale(&boxes, task.zoom_factor, image.width(), image.height()))
    }

    fn pass_through(&self, image: &DynamicImage, task: &ImageTask) -> Result<(), TaskError> {
        match self.config.pass_through {
            PassThroughMode::Reencode => self.codec.encode(image, &task.destination),
            PassThroughMode::Copy => copy_file(&task.source, &task.destination),
        }
    }
}

/// Map detection-space boxes to a `width` x `height` image, dropping any
/// that end up empty.
pub fn rescale(boxes: &[BoundingBox], zoom_factor: u32, width: u32, height: u32) -> Vec<BoundingBox> {
    boxes
        .iter()
        .filter_map(|b| b.scale(zoom_factor).clamp(width, height))
        .collect()
}

pub(crate) fn copy_file(source: &Path, destination: &Path) -> Result<(), TaskError> {
    copy_bytes(source, destination).map_err(|e| TaskError::Copy {
        from: source.to_path_buf(),
        to: destination.to_path_buf(),
        source: e,
    })
}

/// `fs::copy` that refuses to copy a file onto itself.
///
/// `fs::copy` truncates the destination before reading the source, so a
/// destination resolving to the source would end up empty.
pub(crate) fn copy_bytes(source: &Path, destination: &Path) -> std::io::Result<()> {
    if let (Ok(from), Ok(to)) = (fs::canonicalize(source), fs::canonicalize(destination)) {
        if from == to {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "source and destination are the same file",
            ));
        }
    }
    fs::copy(source, destination).map(|_| ())
}
