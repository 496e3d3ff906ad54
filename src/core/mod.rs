//! # Core Module
//!
//! The face blurring engine.
//!
//! ## Modules
//! - `scanner` - Walks the source tree and mirrors its directories
//! - `detector` - Face detection trait and backends
//! - `codec` - Image decoding and encoding
//! - `blur` - Region blur applied to each face
//! - `transform` - Blurs the faces of one image
//! - `pipeline` - Runs the transform over a whole tree on a worker pool

pub mod blur;
pub mod codec;
pub mod detector;
pub mod pipeline;
pub mod scanner;
pub mod transform;

// Re-export commonly used types
pub use detector::{BoundingBox, FaceDetector};
pub use pipeline::{Pipeline, PipelineResult};
pub use transform::{FaceBlurTransform, ImageTask, TaskOutcome};
