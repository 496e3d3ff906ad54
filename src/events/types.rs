//! Event type definitions for progress reporting.

use crate::core::detector::BoundingBox;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted by the blur pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Tree walking and mirroring events
    Scan(ScanEvent),
    /// Per-image events
    Task(TaskEvent),
    /// Pipeline-level events
    Pipeline(PipelineEvent),
}

impl From<ScanEvent> for Event {
    fn from(event: ScanEvent) -> Self {
        Event::Scan(event)
    }
}

impl From<TaskEvent> for Event {
    fn from(event: TaskEvent) -> Self {
        Event::Task(event)
    }
}

impl From<PipelineEvent> for Event {
    fn from(event: PipelineEvent) -> Self {
        Event::Pipeline(event)
    }
}

/// Events while walking the source tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScanEvent {
    /// Walking has started
    Started { source: PathBuf, destination: PathBuf },
    /// A destination directory now exists for a source directory
    DirectoryMirrored { source: PathBuf, destination: PathBuf },
    /// A non-image file was copied through unchanged
    FileCopied { source: PathBuf, destination: PathBuf },
    /// An error occurred but walking continues
    Error { path: PathBuf, message: String },
    /// Walking completed, all tasks are known
    Completed { total_tasks: usize },
}

/// Events for a single image
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TaskEvent {
    /// A worker picked up the image
    Started { source: PathBuf },
    /// The image reached a terminal state
    Finished(TaskReport),
}

/// Terminal status of one image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Faces were found and blurred
    Blurred,
    /// No faces; the image was passed through
    NoFaces,
    /// The image could not be processed
    Failed,
    /// The run was cancelled before the image was started
    Cancelled,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Blurred => write!(f, "face(s) blurred"),
            TaskStatus::NoFaces => write!(f, "no faces found"),
            TaskStatus::Failed => write!(f, "failed"),
            TaskStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// What happened to one image
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskReport {
    /// Source image
    pub source: PathBuf,
    /// Where the output was (or would have been) written
    pub destination: PathBuf,
    /// Terminal status
    pub status: TaskStatus,
    /// Blurred regions in full-resolution coordinates
    pub faces: Vec<BoundingBox>,
    /// Error message for failed tasks
    pub message: Option<String>,
    /// Wall time spent on this image
    pub duration_ms: u64,
}

impl TaskReport {
    /// Number of faces blurred
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }
}

/// Pipeline-level events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    /// Pipeline has started
    Started { workers: usize },
    /// Pipeline completed
    Completed { summary: BlurSummary },
    /// Pipeline was cancelled; outstanding tasks are skipped
    Cancelled,
    /// Pipeline encountered a fatal error
    Error { message: String },
}

/// Summary of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlurSummary {
    /// Images submitted to the worker pool
    pub total_images: usize,
    /// Images with at least one face blurred
    pub blurred: usize,
    /// Images passed through without faces
    pub no_faces: usize,
    /// Images that failed
    pub failed: usize,
    /// Images skipped because the run was cancelled
    pub cancelled: usize,
    /// Total faces blurred across all images
    pub faces: usize,
    /// Destination directories mirrored
    pub directories: usize,
    /// Non-image files copied through
    pub copied: usize,
    /// Non-image files ignored
    pub skipped: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl BlurSummary {
    /// Count a finished task
    pub fn record(&mut self, report: &TaskReport) {
        self.total_images += 1;
        match report.status {
            TaskStatus::Blurred => {
                self.blurred += 1;
                self.faces += report.face_count();
            }
            TaskStatus::NoFaces => self.no_faces += 1,
            TaskStatus::Failed => self.failed += 1,
            TaskStatus::Cancelled => self.cancelled += 1,
        }
    }
}
