//! Pipeline execution implementation.

use super::CancellationToken;
use crate::core::scanner::{ScanConfig, TreeMirror, UnmatchedFilePolicy};
use crate::core::transform::{FaceBlurTransform, ImageTask, TaskOutcome};
use crate::error::{FaceBlurError, ScanError};
use crate::events::{
    null_sender, BlurSummary, EventSender, PipelineEvent, ScanEvent, TaskEvent, TaskReport,
};
use rayon::prelude::*;
use std::fs;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

/// Worker count used when the CPU count cannot be determined
pub const FALLBACK_WORKERS: usize = 2;

/// Pick the pool size: a positive override wins, then the CPU count, then
/// [`FALLBACK_WORKERS`].
pub fn resolve_workers(requested: Option<usize>) -> usize {
    requested.filter(|n| *n > 0).unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(FALLBACK_WORKERS)
    })
}

/// Result of pipeline execution
#[derive(Debug)]
pub struct PipelineResult {
    /// One report per image, sorted by source path
    pub reports: Vec<TaskReport>,
    /// Totals for the run
    pub summary: BlurSummary,
    /// Non-fatal scan errors (directories, copy-through)
    pub errors: Vec<String>,
    /// Whether the run stopped early
    pub cancelled: bool,
}

/// Configuration for the pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Detection downsample divisor
    pub zoom_factor: u32,
    /// Worker override (None = CPU count)
    pub workers: Option<usize>,
    /// Scanner configuration
    pub scan_config: ScanConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            zoom_factor: 1,
            workers: None,
            scan_config: ScanConfig::default(),
        }
    }
}

/// Builder for pipeline configuration
pub struct PipelineBuilder {
    config: PipelineConfig,
    transform: Option<FaceBlurTransform>,
    cancel: CancellationToken,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            transform: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Set the per-image transform (required)
    pub fn transform(mut self, transform: FaceBlurTransform) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Set the detection downsample divisor
    pub fn zoom_factor(mut self, zoom_factor: u32) -> Self {
        self.config.zoom_factor = zoom_factor;
        self
    }

    /// Override the worker count
    pub fn workers(mut self, workers: Option<usize>) -> Self {
        self.config.workers = workers;
        self
    }

    /// Set scanner configuration
    pub fn scan_config(mut self, config: ScanConfig) -> Self {
        self.config.scan_config = config;
        self
    }

    /// Leave out dot-files and dot-directories
    pub fn skip_hidden(mut self, skip: bool) -> Self {
        self.config.scan_config.skip_hidden = skip;
        self
    }

    /// Follow symbolic links while walking
    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.config.scan_config.follow_symlinks = follow;
        self
    }

    /// Restrict the transformed extensions
    pub fn extensions(mut self, extensions: Vec<String>) -> Self {
        self.config.scan_config.extensions = Some(extensions);
        self
    }

    /// Choose what happens to non-image files
    pub fn unmatched(mut self, policy: UnmatchedFilePolicy) -> Self {
        self.config.scan_config.unmatched = policy;
        self
    }

    /// Share a cancellation token with the caller
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Build the pipeline, resolving the worker count
    pub fn build(self) -> Result<Pipeline, FaceBlurError> {
        let transform = self
            .transform
            .ok_or_else(|| FaceBlurError::Config("no face blur transform configured".to_string()))?;

        if self.config.zoom_factor == 0 {
            return Err(FaceBlurError::Config(
                "zoom factor must be at least 1".to_string(),
            ));
        }

        let workers = resolve_workers(self.config.workers);

        Ok(Pipeline {
            config: self.config,
            workers,
            transform,
            cancel: self.cancel,
        })
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The face blurring pipeline
pub struct Pipeline {
    config: PipelineConfig,
    workers: usize,
    transform: FaceBlurTransform,
    cancel: CancellationToken,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Size of the worker pool
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Token that cancels this pipeline's outstanding tasks
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run the pipeline without events
    pub fn run(&self, source: &Path, destination: &Path) -> Result<PipelineResult, FaceBlurError> {
        self.run_with_events(source, destination, &null_sender())
    }

    /// Run the pipeline with event reporting.
    ///
    /// A directory source is mirrored into `destination`; a file source is
    /// written to `destination` as a file, or into it when it is an
    /// existing directory.
    pub fn run_with_events(
        &self,
        source: &Path,
        destination: &Path,
        events: &EventSender,
    ) -> Result<PipelineResult, FaceBlurError> {
        let result = self.execute(source, destination, events);
        if let Err(ref error) = result {
            events.send(PipelineEvent::Error {
                message: error.to_string(),
            });
        }
        result
    }

    fn execute(
        &self,
        source: &Path,
        destination: &Path,
        events: &EventSender,
    ) -> Result<PipelineResult, FaceBlurError> {
        let start_time = Instant::now();

        if !source.exists() {
            return Err(ScanError::SourceNotFound {
                path: source.to_path_buf(),
            }
            .into());
        }
        if source.is_dir() {
            reject_same_path(source, destination)?;
        }

        info!(
            source = %source.display(),
            destination = %destination.display(),
            workers = self.workers,
            "searching and blurring faces"
        );
        events.send(PipelineEvent::Started {
            workers: self.workers,
        });

        let mut summary = BlurSummary::default();
        let mut errors = Vec::new();

        let mut reports = if source.is_file() {
            let task = self.single_file_task(source, destination)?;
            reject_same_path(source, &task.destination)?;
            events.send(ScanEvent::Completed { total_tasks: 1 });
            vec![self.process(&task, destination, events)]
        } else {
            let scan = TreeMirror::new(self.config.scan_config.clone()).mirror(
                source,
                destination,
                self.config.zoom_factor,
                events,
            )?;

            summary.directories = scan.directories;
            summary.copied = scan.copied;
            summary.skipped = scan.skipped;
            errors.extend(scan.errors.iter().map(|e| e.to_string()));

            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.workers)
                .thread_name(|i| format!("faceblur-worker-{i}"))
                .build()
                .map_err(|e| ScanError::ThreadPool(e.to_string()))?;

            pool.install(|| {
                scan.tasks
                    .par_iter()
                    .map(|task| self.process(task, destination, events))
                    .collect::<Vec<_>>()
            })
        };

        reports.sort_by(|a, b| a.source.cmp(&b.source));
        for report in &reports {
            summary.record(report);
        }
        summary.duration_ms = start_time.elapsed().as_millis() as u64;

        let cancelled = self.cancel.is_cancelled();
        if cancelled {
            events.send(PipelineEvent::Cancelled);
        }

        info!(
            images = summary.total_images,
            blurred = summary.blurred,
            no_faces = summary.no_faces,
            failed = summary.failed,
            duration_ms = summary.duration_ms,
            "run finished"
        );
        events.send(PipelineEvent::Completed {
            summary: summary.clone(),
        });

        Ok(PipelineResult {
            reports,
            summary,
            errors,
            cancelled,
        })
    }

    /// Run one task on the current thread and report it
    fn process(&self, task: &ImageTask, destination_root: &Path, events: &EventSender) -> TaskReport {
        let started = Instant::now();

        let outcome = if self.cancel.is_cancelled() {
            TaskOutcome::Cancelled
        } else {
            events.send(TaskEvent::Started {
                source: task.source.clone(),
            });
            self.transform.run(task)
        };

        if let TaskOutcome::Failed(ref error) = outcome {
            if error.is_write_failure() && !destination_root.is_dir() && !self.cancel.is_cancelled() {
                warn!(
                    destination = %destination_root.display(),
                    "destination root is gone, cancelling outstanding images"
                );
                self.cancel.cancel();
            }
        }

        let report = outcome.into_report(task, started.elapsed().as_millis() as u64);
        events.send(TaskEvent::Finished(report.clone()));
        report
    }

    fn single_file_task(&self, source: &Path, destination: &Path) -> Result<ImageTask, FaceBlurError> {
        let target = match source.file_name() {
            Some(name) if destination.is_dir() => destination.join(name),
            _ => destination.to_path_buf(),
        };

        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| ScanError::DestinationRoot {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        Ok(ImageTask::new(source, target, self.config.zoom_factor))
    }
}

/// Writing onto the source would overwrite the very files being read
fn reject_same_path(source: &Path, destination: &Path) -> Result<(), FaceBlurError> {
    match (fs::canonicalize(source), fs::canonicalize(destination)) {
        (Ok(from), Ok(to)) if from == to => Err(FaceBlurError::Config(format!(
            "destination {} is the source itself",
            destination.display()
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::codec::{FastCodec, ImageCodec};
    use crate::core::detector::{BoundingBox, FaceDetector};
    use crate::core::transform::{PassThroughMode, TransformConfig};
    use crate::error::{DetectionError, TaskError};
    use crate::events::TaskStatus;
    use image::{DynamicImage, ImageBuffer, Rgb};
    use std::path::PathBuf;
    use tempfile::TempDir;

    struct NoFaces;

    impl FaceDetector for NoFaces {
        fn detect(&self, _image: &DynamicImage) -> Result<Vec<BoundingBox>, DetectionError> {
            Ok(Vec::new())
        }
    }

    fn pipeline() -> PipelineBuilder {
        Pipeline::builder()
            .transform(FaceBlurTransform::new(NoFaces))
            .workers(Some(2))
    }

    fn write_image(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        ImageBuffer::from_pixel(24, 16, Rgb([90u8, 120, 30]))
            .save(path)
            .unwrap();
    }

    #[test]
    fn pipeline_builder_requires_a_transform() {
        assert!(matches!(
            Pipeline::builder().build(),
            Err(FaceBlurError::Config(_))
        ));
    }

    #[test]
    fn pipeline_builder_rejects_zero_zoom() {
        assert!(matches!(
            pipeline().zoom_factor(0).build(),
            Err(FaceBlurError::Config(_))
        ));
    }

    #[test]
    fn worker_override_is_used() {
        assert_eq!(resolve_workers(Some(3)), 3);
        assert_eq!(pipeline().build().unwrap().workers(), 2);
    }

    #[test]
    fn zero_workers_falls_back_to_detection() {
        assert!(resolve_workers(Some(0)) >= 1);
        assert!(resolve_workers(None) >= 1);
    }

    #[test]
    fn pipeline_handles_empty_directory() {
        let source = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();

        let result = pipeline().build().unwrap().run(source.path(), out.path()).unwrap();

        assert_eq!(result.summary.total_images, 0);
        assert!(result.reports.is_empty());
        assert!(!result.cancelled);
    }

    #[test]
    fn single_file_goes_to_destination_path() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("in.png");
        write_image(&source);
        let destination = dir.path().join("nested/out.png");

        let result = pipeline().build().unwrap().run(&source, &destination).unwrap();

        assert_eq!(result.reports.len(), 1);
        assert_eq!(result.reports[0].status, TaskStatus::NoFaces);
        assert!(destination.is_file());
    }

    #[test]
    fn single_file_into_existing_directory_keeps_name() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("in.png");
        write_image(&source);
        let out = TempDir::new().unwrap();

        pipeline().build().unwrap().run(&source, out.path()).unwrap();

        assert!(out.path().join("in.png").is_file());
    }

    #[test]
    fn cancelled_pipeline_starts_nothing() {
        let source = TempDir::new().unwrap();
        write_image(&source.path().join("a.png"));
        write_image(&source.path().join("b/c.png"));
        let out = TempDir::new().unwrap();

        let token = CancellationToken::new();
        token.cancel();
        let result = pipeline()
            .cancellation(token)
            .build()
            .unwrap()
            .run(source.path(), out.path())
            .unwrap();

        assert!(result.cancelled);
        assert_eq!(result.summary.cancelled, 2);
        assert!(!out.path().join("a.png").exists());
        // directories are mirrored before any task runs
        assert!(out.path().join("b").is_dir());
    }

    #[test]
    fn missing_source_is_fatal() {
        let out = TempDir::new().unwrap();
        let destination = out.path().join("never");

        let result = pipeline()
            .build()
            .unwrap()
            .run(&PathBuf::from("/nonexistent/path/12345"), &destination);

        assert!(matches!(
            result,
            Err(FaceBlurError::Scan(ScanError::SourceNotFound { .. }))
        ));
        assert!(!destination.exists());
    }

    /// Removes the destination root on its first write, then fails like a
    /// vanished mount would
    struct VanishingRootCodec {
        root: PathBuf,
    }

    impl ImageCodec for VanishingRootCodec {
        fn decode(&self, path: &Path) -> Result<DynamicImage, TaskError> {
            FastCodec::new().decode(path)
        }

        fn encode(&self, _image: &DynamicImage, path: &Path) -> Result<(), TaskError> {
            let _ = fs::remove_dir_all(&self.root);
            Err(TaskError::DestinationUnwritable {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "destination is gone"),
            })
        }
    }

    #[test]
    fn destination_equal_to_source_is_rejected() {
        let source = TempDir::new().unwrap();
        write_image(&source.path().join("a.png"));
        fs::write(source.path().join("notes.txt"), "keep me").unwrap();
        let before = fs::read(source.path().join("a.png")).unwrap();

        let copying = Pipeline::builder()
            .transform(FaceBlurTransform::new(NoFaces).config(TransformConfig {
                pass_through: PassThroughMode::Copy,
                ..Default::default()
            }))
            .unmatched(UnmatchedFilePolicy::Copy)
            .build()
            .unwrap();
        let result = copying.run(source.path(), source.path());

        assert!(matches!(result, Err(FaceBlurError::Config(_))));
        assert_eq!(fs::read(source.path().join("a.png")).unwrap(), before);
        assert_eq!(
            fs::read_to_string(source.path().join("notes.txt")).unwrap(),
            "keep me"
        );
    }

    #[test]
    fn single_file_onto_itself_is_rejected() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("in.png");
        write_image(&source);
        let before = fs::read(&source).unwrap();

        // the directory form resolves to the same file
        let result = pipeline().build().unwrap().run(&source, dir.path());

        assert!(matches!(result, Err(FaceBlurError::Config(_))));
        assert_eq!(fs::read(&source).unwrap(), before);
    }

    #[test]
    fn vanished_destination_cancels_outstanding_tasks() {
        let source = TempDir::new().unwrap();
        for name in ["a.png", "b.png", "c.png", "d.png"] {
            write_image(&source.path().join(name));
        }
        let out = TempDir::new().unwrap();
        let destination = out.path().join("blurred");

        let result = Pipeline::builder()
            .transform(FaceBlurTransform::new(NoFaces).codec(VanishingRootCodec {
                root: destination.clone(),
            }))
            .workers(Some(1))
            .build()
            .unwrap()
            .run(source.path(), &destination)
            .unwrap();

        assert!(result.cancelled);
        assert_eq!(result.summary.failed, 1);
        assert_eq!(result.summary.cancelled, 3);
        assert!(!destination.exists());
    }

    #[test]
    fn unwritable_file_does_not_stop_the_others() {
        let source = TempDir::new().unwrap();
        write_image(&source.path().join("a.png"));
        write_image(&source.path().join("b.png"));
        let out = TempDir::new().unwrap();
        // a directory squatting on one output path
        fs::create_dir_all(out.path().join("a.png")).unwrap();

        let result = pipeline().build().unwrap().run(source.path(), out.path()).unwrap();

        assert!(!result.cancelled);
        assert_eq!(result.summary.failed, 1);
        assert_eq!(result.summary.no_faces, 1);
        assert_eq!(result.reports[0].status, TaskStatus::Failed);
        assert!(result.reports[0]
            .message
            .as_deref()
            .unwrap()
            .contains("a.png"));
        assert!(out.path().join("b.png").is_file());
    }
}
