//! # CLI Module
//!
//! Command-line interface for the face blurring pipeline.
//!
//! ## Usage
//! ```bash
//! # Blur a whole tree
//! faceblur ~/Photos ~/Photos-blurred
//!
//! # One file, detecting on a half-size copy
//! faceblur party.jpg party-blurred.jpg --zoom 2
//!
//! # JSON report for scripting
//! faceblur ~/Photos /tmp/out --output json
//! ```

use clap::{Parser, ValueEnum};
use console::{style, Term};
use faceblur::core::codec::{FastCodec, DEFAULT_JPEG_QUALITY};
use faceblur::core::pipeline::{Pipeline, PipelineResult};
use faceblur::core::scanner::UnmatchedFilePolicy;
use faceblur::core::transform::{
    DetectionFailurePolicy, FaceBlurTransform, PassThroughMode, TransformConfig,
};
use faceblur::error::Result;
use faceblur::events::{Event, EventChannel, ScanEvent, TaskEvent, TaskStatus};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;

/// faceblur - blur every face in a photo or a tree of photos
#[derive(Parser, Debug)]
#[command(name = "faceblur")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Source image or directory
    #[arg(requires = "destination")]
    source: Option<PathBuf>,

    /// Destination image or directory
    destination: Option<PathBuf>,

    /// Worker threads (default: number of CPUs)
    #[arg(short, long, env = "FACEBLUR_JOBS")]
    jobs: Option<usize>,

    /// Detect faces on a copy shrunk by this factor
    #[arg(short, long, env = "FACEBLUR_ZOOM", default_value_t = 1,
          value_parser = clap::value_parser!(u32).range(1..))]
    zoom: u32,

    /// SeetaFace frontal model file
    #[arg(short, long, env = "FACEBLUR_MODEL")]
    model: Option<PathBuf>,

    /// Smallest face the detector looks for, in detection pixels
    #[arg(long, default_value_t = 20)]
    min_face_size: u32,

    /// Image extension to process (repeatable, case-insensitive)
    #[arg(long = "ext", value_name = "EXT")]
    extensions: Vec<String>,

    /// Copy non-image files into the destination tree
    #[arg(long)]
    copy_unmatched: bool,

    /// Copy faceless images byte for byte instead of re-encoding them
    #[arg(long)]
    copy_passthrough: bool,

    /// Quality of re-encoded JPEG output
    #[arg(long, env = "FACEBLUR_JPEG_QUALITY", default_value_t = DEFAULT_JPEG_QUALITY,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    jpeg_quality: u8,

    /// Write images unblurred when face detection fails on them
    #[arg(long)]
    passthrough_on_detect_error: bool,

    /// Leave out files and directories whose name starts with a dot
    #[arg(long)]
    skip_hidden: bool,

    /// Follow symbolic links
    #[arg(long)]
    follow_symlinks: bool,

    /// Output format
    #[arg(short, long, default_value = "pretty")]
    output: OutputFormat,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
    /// Minimal output (written paths only)
    Minimal,
}

/// Run the CLI
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let (Some(source), Some(destination)) = (cli.source.clone(), cli.destination.clone()) else {
        print_banner();
        return ExitCode::SUCCESS;
    };

    faceblur::init_tracing(if cli.verbose { "debug" } else { "warn" });

    match run_blur(&cli, source, destination) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            Term::stderr()
                .write_line(&format!("{} {}", style("error:").red().bold(), error))
                .ok();
            ExitCode::FAILURE
        }
    }
}

fn print_banner() {
    println!("faceblur v{}", env!("CARGO_PKG_VERSION"));
    println!("Usage: faceblur <src-image|src-directory> <dest-image|dest-directory>");
    println!("Run `faceblur --help` for options.");
}

#[cfg(feature = "rustface")]
fn build_transform(cli: &Cli) -> Result<FaceBlurTransform> {
    use faceblur::core::detector::{RustfaceConfig, RustfaceDetector};

    let model = cli
        .model
        .clone()
        .unwrap_or_else(RustfaceDetector::default_model_path);
    let detector = RustfaceDetector::from_file(
        &model,
        RustfaceConfig {
            min_face_size: cli.min_face_size,
            ..Default::default()
        },
    )?;

    Ok(FaceBlurTransform::new(detector)
        .codec(FastCodec::new().jpeg_quality(cli.jpeg_quality))
        .config(transform_config(cli)))
}

#[cfg(not(feature = "rustface"))]
fn build_transform(_cli: &Cli) -> Result<FaceBlurTransform> {
    Err(faceblur::FaceBlurError::Config(
        "built without a face detector; enable the `rustface` feature".to_string(),
    ))
}

fn transform_config(cli: &Cli) -> TransformConfig {
    TransformConfig {
        pass_through: if cli.copy_passthrough {
            PassThroughMode::Copy
        } else {
            PassThroughMode::Reencode
        },
        on_detection_error: if cli.passthrough_on_detect_error {
            DetectionFailurePolicy::PassThrough
        } else {
            DetectionFailurePolicy::Fail
        },
        ..Default::default()
    }
}

fn run_blur(cli: &Cli, source: PathBuf, destination: PathBuf) -> Result<()> {
    let term = Term::stderr();
    let pretty = matches!(cli.output, OutputFormat::Pretty);

    let mut builder = Pipeline::builder()
        .transform(build_transform(cli)?)
        .zoom_factor(cli.zoom)
        .workers(cli.jobs)
        .skip_hidden(cli.skip_hidden)
        .follow_symlinks(cli.follow_symlinks)
        .unmatched(if cli.copy_unmatched {
            UnmatchedFilePolicy::Copy
        } else {
            UnmatchedFilePolicy::Skip
        });
    if !cli.extensions.is_empty() {
        builder = builder.extensions(cli.extensions.clone());
    }
    let pipeline = builder.build()?;

    if pretty {
        term.write_line(&format!(
            "{} {}",
            style("faceblur").bold().cyan(),
            style(format!("v{}", env!("CARGO_PKG_VERSION"))).dim()
        ))
        .ok();
        term.write_line(&format!(
            "Searching and blurring faces in {} using {} workers",
            style(source.display()).cyan(),
            pipeline.workers()
        ))
        .ok();
        term.write_line("").ok();
    }

    let (sender, receiver) = EventChannel::new();

    let progress = if pretty {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        Some(pb)
    } else {
        None
    };

    let progress_clone = progress.clone();
    let verbose = cli.verbose;

    let event_thread = thread::spawn(move || {
        for event in receiver.iter() {
            let Some(ref pb) = progress_clone else {
                continue;
            };
            match event {
                Event::Scan(ScanEvent::Completed { total_tasks }) => {
                    pb.set_length(total_tasks as u64);
                }
                Event::Task(TaskEvent::Started { source }) => {
                    pb.set_message(format!(
                        "{}: processing...",
                        source.file_name().unwrap_or_default().to_string_lossy()
                    ));
                }
                Event::Task(TaskEvent::Finished(report)) => {
                    pb.inc(1);
                    let line = match report.status {
                        TaskStatus::Blurred => format!(
                            "{} {}: {} face(s) blurred",
                            style("✓").green(),
                            report.source.display(),
                            report.face_count()
                        ),
                        TaskStatus::NoFaces => format!(
                            "{} {}: no faces found",
                            style("○").dim(),
                            report.source.display()
                        ),
                        TaskStatus::Failed => format!(
                            "{} {}: {}",
                            style("✗").red(),
                            report.source.display(),
                            report.message.as_deref().unwrap_or("failed")
                        ),
                        TaskStatus::Cancelled => continue,
                    };
                    if verbose || report.status != TaskStatus::NoFaces {
                        pb.println(line);
                    }
                }
                Event::Scan(ScanEvent::Error { message, .. }) => {
                    pb.println(format!("{} {}", style("!").yellow(), message));
                }
                _ => {}
            }
        }
    });

    let result = pipeline.run_with_events(&source, &destination, &sender);

    // Drop sender to signal event thread to finish
    drop(sender);
    event_thread.join().ok();
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    let result = result?;

    match cli.output {
        OutputFormat::Pretty => print_pretty_results(&term, &result),
        OutputFormat::Json => print_json_results(&result),
        OutputFormat::Minimal => print_minimal_results(&result),
    }

    Ok(())
}

fn print_pretty_results(term: &Term, result: &PipelineResult) {
    let summary = &result.summary;

    term.write_line("").ok();
    if result.cancelled {
        term.write_line(&format!("{} Run cancelled", style("!").yellow().bold()))
            .ok();
    } else {
        term.write_line(&format!("{} Done", style("✓").green().bold()))
            .ok();
    }
    term.write_line("").ok();

    term.write_line(&format!(
        "  {} images processed in {:.1}s",
        style(summary.total_images).cyan(),
        summary.duration_ms as f64 / 1000.0
    ))
    .ok();
    term.write_line(&format!(
        "  {} images with faces ({} faces blurred)",
        style(summary.blurred).cyan(),
        style(summary.faces).cyan()
    ))
    .ok();
    term.write_line(&format!(
        "  {} images without faces",
        style(summary.no_faces).cyan()
    ))
    .ok();

    if summary.failed > 0 {
        term.write_line(&format!("  {} failed", style(summary.failed).red()))
            .ok();
    }
    if summary.cancelled > 0 {
        term.write_line(&format!("  {} not started", style(summary.cancelled).yellow()))
            .ok();
    }
    if summary.copied > 0 {
        term.write_line(&format!("  {} other files copied", style(summary.copied).dim()))
            .ok();
    }
    if summary.skipped > 0 {
        term.write_line(&format!("  {} other files skipped", style(summary.skipped).dim()))
            .ok();
    }
    for error in &result.errors {
        term.write_line(&format!("  {} {}", style("!").yellow(), error)).ok();
    }
}

fn print_json_results(result: &PipelineResult) {
    let output = serde_json::json!({
        "summary": result.summary,
        "cancelled": result.cancelled,
        "errors": result.errors,
        "images": result.reports,
    });

    match serde_json::to_string_pretty(&output) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("failed to serialise results: {}", e),
    }
}

fn print_minimal_results(result: &PipelineResult) {
    for report in &result.reports {
        if matches!(report.status, TaskStatus::Blurred | TaskStatus::NoFaces) {
            println!("{}", report.destination.display());
        }
    }
}
