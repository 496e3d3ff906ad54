//! # faceblur
//!
//! Finds every face in a tree of photos and writes a copy of the tree with
//! those faces blurred.
//!
//! ## Architecture
//! - `core` - Tree mirroring, the per-image transform and the worker pool
//! - `events` - Event-driven progress reporting
//! - `error` - Error types
//!
//! The command-line front end lives in the `faceblur` binary.

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{FaceBlurError, Result};

/// Initialize tracing for the library
///
/// `default_directive` applies when `RUST_LOG` is not set.
pub fn init_tracing(default_directive: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    // a subscriber may already be installed (tests, embedding apps)
    let _ = tracing::subscriber::set_global_default(subscriber);
}
