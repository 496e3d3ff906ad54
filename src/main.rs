//! # faceblur CLI
//!
//! Command-line interface for the face blurring pipeline.
//!
//! ## Usage
//! ```bash
//! faceblur ~/Photos ~/Photos-blurred --model seeta_fd_frontal_v1.0.bin
//! faceblur portrait.jpg portrait-blurred.jpg --zoom 2
//! ```

mod cli;

use std::process::ExitCode;

fn main() -> ExitCode {
    cli::run()
}
