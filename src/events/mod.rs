//! # Events Module
//!
//! Event-driven progress reporting.
//!
//! ## Design
//! The core library never prints. Every task emits exactly one
//! [`TaskEvent::Finished`] carrying a [`TaskReport`], and any front end
//! (the CLI, a test, a log collector) subscribes to the channel and renders
//! what it likes.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         if let Event::Task(TaskEvent::Finished(report)) = event {
//!             println!("{}: {}", report.source.display(), report.status);
//!         }
//!     }
//! });
//!
//! pipeline.run_with_events(&sender)?;
//! ```

mod channel;
mod types;

pub use channel::{EventChannel, EventReceiver, EventSender, null_sender};
pub use types::*;
