//! Event channel implementation using crossbeam-channel.
//!
//! Workers on the rayon pool hold clones of one sender; the front end
//! drains the receiver on its own thread until every sender is gone.

use crossbeam_channel::{unbounded, Receiver, Sender};

use super::Event;

/// Cloneable handle the pipeline reports through
#[derive(Clone)]
pub struct EventSender {
    inner: Sender<Event>,
}

impl EventSender {
    /// Send a scan, task or pipeline event.
    ///
    /// Reporting is best effort: with the receiver gone the event is dropped
    /// and the run carries on.
    pub fn send(&self, event: impl Into<Event>) {
        let _ = self.inner.send(event.into());
    }
}

/// Receiving end, owned by whatever renders progress
pub struct EventReceiver {
    inner: Receiver<Event>,
}

impl EventReceiver {
    /// Events in arrival order; ends once every sender has been dropped
    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        self.inner.iter()
    }
}

/// Factory for sender/receiver pairs.
pub struct EventChannel;

impl EventChannel {
    /// Create an unbounded channel, so workers never wait on the renderer.
    pub fn new() -> (EventSender, EventReceiver) {
        let (sender, receiver) = unbounded();
        (
            EventSender { inner: sender },
            EventReceiver { inner: receiver },
        )
    }
}

/// A sender whose receiver is already gone; every event is dropped.
pub fn null_sender() -> EventSender {
    let (sender, _receiver) = EventChannel::new();
    sender
}
