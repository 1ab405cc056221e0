// SPDX-License-Identifier: MIT
//
// The device boundary.
//
// The event reactor never touches stdin, stdout or termios directly. It
// talks to a `Device`: something it can poll for the next event, post work
// into from other threads, paint cells into and flush. Painting and
// flushing live in the narrower `Surface` trait so that drawing code
// (a `Line` syncing itself, the error overlay) only sees what it needs.
//
// Events and posted work share one bounded FIFO channel. Keys from the
// reader thread, resizes, and `Poster::post` calls from arbitrary threads
// all land in the same queue, so the reactor observes them in exactly the
// order they were enqueued. Posting never blocks: a full queue is reported
// back to the caller as `PostError::Full`.

use std::io;
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};

use thiserror::Error;

use crate::cell::Attr;
use crate::input::KeyEvent;
use crate::terminal::Size;

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Device construction or initialization failed.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("terminal i/o failed: {0}")]
    Io(#[from] io::Error),
    #[error("stdin is not a terminal")]
    NotATerminal,
    #[error("device was already finalized")]
    Finalized,
}

/// Posting work to the device's event queue failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PostError {
    #[error("event queue is full")]
    Full,
    #[error("event queue is closed")]
    Disconnected,
}

// ─── Events ──────────────────────────────────────────────────────────────────

/// What a device delivers from [`Device::poll_event`].
///
/// `T` is the payload type of posted work; the device never looks inside.
#[derive(Debug)]
pub enum DeviceEvent<T> {
    /// The terminal now has this size.
    Resize(Size),
    /// A key was pressed.
    Key(KeyEvent),
    /// Work posted through a [`Poster`].
    Interrupt(T),
}

// ─── Poster ──────────────────────────────────────────────────────────────────

/// Cloneable, thread-safe handle that enqueues work for the device's
/// poller.
pub struct Poster<T> {
    tx: SyncSender<DeviceEvent<T>>,
}

impl<T> Clone for Poster<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> std::fmt::Debug for Poster<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poster").finish_non_exhaustive()
    }
}

impl<T> Poster<T> {
    pub(crate) const fn new(tx: SyncSender<DeviceEvent<T>>) -> Self {
        Self { tx }
    }

    /// Enqueue `payload` without blocking.
    ///
    /// # Errors
    ///
    /// [`PostError::Full`] when the queue is at capacity,
    /// [`PostError::Disconnected`] when the device's receiver is gone.
    pub fn post(&self, payload: T) -> Result<(), PostError> {
        self.send(DeviceEvent::Interrupt(payload))
    }

    /// Enqueue any event without blocking. Used by the sim handle to
    /// inject keys and resizes.
    pub(crate) fn send(&self, event: DeviceEvent<T>) -> Result<(), PostError> {
        self.tx.try_send(event).map_err(|e| match e {
            TrySendError::Full(_) => PostError::Full,
            TrySendError::Disconnected(_) => PostError::Disconnected,
        })
    }
}

/// The bounded queue every device delivers its events through.
///
/// A capacity of zero would turn posting into a rendezvous that always
/// fails with `Full`, so it is raised to one.
pub(crate) fn queue<T>(capacity: usize) -> (SyncSender<DeviceEvent<T>>, Receiver<DeviceEvent<T>>) {
    mpsc::sync_channel(capacity.max(1))
}

// ─── Traits ──────────────────────────────────────────────────────────────────

/// A grid of character cells that can be painted and flushed.
pub trait Surface {
    /// Current size in cells.
    fn size(&self) -> Size;

    /// Put `ch` at `(x, y)`. Out-of-bounds writes are ignored.
    fn set_content(&mut self, x: u16, y: u16, ch: char, attr: Attr);

    /// Blank every cell of the back buffer.
    fn clear(&mut self);

    /// Incremental flush: make changed cells visible.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to the terminal fails.
    fn show(&mut self) -> io::Result<()>;

    /// Full flush: repaint every cell regardless of what is on screen.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to the terminal fails.
    fn sync(&mut self) -> io::Result<()>;
}

/// A terminal the event reactor can drive.
pub trait Device<T>: Surface + Send {
    /// Take over the terminal. Called once before the first poll.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError`] if the terminal cannot be set up.
    fn init(&mut self) -> Result<(), DeviceError>;

    /// Give the terminal back. Idempotent.
    fn fini(&mut self);

    /// Block until the next event. `None` once the device is finalized.
    fn poll_event(&mut self) -> Option<DeviceEvent<T>>;

    /// A handle for enqueueing work from any thread.
    fn poster(&self) -> Poster<T>;
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_delivers_in_order() {
        let (tx, rx) = queue::<u32>(4);
        let poster = Poster::new(tx);
        poster.post(1).unwrap();
        poster.clone().post(2).unwrap();
        let got: Vec<u32> = rx
            .try_iter()
            .filter_map(|e| match e {
                DeviceEvent::Interrupt(n) => Some(n),
                _ => None,
            })
            .collect();
        assert_eq!(got, vec![1, 2]);
    }

    #[test]
    fn full_queue_is_reported() {
        let (tx, _rx) = queue::<u32>(1);
        let poster = Poster::new(tx);
        poster.post(1).unwrap();
        assert_eq!(poster.post(2), Err(PostError::Full));
    }

    #[test]
    fn dropped_receiver_is_reported() {
        let (tx, rx) = queue::<u32>(1);
        drop(rx);
        assert_eq!(Poster::new(tx).post(1), Err(PostError::Disconnected));
    }

    #[test]
    fn zero_capacity_still_queues_one() {
        let (tx, _rx) = queue::<u32>(0);
        assert!(Poster::new(tx).post(1).is_ok());
    }

    #[test]
    fn error_messages() {
        assert_eq!(PostError::Full.to_string(), "event queue is full");
        assert_eq!(
            DeviceError::NotATerminal.to_string(),
            "stdin is not a terminal"
        );
    }
}
