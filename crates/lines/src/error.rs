// SPDX-License-Identifier: MIT
//
// Error types.
//
// Registration conflicts get their own small enum because they are the
// errors callers match on; everything else funnels into `Error`.

use std::io;

use lines_term::{DeviceError, PostError};
use thiserror::Error;

/// A listener or feature binding was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegisterError {
    #[error("the zero rune cannot have a listener")]
    ZeroRune,
    #[error("the zero key cannot have a listener; register runes with `rune`")]
    ZeroKey,
    #[error("input is bound to the quit feature")]
    Quit,
    #[error("a listener is already registered for this input")]
    Exists,
}

/// Errors from building, running and driving an event loop.
#[derive(Debug, Error)]
pub enum Error {
    /// The terminal device could not be created or initialized.
    #[error(transparent)]
    Device(#[from] DeviceError),
    /// Work could not be posted to the loop.
    #[error("posting to the event loop failed: {0}")]
    Post(#[from] PostError),
    /// Flushing the first frame to the terminal failed.
    #[error("terminal output failed: {0}")]
    Io(#[from] io::Error),
    /// The loop was already finalized and cannot listen again.
    #[error("the event loop was finalized")]
    Finalized,
    /// The simulated loop is not running.
    #[error("the event loop is not listening")]
    NotListening,
    /// The simulation harness already runs a loop.
    #[error("the harness is already running an event loop")]
    AlreadyListening,
    /// A simulated event was not flushed in time.
    #[error("timed out waiting for the screen to flush")]
    FlushTimeout,
    /// A callback panicked; the loop finalized itself.
    #[error("a listener panicked")]
    ListenerPanicked,
}
