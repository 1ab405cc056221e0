// SPDX-License-Identifier: MIT
//
// Env — what a callback gets to work with.
//
// An `Env` mutably borrows the loop's screen for exactly one callback
// invocation. Listeners are `FnMut(&mut Env<'_>)`, so they are generic
// over that borrow and cannot store the `Env`, or any `&mut Line` it
// hands out, anywhere that outlives the call. Data copied out of it
// (a `String`, a size) is free to go anywhere.

use std::time::Instant;

use lines_term::{KeyEvent, Size};

use crate::line::Line;
use crate::lines::Lines;
use crate::screen::Screen;

/// The event a callback is running for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// The terminal has this size (also the initial event of `listen`).
    Resize(Size),
    /// A keystroke.
    Key(KeyEvent),
    /// A posted update, with the time it was posted.
    Update(Instant),
}

/// Callback-scoped access to the screen.
///
/// ```
/// use lines::{Config, Events};
///
/// let (mut events, _sim) = Events::sim(Config::default())?;
/// events.on_resize(|env| {
///     let rows = env.len();
///     env.line(0).set(format!("{rows} rows"));
/// });
/// # Ok::<(), lines::Error>(())
/// ```
pub struct Env<'a> {
    screen: &'a mut Screen,
    event: Event,
    quit: bool,
}

impl<'a> Env<'a> {
    pub(crate) const fn new(screen: &'a mut Screen, event: Event) -> Self {
        Self {
            screen,
            event,
            quit: false,
        }
    }

    /// Line `i`, or the inert zero line when `i` is past the last line.
    pub fn line(&mut self, i: usize) -> &mut Line {
        self.screen.lines_mut().get_mut(i)
    }

    /// All lines, for bulk updates and scrolling.
    pub fn lines(&mut self) -> &mut Lines {
        self.screen.lines_mut()
    }

    /// Screen height.
    #[must_use]
    pub fn len(&self) -> u16 {
        self.screen.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.screen.is_empty()
    }

    /// Screen width.
    #[must_use]
    pub fn width(&self) -> u16 {
        self.screen.width()
    }

    /// Require the screen to be taller than `m` rows.
    pub fn set_min(&mut self, m: u16) {
        self.screen.set_min(m);
    }

    #[must_use]
    pub const fn event(&self) -> &Event {
        &self.event
    }

    /// Stop listening once this callback returns and the screen is
    /// synced.
    pub const fn quit(&mut self) {
        self.quit = true;
    }

    pub(crate) const fn quit_requested(&self) -> bool {
        self.quit
    }
}

impl std::fmt::Debug for Env<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Env")
            .field("event", &self.event)
            .field("quit", &self.quit)
            .finish_non_exhaustive()
    }
}
