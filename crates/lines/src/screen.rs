// SPDX-License-Identifier: MIT
//
// Screen — lines, overlay and the device they are drawn on.
//
// The screen decides what reaches the device and when. Callbacks only
// mutate lines; after every event the loop calls `ensure_synced`, which
// writes the dirty visible lines (or the overlay, when one is active) and
// flushes once. When nothing changed it does not touch the device at all.
//
// A minimum height can be set. While the terminal is not taller than it,
// the error overlay replaces the ordinary content and the event loop
// drops everything except quit.

use std::io;

use lines_term::{Device, Size};
use tracing::trace;

use crate::events::Posted;
use crate::lines::Lines;
use crate::overlay::ErrorOverlay;

/// The rows of one event loop and the device showing them.
pub struct Screen {
    device: Box<dyn Device<Posted>>,
    lines: Lines,
    overlay: Option<ErrorOverlay>,
    min_height: u16,
}

impl std::fmt::Debug for Screen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Screen")
            .field("size", &self.device.size())
            .field("lines", &self.lines.len())
            .field("overlay", &self.overlay)
            .field("min_height", &self.min_height)
            .finish_non_exhaustive()
    }
}

impl Screen {
    #[must_use]
    pub fn new(device: Box<dyn Device<Posted>>) -> Self {
        Self {
            device,
            lines: Lines::new(),
            overlay: None,
            min_height: 0,
        }
    }

    /// Current device height.
    #[must_use]
    pub fn len(&self) -> u16 {
        self.device.size().rows
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn width(&self) -> u16 {
        self.device.size().cols
    }

    #[must_use]
    pub fn size(&self) -> Size {
        self.device.size()
    }

    #[inline]
    #[must_use]
    pub const fn min_height(&self) -> u16 {
        self.min_height
    }

    #[inline]
    #[must_use]
    pub const fn lines(&self) -> &Lines {
        &self.lines
    }

    #[inline]
    pub const fn lines_mut(&mut self) -> &mut Lines {
        &mut self.lines
    }

    /// The overlay, once it was first needed.
    #[must_use]
    pub const fn overlay(&self) -> Option<&ErrorOverlay> {
        self.overlay.as_ref()
    }

    /// Whether the terminal is taller than the minimum height.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.len() > self.min_height
    }

    /// Require the terminal to be taller than `m` rows.
    pub fn set_min(&mut self, m: u16) {
        self.min_height = m;
        self.check_min();
    }

    /// Adopt the device's current size: clear it, grow the lines to
    /// cover it and redraw everything. Returns whether the screen is
    /// large enough for ordinary dispatch.
    pub fn resize(&mut self) -> bool {
        self.device.clear();
        self.lines.ensure(usize::from(self.len()));
        self.lines.invalidate();
        if let Some(overlay) = &mut self.overlay {
            overlay.invalidate();
        }
        self.check_min()
    }

    /// Move the first visible line by `delta`.
    pub fn scroll_by(&mut self, delta: isize) -> bool {
        self.lines.scroll_by(delta)
    }

    /// Write whatever is dirty to the device and flush, incrementally
    /// when `show` is set, fully otherwise. Returns whether the device
    /// was flushed.
    ///
    /// # Errors
    ///
    /// Returns an error if the device flush fails.
    pub fn ensure_synced(&mut self, show: bool) -> io::Result<bool> {
        if let Some(overlay) = self.overlay.as_mut().filter(|o| o.is_active()) {
            if !overlay.is_dirty() {
                return Ok(false);
            }
            overlay.render(&mut *self.device);
            trace!(show, "overlay synced");
            self.flush(show)?;
            return Ok(true);
        }

        let height = usize::from(self.len());
        if self.lines.take_scrolled() {
            self.device.clear();
        }
        if !self.lines.is_dirty(height) {
            return Ok(false);
        }

        let first = self.lines.first_visible();
        let device = &mut *self.device;
        let mut synced = 0usize;
        self.lines.for_screen(height, |line| {
            if line.is_dirty() {
                let row = u16::try_from(line.index() - first).unwrap_or(u16::MAX);
                line.sync(&mut *device, row);
                synced += 1;
            }
        });
        trace!(show, synced, "lines synced");
        self.flush(show)?;
        Ok(true)
    }

    /// Give the terminal back.
    pub(crate) fn fini(&mut self) {
        self.device.fini();
    }

    pub(crate) fn device_mut(&mut self) -> &mut dyn Device<Posted> {
        &mut *self.device
    }

    fn flush(&mut self, show: bool) -> io::Result<()> {
        if show {
            self.device.show()
        } else {
            self.device.sync()
        }
    }

    /// Show or hide the overlay according to the minimum height.
    fn check_min(&mut self) -> bool {
        if self.is_ok() {
            let was_active = self.overlay.as_mut().is_some_and(ErrorOverlay::deactivate);
            if was_active {
                self.device.clear();
                self.lines.invalidate();
            }
            true
        } else {
            let text = format!("minimum screen-height: {}", self.min_height);
            self.overlay
                .get_or_insert_with(ErrorOverlay::new)
                .activate(text);
            false
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use lines_term::{SimDevice, SimHandle};
    use pretty_assertions::assert_eq;

    fn screen(cols: u16, rows: u16) -> (Screen, SimHandle<Posted>) {
        let (device, handle) = SimDevice::new(Size::new(cols, rows), 8);
        let mut screen = Screen::new(Box::new(device));
        screen.resize();
        (screen, handle)
    }

    #[test]
    fn resize_grows_lines_to_height() {
        let (screen, _) = screen(10, 4);
        assert_eq!(screen.lines().len(), 4);
        assert_eq!(screen.len(), 4);
        assert!(screen.is_ok());
    }

    #[test]
    fn dirty_lines_are_synced_and_shown() {
        let (mut screen, sim) = screen(10, 3);
        screen.ensure_synced(false).unwrap();
        screen.lines_mut().get_mut(1).set("hello");
        assert!(screen.ensure_synced(true).unwrap());
        assert_eq!(sim.screen(), vec!["", "hello", ""]);
        assert_eq!(sim.show_count(), 1);
    }

    #[test]
    fn nothing_dirty_means_no_device_call() {
        let (mut screen, sim) = screen(10, 3);
        screen.ensure_synced(false).unwrap();
        let (shows, syncs) = (sim.show_count(), sim.sync_count());
        assert!(!screen.ensure_synced(true).unwrap());
        assert!(!screen.ensure_synced(false).unwrap());
        assert_eq!((sim.show_count(), sim.sync_count()), (shows, syncs));
    }

    #[test]
    fn min_height_activates_overlay() {
        let (mut screen, sim) = screen(40, 25);
        screen.set_min(30);
        assert!(!screen.is_ok());
        let overlay = screen.overlay().unwrap();
        assert!(overlay.is_active());
        assert_eq!(overlay.text(), "minimum screen-height: 30");

        screen.ensure_synced(false).unwrap();
        assert_eq!(sim.line(12), "       minimum screen-height: 30");
    }

    #[test]
    fn min_height_equal_to_height_is_too_small() {
        let (mut screen, _) = screen(40, 25);
        screen.set_min(25);
        assert!(!screen.is_ok());
        screen.set_min(24);
        assert!(screen.is_ok());
        assert!(!screen.overlay().unwrap().is_active());
    }

    #[test]
    fn overlay_hides_lines_until_deactivated() {
        let (mut screen, sim) = screen(40, 3);
        screen.lines_mut().get_mut(0).set("content");
        screen.set_min(5);
        screen.ensure_synced(true).unwrap();
        assert_eq!(sim.line(0), "");

        screen.set_min(0);
        screen.ensure_synced(true).unwrap();
        assert_eq!(sim.line(0), "content");
        assert_eq!(sim.line(1), "");
    }

    #[test]
    fn scrolling_redraws_from_first_visible() {
        let (mut screen, sim) = screen(10, 2);
        screen.lines_mut().for_n(3, |l| {
            let text = format!("row {}", l.index());
            l.set(text);
        });
        screen.ensure_synced(true).unwrap();
        assert_eq!(sim.screen(), vec!["row 0", "row 1"]);

        assert!(screen.scroll_by(1));
        screen.ensure_synced(true).unwrap();
        assert_eq!(sim.screen(), vec!["row 1", "row 2"]);
    }
}
