// SPDX-License-Identifier: MIT
//
// ErrorOverlay — a message drawn over the whole screen.
//
// The overlay never touches the lines underneath; while it is active the
// screen draws the overlay instead of them, and once it goes away the
// lines are redrawn as they were.

use lines_term::{Attr, Surface};
use unicode_width::UnicodeWidthStr;

/// A centered full-screen message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorOverlay {
    text: String,
    dirty: bool,
    active: bool,
}

impl ErrorOverlay {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            text: String::new(),
            dirty: false,
            active: false,
        }
    }

    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[inline]
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    #[inline]
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Show `text`. Re-activating with the same text is a no-op.
    pub fn activate(&mut self, text: impl Into<String>) {
        let text = text.into();
        if self.active && text == self.text {
            return;
        }
        self.text = text;
        self.active = true;
        self.dirty = true;
    }

    /// Hide the overlay. Returns whether it was showing.
    pub const fn deactivate(&mut self) -> bool {
        let was = self.active;
        self.active = false;
        self.dirty = false;
        was
    }

    /// Mark for redraw after the device was cleared.
    pub const fn invalidate(&mut self) {
        if self.active {
            self.dirty = true;
        }
    }

    /// Clear `surface` and draw the text centered on it.
    pub fn render<S: Surface + ?Sized>(&mut self, surface: &mut S) {
        surface.clear();
        let size = surface.size();
        let text_width = u16::try_from(self.text.width()).unwrap_or(u16::MAX);
        let mut x = size.cols.saturating_sub(text_width) / 2;
        let y = size.rows / 2;
        for ch in self.text.chars() {
            if x >= size.cols {
                break;
            }
            surface.set_content(x, y, ch, Attr::BOLD);
            x += 1;
        }
        self.dirty = false;
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
