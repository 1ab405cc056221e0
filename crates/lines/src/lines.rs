// SPDX-License-Identifier: MIT
//
// Lines — the rows of a screen.
//
// Rows are created on demand and never removed: growing the terminal adds
// lines, shrinking it only hides them, so content written to a row outlives
// any number of resizes. `first_visible` is the scroll offset; the line at
// that index is drawn on screen row 0.

use crate::line::Line;

/// An ordered, lazily growing collection of [`Line`]s.
#[derive(Debug, Clone)]
pub struct Lines {
    rows: Vec<Line>,
    first_visible: usize,
    zero: Line,
    /// Set when the scroll offset moved; the screen must clear the device
    /// before the next sync.
    scrolled: bool,
}

impl Lines {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            rows: Vec::new(),
            first_visible: 0,
            zero: Line::zero(),
            scrolled: false,
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the line drawn on the first screen row.
    #[inline]
    #[must_use]
    pub const fn first_visible(&self) -> usize {
        self.first_visible
    }

    /// The line at `i`, or the zero line when out of range.
    #[must_use]
    pub fn get(&self, i: usize) -> &Line {
        self.rows.get(i).unwrap_or(&self.zero)
    }

    /// The line at `i`, or the zero line when out of range.
    pub fn get_mut(&mut self, i: usize) -> &mut Line {
        match self.rows.get_mut(i) {
            Some(line) => line,
            None => &mut self.zero,
        }
    }

    /// Grow to at least `n` lines.
    pub fn ensure(&mut self, n: usize) {
        let len = self.rows.len();
        if n > len {
            self.rows.extend((len..n).map(Line::new));
        }
    }

    /// Grow to at least `n` lines, then call `cb` for the first `n`.
    pub fn for_n(&mut self, n: usize, mut cb: impl FnMut(&mut Line)) {
        self.ensure(n);
        self.rows.iter_mut().take(n).for_each(&mut cb);
    }

    /// Call `cb` for the lines on a screen `height` rows tall, starting at
    /// the first visible line.
    pub fn for_screen(&mut self, height: usize, mut cb: impl FnMut(&mut Line)) {
        self.rows
            .iter_mut()
            .skip(self.first_visible)
            .take(height)
            .for_each(&mut cb);
    }

    /// Scroll so line `i` is drawn first. Ignored when `i` is out of
    /// range; returns whether the offset changed.
    pub fn set_first_screen_line(&mut self, i: usize) -> bool {
        if i >= self.rows.len() || i == self.first_visible {
            return false;
        }
        self.first_visible = i;
        self.scrolled = true;
        self.invalidate();
        true
    }

    /// Move the scroll offset by `delta`, clamped to the existing lines.
    pub fn scroll_by(&mut self, delta: isize) -> bool {
        let Some(last) = self.rows.len().checked_sub(1) else {
            return false;
        };
        let target = self.first_visible.saturating_add_signed(delta).min(last);
        self.set_first_screen_line(target)
    }

    /// Whether any of the lines visible on a `height`-row screen is dirty.
    #[must_use]
    pub fn is_dirty(&self, height: usize) -> bool {
        self.rows
            .iter()
            .skip(self.first_visible)
            .take(height)
            .any(Line::is_dirty)
    }

    /// Mark every line for redraw.
    pub fn invalidate(&mut self) {
        self.rows.iter_mut().for_each(Line::invalidate);
    }

    /// Consume the "scroll offset moved" flag.
    pub(crate) const fn take_scrolled(&mut self) -> bool {
        let scrolled = self.scrolled;
        self.scrolled = false;
        scrolled
    }
}

impl Default for Lines {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
