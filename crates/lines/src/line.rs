// SPDX-License-Identifier: MIT
//
// Line — one terminal row.
//
// A line remembers what it should show (`content`), what it showed when it
// was last synced and is about to be replaced (`stale`), and whether the
// two differ (`dirty`). Syncing writes the content and, when the new text
// is narrower than the old one, blanks the leftover cells, so the device
// never needs a full clear to shrink a row.
//
// `stale` keeps the *earliest* unsynced baseline: setting a line three
// times between two syncs still pads against what is actually on screen.
//
// The zero line is an inert stand-in handed out for out-of-range lookups.
// It ignores every mutation and is never dirty, which spares callers a
// bounds check on every access.

use lines_term::{Attr, Surface};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Whether a line is a real row or the inert stand-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Zero,
    Live,
}

/// One row of the screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    index: usize,
    content: String,
    stale: String,
    attr: Attr,
    dirty: bool,
    kind: LineKind,
}

impl Line {
    /// A live, empty line for row `index`.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self {
            index,
            content: String::new(),
            stale: String::new(),
            attr: Attr::empty(),
            dirty: false,
            kind: LineKind::Live,
        }
    }

    /// The inert line.
    #[must_use]
    pub const fn zero() -> Self {
        Self {
            index: 0,
            content: String::new(),
            stale: String::new(),
            attr: Attr::empty(),
            dirty: false,
            kind: LineKind::Zero,
        }
    }

    /// Row index within its `Lines`. Meaningless for the zero line.
    #[inline]
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    #[inline]
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[inline]
    #[must_use]
    pub const fn attr(&self) -> Attr {
        self.attr
    }

    #[inline]
    #[must_use]
    pub const fn kind(&self) -> LineKind {
        self.kind
    }

    #[inline]
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        matches!(self.kind, LineKind::Zero)
    }

    /// Whether the content differs from what was last synced.
    #[inline]
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Replace the content. Setting the current content again is a no-op.
    pub fn set(&mut self, content: impl Into<String>) -> &mut Self {
        if self.is_zero() {
            return self;
        }
        let content = content.into();
        if content == self.content {
            return self;
        }
        let old = std::mem::replace(&mut self.content, content);
        if self.stale.is_empty() {
            self.stale = old;
        }
        self.dirty = true;
        self
    }

    /// Set the attributes every cell of the line is drawn with.
    pub fn set_attr(&mut self, attr: Attr) -> &mut Self {
        if !self.is_zero() && attr != self.attr {
            self.attr = attr;
            self.dirty = true;
        }
        self
    }

    /// Mark the line for a redraw even though its content is unchanged,
    /// e.g. after the device was cleared.
    pub fn invalidate(&mut self) {
        if !self.is_zero() {
            self.dirty = true;
        }
    }

    /// Write the line to `surface` at screen row `row`.
    ///
    /// Characters advance by their display width; zero-width characters
    /// are dropped and nothing is written past the surface's right edge.
    pub fn sync<S: Surface + ?Sized>(&mut self, surface: &mut S, row: u16) {
        if self.is_zero() {
            return;
        }
        let width = surface.size().cols;
        let mut x = 0u16;
        for ch in self.content.chars() {
            #[allow(clippy::cast_possible_truncation)] // width is 0..=2
            let w = ch.width().unwrap_or(0) as u16;
            if w == 0 {
                continue;
            }
            if x.saturating_add(w) > width {
                break;
            }
            surface.set_content(x, row, ch, self.attr);
            x += w;
        }

        let pad = self.stale.width().saturating_sub(self.content.width());
        for _ in 0..pad {
            if x >= width {
                break;
            }
            surface.set_content(x, row, ' ', Attr::empty());
            x += 1;
        }

        self.stale.clear();
        self.dirty = false;
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lines_term::Size;
    use pretty_assertions::assert_eq;

    /// A surface that records every cell written to it.
    pub(crate) struct Recorder {
        pub size: Size,
        pub writes: Vec<(u16, u16, char)>,
    }

    impl Recorder {
        pub(crate) fn new(cols: u16, rows: u16) -> Self {
            Self {
                size: Size::new(cols, rows),
                writes: Vec::new(),
            }
        }
    }

    impl Surface for Recorder {
        fn size(&self) -> Size {
            self.size
        }
        fn set_content(&mut self, x: u16, y: u16, ch: char, _attr: Attr) {
            self.writes.push((x, y, ch));
        }
        fn clear(&mut self) {}
        fn show(&mut self) -> std::io::Result<()> {
            Ok(())
        }
        fn sync(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn new_line_is_clean_and_empty() {
        let line = Line::new(3);
        assert_eq!(line.index(), 3);
        assert_eq!(line.content(), "");
        assert!(!line.is_dirty());
        assert_eq!(line.kind(), LineKind::Live);
    }

    #[test]
    fn set_marks_dirty() {
        let mut line = Line::new(0);
        assert!(line.set("a").is_dirty());
        assert_eq!(line.content(), "a");
    }

    #[test]
    fn setting_same_content_twice_dirties_once() {
        let mut line = Line::new(0);
        line.set("abc");
        line.sync(&mut Recorder::new(10, 1), 0);
        assert!(!line.is_dirty());

        line.set("abc");
        assert!(!line.is_dirty());
        line.set("abd");
        assert!(line.is_dirty());
    }

    #[test]
    fn sync_clears_dirty() {
        let mut line = Line::new(0);
        line.set("x").set("x");
        line.sync(&mut Recorder::new(10, 1), 0);
        assert!(!line.is_dirty());
    }

    #[test]
    fn shrinking_pads_exactly_the_difference() {
        let mut line = Line::new(0);
        let mut rec = Recorder::new(10, 1);
        line.set("ab");
        line.sync(&mut rec, 0);
        rec.writes.clear();

        line.set("a");
        line.sync(&mut rec, 0);
        assert_eq!(rec.writes, vec![(0, 0, 'a'), (1, 0, ' ')]);
    }

    #[test]
    fn stale_keeps_earliest_baseline() {
        let mut line = Line::new(0);
        let mut rec = Recorder::new(10, 1);
        line.set("abcd");
        line.sync(&mut rec, 0);
        rec.writes.clear();

        line.set("abc").set("a");
        line.sync(&mut rec, 2);
        let blanks = rec.writes.iter().filter(|w| w.2 == ' ').count();
        assert_eq!(blanks, 3);
        assert!(rec.writes.iter().all(|w| w.1 == 2));
    }

    #[test]
    fn zero_line_rejects_mutation() {
        for content in ["", "x", "line 0", "漢字"] {
            let mut zero = Line::zero();
            assert!(!zero.set(content).is_dirty());
            assert_eq!(zero.content(), "");
            zero.invalidate();
            zero.set_attr(Attr::BOLD);
            assert!(!zero.is_dirty());
            assert!(zero.is_zero());
        }
    }

    #[test]
    fn zero_line_sync_writes_nothing() {
        let mut rec = Recorder::new(10, 1);
        Line::zero().sync(&mut rec, 0);
        assert!(rec.writes.is_empty());
    }

    #[test]
    fn wide_chars_advance_two_cells() {
        let mut line = Line::new(0);
        let mut rec = Recorder::new(10, 1);
        line.set("漢x");
        line.sync(&mut rec, 0);
        assert_eq!(rec.writes, vec![(0, 0, '漢'), (2, 0, 'x')]);
    }

    #[test]
    fn sync_stops_at_right_edge() {
        let mut line = Line::new(0);
        let mut rec = Recorder::new(3, 1);
        line.set("abcdef");
        line.sync(&mut rec, 0);
        assert_eq!(rec.writes.len(), 3);
    }

    #[test]
    fn invalidate_forces_redraw() {
        let mut line = Line::new(0);
        line.set("a");
        line.sync(&mut Recorder::new(10, 1), 0);
        line.invalidate();
        assert!(line.is_dirty());
    }

    #[test]
    fn attr_change_dirties() {
        let mut line = Line::new(0);
        line.set_attr(Attr::INVERSE);
        assert!(line.is_dirty());
        assert_eq!(line.attr(), Attr::INVERSE);
    }
}
