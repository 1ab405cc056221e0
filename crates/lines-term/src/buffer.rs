// SPDX-License-Identifier: MIT
//
// FrameBuffer — the back buffer a device paints into.
//
// A flat row-major grid of `Cell`s. Devices write into it through
// `Surface::set_content`; the tty device diffs it against the previously
// shown frame, the sim device copies it into its "front" grid on flush.
//
// Wide characters (CJK, some emoji) take two columns. The buffer stores
// them in their first column only; whoever reads a row skips the column
// that follows a wide character.

use unicode_width::UnicodeWidthChar;

use crate::cell::Cell;

/// A 2-D grid of cells.
///
/// ```
/// use lines_term::buffer::FrameBuffer;
/// use lines_term::cell::{Attr, Cell};
///
/// let mut buf = FrameBuffer::new(10, 2);
/// buf.set(1, 0, Cell::new('x', Attr::empty()));
/// assert_eq!(buf.row_text(0), " x");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    width: u16,
    height: u16,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    /// Create a buffer of blank cells.
    #[must_use]
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::BLANK; usize::from(width) * usize::from(height)],
        }
    }

    #[inline]
    #[must_use]
    pub const fn width(&self) -> u16 {
        self.width
    }

    #[inline]
    #[must_use]
    pub const fn height(&self) -> u16 {
        self.height
    }

    #[inline]
    const fn in_bounds(&self, x: u16, y: u16) -> bool {
        x < self.width && y < self.height
    }

    #[inline]
    const fn index(&self, x: u16, y: u16) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// The cell at `(x, y)`, or `None` if out of bounds.
    #[inline]
    #[must_use]
    pub fn get(&self, x: u16, y: u16) -> Option<&Cell> {
        self.in_bounds(x, y).then(|| &self.cells[self.index(x, y)])
    }

    /// Bounds-checked write. Returns `false` (and writes nothing) when
    /// `(x, y)` lies outside the buffer.
    #[inline]
    pub fn set(&mut self, x: u16, y: u16, cell: Cell) -> bool {
        if !self.in_bounds(x, y) {
            return false;
        }
        let idx = self.index(x, y);
        self.cells[idx] = cell;
        true
    }

    /// One row as a slice, or `None` if `y` is out of bounds.
    #[inline]
    #[must_use]
    pub fn row(&self, y: u16) -> Option<&[Cell]> {
        (y < self.height).then(|| {
            let start = self.index(0, y);
            &self.cells[start..start + usize::from(self.width)]
        })
    }

    /// The visible text of row `y` with trailing blanks removed.
    ///
    /// The column after a wide character is skipped. Out-of-bounds rows
    /// yield an empty string.
    #[must_use]
    pub fn row_text(&self, y: u16) -> String {
        let Some(row) = self.row(y) else {
            return String::new();
        };
        let mut out = String::with_capacity(row.len());
        let mut skip = false;
        for cell in row {
            if skip {
                skip = false;
                continue;
            }
            out.push(cell.ch);
            skip = cell.ch.width() == Some(2);
        }
        out.truncate(out.trim_end_matches(' ').len());
        out
    }

    /// Reset every cell to blank.
    pub fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    /// Resize the buffer; all content is discarded.
    pub fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        self.cells.clear();
        self.cells
            .resize(usize::from(width) * usize::from(height), Cell::BLANK);
    }

    /// Overwrite this buffer with `other`, reusing the allocation when
    /// the dimensions match.
    pub fn copy_from(&mut self, other: &Self) {
        if self.width == other.width && self.height == other.height {
            self.cells.copy_from_slice(&other.cells);
        } else {
            self.clone_from(other);
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Attr;

    fn ch(c: char) -> Cell {
        Cell::new(c, Attr::empty())
    }

    #[test]
    fn new_buffer_is_blank() {
        let buf = FrameBuffer::new(4, 3);
        assert_eq!(buf.width(), 4);
        assert_eq!(buf.height(), 3);
        for y in 0..3 {
            assert!(buf.row(y).unwrap().iter().all(|c| c.is_blank()));
        }
    }

    #[test]
    fn set_in_bounds() {
        let mut buf = FrameBuffer::new(4, 3);
        assert!(buf.set(3, 2, ch('z')));
        assert_eq!(buf.get(3, 2), Some(&ch('z')));
    }

    #[test]
    fn set_out_of_bounds_is_rejected() {
        let mut buf = FrameBuffer::new(4, 3);
        assert!(!buf.set(4, 0, ch('z')));
        assert!(!buf.set(0, 3, ch('z')));
        assert!(buf.get(4, 0).is_none());
    }

    #[test]
    fn row_text_trims_trailing_blanks() {
        let mut buf = FrameBuffer::new(8, 1);
        for (x, c) in "ab d".chars().enumerate() {
            buf.set(u16::try_from(x).unwrap(), 0, ch(c));
        }
        assert_eq!(buf.row_text(0), "ab d");
    }

    #[test]
    fn row_text_skips_wide_continuation() {
        let mut buf = FrameBuffer::new(6, 1);
        buf.set(0, 0, ch('漢'));
        buf.set(2, 0, ch('x'));
        assert_eq!(buf.row_text(0), "漢x");
    }

    #[test]
    fn row_text_out_of_bounds_is_empty() {
        assert_eq!(FrameBuffer::new(3, 1).row_text(5), "");
    }

    #[test]
    fn clear_blanks_everything() {
        let mut buf = FrameBuffer::new(3, 1);
        buf.set(1, 0, ch('x'));
        buf.clear();
        assert_eq!(buf.row_text(0), "");
    }

    #[test]
    fn resize_discards_content() {
        let mut buf = FrameBuffer::new(3, 1);
        buf.set(1, 0, ch('x'));
        buf.resize(5, 2);
        assert_eq!((buf.width(), buf.height()), (5, 2));
        assert_eq!(buf.row_text(0), "");
    }

    #[test]
    fn copy_from_matches_source() {
        let mut src = FrameBuffer::new(3, 2);
        src.set(2, 1, ch('q'));
        let mut dst = FrameBuffer::new(3, 2);
        dst.copy_from(&src);
        assert_eq!(dst, src);

        let mut other = FrameBuffer::new(1, 1);
        other.copy_from(&src);
        assert_eq!(other, src);
    }
}
