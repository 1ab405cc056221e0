// SPDX-License-Identifier: MIT
//
// Differential renderer.
//
// Compares the back buffer against the frame that was last put on the
// terminal and emits escape sequences only for cells that changed. The
// lines runtime already limits drawing to dirty lines, so a typical
// keystroke touches one or two rows; this module makes sure only those
// rows reach the terminal.
//
// Per frame:
//
//   1. Rows identical to the previous frame are skipped with one slice
//      comparison.
//   2. Changed cells are written with the fewest cursor moves and SGR
//      sequences we can get away with.
//   3. The frame is wrapped in DEC 2026 synchronized output and kept in
//      memory until `flush_to` issues a single write.
//
// `force_redraw` drops the previous frame so the next render clears and
// repaints everything — that is the device's full `sync()`.

use std::io::{self, Write};

use unicode_width::UnicodeWidthChar;

use crate::ansi;
use crate::buffer::FrameBuffer;
use crate::cell::{Attr, Cell};

/// Statistics from one render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderStats {
    /// Cells written to the output.
    pub cells_rendered: usize,
    /// Cells that matched the previous frame.
    pub cells_skipped: usize,
    /// Bytes of escape output produced.
    pub bytes_written: usize,
}

/// Emits ANSI output for the difference between two frames.
pub struct DiffRenderer {
    writer: CellWriter,
    previous: Option<FrameBuffer>,
}

/// Output buffer plus the terminal state as last emitted, so redundant
/// cursor moves and SGR sequences can be skipped.
struct CellWriter {
    out: Vec<u8>,
    cursor: Option<(u16, u16)>,
    attr: Attr,
}

impl CellWriter {
    fn emit(&mut self, x: u16, y: u16, cell: Cell) {
        if self.cursor != Some((x, y)) {
            let _ = ansi::cursor_to(&mut self.out, x, y);
        }
        if cell.attr != self.attr {
            let _ = ansi::reset(&mut self.out);
            let _ = ansi::attrs(&mut self.out, cell.attr);
            self.attr = cell.attr;
        }
        let mut enc = [0u8; 4];
        // Control characters would move the terminal cursor on their own.
        let ch = if cell.ch.is_control() { ' ' } else { cell.ch };
        self.out.extend_from_slice(ch.encode_utf8(&mut enc).as_bytes());
        #[allow(clippy::cast_possible_truncation)] // width is 0..=2
        let advance = ch.width().unwrap_or(1) as u16;
        self.cursor = Some((x.saturating_add(advance), y));
    }
}

impl DiffRenderer {
    /// A renderer with no previous frame: the first render is a full one.
    #[must_use]
    pub fn new() -> Self {
        Self {
            writer: CellWriter {
                out: Vec::with_capacity(16 * 1024),
                cursor: None,
                attr: Attr::empty(),
            },
            previous: None,
        }
    }

    /// Forget the previous frame so the next render repaints everything.
    pub fn force_redraw(&mut self) {
        self.previous = None;
    }

    /// Whether the next render will repaint the whole screen.
    #[must_use]
    pub const fn is_full_redraw_pending(&self) -> bool {
        self.previous.is_none()
    }

    /// Diff `current` against the previous frame into the output buffer.
    pub fn render(&mut self, current: &FrameBuffer) -> RenderStats {
        let w = &mut self.writer;
        w.out.clear();
        w.cursor = None;
        w.attr = Attr::empty();
        let mut stats = RenderStats::default();

        let full = !self.previous.as_ref().is_some_and(|prev| {
            prev.width() == current.width() && prev.height() == current.height()
        });

        // Writes into a Vec cannot fail.
        let _ = ansi::begin_sync(&mut w.out);
        if full {
            let _ = ansi::reset(&mut w.out);
            let _ = ansi::clear_screen(&mut w.out);
        }

        for y in 0..current.height() {
            let Some(row) = current.row(y) else { break };
            let prev_row = if full {
                None
            } else {
                self.previous.as_ref().and_then(|p| p.row(y))
            };
            if prev_row == Some(row) {
                stats.cells_skipped += row.len();
                continue;
            }

            let mut x = 0usize;
            while x < row.len() {
                let cell = row[x];
                let wide = cell.ch.width() == Some(2);
                let changed = match prev_row {
                    Some(prev) => prev[x] != cell || (wide && prev.get(x + 1) != row.get(x + 1)),
                    None => !cell.is_blank(),
                };
                if changed {
                    #[allow(clippy::cast_possible_truncation)] // x < width (u16)
                    w.emit(x as u16, y, cell);
                    stats.cells_rendered += 1;
                } else {
                    stats.cells_skipped += 1;
                }
                x += if wide { 2 } else { 1 };
            }
        }

        let _ = ansi::reset(&mut w.out);
        let _ = ansi::end_sync(&mut w.out);
        stats.bytes_written = w.out.len();

        match &mut self.previous {
            Some(prev) => prev.copy_from(current),
            None => self.previous = Some(current.clone()),
        }
        stats
    }

    /// The bytes produced by the last [`render`](Self::render).
    #[must_use]
    pub fn output_bytes(&self) -> &[u8] {
        &self.writer.out
    }

    /// Write the pending output to `w` in one call and clear it.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `w` fails.
    pub fn flush_to(&mut self, w: &mut impl Write) -> io::Result<()> {
        let out = &mut self.writer.out;
        if !out.is_empty() {
            w.write_all(out.as_slice())?;
            w.flush()?;
            out.clear();
        }
        Ok(())
    }

    /// Write the pending output to stdout.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to stdout fails.
    pub fn flush(&mut self) -> io::Result<()> {
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        self.flush_to(&mut lock)
    }
}

impl Default for DiffRenderer {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn text_frame(w: u16, rows: &[&str]) -> FrameBuffer {
        #[allow(clippy::cast_possible_truncation)]
        let mut buf = FrameBuffer::new(w, rows.len() as u16);
        for (y, row) in rows.iter().enumerate() {
            for (x, c) in row.chars().enumerate() {
                #[allow(clippy::cast_possible_truncation)]
                buf.set(x as u16, y as u16, Cell::new(c, Attr::empty()));
            }
        }
        buf
    }

    fn output(r: &DiffRenderer) -> String {
        String::from_utf8_lossy(r.output_bytes()).into_owned()
    }

    #[test]
    fn first_render_clears_and_draws() {
        let mut r = DiffRenderer::new();
        assert!(r.is_full_redraw_pending());
        let stats = r.render(&text_frame(5, &["hi", ""]));
        let out = output(&r);
        assert!(out.contains("\x1b[2J"));
        assert!(out.contains("\x1b[1;1Hhi"));
        assert_eq!(stats.cells_rendered, 2);
        assert!(!r.is_full_redraw_pending());
    }

    #[test]
    fn unchanged_frame_renders_no_cells() {
        let mut r = DiffRenderer::new();
        let frame = text_frame(5, &["hi", "yo"]);
        r.render(&frame);
        let stats = r.render(&frame);
        assert_eq!(stats.cells_rendered, 0);
        assert_eq!(stats.cells_skipped, 10);
    }

    #[test]
    fn only_changed_cells_are_written() {
        let mut r = DiffRenderer::new();
        r.render(&text_frame(5, &["abc", "xyz"]));
        let stats = r.render(&text_frame(5, &["abc", "xQz"]));
        assert_eq!(stats.cells_rendered, 1);
        let out = output(&r);
        assert!(out.contains("\x1b[2;2HQ"));
        assert!(!out.contains("\x1b[2J"));
    }

    #[test]
    fn sequential_cells_skip_cursor_moves() {
        let mut r = DiffRenderer::new();
        r.render(&text_frame(5, &["", ""]));
        r.render(&text_frame(5, &["", "abc"]));
        let out = output(&r);
        assert!(out.contains("\x1b[2;1Habc"));
    }

    #[test]
    fn erased_cells_are_written_as_blanks() {
        let mut r = DiffRenderer::new();
        r.render(&text_frame(5, &["abc"]));
        let stats = r.render(&text_frame(5, &["a"]));
        assert_eq!(stats.cells_rendered, 2);
        assert!(output(&r).contains("\x1b[1;2H  "));
    }

    #[test]
    fn attribute_change_resets_then_applies() {
        let mut r = DiffRenderer::new();
        let mut frame = FrameBuffer::new(3, 1);
        frame.set(0, 0, Cell::new('x', Attr::BOLD));
        r.render(&frame);
        assert!(output(&r).contains("\x1b[0m\x1b[1mx"));
    }

    #[test]
    fn force_redraw_repaints_everything() {
        let mut r = DiffRenderer::new();
        let frame = text_frame(5, &["ab"]);
        r.render(&frame);
        r.force_redraw();
        let stats = r.render(&frame);
        assert_eq!(stats.cells_rendered, 2);
        assert!(output(&r).contains("\x1b[2J"));
    }

    #[test]
    fn size_change_forces_full_render() {
        let mut r = DiffRenderer::new();
        r.render(&text_frame(5, &["ab"]));
        r.render(&text_frame(6, &["ab"]));
        assert!(output(&r).contains("\x1b[2J"));
    }

    #[test]
    fn output_is_wrapped_in_synchronized_update() {
        let mut r = DiffRenderer::new();
        r.render(&text_frame(2, &["x"]));
        let out = output(&r);
        assert!(out.starts_with("\x1b[?2026h"));
        assert!(out.ends_with("\x1b[?2026l"));
    }

    #[test]
    fn flush_to_drains_output() {
        let mut r = DiffRenderer::new();
        r.render(&text_frame(2, &["x"]));
        let mut sink = Vec::new();
        r.flush_to(&mut sink).unwrap();
        assert!(!sink.is_empty());
        assert!(r.output_bytes().is_empty());
    }
}
