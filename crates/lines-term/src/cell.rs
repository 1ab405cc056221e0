// SPDX-License-Identifier: MIT
//
// Cell — one character position on the terminal grid.
//
// The lines runtime draws plain text, so a cell is just a character and
// a handful of SGR attributes. Colors are deliberately absent: the
// runtime does no color management.

bitflags::bitflags! {
    /// Text attributes stored as a compact bitfield.
    ///
    /// Each flag maps to one SGR parameter. Combine with bitwise OR:
    ///
    /// ```
    /// use lines_term::cell::Attr;
    ///
    /// let style = Attr::BOLD | Attr::INVERSE;
    /// assert!(style.contains(Attr::BOLD));
    /// assert!(!style.contains(Attr::DIM));
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Attr: u8 {
        /// SGR 1 — increased intensity.
        const BOLD          = 1 << 0;
        /// SGR 2 — decreased intensity.
        const DIM           = 1 << 1;
        /// SGR 3 — italic.
        const ITALIC        = 1 << 2;
        /// SGR 4 — single underline.
        const UNDERLINE     = 1 << 3;
        /// SGR 5 — slow blink.
        const BLINK         = 1 << 4;
        /// SGR 7 — swap foreground and background.
        const INVERSE       = 1 << 5;
        /// SGR 9 — crossed-out text.
        const STRIKETHROUGH = 1 << 6;
    }
}

/// A single terminal cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell {
    /// The character shown in this cell.
    pub ch: char,
    /// SGR attributes applied to the character.
    pub attr: Attr,
}

impl Cell {
    /// An empty cell: a space with no attributes.
    pub const BLANK: Self = Self {
        ch: ' ',
        attr: Attr::empty(),
    };

    #[inline]
    #[must_use]
    pub const fn new(ch: char, attr: Attr) -> Self {
        Self { ch, attr }
    }

    /// Whether this cell shows nothing (a plain space).
    #[inline]
    #[must_use]
    pub fn is_blank(self) -> bool {
        self == Self::BLANK
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::BLANK
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
