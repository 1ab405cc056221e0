// SPDX-License-Identifier: MIT
//
// Terminal control — raw mode, alternate screen, RAII restore.
//
// Safety: termios (tcgetattr / tcsetattr), ioctl(TIOCGWINSZ), isatty and
// the raw fd write in the panic hook have no safe std equivalent. Every
// unsafe block is a single libc call on a file descriptor we own.
#![allow(unsafe_code)]
//
// `Terminal::enter` puts the tty into raw mode, switches to the alternate
// screen and hides the cursor; `leave` undoes all of it. The handle also
// restores on drop, and a process-wide panic hook restores the terminal
// before the panic message is printed, so a crashing callback never
// leaves the user's shell without echo.

use std::io::{self, Write};
use std::sync::{Mutex, Once};

use crate::ansi;

// ─── Size ───────────────────────────────────────────────────────────────────

/// Terminal dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Size {
    pub cols: u16,
    pub rows: u16,
}

impl Size {
    #[inline]
    #[must_use]
    pub const fn new(cols: u16, rows: u16) -> Self {
        Self { cols, rows }
    }
}

/// Size reported when the real one cannot be queried (pipes, CI).
pub const FALLBACK_SIZE: Size = Size::new(80, 24);

/// Query the terminal size of stdout via `ioctl(TIOCGWINSZ)`.
#[cfg(unix)]
#[must_use]
pub fn get_size() -> Option<Size> {
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &mut ws) };
    (rc == 0 && ws.ws_col > 0 && ws.ws_row > 0).then(|| Size::new(ws.ws_col, ws.ws_row))
}

#[cfg(not(unix))]
#[must_use]
pub fn get_size() -> Option<Size> {
    None
}

/// Whether stdin is a terminal.
#[cfg(unix)]
#[must_use]
pub fn is_tty() -> bool {
    unsafe { libc::isatty(libc::STDIN_FILENO) != 0 }
}

#[cfg(not(unix))]
#[must_use]
pub fn is_tty() -> bool {
    false
}

// ─── Panic restore ──────────────────────────────────────────────────────────

/// Original termios, kept where the panic hook can reach it.
#[cfg(unix)]
static SAVED_TERMIOS: Mutex<Option<libc::termios>> = Mutex::new(None);

static PANIC_HOOK: Once = Once::new();

/// Everything `enter` turned on, turned off again. The alternate screen
/// is left last so the shell reappears without leftovers.
#[rustfmt::skip]
const RESTORE: &[u8] = b"\
    \x1b[?2026l\
    \x1b[0m\
    \x1b[?25h\
    \x1b[?1049l";

fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            write_restore_raw();
            #[cfg(unix)]
            restore_saved_termios();
            previous(info);
        }));
    });
}

/// Write [`RESTORE`] straight to fd 1. The panic may have happened while
/// the stdout lock was held, so `io::stdout()` is off limits here.
fn write_restore_raw() {
    #[cfg(unix)]
    unsafe {
        let _ = libc::write(
            libc::STDOUT_FILENO,
            RESTORE.as_ptr().cast::<libc::c_void>(),
            RESTORE.len(),
        );
    }

    #[cfg(not(unix))]
    {
        let _ = io::stdout().write_all(RESTORE);
        let _ = io::stdout().flush();
    }
}

/// Emit the [`RESTORE`] sequence through the ANSI encoders.
fn write_restore(w: &mut impl Write) -> io::Result<()> {
    ansi::end_sync(w)?;
    ansi::reset(w)?;
    ansi::cursor_show(w)?;
    ansi::exit_alt_screen(w)
}

#[cfg(unix)]
fn restore_saved_termios() {
    if let Ok(guard) = SAVED_TERMIOS.lock() {
        if let Some(original) = guard.as_ref() {
            unsafe {
                let _ = libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, original);
            }
        }
    }
}

// ─── Terminal ───────────────────────────────────────────────────────────────

/// Handle on the controlling terminal.
///
/// ```no_run
/// use lines_term::terminal::Terminal;
///
/// let mut term = Terminal::new();
/// term.enter()?;
/// // ... draw ...
/// term.leave()?;
/// # Ok::<(), std::io::Error>(())
/// ```
pub struct Terminal {
    #[cfg(unix)]
    original: Option<libc::termios>,
    size: Size,
    active: bool,
}

impl Terminal {
    /// A handle in cooked mode; the size falls back to 80×24 when it
    /// cannot be queried.
    #[must_use]
    pub fn new() -> Self {
        Self {
            #[cfg(unix)]
            original: None,
            size: get_size().unwrap_or(FALLBACK_SIZE),
            active: false,
        }
    }

    #[inline]
    #[must_use]
    pub const fn size(&self) -> Size {
        self.size
    }

    /// Re-query the size from the OS and cache it.
    pub fn refresh_size(&mut self) -> Size {
        if let Some(size) = get_size() {
            self.size = size;
        }
        self.size
    }

    #[inline]
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Raw mode, alternate screen, hidden cursor. No-op when active.
    ///
    /// # Errors
    ///
    /// Returns an error if termios or the terminal write fails.
    pub fn enter(&mut self) -> io::Result<()> {
        if self.active {
            return Ok(());
        }
        install_panic_hook();
        self.raw_mode_on()?;

        let stdout = io::stdout();
        let mut out = stdout.lock();
        ansi::enter_alt_screen(&mut out)?;
        ansi::cursor_hide(&mut out)?;
        ansi::clear_screen(&mut out)?;
        out.flush()?;

        self.active = true;
        Ok(())
    }

    /// Undo [`enter`](Self::enter). No-op when inactive.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal write or termios restore fails.
    pub fn leave(&mut self) -> io::Result<()> {
        if !self.active {
            return Ok(());
        }
        {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            write_restore(&mut out)?;
            out.flush()?;
        }
        self.raw_mode_off()?;
        self.active = false;
        Ok(())
    }

    #[cfg(unix)]
    fn raw_mode_on(&mut self) -> io::Result<()> {
        if !is_tty() {
            return Ok(());
        }
        let fd = libc::STDIN_FILENO;
        let mut termios: libc::termios = unsafe { std::mem::zeroed() };
        if unsafe { libc::tcgetattr(fd, &raw mut termios) } != 0 {
            return Err(io::Error::last_os_error());
        }
        self.original = Some(termios);
        if let Ok(mut saved) = SAVED_TERMIOS.lock() {
            *saved = Some(termios);
        }

        unsafe { libc::cfmakeraw(&raw mut termios) };
        // Blocking reads of at least one byte; the reader thread polls.
        termios.c_cc[libc::VMIN] = 1;
        termios.c_cc[libc::VTIME] = 0;

        if unsafe { libc::tcsetattr(fd, libc::TCSAFLUSH, &raw const termios) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn raw_mode_on(&mut self) -> io::Result<()> {
        Ok(())
    }

    #[cfg(unix)]
    fn raw_mode_off(&mut self) -> io::Result<()> {
        let Some(original) = self.original.take() else {
            return Ok(());
        };
        if unsafe { libc::tcsetattr(libc::STDIN_FILENO, libc::TCSAFLUSH, &raw const original) }
            != 0
        {
            return Err(io::Error::last_os_error());
        }
        if let Ok(mut saved) = SAVED_TERMIOS.lock() {
            *saved = None;
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn raw_mode_off(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Default for Terminal {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        let _ = self.leave();
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_new() {
        let s = Size::new(80, 25);
        assert_eq!((s.cols, s.rows), (80, 25));
    }

    #[test]
    fn fallback_size_is_classic_vt100() {
        assert_eq!(FALLBACK_SIZE, Size::new(80, 24));
    }

    #[test]
    fn get_size_does_not_panic() {
        let _ = get_size();
    }

    #[test]
    fn is_tty_does_not_panic() {
        let _ = is_tty();
    }

    #[test]
    fn restore_sequence_leaves_alt_screen_last() {
        let s = std::str::from_utf8(RESTORE).unwrap();
        assert!(s.ends_with("\x1b[?1049l"));
        assert!(s.contains("\x1b[?25h"), "must show the cursor");
        assert!(s.contains("\x1b[0m"), "must reset attributes");
        assert!(s.contains("\x1b[?2026l"), "must end synchronized output");
    }

    #[test]
    fn leave_writes_the_panic_restore_sequence() {
        let mut out = Vec::new();
        write_restore(&mut out).unwrap();
        assert_eq!(out, RESTORE);
    }

    #[test]
    fn new_terminal_is_inactive_with_a_size() {
        let term = Terminal::new();
        assert!(!term.is_active());
        assert!(term.size().cols > 0 && term.size().rows > 0);
    }

    #[test]
    fn leave_without_enter_is_noop() {
        let mut term = Terminal::new();
        term.leave().unwrap();
        assert!(!term.is_active());
    }

    #[test]
    fn enter_leave_cycle_is_idempotent() {
        let mut term = Terminal::new();
        term.enter().unwrap();
        term.enter().unwrap();
        assert!(term.is_active());
        term.leave().unwrap();
        term.leave().unwrap();
        assert!(!term.is_active());
    }

    #[test]
    fn refresh_size_matches_cache() {
        let mut term = Terminal::new();
        let s = term.refresh_size();
        assert_eq!(s, term.size());
    }
}
