// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// Background input reader.
//
// A dedicated thread owns stdin. It polls the descriptor with a short
// timeout, feeds whatever arrives through the key `Parser`, and pushes the
// resulting `DeviceEvent::Key`s into the device queue. Between polls it
// checks two things:
//
//   - the SIGWINCH flag, turning a terminal resize into
//     `DeviceEvent::Resize` with the freshly queried size;
//   - a pending partial sequence older than the escape timeout, which is
//     flushed so a lone ESC reaches the reactor as the Escape key.
//
// Keys are sent with a blocking `send`: input is never dropped, the
// reader just waits for the reactor to drain the queue. Shutdown sets an
// `AtomicBool`; the device drops its receiver first, so a reader blocked
// in `send` wakes with an error and exits.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::SyncSender;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::device::DeviceEvent;
use crate::input::Parser;
use crate::terminal::{FALLBACK_SIZE, get_size};

/// Bytes read per `read()` call. A keypress is 1–6 bytes.
const READ_BUF_SIZE: usize = 1024;

/// How often the reader wakes to check flags (milliseconds).
const POLL_TIMEOUT_MS: i32 = 25;

// ─── SIGWINCH ────────────────────────────────────────────────────────────────

/// Set by the SIGWINCH handler, cleared by the reader thread.
static SIGWINCH_RECEIVED: AtomicBool = AtomicBool::new(false);

/// Install the SIGWINCH handler. Storing to an atomic is async-signal-safe.
#[cfg(unix)]
fn install_sigwinch_handler() {
    unsafe {
        let mut sa: libc::sigaction = std::mem::zeroed();
        sa.sa_sigaction = sigwinch_handler as *const () as usize;
        sa.sa_flags = libc::SA_RESTART;
        libc::sigemptyset(&raw mut sa.sa_mask);
        libc::sigaction(libc::SIGWINCH, &raw const sa, std::ptr::null_mut());
    }
}

#[cfg(unix)]
extern "C" fn sigwinch_handler(_: libc::c_int) {
    SIGWINCH_RECEIVED.store(true, Ordering::Relaxed);
}

#[cfg(not(unix))]
const fn install_sigwinch_handler() {}

// ─── Reader ──────────────────────────────────────────────────────────────────

/// The stdin reader thread of a [`TtyDevice`](crate::tty::TtyDevice).
pub struct InputReader {
    handle: Option<JoinHandle<()>>,
    stop: Arc<AtomicBool>,
}

impl InputReader {
    /// Spawn the reader, delivering into `tx`.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS refuses to spawn the thread.
    pub fn spawn<T: Send + 'static>(
        tx: SyncSender<DeviceEvent<T>>,
        escape_timeout: Duration,
    ) -> io::Result<Self> {
        install_sigwinch_handler();
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name("lines-input".into())
            .spawn(move || {
                let mut pump = Pump::new(tx, escape_timeout);
                pump.run(&stop_flag);
                debug!("input reader exited");
            })?;

        Ok(Self {
            handle: Some(handle),
            stop,
        })
    }

    /// Stop the thread and join it. Idempotent.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for InputReader {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Parser state plus the channel it feeds. Split from the thread so the
/// byte handling can be tested without stdin.
struct Pump<T> {
    tx: SyncSender<DeviceEvent<T>>,
    parser: Parser,
    escape_timeout: Duration,
    last_input: Instant,
}

impl<T> Pump<T> {
    fn new(tx: SyncSender<DeviceEvent<T>>, escape_timeout: Duration) -> Self {
        Self {
            tx,
            parser: Parser::new(),
            escape_timeout,
            last_input: Instant::now(),
        }
    }

    /// Parse `bytes` and forward the keys. `false` once the receiver is
    /// gone.
    fn feed(&mut self, bytes: &[u8]) -> bool {
        self.last_input = Instant::now();
        let keys = self.parser.advance(bytes);
        self.forward(keys)
    }

    /// Flush a stale partial sequence. `false` once the receiver is gone.
    fn tick(&mut self, now: Instant) -> bool {
        if SIGWINCH_RECEIVED.swap(false, Ordering::Relaxed) {
            let size = get_size().unwrap_or(FALLBACK_SIZE);
            trace!(cols = size.cols, rows = size.rows, "terminal resized");
            if self.tx.send(DeviceEvent::Resize(size)).is_err() {
                return false;
            }
        }
        if self.parser.has_pending() && now.duration_since(self.last_input) >= self.escape_timeout
        {
            let keys = self.parser.flush();
            return self.forward(keys);
        }
        true
    }

    fn forward(&self, keys: Vec<crate::input::KeyEvent>) -> bool {
        keys.into_iter().all(|key| {
            trace!(?key, "key");
            self.tx.send(DeviceEvent::Key(key)).is_ok()
        })
    }

    #[cfg(unix)]
    fn run(&mut self, stop: &AtomicBool) {
        use std::os::unix::io::AsRawFd;

        let fd = io::stdin().as_raw_fd();
        let mut buf = [0u8; READ_BUF_SIZE];

        while !stop.load(Ordering::Relaxed) {
            let ready = unsafe {
                let mut pfd = libc::pollfd {
                    fd,
                    events: libc::POLLIN,
                    revents: 0,
                };
                libc::poll(&raw mut pfd, 1, POLL_TIMEOUT_MS)
            };

            if ready > 0 {
                let n = unsafe { libc::read(fd, buf.as_mut_ptr().cast(), buf.len()) };
                if n <= 0 {
                    break;
                }
                #[allow(clippy::cast_sign_loss)] // n > 0
                let ok = self.feed(&buf[..n as usize]);
                if !ok {
                    break;
                }
            }
            if !self.tick(Instant::now()) {
                break;
            }
        }
    }

    #[cfg(not(unix))]
    fn run(&mut self, stop: &AtomicBool) {
        use std::io::Read;

        let mut buf = [0u8; READ_BUF_SIZE];
        while !stop.load(Ordering::Relaxed) {
            match io::stdin().lock().read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if !self.feed(&buf[..n]) || !self.tick(Instant::now()) {
                        break;
                    }
                }
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
