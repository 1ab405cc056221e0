// SPDX-License-Identifier: MIT
//
// Sim — drive an event loop on a simulated terminal from a test.
//
// `Sim::listen` moves the loop onto a background thread and returns once
// the first frame is on the simulated screen. Every `fire_*`, `resize`
// and `update` call enqueues its event, then a marker update behind it,
// and blocks until the marker has run or the loop is gone. The queue is
// FIFO, so once the marker runs the event before it has been dispatched
// and flushed, whatever else was in flight.
//
// A `QuitGate` closed by the loop when it finalizes lets the harness tell
// a finished loop from a busy one. Only simulated loops carry one.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use lines_term::{Key, KeyEvent, Modifiers, PostError, SimHandle, Size};
use tracing::{debug, warn};

use crate::env::Env;
use crate::error::Error;
use crate::events::{Events, Handle, Posted};

// ─── QuitGate ────────────────────────────────────────────────────────────────

/// Closed once when an event loop finalizes.
#[derive(Debug, Default)]
pub(crate) struct QuitGate {
    closed: Mutex<bool>,
    cond: Condvar,
}

impl QuitGate {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        self.closed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn close(&self) {
        *self.lock() = true;
        self.cond.notify_all();
    }

    pub(crate) fn is_closed(&self) -> bool {
        *self.lock()
    }

    /// Block until the gate closes; `false` if `timeout` ran out first.
    pub(crate) fn wait_closed(&self, timeout: Duration) -> bool {
        let guard = self.lock();
        let (guard, _) = self
            .cond
            .wait_timeout_while(guard, timeout, |closed| !*closed)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }
}

// ─── Sim ─────────────────────────────────────────────────────────────────────

type Running = JoinHandle<(Events, Result<(), Error>)>;

/// Test harness for a loop built with [`Events::sim`].
///
/// ```
/// use lines::{Config, Events};
///
/// let (mut events, mut sim) = Events::sim(Config::default())?;
/// events.on_resize(|env| {
///     env.line(0).set("line 0");
/// });
/// sim.listen(events)?;
/// assert_eq!(sim.line(0), "line 0");
///
/// let events = sim.quit_listening()?;
/// assert!(!events.is_listening());
/// assert_eq!(sim.fini_count(), 1);
/// # Ok::<(), lines::Error>(())
/// ```
pub struct Sim {
    device: SimHandle<Posted>,
    handle: Handle,
    gate: Arc<QuitGate>,
    timeout: Duration,
    thread: Option<Running>,
}

impl Sim {
    pub(crate) const fn new(
        device: SimHandle<Posted>,
        handle: Handle,
        gate: Arc<QuitGate>,
        timeout: Duration,
    ) -> Self {
        Self {
            device,
            handle,
            gate,
            timeout,
            thread: None,
        }
    }

    /// Run `events` on a background thread; returns after the first
    /// frame was flushed.
    ///
    /// # Errors
    ///
    /// [`Error::AlreadyListening`] if a loop is running,
    /// [`Error::Io`] if the thread cannot be spawned,
    /// [`Error::FlushTimeout`] if the first frame never arrives.
    pub fn listen(&mut self, events: Events) -> Result<(), Error> {
        if self.thread.is_some() {
            return Err(Error::AlreadyListening);
        }
        let thread = thread::Builder::new()
            .name("lines-sim".into())
            .spawn(move || {
                let mut events = events;
                let result = events.listen();
                (events, result)
            })?;
        self.thread = Some(thread);
        self.settle()
    }

    /// Whether the loop thread is still running.
    #[must_use]
    pub fn is_listening(&self) -> bool {
        !self.gate.is_closed() && self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Press a printable key and wait for the flush.
    ///
    /// # Errors
    ///
    /// [`Error::NotListening`], [`Error::Post`] or [`Error::FlushTimeout`].
    pub fn fire_rune(&self, rune: char) -> Result<(), Error> {
        self.fire(KeyEvent::rune(rune))
    }

    /// Press a named key and wait for the flush.
    ///
    /// # Errors
    ///
    /// See [`fire_rune`](Self::fire_rune).
    pub fn fire_key(&self, key: Key, mods: Modifiers) -> Result<(), Error> {
        self.fire(KeyEvent::key(key, mods))
    }

    /// Deliver any keystroke and wait for the flush.
    ///
    /// # Errors
    ///
    /// See [`fire_rune`](Self::fire_rune).
    pub fn fire(&self, event: KeyEvent) -> Result<(), Error> {
        self.post_and_wait(|| self.device.inject(event))
    }

    /// Resize the terminal and wait for the full redraw.
    ///
    /// # Errors
    ///
    /// See [`fire_rune`](Self::fire_rune).
    pub fn resize(&self, cols: u16, rows: u16) -> Result<(), Error> {
        self.post_and_wait(|| self.device.resize(cols, rows))
    }

    /// Post an update and wait until its effects are flushed.
    ///
    /// # Errors
    ///
    /// See [`fire_rune`](Self::fire_rune).
    pub fn update(&self, cb: impl FnOnce(&mut Env<'_>) + Send + 'static) -> Result<(), Error> {
        if self.thread.is_none() {
            return Err(Error::NotListening);
        }
        self.handle.update(cb)?;
        self.settle()
    }

    fn post_and_wait(&self, post: impl FnOnce() -> Result<(), PostError>) -> Result<(), Error> {
        if self.thread.is_none() {
            return Err(Error::NotListening);
        }
        post()?;
        self.settle()
    }

    /// Queue a marker behind everything posted so far and wait for the
    /// loop to reach it. A loop that finalizes first drops the marker.
    fn settle(&self) -> Result<(), Error> {
        let (done, reached) = mpsc::sync_channel::<()>(1);
        let marker = Posted::Update {
            callback: Box::new(move |_: &mut Env<'_>| {
                let _ = done.send(());
            }),
            at: Instant::now(),
        };
        match self.handle.post(marker) {
            Ok(()) | Err(PostError::Disconnected) => {}
            Err(err) => return Err(Error::Post(err)),
        }
        match reached.recv_timeout(self.timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => Ok(()),
            Err(RecvTimeoutError::Timeout) => Err(Error::FlushTimeout),
        }
    }

    /// Ask the loop to quit and hand it back once it has.
    ///
    /// # Errors
    ///
    /// See [`join`](Self::join).
    pub fn quit_listening(&mut self) -> Result<Events, Error> {
        self.handle.quit_listening()?;
        self.join()
    }

    /// Wait for the loop to terminate on its own and hand it back.
    ///
    /// # Errors
    ///
    /// [`Error::NotListening`] if [`listen`](Self::listen) was never
    /// called, or whatever `listen` itself returned.
    pub fn join(&mut self) -> Result<Events, Error> {
        let thread = self.thread.take().ok_or(Error::NotListening)?;
        let (events, result) = thread.join().map_err(|_| Error::ListenerPanicked)?;
        debug!(ok = result.is_ok(), "sim loop joined");
        result.map(|()| events)
    }

    // ── Screen ──────────────────────────────────────────────────

    /// Shown text of row `y`, trailing blanks trimmed.
    #[must_use]
    pub fn line(&self, y: u16) -> String {
        self.device.line(y)
    }

    /// Every shown row.
    #[must_use]
    pub fn screen(&self) -> Vec<String> {
        self.device.screen()
    }

    #[must_use]
    pub fn size(&self) -> Size {
        self.device.size()
    }

    #[must_use]
    pub fn fini_count(&self) -> usize {
        self.device.fini_count()
    }

    #[must_use]
    pub fn sync_count(&self) -> usize {
        self.device.sync_count()
    }

    #[must_use]
    pub fn show_count(&self) -> usize {
        self.device.show_count()
    }

    /// The underlying device handle, for injecting without waiting.
    #[must_use]
    pub const fn device(&self) -> &SimHandle<Posted> {
        &self.device
    }
}

impl Drop for Sim {
    fn drop(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        if self.handle.quit_listening().is_ok() || self.gate.wait_closed(self.timeout) {
            let _ = thread.join();
        } else {
            warn!("sim loop did not take the quit request, detaching it");
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_gate_times_out() {
        let gate = QuitGate::new();
        let start = Instant::now();
        assert!(!gate.wait_closed(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
        assert!(!gate.is_closed());
    }

    #[test]
    fn closed_gate_releases_waiters() {
        let gate = Arc::new(QuitGate::new());
        let closer = Arc::clone(&gate);
        let t = thread::spawn(move || closer.close());
        assert!(gate.wait_closed(Duration::from_secs(5)));
        t.join().unwrap();
        assert!(gate.is_closed());
    }

    #[test]
    fn firing_before_listen_is_refused() {
        let (_events, sim) = Events::sim(crate::Config::default()).unwrap();
        assert!(matches!(sim.fire_rune('a'), Err(Error::NotListening)));
    }

    #[test]
    fn second_listen_is_refused() {
        let (events, mut sim) = Events::sim(crate::Config::default()).unwrap();
        let (other, _other_sim) = Events::sim(crate::Config::default()).unwrap();
        sim.listen(events).unwrap();
        assert!(matches!(sim.listen(other), Err(Error::AlreadyListening)));
        assert!(sim.is_listening());
        sim.quit_listening().unwrap();
        assert_eq!(sim.fini_count(), 1);
    }

    #[test]
    fn drop_does_not_hang_on_a_full_queue() {
        let config = crate::Config {
            queue_capacity: 1,
            flush_timeout: Duration::from_millis(100),
            ..crate::Config::default()
        };
        let (mut events, mut sim) = Events::sim(config).unwrap();
        let handle = events.handle();
        let (entered_tx, entered) = mpsc::channel();
        let (release, release_rx) = mpsc::channel::<()>();
        events
            .rune('b', move |_| {
                let _ = entered_tx.send(());
                let _ = release_rx.recv_timeout(Duration::from_secs(5));
            })
            .unwrap();
        sim.listen(events).unwrap();

        sim.device().inject_rune('b').unwrap();
        entered.recv_timeout(Duration::from_secs(5)).unwrap();
        handle.update(|_| {}).unwrap();

        let start = Instant::now();
        drop(sim);
        assert!(start.elapsed() < Duration::from_secs(2));

        release.send(()).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while handle.quit_listening().is_err() {
            assert!(Instant::now() < deadline, "loop never drained its queue");
            thread::sleep(Duration::from_millis(5));
        }
    }
}
