// SPDX-License-Identifier: MIT
//
// SimDevice — an in-memory terminal for tests.
//
// The device and its `SimHandle` share one `SimState` behind a mutex. The
// device paints into the back buffer; `show` and `sync` copy it to the
// front buffer, which is what the handle reads back as "the screen". Keys
// and resizes are injected through the handle and travel through the same
// bounded queue as posted work, so tests observe the exact ordering a
// real terminal would produce.
//
// A resize only takes effect when the reactor polls it, like SIGWINCH on
// a tty: until then `size()` keeps reporting the old dimensions.

use std::io;
use std::sync::mpsc::{Receiver, SyncSender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::trace;

use crate::buffer::FrameBuffer;
use crate::cell::{Attr, Cell};
use crate::device::{self, Device, DeviceError, DeviceEvent, PostError, Poster, Surface};
use crate::input::{Key, KeyEvent, Modifiers};
use crate::terminal::Size;

/// Counters and buffers shared between a [`SimDevice`] and its handles.
#[derive(Debug)]
struct SimState {
    back: FrameBuffer,
    front: FrameBuffer,
    inits: usize,
    finis: usize,
    shows: usize,
    syncs: usize,
    clears: usize,
}

type Shared = Arc<Mutex<SimState>>;

fn lock(state: &Shared) -> MutexGuard<'_, SimState> {
    // A test that panicked while painting must not hide the screen.
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

// ─── Device ──────────────────────────────────────────────────────────────────

/// A [`Device`] that renders into memory.
pub struct SimDevice<T> {
    state: Shared,
    tx: SyncSender<DeviceEvent<T>>,
    rx: Option<Receiver<DeviceEvent<T>>>,
    initialized: bool,
}

impl<T: Send + 'static> SimDevice<T> {
    /// A device of the given size plus a handle to drive it.
    #[must_use]
    pub fn new(size: Size, queue_capacity: usize) -> (Self, SimHandle<T>) {
        let state = Arc::new(Mutex::new(SimState {
            back: FrameBuffer::new(size.cols, size.rows),
            front: FrameBuffer::new(size.cols, size.rows),
            inits: 0,
            finis: 0,
            shows: 0,
            syncs: 0,
            clears: 0,
        }));
        let (tx, rx) = device::queue(queue_capacity);
        let handle = SimHandle {
            state: Arc::clone(&state),
            poster: Poster::new(tx.clone()),
        };
        (
            Self {
                state,
                tx,
                rx: Some(rx),
                initialized: false,
            },
            handle,
        )
    }
}

impl<T> Surface for SimDevice<T> {
    fn size(&self) -> Size {
        let s = lock(&self.state);
        Size::new(s.back.width(), s.back.height())
    }

    fn set_content(&mut self, x: u16, y: u16, ch: char, attr: Attr) {
        lock(&self.state).back.set(x, y, Cell::new(ch, attr));
    }

    fn clear(&mut self) {
        let mut s = lock(&self.state);
        s.back.clear();
        s.clears += 1;
    }

    fn show(&mut self) -> io::Result<()> {
        let mut s = lock(&self.state);
        let SimState { back, front, .. } = &mut *s;
        front.copy_from(back);
        s.shows += 1;
        Ok(())
    }

    fn sync(&mut self) -> io::Result<()> {
        let mut s = lock(&self.state);
        let SimState { back, front, .. } = &mut *s;
        front.copy_from(back);
        s.syncs += 1;
        Ok(())
    }
}

impl<T: Send + 'static> Device<T> for SimDevice<T> {
    fn init(&mut self) -> Result<(), DeviceError> {
        if self.rx.is_none() {
            return Err(DeviceError::Finalized);
        }
        if !self.initialized {
            self.initialized = true;
            lock(&self.state).inits += 1;
        }
        Ok(())
    }

    fn fini(&mut self) {
        if self.rx.take().is_some() {
            lock(&self.state).finis += 1;
            trace!("sim device finalized");
        }
    }

    fn poll_event(&mut self) -> Option<DeviceEvent<T>> {
        let event = self.rx.as_ref()?.recv().ok()?;
        if let DeviceEvent::Resize(size) = &event {
            let mut s = lock(&self.state);
            s.back.resize(size.cols, size.rows);
            s.front.resize(size.cols, size.rows);
        }
        Some(event)
    }

    fn poster(&self) -> Poster<T> {
        Poster::new(self.tx.clone())
    }
}

// ─── Handle ──────────────────────────────────────────────────────────────────

/// Test-side handle on a [`SimDevice`]: injects input, reads the screen.
pub struct SimHandle<T> {
    state: Shared,
    poster: Poster<T>,
}

impl<T> Clone for SimHandle<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            poster: self.poster.clone(),
        }
    }
}

impl<T> SimHandle<T> {
    /// Inject a key press.
    ///
    /// # Errors
    ///
    /// Fails like [`Poster::post`] when the queue is full or closed.
    pub fn inject(&self, event: KeyEvent) -> Result<(), PostError> {
        self.poster.send(DeviceEvent::Key(event))
    }

    /// Inject a printable character.
    ///
    /// # Errors
    ///
    /// See [`inject`](Self::inject).
    pub fn inject_rune(&self, rune: char) -> Result<(), PostError> {
        self.inject(KeyEvent::rune(rune))
    }

    /// Inject a named key.
    ///
    /// # Errors
    ///
    /// See [`inject`](Self::inject).
    pub fn inject_key(&self, key: Key, mods: Modifiers) -> Result<(), PostError> {
        self.inject(KeyEvent::key(key, mods))
    }

    /// Resize the simulated terminal. Takes effect when polled.
    ///
    /// # Errors
    ///
    /// See [`inject`](Self::inject).
    pub fn resize(&self, cols: u16, rows: u16) -> Result<(), PostError> {
        self.poster.send(DeviceEvent::Resize(Size::new(cols, rows)))
    }

    /// Text of shown row `y`, trailing blanks trimmed.
    #[must_use]
    pub fn line(&self, y: u16) -> String {
        lock(&self.state).front.row_text(y)
    }

    /// Every shown row, trailing blanks trimmed.
    #[must_use]
    pub fn screen(&self) -> Vec<String> {
        let s = lock(&self.state);
        (0..s.front.height()).map(|y| s.front.row_text(y)).collect()
    }

    /// The attributes of the shown cell at `(x, y)`.
    #[must_use]
    pub fn attr_at(&self, x: u16, y: u16) -> Option<Attr> {
        lock(&self.state).front.get(x, y).map(|c| c.attr)
    }

    #[must_use]
    pub fn size(&self) -> Size {
        let s = lock(&self.state);
        Size::new(s.back.width(), s.back.height())
    }

    #[must_use]
    pub fn init_count(&self) -> usize {
        lock(&self.state).inits
    }

    #[must_use]
    pub fn fini_count(&self) -> usize {
        lock(&self.state).finis
    }

    #[must_use]
    pub fn show_count(&self) -> usize {
        lock(&self.state).shows
    }

    #[must_use]
    pub fn sync_count(&self) -> usize {
        lock(&self.state).syncs
    }

    #[must_use]
    pub fn clear_count(&self) -> usize {
        lock(&self.state).clears
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sim() -> (SimDevice<()>, SimHandle<()>) {
        SimDevice::new(Size::new(10, 3), 8)
    }

    fn paint(dev: &mut SimDevice<()>, y: u16, text: &str) {
        for (x, ch) in text.chars().enumerate() {
            dev.set_content(u16::try_from(x).unwrap(), y, ch, Attr::empty());
        }
    }

    #[test]
    fn nothing_is_visible_before_show() {
        let (mut dev, handle) = sim();
        paint(&mut dev, 0, "hi");
        assert_eq!(handle.line(0), "");
        dev.show().unwrap();
        assert_eq!(handle.line(0), "hi");
        assert_eq!(handle.show_count(), 1);
    }

    #[test]
    fn sync_counts_separately() {
        let (mut dev, handle) = sim();
        paint(&mut dev, 1, "x");
        dev.sync().unwrap();
        assert_eq!(handle.screen(), vec!["", "x", ""]);
        assert_eq!((handle.show_count(), handle.sync_count()), (0, 1));
    }

    #[test]
    fn injected_keys_arrive_in_order() {
        let (mut dev, handle) = sim();
        handle.inject_rune('a').unwrap();
        handle.inject_key(Key::Enter, Modifiers::empty()).unwrap();
        dev.poster().post(()).unwrap();

        assert!(matches!(
            dev.poll_event(),
            Some(DeviceEvent::Key(k)) if k == KeyEvent::rune('a')
        ));
        assert!(matches!(
            dev.poll_event(),
            Some(DeviceEvent::Key(k)) if k.key == Key::Enter
        ));
        assert!(matches!(dev.poll_event(), Some(DeviceEvent::Interrupt(()))));
    }

    #[test]
    fn resize_applies_when_polled() {
        let (mut dev, handle) = sim();
        handle.resize(20, 5).unwrap();
        assert_eq!(dev.size(), Size::new(10, 3));
        assert!(matches!(dev.poll_event(), Some(DeviceEvent::Resize(_))));
        assert_eq!(dev.size(), Size::new(20, 5));
        assert_eq!(handle.size(), Size::new(20, 5));
    }

    #[test]
    fn fini_is_counted_once_and_ends_polling() {
        let (mut dev, handle) = sim();
        dev.init().unwrap();
        dev.fini();
        dev.fini();
        assert_eq!(handle.fini_count(), 1);
        assert!(dev.poll_event().is_none());
        assert!(dev.init().is_err());
    }

    #[test]
    fn full_queue_rejects_injection() {
        let (_dev, handle) = SimDevice::<()>::new(Size::new(1, 1), 1);
        handle.inject_rune('a').unwrap();
        assert_eq!(handle.inject_rune('b'), Err(PostError::Full));
    }

    #[test]
    fn clear_blanks_back_buffer() {
        let (mut dev, handle) = sim();
        paint(&mut dev, 0, "abc");
        dev.clear();
        dev.show().unwrap();
        assert_eq!(handle.line(0), "");
        assert_eq!(handle.clear_count(), 1);
    }
}
