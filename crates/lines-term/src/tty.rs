// SPDX-License-Identifier: MIT
//
// TtyDevice — the real terminal.
//
// Ties the pieces of this crate together: `Terminal` for raw mode and the
// alternate screen, `InputReader` for keys and resizes, a `FrameBuffer`
// the reactor paints into, and a `DiffRenderer` that turns the buffer
// into the minimum escape output on `show`.

use std::io;
use std::sync::mpsc::{Receiver, SyncSender};
use std::time::Duration;

use tracing::{debug, warn};

use crate::buffer::FrameBuffer;
use crate::cell::{Attr, Cell};
use crate::device::{self, Device, DeviceError, DeviceEvent, Poster, Surface};
use crate::diff::DiffRenderer;
use crate::reader::InputReader;
use crate::terminal::{Size, Terminal, is_tty};

/// A [`Device`] backed by the process's controlling terminal.
pub struct TtyDevice<T> {
    terminal: Terminal,
    reader: Option<InputReader>,
    tx: SyncSender<DeviceEvent<T>>,
    rx: Option<Receiver<DeviceEvent<T>>>,
    frame: FrameBuffer,
    renderer: DiffRenderer,
    escape_timeout: Duration,
    finalized: bool,
}

impl<T: Send + 'static> TtyDevice<T> {
    /// Prepare a device; nothing touches the terminal until
    /// [`Device::init`].
    ///
    /// # Errors
    ///
    /// [`DeviceError::NotATerminal`] when stdin is not a tty.
    pub fn new(queue_capacity: usize, escape_timeout: Duration) -> Result<Self, DeviceError> {
        if !is_tty() {
            return Err(DeviceError::NotATerminal);
        }
        let terminal = Terminal::new();
        let size = terminal.size();
        let (tx, rx) = device::queue(queue_capacity);
        Ok(Self {
            terminal,
            reader: None,
            tx,
            rx: Some(rx),
            frame: FrameBuffer::new(size.cols, size.rows),
            renderer: DiffRenderer::new(),
            escape_timeout,
            finalized: false,
        })
    }

    fn apply_size(&mut self, size: Size) {
        if size.cols != self.frame.width() || size.rows != self.frame.height() {
            self.frame.resize(size.cols, size.rows);
            self.renderer.force_redraw();
        }
    }
}

impl<T> Surface for TtyDevice<T> {
    fn size(&self) -> Size {
        Size::new(self.frame.width(), self.frame.height())
    }

    fn set_content(&mut self, x: u16, y: u16, ch: char, attr: Attr) {
        self.frame.set(x, y, Cell::new(ch, attr));
    }

    fn clear(&mut self) {
        self.frame.clear();
    }

    fn show(&mut self) -> io::Result<()> {
        self.renderer.render(&self.frame);
        self.renderer.flush()
    }

    fn sync(&mut self) -> io::Result<()> {
        self.renderer.force_redraw();
        self.show()
    }
}

impl<T: Send + 'static> Device<T> for TtyDevice<T> {
    fn init(&mut self) -> Result<(), DeviceError> {
        if self.finalized {
            return Err(DeviceError::Finalized);
        }
        self.terminal.enter()?;
        let size = self.terminal.refresh_size();
        self.apply_size(size);
        self.reader = Some(InputReader::spawn(self.tx.clone(), self.escape_timeout)?);
        debug!(cols = size.cols, rows = size.rows, "tty device initialized");
        Ok(())
    }

    fn fini(&mut self) {
        if self.finalized {
            return;
        }
        self.finalized = true;
        // Dropping the receiver wakes a reader blocked in `send`.
        self.rx = None;
        if let Some(mut reader) = self.reader.take() {
            reader.stop();
        }
        if let Err(err) = self.terminal.leave() {
            warn!(%err, "failed to restore the terminal");
        }
        debug!("tty device finalized");
    }

    fn poll_event(&mut self) -> Option<DeviceEvent<T>> {
        let event = self.rx.as_ref()?.recv().ok()?;
        if let DeviceEvent::Resize(size) = &event {
            self.apply_size(*size);
        }
        Some(event)
    }

    fn poster(&self) -> Poster<T> {
        Poster::new(self.tx.clone())
    }
}

impl<T> Drop for TtyDevice<T> {
    fn drop(&mut self) {
        // `Terminal` restores itself; the reader must stop before it.
        self.rx = None;
        if let Some(mut reader) = self.reader.take() {
            reader.stop();
        }
    }
}
