// SPDX-License-Identifier: MIT
//
// lines-term — the terminal device layer for lines.
//
// Everything the event reactor needs from a character-cell terminal lives
// here, behind one trait: `device::Device`. The reactor polls it for
// events, posts work into it from other threads, writes cells into it and
// asks it to flush. Two implementations ship with the crate:
//
//   tty → a real terminal: termios raw mode, alternate screen, a stdin
//         reader thread feeding the key parser, and a differential
//         renderer that only emits the cells that changed.
//   sim → an in-memory terminal for tests: keys and resizes are injected
//         through a `SimHandle`, and the shown screen can be read back.
//
// Both flavors deliver input and posted work through one bounded FIFO
// channel, so ordering between keystrokes and cross-thread updates is
// exactly the order in which they were enqueued.

pub mod ansi;
pub mod buffer;
pub mod cell;
pub mod device;
pub mod diff;
pub mod input;
pub mod reader;
pub mod sim;
pub mod terminal;
pub mod tty;

pub use cell::{Attr, Cell};
pub use device::{Device, DeviceError, DeviceEvent, PostError, Poster, Surface};
pub use input::{Key, KeyEvent, Modifiers};
pub use sim::{SimDevice, SimHandle};
pub use terminal::Size;
pub use tty::TtyDevice;
