// SPDX-License-Identifier: MIT
//
// lines — a line-oriented terminal UI runtime.
//
// A terminal is a stack of rows. Callbacks set the content of rows; after
// every event the runtime writes exactly the rows that changed and flushes
// once. The pieces, leaf first:
//
//   Line     → one row: content, the content it replaces, a dirty flag
//   Lines    → all rows, created on demand, with a scroll offset
//   Screen   → lines + error overlay + the device, minimum-height policy
//   Features → inputs reserved for quit and scrolling
//   Listeners→ rune, key and keyboard callbacks
//   Events   → the reactor: polls the device, dispatches, syncs
//   Env      → what a callback sees, borrowed for the call only
//   Sim      → drives a loop on a simulated terminal from tests
//
// Threads: a loop runs on one thread. Other threads talk to it through a
// `Handle`, which posts into the bounded queue the device delivers input
// on; nothing ever blocks on a full queue.

pub mod config;
pub mod env;
pub mod error;
pub mod events;
pub mod features;
pub mod line;
pub mod lines;
pub mod listeners;
pub mod overlay;
pub mod screen;
pub mod sim;

pub use config::Config;
pub use env::{Env, Event};
pub use error::{Error, RegisterError};
pub use events::{Events, Handle, Posted, SIM_SIZE, State, Update};
pub use features::{Feature, Features};
pub use line::{Line, LineKind};
pub use lines::Lines;
pub use listeners::{KeyboardListener, Listener, Listeners};
pub use overlay::ErrorOverlay;
pub use screen::Screen;
pub use sim::Sim;

pub use lines_term::{Attr, Key, KeyEvent, Modifiers, Size};
