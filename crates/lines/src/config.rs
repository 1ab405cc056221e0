// SPDX-License-Identifier: MIT
//
// Event loop configuration.

use std::time::Duration;

use crate::features::Features;

/// How an event loop is built.
///
/// The defaults suit an interactive terminal: a queue deep enough for a
/// paste burst, a 25 ms window to tell a lone Escape from the start of an
/// escape sequence, and the default feature bindings.
#[derive(Debug, Clone)]
pub struct Config {
    /// Capacity of the event queue shared by input and posted updates.
    /// Posting to a full queue fails instead of blocking.
    pub queue_capacity: usize,
    /// How long an incomplete escape sequence may wait for more bytes.
    pub escape_timeout: Duration,
    /// Key and rune bindings for this loop; copied, never shared.
    pub features: Features,
    /// How long the simulation harness waits for a flush.
    pub flush_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            queue_capacity: 64,
            escape_timeout: Duration::from_millis(25),
            features: Features::defaults().copy(),
            flush_timeout: Duration::from_secs(2),
        }
    }
}

impl Config {
    /// The defaults with Up/Down and `k`/`j` bound to scrolling.
    #[must_use]
    pub fn with_scrolling() -> Self {
        let mut config = Self::default();
        config.features = config.features.with_scrolling();
        config
    }
}
