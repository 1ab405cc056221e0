// SPDX-License-Identifier: MIT
//
// Listeners — callbacks for runes and keys.
//
// One callback per rune and one per (key, modifiers) pair. A keyboard
// listener, while set, receives every keystroke except Quit and shadows
// both maps without removing anything from them.
//
// The registry belongs to exactly one event loop and is only touched
// through `&mut`, so it needs no locking: registration happens before
// `listen` or between runs, dispatch happens on the listening thread.

use std::collections::HashMap;

use lines_term::{Key, Modifiers};
use tracing::debug;

use crate::env::Env;
use crate::error::RegisterError;
use crate::features::{Feature, Features};

/// Callback for a rune, a key, a resize or a posted update.
pub type Listener = Box<dyn FnMut(&mut Env<'_>) + Send>;

/// Callback receiving every keystroke as `(env, rune, key, mods)`.
pub type KeyboardListener = Box<dyn FnMut(&mut Env<'_>, char, Key, Modifiers) + Send>;

/// Rune, key and keyboard listeners of one event loop.
#[derive(Default)]
pub struct Listeners {
    runes: HashMap<char, Listener>,
    keys: HashMap<(Key, Modifiers), Listener>,
    keyboard: Option<KeyboardListener>,
}

impl std::fmt::Debug for Listeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners")
            .field("runes", &self.runes.keys().collect::<Vec<_>>())
            .field("keys", &self.keys.keys().collect::<Vec<_>>())
            .field("keyboard", &self.keyboard.is_some())
            .finish()
    }
}

impl Listeners {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `cb` for `rune`, or unregister with `None`.
    ///
    /// # Errors
    ///
    /// [`ZeroRune`](RegisterError::ZeroRune) for `'\0'`,
    /// [`Quit`](RegisterError::Quit) if `features` binds the rune to quit,
    /// [`Exists`](RegisterError::Exists) if the rune has a listener.
    /// Unregistering never fails.
    pub fn rune(
        &mut self,
        rune: char,
        cb: Option<Listener>,
        features: &Features,
    ) -> Result<(), RegisterError> {
        let Some(cb) = cb else {
            self.remove_rune(rune);
            return Ok(());
        };
        if rune == '\0' {
            return Err(RegisterError::ZeroRune);
        }
        if features.rune_feature(rune) == Some(Feature::Quit) {
            return Err(RegisterError::Quit);
        }
        if self.runes.contains_key(&rune) {
            return Err(RegisterError::Exists);
        }
        debug!(?rune, "rune listener registered");
        self.runes.insert(rune, cb);
        Ok(())
    }

    /// Register `cb` for `key` with `mods`, or unregister with `None`.
    ///
    /// # Errors
    ///
    /// [`ZeroKey`](RegisterError::ZeroKey) for [`Key::Rune`],
    /// [`Quit`](RegisterError::Quit) if the key is bound to quit,
    /// [`Exists`](RegisterError::Exists) if it has a listener.
    pub fn key(
        &mut self,
        key: Key,
        mods: Modifiers,
        cb: Option<Listener>,
        features: &Features,
    ) -> Result<(), RegisterError> {
        let Some(cb) = cb else {
            self.remove_key(key, mods);
            return Ok(());
        };
        if key == Key::Rune {
            return Err(RegisterError::ZeroKey);
        }
        if features.key_feature(key, mods) == Some(Feature::Quit) {
            return Err(RegisterError::Quit);
        }
        if self.keys.contains_key(&(key, mods)) {
            return Err(RegisterError::Exists);
        }
        debug!(?key, ?mods, "key listener registered");
        self.keys.insert((key, mods), cb);
        Ok(())
    }

    /// Drop the listener for `rune`, if any.
    pub fn remove_rune(&mut self, rune: char) {
        if self.runes.remove(&rune).is_some() {
            debug!(?rune, "rune listener removed");
        }
    }

    /// Drop the listener for `key` with exactly `mods`, if any.
    pub fn remove_key(&mut self, key: Key, mods: Modifiers) {
        if self.keys.remove(&(key, mods)).is_some() {
            debug!(?key, ?mods, "key listener removed");
        }
    }

    /// Set or clear the shadowing keyboard listener.
    pub fn keyboard(&mut self, cb: Option<KeyboardListener>) {
        debug!(set = cb.is_some(), "keyboard listener");
        self.keyboard = cb;
    }

    #[must_use]
    pub const fn has_keyboard_listener(&self) -> bool {
        self.keyboard.is_some()
    }

    #[must_use]
    pub fn rune_listener_of(&self, rune: char) -> Option<&Listener> {
        self.runes.get(&rune)
    }

    #[must_use]
    pub fn key_listener_of(&self, key: Key, mods: Modifiers) -> Option<&Listener> {
        self.keys.get(&(key, mods))
    }

    pub(crate) fn rune_mut(&mut self, rune: char) -> Option<&mut Listener> {
        self.runes.get_mut(&rune)
    }

    pub(crate) fn key_mut(&mut self, key: Key, mods: Modifiers) -> Option<&mut Listener> {
        self.keys.get_mut(&(key, mods))
    }

    pub(crate) fn keyboard_mut(&mut self) -> Option<&mut KeyboardListener> {
        self.keyboard.as_mut()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
