// SPDX-License-Identifier: MIT
//
// Events — the event reactor.
//
// One thread, one loop. `listen` dispatches a synthetic resize so the
// first frame is drawn, then blocks on the device for the next event and
// dispatches it:
//
//   resize → grow the screen; the resize listener runs only if the
//            screen is large enough; full sync
//   key    → quit feature terminates; a too-small screen drops the rest;
//            the keyboard listener shadows rune and key listeners, which
//            may both fire; unclaimed scroll features scroll; incremental
//            sync
//   update → run the posted callback; incremental sync
//   quit   → finalize the device, then run the quit callback
//
// Callbacks receive an `Env` borrowing the screen for that one call, so
// nothing from inside the loop can leak out of it. The only way in from
// other threads is a `Handle`, which posts into the same bounded queue the
// device delivers input on. Posting never blocks.
//
// A simulated loop also carries a `QuitGate`, closed once the loop is
// finalized, so the `Sim` harness can tell a finished loop from a busy one.

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use lines_term::{
    Device, DeviceEvent, Key, KeyEvent, Modifiers, PostError, Poster, SimDevice, Size, TtyDevice,
};
use tracing::{debug, error, trace, warn};

use crate::config::Config;
use crate::env::{Env, Event};
use crate::error::{Error, RegisterError};
use crate::features::{Feature, Features};
use crate::listeners::{Listener, Listeners};
use crate::screen::Screen;
use crate::sim::{QuitGate, Sim};

/// Size of a simulated terminal unless told otherwise.
pub const SIM_SIZE: Size = Size::new(80, 25);

/// A one-shot callback posted through [`Handle::update`].
pub type Update = Box<dyn FnOnce(&mut Env<'_>) + Send>;

/// Work posted into an event loop's queue.
pub enum Posted {
    Update { callback: Update, at: Instant },
    Quit,
}

impl std::fmt::Debug for Posted {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Update { at, .. } => f.debug_struct("Update").field("at", at).finish(),
            Self::Quit => f.write_str("Quit"),
        }
    }
}

/// Lifecycle of an event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Built, not yet listening.
    Idle,
    /// Inside [`Events::listen`].
    Listening,
    /// Quit; the device has been given back.
    Finalized,
}

// ─── Handle ──────────────────────────────────────────────────────────────────

/// Cloneable, thread-safe way into a running loop.
#[derive(Debug, Clone)]
pub struct Handle {
    poster: Poster<Posted>,
}

impl Handle {
    /// Run `cb` on the listening thread, then sync the screen.
    ///
    /// # Errors
    ///
    /// [`Error::Post`] if the queue is full or the loop is gone; the
    /// callback is dropped.
    pub fn update(&self, cb: impl FnOnce(&mut Env<'_>) + Send + 'static) -> Result<(), Error> {
        let posted = Posted::Update {
            callback: Box::new(cb),
            at: Instant::now(),
        };
        self.poster.post(posted).map_err(|err| {
            warn!(%err, "update dropped");
            Error::Post(err)
        })
    }

    /// Ask the loop to terminate. Succeeds if it already has.
    ///
    /// # Errors
    ///
    /// [`Error::Post`] with [`PostError::Full`] if the queue is full.
    pub fn quit_listening(&self) -> Result<(), Error> {
        match self.poster.post(Posted::Quit) {
            Ok(()) | Err(PostError::Disconnected) => Ok(()),
            Err(err) => Err(Error::Post(err)),
        }
    }

    pub(crate) fn post(&self, posted: Posted) -> Result<(), PostError> {
        self.poster.post(posted)
    }
}

// ─── Events ──────────────────────────────────────────────────────────────────

/// The event loop: a screen, its listeners and feature bindings.
///
/// ```no_run
/// use lines::{Config, Events};
///
/// let mut events = Events::new(Config::default())?;
/// events.on_resize(|env| {
///     env.line(0).set("hello, press q to quit");
/// });
/// events.listen()?;
/// # Ok::<(), lines::Error>(())
/// ```
pub struct Events {
    screen: Screen,
    listeners: Listeners,
    features: Features,
    on_resize: Option<Listener>,
    on_quit: Option<Box<dyn FnOnce() + Send>>,
    state: State,
    poster: Poster<Posted>,
    gate: Option<Arc<QuitGate>>,
}

impl std::fmt::Debug for Events {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Events")
            .field("state", &self.state)
            .field("screen", &self.screen)
            .field("listeners", &self.listeners)
            .finish_non_exhaustive()
    }
}

impl Events {
    /// An event loop on the controlling terminal, which is taken over
    /// immediately (raw mode, alternate screen).
    ///
    /// # Errors
    ///
    /// [`Error::Device`] if the terminal cannot be set up.
    pub fn new(config: Config) -> Result<Self, Error> {
        let device = TtyDevice::<Posted>::new(config.queue_capacity, config.escape_timeout)?;
        Self::build(Box::new(device), config.features, None)
    }

    /// An event loop on a simulated 80×25 terminal, plus the harness
    /// driving it.
    ///
    /// # Errors
    ///
    /// Fails only if the simulated device refuses to initialize.
    pub fn sim(config: Config) -> Result<(Self, Sim), Error> {
        Self::sim_with_size(config, SIM_SIZE)
    }

    /// Like [`sim`](Self::sim) with a terminal of `size`.
    ///
    /// # Errors
    ///
    /// Fails only if the simulated device refuses to initialize.
    pub fn sim_with_size(config: Config, size: Size) -> Result<(Self, Sim), Error> {
        let (device, sim_device) = SimDevice::new(size, config.queue_capacity);
        let gate = Arc::new(QuitGate::new());
        let timeout = config.flush_timeout;
        let events = Self::build(Box::new(device), config.features, Some(Arc::clone(&gate)))?;
        let sim = Sim::new(sim_device, events.handle(), gate, timeout);
        Ok((events, sim))
    }

    /// An event loop on a device of the host's choosing.
    ///
    /// # Errors
    ///
    /// [`Error::Device`] if the device fails to initialize.
    pub fn with_device(device: Box<dyn Device<Posted>>, config: Config) -> Result<Self, Error> {
        Self::build(device, config.features, None)
    }

    fn build(
        mut device: Box<dyn Device<Posted>>,
        features: Features,
        gate: Option<Arc<QuitGate>>,
    ) -> Result<Self, Error> {
        device.init()?;
        let poster = device.poster();
        Ok(Self {
            screen: Screen::new(device),
            listeners: Listeners::new(),
            features,
            on_resize: None,
            on_quit: None,
            state: State::Idle,
            poster,
            gate,
        })
    }

    // ── State ───────────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub const fn state(&self) -> State {
        self.state
    }

    #[inline]
    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.state == State::Listening
    }

    #[must_use]
    pub const fn screen(&self) -> &Screen {
        &self.screen
    }

    /// A handle for posting updates from other threads.
    #[must_use]
    pub fn handle(&self) -> Handle {
        Handle {
            poster: self.poster.clone(),
        }
    }

    /// Post `cb` to run on the listening thread.
    ///
    /// # Errors
    ///
    /// See [`Handle::update`].
    pub fn update(&self, cb: impl FnOnce(&mut Env<'_>) + Send + 'static) -> Result<(), Error> {
        self.handle().update(cb)
    }

    /// Finalize a loop that is not listening. Idempotent. A listening
    /// loop is stopped through [`Handle::quit_listening`] or
    /// [`Env::quit`].
    pub fn quit_listening(&mut self) {
        if self.state == State::Idle {
            self.terminate();
        }
    }

    // ── Registration ────────────────────────────────────────────

    /// Called on every resize, including the initial one, while the
    /// screen is large enough.
    pub fn on_resize(&mut self, cb: impl FnMut(&mut Env<'_>) + Send + 'static) {
        self.on_resize = Some(Box::new(cb));
    }

    /// Called once when the loop terminates.
    pub fn on_quit(&mut self, cb: impl FnOnce() + Send + 'static) {
        self.on_quit = Some(Box::new(cb));
    }

    /// Listen for `rune`.
    ///
    /// # Errors
    ///
    /// See [`Listeners::rune`].
    pub fn rune(
        &mut self,
        rune: char,
        cb: impl FnMut(&mut Env<'_>) + Send + 'static,
    ) -> Result<(), RegisterError> {
        self.listeners.rune(rune, Some(Box::new(cb)), &self.features)
    }

    pub fn remove_rune(&mut self, rune: char) {
        self.listeners.remove_rune(rune);
    }

    /// Listen for `key` with exactly `mods`.
    ///
    /// # Errors
    ///
    /// See [`Listeners::key`].
    pub fn key(
        &mut self,
        key: Key,
        mods: Modifiers,
        cb: impl FnMut(&mut Env<'_>) + Send + 'static,
    ) -> Result<(), RegisterError> {
        self.listeners.key(key, mods, Some(Box::new(cb)), &self.features)
    }

    pub fn remove_key(&mut self, key: Key, mods: Modifiers) {
        self.listeners.remove_key(key, mods);
    }

    /// Receive every keystroke except quit, instead of the rune and key
    /// listeners.
    pub fn keyboard(
        &mut self,
        cb: impl FnMut(&mut Env<'_>, char, Key, Modifiers) + Send + 'static,
    ) {
        self.listeners.keyboard(Some(Box::new(cb)));
    }

    pub fn remove_keyboard(&mut self) {
        self.listeners.keyboard(None);
    }

    #[must_use]
    pub const fn listeners(&self) -> &Listeners {
        &self.listeners
    }

    /// Require the terminal to be taller than `m` rows.
    pub fn set_min(&mut self, m: u16) {
        self.screen.set_min(m);
    }

    // ── Features ────────────────────────────────────────────────

    #[must_use]
    pub const fn features(&self) -> &Features {
        &self.features
    }

    /// Bind `rune` to `feature`, or unbind it with `None`.
    ///
    /// # Errors
    ///
    /// [`RegisterError::Exists`] when binding to quit a rune that has a
    /// listener.
    pub fn set_rune_feature(
        &mut self,
        rune: char,
        feature: Option<Feature>,
    ) -> Result<(), RegisterError> {
        match feature {
            Some(Feature::Quit) if self.listeners.rune_listener_of(rune).is_some() => {
                Err(RegisterError::Exists)
            }
            Some(feature) => {
                self.features.set_rune(rune, feature);
                Ok(())
            }
            None => {
                self.features.remove_rune(rune);
                Ok(())
            }
        }
    }

    /// Bind `key` with `mods` to `feature`, or unbind it with `None`.
    ///
    /// # Errors
    ///
    /// [`RegisterError::Exists`] when binding to quit a key that has a
    /// listener.
    pub fn set_key_feature(
        &mut self,
        key: Key,
        mods: Modifiers,
        feature: Option<Feature>,
    ) -> Result<(), RegisterError> {
        match feature {
            Some(Feature::Quit) if self.listeners.key_listener_of(key, mods).is_some() => {
                Err(RegisterError::Exists)
            }
            Some(feature) => {
                self.features.set_key(key, mods, feature);
                Ok(())
            }
            None => {
                self.features.remove_key(key, mods);
                Ok(())
            }
        }
    }

    // ── Loop ────────────────────────────────────────────────────

    /// Run the loop on the calling thread until it terminates.
    ///
    /// # Errors
    ///
    /// - [`Error::Finalized`] if the loop already terminated.
    /// - [`Error::Io`] if the first frame cannot be flushed.
    /// - [`Error::ListenerPanicked`] if a callback panicked.
    ///
    /// The device is finalized in every error case but the first.
    pub fn listen(&mut self) -> Result<(), Error> {
        match self.state {
            State::Finalized => return Err(Error::Finalized),
            State::Listening => return Ok(()),
            State::Idle => {}
        }
        self.state = State::Listening;
        debug!("listening");

        let size = self.screen.size();
        if let Err(err) = self.dispatch_guarded(DeviceEvent::Resize(size)) {
            self.terminate();
            return Err(err);
        }

        while self.state == State::Listening {
            let Some(event) = self.screen.device_mut().poll_event() else {
                debug!("device closed");
                self.terminate();
                break;
            };
            match self.dispatch_guarded(event) {
                Ok(()) => {}
                Err(Error::Io(err)) => warn!(%err, "screen flush failed"),
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    fn dispatch_guarded(&mut self, event: DeviceEvent<Posted>) -> Result<(), Error> {
        match panic::catch_unwind(AssertUnwindSafe(|| self.dispatch(event))) {
            Ok(result) => result.map_err(Error::Io),
            Err(_) => {
                error!("listener panicked, finalizing");
                self.terminate();
                Err(Error::ListenerPanicked)
            }
        }
    }

    fn dispatch(&mut self, event: DeviceEvent<Posted>) -> io::Result<()> {
        match event {
            DeviceEvent::Resize(size) => self.on_resize_event(size),
            DeviceEvent::Key(key) => self.on_key_event(key),
            DeviceEvent::Interrupt(Posted::Update { callback, at }) => {
                self.on_update_event(callback, at)
            }
            DeviceEvent::Interrupt(Posted::Quit) => {
                debug!("quit posted");
                self.terminate();
                Ok(())
            }
        }
    }

    fn on_resize_event(&mut self, size: Size) -> io::Result<()> {
        trace!(cols = size.cols, rows = size.rows, "resize");
        let ok = self.screen.resize();
        let mut quit = false;
        if let (true, Some(cb)) = (ok, self.on_resize.as_mut()) {
            let mut env = Env::new(&mut self.screen, Event::Resize(size));
            cb(&mut env);
            quit = env.quit_requested();
        }
        self.finish(false, quit)
    }

    fn on_key_event(&mut self, key: KeyEvent) -> io::Result<()> {
        let feature = self.features.feature_of(&key);
        if feature == Some(Feature::Quit) {
            debug!(?key, "quit key");
            self.terminate();
            return Ok(());
        }
        if !self.screen.is_ok() {
            trace!(?key, "screen too small, key dropped");
            return self.finish(true, false);
        }
        trace!(?key, "key");

        let Self {
            screen, listeners, ..
        } = self;
        let mut quit = false;
        let mut claimed = false;
        if let Some(cb) = listeners.keyboard_mut() {
            let mut env = Env::new(screen, Event::Key(key));
            cb(&mut env, key.rune, key.key, key.mods);
            quit = env.quit_requested();
            claimed = true;
        } else {
            if let Some(cb) = listeners.rune_mut(key.rune) {
                let mut env = Env::new(screen, Event::Key(key));
                cb(&mut env);
                quit |= env.quit_requested();
                claimed = true;
            }
            if let Some(cb) = listeners.key_mut(key.key, key.mods) {
                let mut env = Env::new(screen, Event::Key(key));
                cb(&mut env);
                quit |= env.quit_requested();
                claimed = true;
            }
        }
        if !claimed {
            match feature {
                Some(Feature::ScrollUp) => {
                    screen.scroll_by(-1);
                }
                Some(Feature::ScrollDown) => {
                    screen.scroll_by(1);
                }
                _ => {}
            }
        }
        self.finish(true, quit)
    }

    fn on_update_event(&mut self, callback: Update, at: Instant) -> io::Result<()> {
        trace!(queued_for = ?at.elapsed(), "update");
        let mut env = Env::new(&mut self.screen, Event::Update(at));
        callback(&mut env);
        let quit = env.quit_requested();
        self.finish(true, quit)
    }

    /// Sync the screen, then terminate if a callback asked for it.
    fn finish(&mut self, show: bool, quit: bool) -> io::Result<()> {
        let synced = self.screen.ensure_synced(show);
        if quit {
            debug!("quit requested by callback");
            self.terminate();
        }
        synced.map(|_| ())
    }

    fn terminate(&mut self) {
        if self.state == State::Finalized {
            return;
        }
        self.state = State::Finalized;
        self.screen.fini();
        if let Some(gate) = &self.gate {
            gate.close();
        }
        debug!("event loop finalized");
        // After fini, so a panic here cannot skip it.
        if let Some(cb) = self.on_quit.take() {
            cb();
        }
    }
}

impl Drop for Events {
    fn drop(&mut self) {
        if self.state != State::Finalized {
            self.screen.fini();
            if let Some(gate) = &self.gate {
                gate.close();
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
