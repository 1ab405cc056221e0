// SPDX-License-Identifier: MIT
//
// Features — inputs reserved for built-in behavior.
//
// A feature binding takes a rune or a key out of the listener namespace:
// the event loop handles Quit itself, and a rune or key bound to Quit can
// never get a listener. Scroll bindings only act when no listener claimed
// the input.
//
// The process-wide defaults are an immutable static. Every event loop
// works on its own copy, so rebinding keys on one loop never leaks into
// another.

use std::collections::HashMap;
use std::sync::LazyLock;

use lines_term::{Key, KeyEvent, Modifiers};

/// A built-in behavior an input can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    /// Stop listening and finalize the terminal.
    Quit,
    /// Move the first visible line up by one.
    ScrollUp,
    /// Move the first visible line down by one.
    ScrollDown,
}

static DEFAULTS: LazyLock<Features> = LazyLock::new(|| {
    let mut f = Features::new();
    f.set_rune('q', Feature::Quit);
    f.set_key(Key::Char('c'), Modifiers::CTRL, Feature::Quit);
    f.set_key(Key::Char('d'), Modifiers::CTRL, Feature::Quit);
    f
});

/// Key and rune bindings to [`Feature`]s.
///
/// ```
/// use lines::{Feature, Features};
///
/// let mut mine = Features::defaults().copy();
/// mine.set_rune('x', Feature::Quit);
/// assert_eq!(mine.rune_feature('x'), Some(Feature::Quit));
/// assert_eq!(Features::defaults().rune_feature('x'), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Features {
    keys: HashMap<(Key, Modifiers), Feature>,
    runes: HashMap<char, Feature>,
}

impl Features {
    /// No bindings at all.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The read-only process-wide defaults: `q`, Ctrl-C and Ctrl-D quit.
    #[must_use]
    pub fn defaults() -> &'static Self {
        &DEFAULTS
    }

    /// A private, mutable copy of these bindings.
    #[must_use]
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// Add the scroll bindings: Up and `k` scroll up, Down and `j` down.
    #[must_use]
    pub fn with_scrolling(mut self) -> Self {
        self.set_key(Key::Up, Modifiers::empty(), Feature::ScrollUp);
        self.set_key(Key::Down, Modifiers::empty(), Feature::ScrollDown);
        self.set_rune('k', Feature::ScrollUp);
        self.set_rune('j', Feature::ScrollDown);
        self
    }

    pub fn set_rune(&mut self, rune: char, feature: Feature) {
        self.runes.insert(rune, feature);
    }

    pub fn set_key(&mut self, key: Key, mods: Modifiers, feature: Feature) {
        self.keys.insert((key, mods), feature);
    }

    pub fn remove_rune(&mut self, rune: char) -> Option<Feature> {
        self.runes.remove(&rune)
    }

    pub fn remove_key(&mut self, key: Key, mods: Modifiers) -> Option<Feature> {
        self.keys.remove(&(key, mods))
    }

    #[must_use]
    pub fn rune_feature(&self, rune: char) -> Option<Feature> {
        self.runes.get(&rune).copied()
    }

    #[must_use]
    pub fn key_feature(&self, key: Key, mods: Modifiers) -> Option<Feature> {
        self.keys.get(&(key, mods)).copied()
    }

    /// The feature a keystroke triggers. A key binding wins over a rune
    /// binding for the same keystroke.
    #[must_use]
    pub fn feature_of(&self, ev: &KeyEvent) -> Option<Feature> {
        let by_key = if ev.key == Key::Rune {
            None
        } else {
            self.key_feature(ev.key, ev.mods)
        };
        by_key.or_else(|| self.rune_feature(ev.rune))
    }

    /// All key bindings of `feature`, in no particular order.
    #[must_use]
    pub fn keys_of(&self, feature: Feature) -> Vec<(Key, Modifiers)> {
        self.keys
            .iter()
            .filter(|&(_, f)| *f == feature)
            .map(|(k, _)| *k)
            .collect()
    }

    /// All rune bindings of `feature`, sorted.
    #[must_use]
    pub fn runes_of(&self, feature: Feature) -> Vec<char> {
        let mut runes: Vec<char> = self
            .runes
            .iter()
            .filter(|&(_, f)| *f == feature)
            .map(|(r, _)| *r)
            .collect();
        runes.sort_unstable();
        runes
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_quit_on_q_ctrl_c_ctrl_d() {
        let d = Features::defaults();
        assert_eq!(d.runes_of(Feature::Quit), vec!['q']);
        let keys = d.keys_of(Feature::Quit);
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&(Key::Char('c'), Modifiers::CTRL)));
        assert!(keys.contains(&(Key::Char('d'), Modifiers::CTRL)));
    }

    #[test]
    fn defaults_do_not_scroll() {
        assert!(Features::defaults().keys_of(Feature::ScrollUp).is_empty());
        assert!(Features::defaults().runes_of(Feature::ScrollDown).is_empty());
    }

    #[test]
    fn copy_is_independent() {
        let mut a = Features::defaults().copy();
        a.remove_rune('q');
        assert_eq!(a.rune_feature('q'), None);
        assert_eq!(Features::defaults().rune_feature('q'), Some(Feature::Quit));
    }

    #[test]
    fn with_scrolling_binds_arrows_and_vi_keys() {
        let f = Features::defaults().copy().with_scrolling();
        assert_eq!(
            f.key_feature(Key::Up, Modifiers::empty()),
            Some(Feature::ScrollUp)
        );
        assert_eq!(f.rune_feature('j'), Some(Feature::ScrollDown));
        assert_eq!(f.rune_feature('q'), Some(Feature::Quit));
    }

    #[test]
    fn feature_of_matches_ctrl_c_event() {
        let d = Features::defaults();
        assert_eq!(d.feature_of(&KeyEvent::ctrl('c')), Some(Feature::Quit));
        assert_eq!(d.feature_of(&KeyEvent::rune('q')), Some(Feature::Quit));
        assert_eq!(d.feature_of(&KeyEvent::rune('a')), None);
        assert_eq!(
            d.feature_of(&KeyEvent::key(Key::Char('c'), Modifiers::ALT)),
            None
        );
    }

    #[test]
    fn key_binding_wins_over_rune_binding() {
        let mut f = Features::new();
        f.set_rune('\r', Feature::ScrollDown);
        f.set_key(Key::Enter, Modifiers::empty(), Feature::Quit);
        assert_eq!(
            f.feature_of(&KeyEvent::key(Key::Enter, Modifiers::empty())),
            Some(Feature::Quit)
        );
    }

    #[test]
    fn remove_key_returns_previous_binding() {
        let mut f = Features::defaults().copy();
        assert_eq!(
            f.remove_key(Key::Char('d'), Modifiers::CTRL),
            Some(Feature::Quit)
        );
        assert_eq!(f.remove_key(Key::Char('d'), Modifiers::CTRL), None);
    }
}
