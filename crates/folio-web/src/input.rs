#![forbid(unsafe_code)]

//! DOM keyboard normalization.
//!
//! The browser hands us `KeyboardEvent.key` plus four modifier booleans; this
//! module turns them into the runtime's [`KeyEvent`]. It has no `web-sys`
//! dependency so it is tested on native targets.

use folio_core::event::{KeyCode, KeyEvent, Modifiers};

/// Modifier state as read off a DOM keyboard event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DomModifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub meta: bool,
}

impl DomModifiers {
    #[must_use]
    pub fn to_modifiers(self) -> Modifiers {
        let mut mods = Modifiers::NONE;
        mods.set(Modifiers::CTRL, self.ctrl);
        mods.set(Modifiers::SHIFT, self.shift);
        mods.set(Modifiers::ALT, self.alt);
        mods.set(Modifiers::META, self.meta);
        mods
    }
}

/// Build a [`KeyEvent`] from a DOM `key` value and modifier state.
#[must_use]
pub fn key_event(key: &str, mods: DomModifiers) -> KeyEvent {
    KeyEvent::new(KeyCode::from_dom_key(key)).with_modifiers(mods.to_modifiers())
}
