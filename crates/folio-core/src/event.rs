#![forbid(unsafe_code)]

//! Canonical page events.
//!
//! The host translates browser events into [`PageEvent`] values and feeds them
//! to the runtime. All events are plain data so tests can construct them
//! directly.
//!
//! # Design Notes
//!
//! - Scroll events carry no payload; controllers read the scroll offset from
//!   the page when they handle one.
//! - Intersection events are batched per observer, mirroring the browser's
//!   observer callback.
//! - `Modifiers` use bitflags for easy combination.

use bitflags::bitflags;

use crate::element::{ElementId, ObserverId, WatchId};

/// Canonical page event.
#[derive(Debug, Clone, PartialEq)]
pub enum PageEvent {
    /// The document finished parsing (`DOMContentLoaded`).
    Ready,

    /// The page and its subresources finished loading (`load`).
    Loaded,

    /// A click on an element the runtime registered a listener for.
    Click {
        /// Element the listener was attached to.
        target: ElementId,
    },

    /// The window scrolled.
    Scroll,

    /// A key was pressed anywhere in the document.
    Key(KeyEvent),

    /// An intersection observer reported entries.
    Intersection {
        /// Observer that produced the entries.
        observer: ObserverId,
        /// Entries in the order the observer reported them.
        entries: Vec<IntersectionEntry>,
    },

    /// A watched media query changed its match state.
    MediaChange {
        /// Watch that changed.
        watch: WatchId,
        /// Whether the query matches now.
        matches: bool,
    },

    /// The document's visibility changed.
    VisibilityChange {
        /// `true` when the tab is hidden.
        hidden: bool,
    },
}

/// One target reported by an intersection observer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionEntry {
    /// Observed element.
    pub target: ElementId,
    /// Whether the element intersects the root under the observer's options.
    pub is_intersecting: bool,
    /// Visible fraction of the element, in `[0, 1]`.
    pub ratio: f64,
}

impl IntersectionEntry {
    /// Entry for an element that became visible.
    #[must_use]
    pub const fn visible(target: ElementId) -> Self {
        Self {
            target,
            is_intersecting: true,
            ratio: 1.0,
        }
    }

    /// Entry for an element that left the viewport.
    #[must_use]
    pub const fn hidden(target: ElementId) -> Self {
        Self {
            target,
            is_intersecting: false,
            ratio: 0.0,
        }
    }
}

/// A keyboard event (`keydown`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    /// Logical key.
    pub code: KeyCode,
    /// Modifier keys held during the event.
    pub modifiers: Modifiers,
}

impl KeyEvent {
    /// Create a key event with no modifiers.
    #[must_use]
    pub const fn new(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: Modifiers::NONE,
        }
    }

    /// Create a key event with modifiers.
    #[must_use]
    pub const fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Check if this is a specific character key.
    #[must_use]
    pub fn is_char(&self, c: char) -> bool {
        matches!(self.code, KeyCode::Char(ch) if ch == c)
    }

    #[must_use]
    pub const fn ctrl(&self) -> bool {
        self.modifiers.contains(Modifiers::CTRL)
    }

    #[must_use]
    pub const fn shift(&self) -> bool {
        self.modifiers.contains(Modifiers::SHIFT)
    }

    #[must_use]
    pub const fn alt(&self) -> bool {
        self.modifiers.contains(Modifiers::ALT)
    }

    /// Check if Meta/Cmd is held.
    #[must_use]
    pub const fn meta(&self) -> bool {
        self.modifiers.contains(Modifiers::META)
    }

    /// Ctrl on most platforms, Cmd on macOS: either one counts.
    #[must_use]
    pub const fn platform_modifier(&self) -> bool {
        self.ctrl() || self.meta()
    }
}

/// Logical key, normalized from the DOM `KeyboardEvent.key` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// A printable character, case preserved.
    Char(char),
    Enter,
    Escape,
    Tab,
    Backspace,
    /// Any other named key.
    Other,
}

impl KeyCode {
    /// Map a DOM `key` value to a [`KeyCode`].
    ///
    /// Single-character values become [`KeyCode::Char`]; a few named keys are
    /// recognized; everything else is [`KeyCode::Other`].
    #[must_use]
    pub fn from_dom_key(key: &str) -> Self {
        let mut chars = key.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Self::Char(c);
        }
        match key {
            "Enter" => Self::Enter,
            "Escape" => Self::Escape,
            "Tab" => Self::Tab,
            "Backspace" => Self::Backspace,
            _ => Self::Other,
        }
    }
}

bitflags! {
    /// Modifier keys that can be held during a key event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        /// No modifiers.
        const NONE  = 0b0000;
        /// Shift key.
        const SHIFT = 0b0001;
        /// Alt/Option key.
        const ALT   = 0b0010;
        /// Control key.
        const CTRL  = 0b0100;
        /// Meta/Command key.
        const META  = 0b1000;
    }
}

impl Default for Modifiers {
    fn default() -> Self {
        Self::NONE
    }
}

/// What the host should do with the browser event after dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventOutcome {
    /// Call `preventDefault()` on the originating DOM event.
    pub prevent_default: bool,
}

impl EventOutcome {
    /// Outcome that lets the browser proceed.
    pub const PASS: Self = Self {
        prevent_default: false,
    };

    /// Outcome that suppresses the browser's default action.
    pub const PREVENT: Self = Self {
        prevent_default: true,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dom_keys_normalize() {
        assert_eq!(KeyCode::from_dom_key("T"), KeyCode::Char('T'));
        assert_eq!(KeyCode::from_dom_key("t"), KeyCode::Char('t'));
        assert_eq!(KeyCode::from_dom_key("Escape"), KeyCode::Escape);
        assert_eq!(KeyCode::from_dom_key("Esc"), KeyCode::Other);
        assert_eq!(KeyCode::from_dom_key("ArrowUp"), KeyCode::Other);
        assert_eq!(KeyCode::from_dom_key("é"), KeyCode::Char('é'));
    }

    #[test]
    fn platform_modifier_accepts_ctrl_or_meta() {
        let base = KeyEvent::new(KeyCode::Char('T'));
        assert!(!base.platform_modifier());
        assert!(base.with_modifiers(Modifiers::CTRL).platform_modifier());
        assert!(base.with_modifiers(Modifiers::META).platform_modifier());
        assert!(!base.with_modifiers(Modifiers::ALT | Modifiers::SHIFT).platform_modifier());
    }
}
