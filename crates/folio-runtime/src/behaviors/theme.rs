#![forbid(unsafe_code)]

//! Light/dark theme toggle.
//!
//! The theme lives on the root element as `data-color-scheme`. The toggle
//! button's icon and label always describe the *next* action: while light is
//! active it shows a moon and offers dark mode, and vice versa.

use core::fmt;

use folio_core::config::ThemeConfig;
use folio_core::element::ElementId;
use folio_core::event::PageEvent;

use crate::behavior::{Behavior, Cmd, Context, Slot};
use crate::scheduler::TaskHandle;

/// Root attribute holding the active theme.
pub const THEME_ATTRIBUTE: &str = "data-color-scheme";

const TRANSITION: &str = "all 0.3s ease";

/// Color theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    /// Icon classes shown on the toggle while this theme is active.
    #[must_use]
    pub const fn icon_class(self) -> &'static str {
        match self {
            Self::Light => "fas fa-moon",
            Self::Dark => "fas fa-sun",
        }
    }

    /// Accessible label of the toggle while this theme is active.
    #[must_use]
    pub const fn toggle_label(self) -> &'static str {
        match self {
            Self::Light => "Switch to dark mode",
            Self::Dark => "Switch to light mode",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Owns the theme state and the toggle button.
#[derive(Debug)]
pub struct ThemeController {
    config: ThemeConfig,
    theme: Theme,
    toggle: Option<ElementId>,
    clear_transition: Option<TaskHandle>,
}

impl ThemeController {
    #[must_use]
    pub fn new(config: ThemeConfig) -> Self {
        Self {
            config,
            theme: Theme::Light,
            toggle: None,
            clear_transition: None,
        }
    }

    #[must_use]
    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// The bound toggle button, if one was found.
    #[must_use]
    pub fn toggle_button(&self) -> Option<ElementId> {
        self.toggle
    }

    /// Apply `theme` to the root and refresh the toggle.
    pub fn set_theme(&mut self, theme: Theme, cx: &mut Context<'_>) {
        self.theme = theme;
        let page = cx.page();
        let root = page.root();
        page.set_attribute(root, THEME_ATTRIBUTE, theme.as_str());

        let Some(toggle) = self.toggle else {
            return;
        };
        if let Some(icon) = page.query_within(toggle, "i") {
            page.set_class_name(icon, theme.icon_class());
            page.set_attribute(toggle, "aria-label", theme.toggle_label());
        }
    }

    /// Flip the theme with a short root transition.
    pub fn toggle_theme(&mut self, cx: &mut Context<'_>) {
        self.set_theme(self.theme.flipped(), cx);
        tracing::debug!(theme = %self.theme, "theme toggled");

        let page = cx.page();
        let root = page.root();
        page.set_style(root, "transition", TRANSITION);
        if let Some(pending) = self.clear_transition.take() {
            cx.cancel(pending);
        }
        self.clear_transition = Some(cx.set_timeout(self.config.transition()));
    }
}

impl Behavior for ThemeController {
    fn slot(&self) -> Slot {
        Slot::Theme
    }

    fn start(&mut self, cx: &mut Context<'_>) -> Cmd {
        self.toggle = cx.page().element_by_id(&self.config.toggle_id);
        match self.toggle {
            Some(toggle) => cx.page().listen_click(toggle),
            None => tracing::error!(id = %self.config.toggle_id, "Theme toggle button not found"),
        }
        self.set_theme(self.theme, cx);
        Cmd::None
    }

    fn on_event(&mut self, event: &PageEvent, cx: &mut Context<'_>) -> Cmd {
        match event {
            PageEvent::Click { target } if Some(*target) == self.toggle => {
                self.toggle_theme(cx);
                Cmd::PreventDefault
            }
            _ => Cmd::None,
        }
    }

    fn on_task(&mut self, task: TaskHandle, cx: &mut Context<'_>) -> Cmd {
        if self.clear_transition == Some(task) {
            self.clear_transition = None;
            let page = cx.page();
            let root = page.root();
            page.remove_style(root, "transition");
        }
        Cmd::None
    }

    fn stop(&mut self, cx: &mut Context<'_>) {
        if let Some(toggle) = self.toggle {
            cx.page().unlisten_click(toggle);
        }
        if self.clear_transition.take().is_some() {
            let page = cx.page();
            let root = page.root();
            page.remove_style(root, "transition");
        }
        cx.cancel_mine();
    }
}
