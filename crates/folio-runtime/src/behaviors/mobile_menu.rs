#![forbid(unsafe_code)]

//! Mobile navigation: a hamburger button injected next to the theme toggle,
//! shown only below the breakpoint, that opens and closes the nav panel.

use folio_core::config::MobileMenuConfig;
use folio_core::element::{ElementId, WatchId};
use folio_core::event::PageEvent;

use crate::behavior::{Behavior, Cmd, Context, Slot};

pub const OPEN_CLASS: &str = "mobile-menu-open";
pub const ICON_CLOSED: &str = "fas fa-bars";
pub const ICON_OPEN: &str = "fas fa-times";

#[derive(Debug)]
pub struct MobileMenuController {
    config: MobileMenuConfig,
    menu: Option<ElementId>,
    button: Option<ElementId>,
    watch: Option<WatchId>,
}

impl MobileMenuController {
    #[must_use]
    pub fn new(config: MobileMenuConfig) -> Self {
        Self {
            config,
            menu: None,
            button: None,
            watch: None,
        }
    }

    #[must_use]
    pub fn button(&self) -> Option<ElementId> {
        self.button
    }

    #[must_use]
    pub fn is_open(&self, cx: &mut Context<'_>) -> bool {
        self.menu
            .is_some_and(|menu| cx.page().has_class(menu, OPEN_CLASS))
    }

    /// Open a closed menu and close an open one.
    pub fn toggle(&mut self, cx: &mut Context<'_>) {
        let Some(menu) = self.menu else {
            return;
        };
        let open = cx.page().toggle_class(menu, OPEN_CLASS);
        self.set_icon(if open { ICON_OPEN } else { ICON_CLOSED }, cx);
        tracing::trace!(open, "mobile menu toggled");
    }

    /// Close the menu. Closing a closed menu changes nothing.
    pub fn close(&mut self, cx: &mut Context<'_>) {
        if let Some(menu) = self.menu {
            cx.page().remove_class(menu, OPEN_CLASS);
        }
        self.set_icon(ICON_CLOSED, cx);
    }

    fn set_icon(&self, icon: &str, cx: &mut Context<'_>) {
        let Some(button) = self.button else {
            return;
        };
        let page = cx.page();
        if let Some(i) = page.query_within(button, "i") {
            page.set_class_name(i, icon);
        }
    }

    fn apply_breakpoint(&mut self, narrow: bool, cx: &mut Context<'_>) {
        if let Some(button) = self.button {
            cx.page()
                .set_style(button, "display", if narrow { "block" } else { "none" });
        }
        if !narrow {
            self.close(cx);
        }
    }

    fn find_or_create_button(&self, cx: &mut Context<'_>) -> Option<ElementId> {
        let page = cx.page();
        if let Some(existing) = page.query(&format!(".{}", self.config.button_class)) {
            return Some(existing);
        }
        let Some(anchor) = page.query(&self.config.anchor_selector) else {
            tracing::debug!(anchor = %self.config.anchor_selector, "no anchor for the mobile menu button");
            return None;
        };
        let parent = page.parent(anchor)?;

        let button = page.create_element("button").ok()?;
        page.set_class_name(button, &self.config.button_class);
        page.set_attribute(button, "aria-label", "Toggle mobile menu");
        if let Ok(icon) = page.create_element("i") {
            page.set_class_name(icon, ICON_CLOSED);
            page.append_child(button, icon);
        }
        page.insert_before(parent, button, anchor);
        Some(button)
    }
}

impl Behavior for MobileMenuController {
    fn slot(&self) -> Slot {
        Slot::MobileMenu
    }

    fn start(&mut self, cx: &mut Context<'_>) -> Cmd {
        self.menu = cx.page().query(&self.config.menu_selector);
        self.button = self.find_or_create_button(cx);
        if let Some(button) = self.button {
            cx.page().listen_click(button);
        }
        let (watch, narrow) = cx.page().watch_media(&self.config.media_query());
        self.watch = Some(watch);
        self.apply_breakpoint(narrow, cx);
        Cmd::None
    }

    fn on_event(&mut self, event: &PageEvent, cx: &mut Context<'_>) -> Cmd {
        match event {
            PageEvent::Click { target } if Some(*target) == self.button => {
                self.toggle(cx);
                Cmd::None
            }
            PageEvent::MediaChange { watch, matches } if Some(*watch) == self.watch => {
                self.apply_breakpoint(*matches, cx);
                Cmd::None
            }
            _ => Cmd::None,
        }
    }

    fn stop(&mut self, cx: &mut Context<'_>) {
        if let Some(button) = self.button {
            cx.page().unlisten_click(button);
        }
        if let Some(watch) = self.watch.take() {
            cx.page().unwatch_media(watch);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::Scheduler;
    use folio_core::headless::HeadlessPage;
    use folio_core::page::Page;
    use pretty_assertions::assert_eq;

    struct Fixture {
        page: HeadlessPage,
        menu: ElementId,
        toggle: ElementId,
    }

    fn fixture(width: f64) -> Fixture {
        let mut page = HeadlessPage::new();
        let _ = page.set_viewport_width(width);
        let body = page.body().unwrap();
        let nav = page.build(body, "nav").class("navbar").done();
        let menu = page.build(nav, "ul").class("nav-menu").done();
        let toggle = page.build(nav, "button").class("theme-toggle").done();
        Fixture { page, menu, toggle }
    }

    fn icon(page: &HeadlessPage, button: ElementId) -> String {
        let i = page.query_within(button, "i").unwrap();
        page.attribute(i, "class").unwrap_or_default()
    }

    #[test]
    fn injects_button_before_theme_toggle() {
        let Fixture {
            mut page, toggle, ..
        } = fixture(600.0);
        let mut s = Scheduler::new();
        let mut ctl = MobileMenuController::new(MobileMenuConfig::default());
        ctl.start(&mut Context::new(&mut page, &mut s, Slot::MobileMenu));

        let button = ctl.button().unwrap();
        assert_eq!(page.previous_sibling(toggle), Some(button));
        assert_eq!(page.tag(button), Some("button"));
        assert_eq!(
            page.attribute(button, "aria-label").as_deref(),
            Some("Toggle mobile menu")
        );
        assert_eq!(icon(&page, button), ICON_CLOSED);
        assert_eq!(page.style(button, "display"), Some("block"));
    }

    #[test]
    fn click_toggles_menu_and_icon() {
        let Fixture { mut page, menu, .. } = fixture(600.0);
        let mut s = Scheduler::new();
        let mut ctl = MobileMenuController::new(MobileMenuConfig::default());
        ctl.start(&mut Context::new(&mut page, &mut s, Slot::MobileMenu));
        let button = ctl.button().unwrap();

        let click = page.click(button).unwrap();
        ctl.on_event(&click, &mut Context::new(&mut page, &mut s, Slot::MobileMenu));
        assert!(page.has_class(menu, OPEN_CLASS));
        assert_eq!(icon(&page, button), ICON_OPEN);

        ctl.on_event(&click, &mut Context::new(&mut page, &mut s, Slot::MobileMenu));
        assert!(!page.has_class(menu, OPEN_CLASS));
        assert_eq!(icon(&page, button), ICON_CLOSED);
    }

    #[test]
    fn widening_past_breakpoint_hides_and_closes() {
        let Fixture { mut page, menu, .. } = fixture(600.0);
        let mut s = Scheduler::new();
        let mut ctl = MobileMenuController::new(MobileMenuConfig::default());
        ctl.start(&mut Context::new(&mut page, &mut s, Slot::MobileMenu));
        let button = ctl.button().unwrap();
        ctl.toggle(&mut Context::new(&mut page, &mut s, Slot::MobileMenu));
        assert!(ctl.is_open(&mut Context::new(&mut page, &mut s, Slot::MobileMenu)));

        // 768px is still inside the breakpoint.
        assert!(page.set_viewport_width(768.0).is_empty());
        assert_eq!(page.style(button, "display"), Some("block"));
        assert!(page.has_class(menu, OPEN_CLASS));

        let events = page.set_viewport_width(769.0);
        assert_eq!(events.len(), 1);
        for event in &events {
            ctl.on_event(event, &mut Context::new(&mut page, &mut s, Slot::MobileMenu));
        }
        assert_eq!(page.style(button, "display"), Some("none"));
        assert!(!page.has_class(menu, OPEN_CLASS));
        assert_eq!(icon(&page, button), ICON_CLOSED);
    }

    #[test]
    fn desktop_start_hides_button() {
        let Fixture { mut page, .. } = fixture(1280.0);
        let mut s = Scheduler::new();
        let mut ctl = MobileMenuController::new(MobileMenuConfig::default());
        ctl.start(&mut Context::new(&mut page, &mut s, Slot::MobileMenu));
        assert_eq!(page.style(ctl.button().unwrap(), "display"), Some("none"));
    }

    #[test]
    fn existing_button_is_reused() {
        let Fixture { mut page, .. } = fixture(600.0);
        let body = page.body().unwrap();
        let existing = page.build(body, "button").class("mobile-menu-btn").done();
        let mut s = Scheduler::new();
        let mut ctl = MobileMenuController::new(MobileMenuConfig::default());
        ctl.start(&mut Context::new(&mut page, &mut s, Slot::MobileMenu));
        assert_eq!(ctl.button(), Some(existing));
        assert_eq!(page.query_all("button.mobile-menu-btn"), vec![existing]);
    }

    #[test]
    fn no_anchor_means_no_button() {
        let mut page = HeadlessPage::new();
        let body = page.body().unwrap();
        page.build(body, "ul").class("nav-menu").done();
        let mut s = Scheduler::new();
        let mut ctl = MobileMenuController::new(MobileMenuConfig::default());
        ctl.start(&mut Context::new(&mut page, &mut s, Slot::MobileMenu));
        assert_eq!(ctl.button(), None);
        assert_eq!(page.query_all("button").len(), 0);

        ctl.stop(&mut Context::new(&mut page, &mut s, Slot::MobileMenu));
        assert_eq!(page.active_media_watches(), 0);
    }
}
