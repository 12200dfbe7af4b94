#![forbid(unsafe_code)]

//! In-page navigation: smooth scrolling to sections on link click, and
//! highlighting the link of the section under the navbar while scrolling.
//!
//! When the page has no native smooth scrolling the controller animates the
//! scroll itself, one [`Tween`] step per animation frame.

use core::time::Duration;

use folio_core::config::NavigationConfig;
use folio_core::element::ElementId;
use folio_core::event::PageEvent;
use folio_core::page::ScrollBehavior;

use crate::animation::Tween;
use crate::behavior::{Behavior, Cmd, Context, Slot};
use crate::scheduler::TaskHandle;

/// Class marking the current section's link.
pub const ACTIVE_CLASS: &str = "active";

/// Vertical extent of a section.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SectionBox {
    pub top: f64,
    pub height: f64,
}

impl SectionBox {
    #[must_use]
    pub fn contains(&self, y: f64) -> bool {
        y >= self.top && y < self.top + self.height
    }
}

/// Index of the section containing `focus_y`. Overlaps resolve to the last
/// matching section in document order.
#[must_use]
pub fn active_section(sections: &[SectionBox], focus_y: f64) -> Option<usize> {
    sections.iter().rposition(|s| s.contains(focus_y))
}

#[derive(Debug, Clone, Copy)]
struct ScrollAnimation {
    tween: Tween,
    frame: TaskHandle,
}

#[derive(Debug)]
pub struct NavigationController {
    config: NavigationConfig,
    links: Vec<ElementId>,
    sections: Vec<ElementId>,
    scroll: Option<ScrollAnimation>,
}

impl NavigationController {
    #[must_use]
    pub fn new(config: NavigationConfig) -> Self {
        Self {
            config,
            links: Vec::new(),
            sections: Vec::new(),
            scroll: None,
        }
    }

    #[must_use]
    pub fn links(&self) -> &[ElementId] {
        &self.links
    }

    /// Whether a frame-driven scroll is in flight.
    #[must_use]
    pub fn is_scrolling(&self) -> bool {
        self.scroll.is_some()
    }

    /// Mark the link of the section under the navbar as active.
    pub fn update_active_link(&mut self, cx: &mut Context<'_>) {
        let page = cx.page();
        let focus_y = page.scroll_y() + self.config.focus_offset;
        let boxes: Vec<SectionBox> = self
            .sections
            .iter()
            .map(|&s| SectionBox {
                top: page.offset_top(s),
                height: page.offset_height(s),
            })
            .collect();
        let Some(index) = active_section(&boxes, focus_y) else {
            return;
        };
        let Some(id) = page.attribute(self.sections[index], "id") else {
            return;
        };
        let href = format!("#{id}");
        for &link in &self.links {
            page.remove_class(link, ACTIVE_CLASS);
            if page.attribute(link, "href").as_deref() == Some(href.as_str()) {
                page.add_class(link, ACTIVE_CLASS);
            }
        }
    }

    /// Scroll position that puts `section` just under the navbar.
    fn scroll_target(&self, section: ElementId, cx: &mut Context<'_>) -> f64 {
        let page = cx.page();
        let navbar_height = page
            .query(&self.config.navbar_selector)
            .map_or(self.config.fallback_navbar_height, |nav| {
                page.offset_height(nav)
            });
        page.offset_top(section) - navbar_height
    }

    fn scroll_to(&mut self, top: f64, cx: &mut Context<'_>) {
        if let Some(running) = self.scroll.take() {
            cx.cancel(running.frame);
        }
        if cx.page().supports_smooth_scroll() {
            cx.page().scroll_to(top, ScrollBehavior::Smooth);
            return;
        }
        let from = cx.page().scroll_y();
        let tween = Tween::new(
            from,
            top,
            cx.now(),
            Duration::from_millis(self.config.fallback_scroll_ms),
        );
        tracing::trace!(from, to = top, "frame-driven scroll");
        self.scroll = Some(ScrollAnimation {
            tween,
            frame: cx.request_frame(),
        });
    }

    fn follow_link(&mut self, link: ElementId, cx: &mut Context<'_>) {
        let href = cx.page().attribute(link, "href").unwrap_or_default();
        let section = href
            .strip_prefix('#')
            .filter(|id| !id.is_empty())
            .and_then(|id| cx.page().element_by_id(id));
        match section {
            Some(section) => {
                let top = self.scroll_target(section, cx);
                self.scroll_to(top, cx);
            }
            None => tracing::debug!(%link, %href, "nav link has no target section"),
        }
    }
}

impl Behavior for NavigationController {
    fn slot(&self) -> Slot {
        Slot::Navigation
    }

    fn start(&mut self, cx: &mut Context<'_>) -> Cmd {
        let page = cx.page();
        self.links = page.query_all(&self.config.link_selector);
        self.sections = page.query_all(&self.config.section_selector);
        for &link in &self.links {
            page.listen_click(link);
        }
        self.update_active_link(cx);
        Cmd::None
    }

    fn on_event(&mut self, event: &PageEvent, cx: &mut Context<'_>) -> Cmd {
        match event {
            PageEvent::Click { target } if self.links.contains(target) => {
                self.follow_link(*target, cx);
                Cmd::batch([Cmd::PreventDefault, Cmd::CloseMenu])
            }
            PageEvent::Scroll => {
                self.update_active_link(cx);
                Cmd::None
            }
            _ => Cmd::None,
        }
    }

    fn on_task(&mut self, task: TaskHandle, cx: &mut Context<'_>) -> Cmd {
        let Some(mut running) = self.scroll.take() else {
            return Cmd::None;
        };
        if running.frame != task {
            self.scroll = Some(running);
            return Cmd::None;
        }
        let now = cx.now();
        cx.page()
            .scroll_to(running.tween.value_at(now), ScrollBehavior::Instant);
        if !running.tween.is_done(now) {
            running.frame = cx.request_frame();
            self.scroll = Some(running);
        }
        Cmd::None
    }

    fn stop(&mut self, cx: &mut Context<'_>) {
        for &link in &self.links {
            cx.page().unlisten_click(link);
        }
        self.scroll = None;
        cx.cancel_mine();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::Scheduler;
    use folio_core::headless::{HeadlessPage, ScrollRequest};
    use folio_core::page::Page;
    use pretty_assertions::assert_eq;

    struct Fixture {
        page: HeadlessPage,
        links: Vec<ElementId>,
        sections: Vec<ElementId>,
    }

    fn fixture() -> Fixture {
        let mut page = HeadlessPage::new();
        let body = page.body().unwrap();
        let nav = page.build(body, "nav").class("navbar").layout(0.0, 70.0).done();
        let mut links = Vec::new();
        let mut sections = Vec::new();
        for (i, id) in ["home", "about", "projects"].into_iter().enumerate() {
            links.push(
                page.build(nav, "a")
                    .class("nav-link")
                    .attr("href", &format!("#{id}"))
                    .done(),
            );
            sections.push(
                page.build(body, "section")
                    .id(id)
                    .layout(i as f64 * 500.0, 500.0)
                    .done(),
            );
        }
        Fixture {
            page,
            links,
            sections,
        }
    }

    fn active(page: &HeadlessPage, links: &[ElementId]) -> Vec<bool> {
        links.iter().map(|&l| page.has_class(l, ACTIVE_CLASS)).collect()
    }

    #[test]
    fn last_matching_section_wins() {
        let boxes = [
            SectionBox { top: 0.0, height: 400.0 },
            SectionBox { top: 300.0, height: 400.0 },
        ];
        assert_eq!(active_section(&boxes, 350.0), Some(1));
        assert_eq!(active_section(&boxes, 100.0), Some(0));
        assert_eq!(active_section(&boxes, 700.0), None);
    }

    #[test]
    fn start_highlights_current_section() {
        let Fixture { mut page, links, .. } = fixture();
        let mut s = Scheduler::new();
        let mut nav = NavigationController::new(NavigationConfig::default());
        nav.start(&mut Context::new(&mut page, &mut s, Slot::Navigation));
        assert_eq!(nav.links(), links.as_slice());
        assert_eq!(active(&page, &links), vec![true, false, false]);
        assert!(links.iter().all(|&l| page.is_listening(l)));
    }

    #[test]
    fn scrolling_moves_highlight_and_keeps_it_past_the_end() {
        let Fixture { mut page, links, .. } = fixture();
        let mut s = Scheduler::new();
        let mut nav = NavigationController::new(NavigationConfig::default());
        nav.start(&mut Context::new(&mut page, &mut s, Slot::Navigation));

        page.set_scroll_y(450.0);
        nav.on_event(&PageEvent::Scroll, &mut Context::new(&mut page, &mut s, Slot::Navigation));
        assert_eq!(active(&page, &links), vec![false, true, false]);

        page.set_scroll_y(5000.0);
        nav.on_event(&PageEvent::Scroll, &mut Context::new(&mut page, &mut s, Slot::Navigation));
        assert_eq!(active(&page, &links), vec![false, true, false]);
    }

    #[test]
    fn click_scrolls_under_navbar_and_closes_menu() {
        let Fixture {
            mut page,
            links,
            sections,
        } = fixture();
        let mut s = Scheduler::new();
        let mut nav = NavigationController::new(NavigationConfig::default());
        nav.start(&mut Context::new(&mut page, &mut s, Slot::Navigation));

        let click = page.click(links[2]).unwrap();
        let cmd = nav.on_event(&click, &mut Context::new(&mut page, &mut s, Slot::Navigation));
        assert_eq!(cmd, Cmd::Batch(vec![Cmd::PreventDefault, Cmd::CloseMenu]));
        assert_eq!(
            page.scroll_requests(),
            &[ScrollRequest {
                top: page.offset_top(sections[2]) - 70.0,
                behavior: ScrollBehavior::Smooth,
            }]
        );
    }

    #[test]
    fn dangling_link_still_closes_menu() {
        let mut page = HeadlessPage::new();
        let body = page.body().unwrap();
        let link = page.build(body, "a").class("nav-link").attr("href", "#gone").done();
        let mut s = Scheduler::new();
        let mut nav = NavigationController::new(NavigationConfig::default());
        nav.start(&mut Context::new(&mut page, &mut s, Slot::Navigation));

        let cmd = nav.on_event(
            &PageEvent::Click { target: link },
            &mut Context::new(&mut page, &mut s, Slot::Navigation),
        );
        assert_eq!(cmd, Cmd::Batch(vec![Cmd::PreventDefault, Cmd::CloseMenu]));
        assert!(page.scroll_requests().is_empty());
    }

    #[test]
    fn missing_navbar_uses_fallback_height() {
        let mut page = HeadlessPage::new();
        let body = page.body().unwrap();
        let link = page.build(body, "a").class("nav-link").attr("href", "#x").done();
        page.build(body, "section").id("x").layout(1000.0, 200.0).done();
        let mut s = Scheduler::new();
        let mut nav = NavigationController::new(NavigationConfig::default());
        nav.start(&mut Context::new(&mut page, &mut s, Slot::Navigation));

        nav.on_event(
            &PageEvent::Click { target: link },
            &mut Context::new(&mut page, &mut s, Slot::Navigation),
        );
        assert_eq!(page.scroll_requests()[0].top, 920.0);
    }

    #[test]
    fn fallback_scroll_runs_over_frames() {
        let Fixture { mut page, links, .. } = fixture();
        page.set_smooth_scroll_support(false);
        let mut s = Scheduler::new();
        let mut nav = NavigationController::new(NavigationConfig::default());
        nav.start(&mut Context::new(&mut page, &mut s, Slot::Navigation));

        nav.on_event(
            &PageEvent::Click { target: links[1] },
            &mut Context::new(&mut page, &mut s, Slot::Navigation),
        );
        assert!(nav.is_scrolling());
        assert!(page.scroll_requests().is_empty());

        let mut t = 0;
        while s.has_pending_frames() {
            t += 16;
            s.pop_due(Duration::from_millis(t));
            for due in s.take_frames() {
                nav.on_task(due.handle, &mut Context::new(&mut page, &mut s, Slot::Navigation));
            }
        }
        let requests = page.scroll_requests();
        assert!(requests.len() > 30);
        assert!(requests.iter().all(|r| r.behavior == ScrollBehavior::Instant));
        assert!(requests.windows(2).all(|w| w[0].top <= w[1].top));
        assert_eq!(requests.last().map(|r| r.top), Some(430.0));
        assert!(!nav.is_scrolling());
    }
}
