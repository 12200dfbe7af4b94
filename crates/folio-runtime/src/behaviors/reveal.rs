#![forbid(unsafe_code)]

//! Fade-in of cards and stat tiles as they scroll into view. Children of the
//! grid containers reveal with a per-position delay.

use folio_core::config::RevealConfig;
use folio_core::element::{ElementId, ObserverId};
use folio_core::event::PageEvent;
use folio_core::page::IntersectionOptions;

use crate::behavior::{Behavior, Cmd, Context, Slot};

pub const FADE_IN_CLASS: &str = "fade-in";
pub const VISIBLE_CLASS: &str = "visible";

#[derive(Debug)]
pub struct RevealController {
    config: RevealConfig,
    observer: Option<ObserverId>,
    targets: Vec<ElementId>,
}

impl RevealController {
    #[must_use]
    pub fn new(config: RevealConfig) -> Self {
        Self {
            config,
            observer: None,
            targets: Vec::new(),
        }
    }

    #[must_use]
    pub fn targets(&self) -> &[ElementId] {
        &self.targets
    }

    fn reveal(&self, el: ElementId, cx: &mut Context<'_>) {
        let page = cx.page();
        page.add_class(el, VISIBLE_CLASS);

        let Some(parent) = page.parent(el) else {
            return;
        };
        if !self
            .config
            .grid_classes
            .iter()
            .any(|class| page.has_class(parent, class))
        {
            return;
        }
        let Some(index) = page.children(parent).iter().position(|&c| c == el) else {
            return;
        };
        let delay = index as u64 * self.config.stagger_ms;
        page.set_style(el, "transition-delay", &format!("{delay}ms"));
    }
}

impl Behavior for RevealController {
    fn slot(&self) -> Slot {
        Slot::Reveal
    }

    fn start(&mut self, cx: &mut Context<'_>) -> Cmd {
        let page = cx.page();
        self.targets = page.query_all(&self.config.selector);
        let observer = page.create_observer(
            IntersectionOptions::new(self.config.threshold)
                .with_root_margin(self.config.root_margin.clone()),
        );
        for &el in &self.targets {
            if !page.has_class(el, FADE_IN_CLASS) {
                page.add_class(el, FADE_IN_CLASS);
            }
            page.observe(observer, el);
        }
        self.observer = Some(observer);
        tracing::debug!(targets = self.targets.len(), "reveal observer armed");
        Cmd::None
    }

    fn on_event(&mut self, event: &PageEvent, cx: &mut Context<'_>) -> Cmd {
        if let PageEvent::Intersection { observer, entries } = event
            && Some(*observer) == self.observer
        {
            for entry in entries.iter().filter(|e| e.is_intersecting) {
                self.reveal(entry.target, cx);
            }
        }
        Cmd::None
    }

    fn stop(&mut self, cx: &mut Context<'_>) {
        if let Some(observer) = self.observer.take() {
            cx.page().disconnect(observer);
        }
    }
}
