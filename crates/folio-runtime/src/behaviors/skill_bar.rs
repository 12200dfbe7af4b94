#![forbid(unsafe_code)]

//! Skill bars fill from 0 to their `data-progress` width the first time they
//! scroll into view, one step per animation frame, then label the skill name
//! with the percentage.

use std::collections::{HashMap, HashSet};

use folio_core::config::SkillBarConfig;
use folio_core::element::{ElementId, ObserverId};
use folio_core::event::PageEvent;
use folio_core::page::{IntersectionOptions, Page};

use crate::animation::StepRamp;
use crate::behavior::{Behavior, Cmd, Context, Slot};
use crate::scheduler::TaskHandle;

pub const PROGRESS_ATTRIBUTE: &str = "data-progress";
pub const LABEL_CLASS: &str = "percentage";

/// Parse a `data-progress` value into a width in `[0, 100]`.
#[must_use]
pub fn parse_progress(raw: &str) -> Option<f64> {
    let value: f64 = raw.trim().parse().ok()?;
    value.is_finite().then(|| value.clamp(0.0, 100.0))
}

#[derive(Debug)]
struct BarAnimation {
    bar: ElementId,
    ramp: StepRamp,
    label: String,
}

#[derive(Debug)]
pub struct SkillBarAnimator {
    config: SkillBarConfig,
    observer: Option<ObserverId>,
    seen: HashSet<ElementId>,
    running: HashMap<TaskHandle, BarAnimation>,
}

impl SkillBarAnimator {
    #[must_use]
    pub fn new(config: SkillBarConfig) -> Self {
        Self {
            config,
            observer: None,
            seen: HashSet::new(),
            running: HashMap::new(),
        }
    }

    /// Whether `bar` has already been animated (or skipped).
    #[must_use]
    pub fn has_seen(&self, bar: ElementId) -> bool {
        self.seen.contains(&bar)
    }

    #[must_use]
    pub fn animating(&self) -> usize {
        self.running.len()
    }

    fn begin(&mut self, bar: ElementId, cx: &mut Context<'_>) {
        if !self.seen.insert(bar) {
            return;
        }
        let raw = cx.page().attribute(bar, PROGRESS_ATTRIBUTE);
        let Some(target) = raw.as_deref().and_then(parse_progress) else {
            tracing::warn!(%bar, progress = ?raw, "skill bar has no usable data-progress");
            return;
        };
        let label = format!("{}%", raw.as_deref().unwrap_or_default().trim());
        let anim = BarAnimation {
            bar,
            ramp: StepRamp::new(target, self.config.frames),
            label,
        };
        self.step(anim, cx);
    }

    fn step(&mut self, mut anim: BarAnimation, cx: &mut Context<'_>) {
        let width = anim.ramp.advance();
        cx.page().set_style(anim.bar, "width", &format!("{width}%"));
        if anim.ramp.is_done() {
            append_label(cx.page(), anim.bar, &anim.label);
        } else {
            let frame = cx.request_frame();
            self.running.insert(frame, anim);
        }
    }
}

/// Append the percentage label to the skill name, once.
fn append_label(page: &mut dyn Page, bar: ElementId, label: &str) {
    let Some(name) = page.parent(bar).and_then(|p| page.previous_sibling(p)) else {
        return;
    };
    if page.query_within(name, &format!(".{LABEL_CLASS}")).is_some() {
        return;
    }
    let Ok(span) = page.create_element("span") else {
        return;
    };
    page.set_class_name(span, LABEL_CLASS);
    page.set_text(span, label);
    page.set_style(span, "color", "var(--color-primary)");
    page.set_style(span, "font-weight", "var(--font-weight-semibold)");
    page.append_child(name, span);
}

impl Behavior for SkillBarAnimator {
    fn slot(&self) -> Slot {
        Slot::SkillBars
    }

    fn start(&mut self, cx: &mut Context<'_>) -> Cmd {
        let page = cx.page();
        let bars = page.query_all(&self.config.selector);
        let observer = page.create_observer(
            IntersectionOptions::new(self.config.threshold)
                .with_root_margin(self.config.root_margin.clone()),
        );
        for bar in bars {
            page.observe(observer, bar);
        }
        self.observer = Some(observer);
        Cmd::None
    }

    fn on_event(&mut self, event: &PageEvent, cx: &mut Context<'_>) -> Cmd {
        if let PageEvent::Intersection { observer, entries } = event
            && Some(*observer) == self.observer
        {
            for entry in entries.iter().filter(|e| e.is_intersecting) {
                self.begin(entry.target, cx);
            }
        }
        Cmd::None
    }

    fn on_task(&mut self, task: TaskHandle, cx: &mut Context<'_>) -> Cmd {
        if let Some(anim) = self.running.remove(&task) {
            self.step(anim, cx);
        }
        Cmd::None
    }

    fn stop(&mut self, cx: &mut Context<'_>) {
        if let Some(observer) = self.observer.take() {
            cx.page().disconnect(observer);
        }
        for (_, anim) in self.running.drain() {
            let page = cx.page();
            page.set_style(anim.bar, "width", &format!("{}%", anim.ramp.target()));
            append_label(page, anim.bar, &anim.label);
        }
        cx.cancel_mine();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::Scheduler;
    use folio_core::headless::HeadlessPage;
    use pretty_assertions::assert_eq;

    fn skill(page: &mut HeadlessPage, progress: &str) -> (ElementId, ElementId) {
        let body = page.body().unwrap();
        let item = page.build(body, "div").class("skill-item").done();
        let name = page.build(item, "div").class("skill-name").text("Rust").done();
        let track = page.build(item, "div").class("skill-bar").done();
        let bar = page
            .build(track, "div")
            .class("skill-progress")
            .attr(PROGRESS_ATTRIBUTE, progress)
            .done();
        (name, bar)
    }

    fn run_frames(bars: &mut SkillBarAnimator, page: &mut HeadlessPage, s: &mut Scheduler) -> usize {
        let mut frames = 0;
        while s.has_pending_frames() {
            frames += 1;
            for due in s.take_frames() {
                bars.on_task(due.handle, &mut Context::new(page, s, Slot::SkillBars));
            }
        }
        frames
    }

    #[test]
    fn parses_and_clamps_progress() {
        assert_eq!(parse_progress("85"), Some(85.0));
        assert_eq!(parse_progress(" 42.5 "), Some(42.5));
        assert_eq!(parse_progress("140"), Some(100.0));
        assert_eq!(parse_progress("-3"), Some(0.0));
        assert_eq!(parse_progress("lots"), None);
        assert_eq!(parse_progress("NaN"), None);
    }

    #[test]
    fn fills_over_frames_and_labels_once() {
        let mut page = HeadlessPage::new();
        let (name, bar) = skill(&mut page, "90");
        let mut s = Scheduler::new();
        let mut bars = SkillBarAnimator::new(SkillBarConfig::default());
        bars.start(&mut Context::new(&mut page, &mut s, Slot::SkillBars));

        for event in page.reveal(bar) {
            bars.on_event(&event, &mut Context::new(&mut page, &mut s, Slot::SkillBars));
        }
        assert_eq!(page.style(bar, "width"), Some("1.5%"));
        assert_eq!(run_frames(&mut bars, &mut page, &mut s), 59);
        assert_eq!(page.style(bar, "width"), Some("90%"));

        let labels = page.children(name);
        assert_eq!(labels.len(), 1);
        assert_eq!(page.text(labels[0]), "90%");
        assert_eq!(page.style(labels[0], "color"), Some("var(--color-primary)"));

        // Seen bars never animate again.
        for event in page.reveal(bar) {
            bars.on_event(&event, &mut Context::new(&mut page, &mut s, Slot::SkillBars));
        }
        assert_eq!(bars.animating(), 0);
        assert!(!s.has_pending_frames());
    }

    #[test]
    #[tracing_test::traced_test]
    fn invalid_progress_is_skipped() {
        let mut page = HeadlessPage::new();
        let (name, bar) = skill(&mut page, "high");
        let mut s = Scheduler::new();
        let mut bars = SkillBarAnimator::new(SkillBarConfig::default());
        bars.start(&mut Context::new(&mut page, &mut s, Slot::SkillBars));

        for event in page.reveal(bar) {
            bars.on_event(&event, &mut Context::new(&mut page, &mut s, Slot::SkillBars));
        }
        assert!(bars.has_seen(bar));
        assert_eq!(page.style(bar, "width"), None);
        assert!(page.children(name).is_empty());
        assert!(logs_contain("no usable data-progress"));
    }

    #[test]
    fn stop_snaps_running_bars_to_target() {
        let mut page = HeadlessPage::new();
        let (name, bar) = skill(&mut page, "50");
        let mut s = Scheduler::new();
        let mut bars = SkillBarAnimator::new(SkillBarConfig::default());
        bars.start(&mut Context::new(&mut page, &mut s, Slot::SkillBars));
        for event in page.reveal(bar) {
            bars.on_event(&event, &mut Context::new(&mut page, &mut s, Slot::SkillBars));
        }
        assert_eq!(bars.animating(), 1);
        assert_ne!(page.style(bar, "width"), Some("50%"));

        bars.stop(&mut Context::new(&mut page, &mut s, Slot::SkillBars));
        assert_eq!(s.pending(), 0);
        assert_eq!(bars.animating(), 0);
        assert!(!page.observers()[0].connected);
        assert_eq!(page.style(bar, "width"), Some("50%"));
        let label = page.children(name)[0];
        assert_eq!(page.text(label), "50%");
    }
}
