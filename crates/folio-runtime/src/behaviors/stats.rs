#![forbid(unsafe_code)]

//! Stat headings ("250+", "12 yrs") count up from zero the first time they
//! scroll into view, keeping their non-digit characters as a suffix.

use std::collections::{HashMap, HashSet};

use folio_core::config::StatsConfig;
use folio_core::element::{ElementId, ObserverId};
use folio_core::event::PageEvent;
use folio_core::page::IntersectionOptions;

use crate::behavior::{Behavior, Cmd, Context, Slot};
use crate::scheduler::TaskHandle;

/// Split a stat label into its number (every digit, concatenated) and its
/// suffix (every other character, in order).
///
/// Returns `None` without digits, or when the digits overflow `u64`.
#[must_use]
pub fn parse_stat(text: &str) -> Option<(u64, String)> {
    let (digits, suffix): (String, String) = text.chars().partition(char::is_ascii_digit);
    let target = digits.parse().ok()?;
    Some((target, suffix))
}

/// Value shown at `step` of `steps`: `floor(target * step / steps)`, and
/// exactly `target` from the last step on.
#[must_use]
pub fn count_at(target: u64, step: u32, steps: u32) -> u64 {
    let steps = steps.max(1);
    if step >= steps {
        return target;
    }
    (u128::from(target) * u128::from(step) / u128::from(steps)) as u64
}

#[derive(Debug)]
struct Counter {
    el: ElementId,
    target: u64,
    suffix: String,
    step: u32,
}

#[derive(Debug)]
pub struct StatsCounter {
    config: StatsConfig,
    observer: Option<ObserverId>,
    seen: HashSet<ElementId>,
    running: HashMap<TaskHandle, Counter>,
}

impl StatsCounter {
    #[must_use]
    pub fn new(config: StatsConfig) -> Self {
        Self {
            config,
            observer: None,
            seen: HashSet::new(),
            running: HashMap::new(),
        }
    }

    #[must_use]
    pub fn has_seen(&self, el: ElementId) -> bool {
        self.seen.contains(&el)
    }

    #[must_use]
    pub fn counting(&self) -> usize {
        self.running.len()
    }

    fn begin(&mut self, el: ElementId, cx: &mut Context<'_>) {
        if !self.seen.insert(el) {
            return;
        }
        let text = cx.page().text(el);
        let Some((target, suffix)) = parse_stat(&text) else {
            tracing::debug!(%el, %text, "stat has no number to count");
            return;
        };
        let interval = cx.set_interval(self.config.step_interval());
        self.running.insert(
            interval,
            Counter {
                el,
                target,
                suffix,
                step: 0,
            },
        );
    }
}

impl Behavior for StatsCounter {
    fn slot(&self) -> Slot {
        Slot::Stats
    }

    fn start(&mut self, cx: &mut Context<'_>) -> Cmd {
        let page = cx.page();
        let observer = page.create_observer(IntersectionOptions::new(self.config.threshold));
        for el in page.query_all(&self.config.selector) {
            page.observe(observer, el);
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
        let Some(counter) = self.running.get_mut(&task) else {
            return Cmd::None;
        };
        counter.step += 1;
        let value = count_at(counter.target, counter.step, self.config.steps);
        let shown = format!("{value}{}", counter.suffix);
        cx.page().set_text(counter.el, &shown);
        if counter.step >= self.config.steps {
            self.running.remove(&task);
            cx.cancel(task);
        }
        Cmd::None
    }

    fn stop(&mut self, cx: &mut Context<'_>) {
        if let Some(observer) = self.observer.take() {
            cx.page().disconnect(observer);
        }
        for (_, counter) in self.running.drain() {
            let shown = format!("{}{}", counter.target, counter.suffix);
            cx.page().set_text(counter.el, &shown);
        }
        cx.cancel_mine();
    }
}
