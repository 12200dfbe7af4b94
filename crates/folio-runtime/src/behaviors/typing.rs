#![forbid(unsafe_code)]

//! Typed headline: types each string one character at a time, holds it,
//! deletes it, and moves on to the next string in a cycle.

use core::time::Duration;

use folio_core::config::TypingConfig;
use folio_core::element::ElementId;

use crate::behavior::{Behavior, Cmd, Context, Slot};
use crate::scheduler::TaskHandle;

/// Markup appended after the visible text.
pub const CURSOR_HTML: &str = r#"<span class="typing-cursor">|</span>"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Typing,
    Deleting,
}

/// Which pause follows a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pause {
    Type,
    Delete,
    /// The string is complete; hold before deleting.
    Hold,
    /// The string is gone; pause before typing the next one.
    Restart,
}

/// Pure typing state over a cyclic list of strings.
///
/// # Invariants
///
/// 1. `offset` stays within `[0, char_len(current)]`.
/// 2. After a delete reaches 0, `index` becomes `(index + 1) % len`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypingState {
    texts: Vec<Vec<char>>,
    index: usize,
    offset: usize,
    phase: Phase,
}

impl TypingState {
    /// `None` when there is nothing to type.
    #[must_use]
    pub fn new<S: AsRef<str>>(texts: &[S]) -> Option<Self> {
        if texts.is_empty() {
            return None;
        }
        Some(Self {
            texts: texts.iter().map(|t| t.as_ref().chars().collect()).collect(),
            index: 0,
            offset: 0,
            phase: Phase::Typing,
        })
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Length in chars of the current string.
    #[must_use]
    pub fn current_len(&self) -> usize {
        self.texts[self.index].len()
    }

    /// The current string truncated to the offset.
    #[must_use]
    pub fn visible(&self) -> String {
        self.texts[self.index][..self.offset].iter().collect()
    }

    /// Advance one character and report the pause before the next tick.
    pub fn tick(&mut self) -> Pause {
        let len = self.current_len();
        match self.phase {
            Phase::Typing => {
                self.offset = (self.offset + 1).min(len);
                if self.offset == len {
                    self.phase = Phase::Deleting;
                    Pause::Hold
                } else {
                    Pause::Type
                }
            }
            Phase::Deleting => {
                self.offset = self.offset.saturating_sub(1);
                if self.offset == 0 {
                    self.phase = Phase::Typing;
                    self.index = (self.index + 1) % self.texts.len();
                    Pause::Restart
                } else {
                    Pause::Delete
                }
            }
        }
    }
}

/// Escape text for use inside element markup.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Drives a [`TypingState`] on one element.
#[derive(Debug)]
pub struct TypingAnimator {
    config: TypingConfig,
    element: Option<ElementId>,
    state: Option<TypingState>,
    tick: Option<TaskHandle>,
}

impl TypingAnimator {
    #[must_use]
    pub fn new(config: TypingConfig) -> Self {
        let state = TypingState::new(config.texts.as_slice());
        Self {
            config,
            element: None,
            state,
            tick: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> Option<&TypingState> {
        self.state.as_ref()
    }

    /// Whether a tick is scheduled.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.tick.is_some()
    }

    fn pause(&self, pause: Pause) -> Duration {
        let ms = match pause {
            Pause::Type => self.config.type_speed_ms,
            Pause::Delete => self.config.delete_speed_ms,
            Pause::Hold => self.config.delay_between_ms,
            Pause::Restart => self.config.restart_pause_ms,
        };
        Duration::from_millis(ms)
    }

    fn render(&self, cx: &mut Context<'_>) {
        let (Some(el), Some(state)) = (self.element, self.state.as_ref()) else {
            return;
        };
        let html = format!("{}{CURSOR_HTML}", escape_html(&state.visible()));
        cx.page().set_inner_html(el, &html);
    }
}

impl Behavior for TypingAnimator {
    fn slot(&self) -> Slot {
        Slot::Typing
    }

    fn start(&mut self, cx: &mut Context<'_>) -> Cmd {
        self.element = cx.page().element_by_id(&self.config.element_id);
        let Some(el) = self.element else {
            tracing::debug!(id = %self.config.element_id, "typing element not found");
            return Cmd::None;
        };
        if self.state.is_none() {
            tracing::debug!("no typing texts configured");
            return Cmd::None;
        }
        cx.page().set_inner_html(el, CURSOR_HTML);
        self.tick = Some(cx.set_timeout(Duration::from_millis(self.config.start_delay_ms)));
        Cmd::None
    }

    fn on_task(&mut self, task: TaskHandle, cx: &mut Context<'_>) -> Cmd {
        if self.tick != Some(task) {
            return Cmd::None;
        }
        self.tick = None;
        let Some(state) = self.state.as_mut() else {
            return Cmd::None;
        };
        let pause = state.tick();
        self.render(cx);
        let delay = self.pause(pause);
        self.tick = Some(cx.set_timeout(delay));
        Cmd::None
    }

    fn stop(&mut self, cx: &mut Context<'_>) {
        if let Some(tick) = self.tick.take() {
            cx.cancel(tick);
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

    #[test]
    fn state_cycles_through_texts() {
        let mut state = TypingState::new(&["A", "BB"]).unwrap();
        let mut shown = Vec::new();
        let mut pauses = Vec::new();
        for _ in 0..7 {
            pauses.push(state.tick());
            shown.push(state.visible());
        }
        assert_eq!(shown, vec!["A", "", "B", "BB", "B", "", "A"]);
        assert_eq!(
            pauses,
            vec![
                Pause::Hold,
                Pause::Restart,
                Pause::Type,
                Pause::Hold,
                Pause::Delete,
                Pause::Restart,
                Pause::Hold,
            ]
        );
    }

    #[test]
    fn empty_string_still_advances() {
        let mut state = TypingState::new(&["", "x"]).unwrap();
        assert_eq!(state.tick(), Pause::Hold);
        assert_eq!(state.tick(), Pause::Restart);
        assert_eq!(state.index(), 1);
        assert!(TypingState::new::<&str>(&[]).is_none());
    }

    #[test]
    fn offsets_count_chars() {
        let mut state = TypingState::new(&["héllo"]).unwrap();
        state.tick();
        state.tick();
        assert_eq!(state.visible(), "hé");
        assert_eq!(state.current_len(), 5);
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape_html("<b>&\"'"), "&lt;b&gt;&amp;&quot;&#39;");
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn start_shows_cursor_then_types_after_delay() {
        let mut page = HeadlessPage::new();
        let body = page.body().unwrap();
        let el = page.build(body, "span").id("typingText").done();
        let mut s = Scheduler::new();
        let cfg = TypingConfig::default().with_texts(["Hi"]);
        let mut anim = TypingAnimator::new(cfg);

        anim.start(&mut Context::new(&mut page, &mut s, Slot::Typing));
        assert_eq!(page.inner_html(el), Some(CURSOR_HTML));
        assert_eq!(s.next_deadline(), Some(Duration::from_millis(1000)));

        let due = s.pop_due(Duration::from_millis(1000)).unwrap();
        anim.on_task(due.handle, &mut Context::new(&mut page, &mut s, Slot::Typing));
        assert_eq!(
            page.inner_html(el),
            Some(r#"H<span class="typing-cursor">|</span>"#)
        );
        assert_eq!(s.next_deadline(), Some(Duration::from_millis(1100)));
    }

    #[test]
    fn stop_cancels_pending_tick() {
        let mut page = HeadlessPage::new();
        let body = page.body().unwrap();
        page.build(body, "span").id("typingText").done();
        let mut s = Scheduler::new();
        let mut anim = TypingAnimator::new(TypingConfig::portfolio());
        anim.start(&mut Context::new(&mut page, &mut s, Slot::Typing));
        assert!(anim.is_running());

        anim.stop(&mut Context::new(&mut page, &mut s, Slot::Typing));
        assert!(!anim.is_running());
        assert_eq!(s.pending(), 0);
    }

    #[test]
    fn missing_element_is_inert() {
        let mut page = HeadlessPage::new();
        let mut s = Scheduler::new();
        let mut anim = TypingAnimator::new(TypingConfig::portfolio());
        anim.start(&mut Context::new(&mut page, &mut s, Slot::Typing));
        assert_eq!(s.pending(), 0);
    }
}
