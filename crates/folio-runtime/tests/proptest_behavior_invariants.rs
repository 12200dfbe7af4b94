//! Property-based invariant tests for the page controllers.
//!
//! 1. Theme parity: after `n` toggles the theme is dark iff `n` is odd, and
//!    the root attribute agrees.
//! 2. Typing offsets stay within the current string; a finished delete moves
//!    to the next string cyclically.
//! 3. Navigation: with disjoint sections exactly the containing section's
//!    link is active; with overlaps the last match wins.
//! 4. Stat labels split into number and suffix; counts are non-decreasing,
//!    bounded by the target, and end on it.
//! 5. Skill bar widths are non-decreasing and end on the target.
//! 6. The scheduler fires timers in due order and never fires cancelled ones.

use core::time::Duration;

use folio_core::config::{NavigationConfig, SiteConfig};
use folio_core::event::{KeyCode, KeyEvent, Modifiers, PageEvent};
use folio_core::headless::HeadlessPage;
use folio_core::page::Page;
use folio_runtime::animation::StepRamp;
use folio_runtime::app::App;
use folio_runtime::behaviors::navigation::{SectionBox, active_section};
use folio_runtime::behaviors::stats::{count_at, parse_stat};
use folio_runtime::behaviors::theme::THEME_ATTRIBUTE;
use folio_runtime::behaviors::typing::{Pause, TypingState};
use folio_runtime::behaviors::NavigationController;
use folio_runtime::{Behavior, Context, Scheduler, Slot, Theme};
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────────

fn texts_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-zé ]{0,6}", 1..5)
}

fn heights_strategy() -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec(1u32..800, 1..8)
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Theme parity
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn theme_parity(toggles in 0usize..40) {
        let mut app = App::new(HeadlessPage::new(), SiteConfig::default());
        app.boot();
        let shortcut = PageEvent::Key(
            KeyEvent::new(KeyCode::Char('T')).with_modifiers(Modifiers::META | Modifiers::SHIFT),
        );
        for _ in 0..toggles {
            app.handle_event(&shortcut);
        }
        let expected = if toggles % 2 == 1 { Theme::Dark } else { Theme::Light };
        prop_assert_eq!(app.theme(), expected);
        let root = app.page().root();
        prop_assert_eq!(
            app.page().attribute(root, THEME_ATTRIBUTE),
            Some(expected.as_str().to_owned())
        );
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Typing offsets
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn typing_offset_bounded_and_index_cycles(texts in texts_strategy(), ticks in 0usize..300) {
        let mut state = TypingState::new(texts.as_slice()).unwrap();
        for _ in 0..ticks {
            let before = state.index();
            let pause = state.tick();
            prop_assert!(state.offset() <= state.current_len());
            if pause == Pause::Restart {
                prop_assert_eq!(state.index(), (before + 1) % texts.len());
                prop_assert_eq!(state.offset(), 0);
            } else {
                prop_assert_eq!(state.index(), before);
            }
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Navigation highlight
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn disjoint_sections_highlight_exactly_one(
        heights in heights_strategy(),
        pick in any::<prop::sample::Index>(),
        offset in any::<u32>(),
    ) {
        let mut page = HeadlessPage::new();
        let body = page.body().unwrap();
        let mut links = Vec::new();
        let mut tops = Vec::new();
        let mut top = 0.0;
        for (i, &h) in heights.iter().enumerate() {
            let id = format!("s{i}");
            links.push(page.build(body, "a").class("nav-link").attr("href", &format!("#{id}")).done());
            page.build(body, "section").id(&id).layout(top, f64::from(h)).done();
            tops.push(top);
            top += f64::from(h);
        }
        let k = pick.index(heights.len());
        let focus_y = tops[k] + f64::from(offset % heights[k]);
        page.set_scroll_y(focus_y - 100.0);

        let mut s = Scheduler::new();
        let mut nav = NavigationController::new(NavigationConfig::default());
        nav.start(&mut Context::new(&mut page, &mut s, Slot::Navigation));

        let active: Vec<usize> = links
            .iter()
            .enumerate()
            .filter(|&(_, &l)| page.has_class(l, "active"))
            .map(|(i, _)| i)
            .collect();
        prop_assert_eq!(active, vec![k]);
    }

    #[test]
    fn overlapping_sections_last_match_wins(
        boxes in prop::collection::vec((0.0f64..2000.0, 1.0f64..800.0), 1..10),
        focus_y in 0.0f64..3000.0,
    ) {
        let sections: Vec<SectionBox> = boxes
            .iter()
            .map(|&(top, height)| SectionBox { top, height })
            .collect();
        let expected = sections
            .iter()
            .enumerate()
            .filter(|(_, s)| focus_y >= s.top && focus_y < s.top + s.height)
            .map(|(i, _)| i)
            .max();
        prop_assert_eq!(active_section(&sections, focus_y), expected);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Stat counters
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn stat_label_splits_into_number_and_suffix(n in any::<u64>(), suffix in "[^0-9]{0,4}") {
        let label = format!("{n}{suffix}");
        prop_assert_eq!(parse_stat(&label), Some((n, suffix)));
    }

    #[test]
    fn counts_are_monotone_and_land_on_target(target in any::<u64>(), steps in 1u32..200) {
        let mut last = 0;
        for k in 0..=steps {
            let v = count_at(target, k, steps);
            prop_assert!(v >= last);
            prop_assert!(v <= target);
            last = v;
        }
        prop_assert_eq!(last, target);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Skill bar widths
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn skill_ramp_is_monotone(target in 0.0f64..=100.0, frames in 1u32..240) {
        let mut ramp = StepRamp::new(target, frames);
        let mut last = ramp.value();
        let mut steps = 0;
        while !ramp.is_done() {
            let v = ramp.advance();
            prop_assert!(v >= last, "width went back from {} to {}", last, v);
            prop_assert!(v <= target);
            last = v;
            steps += 1;
        }
        prop_assert_eq!(steps, frames);
        prop_assert_eq!(last, target);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 6. Scheduler ordering
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn timers_fire_in_due_order_and_cancelled_never_fire(
        delays in prop::collection::vec((1u64..500, any::<bool>()), 1..30),
    ) {
        let mut s = Scheduler::new();
        let mut kept = Vec::new();
        for &(delay, cancel) in &delays {
            let h = s.set_timeout(Slot::Typing, Duration::from_millis(delay));
            if cancel {
                s.cancel(h);
            } else {
                kept.push((delay, h));
            }
        }
        kept.sort();

        let mut fired = Vec::new();
        while let Some(due) = s.pop_due(Duration::from_millis(1000)) {
            fired.push((s.now().as_millis() as u64, due.handle));
        }
        prop_assert_eq!(fired, kept);
        prop_assert_eq!(s.pending(), 0);
    }
}
