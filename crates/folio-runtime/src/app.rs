#![forbid(unsafe_code)]

//! The orchestrator.
//!
//! [`App`] owns the page, the scheduler and every controller. The host feeds
//! it page events and moves time forward; nothing runs on its own:
//!
//! 1. [`App::boot`] initializes now, or once [`PageEvent::Ready`] arrives if
//!    the document is still loading.
//! 2. [`App::handle_event`] routes an event and reports whether the host
//!    should cancel the browser default.
//! 3. [`App::advance`] / [`App::set_time`] fire due timers; [`App::frame`]
//!    runs animation-frame callbacks.
//! 4. [`App::shutdown`] stops every controller and drops all pending work.
//!
//! # Example
//!
//! ```
//! use core::time::Duration;
//! use folio_core::config::SiteConfig;
//! use folio_core::headless::HeadlessPage;
//! use folio_runtime::app::App;
//!
//! let mut app = App::new(HeadlessPage::new(), SiteConfig::default());
//! app.boot();
//! assert!(app.is_running());
//! app.advance(Duration::from_millis(16));
//! app.shutdown();
//! assert_eq!(app.pending_tasks(), 0);
//! ```

use core::time::Duration;

use folio_core::config::SiteConfig;
use folio_core::event::{EventOutcome, KeyCode, KeyEvent, PageEvent};
use folio_core::page::Page;

use crate::behavior::{Behavior, Cmd, Context, Slot};
use crate::behaviors::{
    MobileMenuController, NavigationController, RevealController, SkillBarAnimator, StatsCounter,
    Theme, ThemeController, TypingAnimator, TypingState,
};
use crate::scheduler::{DueTask, Scheduler};

/// Body class added once the page has fully loaded.
pub const LOADED_CLASS: &str = "loaded";

/// Controller start order. Typing starts last.
const START_ORDER: [Slot; 7] = [
    Slot::Theme,
    Slot::Navigation,
    Slot::SkillBars,
    Slot::Reveal,
    Slot::MobileMenu,
    Slot::Stats,
    Slot::Typing,
];

/// Lifecycle of an [`App`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Created; [`App::boot`] not called yet.
    #[default]
    Idle,
    /// Booted while the document was loading.
    Waiting,
    Running,
    Stopped,
}

#[derive(Debug)]
struct Controllers {
    theme: ThemeController,
    navigation: NavigationController,
    skill_bars: SkillBarAnimator,
    reveal: RevealController,
    mobile_menu: MobileMenuController,
    stats: StatsCounter,
    typing: TypingAnimator,
}

impl Controllers {
    fn new(config: &SiteConfig) -> Self {
        Self {
            theme: ThemeController::new(config.theme.clone()),
            navigation: NavigationController::new(config.navigation.clone()),
            skill_bars: SkillBarAnimator::new(config.skill_bars.clone()),
            reveal: RevealController::new(config.reveal.clone()),
            mobile_menu: MobileMenuController::new(config.mobile_menu.clone()),
            stats: StatsCounter::new(config.stats.clone()),
            typing: TypingAnimator::new(config.typing.clone()),
        }
    }

    fn get_mut(&mut self, slot: Slot) -> &mut dyn Behavior {
        match slot {
            Slot::Theme => &mut self.theme,
            Slot::Navigation => &mut self.navigation,
            Slot::SkillBars => &mut self.skill_bars,
            Slot::Reveal => &mut self.reveal,
            Slot::MobileMenu => &mut self.mobile_menu,
            Slot::Stats => &mut self.stats,
            Slot::Typing => &mut self.typing,
        }
    }
}

/// Runs a [`Cmd`] against the controllers. Returns whether the current event
/// should have its default action suppressed.
fn execute(
    cmd: Cmd,
    page: &mut dyn Page,
    scheduler: &mut Scheduler,
    controllers: &mut Controllers,
) -> bool {
    match cmd {
        Cmd::None => false,
        Cmd::PreventDefault => true,
        Cmd::CloseMenu => {
            let mut cx = Context::new(page, scheduler, Slot::MobileMenu);
            controllers.mobile_menu.close(&mut cx);
            false
        }
        Cmd::ToggleTheme => {
            let mut cx = Context::new(page, scheduler, Slot::Theme);
            controllers.theme.toggle_theme(&mut cx);
            false
        }
        Cmd::Batch(cmds) => cmds.into_iter().fold(false, |prevent, cmd| {
            execute(cmd, page, scheduler, controllers) || prevent
        }),
    }
}

/// Whether `key` is the theme shortcut: Ctrl/Cmd + Shift + T.
#[must_use]
pub fn is_theme_shortcut(key: &KeyEvent) -> bool {
    key.platform_modifier() && key.shift() && key.is_char('T')
}

/// Page behavior orchestrator over any [`Page`].
#[derive(Debug)]
pub struct App<P: Page> {
    page: P,
    scheduler: Scheduler,
    config: SiteConfig,
    controllers: Controllers,
    phase: Phase,
    loaded: bool,
}

impl<P: Page> App<P> {
    #[must_use]
    pub fn new(page: P, config: SiteConfig) -> Self {
        let controllers = Controllers::new(&config);
        Self {
            page,
            scheduler: Scheduler::new(),
            config,
            controllers,
            phase: Phase::Idle,
            loaded: false,
        }
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    #[must_use]
    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    #[must_use]
    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn page_mut(&mut self) -> &mut P {
        &mut self.page
    }

    /// Current theme.
    #[must_use]
    pub fn theme(&self) -> Theme {
        self.controllers.theme.theme()
    }

    /// State of the typed headline, if it has texts.
    #[must_use]
    pub fn typing(&self) -> Option<&TypingState> {
        self.controllers.typing.state()
    }

    #[must_use]
    pub fn now(&self) -> Duration {
        self.scheduler.now()
    }

    #[must_use]
    pub fn pending_tasks(&self) -> usize {
        self.scheduler.pending()
    }

    /// When the host should next call [`App::set_time`].
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.scheduler.next_deadline()
    }

    /// Whether the host should schedule an animation frame.
    #[must_use]
    pub fn has_pending_frames(&self) -> bool {
        self.scheduler.has_pending_frames()
    }

    /// Start the page behaviors, or arm them for [`PageEvent::Ready`] when the
    /// document is still loading. Only the first call has an effect.
    pub fn boot(&mut self) {
        if self.phase != Phase::Idle {
            return;
        }
        if self.page.ready_state().is_parsed() {
            self.init();
        } else {
            tracing::debug!("document still loading, waiting for ready");
            self.phase = Phase::Waiting;
        }
    }

    fn init(&mut self) {
        tracing::info!("Initializing portfolio...");
        for slot in START_ORDER {
            let cmd = {
                let mut cx = Context::new(&mut self.page, &mut self.scheduler, slot);
                self.controllers.get_mut(slot).start(&mut cx)
            };
            self.run(cmd);
            tracing::trace!(%slot, "controller started");
        }
        self.phase = Phase::Running;
        tracing::info!("Portfolio initialized successfully");
    }

    fn run(&mut self, cmd: Cmd) -> bool {
        execute(
            cmd,
            &mut self.page,
            &mut self.scheduler,
            &mut self.controllers,
        )
    }

    /// Route one page event.
    pub fn handle_event(&mut self, event: &PageEvent) -> EventOutcome {
        if self.phase == Phase::Stopped {
            return EventOutcome::PASS;
        }
        match event {
            PageEvent::Ready => {
                if self.phase == Phase::Waiting {
                    self.init();
                }
                EventOutcome::PASS
            }
            PageEvent::Loaded => {
                self.mark_loaded();
                EventOutcome::PASS
            }
            PageEvent::VisibilityChange { hidden } => {
                self.set_animations_paused(*hidden);
                EventOutcome::PASS
            }
            _ if self.phase != Phase::Running => EventOutcome::PASS,
            PageEvent::Key(key) => self.handle_key(key),
            _ => self.broadcast(event),
        }
    }

    fn handle_key(&mut self, key: &KeyEvent) -> EventOutcome {
        if is_theme_shortcut(key) {
            self.run(Cmd::ToggleTheme);
            return EventOutcome::PREVENT;
        }
        if key.code == KeyCode::Escape {
            self.run(Cmd::CloseMenu);
        }
        EventOutcome::PASS
    }

    fn broadcast(&mut self, event: &PageEvent) -> EventOutcome {
        let mut prevent = false;
        for slot in START_ORDER {
            let cmd = {
                let mut cx = Context::new(&mut self.page, &mut self.scheduler, slot);
                self.controllers.get_mut(slot).on_event(event, &mut cx)
            };
            prevent |= self.run(cmd);
        }
        EventOutcome {
            prevent_default: prevent,
        }
    }

    fn mark_loaded(&mut self) {
        if self.loaded {
            return;
        }
        self.loaded = true;
        if let Some(body) = self.page.body() {
            self.page.add_class(body, LOADED_CLASS);
        }
        tracing::info!("Portfolio fully loaded");
    }

    fn set_animations_paused(&mut self, paused: bool) {
        if let Some(body) = self.page.body() {
            let state = if paused { "paused" } else { "running" };
            self.page.set_style(body, "animation-play-state", state);
        }
    }

    fn dispatch(&mut self, due: DueTask) {
        let cmd = {
            let mut cx = Context::new(&mut self.page, &mut self.scheduler, due.owner);
            self.controllers
                .get_mut(due.owner)
                .on_task(due.handle, &mut cx)
        };
        self.run(cmd);
    }

    /// Move the clock forward by `dt`, firing every timer that comes due.
    /// Returns how many fired.
    pub fn advance(&mut self, dt: Duration) -> usize {
        let target = self.scheduler.now().saturating_add(dt);
        self.set_time(target)
    }

    /// Move the clock to `now` (never backwards), firing every timer due by
    /// then. Returns how many fired.
    pub fn set_time(&mut self, now: Duration) -> usize {
        let mut fired = 0;
        while let Some(due) = self.scheduler.pop_due(now) {
            self.dispatch(due);
            fired += 1;
        }
        fired
    }

    /// Run the animation-frame callbacks requested before this call.
    pub fn frame(&mut self) -> usize {
        let frames = self.scheduler.take_frames();
        let count = frames.len();
        for due in frames {
            self.dispatch(due);
        }
        count
    }

    /// Stop every controller and drop all pending work. Later events are
    /// ignored.
    pub fn shutdown(&mut self) {
        if self.phase == Phase::Stopped {
            return;
        }
        if self.phase == Phase::Running {
            for slot in START_ORDER {
                let mut cx = Context::new(&mut self.page, &mut self.scheduler, slot);
                self.controllers.get_mut(slot).stop(&mut cx);
            }
        }
        self.scheduler.cancel_all();
        self.phase = Phase::Stopped;
        tracing::info!("Portfolio shut down");
    }

    /// Give the page back.
    #[must_use]
    pub fn into_page(self) -> P {
        self.page
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::event::Modifiers;
    use folio_core::headless::HeadlessPage;
    use folio_core::page::ReadyState;
    use pretty_assertions::assert_eq;

    fn shortcut(modifiers: Modifiers, c: char) -> PageEvent {
        PageEvent::Key(KeyEvent::new(KeyCode::Char(c)).with_modifiers(modifiers))
    }

    #[test]
    fn boot_waits_for_ready_while_loading() {
        let mut page = HeadlessPage::new();
        page.set_ready_state(ReadyState::Loading);
        let mut app = App::new(page, SiteConfig::default());
        app.boot();
        assert_eq!(app.phase(), Phase::Waiting);

        app.handle_event(&PageEvent::Ready);
        assert_eq!(app.phase(), Phase::Running);

        // A second ready does not re-run init.
        let pending = app.pending_tasks();
        app.handle_event(&PageEvent::Ready);
        app.boot();
        assert_eq!(app.pending_tasks(), pending);
    }

    #[test]
    #[tracing_test::traced_test]
    fn init_logs_start_and_success() {
        let mut app = App::new(HeadlessPage::new(), SiteConfig::default());
        app.boot();
        assert!(logs_contain("Initializing portfolio..."));
        assert!(logs_contain("Portfolio initialized successfully"));
        assert!(logs_contain("Theme toggle button not found"));
    }

    #[test]
    fn ready_before_boot_is_ignored() {
        let mut page = HeadlessPage::new();
        page.set_ready_state(ReadyState::Loading);
        let mut app = App::new(page, SiteConfig::default());
        app.handle_event(&PageEvent::Ready);
        assert_eq!(app.phase(), Phase::Idle);
    }

    #[test]
    fn shortcut_requires_modifier_shift_and_capital_t() {
        let mut app = App::new(HeadlessPage::new(), SiteConfig::default());
        app.boot();

        let outcome = app.handle_event(&shortcut(Modifiers::CTRL | Modifiers::SHIFT, 'T'));
        assert_eq!(outcome, EventOutcome::PREVENT);
        assert_eq!(app.theme(), Theme::Dark);

        let outcome = app.handle_event(&shortcut(Modifiers::META | Modifiers::SHIFT, 'T'));
        assert_eq!(outcome, EventOutcome::PREVENT);
        assert_eq!(app.theme(), Theme::Light);

        for ignored in [
            shortcut(Modifiers::CTRL, 'T'),
            shortcut(Modifiers::SHIFT, 'T'),
            shortcut(Modifiers::CTRL | Modifiers::SHIFT, 't'),
        ] {
            assert_eq!(app.handle_event(&ignored), EventOutcome::PASS);
        }
        assert_eq!(app.theme(), Theme::Light);
    }

    #[test]
    fn visibility_pauses_body_animations() {
        let mut app = App::new(HeadlessPage::new(), SiteConfig::default());
        app.handle_event(&PageEvent::VisibilityChange { hidden: true });
        let body = app.page().body().unwrap();
        assert_eq!(app.page().style(body, "animation-play-state"), Some("paused"));
        app.handle_event(&PageEvent::VisibilityChange { hidden: false });
        assert_eq!(app.page().style(body, "animation-play-state"), Some("running"));
    }

    #[test]
    fn loaded_marks_body_once() {
        let mut app = App::new(HeadlessPage::new(), SiteConfig::default());
        app.boot();
        app.handle_event(&PageEvent::Loaded);
        app.handle_event(&PageEvent::Loaded);
        let body = app.page().body().unwrap();
        assert_eq!(app.page().classes(body), vec![LOADED_CLASS]);
    }

    #[test]
    fn shutdown_ignores_later_events() {
        let mut app = App::new(HeadlessPage::new(), SiteConfig::default());
        app.boot();
        app.shutdown();
        assert_eq!(app.phase(), Phase::Stopped);
        let outcome = app.handle_event(&shortcut(Modifiers::CTRL | Modifiers::SHIFT, 'T'));
        assert_eq!(outcome, EventOutcome::PASS);
        assert_eq!(app.theme(), Theme::Light);
        assert_eq!(app.advance(Duration::from_secs(10)), 0);
    }
}
