#![forbid(unsafe_code)]

//! The contract every page controller implements.
//!
//! A controller is started once, then fed the page events and task firings
//! that concern it. Anything it needs from another controller goes back to
//! the orchestrator as a [`Cmd`]; controllers never hold references to each
//! other.

use core::fmt;
use core::time::Duration;

use folio_core::event::PageEvent;
use folio_core::page::Page;

use crate::scheduler::{Scheduler, TaskHandle};

/// Identifies a controller. Also tags the tasks it schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slot {
    Theme,
    Typing,
    Navigation,
    SkillBars,
    Reveal,
    MobileMenu,
    Stats,
}

impl Slot {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Theme => "theme",
            Self::Typing => "typing",
            Self::Navigation => "navigation",
            Self::SkillBars => "skill-bars",
            Self::Reveal => "reveal",
            Self::MobileMenu => "mobile-menu",
            Self::Stats => "stats",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Requests a controller hands back to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Cmd {
    /// Nothing to do.
    #[default]
    None,
    /// Suppress the browser's default action for the current event.
    PreventDefault,
    /// Close the mobile menu if it is open.
    CloseMenu,
    /// Flip the color theme.
    ToggleTheme,
    /// Several commands, executed in order.
    Batch(Vec<Cmd>),
}

impl Cmd {
    /// Combine commands, dropping `None`s.
    #[must_use]
    pub fn batch(cmds: impl IntoIterator<Item = Cmd>) -> Self {
        let mut cmds: Vec<Cmd> = cmds.into_iter().filter(|c| !c.is_none()).collect();
        match cmds.len() {
            0 => Self::None,
            1 => cmds.pop().unwrap_or_default(),
            _ => Self::Batch(cmds),
        }
    }

    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

/// What a controller sees while it runs.
pub struct Context<'a> {
    page: &'a mut dyn Page,
    scheduler: &'a mut Scheduler,
    slot: Slot,
}

impl<'a> Context<'a> {
    pub fn new(page: &'a mut dyn Page, scheduler: &'a mut Scheduler, slot: Slot) -> Self {
        Self {
            page,
            scheduler,
            slot,
        }
    }

    /// The document.
    pub fn page(&mut self) -> &mut dyn Page {
        &mut *self.page
    }

    /// Current monotonic time.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.scheduler.now()
    }

    pub fn set_timeout(&mut self, delay: Duration) -> TaskHandle {
        self.scheduler.set_timeout(self.slot, delay)
    }

    pub fn set_interval(&mut self, period: Duration) -> TaskHandle {
        self.scheduler.set_interval(self.slot, period)
    }

    pub fn request_frame(&mut self) -> TaskHandle {
        self.scheduler.request_frame(self.slot)
    }

    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        self.scheduler.cancel(handle)
    }

    /// Cancel every task this controller scheduled.
    pub fn cancel_mine(&mut self) -> usize {
        self.scheduler.cancel_owned(self.slot)
    }
}

/// A page controller.
pub trait Behavior {
    /// Which controller this is.
    fn slot(&self) -> Slot;

    /// Bind to the page. Called once, after the document is parsed.
    fn start(&mut self, cx: &mut Context<'_>) -> Cmd;

    /// React to a page event. Controllers ignore events they do not own.
    fn on_event(&mut self, event: &PageEvent, cx: &mut Context<'_>) -> Cmd {
        let _ = (event, cx);
        Cmd::None
    }

    /// A task this controller scheduled came due.
    fn on_task(&mut self, task: TaskHandle, cx: &mut Context<'_>) -> Cmd {
        let _ = (task, cx);
        Cmd::None
    }

    /// Release page subscriptions and cancel pending tasks.
    fn stop(&mut self, cx: &mut Context<'_>) {
        cx.cancel_mine();
    }
}
