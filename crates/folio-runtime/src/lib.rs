#![forbid(unsafe_code)]

//! Folio runtime
//!
//! Everything that makes the portfolio page move, with no browser attached:
//!
//! - [`Scheduler`] - host-driven timers and animation frames with cancellable
//!   [`TaskHandle`]s
//! - [`Behavior`] - the contract each page controller implements
//! - [`behaviors`] - theme, typing, navigation, skill bars, reveal, mobile
//!   menu and stat counters
//! - [`App`] - the orchestrator that owns a [`folio_core::Page`] and routes
//!   events, tasks and cross-controller commands
//!
//! The host (the `folio-web` crate in a browser, or a test against
//! [`folio_core::headless::HeadlessPage`]) pushes events and moves time; the
//! runtime never reads a clock of its own.

pub mod animation;
pub mod app;
pub mod behavior;
pub mod behaviors;
pub mod scheduler;

pub use app::{App, Phase};
pub use behavior::{Behavior, Cmd, Context, Slot};
pub use behaviors::Theme;
pub use scheduler::{DueTask, MIN_TIMER_DELAY, Scheduler, TaskHandle};
