#![forbid(unsafe_code)]

//! Core: page abstraction, canonical page events, configuration, and a
//! headless page for deterministic tests.
//!
//! Nothing in this crate touches a real browser. The `folio-web` crate binds
//! [`page::Page`] to `web-sys`; [`headless::HeadlessPage`] implements the same
//! trait in memory.

pub mod config;
pub mod element;
pub mod error;
pub mod event;
pub mod headless;
pub mod page;
pub mod selector;

pub use element::{ElementId, ObserverId, WatchId};
pub use error::FolioError;
pub use event::{EventOutcome, IntersectionEntry, KeyCode, KeyEvent, Modifiers, PageEvent};
pub use page::{IntersectionOptions, Page, ReadyState, ScrollBehavior};
