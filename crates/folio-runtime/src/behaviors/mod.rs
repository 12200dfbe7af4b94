#![forbid(unsafe_code)]

//! The page controllers, one per module.

pub mod mobile_menu;
pub mod navigation;
pub mod reveal;
pub mod skill_bar;
pub mod stats;
pub mod theme;
pub mod typing;

pub use mobile_menu::MobileMenuController;
pub use navigation::NavigationController;
pub use reveal::RevealController;
pub use skill_bar::SkillBarAnimator;
pub use stats::StatsCounter;
pub use theme::{Theme, ThemeController};
pub use typing::{TypingAnimator, TypingState};
