#![forbid(unsafe_code)]

//! Site configuration.
//!
//! Every selector, timing and string the controllers use lives here so that
//! controllers receive their dependencies at construction instead of reaching
//! for globals. [`SiteConfig::default`] reproduces the portfolio page exactly;
//! hosts may override any subset from JSON:
//!
//! ```
//! use folio_core::config::SiteConfig;
//!
//! let cfg = SiteConfig::from_json(r#"{ "typing": { "texts": ["Hello"] } }"#).unwrap();
//! assert_eq!(cfg.typing.texts, vec!["Hello".to_owned()]);
//! assert_eq!(cfg.mobile_menu.breakpoint_px, 768);
//! ```

use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::FolioError;

/// Top-level configuration for the whole behavior layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    pub theme: ThemeConfig,
    pub typing: TypingConfig,
    pub navigation: NavigationConfig,
    pub skill_bars: SkillBarConfig,
    pub reveal: RevealConfig,
    pub mobile_menu: MobileMenuConfig,
    pub stats: StatsConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            theme: ThemeConfig::default(),
            typing: TypingConfig::portfolio(),
            navigation: NavigationConfig::default(),
            skill_bars: SkillBarConfig::default(),
            reveal: RevealConfig::default(),
            mobile_menu: MobileMenuConfig::default(),
            stats: StatsConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Parse and validate a JSON override. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, FolioError> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject values the controllers cannot run with.
    pub fn validate(&self) -> Result<(), FolioError> {
        if self.typing.texts.is_empty() {
            return Err(FolioError::InvalidConfig(
                "typing.texts must not be empty".into(),
            ));
        }
        if self.stats.steps == 0 {
            return Err(FolioError::InvalidConfig("stats.steps must be > 0".into()));
        }
        if self.skill_bars.frames == 0 {
            return Err(FolioError::InvalidConfig(
                "skill_bars.frames must be > 0".into(),
            ));
        }
        for (name, t) in [
            ("skill_bars.threshold", self.skill_bars.threshold),
            ("reveal.threshold", self.reveal.threshold),
            ("stats.threshold", self.stats.threshold),
        ] {
            if !(0.0..=1.0).contains(&t) {
                return Err(FolioError::InvalidConfig(format!(
                    "{name} must be within [0, 1], got {t}"
                )));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn with_typing(mut self, typing: TypingConfig) -> Self {
        self.typing = typing;
        self
    }

    #[must_use]
    pub fn with_navigation(mut self, navigation: NavigationConfig) -> Self {
        self.navigation = navigation;
        self
    }

    #[must_use]
    pub fn with_mobile_menu(mut self, mobile_menu: MobileMenuConfig) -> Self {
        self.mobile_menu = mobile_menu;
        self
    }

    #[must_use]
    pub fn with_stats(mut self, stats: StatsConfig) -> Self {
        self.stats = stats;
        self
    }
}

/// Theme toggle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThemeConfig {
    /// `id` of the toggle button.
    pub toggle_id: String,
    /// How long the root keeps its transition style after a toggle.
    pub transition_ms: u64,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            toggle_id: "themeToggle".into(),
            transition_ms: 300,
        }
    }
}

impl ThemeConfig {
    #[must_use]
    pub const fn transition(&self) -> Duration {
        Duration::from_millis(self.transition_ms)
    }
}

/// Typed headline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TypingConfig {
    /// `id` of the headline element.
    pub element_id: String,
    pub texts: Vec<String>,
    pub type_speed_ms: u64,
    pub delete_speed_ms: u64,
    /// Pause with the full string shown.
    pub delay_between_ms: u64,
    /// Delay before the first tick.
    pub start_delay_ms: u64,
    /// Pause with the empty string shown, before the next string.
    pub restart_pause_ms: u64,
}

impl Default for TypingConfig {
    /// Animator defaults: 100 ms typing, 50 ms deleting, 2 s hold.
    fn default() -> Self {
        Self {
            element_id: "typingText".into(),
            texts: Vec::new(),
            type_speed_ms: 100,
            delete_speed_ms: 50,
            delay_between_ms: 2000,
            start_delay_ms: 1000,
            restart_pause_ms: 500,
        }
    }
}

impl TypingConfig {
    /// The portfolio headline: five roles at 120/60/2500 ms.
    #[must_use]
    pub fn portfolio() -> Self {
        Self {
            texts: [
                "Code Whisperer",
                "Prompt Craftsperson",
                "Language Model Enthusiast",
                "Python Explorer",
                "ML Explorer",
            ]
            .into_iter()
            .map(str::to_owned)
            .collect(),
            type_speed_ms: 120,
            delete_speed_ms: 60,
            delay_between_ms: 2500,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_texts<I, S>(mut self, texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.texts = texts.into_iter().map(Into::into).collect();
        self
    }

    /// Set typing, deleting and hold durations in one go.
    #[must_use]
    pub fn with_speeds(mut self, type_ms: u64, delete_ms: u64, delay_between_ms: u64) -> Self {
        self.type_speed_ms = type_ms;
        self.delete_speed_ms = delete_ms;
        self.delay_between_ms = delay_between_ms;
        self
    }
}

/// In-page navigation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NavigationConfig {
    pub link_selector: String,
    pub section_selector: String,
    pub navbar_selector: String,
    /// Navbar height assumed when the navbar is absent.
    pub fallback_navbar_height: f64,
    /// Added to `scrollY` before looking up the current section.
    pub focus_offset: f64,
    /// Duration of the frame-driven scroll used without native smooth scrolling.
    pub fallback_scroll_ms: u64,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            link_selector: ".nav-link".into(),
            section_selector: "section[id]".into(),
            navbar_selector: ".navbar".into(),
            fallback_navbar_height: 80.0,
            focus_offset: 100.0,
            fallback_scroll_ms: 600,
        }
    }
}

/// Skill progress bars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SkillBarConfig {
    pub selector: String,
    /// Animation frames from 0 to the target width.
    pub frames: u32,
    pub threshold: f64,
    pub root_margin: String,
}

impl Default for SkillBarConfig {
    fn default() -> Self {
        Self {
            selector: ".skill-progress".into(),
            frames: 60,
            threshold: 0.5,
            root_margin: "0px 0px -100px 0px".into(),
        }
    }
}

/// Fade-in of cards and stat tiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RevealConfig {
    pub selector: String,
    /// Parent classes whose children reveal in a stagger.
    pub grid_classes: Vec<String>,
    pub stagger_ms: u64,
    pub threshold: f64,
    pub root_margin: String,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            selector: ".card, .stat-item".into(),
            grid_classes: vec![
                "projects-grid".into(),
                "certifications-grid".into(),
                "about-stats".into(),
            ],
            stagger_ms: 100,
            threshold: 0.1,
            root_margin: "0px 0px -50px 0px".into(),
        }
    }
}

/// Mobile navigation menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MobileMenuConfig {
    pub menu_selector: String,
    /// Class of the injected toggle button.
    pub button_class: String,
    /// The button is inserted before this element.
    pub anchor_selector: String,
    pub breakpoint_px: u32,
}

impl Default for MobileMenuConfig {
    fn default() -> Self {
        Self {
            menu_selector: ".nav-menu".into(),
            button_class: "mobile-menu-btn".into(),
            anchor_selector: ".theme-toggle".into(),
            breakpoint_px: 768,
        }
    }
}

impl MobileMenuConfig {
    /// Media query for the breakpoint, e.g. `(max-width: 768px)`.
    #[must_use]
    pub fn media_query(&self) -> String {
        format!("(max-width: {}px)", self.breakpoint_px)
    }
}

/// Numeric stat counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StatsConfig {
    pub selector: String,
    pub duration_ms: u64,
    pub steps: u32,
    pub threshold: f64,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            selector: ".stat-item h3".into(),
            duration_ms: 2000,
            steps: 50,
            threshold: 0.5,
        }
    }
}

impl StatsConfig {
    /// Interval between counter steps.
    #[must_use]
    pub fn step_interval(&self) -> Duration {
        Duration::from_millis(self.duration_ms) / self.steps.max(1)
    }
}
