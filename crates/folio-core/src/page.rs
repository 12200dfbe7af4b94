#![forbid(unsafe_code)]

//! The page abstraction controllers run against.
//!
//! [`Page`] is the narrow slice of the DOM the behavior layer needs: element
//! lookup, attributes, classes, inline styles, text, a little tree editing,
//! layout offsets, scrolling, and registration of the passive subscriptions
//! (click listeners, intersection observers, media-query watches) whose
//! notifications come back as [`PageEvent`](crate::event::PageEvent)s.
//!
//! Lookups return `Option`/`Vec`: a missing element is an expected condition
//! and callers no-op on it. Apart from element creation, mutations never fail
//! from the caller's point of view; a host that hits a DOM exception logs it
//! and carries on.

use crate::element::{ElementId, ObserverId, WatchId};
use crate::error::FolioError;

/// Document parsing state, as reported by `document.readyState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadyState {
    /// Still parsing; wait for [`PageEvent::Ready`](crate::event::PageEvent::Ready).
    #[default]
    Loading,
    /// Parsed, subresources may still be loading.
    Interactive,
    /// Fully loaded.
    Complete,
}

impl ReadyState {
    /// Whether the document tree can be queried.
    #[must_use]
    pub const fn is_parsed(self) -> bool {
        !matches!(self, Self::Loading)
    }
}

/// How `scroll_to` moves the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBehavior {
    /// Browser-animated scroll.
    Smooth,
    /// Jump immediately.
    Instant,
}

/// Options for an intersection observer.
#[derive(Debug, Clone, PartialEq)]
pub struct IntersectionOptions {
    /// Visible fraction that triggers a report.
    pub threshold: f64,
    /// CSS margin applied to the root box, e.g. `"0px 0px -100px 0px"`.
    pub root_margin: String,
}

impl IntersectionOptions {
    #[must_use]
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            root_margin: "0px".to_owned(),
        }
    }

    #[must_use]
    pub fn with_root_margin(mut self, margin: impl Into<String>) -> Self {
        self.root_margin = margin.into();
        self
    }
}

/// Document operations used by the behavior controllers.
///
/// Selector arguments use CSS selector syntax. Implementations must hand out
/// stable [`ElementId`]s: looking up the same element twice yields the same id.
pub trait Page {
    // -- document ---------------------------------------------------------

    /// Current parsing state of the document.
    fn ready_state(&self) -> ReadyState;

    /// The `<html>` element.
    fn root(&self) -> ElementId;

    /// The `<body>` element, if present.
    fn body(&self) -> Option<ElementId>;

    /// `document.getElementById`.
    fn element_by_id(&self, id: &str) -> Option<ElementId>;

    /// First element matching `selector` in document order.
    fn query(&self, selector: &str) -> Option<ElementId>;

    /// All elements matching `selector` in document order.
    fn query_all(&self, selector: &str) -> Vec<ElementId>;

    /// First descendant of `scope` matching `selector`.
    fn query_within(&self, scope: ElementId, selector: &str) -> Option<ElementId>;

    // -- attributes, classes, style, content ------------------------------

    fn attribute(&self, el: ElementId, name: &str) -> Option<String>;

    fn set_attribute(&mut self, el: ElementId, name: &str, value: &str);

    fn has_class(&self, el: ElementId, class: &str) -> bool;

    fn add_class(&mut self, el: ElementId, class: &str);

    fn remove_class(&mut self, el: ElementId, class: &str);

    /// Toggle `class`, returning whether it is present afterwards.
    fn toggle_class(&mut self, el: ElementId, class: &str) -> bool {
        if self.has_class(el, class) {
            self.remove_class(el, class);
            false
        } else {
            self.add_class(el, class);
            true
        }
    }

    /// Replace the whole `class` attribute.
    fn set_class_name(&mut self, el: ElementId, classes: &str);

    /// Set an inline style property (CSS property name, e.g. `transition-delay`).
    fn set_style(&mut self, el: ElementId, property: &str, value: &str);

    /// Remove an inline style property.
    fn remove_style(&mut self, el: ElementId, property: &str);

    /// `textContent`.
    fn text(&self, el: ElementId) -> String;

    fn set_text(&mut self, el: ElementId, text: &str);

    /// Replace the element's children with parsed markup.
    fn set_inner_html(&mut self, el: ElementId, html: &str);

    // -- tree -------------------------------------------------------------

    fn parent(&self, el: ElementId) -> Option<ElementId>;

    /// Element children in order.
    fn children(&self, el: ElementId) -> Vec<ElementId>;

    fn previous_sibling(&self, el: ElementId) -> Option<ElementId>;

    /// Create a detached element. Fails only when the host rejects `tag`.
    fn create_element(&mut self, tag: &str) -> Result<ElementId, FolioError>;

    fn append_child(&mut self, parent: ElementId, child: ElementId);

    /// Insert `child` into `parent` before `reference`.
    fn insert_before(&mut self, parent: ElementId, child: ElementId, reference: ElementId);

    // -- layout and scrolling -----------------------------------------------

    /// `offsetTop` in CSS pixels.
    fn offset_top(&self, el: ElementId) -> f64;

    /// `offsetHeight` in CSS pixels.
    fn offset_height(&self, el: ElementId) -> f64;

    /// `window.scrollY`.
    fn scroll_y(&self) -> f64;

    fn scroll_to(&mut self, top: f64, behavior: ScrollBehavior);

    /// Whether the browser animates `scroll_to` with [`ScrollBehavior::Smooth`].
    fn supports_smooth_scroll(&self) -> bool;

    // -- subscriptions ----------------------------------------------------

    /// Deliver [`PageEvent::Click`](crate::event::PageEvent::Click) for `el`.
    fn listen_click(&mut self, el: ElementId);

    fn unlisten_click(&mut self, el: ElementId);

    fn create_observer(&mut self, options: IntersectionOptions) -> ObserverId;

    fn observe(&mut self, observer: ObserverId, el: ElementId);

    /// Stop an observer and forget its targets.
    fn disconnect(&mut self, observer: ObserverId);

    /// Watch a media query; returns the watch and whether it matches now.
    fn watch_media(&mut self, query: &str) -> (WatchId, bool);

    fn unwatch_media(&mut self, watch: WatchId);
}
