#![forbid(unsafe_code)]

//! In-memory [`Page`] implementation.
//!
//! `HeadlessPage` models just enough of a document for the behavior layer:
//! an element tree with attributes, classes, inline styles and text, fixed
//! layout boxes, a scroll offset, and records of every passive subscription.
//! Tests build a page, hand it to the runtime, and turn simulated user actions
//! into [`PageEvent`]s with helpers such as [`HeadlessPage::click`],
//! [`HeadlessPage::reveal`] and [`HeadlessPage::set_viewport_width`].
//!
//! # Example
//!
//! ```
//! use folio_core::headless::HeadlessPage;
//! use folio_core::page::Page;
//!
//! let mut page = HeadlessPage::new();
//! let body = page.body().unwrap();
//! let link = page.build(body, "a").class("nav-link").attr("href", "#about").done();
//! assert_eq!(page.query(".nav-link"), Some(link));
//! ```

use std::collections::{BTreeMap, BTreeSet};

use crate::element::{ElementId, ObserverId, WatchId};
use crate::error::FolioError;
use crate::event::{IntersectionEntry, PageEvent};
use crate::page::{IntersectionOptions, Page, ReadyState, ScrollBehavior};
use crate::selector::{SelectorList, SelectorTarget};

const ROOT: ElementId = ElementId::from_raw(0);
const BODY: ElementId = ElementId::from_raw(1);

#[derive(Debug, Clone, Default)]
struct Node {
    tag: String,
    attrs: BTreeMap<String, String>,
    classes: Vec<String>,
    style: BTreeMap<String, String>,
    text: String,
    markup: Option<String>,
    children: Vec<ElementId>,
    parent: Option<ElementId>,
    offset_top: f64,
    offset_height: f64,
}

/// One intersection observer created through the page.
#[derive(Debug, Clone)]
pub struct ObserverRecord {
    pub options: IntersectionOptions,
    pub targets: Vec<ElementId>,
    pub connected: bool,
}

#[derive(Debug, Clone)]
struct MediaRecord {
    query: String,
    matches: bool,
    active: bool,
}

/// A scroll request recorded by [`Page::scroll_to`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollRequest {
    pub top: f64,
    pub behavior: ScrollBehavior,
}

/// In-memory document.
#[derive(Debug, Clone)]
pub struct HeadlessPage {
    nodes: Vec<Node>,
    ready: ReadyState,
    scroll_y: f64,
    smooth_scroll: bool,
    viewport_width: f64,
    scrolls: Vec<ScrollRequest>,
    click_listeners: BTreeSet<ElementId>,
    observers: Vec<ObserverRecord>,
    media: Vec<MediaRecord>,
}

impl Default for HeadlessPage {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessPage {
    /// An empty, fully parsed document with `<html>` and `<body>`, a
    /// 1280px-wide viewport, and native smooth scrolling.
    #[must_use]
    pub fn new() -> Self {
        let root = Node {
            tag: "html".to_owned(),
            children: vec![BODY],
            ..Node::default()
        };
        let body = Node {
            tag: "body".to_owned(),
            parent: Some(ROOT),
            ..Node::default()
        };
        Self {
            nodes: vec![root, body],
            ready: ReadyState::Complete,
            scroll_y: 0.0,
            smooth_scroll: true,
            viewport_width: 1280.0,
            scrolls: Vec::new(),
            click_listeners: BTreeSet::new(),
            observers: Vec::new(),
            media: Vec::new(),
        }
    }

    /// Start building a new element appended to `parent`.
    pub fn build(&mut self, parent: ElementId, tag: &str) -> ElementBuilder<'_> {
        let el = self.alloc(tag);
        self.append_child(parent, el);
        ElementBuilder { page: self, el }
    }

    fn alloc(&mut self, tag: &str) -> ElementId {
        let id = ElementId::from_raw(self.nodes.len() as u32);
        self.nodes.push(Node {
            tag: tag.to_ascii_lowercase(),
            ..Node::default()
        });
        id
    }

    pub fn set_ready_state(&mut self, ready: ReadyState) {
        self.ready = ready;
    }

    pub fn set_scroll_y(&mut self, y: f64) {
        self.scroll_y = y;
    }

    pub fn set_smooth_scroll_support(&mut self, supported: bool) {
        self.smooth_scroll = supported;
    }

    /// Set a layout box for `el`.
    pub fn set_layout(&mut self, el: ElementId, top: f64, height: f64) {
        if let Some(node) = self.node_mut(el) {
            node.offset_top = top;
            node.offset_height = height;
        }
    }

    /// Every `scroll_to` call, oldest first.
    #[must_use]
    pub fn scroll_requests(&self) -> &[ScrollRequest] {
        &self.scrolls
    }

    /// Inline style value.
    #[must_use]
    pub fn style(&self, el: ElementId, property: &str) -> Option<&str> {
        self.node(el)?.style.get(property).map(String::as_str)
    }

    /// Markup last written with `set_inner_html`, if the element holds markup.
    #[must_use]
    pub fn inner_html(&self, el: ElementId) -> Option<&str> {
        self.node(el)?.markup.as_deref()
    }

    /// Class list in insertion order.
    #[must_use]
    pub fn classes(&self, el: ElementId) -> Vec<&str> {
        self.node(el)
            .map(|n| n.classes.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn tag(&self, el: ElementId) -> Option<&str> {
        self.node(el).map(|n| n.tag.as_str())
    }

    #[must_use]
    pub fn is_listening(&self, el: ElementId) -> bool {
        self.click_listeners.contains(&el)
    }

    #[must_use]
    pub fn observer(&self, id: ObserverId) -> Option<&ObserverRecord> {
        self.observers.get(id.raw() as usize)
    }

    /// Observers created so far, including disconnected ones.
    #[must_use]
    pub fn observers(&self) -> &[ObserverRecord] {
        &self.observers
    }

    /// Number of media watches still active.
    #[must_use]
    pub fn active_media_watches(&self) -> usize {
        self.media.iter().filter(|m| m.active).count()
    }

    /// Simulate a click on `el`.
    ///
    /// The click bubbles to the nearest ancestor-or-self with a registered
    /// listener; `None` when nothing listens.
    #[must_use]
    pub fn click(&self, el: ElementId) -> Option<PageEvent> {
        let mut cursor = Some(el);
        while let Some(node) = cursor {
            if self.click_listeners.contains(&node) {
                return Some(PageEvent::Click { target: node });
            }
            cursor = self.parent(node);
        }
        None
    }

    /// Simulate `el` scrolling into view: one event per connected observer
    /// that watches it.
    #[must_use]
    pub fn reveal(&self, el: ElementId) -> Vec<PageEvent> {
        self.intersections(el, IntersectionEntry::visible(el))
    }

    /// Simulate `el` scrolling out of view.
    #[must_use]
    pub fn conceal(&self, el: ElementId) -> Vec<PageEvent> {
        self.intersections(el, IntersectionEntry::hidden(el))
    }

    fn intersections(&self, el: ElementId, entry: IntersectionEntry) -> Vec<PageEvent> {
        self.observers
            .iter()
            .enumerate()
            .filter(|(_, o)| o.connected && o.targets.contains(&el))
            .map(|(i, _)| PageEvent::Intersection {
                observer: ObserverId::from_raw(i as u32),
                entries: vec![entry],
            })
            .collect()
    }

    #[must_use]
    pub fn viewport_width(&self) -> f64 {
        self.viewport_width
    }

    /// Resize the viewport, returning a change event for every active watch
    /// whose match state flipped.
    pub fn set_viewport_width(&mut self, width: f64) -> Vec<PageEvent> {
        self.viewport_width = width;
        let mut events = Vec::new();
        for (i, record) in self.media.iter_mut().enumerate() {
            let matches = evaluate_media(&record.query, width);
            if record.active && matches != record.matches {
                events.push(PageEvent::MediaChange {
                    watch: WatchId::from_raw(i as u32),
                    matches,
                });
            }
            record.matches = matches;
        }
        events
    }

    fn node(&self, el: ElementId) -> Option<&Node> {
        self.nodes.get(el.index())
    }

    fn node_mut(&mut self, el: ElementId) -> Option<&mut Node> {
        self.nodes.get_mut(el.index())
    }

    fn detach(&mut self, child: ElementId) {
        if let Some(old) = self.node(child).and_then(|n| n.parent)
            && let Some(parent) = self.node_mut(old)
        {
            parent.children.retain(|&c| c != child);
        }
    }

    /// Pre-order descendants of `scope`, excluding `scope` itself.
    fn descendants(&self, scope: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut stack: Vec<ElementId> = self
            .node(scope)
            .map(|n| n.children.iter().rev().copied().collect())
            .unwrap_or_default();
        while let Some(el) = stack.pop() {
            out.push(el);
            if let Some(node) = self.node(el) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    fn select(&self, scope: ElementId, selector: &str, include_scope: bool) -> Vec<ElementId> {
        let list = match SelectorList::parse(selector) {
            Ok(list) => list,
            Err(err) => {
                tracing::warn!(%err, "headless query rejected");
                return Vec::new();
            }
        };
        let mut candidates = Vec::new();
        if include_scope {
            candidates.push(scope);
        }
        candidates.extend(self.descendants(scope));
        candidates
            .into_iter()
            .filter(|&el| list.matches(self, el))
            .collect()
    }

    fn text_of(&self, el: ElementId, out: &mut String) {
        let Some(node) = self.node(el) else {
            return;
        };
        if let Some(markup) = &node.markup {
            out.push_str(&strip_tags(markup));
            return;
        }
        out.push_str(&node.text);
        for &child in &node.children {
            self.text_of(child, out);
        }
    }
}

impl SelectorTarget for HeadlessPage {
    type Node = ElementId;

    fn node_tag(&self, node: ElementId) -> &str {
        self.node(node).map_or("", |n| n.tag.as_str())
    }

    fn node_has_class(&self, node: ElementId, class: &str) -> bool {
        self.node(node)
            .is_some_and(|n| n.classes.iter().any(|c| c == class))
    }

    fn node_attribute(&self, node: ElementId, name: &str) -> Option<&str> {
        self.node(node)?.attrs.get(name).map(String::as_str)
    }

    fn node_parent(&self, node: ElementId) -> Option<ElementId> {
        self.node(node)?.parent
    }
}

impl Page for HeadlessPage {
    fn ready_state(&self) -> ReadyState {
        self.ready
    }

    fn root(&self) -> ElementId {
        ROOT
    }

    fn body(&self) -> Option<ElementId> {
        Some(BODY)
    }

    fn element_by_id(&self, id: &str) -> Option<ElementId> {
        std::iter::once(ROOT)
            .chain(self.descendants(ROOT))
            .find(|&el| self.node_attribute(el, "id") == Some(id))
    }

    fn query(&self, selector: &str) -> Option<ElementId> {
        self.select(ROOT, selector, true).into_iter().next()
    }

    fn query_all(&self, selector: &str) -> Vec<ElementId> {
        self.select(ROOT, selector, true)
    }

    fn query_within(&self, scope: ElementId, selector: &str) -> Option<ElementId> {
        self.select(scope, selector, false).into_iter().next()
    }

    fn attribute(&self, el: ElementId, name: &str) -> Option<String> {
        if name == "class" {
            return self.node(el).map(|n| n.classes.join(" "));
        }
        self.node_attribute(el, name).map(str::to_owned)
    }

    fn set_attribute(&mut self, el: ElementId, name: &str, value: &str) {
        if name == "class" {
            self.set_class_name(el, value);
            return;
        }
        if let Some(node) = self.node_mut(el) {
            node.attrs.insert(name.to_owned(), value.to_owned());
        }
    }

    fn has_class(&self, el: ElementId, class: &str) -> bool {
        self.node_has_class(el, class)
    }

    fn add_class(&mut self, el: ElementId, class: &str) {
        if let Some(node) = self.node_mut(el)
            && !node.classes.iter().any(|c| c == class)
        {
            node.classes.push(class.to_owned());
        }
    }

    fn remove_class(&mut self, el: ElementId, class: &str) {
        if let Some(node) = self.node_mut(el) {
            node.classes.retain(|c| c != class);
        }
    }

    fn set_class_name(&mut self, el: ElementId, classes: &str) {
        if let Some(node) = self.node_mut(el) {
            node.classes = classes.split_whitespace().map(str::to_owned).collect();
        }
    }

    fn set_style(&mut self, el: ElementId, property: &str, value: &str) {
        if value.is_empty() {
            self.remove_style(el, property);
            return;
        }
        if let Some(node) = self.node_mut(el) {
            node.style.insert(property.to_owned(), value.to_owned());
        }
    }

    fn remove_style(&mut self, el: ElementId, property: &str) {
        if let Some(node) = self.node_mut(el) {
            node.style.remove(property);
        }
    }

    fn text(&self, el: ElementId) -> String {
        let mut out = String::new();
        self.text_of(el, &mut out);
        out
    }

    fn set_text(&mut self, el: ElementId, text: &str) {
        let children = self.node(el).map(|n| n.children.clone()).unwrap_or_default();
        for child in children {
            if let Some(node) = self.node_mut(child) {
                node.parent = None;
            }
        }
        if let Some(node) = self.node_mut(el) {
            node.children.clear();
            node.markup = None;
            node.text = text.to_owned();
        }
    }

    fn set_inner_html(&mut self, el: ElementId, html: &str) {
        self.set_text(el, "");
        if let Some(node) = self.node_mut(el) {
            node.markup = Some(html.to_owned());
        }
    }

    fn parent(&self, el: ElementId) -> Option<ElementId> {
        self.node_parent(el)
    }

    fn children(&self, el: ElementId) -> Vec<ElementId> {
        self.node(el).map(|n| n.children.clone()).unwrap_or_default()
    }

    fn previous_sibling(&self, el: ElementId) -> Option<ElementId> {
        let parent = self.parent(el)?;
        let siblings = &self.node(parent)?.children;
        let pos = siblings.iter().position(|&c| c == el)?;
        pos.checked_sub(1).map(|i| siblings[i])
    }

    fn create_element(&mut self, tag: &str) -> Result<ElementId, FolioError> {
        if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(FolioError::Dom(format!("invalid tag name {tag:?}")));
        }
        Ok(self.alloc(tag))
    }

    fn append_child(&mut self, parent: ElementId, child: ElementId) {
        if self.node(parent).is_none() || self.node(child).is_none() {
            return;
        }
        self.detach(child);
        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.node_mut(parent) {
            node.markup = None;
            node.children.push(child);
        }
    }

    fn insert_before(&mut self, parent: ElementId, child: ElementId, reference: ElementId) {
        let Some(pos) = self
            .node(parent)
            .and_then(|n| n.children.iter().position(|&c| c == reference))
        else {
            self.append_child(parent, child);
            return;
        };
        self.detach(child);
        // Detaching may shift the reference when `child` was an earlier sibling.
        let pos = self
            .node(parent)
            .and_then(|n| n.children.iter().position(|&c| c == reference))
            .unwrap_or(pos);
        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.node_mut(parent) {
            node.children.insert(pos, child);
        }
    }

    fn offset_top(&self, el: ElementId) -> f64 {
        self.node(el).map_or(0.0, |n| n.offset_top)
    }

    fn offset_height(&self, el: ElementId) -> f64 {
        self.node(el).map_or(0.0, |n| n.offset_height)
    }

    fn scroll_y(&self) -> f64 {
        self.scroll_y
    }

    fn scroll_to(&mut self, top: f64, behavior: ScrollBehavior) {
        self.scrolls.push(ScrollRequest { top, behavior });
        self.scroll_y = top.max(0.0);
    }

    fn supports_smooth_scroll(&self) -> bool {
        self.smooth_scroll
    }

    fn listen_click(&mut self, el: ElementId) {
        self.click_listeners.insert(el);
    }

    fn unlisten_click(&mut self, el: ElementId) {
        self.click_listeners.remove(&el);
    }

    fn create_observer(&mut self, options: IntersectionOptions) -> ObserverId {
        let id = ObserverId::from_raw(self.observers.len() as u32);
        self.observers.push(ObserverRecord {
            options,
            targets: Vec::new(),
            connected: true,
        });
        id
    }

    fn observe(&mut self, observer: ObserverId, el: ElementId) {
        if let Some(record) = self.observers.get_mut(observer.raw() as usize)
            && record.connected
            && !record.targets.contains(&el)
        {
            record.targets.push(el);
        }
    }

    fn disconnect(&mut self, observer: ObserverId) {
        if let Some(record) = self.observers.get_mut(observer.raw() as usize) {
            record.connected = false;
            record.targets.clear();
        }
    }

    fn watch_media(&mut self, query: &str) -> (WatchId, bool) {
        let matches = evaluate_media(query, self.viewport_width);
        let id = WatchId::from_raw(self.media.len() as u32);
        self.media.push(MediaRecord {
            query: query.to_owned(),
            matches,
            active: true,
        });
        (id, matches)
    }

    fn unwatch_media(&mut self, watch: WatchId) {
        if let Some(record) = self.media.get_mut(watch.raw() as usize) {
            record.active = false;
        }
    }
}

/// Fluent element construction for [`HeadlessPage::build`].
pub struct ElementBuilder<'a> {
    page: &'a mut HeadlessPage,
    el: ElementId,
}

impl ElementBuilder<'_> {
    #[must_use]
    pub fn id(self, id: &str) -> Self {
        self.attr("id", id)
    }

    /// Add whitespace-separated classes.
    #[must_use]
    pub fn class(self, classes: &str) -> Self {
        for class in classes.split_whitespace() {
            self.page.add_class(self.el, class);
        }
        self
    }

    #[must_use]
    pub fn attr(self, name: &str, value: &str) -> Self {
        self.page.set_attribute(self.el, name, value);
        self
    }

    #[must_use]
    pub fn text(self, text: &str) -> Self {
        self.page.set_text(self.el, text);
        self
    }

    #[must_use]
    pub fn layout(self, top: f64, height: f64) -> Self {
        self.page.set_layout(self.el, top, height);
        self
    }

    /// Finish and return the element handle.
    pub fn done(self) -> ElementId {
        self.el
    }
}

/// Evaluate `(max-width: Npx)` / `(min-width: Npx)` against a viewport width.
/// Anything else never matches.
fn evaluate_media(query: &str, width: f64) -> bool {
    let inner = query.trim().trim_start_matches('(').trim_end_matches(')');
    let Some((feature, value)) = inner.split_once(':') else {
        return false;
    };
    let Ok(px) = value.trim().trim_end_matches("px").trim().parse::<f64>() else {
        return false;
    };
    match feature.trim() {
        "max-width" => width <= px,
        "min-width" => width >= px,
        _ => false,
    }
}

fn strip_tags(markup: &str) -> String {
    let mut out = String::with_capacity(markup.len());
    let mut in_tag = false;
    for c in markup.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
