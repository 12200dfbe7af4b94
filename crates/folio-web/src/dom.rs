#![forbid(unsafe_code)]

//! [`Page`] over the live document, via `web-sys`.
//!
//! Elements are interned on first sight: the registry keeps a handle to every
//! element the runtime has seen and hands out its index as the [`ElementId`],
//! so the same node always maps to the same id. A JS `Map` keyed by node
//! makes the reverse lookup constant time. Every closure registered with
//! the browser is owned by a [`Listener`] or an observer slot and detached when
//! that owner drops.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use folio_core::element::{ElementId, ObserverId, WatchId};
use folio_core::error::FolioError;
use folio_core::event::{EventOutcome, IntersectionEntry, PageEvent};
use folio_core::page::{IntersectionOptions, Page, ReadyState, ScrollBehavior};
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use wasm_bindgen::closure::Closure;
use web_sys::{
    Document, Element, EventTarget, HtmlElement, IntersectionObserver, IntersectionObserverEntry,
    IntersectionObserverInit, ScrollToOptions, Window,
};

/// Where page notifications go. Returns what to do with the DOM event.
pub(crate) type EventSink = Rc<dyn Fn(PageEvent) -> EventOutcome>;

const ROOT: ElementId = ElementId::from_raw(0);

pub(crate) fn js_error(value: &JsValue) -> FolioError {
    FolioError::Dom(value.as_string().unwrap_or_else(|| format!("{value:?}")))
}

/// Log a failed DOM call and turn it into `None`.
fn logged<T>(op: &'static str, result: Result<T, JsValue>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(op, error = %js_error(&err), "DOM call failed");
            None
        }
    }
}

/// Send `event` to the sink and honor its outcome on `dom_event`.
pub(crate) fn forward(sink: &EventSink, event: PageEvent, dom_event: &web_sys::Event) {
    if sink(event).prevent_default {
        dom_event.prevent_default();
    }
}

/// An `addEventListener` registration, removed on drop.
pub(crate) struct Listener {
    target: EventTarget,
    kind: &'static str,
    callback: Closure<dyn FnMut(web_sys::Event)>,
}

impl Listener {
    pub(crate) fn new(
        target: &EventTarget,
        kind: &'static str,
        handler: impl FnMut(web_sys::Event) + 'static,
    ) -> Result<Self, FolioError> {
        let callback = Closure::<dyn FnMut(web_sys::Event)>::new(handler);
        target
            .add_event_listener_with_callback(kind, callback.as_ref().unchecked_ref())
            .map_err(|err| js_error(&err))?;
        Ok(Self {
            target: target.clone(),
            kind,
            callback,
        })
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        let _ = self
            .target
            .remove_event_listener_with_callback(self.kind, self.callback.as_ref().unchecked_ref());
    }
}

/// Element handles by id.
struct Registry {
    elements: RefCell<Vec<Element>>,
    /// Node -> index into `elements`.
    index: js_sys::Map,
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            elements: RefCell::new(Vec::new()),
            index: js_sys::Map::new(),
        }
    }
}

impl Registry {
    fn intern(&self, el: Element) -> ElementId {
        if let Some(raw) = self.index.get(&el).as_f64() {
            return ElementId::from_raw(raw as u32);
        }
        let mut elements = self.elements.borrow_mut();
        let raw = elements.len() as u32;
        self.index.set(&el, &JsValue::from(raw));
        elements.push(el);
        ElementId::from_raw(raw)
    }

    fn get(&self, id: ElementId) -> Option<Element> {
        self.elements.borrow().get(id.raw() as usize).cloned()
    }
}

struct ObserverSlot {
    observer: IntersectionObserver,
    _callback: Closure<dyn FnMut(js_sys::Array)>,
}

impl Drop for ObserverSlot {
    fn drop(&mut self) {
        self.observer.disconnect();
    }
}

/// The live document.
pub(crate) struct DomPage {
    window: Window,
    document: Document,
    registry: Rc<Registry>,
    sink: EventSink,
    clicks: HashMap<ElementId, Listener>,
    observers: Vec<Option<ObserverSlot>>,
    watches: Vec<Option<Listener>>,
}

impl DomPage {
    pub(crate) fn new(window: Window, sink: EventSink) -> Result<Self, FolioError> {
        let document = window
            .document()
            .ok_or_else(|| FolioError::MissingElement("document".to_owned()))?;
        let root = document
            .document_element()
            .ok_or_else(|| FolioError::MissingElement("html".to_owned()))?;
        let registry = Rc::new(Registry::default());
        registry.intern(root);
        Ok(Self {
            window,
            document,
            registry,
            sink,
            clicks: HashMap::new(),
            observers: Vec::new(),
            watches: Vec::new(),
        })
    }

    pub(crate) fn document(&self) -> &Document {
        &self.document
    }

    fn element(&self, id: ElementId) -> Option<Element> {
        self.registry.get(id)
    }

    fn html(&self, id: ElementId) -> Option<HtmlElement> {
        self.element(id)?.dyn_into::<HtmlElement>().ok()
    }

    fn intern(&self, el: Element) -> ElementId {
        self.registry.intern(el)
    }

    fn collect_nodes(&self, list: &web_sys::NodeList) -> Vec<ElementId> {
        (0..list.length())
            .filter_map(|i| list.item(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .map(|el| self.intern(el))
            .collect()
    }

    fn make_observer(&self, id: ObserverId, options: &IntersectionOptions) -> Option<ObserverSlot> {
        let registry = Rc::clone(&self.registry);
        let sink = Rc::clone(&self.sink);
        let callback = Closure::<dyn FnMut(js_sys::Array)>::new(move |records: js_sys::Array| {
            let entries = records
                .iter()
                .filter_map(|record| record.dyn_into::<IntersectionObserverEntry>().ok())
                .map(|entry| IntersectionEntry {
                    target: registry.intern(entry.target()),
                    is_intersecting: entry.is_intersecting(),
                    ratio: entry.intersection_ratio(),
                })
                .collect();
            let _ = sink(PageEvent::Intersection {
                observer: id,
                entries,
            });
        });
        let init = IntersectionObserverInit::new();
        init.set_threshold(&JsValue::from_f64(options.threshold));
        init.set_root_margin(&options.root_margin);
        let observer = logged(
            "IntersectionObserver",
            IntersectionObserver::new_with_options(callback.as_ref().unchecked_ref(), &init),
        )?;
        Some(ObserverSlot {
            observer,
            _callback: callback,
        })
    }
}

impl Page for DomPage {
    fn ready_state(&self) -> ReadyState {
        match self.document.ready_state().as_str() {
            "loading" => ReadyState::Loading,
            "interactive" => ReadyState::Interactive,
            _ => ReadyState::Complete,
        }
    }

    fn root(&self) -> ElementId {
        ROOT
    }

    fn body(&self) -> Option<ElementId> {
        let body = self.document.body()?;
        Some(self.intern(body.into()))
    }

    fn element_by_id(&self, id: &str) -> Option<ElementId> {
        let el = self.document.get_element_by_id(id)?;
        Some(self.intern(el))
    }

    fn query(&self, selector: &str) -> Option<ElementId> {
        let el = logged("querySelector", self.document.query_selector(selector)).flatten()?;
        Some(self.intern(el))
    }

    fn query_all(&self, selector: &str) -> Vec<ElementId> {
        logged("querySelectorAll", self.document.query_selector_all(selector))
            .map(|list| self.collect_nodes(&list))
            .unwrap_or_default()
    }

    fn query_within(&self, scope: ElementId, selector: &str) -> Option<ElementId> {
        let scope = self.element(scope)?;
        let el = logged("querySelector", scope.query_selector(selector)).flatten()?;
        Some(self.intern(el))
    }

    fn attribute(&self, el: ElementId, name: &str) -> Option<String> {
        self.element(el)?.get_attribute(name)
    }

    fn set_attribute(&mut self, el: ElementId, name: &str, value: &str) {
        if let Some(el) = self.element(el) {
            logged("setAttribute", el.set_attribute(name, value));
        }
    }

    fn has_class(&self, el: ElementId, class: &str) -> bool {
        self.element(el)
            .is_some_and(|el| el.class_list().contains(class))
    }

    fn add_class(&mut self, el: ElementId, class: &str) {
        if let Some(el) = self.element(el) {
            logged("classList.add", el.class_list().add_1(class));
        }
    }

    fn remove_class(&mut self, el: ElementId, class: &str) {
        if let Some(el) = self.element(el) {
            logged("classList.remove", el.class_list().remove_1(class));
        }
    }

    fn set_class_name(&mut self, el: ElementId, classes: &str) {
        if let Some(el) = self.element(el) {
            el.set_class_name(classes);
        }
    }

    fn set_style(&mut self, el: ElementId, property: &str, value: &str) {
        if let Some(el) = self.html(el) {
            logged("style.setProperty", el.style().set_property(property, value));
        }
    }

    fn remove_style(&mut self, el: ElementId, property: &str) {
        if let Some(el) = self.html(el) {
            logged("style.removeProperty", el.style().remove_property(property));
        }
    }

    fn text(&self, el: ElementId) -> String {
        self.element(el)
            .and_then(|el| el.text_content())
            .unwrap_or_default()
    }

    fn set_text(&mut self, el: ElementId, text: &str) {
        if let Some(el) = self.element(el) {
            el.set_text_content(Some(text));
        }
    }

    fn set_inner_html(&mut self, el: ElementId, html: &str) {
        if let Some(el) = self.element(el) {
            el.set_inner_html(html);
        }
    }

    fn parent(&self, el: ElementId) -> Option<ElementId> {
        let parent = self.element(el)?.parent_element()?;
        Some(self.intern(parent))
    }

    fn children(&self, el: ElementId) -> Vec<ElementId> {
        let Some(el) = self.element(el) else {
            return Vec::new();
        };
        let children = el.children();
        (0..children.length())
            .filter_map(|i| children.item(i))
            .map(|child| self.intern(child))
            .collect()
    }

    fn previous_sibling(&self, el: ElementId) -> Option<ElementId> {
        let sibling = self.element(el)?.previous_element_sibling()?;
        Some(self.intern(sibling))
    }

    fn create_element(&mut self, tag: &str) -> Result<ElementId, FolioError> {
        let el = self
            .document
            .create_element(tag)
            .map_err(|err| js_error(&err))?;
        Ok(self.intern(el))
    }

    fn append_child(&mut self, parent: ElementId, child: ElementId) {
        if let (Some(parent), Some(child)) = (self.element(parent), self.element(child)) {
            logged("appendChild", parent.append_child(&child));
        }
    }

    fn insert_before(&mut self, parent: ElementId, child: ElementId, reference: ElementId) {
        let (Some(parent_el), Some(child_el)) = (self.element(parent), self.element(child)) else {
            return;
        };
        let reference = self.element(reference);
        if parent_el
            .insert_before(&child_el, reference.as_deref())
            .is_err()
        {
            // Reference is not a child of `parent`.
            self.append_child(parent, child);
        }
    }

    fn offset_top(&self, el: ElementId) -> f64 {
        self.html(el).map_or(0.0, |el| f64::from(el.offset_top()))
    }

    fn offset_height(&self, el: ElementId) -> f64 {
        self.html(el).map_or(0.0, |el| f64::from(el.offset_height()))
    }

    fn scroll_y(&self) -> f64 {
        self.window.scroll_y().unwrap_or(0.0)
    }

    fn scroll_to(&mut self, top: f64, behavior: ScrollBehavior) {
        let options = ScrollToOptions::new();
        options.set_top(top);
        options.set_behavior(match behavior {
            ScrollBehavior::Smooth => web_sys::ScrollBehavior::Smooth,
            ScrollBehavior::Instant => web_sys::ScrollBehavior::Instant,
        });
        self.window.scroll_to_with_scroll_to_options(&options);
    }

    fn supports_smooth_scroll(&self) -> bool {
        self.html(ROOT).is_some_and(|root| {
            js_sys::Reflect::has(&root.style(), &JsValue::from_str("scrollBehavior"))
                .unwrap_or(false)
        })
    }

    fn listen_click(&mut self, el: ElementId) {
        if self.clicks.contains_key(&el) {
            return;
        }
        let Some(element) = self.element(el) else {
            return;
        };
        let sink = Rc::clone(&self.sink);
        let listener = Listener::new(&element, "click", move |event: web_sys::Event| {
            forward(&sink, PageEvent::Click { target: el }, &event);
        });
        match listener {
            Ok(listener) => {
                self.clicks.insert(el, listener);
            }
            Err(err) => tracing::warn!(%err, "could not listen for clicks"),
        }
    }

    fn unlisten_click(&mut self, el: ElementId) {
        self.clicks.remove(&el);
    }

    fn create_observer(&mut self, options: IntersectionOptions) -> ObserverId {
        let id = ObserverId::from_raw(self.observers.len() as u32);
        let slot = self.make_observer(id, &options);
        self.observers.push(slot);
        id
    }

    fn observe(&mut self, observer: ObserverId, el: ElementId) {
        let Some(Some(slot)) = self.observers.get(observer.raw() as usize) else {
            return;
        };
        if let Some(el) = self.element(el) {
            slot.observer.observe(&el);
        }
    }

    fn disconnect(&mut self, observer: ObserverId) {
        if let Some(slot) = self.observers.get_mut(observer.raw() as usize) {
            *slot = None;
        }
    }

    fn watch_media(&mut self, query: &str) -> (WatchId, bool) {
        let id = WatchId::from_raw(self.watches.len() as u32);
        let Some(list) = logged("matchMedia", self.window.match_media(query)).flatten() else {
            self.watches.push(None);
            return (id, false);
        };
        let matches = list.matches();
        let sink = Rc::clone(&self.sink);
        let watched = list.clone();
        let listener = Listener::new(&list, "change", move |_event: web_sys::Event| {
            let _ = sink(PageEvent::MediaChange {
                watch: id,
                matches: watched.matches(),
            });
        });
        match listener {
            Ok(listener) => self.watches.push(Some(listener)),
            Err(err) => {
                tracing::warn!(%err, query, "could not watch media query");
                self.watches.push(None);
            }
        }
        (id, matches)
    }

    fn unwatch_media(&mut self, watch: WatchId) {
        if let Some(slot) = self.watches.get_mut(watch.raw() as usize) {
            *slot = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn same_node_interns_to_same_id() {
        let document = web_sys::window().and_then(|w| w.document()).unwrap();
        let registry = Registry::default();
        let a = document.create_element("div").unwrap();
        let b = document.create_element("div").unwrap();

        let ia = registry.intern(a.clone());
        let ib = registry.intern(b.clone());
        assert_ne!(ia, ib);
        assert_eq!(registry.intern(a.clone()), ia);
        assert_eq!(registry.intern(b), ib);
        assert_eq!(registry.elements.borrow().len(), 2);
        assert!(registry.get(ia).is_some_and(|el| el == a));
    }
}
