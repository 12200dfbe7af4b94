#![forbid(unsafe_code)]

//! Browser event pump.
//!
//! The [`App`] lives in a `RefCell` owned by [`Host`]. Every browser callback
//! (DOM events, the single pending `setTimeout`, the single pending animation
//! frame) advances the app clock to `performance.now()`, delivers its work,
//! then re-arms the timeout for the scheduler's next deadline and requests a
//! frame if any controller is waiting for one.
//!
//! Events that arrive while the app is already borrowed are queued and drained
//! by the dispatch in progress; their outcome is always
//! [`EventOutcome::PASS`].

use core::time::Duration;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use folio_core::config::SiteConfig;
use folio_core::error::FolioError;
use folio_core::event::{EventOutcome, PageEvent};
use folio_runtime::App;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, KeyboardEvent, Performance, Window};

use crate::console_layer::{self, BrowserConsole};
use crate::dom::{DomPage, EventSink, Listener, forward};
use crate::input::{DomModifiers, key_event};

fn to_js(err: &FolioError) -> JsValue {
    js_sys::Error::new(&err.to_string()).into()
}

fn clock_ms(performance: Option<&Performance>) -> f64 {
    performance.map_or_else(js_sys::Date::now, Performance::now)
}

struct Host {
    app: RefCell<Option<App<DomPage>>>,
    backlog: RefCell<VecDeque<PageEvent>>,
    window: Window,
    performance: Option<Performance>,
    origin: f64,
    timeout: Cell<Option<i32>>,
    frame: Cell<Option<i32>>,
    on_timeout: Closure<dyn FnMut()>,
    on_frame: Closure<dyn FnMut(f64)>,
    listeners: RefCell<Vec<Listener>>,
}

impl Host {
    fn new(window: Window) -> Rc<Self> {
        let performance = window.performance();
        let origin = clock_ms(performance.as_ref());
        Rc::new_cyclic(|weak: &Weak<Self>| {
            let on_timeout = {
                let weak = weak.clone();
                Closure::<dyn FnMut()>::new(move || {
                    if let Some(host) = weak.upgrade() {
                        host.fire_timeout();
                    }
                })
            };
            let on_frame = {
                let weak = weak.clone();
                Closure::<dyn FnMut(f64)>::new(move |_timestamp: f64| {
                    if let Some(host) = weak.upgrade() {
                        host.fire_frame();
                    }
                })
            };
            Self {
                app: RefCell::new(None),
                backlog: RefCell::new(VecDeque::new()),
                window,
                performance,
                origin,
                timeout: Cell::new(None),
                frame: Cell::new(None),
                on_timeout,
                on_frame,
                listeners: RefCell::new(Vec::new()),
            }
        })
    }

    fn now(&self) -> Duration {
        let elapsed = clock_ms(self.performance.as_ref()) - self.origin;
        Duration::from_secs_f64(elapsed.max(0.0) / 1000.0)
    }

    fn sink(self: &Rc<Self>) -> EventSink {
        let weak = Rc::downgrade(self);
        Rc::new(move |event: PageEvent| {
            weak.upgrade()
                .map_or(EventOutcome::PASS, |host| host.dispatch(event))
        })
    }

    fn dispatch(&self, event: PageEvent) -> EventOutcome {
        let outcome = {
            let Ok(mut slot) = self.app.try_borrow_mut() else {
                self.backlog.borrow_mut().push_back(event);
                return EventOutcome::PASS;
            };
            let Some(app) = slot.as_mut() else {
                return EventOutcome::PASS;
            };
            app.set_time(self.now());
            let outcome = app.handle_event(&event);
            self.drain_backlog(app);
            outcome
        };
        self.pump();
        outcome
    }

    fn drain_backlog(&self, app: &mut App<DomPage>) {
        loop {
            let next = self.backlog.borrow_mut().pop_front();
            let Some(event) = next else {
                break;
            };
            app.handle_event(&event);
        }
    }

    /// Fire due timers, then re-arm the browser callbacks.
    fn pump(&self) {
        let (delay, wants_frame) = {
            let Ok(mut slot) = self.app.try_borrow_mut() else {
                return;
            };
            let Some(app) = slot.as_mut() else {
                return;
            };
            let now = self.now();
            app.set_time(now);
            self.drain_backlog(app);
            (
                app.next_deadline().map(|at| at.saturating_sub(now)),
                app.has_pending_frames(),
            )
        };
        self.arm_timeout(delay);
        if wants_frame {
            self.arm_frame();
        }
    }

    fn arm_timeout(&self, delay: Option<Duration>) {
        if let Some(handle) = self.timeout.take() {
            self.window.clear_timeout_with_handle(handle);
        }
        let Some(delay) = delay else {
            return;
        };
        let ms = (delay.as_secs_f64() * 1000.0).ceil() as i32;
        match self
            .window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                self.on_timeout.as_ref().unchecked_ref(),
                ms,
            ) {
            Ok(handle) => self.timeout.set(Some(handle)),
            Err(err) => tracing::warn!(error = ?err, "setTimeout failed"),
        }
    }

    fn arm_frame(&self) {
        if self.frame.get().is_some() {
            return;
        }
        match self
            .window
            .request_animation_frame(self.on_frame.as_ref().unchecked_ref())
        {
            Ok(id) => self.frame.set(Some(id)),
            Err(err) => tracing::warn!(error = ?err, "requestAnimationFrame failed"),
        }
    }

    fn fire_timeout(&self) {
        self.timeout.set(None);
        self.pump();
    }

    fn fire_frame(&self) {
        self.frame.set(None);
        if let Ok(mut slot) = self.app.try_borrow_mut()
            && let Some(app) = slot.as_mut()
        {
            app.set_time(self.now());
            app.frame();
        }
        self.pump();
    }

    /// Document and window listeners that feed the app.
    fn attach(&self, document: &Document, sink: &EventSink) -> Result<(), FolioError> {
        let mut listeners = self.listeners.borrow_mut();

        let s = Rc::clone(sink);
        listeners.push(Listener::new(document, "DOMContentLoaded", move |event| {
            forward(&s, PageEvent::Ready, &event);
        })?);

        let s = Rc::clone(sink);
        listeners.push(Listener::new(&self.window, "load", move |event| {
            forward(&s, PageEvent::Loaded, &event);
        })?);

        let s = Rc::clone(sink);
        listeners.push(Listener::new(&self.window, "scroll", move |event| {
            forward(&s, PageEvent::Scroll, &event);
        })?);

        let s = Rc::clone(sink);
        listeners.push(Listener::new(document, "keydown", move |event| {
            let Some(key) = event.dyn_ref::<KeyboardEvent>() else {
                return;
            };
            let mods = DomModifiers {
                ctrl: key.ctrl_key(),
                shift: key.shift_key(),
                alt: key.alt_key(),
                meta: key.meta_key(),
            };
            forward(&s, PageEvent::Key(key_event(&key.key(), mods)), &event);
        })?);

        let s = Rc::clone(sink);
        let doc = document.clone();
        listeners.push(Listener::new(document, "visibilitychange", move |event| {
            let hidden = doc.hidden();
            forward(&s, PageEvent::VisibilityChange { hidden }, &event);
        })?);

        Ok(())
    }

    fn disarm(&self) {
        if let Some(handle) = self.timeout.take() {
            self.window.clear_timeout_with_handle(handle);
        }
        if let Some(id) = self.frame.take() {
            let _ = self.window.cancel_animation_frame(id);
        }
    }

    fn teardown(&self) {
        self.listeners.borrow_mut().clear();
        self.disarm();
        self.backlog.borrow_mut().clear();
        match self.app.try_borrow_mut() {
            Ok(mut slot) => {
                if let Some(mut app) = slot.take() {
                    app.shutdown();
                }
            }
            Err(_) => tracing::warn!("destroy called while the page was dispatching"),
        }
    }
}

impl Drop for Host {
    fn drop(&mut self) {
        // The browser must not call back into freed closures.
        self.disarm();
    }
}

/// Handle to a running page, returned by [`boot`].
#[wasm_bindgen]
pub struct FolioHandle {
    host: Option<Rc<Host>>,
}

#[wasm_bindgen]
impl FolioHandle {
    /// Stop every controller and detach from the document. Idempotent.
    pub fn destroy(&mut self) {
        if let Some(host) = self.host.take() {
            host.teardown();
        }
    }

    #[wasm_bindgen(getter, js_name = isRunning)]
    pub fn is_running(&self) -> bool {
        self.host.as_ref().is_some_and(|host| {
            host.app
                .try_borrow()
                .is_ok_and(|app| app.as_ref().is_some_and(App::is_running))
        })
    }

    /// Current theme, `"light"` or `"dark"`.
    #[wasm_bindgen(getter)]
    pub fn theme(&self) -> Option<String> {
        let host = self.host.as_ref()?;
        let app = host.app.try_borrow().ok()?;
        Some(app.as_ref()?.theme().as_str().to_owned())
    }
}

/// Attach the behavior layer to the current document.
///
/// `config_json` overrides the defaults; omitted keys keep their default
/// values. Controllers start on `DOMContentLoaded`, or immediately when the
/// document is already parsed.
#[wasm_bindgen]
pub fn boot(config_json: Option<String>) -> Result<FolioHandle, JsValue> {
    let config = match config_json.as_deref() {
        Some(json) => SiteConfig::from_json(json).map_err(|err| to_js(&err))?,
        None => SiteConfig::default(),
    };
    let window = web_sys::window()
        .ok_or_else(|| to_js(&FolioError::MissingElement("window".to_owned())))?;

    let host = Host::new(window.clone());
    let sink = host.sink();
    let page = DomPage::new(window, Rc::clone(&sink)).map_err(|err| to_js(&err))?;
    let document = page.document().clone();
    *host.app.borrow_mut() = Some(App::new(page, config));
    if let Err(err) = host.attach(&document, &sink) {
        host.teardown();
        return Err(to_js(&err));
    }

    if let Some(app) = host.app.borrow_mut().as_mut() {
        app.set_time(host.now());
        app.boot();
    }
    if document.ready_state() == "complete" {
        // `load` already fired.
        host.dispatch(PageEvent::Loaded);
    } else {
        host.pump();
    }
    Ok(FolioHandle { host: Some(host) })
}

/// Module start hook: panic messages and tracing output go to the console.
#[wasm_bindgen(start)]
pub fn start() {
    use tracing_subscriber::filter::LevelFilter;
    use tracing_subscriber::util::SubscriberInitExt;

    console_error_panic_hook::set_once();
    let _ = console_layer::subscriber(BrowserConsole, LevelFilter::INFO).try_init();
}
