#![forbid(unsafe_code)]

//! Tracing layer that writes formatted events to the browser console.
//!
//! Each event becomes one line, `[folio] LEVEL message key=value ...`, sent to
//! the console method matching its level (`console.error` for errors,
//! `console.warn` for warnings, and so on) so browser devtools filter them
//! natively. The sink is a trait so the formatting can be exercised off-wasm.
//!
//! # Example
//!
//! ```
//! use folio_web::console_layer::{CaptureConsole, subscriber};
//! use tracing_subscriber::filter::LevelFilter;
//!
//! let sink = CaptureConsole::new();
//! tracing::subscriber::with_default(subscriber(sink.clone(), LevelFilter::INFO), || {
//!     tracing::warn!(selector = "#typingText", "element missing");
//! });
//! assert_eq!(sink.lines()[0].1, "[folio] WARN element missing selector=#typingText");
//! ```

use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::{Context, SubscriberExt};

/// Prefix put in front of every console line.
pub const LINE_PREFIX: &str = "[folio]";

/// Destination for formatted log lines.
pub trait ConsoleSink: Send + Sync + 'static {
    fn emit(&self, level: Level, line: &str);
}

/// Display options for [`ConsoleLayer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsoleConfig {
    /// Show the level name. Default: true.
    pub show_level: bool,
    /// Show the event target (module path). Default: false.
    pub show_target: bool,
    /// Show structured fields beyond `message`. Default: true.
    pub show_fields: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            show_level: true,
            show_target: false,
            show_fields: true,
        }
    }
}

fn level_str(level: Level) -> &'static str {
    match level {
        Level::ERROR => "ERROR",
        Level::WARN => "WARN",
        Level::INFO => "INFO",
        Level::DEBUG => "DEBUG",
        Level::TRACE => "TRACE",
    }
}

/// Collects the message and structured fields of one event.
#[derive(Default)]
struct EventVisitor {
    message: Option<String>,
    fields: Vec<(String, String)>,
}

impl EventVisitor {
    fn push(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = Some(value);
        } else {
            self.fields.push((field.name().to_owned(), value));
        }
    }
}

impl Visit for EventVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let rendered = format!("{value:?}");
        self.push(field, strip_debug_quotes(&rendered).to_owned());
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.push(field, value.to_owned());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.push(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.push(field, value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.push(field, value.to_string());
    }
}

fn strip_debug_quotes(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(s)
}

/// A `tracing_subscriber::Layer` that formats events as single lines and
/// hands them to a [`ConsoleSink`].
pub struct ConsoleLayer<S> {
    sink: S,
    config: ConsoleConfig,
}

impl<S: ConsoleSink> ConsoleLayer<S> {
    pub fn new(sink: S) -> Self {
        Self::with_config(sink, ConsoleConfig::default())
    }

    pub fn with_config(sink: S, config: ConsoleConfig) -> Self {
        Self { sink, config }
    }

    #[must_use]
    pub fn show_target(mut self, show: bool) -> Self {
        self.config.show_target = show;
        self
    }

    #[must_use]
    pub fn show_fields(mut self, show: bool) -> Self {
        self.config.show_fields = show;
        self
    }

    fn format(&self, event: &Event<'_>) -> String {
        let meta = event.metadata();
        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        let mut line = String::from(LINE_PREFIX);
        if self.config.show_level {
            line.push(' ');
            line.push_str(level_str(*meta.level()));
        }
        if self.config.show_target {
            line.push(' ');
            line.push_str(meta.target());
            line.push(':');
        }
        if let Some(message) = visitor.message {
            line.push(' ');
            line.push_str(&message);
        }
        if self.config.show_fields {
            for (name, value) in &visitor.fields {
                line.push(' ');
                line.push_str(name);
                line.push('=');
                line.push_str(value);
            }
        }
        line
    }
}

impl<S, Sub> Layer<Sub> for ConsoleLayer<S>
where
    S: ConsoleSink,
    Sub: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, Sub>) {
        let line = self.format(event);
        self.sink.emit(*event.metadata().level(), &line);
    }
}

/// Registry with a [`ConsoleLayer`] over `sink`, dropping events above
/// `max_level`.
pub fn subscriber<S: ConsoleSink>(
    sink: S,
    max_level: LevelFilter,
) -> impl Subscriber + Send + Sync + 'static {
    tracing_subscriber::registry()
        .with(ConsoleLayer::new(sink))
        .with(max_level)
}

/// Sink that keeps every line in memory. Clones share the buffer.
#[derive(Debug, Clone, Default)]
pub struct CaptureConsole {
    lines: Arc<Mutex<Vec<(Level, String)>>>,
}

impl CaptureConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the captured lines.
    pub fn lines(&self) -> Vec<(Level, String)> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }
}

impl ConsoleSink for CaptureConsole {
    fn emit(&self, level: Level, line: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push((level, line.to_owned()));
        }
    }
}

/// Sink that writes to `window.console`.
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserConsole;

#[cfg(target_arch = "wasm32")]
impl ConsoleSink for BrowserConsole {
    fn emit(&self, level: Level, line: &str) {
        let value = wasm_bindgen::JsValue::from_str(line);
        match level {
            Level::ERROR => web_sys::console::error_1(&value),
            Level::WARN => web_sys::console::warn_1(&value),
            Level::INFO => web_sys::console::info_1(&value),
            Level::DEBUG | Level::TRACE => web_sys::console::debug_1(&value),
        }
    }
}
