#![forbid(unsafe_code)]

//! Browser host for the Folio behavior layer.
//!
//! Exposes a small `wasm-bindgen` surface:
//! - `boot(configJson?)` attaches the runtime to the current document and
//!   returns a `FolioHandle`,
//! - `FolioHandle.destroy()` stops every controller and detaches listeners,
//! - a start hook routes panics and `tracing` output to the browser console.
//!
//! [`console_layer`] and [`input`] have no browser dependency and build on
//! every target; the DOM binding and the event pump exist only on wasm32.

pub mod console_layer;
pub mod input;

#[cfg(target_arch = "wasm32")]
mod dom;
#[cfg(target_arch = "wasm32")]
mod host;

#[cfg(target_arch = "wasm32")]
pub use host::{FolioHandle, boot};

/// Native builds compile this crate as a stub so `cargo check --workspace` stays
/// green on non-wasm targets.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Default)]
pub struct FolioHandle;

#[cfg(not(target_arch = "wasm32"))]
impl FolioHandle {
    pub fn destroy(&mut self) {}

    pub fn is_running(&self) -> bool {
        false
    }
}
