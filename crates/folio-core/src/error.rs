#![forbid(unsafe_code)]

//! Error type shared by the workspace.
//!
//! Runtime behavior never fails on a missing element (controllers no-op);
//! errors surface only at the edges: configuration parsing and host setup.

use core::fmt;

/// Folio error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolioError {
    /// Configuration could not be parsed or failed validation.
    InvalidConfig(String),
    /// A required element was not found.
    MissingElement(String),
    /// The host DOM raised an exception.
    Dom(String),
}

impl fmt::Display for FolioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Self::MissingElement(what) => write!(f, "element not found: {what}"),
            Self::Dom(msg) => write!(f, "dom error: {msg}"),
        }
    }
}

impl std::error::Error for FolioError {}

impl From<serde_json::Error> for FolioError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidConfig(err.to_string())
    }
}
