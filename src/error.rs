//! Error kinds reported by the viewer core.
//!
//! Everything here is non-fatal: errors are logged and the affected slot (an
//! extension, an asset, a capture request) is simply left out. IO, parsing and
//! GPU setup use `anyhow::Result` and get wrapped into [`ViewerError::LoadFailure`]
//! where they cross into the core.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ViewerError {
    /// A dependency or asset request failed (network, format or decoder error).
    #[error("failed to load {target}: {reason}")]
    LoadFailure { target: String, reason: String },

    /// The asset's file extension has no importer.
    #[error("unsupported file type for model: {url}")]
    UnsupportedFormat { url: String },

    /// Pointer capture was requested while the view had no focus. Retry the gesture.
    #[error("pointer capture denied: the view does not have focus")]
    CaptureDenied,
}

impl ViewerError {
    pub fn load_failure(target: impl Into<String>, reason: &anyhow::Error) -> Self {
        Self::LoadFailure {
            target: target.into(),
            reason: format!("{reason:#}"),
        }
    }
}

/// Aggregate outcome of a resolution pass that did not fully succeed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("extensions failed to load: {failed:?}")]
    Failed { failed: Vec<String> },

    #[error("timed out waiting for extensions: {pending:?} (failed: {failed:?})")]
    TimedOut {
        pending: Vec<String>,
        failed: Vec<String>,
    },
}
