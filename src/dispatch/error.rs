//! Error types for the dispatch system.

use thiserror::Error;

/// Errors from collector construction.
///
/// The collector's runtime operations are infallible; collaborator panics
/// propagate to the triggering caller and are not caught here.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Failed to build collector: {reason}")]
    BuildFailed { reason: String },

    #[error("No tokio runtime available: {reason}")]
    NoRuntime { reason: String },
}
