//! Collaborator traits for the collector.
//!
//! The collector owns coalescing and timing; what counts as a relevant
//! change, what blocks a batch, and what happens to a delivered batch are
//! all decided by these externally supplied collaborators.

use std::path::{Path, PathBuf};

/// Decides whether a raw change event is admitted to the pending batch.
///
/// Called once per change event, before anything is recorded. Irrelevant
/// paths never enter the batch and never arm the timer.
pub trait ChangeFilter: Send + Sync {
    fn is_relevant(&self, path: &Path) -> bool;
}

/// Reports whether a pending path currently has a blocking condition
/// (e.g., an unresolved compile error).
///
/// Called once per pending path per dispatch attempt. A single blocked
/// member blocks the whole batch.
pub trait ValidityOracle: Send + Sync {
    fn is_blocked(&self, path: &Path) -> bool;
}

/// Receives a finalized batch.
///
/// Invoked at most once per dispatch cycle with a deduplicated, unordered
/// snapshot of the pending paths.
pub trait BatchConsumer: Send + Sync {
    fn deliver(&self, batch: &[PathBuf]);
}

impl<F> ChangeFilter for F
where
    F: Fn(&Path) -> bool + Send + Sync,
{
    fn is_relevant(&self, path: &Path) -> bool {
        self(path)
    }
}

impl<F> ValidityOracle for F
where
    F: Fn(&Path) -> bool + Send + Sync,
{
    fn is_blocked(&self, path: &Path) -> bool {
        self(path)
    }
}

impl<F> BatchConsumer for F
where
    F: Fn(&[PathBuf]) + Send + Sync,
{
    fn deliver(&self, batch: &[PathBuf]) {
        self(batch)
    }
}
