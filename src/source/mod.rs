//! Change-notification sources.
//!
//! A [`ChangeSource`] delivers modification and removal events to
//! subscribed listeners. Subscriptions are explicit handles: callers store
//! the [`Subscription`] returned by [`subscribe`](ChangeSource::subscribe)
//! and pass it back to [`unsubscribe`](ChangeSource::unsubscribe).

mod fs;

pub use fs::{FsChangeSource, SourceError};

use std::path::PathBuf;
use std::sync::Arc;

/// A change to a tracked path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// The path's content changed (or it was created).
    Modified(PathBuf),
    /// The path was deleted.
    Removed(PathBuf),
}

impl ChangeEvent {
    /// The path this event refers to.
    pub fn path(&self) -> &std::path::Path {
        match self {
            ChangeEvent::Modified(path) | ChangeEvent::Removed(path) => path,
        }
    }
}

/// Receives events from a [`ChangeSource`].
///
/// May be called from arbitrary threads.
pub trait ChangeListener: Send + Sync {
    fn on_event(&self, event: &ChangeEvent);
}

/// Handle identifying one subscription on one source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subscription {
    id: u64,
}

impl Subscription {
    /// Create a handle with the given source-assigned id.
    pub fn new(id: u64) -> Self {
        Self { id }
    }

    /// The source-assigned id.
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Something that emits [`ChangeEvent`]s to subscribers.
pub trait ChangeSource: Send + Sync {
    /// Register a listener, returning a handle for later removal.
    fn subscribe(&self, listener: Arc<dyn ChangeListener>) -> Subscription;

    /// Remove a previously registered listener. Unknown handles are a no-op.
    fn unsubscribe(&self, subscription: &Subscription);
}
