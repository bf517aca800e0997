//! Filesystem change source backed by `notify`.

use dashmap::DashMap;
use notify::{Event, EventKind, RecursiveMode, Watcher};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

use super::{ChangeEvent, ChangeListener, ChangeSource, Subscription};

/// Errors from the filesystem source.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Failed to initialize file watcher: {reason}")]
    InitFailed { reason: String },

    #[error("Cannot watch path {path}: {reason}")]
    WatchFailed { path: PathBuf, reason: String },
}

type ListenerMap = DashMap<u64, Arc<dyn ChangeListener>>;

/// Fans out filesystem events to subscribed listeners.
///
/// Create events are reported as [`ChangeEvent::Modified`] since editors
/// commonly save through a temp file plus rename. Removals are delivered
/// immediately; the collector debounces modifications on its own clock.
pub struct FsChangeSource {
    listeners: Arc<ListenerMap>,
    next_id: AtomicU64,
    watcher: Mutex<notify::RecommendedWatcher>,
}

impl FsChangeSource {
    /// Create a source with no watched roots.
    pub fn new() -> Result<Self, SourceError> {
        let listeners: Arc<ListenerMap> = Arc::new(DashMap::new());
        let fanout = Arc::clone(&listeners);

        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => fan_out(&fanout, event),
            Err(e) => tracing::error!("[source] file watch error: {e}"),
        })
        .map_err(|e| SourceError::InitFailed {
            reason: e.to_string(),
        })?;

        Ok(Self {
            listeners,
            next_id: AtomicU64::new(1),
            watcher: Mutex::new(watcher),
        })
    }

    /// Start observing `root` recursively.
    pub fn watch_root(&self, root: &Path) -> Result<(), SourceError> {
        self.watcher
            .lock()
            .watch(root, RecursiveMode::Recursive)
            .map_err(|e| SourceError::WatchFailed {
                path: root.to_path_buf(),
                reason: e.to_string(),
            })?;

        crate::debug_event!("source", "watching", "{}", root.display());
        Ok(())
    }

    /// Number of current subscribers.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl ChangeSource for FsChangeSource {
    fn subscribe(&self, listener: Arc<dyn ChangeListener>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.listeners.insert(id, listener);
        crate::debug_event!("source", "subscribed", "id {id}");
        Subscription::new(id)
    }

    fn unsubscribe(&self, subscription: &Subscription) {
        self.listeners.remove(&subscription.id());
        crate::debug_event!("source", "unsubscribed", "id {}", subscription.id());
    }
}

fn fan_out(listeners: &ListenerMap, event: Event) {
    let Event { kind, paths, .. } = event;

    for path in paths {
        let change = match kind {
            EventKind::Create(_) | EventKind::Modify(_) => ChangeEvent::Modified(path),
            EventKind::Remove(_) => ChangeEvent::Removed(path),
            _ => continue,
        };

        for listener in listeners.iter() {
            listener.value().on_event(&change);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingListener {
        seen: AtomicU64,
    }

    impl ChangeListener for CountingListener {
        fn on_event(&self, _event: &ChangeEvent) {
            self.seen.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn subscriptions_get_distinct_ids() {
        let source = FsChangeSource::new().unwrap();

        let a = source.subscribe(Arc::new(CountingListener {
            seen: AtomicU64::new(0),
        }));
        let b = source.subscribe(Arc::new(CountingListener {
            seen: AtomicU64::new(0),
        }));

        assert_ne!(a.id(), b.id());
        assert_eq!(source.listener_count(), 2);
    }

    #[test]
    fn unsubscribe_removes_only_the_given_handle() {
        let source = FsChangeSource::new().unwrap();

        let a = source.subscribe(Arc::new(CountingListener {
            seen: AtomicU64::new(0),
        }));
        let b = source.subscribe(Arc::new(CountingListener {
            seen: AtomicU64::new(0),
        }));

        source.unsubscribe(&a);
        assert_eq!(source.listener_count(), 1);

        // Unknown handle is a no-op
        source.unsubscribe(&a);
        assert_eq!(source.listener_count(), 1);

        source.unsubscribe(&b);
        assert_eq!(source.listener_count(), 0);
    }

    #[test]
    fn fan_out_maps_event_kinds() {
        use notify::event::{CreateKind, ModifyKind, RemoveKind};
        use parking_lot::Mutex as PlMutex;

        struct Recorder {
            events: PlMutex<Vec<ChangeEvent>>,
        }

        impl ChangeListener for Recorder {
            fn on_event(&self, event: &ChangeEvent) {
                self.events.lock().push(event.clone());
            }
        }

        let listeners: ListenerMap = DashMap::new();
        let recorder = Arc::new(Recorder {
            events: PlMutex::new(Vec::new()),
        });
        listeners.insert(1, recorder.clone() as Arc<dyn ChangeListener>);

        fan_out(
            &listeners,
            Event::new(EventKind::Create(CreateKind::File)).add_path(PathBuf::from("/new.rs")),
        );
        fan_out(
            &listeners,
            Event::new(EventKind::Modify(ModifyKind::Any)).add_path(PathBuf::from("/mod.rs")),
        );
        fan_out(
            &listeners,
            Event::new(EventKind::Remove(RemoveKind::File)).add_path(PathBuf::from("/gone.rs")),
        );
        fan_out(
            &listeners,
            Event::new(EventKind::Access(notify::event::AccessKind::Any))
                .add_path(PathBuf::from("/read.rs")),
        );

        let events = recorder.events.lock();
        assert_eq!(
            *events,
            vec![
                ChangeEvent::Modified(PathBuf::from("/new.rs")),
                ChangeEvent::Modified(PathBuf::from("/mod.rs")),
                ChangeEvent::Removed(PathBuf::from("/gone.rs")),
            ]
        );
    }
}
