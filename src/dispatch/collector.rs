//! The change collector: admission, coalescing, and the dispatch cycle.

use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

use crate::source::{ChangeEvent, ChangeListener, ChangeSource, Subscription};

use super::error::DispatchError;
use super::gate::{BatchConsumer, ChangeFilter, ValidityOracle};
use super::pending::PendingBatch;
use super::timer::DelayTimer;

/// Collects relevant change events into a pending batch and dispatches the
/// batch after a quiet period, gated on a validity oracle.
///
/// Change notifications may arrive from arbitrary threads; the pending batch
/// and armed flag live behind a single mutex. The oracle and consumer run on
/// the timer task, outside that mutex, against a snapshot of the batch.
///
/// Cheap to clone; clones share the same pending batch and timer.
#[derive(Clone)]
pub struct ChangeCollector {
    inner: Arc<CollectorInner>,
}

struct CollectorInner {
    batch: Mutex<PendingBatch>,
    timer: DelayTimer,
    filter: Arc<dyn ChangeFilter>,
    oracle: Arc<dyn ValidityOracle>,
    consumer: Arc<dyn BatchConsumer>,
    source: Arc<dyn ChangeSource>,
    subscription: Mutex<Option<Subscription>>,
}

impl ChangeCollector {
    /// Create a builder for configuring the collector.
    pub fn builder() -> ChangeCollectorBuilder {
        ChangeCollectorBuilder::new()
    }

    /// Record a change to `path`.
    ///
    /// Irrelevant paths (per the configured [`ChangeFilter`]) are ignored.
    /// A relevant change re-arms the dispatch timer, except when the path is
    /// already pending and a dispatch is armed; the original deadline is kept
    /// then, so one file changing repeatedly cannot postpone dispatch forever.
    pub fn notify_changed(&self, path: &Path) {
        CollectorInner::record_change(&self.inner, path);
    }

    /// Record that `path` was deleted.
    ///
    /// Removes it from the pending batch in every state; deleted paths never
    /// appear in a dispatch. Honored even while deactivated.
    pub fn notify_removed(&self, path: &Path) {
        self.inner.record_removal(path);
    }

    /// Subscribe to the change source. Idempotent.
    pub fn activate(&self) {
        let mut slot = self.inner.subscription.lock();
        if slot.is_none() {
            let listener: Arc<dyn ChangeListener> = Arc::new(CollectorListener {
                inner: Arc::clone(&self.inner),
            });
            *slot = Some(self.inner.source.subscribe(listener));
            crate::debug_event!("dispatch", "activated");
        }
    }

    /// Unsubscribe from the change source. Idempotent.
    ///
    /// An already-armed timer keeps its deadline; only the event feed stops.
    pub fn deactivate(&self) {
        let mut slot = self.inner.subscription.lock();
        if let Some(subscription) = slot.take() {
            self.inner.source.unsubscribe(&subscription);
            crate::debug_event!("dispatch", "deactivated");
        }
    }

    /// Whether the collector is currently subscribed to its change source.
    pub fn is_active(&self) -> bool {
        self.inner.subscription.lock().is_some()
    }

    /// Number of paths currently awaiting dispatch.
    pub fn pending_count(&self) -> usize {
        self.inner.batch.lock().len()
    }
}

impl CollectorInner {
    fn record_change(inner: &Arc<Self>, path: &Path) {
        if !inner.filter.is_relevant(path) {
            crate::debug_event!("dispatch", "ignored", "{}", path.display());
            return;
        }

        {
            let mut batch = inner.batch.lock();
            let inserted = batch.insert(path.to_path_buf());
            if !inserted && batch.is_armed() {
                return;
            }
            batch.arm();
        }

        let task_inner = Arc::clone(inner);
        inner.timer.rearm(move || task_inner.run_dispatch());
        crate::debug_event!("dispatch", "armed", "{}", path.display());
    }

    fn record_removal(&self, path: &Path) {
        let mut batch = self.batch.lock();
        batch.remove(path);
        crate::debug_event!("dispatch", "dropped", "{}", path.display());
    }

    /// One dispatch cycle: snapshot under lock, gate and deliver outside it.
    ///
    /// Changes arriving while the oracle or consumer runs land in the fresh
    /// batch; if the snapshot is requeued the two merge under the lock.
    fn run_dispatch(&self) {
        let snapshot = { self.batch.lock().drain_snapshot() };
        if snapshot.is_empty() {
            // Everything was deleted before the deadline
            return;
        }

        for path in &snapshot {
            if self.oracle.is_blocked(path) {
                // One blocked member holds back the whole batch. No rearm
                // here: the next relevant change restarts the clock.
                crate::log_event!(
                    "dispatch",
                    "requeued",
                    "{} blocked, holding {} paths",
                    path.display(),
                    snapshot.len()
                );
                self.batch.lock().merge(&snapshot);
                return;
            }
        }

        crate::log_event!("dispatch", "delivered", "{} paths", snapshot.len());
        self.consumer.deliver(&snapshot);
    }
}

/// Routes source events to the collector.
struct CollectorListener {
    inner: Arc<CollectorInner>,
}

impl ChangeListener for CollectorListener {
    fn on_event(&self, event: &ChangeEvent) {
        match event {
            ChangeEvent::Modified(path) => CollectorInner::record_change(&self.inner, path),
            ChangeEvent::Removed(path) => self.inner.record_removal(path),
        }
    }
}

/// Everything accepted by default, nothing blocked by default.
struct AcceptAll;

impl ChangeFilter for AcceptAll {
    fn is_relevant(&self, _path: &Path) -> bool {
        true
    }
}

struct NeverBlocked;

impl ValidityOracle for NeverBlocked {
    fn is_blocked(&self, _path: &Path) -> bool {
        false
    }
}

/// Builder for constructing a [`ChangeCollector`].
pub struct ChangeCollectorBuilder {
    delay: Duration,
    filter: Option<Arc<dyn ChangeFilter>>,
    oracle: Option<Arc<dyn ValidityOracle>>,
    consumer: Option<Arc<dyn BatchConsumer>>,
    source: Option<Arc<dyn ChangeSource>>,
}

impl ChangeCollectorBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            delay: Duration::from_millis(crate::config::DispatchConfig::default().delay_ms),
            filter: None,
            oracle: None,
            consumer: None,
            source: None,
        }
    }

    /// Set the quiet period after the last distinct change.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Set the quiet period in milliseconds.
    pub fn delay_ms(mut self, ms: u64) -> Self {
        self.delay = Duration::from_millis(ms);
        self
    }

    /// Set the relevance filter. Defaults to accepting every path.
    pub fn filter(mut self, filter: impl ChangeFilter + 'static) -> Self {
        self.filter = Some(Arc::new(filter));
        self
    }

    /// Set the validity oracle. Defaults to blocking nothing.
    pub fn oracle(mut self, oracle: impl ValidityOracle + 'static) -> Self {
        self.oracle = Some(Arc::new(oracle));
        self
    }

    /// Set the batch consumer. Required.
    pub fn consumer(mut self, consumer: impl BatchConsumer + 'static) -> Self {
        self.consumer = Some(Arc::new(consumer));
        self
    }

    /// Set the change source to subscribe to. Required.
    pub fn source(mut self, source: Arc<dyn ChangeSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Build the collector.
    ///
    /// Must be called from within a tokio runtime; the dispatch timer runs
    /// on it.
    pub fn build(self) -> Result<ChangeCollector, DispatchError> {
        let consumer = self.consumer.ok_or_else(|| DispatchError::BuildFailed {
            reason: "Consumer is required".to_string(),
        })?;

        let source = self.source.ok_or_else(|| DispatchError::BuildFailed {
            reason: "Change source is required".to_string(),
        })?;

        let runtime = Handle::try_current().map_err(|e| DispatchError::NoRuntime {
            reason: e.to_string(),
        })?;

        Ok(ChangeCollector {
            inner: Arc::new(CollectorInner {
                batch: Mutex::new(PendingBatch::new()),
                timer: DelayTimer::new(runtime, self.delay),
                filter: self.filter.unwrap_or_else(|| Arc::new(AcceptAll)),
                oracle: self.oracle.unwrap_or_else(|| Arc::new(NeverBlocked)),
                consumer,
                source,
                subscription: Mutex::new(None),
            }),
        })
    }
}

impl Default for ChangeCollectorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashmap::DashMap;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[derive(Default)]
    struct NullSource {
        listeners: DashMap<u64, Arc<dyn ChangeListener>>,
        next_id: AtomicU64,
    }

    impl ChangeSource for NullSource {
        fn subscribe(&self, listener: Arc<dyn ChangeListener>) -> Subscription {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            self.listeners.insert(id, listener);
            Subscription::new(id)
        }

        fn unsubscribe(&self, subscription: &Subscription) {
            self.listeners.remove(&subscription.id());
        }
    }

    fn collector_with(source: Arc<NullSource>) -> ChangeCollector {
        ChangeCollector::builder()
            .delay_ms(100)
            .consumer(|_batch: &[PathBuf]| {})
            .source(source)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn activate_and_deactivate_are_idempotent() {
        let source = Arc::new(NullSource::default());
        let collector = collector_with(Arc::clone(&source));

        assert!(!collector.is_active());

        collector.activate();
        collector.activate();
        assert!(collector.is_active());
        assert_eq!(source.listeners.len(), 1);

        collector.deactivate();
        collector.deactivate();
        assert!(!collector.is_active());
        assert_eq!(source.listeners.len(), 0);
    }

    #[tokio::test]
    async fn irrelevant_paths_never_enter_the_batch() {
        let source = Arc::new(NullSource::default());
        let collector = ChangeCollector::builder()
            .delay_ms(100)
            .filter(|path: &Path| path.extension().is_some_and(|ext| ext == "rs"))
            .consumer(|_batch: &[PathBuf]| {})
            .source(source)
            .build()
            .unwrap();

        collector.notify_changed(Path::new("/project/notes.txt"));
        assert_eq!(collector.pending_count(), 0);

        collector.notify_changed(Path::new("/project/main.rs"));
        assert_eq!(collector.pending_count(), 1);
    }

    #[tokio::test]
    async fn removal_drops_path_while_deactivated() {
        let source = Arc::new(NullSource::default());
        let collector = collector_with(source);

        collector.notify_changed(Path::new("/project/main.rs"));
        assert_eq!(collector.pending_count(), 1);

        // Deletion is honored regardless of activation state
        collector.notify_removed(Path::new("/project/main.rs"));
        assert_eq!(collector.pending_count(), 0);
    }

    #[tokio::test]
    async fn build_requires_consumer_and_source() {
        let missing_consumer = ChangeCollector::builder()
            .source(Arc::new(NullSource::default()))
            .build();
        assert!(matches!(
            missing_consumer,
            Err(DispatchError::BuildFailed { .. })
        ));

        let missing_source = ChangeCollector::builder()
            .consumer(|_batch: &[PathBuf]| {})
            .build();
        assert!(matches!(
            missing_source,
            Err(DispatchError::BuildFailed { .. })
        ));
    }
}
