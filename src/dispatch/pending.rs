//! Pending batch state: the deduplicated set of changed paths plus the
//! armed flag.
//!
//! Not synchronized itself; the collector guards one instance with a single
//! mutex so that producers and the timer worker never observe a half-updated
//! batch.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Deduplicated set of paths awaiting dispatch, with the "dispatch already
/// scheduled" flag.
#[derive(Debug, Default)]
pub struct PendingBatch {
    pending: HashSet<PathBuf>,
    armed: bool,
}

impl PendingBatch {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a path to the batch.
    ///
    /// Returns `true` if the path was not already pending.
    pub fn insert(&mut self, path: PathBuf) -> bool {
        self.pending.insert(path)
    }

    /// Remove a path from the batch (e.g., the file was deleted).
    pub fn remove(&mut self, path: &Path) {
        self.pending.remove(path);
    }

    /// Whether a dispatch is currently scheduled.
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Mark a dispatch as scheduled.
    pub fn arm(&mut self) {
        self.armed = true;
    }

    /// Take a snapshot of all pending paths, clearing both the batch and
    /// the armed flag.
    ///
    /// The caller processes the snapshot outside the lock and calls
    /// [`merge`](Self::merge) to put it back if the attempt is aborted.
    pub fn drain_snapshot(&mut self) -> Vec<PathBuf> {
        self.armed = false;
        self.pending.drain().collect()
    }

    /// Merge a snapshot back into the batch.
    ///
    /// Paths added since the snapshot was taken are kept; duplicates collapse.
    pub fn merge(&mut self, snapshot: &[PathBuf]) {
        self.pending.extend(snapshot.iter().cloned());
    }

    /// Whether a path is currently pending.
    pub fn contains(&self, path: &Path) -> bool {
        self.pending.contains(path)
    }

    /// Number of pending paths.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
