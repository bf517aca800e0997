//! Debounced, validity-gated batch dispatch for file change events.
//!
//! A [`ChangeCollector`] accumulates changed paths into a deduplicated
//! pending batch, waits for a quiet period after the last distinct change,
//! checks every member against a validity oracle, and hands the whole batch
//! to a consumer in a single call. Batches with a blocked member are requeued
//! wholesale and retried on the next relevant change.

pub mod config;
pub mod dispatch;
pub mod logging;
pub mod source;

pub use config::Settings;
pub use dispatch::{
    BatchConsumer, ChangeCollector, ChangeCollectorBuilder, ChangeFilter, DispatchError,
    ValidityOracle,
};
pub use source::{
    ChangeEvent, ChangeListener, ChangeSource, FsChangeSource, SourceError, Subscription,
};
