//! Debounced batch dispatch with a validity gate.
//!
//! # Architecture
//!
//! ```text
//! change events
//!      |
//! ChangeCollector
//!   - ChangeFilter admits relevant paths
//!   - PendingBatch (deduplicated, mutex-guarded)
//!   - DelayTimer (one-shot, cancel + rearm)
//!      |
//! timer fires -> snapshot batch
//!      |
//! ValidityOracle: any member blocked?
//!   yes -> merge snapshot back, wait for next change
//!   no  -> BatchConsumer::deliver(snapshot), exactly once
//! ```

mod collector;
mod error;
mod gate;
mod pending;
mod timer;

pub use collector::{ChangeCollector, ChangeCollectorBuilder};
pub use error::DispatchError;
pub use gate::{BatchConsumer, ChangeFilter, ValidityOracle};
pub use pending::PendingBatch;
pub use timer::DelayTimer;
