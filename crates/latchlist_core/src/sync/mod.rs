//! Live task synchronization: change notifications and the local mirror.
//!
//! # Responsibility
//! - Fan out per-identity change events from task storage.
//! - Keep an eventually consistent in-memory snapshot per subscriber.
//!
//! # Invariants
//! - Events carry no payload; subscribers reconcile by re-reading.
//! - Callbacks must be idempotent and assume no ordering relative to the
//!   mutation that triggered them.

pub mod change_feed;
pub mod task_sync;
