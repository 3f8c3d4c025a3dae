//! Engine error types
//!
//! Construction-time misconfiguration is fatal and surfaces here immediately.
//! Common per-frame conditions (a full particle pool during an emit, a zoom
//! request outside its clamp range) are not errors: the engine degrades the
//! effect and keeps running.

use thiserror::Error;

use crate::pool::Handle;

/// Errors surfaced by the engine core.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineError {
    /// A stale or already-released handle was dereferenced.
    #[error("stale or released handle {0:?}")]
    InvalidHandle(Handle),

    /// A fixed-capacity pool has no free slot and growth is disabled.
    #[error("object pool exhausted (capacity {capacity})")]
    PoolExhausted {
        /// Configured pool capacity.
        capacity: usize,
    },

    /// A configuration value was rejected at construction.
    #[error("configuration value out of range: {0}")]
    OutOfRangeConfig(&'static str),
}
