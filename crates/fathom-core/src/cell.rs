//! The shared depth cell.
//!
//! The latest depth value is the only shared mutable state in the system:
//! the server holds the authoritative copy, each client holds a mirror.
//! Both are a single `u16`, so an atomic cell covers the whole contract —
//! readers and writers never block each other.

use std::sync::atomic::{AtomicU16, Ordering};

use crate::depth::Depth;

/// A lock-free cell holding the most recent [`Depth`] value.
///
/// Share between tasks with `Arc<DepthCell>`. Reads and writes are single
/// atomic accesses; there is no ordering relationship with any other data,
/// so relaxed ordering suffices.
#[derive(Debug, Default)]
pub struct DepthCell(AtomicU16);

impl DepthCell {
    /// Creates a cell holding `depth`.
    pub fn new(depth: Depth) -> Self {
        DepthCell(AtomicU16::new(depth.get()))
    }

    /// Returns the current value.
    pub fn get(&self) -> Depth {
        Depth::clamped(u32::from(self.0.load(Ordering::Relaxed)))
    }

    /// Stores a new value.
    pub fn set(&self, depth: Depth) {
        self.0.store(depth.get(), Ordering::Relaxed);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
