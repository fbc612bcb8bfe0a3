//! Local analog input abstraction.
//!
//! In local mode the depth signal comes straight from an attached analog
//! input (a joystick axis standing in for the hardware sensor) rather than
//! from the network stream. The `AxisSource` trait is the seam: the facade
//! samples it on every `depth()` call and maps the reading through
//! [`fathom_core::depth_from_axis`].
//!
//! A production build plugs in an OS joystick backend here; this crate
//! ships [`MockAxisSource`], which the tests and the headless build use.
//! Enumerating input devices beyond the single depth axis is a non-goal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// A source of normalized analog axis readings.
///
/// Implementations report the current axis position in `[-1.0, 1.0]`
/// (readings outside that range are clamped by the caller). `read_axis` may
/// pump the underlying event queue as a side effect, the way joystick APIs
/// require.
pub trait AxisSource: Send {
    /// Samples the current axis position.
    fn read_axis(&mut self) -> f32;

    /// Releases any input-subsystem handles. Called once on device close.
    fn stop(&mut self) {}
}

/// A settable [`AxisSource`] for tests and headless builds.
///
/// Clones share the same underlying value, so a test can keep one handle to
/// drive the axis while the device owns another.
#[derive(Debug, Clone, Default)]
pub struct MockAxisSource {
    value: Arc<Mutex<f32>>,
    stopped: Arc<AtomicBool>,
}

impl MockAxisSource {
    /// Creates a mock resting at axis 0.0 (mid-travel).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the axis position reported by all clones.
    pub fn set_axis(&self, value: f32) {
        match self.value.lock() {
            Ok(mut guard) => *guard = value,
            Err(poisoned) => *poisoned.into_inner() = value,
        }
    }

    /// Returns whether [`AxisSource::stop`] has been called on any clone.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Relaxed)
    }
}

impl AxisSource for MockAxisSource {
    fn read_axis(&mut self) -> f32 {
        match self.value.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn stop(&mut self) {
        self.stopped.store(true, Ordering::Relaxed);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
