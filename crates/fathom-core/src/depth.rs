//! The depth domain type and the local-mode axis mapping.
//!
//! A depth reading is an integer in `[0, 1024]`: 0 is fully retracted,
//! 1024 is fully inserted. The authoritative copy lives in the simulator
//! server; each client mirrors the most recently parsed value.

use std::fmt;

/// The maximum depth value the sensor can report.
pub const DEPTH_MAX: u16 = 1024;

/// A depth reading, clamped to `[0, DEPTH_MAX]`.
///
/// `Depth` is the only value that crosses the wire and the only shared
/// mutable state in the system. Construction always clamps, so a `Depth`
/// in hand is always in range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Depth(u16);

impl Depth {
    /// Creates a `Depth`, saturating values above [`DEPTH_MAX`].
    pub fn clamped(raw: u32) -> Self {
        Depth(raw.min(u32::from(DEPTH_MAX)) as u16)
    }

    /// Returns the raw sensor value.
    #[inline]
    pub fn get(self) -> u16 {
        self.0
    }
}

impl fmt::Display for Depth {
    /// Renders the decimal digits. This is also the wire encoding, see
    /// [`crate::wire::encode_depth`].
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Depth> for u16 {
    fn from(d: Depth) -> u16 {
        d.0
    }
}

/// Maps a normalized analog axis reading to a [`Depth`].
///
/// The axis is clamped to `[-1.0, 1.0]` first, then mapped linearly:
/// `-1.0 → 0`, `0.0 → 512`, `1.0 → 1024`. Intermediate values truncate.
///
/// Used in local mode, where the depth signal comes from an attached analog
/// input rather than the network stream.
pub fn depth_from_axis(axis: f32) -> Depth {
    let axis = axis.clamp(-1.0, 1.0);
    Depth::clamped(((axis + 1.0) * 512.0) as u32)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamped_passes_values_in_range() {
        assert_eq!(Depth::clamped(0).get(), 0);
        assert_eq!(Depth::clamped(512).get(), 512);
        assert_eq!(Depth::clamped(1024).get(), 1024);
    }

    #[test]
    fn test_clamped_saturates_above_max() {
        assert_eq!(Depth::clamped(1025).get(), DEPTH_MAX);
        assert_eq!(Depth::clamped(u32::MAX).get(), DEPTH_MAX);
    }

    #[test]
    fn test_default_is_fully_retracted() {
        assert_eq!(Depth::default().get(), 0);
    }

    #[test]
    fn test_display_renders_decimal_digits() {
        assert_eq!(Depth::clamped(307).to_string(), "307");
        assert_eq!(Depth::default().to_string(), "0");
    }

    #[test]
    fn test_axis_endpoints_map_to_range_endpoints() {
        assert_eq!(depth_from_axis(-1.0).get(), 0);
        assert_eq!(depth_from_axis(0.0).get(), 512);
        assert_eq!(depth_from_axis(1.0).get(), 1024);
    }

    #[test]
    fn test_axis_out_of_range_is_clamped_before_mapping() {
        // A miscalibrated stick can report outside the nominal range.
        assert_eq!(depth_from_axis(-3.5).get(), 0);
        assert_eq!(depth_from_axis(2.0).get(), 1024);
        assert_eq!(depth_from_axis(f32::INFINITY).get(), 1024);
        assert_eq!(depth_from_axis(f32::NEG_INFINITY).get(), 0);
    }

    #[test]
    fn test_axis_mapping_is_monotonic() {
        let mut last = depth_from_axis(-1.0).get();
        let mut axis = -1.0f32;
        while axis <= 1.0 {
            let d = depth_from_axis(axis).get();
            assert!(d >= last, "mapping must not decrease at axis {axis}");
            last = d;
            axis += 0.01;
        }
    }

    #[test]
    fn test_axis_mapping_always_in_sensor_range() {
        for i in -200..=200 {
            let d = depth_from_axis(i as f32 / 100.0);
            assert!(d.get() <= DEPTH_MAX);
        }
    }
}
