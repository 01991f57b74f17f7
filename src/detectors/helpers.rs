//! Common helper functions for extrema-based pattern classification
//!
//! Relative-difference thresholds and confidence scoring shared by the classifiers.

use super::extrema::Extremum;

// ============================================================
// DEFAULT THRESHOLDS
// ============================================================

/// Double-top/bottom peak matching tolerance, in percent
pub const DEFAULT_TOLERANCE_PCT: f64 = 2.0;
/// Extra percent allowed between head-and-shoulders shoulders
pub const DEFAULT_SHOULDER_SLACK: f64 = 5.0;

// ============================================================
// HELPER FUNCTIONS
// ============================================================

/// `|a - b| / |b|`, or `None` when `b` is zero or either value is not finite.
#[inline]
pub fn relative_diff(a: f64, b: f64) -> Option<f64> {
    if !a.is_finite() || !b.is_finite() || b.abs() <= f64::EPSILON {
        return None;
    }
    Some((a - b).abs() / b.abs())
}

/// Confidence of a match whose deviation was accepted under `threshold`.
///
/// Linear from 1.0 (exact match) down to 0.0 (deviation at the threshold).
/// A zero threshold only admits exact matches, which score 1.0.
#[inline]
pub fn match_confidence(deviation: f64, threshold: f64) -> f64 {
    if threshold <= 0.0 {
        return if deviation <= 0.0 { 1.0 } else { 0.0 };
    }
    (1.0 - deviation / threshold).clamp(0.0, 1.0)
}

/// True if some extremum in `sorted` lies strictly between bar indices `after` and `before`.
///
/// `sorted` must be ordered by index, which extraction guarantees.
#[inline]
pub fn has_extremum_between(sorted: &[Extremum], after: usize, before: usize) -> bool {
    let first_after = sorted.partition_point(|e| e.index <= after);
    sorted
        .get(first_after)
        .is_some_and(|e| e.index < before)
}
