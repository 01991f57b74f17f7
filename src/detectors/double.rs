//! Double top / double bottom
//!
//! Consecutive peaks (troughs) whose values differ by at most `tolerance_pct`
//! relative to the second one, with at least one opposite extremum strictly
//! between them. Only adjacent pairs in the extrema sequence are examined.

use std::collections::HashMap;

use super::helpers::{
    has_extremum_between, match_confidence, relative_diff, DEFAULT_TOLERANCE_PCT,
};
use super::{Extrema, Extremum};
use crate::{
    params::{get_percent, ParamMeta, ParamType, ParameterizedDetector},
    ChartPatternDetector, PatternInstance, PatternType, Percent, Result,
};

impl_with_defaults!(DoubleTopDetector, DoubleBottomDetector);

/// Shared pairing rule: `turns` are the candidate peaks (or troughs),
/// `separators` the opposite extrema that must sit between each pair.
fn detect_pairs(
    turns: &[Extremum],
    separators: &[Extremum],
    tolerance_pct: Percent,
    pattern_type: PatternType,
) -> Vec<PatternInstance> {
    let threshold = tolerance_pct.as_fraction();

    turns
        .windows(2)
        .filter_map(|pair| {
            let (first, second) = (pair[0], pair[1]);
            let deviation = relative_diff(first.value, second.value)?;
            if deviation > threshold {
                return None;
            }
            if !has_extremum_between(separators, first.index, second.index) {
                return None;
            }
            Some(PatternInstance {
                pattern_type,
                anchors: vec![first, second],
                tolerance_pct: tolerance_pct.get(),
                confidence: match_confidence(deviation, threshold),
            })
        })
        .collect()
}

// ============================================================
// DOUBLE TOP
// ============================================================

/// Two level peaks with a valley between them (bearish "M")
#[derive(Debug, Clone)]
pub struct DoubleTopDetector {
    pub tolerance_pct: Percent,
}

impl Default for DoubleTopDetector {
    fn default() -> Self {
        Self {
            tolerance_pct: Percent::new_const(DEFAULT_TOLERANCE_PCT),
        }
    }
}

impl ChartPatternDetector for DoubleTopDetector {
    fn pattern_type(&self) -> PatternType {
        PatternType::DoubleTop
    }

    fn min_extrema(&self) -> usize {
        // two turns and a separator
        3
    }

    fn detect(&self, extrema: &Extrema) -> Vec<PatternInstance> {
        detect_pairs(
            &extrema.maxima,
            &extrema.minima,
            self.tolerance_pct,
            PatternType::DoubleTop,
        )
    }
}

// ============================================================
// DOUBLE BOTTOM
// ============================================================

/// Two level troughs with a peak between them (bullish "W")
#[derive(Debug, Clone)]
pub struct DoubleBottomDetector {
    pub tolerance_pct: Percent,
}

impl Default for DoubleBottomDetector {
    fn default() -> Self {
        Self {
            tolerance_pct: Percent::new_const(DEFAULT_TOLERANCE_PCT),
        }
    }
}

impl ChartPatternDetector for DoubleBottomDetector {
    fn pattern_type(&self) -> PatternType {
        PatternType::DoubleBottom
    }

    fn min_extrema(&self) -> usize {
        // two turns and a separator
        3
    }

    fn detect(&self, extrema: &Extrema) -> Vec<PatternInstance> {
        detect_pairs(
            &extrema.minima,
            &extrema.maxima,
            self.tolerance_pct,
            PatternType::DoubleBottom,
        )
    }
}

// ============================================================
// PARAMETER METADATA
// ============================================================

static DOUBLE_PARAMS: &[ParamMeta] = &[ParamMeta {
    name: "tolerance_pct",
    param_type: ParamType::Percent,
    default: DEFAULT_TOLERANCE_PCT,
    range: (0.5, 5.0, 0.5),
    description: "Maximum relative difference between the two peaks, in percent",
}];

impl ParameterizedDetector for DoubleTopDetector {
    fn param_meta() -> &'static [ParamMeta] {
        DOUBLE_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            tolerance_pct: get_percent(params, "tolerance_pct", DEFAULT_TOLERANCE_PCT)?,
        })
    }

    fn pattern() -> PatternType {
        PatternType::DoubleTop
    }
}

impl ParameterizedDetector for DoubleBottomDetector {
    fn param_meta() -> &'static [ParamMeta] {
        DOUBLE_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            tolerance_pct: get_percent(params, "tolerance_pct", DEFAULT_TOLERANCE_PCT)?,
        })
    }

    fn pattern() -> PatternType {
        PatternType::DoubleBottom
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::ExtremumKind;
    use chrono::NaiveDate;

    fn ext(index: usize, value: f64, kind: ExtremumKind) -> Extremum {
        Extremum {
            index,
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(index as u64),
            value,
            kind,
            order: 1,
        }
    }

    fn max(index: usize, value: f64) -> Extremum {
        ext(index, value, ExtremumKind::Max)
    }

    fn min(index: usize, value: f64) -> Extremum {
        ext(index, value, ExtremumKind::Min)
    }

    #[test]
    fn test_double_top_with_valley() {
        let extrema = Extrema {
            maxima: vec![max(2, 15.0), max(4, 15.2)],
            minima: vec![min(3, 11.0)],
        };
        let found = DoubleTopDetector::with_defaults().detect(&extrema);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].anchors[0].index, 2);
        assert_eq!(found[0].anchors[1].index, 4);
        assert_eq!(found[0].tolerance_pct, 2.0);
        assert!(found[0].confidence > 0.3 && found[0].confidence < 0.4);
    }

    #[test]
    fn test_double_top_needs_valley() {
        let extrema = Extrema {
            maxima: vec![max(2, 15.0), max(4, 15.2)],
            minima: vec![min(5, 11.0)],
        };
        assert!(DoubleTopDetector::with_defaults().detect(&extrema).is_empty());
    }

    #[test]
    fn test_double_top_outside_tolerance() {
        let extrema = Extrema {
            maxima: vec![max(2, 15.0), max(4, 16.0)],
            minima: vec![min(3, 11.0)],
        };
        assert!(DoubleTopDetector::with_defaults().detect(&extrema).is_empty());
    }

    #[test]
    fn test_only_adjacent_peaks_pair() {
        // 1st and 3rd peaks match, but the 2nd sits between them
        let extrema = Extrema {
            maxima: vec![max(1, 20.0), max(3, 30.0), max(5, 20.0)],
            minima: vec![min(2, 10.0), min(4, 10.0)],
        };
        assert!(DoubleTopDetector::with_defaults().detect(&extrema).is_empty());
    }

    #[test]
    fn test_double_bottom() {
        let extrema = Extrema {
            maxima: vec![max(3, 14.0)],
            minima: vec![min(1, 10.0), min(5, 10.1)],
        };
        let found = DoubleBottomDetector::with_defaults().detect(&extrema);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].pattern_type, PatternType::DoubleBottom);
    }

    #[test]
    fn test_exact_match_full_confidence() {
        let extrema = Extrema {
            maxima: vec![max(3, 14.0)],
            minima: vec![min(1, 10.0), min(5, 10.0)],
        };
        let found = DoubleBottomDetector::with_defaults().detect(&extrema);
        assert_eq!(found[0].confidence, 1.0);
    }

    #[test]
    fn test_with_params() {
        let mut params = HashMap::new();
        params.insert("tolerance_pct", 4.0);
        let d = DoubleTopDetector::with_params(&params).unwrap();
        assert_eq!(d.tolerance_pct.get(), 4.0);

        params.insert("tolerance_pct", 150.0);
        assert!(DoubleBottomDetector::with_params(&params).is_err());
    }
}
