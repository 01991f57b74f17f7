//! Head and shoulders
//!
//! Every consecutive triple of peaks `(s1, h, s2)` where the head strictly
//! exceeds both shoulders and `|s1 - s2| / s2` stays within
//! `tolerance_pct + shoulder_slack` percent.

use std::collections::HashMap;

use super::helpers::{
    match_confidence, relative_diff, DEFAULT_SHOULDER_SLACK, DEFAULT_TOLERANCE_PCT,
};
use super::Extrema;
use crate::{
    params::{get_percent, ParamMeta, ParameterizedDetector},
    ChartPatternDetector, PatternInstance, PatternType, Percent, Result,
};

impl_with_defaults!(HeadAndShouldersDetector);

/// Three peaks, the middle one highest, shoulders roughly level
#[derive(Debug, Clone)]
pub struct HeadAndShouldersDetector {
    pub tolerance_pct: Percent,
    /// Added to `tolerance_pct` for the shoulder comparison
    pub shoulder_slack: Percent,
}

impl Default for HeadAndShouldersDetector {
    fn default() -> Self {
        Self {
            tolerance_pct: Percent::new_const(DEFAULT_TOLERANCE_PCT),
            shoulder_slack: Percent::new_const(DEFAULT_SHOULDER_SLACK),
        }
    }
}

impl HeadAndShouldersDetector {
    /// Shoulder threshold as a fraction
    pub fn shoulder_threshold(&self) -> f64 {
        (self.tolerance_pct.get() + self.shoulder_slack.get()) / 100.0
    }
}

impl ChartPatternDetector for HeadAndShouldersDetector {
    fn pattern_type(&self) -> PatternType {
        PatternType::HeadAndShoulders
    }

    fn min_extrema(&self) -> usize {
        3
    }

    fn detect(&self, extrema: &Extrema) -> Vec<PatternInstance> {
        let threshold = self.shoulder_threshold();

        extrema
            .maxima
            .windows(3)
            .filter_map(|triple| {
                let (left, head, right) = (triple[0], triple[1], triple[2]);
                if head.value <= left.value || head.value <= right.value {
                    return None;
                }
                let deviation = relative_diff(left.value, right.value)?;
                if deviation > threshold {
                    return None;
                }
                Some(PatternInstance {
                    pattern_type: PatternType::HeadAndShoulders,
                    anchors: vec![left, head, right],
                    tolerance_pct: self.tolerance_pct.get(),
                    confidence: match_confidence(deviation, threshold),
                })
            })
            .collect()
    }
}

static HEAD_SHOULDERS_PARAMS: &[ParamMeta] = &[
    ParamMeta::percent(
        "tolerance_pct",
        DEFAULT_TOLERANCE_PCT,
        (0.5, 5.0, 0.5),
        "Base matching tolerance, in percent",
    ),
    ParamMeta::percent(
        "shoulder_slack",
        DEFAULT_SHOULDER_SLACK,
        (0.0, 10.0, 1.0),
        "Extra percent allowed between the shoulders",
    ),
];

impl ParameterizedDetector for HeadAndShouldersDetector {
    fn param_meta() -> &'static [ParamMeta] {
        HEAD_SHOULDERS_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            tolerance_pct: get_percent(params, "tolerance_pct", DEFAULT_TOLERANCE_PCT)?,
            shoulder_slack: get_percent(params, "shoulder_slack", DEFAULT_SHOULDER_SLACK)?,
        })
    }

    fn pattern() -> PatternType {
        PatternType::HeadAndShoulders
    }
}
