//! Trend classification
//!
//! Two rules:
//! - **Extrema rule**: compare the last two peaks and the last two valleys.
//!   Lower highs and lower lows is a downtrend, higher highs and higher lows
//!   an uptrend, anything else sideways. Needs two of each.
//! - **Moving-average rule**: the latest short-window average above the
//!   latest long-window average is an uptrend, otherwise a downtrend.

use serde::{Deserialize, Serialize};

use super::Extrema;
use crate::indicators::IndicatorSeries;

/// Coarse trend label
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendLabel {
    Uptrend,
    Downtrend,
    Sideways,
    #[default]
    InsufficientData,
}

impl TrendLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendLabel::Uptrend => "uptrend",
            TrendLabel::Downtrend => "downtrend",
            TrendLabel::Sideways => "sideways",
            TrendLabel::InsufficientData => "insufficient_data",
        }
    }

    #[inline]
    pub fn is_up(self) -> bool {
        matches!(self, TrendLabel::Uptrend)
    }

    #[inline]
    pub fn is_down(self) -> bool {
        matches!(self, TrendLabel::Downtrend)
    }

    /// False only for [`TrendLabel::InsufficientData`]
    #[inline]
    pub fn is_known(self) -> bool {
        !matches!(self, TrendLabel::InsufficientData)
    }
}

impl std::fmt::Display for TrendLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Higher-highs/higher-lows classification over the two most recent peaks and valleys.
pub fn classify_extrema_trend(extrema: &Extrema) -> TrendLabel {
    let (Some(peaks), Some(valleys)) = (extrema.last_maxima(2), extrema.last_minima(2)) else {
        return TrendLabel::InsufficientData;
    };

    let peak_step = peaks[1].value - peaks[0].value;
    let valley_step = valleys[1].value - valleys[0].value;

    if peak_step < 0.0 && valley_step < 0.0 {
        TrendLabel::Downtrend
    } else if peak_step > 0.0 && valley_step > 0.0 {
        TrendLabel::Uptrend
    } else {
        TrendLabel::Sideways
    }
}

/// Short-over-long moving average classification on the latest values.
pub fn classify_ma_trend(short: &IndicatorSeries, long: &IndicatorSeries) -> TrendLabel {
    match (short.last(), long.last()) {
        (Some(s), Some(l)) if s.value > l.value => TrendLabel::Uptrend,
        (Some(_), Some(_)) => TrendLabel::Downtrend,
        _ => TrendLabel::InsufficientData,
    }
}
