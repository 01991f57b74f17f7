//! Local extrema extraction
//!
//! An index `i` is a local maximum of order `k` when `S[i] >= S[j]` for every
//! `j` in `[i-k, i+k]`, `j != i` (minima use `<=`). Only indices with `k`
//! neighbours on both sides are considered, so a series shorter than
//! `2k + 1` yields nothing.
//!
//! The comparison is non-strict by default: plateaus register every point of
//! sufficient margin as an extremum, adjacent equal values included.
//! [`ExtremaMode::Strict`] switches to `>`/`<`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{OHLCVExt, Period, PriceField, OHLCV};

/// Extrema order used when none is configured
pub const DEFAULT_ORDER: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtremumKind {
    Max,
    Min,
}

/// Comparison convention inside the window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtremaMode {
    /// `>=` / `<=`; equal neighbours do not disqualify a point
    #[default]
    NonStrict,
    /// `>` / `<`; any equal neighbour disqualifies a point
    Strict,
}

/// Which price columns the extrema are taken from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtremaSource {
    /// Close prices for both maxima and minima
    #[default]
    Close,
    /// Highs for maxima, lows for minima
    HighLow,
}

impl ExtremaSource {
    fn fields(self) -> (PriceField, PriceField) {
        match self {
            ExtremaSource::Close => (PriceField::Close, PriceField::Close),
            ExtremaSource::HighLow => (PriceField::High, PriceField::Low),
        }
    }
}

/// A detected local maximum or minimum.
///
/// Serializes as `{timestamp, value}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Extremum {
    #[serde(skip)]
    pub index: usize,
    pub timestamp: NaiveDate,
    pub value: f64,
    #[serde(skip)]
    pub kind: ExtremumKind,
    /// Half-window size used to detect it
    #[serde(skip)]
    pub order: usize,
}

/// Indices of local extrema in a plain slice, each list ascending
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtremaIndices {
    pub maxima: Vec<usize>,
    pub minima: Vec<usize>,
}

/// Maxima and minima of a price series, each in time order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Extrema {
    pub maxima: Vec<Extremum>,
    pub minima: Vec<Extremum>,
}

impl Extrema {
    pub fn is_empty(&self) -> bool {
        self.maxima.is_empty() && self.minima.is_empty()
    }

    pub fn len(&self) -> usize {
        self.maxima.len() + self.minima.len()
    }

    /// The most recent `n` maxima, oldest first. `None` if fewer exist.
    pub fn last_maxima(&self, n: usize) -> Option<&[Extremum]> {
        self.maxima.len().checked_sub(n).map(|s| &self.maxima[s..])
    }

    /// The most recent `n` minima, oldest first. `None` if fewer exist.
    pub fn last_minima(&self, n: usize) -> Option<&[Extremum]> {
        self.minima.len().checked_sub(n).map(|s| &self.minima[s..])
    }
}

// ============================================================
// SLICE KERNELS
// ============================================================

fn window_extrema<F>(values: &[f64], order: usize, keep: F) -> Vec<usize>
where
    F: Fn(f64, f64) -> bool,
{
    let n = values.len();
    if n <= order.saturating_mul(2) {
        return Vec::new();
    }

    (order..n - order)
        .filter(|&i| {
            let center = values[i];
            values[i - order..=i + order]
                .iter()
                .enumerate()
                .all(|(j, &v)| j == order || keep(center, v))
        })
        .collect()
}

/// Indices of local maxima of `values`
pub fn local_maxima(values: &[f64], order: Period, mode: ExtremaMode) -> Vec<usize> {
    match mode {
        ExtremaMode::NonStrict => window_extrema(values, order.get(), |c, v| c >= v),
        ExtremaMode::Strict => window_extrema(values, order.get(), |c, v| c > v),
    }
}

/// Indices of local minima of `values`
pub fn local_minima(values: &[f64], order: Period, mode: ExtremaMode) -> Vec<usize> {
    match mode {
        ExtremaMode::NonStrict => window_extrema(values, order.get(), |c, v| c <= v),
        ExtremaMode::Strict => window_extrema(values, order.get(), |c, v| c < v),
    }
}

/// Maxima and minima indices of a single slice
pub fn extrema_indices(values: &[f64], order: Period, mode: ExtremaMode) -> ExtremaIndices {
    ExtremaIndices {
        maxima: local_maxima(values, order, mode),
        minima: local_minima(values, order, mode),
    }
}

// ============================================================
// BAR-LEVEL EXTRACTION
// ============================================================

fn to_extrema<T: OHLCV>(
    bars: &[T],
    indices: Vec<usize>,
    field: PriceField,
    kind: ExtremumKind,
    order: Period,
) -> Vec<Extremum> {
    indices
        .into_iter()
        .map(|index| Extremum {
            index,
            timestamp: bars[index].date(),
            value: bars[index].value(field),
            kind,
            order: order.get(),
        })
        .collect()
}

/// Local extrema of one price column.
pub fn find_extrema<T: OHLCV>(
    bars: &[T],
    field: PriceField,
    order: Period,
    mode: ExtremaMode,
) -> Extrema {
    let values: Vec<f64> = bars.iter().map(|b| b.value(field)).collect();
    let ExtremaIndices { maxima, minima } = extrema_indices(&values, order, mode);
    Extrema {
        maxima: to_extrema(bars, maxima, field, ExtremumKind::Max, order),
        minima: to_extrema(bars, minima, field, ExtremumKind::Min, order),
    }
}

/// Local extrema taken from the columns `source` selects.
pub fn extract_extrema<T: OHLCV>(
    bars: &[T],
    order: Period,
    source: ExtremaSource,
    mode: ExtremaMode,
) -> Extrema {
    let (max_field, min_field) = source.fields();
    if max_field == min_field {
        return find_extrema(bars, max_field, order, mode);
    }

    let highs: Vec<f64> = bars.iter().map(|b| b.value(max_field)).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.value(min_field)).collect();
    Extrema {
        maxima: to_extrema(
            bars,
            local_maxima(&highs, order, mode),
            max_field,
            ExtremumKind::Max,
            order,
        ),
        minima: to_extrema(
            bars,
            local_minima(&lows, order, mode),
            min_field,
            ExtremumKind::Min,
            order,
        ),
    }
}
