//! Technical indicators over daily price series
//!
//! Every indicator is a pure function of the bars and its parameters. Slice
//! kernels (`*_values`) return only the defined tail of the output: element
//! `j` of a kernel result belongs to input index `j + offset`, where `offset`
//! is the warm-up the indicator needs. Bar-level functions attach dates and
//! an [`IndicatorKey`].
//!
//! | Indicator | Bars needed | Offset |
//! |-----------|-------------|--------|
//! | SMA / EMA(n) | n | n - 1 |
//! | RSI(n) | n + 1 | n |
//! | Bollinger(n) | n | n - 1 |
//! | MACD(f, s, g) | s + g - 1 | s + g - 2 |

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{OHLCVExt, PatternError, Period, PriceField, Result, OHLCV};

pub const RSI_WINDOW: usize = 14;
pub const BOLLINGER_WINDOW: usize = 20;
pub const BOLLINGER_NUM_STD: f64 = 2.0;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;

// ============================================================
// SERIES TYPES
// ============================================================

/// Indicator name plus the parameters it was computed with
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndicatorKey {
    Sma { window: usize },
    Ema { window: usize },
    Rsi { window: usize },
    BollingerUpper { window: usize, num_std: f64 },
    BollingerMid { window: usize },
    BollingerLower { window: usize, num_std: f64 },
    MacdLine { fast: usize, slow: usize },
    MacdSignal { fast: usize, slow: usize, signal: usize },
    MacdHistogram { fast: usize, slow: usize, signal: usize },
    VolumeSma { window: usize },
}

impl IndicatorKey {
    pub fn name(&self) -> &'static str {
        match self {
            IndicatorKey::Sma { .. } => "SMA",
            IndicatorKey::Ema { .. } => "EMA",
            IndicatorKey::Rsi { .. } => "RSI",
            IndicatorKey::BollingerUpper { .. } => "BB_UPPER",
            IndicatorKey::BollingerMid { .. } => "BB_MID",
            IndicatorKey::BollingerLower { .. } => "BB_LOWER",
            IndicatorKey::MacdLine { .. } => "MACD",
            IndicatorKey::MacdSignal { .. } => "MACD_SIGNAL",
            IndicatorKey::MacdHistogram { .. } => "MACD_HIST",
            IndicatorKey::VolumeSma { .. } => "VOLUME_SMA",
        }
    }
}

impl fmt::Display for IndicatorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.name();
        match *self {
            IndicatorKey::Sma { window }
            | IndicatorKey::Ema { window }
            | IndicatorKey::Rsi { window }
            | IndicatorKey::BollingerMid { window }
            | IndicatorKey::VolumeSma { window } => write!(f, "{name}({window})"),
            IndicatorKey::BollingerUpper { window, num_std }
            | IndicatorKey::BollingerLower { window, num_std } => {
                write!(f, "{name}({window},{num_std})")
            }
            IndicatorKey::MacdLine { fast, slow } => write!(f, "{name}({fast},{slow})"),
            IndicatorKey::MacdSignal { fast, slow, signal }
            | IndicatorKey::MacdHistogram { fast, slow, signal } => {
                write!(f, "{name}({fast},{slow},{signal})")
            }
        }
    }
}

impl Serialize for IndicatorKey {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorPoint {
    pub timestamp: NaiveDate,
    pub value: f64,
}

/// Sparse overlay: defined only where enough trailing history exists
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorSeries {
    pub key: IndicatorKey,
    pub points: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    fn from_tail<T: OHLCV>(key: IndicatorKey, bars: &[T], offset: usize, values: Vec<f64>) -> Self {
        let points = bars[offset..]
            .iter()
            .zip(values)
            .map(|(bar, value)| IndicatorPoint {
                timestamp: bar.date(),
                value,
            })
            .collect();
        Self { key, points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Value at `date`, if defined there
    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.points
            .binary_search_by(|p| p.timestamp.cmp(&date))
            .ok()
            .map(|i| self.points[i].value)
    }

    pub fn first(&self) -> Option<IndicatorPoint> {
        self.points.first().copied()
    }

    pub fn last(&self) -> Option<IndicatorPoint> {
        self.points.last().copied()
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.value)
    }
}

/// Upper, middle and lower bands
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BollingerBands {
    pub upper: IndicatorSeries,
    pub mid: IndicatorSeries,
    pub lower: IndicatorSeries,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Macd {
    pub macd_line: IndicatorSeries,
    pub signal_line: IndicatorSeries,
    pub histogram: IndicatorSeries,
}

/// An indicator that was skipped, with the reason
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Unavailable {
    pub key: IndicatorKey,
    pub reason: String,
}

/// Computed overlays of one analysis request, plus the ones that were skipped
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IndicatorSet {
    pub series: Vec<IndicatorSeries>,
    pub unavailable: Vec<Unavailable>,
}

impl IndicatorSet {
    /// Store the outcome of computing `keys`.
    ///
    /// Insufficient history marks every key unavailable; other errors propagate.
    pub fn record(
        &mut self,
        keys: &[IndicatorKey],
        outcome: Result<Vec<IndicatorSeries>>,
    ) -> Result<()> {
        match outcome {
            Ok(series) => {
                self.series.extend(series);
                Ok(())
            }
            Err(e) if e.is_recoverable() => {
                let reason = e.to_string();
                self.unavailable.extend(keys.iter().map(|&key| Unavailable {
                    key,
                    reason: reason.clone(),
                }));
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    pub fn get(&self, key: &IndicatorKey) -> Option<&IndicatorSeries> {
        self.series.iter().find(|s| &s.key == key)
    }

    pub fn is_available(&self, key: &IndicatorKey) -> bool {
        self.get(key).is_some()
    }
}

// ============================================================
// SLICE KERNELS
// ============================================================

fn require(need: usize, got: usize) -> Result<()> {
    if got < need {
        return Err(PatternError::InsufficientData { need, got });
    }
    Ok(())
}

/// Trailing arithmetic mean. Output length `n - window + 1`.
pub fn sma_values(values: &[f64], window: Period) -> Result<Vec<f64>> {
    let w = window.get();
    require(w, values.len())?;
    Ok(values
        .windows(w)
        .map(|win| win.iter().sum::<f64>() / w as f64)
        .collect())
}

/// EMA with alpha `2 / (n + 1)`, seeded with the SMA of the first `n` values.
pub fn ema_values(values: &[f64], period: Period) -> Result<Vec<f64>> {
    let n = period.get();
    require(n, values.len())?;

    let alpha = 2.0 / (n as f64 + 1.0);
    let seed = values[..n].iter().sum::<f64>() / n as f64;

    let mut out = Vec::with_capacity(values.len() - n + 1);
    out.push(seed);
    let mut prev = seed;
    for &x in &values[n..] {
        prev = alpha * x + (1.0 - alpha) * prev;
        out.push(prev);
    }
    Ok(out)
}

/// Wilder RSI. Output length `n - window`, first value at input index `window`.
pub fn rsi_values(values: &[f64], window: Period) -> Result<Vec<f64>> {
    let w = window.get();
    require(w.saturating_add(1), values.len())?;

    let score = |gain: f64, loss: f64| {
        if loss == 0.0 {
            100.0
        } else {
            100.0 - 100.0 / (1.0 + gain / loss)
        }
    };

    let deltas: Vec<f64> = values.windows(2).map(|p| p[1] - p[0]).collect();
    let (seed_gain, seed_loss) = deltas[..w]
        .iter()
        .fold((0.0, 0.0), |(g, l), &d| (g + d.max(0.0), l + (-d).max(0.0)));
    let mut avg_gain = seed_gain / w as f64;
    let mut avg_loss = seed_loss / w as f64;

    let mut out = Vec::with_capacity(deltas.len() - w + 1);
    out.push(score(avg_gain, avg_loss));
    for &d in &deltas[w..] {
        avg_gain = (avg_gain * (w as f64 - 1.0) + d.max(0.0)) / w as f64;
        avg_loss = (avg_loss * (w as f64 - 1.0) + (-d).max(0.0)) / w as f64;
        out.push(score(avg_gain, avg_loss));
    }
    Ok(out)
}

/// Rolling population standard deviation. Output length `n - window + 1`.
pub fn rolling_std_values(values: &[f64], window: Period) -> Result<Vec<f64>> {
    let w = window.get();
    require(w, values.len())?;
    Ok(values
        .windows(w)
        .map(|win| {
            let mean = win.iter().sum::<f64>() / w as f64;
            let var = win.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / w as f64;
            var.sqrt()
        })
        .collect())
}

/// `(upper, mid, lower)` bands, each of length `n - window + 1`.
pub fn bollinger_values(
    values: &[f64],
    window: Period,
    num_std: f64,
) -> Result<(Vec<f64>, Vec<f64>, Vec<f64>)> {
    if !num_std.is_finite() || num_std < 0.0 {
        return Err(PatternError::InvalidValue(
            "Bollinger width must be finite and non-negative",
        ));
    }
    let mid = sma_values(values, window)?;
    let std = rolling_std_values(values, window)?;
    let upper = mid.iter().zip(&std).map(|(m, s)| m + num_std * s).collect();
    let lower = mid.iter().zip(&std).map(|(m, s)| m - num_std * s).collect();
    Ok((upper, mid, lower))
}

/// `(macd_line, signal_line, histogram)`.
///
/// The MACD line starts at input index `slow - 1`; signal and histogram at
/// `slow + signal - 2`. Returned vectors are trimmed to their own domains.
pub fn macd_values(
    values: &[f64],
    fast: Period,
    slow: Period,
    signal: Period,
) -> Result<(Vec<f64>, Vec<f64>, Vec<f64>)> {
    if fast >= slow {
        return Err(PatternError::InvalidConfig(format!(
            "MACD fast period {} must be shorter than slow period {}",
            fast.get(),
            slow.get()
        )));
    }
    require(slow.get().saturating_add(signal.get() - 1), values.len())?;

    let fast_ema = ema_values(values, fast)?;
    let slow_ema = ema_values(values, slow)?;
    let skip = slow.get() - fast.get();
    let line: Vec<f64> = fast_ema[skip..]
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| f - s)
        .collect();

    let signal_line = ema_values(&line, signal)?;
    let histogram = line[signal.get() - 1..]
        .iter()
        .zip(&signal_line)
        .map(|(m, s)| m - s)
        .collect();
    Ok((line, signal_line, histogram))
}

// ============================================================
// BAR-LEVEL OPERATIONS
// ============================================================

fn column<T: OHLCV>(bars: &[T], field: PriceField) -> Vec<f64> {
    bars.iter().map(|b| b.value(field)).collect()
}

/// SMA of closes
pub fn simple_moving_average<T: OHLCV>(bars: &[T], window: Period) -> Result<IndicatorSeries> {
    let values = sma_values(&column(bars, PriceField::Close), window)?;
    let key = IndicatorKey::Sma {
        window: window.get(),
    };
    Ok(IndicatorSeries::from_tail(key, bars, window.get() - 1, values))
}

/// EMA of closes
pub fn exponential_moving_average<T: OHLCV>(
    bars: &[T],
    window: Period,
) -> Result<IndicatorSeries> {
    let values = ema_values(&column(bars, PriceField::Close), window)?;
    let key = IndicatorKey::Ema {
        window: window.get(),
    };
    Ok(IndicatorSeries::from_tail(key, bars, window.get() - 1, values))
}

/// Wilder RSI of closes
pub fn rsi<T: OHLCV>(bars: &[T], window: Period) -> Result<IndicatorSeries> {
    let values = rsi_values(&column(bars, PriceField::Close), window)?;
    let key = IndicatorKey::Rsi {
        window: window.get(),
    };
    Ok(IndicatorSeries::from_tail(key, bars, window.get(), values))
}

/// Bollinger Bands of closes: SMA mid ± `num_std` population standard deviations
pub fn bollinger_bands<T: OHLCV>(
    bars: &[T],
    window: Period,
    num_std: f64,
) -> Result<BollingerBands> {
    let (upper, mid, lower) = bollinger_values(&column(bars, PriceField::Close), window, num_std)?;
    let w = window.get();
    let offset = w - 1;
    Ok(BollingerBands {
        upper: IndicatorSeries::from_tail(
            IndicatorKey::BollingerUpper { window: w, num_std },
            bars,
            offset,
            upper,
        ),
        mid: IndicatorSeries::from_tail(IndicatorKey::BollingerMid { window: w }, bars, offset, mid),
        lower: IndicatorSeries::from_tail(
            IndicatorKey::BollingerLower { window: w, num_std },
            bars,
            offset,
            lower,
        ),
    })
}

/// MACD of closes
pub fn macd<T: OHLCV>(bars: &[T], fast: Period, slow: Period, signal: Period) -> Result<Macd> {
    let (line, signal_line, histogram) =
        macd_values(&column(bars, PriceField::Close), fast, slow, signal)?;
    let (f, s, g) = (fast.get(), slow.get(), signal.get());
    let line_offset = s - 1;
    let signal_offset = s + g - 2;
    Ok(Macd {
        macd_line: IndicatorSeries::from_tail(
            IndicatorKey::MacdLine { fast: f, slow: s },
            bars,
            line_offset,
            line,
        ),
        signal_line: IndicatorSeries::from_tail(
            IndicatorKey::MacdSignal {
                fast: f,
                slow: s,
                signal: g,
            },
            bars,
            signal_offset,
            signal_line,
        ),
        histogram: IndicatorSeries::from_tail(
            IndicatorKey::MacdHistogram {
                fast: f,
                slow: s,
                signal: g,
            },
            bars,
            signal_offset,
            histogram,
        ),
    })
}

/// SMA of volume
pub fn volume_moving_average<T: OHLCV>(bars: &[T], window: Period) -> Result<IndicatorSeries> {
    let volumes: Vec<f64> = bars.iter().map(|b| b.volume()).collect();
    let values = sma_values(&volumes, window)?;
    let key = IndicatorKey::VolumeSma {
        window: window.get(),
    };
    Ok(IndicatorSeries::from_tail(key, bars, window.get() - 1, values))
}
