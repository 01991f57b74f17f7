//! One-shot analysis of a price series
//!
//! [`Analyzer`] wires the indicator kernels, extrema extraction, pattern
//! engine and trend rules together from an [`AnalysisConfig`]. Each call is
//! independent; nothing is cached between requests.
//!
//! ```rust
//! use chartpat::prelude::*;
//! use chrono::NaiveDate;
//!
//! let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let bars: Vec<PriceBar> = (0..60)
//!     .map(|i| PriceBar::flat(start + chrono::Days::new(i), 100.0 + i as f64, 5_000))
//!     .collect();
//!
//! let analyzer = Analyzer::new(AnalysisConfig::default()).unwrap();
//! let report = analyzer.analyze("INFY.NS", &bars).unwrap();
//!
//! assert_eq!(report.bars, 60);
//! assert_eq!(report.ma_trend, TrendLabel::Uptrend);
//! // 200-day average needs more history
//! assert!(!report.indicators.is_available(&IndicatorKey::Sma { window: 200 }));
//! ```

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, trace};

use crate::config::{AnalysisConfig, Universe};
use crate::detectors::{
    classify_extrema_trend, classify_ma_trend, DoubleBottomDetector, DoubleTopDetector, Extrema,
    HeadAndShouldersDetector, TrendLabel,
};
use crate::indicators::{self, IndicatorKey, IndicatorSet};
use crate::{
    partition_results, validate_series, BuiltinDetector, EngineBuilder, PatternEngine,
    PatternError, PatternInstance, Result, OHLCV,
};

/// Headline numbers over the analyzed window
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceSummary {
    pub last_close: f64,
    /// Last close minus first close
    pub change: f64,
    pub change_pct: f64,
    pub period_high: f64,
    pub period_low: f64,
    pub average_volume: f64,
}

impl PriceSummary {
    /// `None` for an empty series.
    pub fn from_bars<T: OHLCV>(bars: &[T]) -> Option<Self> {
        let first = bars.first()?;
        let last = bars.last()?;

        let (high, low) = bars.iter().fold((f64::MIN, f64::MAX), |(h, l), b| {
            (h.max(b.high()), l.min(b.low()))
        });
        let change = last.close() - first.close();
        let change_pct = if first.close() != 0.0 {
            change / first.close() * 100.0
        } else {
            0.0
        };
        let average_volume = bars.iter().map(|b| b.volume()).sum::<f64>() / bars.len() as f64;

        Some(Self {
            last_close: last.close(),
            change,
            change_pct,
            period_high: high,
            period_low: low,
            average_volume,
        })
    }
}

/// Everything computed for one symbol
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub symbol: String,
    pub bars: usize,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub indicators: IndicatorSet,
    pub extrema: Extrema,
    pub patterns: Vec<PatternInstance>,
    /// Peaks-and-valleys trend
    pub trend: TrendLabel,
    /// Short-over-long moving average trend
    pub ma_trend: TrendLabel,
    pub summary: PriceSummary,
}

impl AnalysisReport {
    /// Latest value of an overlay, if it was computed
    pub fn latest(&self, key: &IndicatorKey) -> Option<f64> {
        self.indicators.get(key)?.last().map(|p| p.value)
    }
}

/// Error from analyzing a single symbol
#[derive(Debug)]
pub struct AnalysisError {
    pub symbol: String,
    pub error: PatternError,
}

/// Configured analysis pipeline
pub struct Analyzer {
    config: AnalysisConfig,
    engine: PatternEngine,
}

impl Analyzer {
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;

        let patterns = &config.patterns;
        let mut builder = EngineBuilder::new()
            .add_checked(BuiltinDetector::DoubleTop(DoubleTopDetector {
                tolerance_pct: patterns.tolerance_pct,
            }))?
            .add_checked(BuiltinDetector::DoubleBottom(DoubleBottomDetector {
                tolerance_pct: patterns.tolerance_pct,
            }))?
            .add_checked(BuiltinDetector::HeadAndShoulders(HeadAndShouldersDetector {
                tolerance_pct: patterns.tolerance_pct,
                shoulder_slack: patterns.shoulder_slack,
            }))?
            .order(config.extrema.order)
            .source(config.extrema.source)
            .mode(config.extrema.mode)
            // Validation runs once in `analyze`
            .validate_data(false);
        if let Some(min) = patterns.min_confidence {
            builder = builder.min_confidence(min.get());
        }
        let engine = builder.build()?;

        Ok(Self { config, engine })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn engine(&self) -> &PatternEngine {
        &self.engine
    }

    /// Every configured overlay. Windows longer than the series are recorded
    /// as unavailable instead of failing the request.
    pub fn indicators<T: OHLCV>(&self, bars: &[T]) -> Result<IndicatorSet> {
        let config = &self.config;
        let mut set = IndicatorSet::default();

        for &window in &config.sma_windows {
            let key = IndicatorKey::Sma {
                window: window.get(),
            };
            set.record(
                &[key],
                indicators::simple_moving_average(bars, window).map(|s| vec![s]),
            )?;
        }

        let key = IndicatorKey::Rsi {
            window: config.rsi_window.get(),
        };
        set.record(
            &[key],
            indicators::rsi(bars, config.rsi_window).map(|s| vec![s]),
        )?;

        let (w, k) = (config.bollinger.window.get(), config.bollinger.num_std);
        set.record(
            &[
                IndicatorKey::BollingerUpper { window: w, num_std: k },
                IndicatorKey::BollingerMid { window: w },
                IndicatorKey::BollingerLower { window: w, num_std: k },
            ],
            indicators::bollinger_bands(bars, config.bollinger.window, k)
                .map(|b| vec![b.upper, b.mid, b.lower]),
        )?;

        let (fast, slow, signal) = (config.macd.fast, config.macd.slow, config.macd.signal);
        let (f, s, g) = (fast.get(), slow.get(), signal.get());
        set.record(
            &[
                IndicatorKey::MacdLine { fast: f, slow: s },
                IndicatorKey::MacdSignal {
                    fast: f,
                    slow: s,
                    signal: g,
                },
                IndicatorKey::MacdHistogram {
                    fast: f,
                    slow: s,
                    signal: g,
                },
            ],
            indicators::macd(bars, fast, slow, signal)
                .map(|m| vec![m.macd_line, m.signal_line, m.histogram]),
        )?;

        let key = IndicatorKey::VolumeSma {
            window: config.volume_window.get(),
        };
        set.record(
            &[key],
            indicators::volume_moving_average(bars, config.volume_window).map(|s| vec![s]),
        )?;

        for missing in &set.unavailable {
            trace!(key = %missing.key, reason = %missing.reason, "indicator unavailable");
        }
        Ok(set)
    }

    fn ma_trend<T: OHLCV>(&self, bars: &[T]) -> Result<TrendLabel> {
        let trend = &self.config.trend;
        let pair = indicators::simple_moving_average(bars, trend.short_window).and_then(|short| {
            let long = indicators::simple_moving_average(bars, trend.long_window)?;
            Ok((short, long))
        });
        match pair {
            Ok((short, long)) => Ok(classify_ma_trend(&short, &long)),
            Err(e) if e.is_recoverable() => Ok(TrendLabel::InsufficientData),
            Err(e) => Err(e),
        }
    }

    /// Full analysis of one symbol's daily bars, oldest first.
    pub fn analyze<T: OHLCV>(&self, symbol: &str, bars: &[T]) -> Result<AnalysisReport> {
        let (Some(first), Some(last)) = (bars.first(), bars.last()) else {
            return Err(PatternError::InsufficientData { need: 1, got: 0 });
        };
        if self.config.validate_data {
            validate_series(bars)?;
        }
        debug!(symbol, bars = bars.len(), "analyzing series");

        let indicators = self.indicators(bars)?;
        let extrema = self.engine.extrema(bars);
        let patterns = self.engine.detect(&extrema);
        let trend = classify_extrema_trend(&extrema);
        let ma_trend = self.ma_trend(bars)?;
        let summary = PriceSummary::from_bars(bars)
            .ok_or(PatternError::InsufficientData { need: 1, got: 0 })?;

        debug!(
            symbol,
            maxima = extrema.maxima.len(),
            minima = extrema.minima.len(),
            patterns = patterns.len(),
            unavailable = indicators.unavailable.len(),
            %trend,
            %ma_trend,
            "analysis complete"
        );

        Ok(AnalysisReport {
            symbol: symbol.to_string(),
            bars: bars.len(),
            first_date: first.date(),
            last_date: last.date(),
            indicators,
            extrema,
            patterns,
            trend,
            ma_trend,
            summary,
        })
    }

    /// Resolve a display name through `universe`, then analyze.
    pub fn analyze_ticker<T: OHLCV>(
        &self,
        universe: &Universe,
        name: &str,
        bars: &[T],
    ) -> Result<AnalysisReport> {
        let ticker = universe.ticker(name)?;
        debug!(name, ticker, "resolved ticker");
        self.analyze(ticker, bars)
    }
}

/// Analyze many symbols in parallel, one independent request each
pub fn analyze_parallel<'a, T, I>(
    analyzer: &Analyzer,
    instruments: I,
) -> (Vec<AnalysisReport>, Vec<AnalysisError>)
where
    T: OHLCV + Sync + 'a,
    I: IntoParallelIterator<Item = (&'a str, &'a [T])>,
{
    let results: Vec<_> = instruments
        .into_par_iter()
        .map(|(symbol, bars)| {
            analyzer.analyze(symbol, bars).map_err(|error| AnalysisError {
                symbol: symbol.to_string(),
                error,
            })
        })
        .collect();

    let (reports, errors) = partition_results(results);
    debug!(
        succeeded = reports.len(),
        failed = errors.len(),
        "parallel analysis finished"
    );
    (reports, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Period, PriceBar};

    fn day(i: usize) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(i as u64)
    }

    fn bars_from_closes(closes: &[f64]) -> Vec<PriceBar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PriceBar::flat(day(i), c, 1_000 + i as u64))
            .collect()
    }

    fn small_config() -> AnalysisConfig {
        let mut config = AnalysisConfig::default();
        config.sma_windows = vec![Period::new(3).unwrap()];
        config.rsi_window = Period::new(3).unwrap();
        config.bollinger.window = Period::new(3).unwrap();
        config.macd.fast = Period::new(2).unwrap();
        config.macd.slow = Period::new(3).unwrap();
        config.macd.signal = Period::new(2).unwrap();
        config.volume_window = Period::new(3).unwrap();
        config.extrema.order = Period::new(1).unwrap();
        config.trend.short_window = Period::new(2).unwrap();
        config.trend.long_window = Period::new(4).unwrap();
        config
    }

    #[test]
    fn test_empty_series_is_insufficient() {
        let analyzer = Analyzer::new(AnalysisConfig::default()).unwrap();
        let bars: Vec<PriceBar> = vec![];
        assert_eq!(
            analyzer.analyze("X", &bars).unwrap_err(),
            PatternError::InsufficientData { need: 1, got: 0 }
        );
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = AnalysisConfig::default();
        config.macd.fast = Period::new(40).unwrap();
        assert!(Analyzer::new(config).is_err());
    }

    #[test]
    fn test_short_series_marks_indicators_unavailable() {
        let analyzer = Analyzer::new(AnalysisConfig::default()).unwrap();
        let bars = bars_from_closes(&[10.0, 11.0, 12.0, 11.0, 10.0]);
        let report = analyzer.analyze("X", &bars).unwrap();

        assert!(report.indicators.series.is_empty());
        // 3 SMAs + RSI + 3 bands + 3 MACD + volume
        assert_eq!(report.indicators.unavailable.len(), 11);
        assert_eq!(report.ma_trend, TrendLabel::InsufficientData);
        assert_eq!(report.trend, TrendLabel::InsufficientData);
    }

    #[test]
    fn test_full_report() {
        let analyzer = Analyzer::new(small_config()).unwrap();
        let bars = bars_from_closes(&[10.0, 12.0, 15.0, 11.0, 15.2, 10.0, 13.0, 14.0]);
        let report = analyzer.analyze("INFY.NS", &bars).unwrap();

        assert_eq!(report.symbol, "INFY.NS");
        assert_eq!(report.bars, 8);
        assert_eq!(report.first_date, day(0));
        assert_eq!(report.last_date, day(7));
        assert!(report.indicators.unavailable.is_empty());
        assert_eq!(report.patterns.len(), 1);
        assert_eq!(report.patterns[0].pattern_type, crate::PatternType::DoubleTop);

        let sma = report.latest(&IndicatorKey::Sma { window: 3 }).unwrap();
        assert!((sma - (10.0 + 13.0 + 14.0) / 3.0).abs() < 1e-9);

        assert_eq!(report.summary.last_close, 14.0);
        assert!((report.summary.change - 4.0).abs() < 1e-12);
        assert!((report.summary.change_pct - 40.0).abs() < 1e-9);
        assert_eq!(report.summary.period_high, 15.2);
        assert_eq!(report.summary.period_low, 10.0);
    }

    #[test]
    fn test_malformed_series_rejected() {
        let analyzer = Analyzer::new(small_config()).unwrap();
        let mut bars = bars_from_closes(&[10.0, 11.0, 12.0]);
        bars[2].date = day(0);
        assert!(matches!(
            analyzer.analyze("X", &bars),
            Err(PatternError::MalformedSeries { index: 2, .. })
        ));
    }

    #[test]
    fn test_analyze_ticker() {
        let analyzer = Analyzer::new(small_config()).unwrap();
        let universe = Universe::new([("Infosys", "INFY.NS")]);
        let bars = bars_from_closes(&[10.0, 11.0, 12.0, 13.0]);

        let report = analyzer.analyze_ticker(&universe, "Infosys", &bars).unwrap();
        assert_eq!(report.symbol, "INFY.NS");
        assert!(matches!(
            analyzer.analyze_ticker(&universe, "Wipro", &bars),
            Err(PatternError::UnknownTicker(_))
        ));
    }

    #[test]
    fn test_analyze_parallel() {
        let analyzer = Analyzer::new(small_config()).unwrap();
        let good = bars_from_closes(&[10.0, 11.0, 12.0, 13.0]);
        let empty: Vec<PriceBar> = vec![];

        let instruments: Vec<(&str, &[PriceBar])> = vec![("INFY", &good), ("TCS", &empty)];
        let (reports, errors) = analyze_parallel(&analyzer, instruments);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].symbol, "INFY");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].symbol, "TCS");
    }

    #[test]
    fn test_summary_of_empty_series() {
        let bars: Vec<PriceBar> = vec![];
        assert!(PriceSummary::from_bars(&bars).is_none());
    }
}
