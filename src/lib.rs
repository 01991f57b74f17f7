//! # chartpat - chart patterns from local extrema
//!
//! Technical indicators and reversal-pattern detection over daily price series.
//!
//! ## Quick Start
//!
//! ```rust
//! use chartpat::prelude::*;
//! use chrono::NaiveDate;
//!
//! let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let closes = [10.0, 12.0, 15.0, 11.0, 15.2, 10.0];
//! let bars: Vec<PriceBar> = closes
//!     .iter()
//!     .enumerate()
//!     .map(|(i, &c)| PriceBar::flat(start + chrono::Days::new(i as u64), c, 1_000))
//!     .collect();
//!
//! let engine = EngineBuilder::new()
//!     .with_all_defaults()
//!     .order(Period::new(1).unwrap())
//!     .build()
//!     .unwrap();
//!
//! let patterns = engine.scan(&bars).unwrap();
//! assert_eq!(patterns.len(), 1);
//! assert_eq!(patterns[0].pattern_type, PatternType::DoubleTop);
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub mod analysis;
pub mod config;
pub mod detectors;
pub mod fundamentals;
pub mod indicators;
pub mod params;

pub mod prelude {
    pub use crate::{
        // Analysis entry point
        analysis::{analyze_parallel, AnalysisError, AnalysisReport, Analyzer, PriceSummary},
        // Configuration
        config::{AnalysisConfig, Universe},
        // Detectors
        detectors::*,
        // Fundamentals
        fundamentals::{
            DebtToEquityEstimator, FundamentalRatios, Fundamentals, NoEstimate, Provenance,
            RatioValue, StaticEstimates,
        },
        // Indicators
        indicators::{IndicatorKey, IndicatorPoint, IndicatorSeries, IndicatorSet, Unavailable},
        // Parameters
        params::{get_percent, ParamMeta, ParamType, ParameterizedDetector},
        // Parallel
        scan_parallel,
        validate_series,
        BuiltinDetector,
        // Core traits
        ChartPatternDetector,
        Direction,
        EngineBuilder,
        OHLCVExt,
        PatternEngine,
        // Errors
        PatternError,
        PatternInstance,
        PatternType,
        Percent,
        Period,
        PriceBar,
        PriceField,
        Ratio,
        Result,
        ScanError,
        ScanResult,
        OHLCV,
    };
}

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, PatternError>;

/// Errors raised by indicator computation, detection and analysis
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PatternError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Insufficient data: need {need} bars, got {got}")]
    InsufficientData { need: usize, got: usize },

    #[error("Malformed series at index {index}: {reason}")]
    MalformedSeries { index: usize, reason: &'static str },

    #[error("Unknown ticker: {0}")]
    UnknownTicker(String),
}

impl PatternError {
    /// Errors the caller should report as "not available" and move past.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PatternError::InsufficientData { .. })
    }
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Normalized value in range 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Ratio(f64);

impl Ratio {
    /// Create a new Ratio, validating the value is in [0.0, 1.0]
    pub fn new(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(PatternError::InvalidValue("Ratio must be finite"));
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(PatternError::OutOfRange {
                field: "Ratio",
                value,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl Serialize for Ratio {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> Deserialize<'de> for Ratio {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Ratio::new(value).map_err(serde::de::Error::custom)
    }
}

/// Percentage in range 0.0..=100.0, used for matching tolerances
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Percent(f64);

impl Percent {
    pub fn new(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(PatternError::InvalidValue("Percent must be finite"));
        }
        if !(0.0..=100.0).contains(&value) {
            return Err(PatternError::OutOfRange {
                field: "Percent",
                value,
                min: 0.0,
                max: 100.0,
            });
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }

    /// The percentage as a fraction, e.g. 2% -> 0.02
    #[inline]
    pub fn as_fraction(self) -> f64 {
        self.0 / 100.0
    }
}

impl Serialize for Percent {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> Deserialize<'de> for Percent {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Percent::new(value).map_err(serde::de::Error::custom)
    }
}

/// Period (must be > 0). Used for indicator windows and extrema order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period(usize);

impl Period {
    /// Create a new Period, validating value is > 0
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(PatternError::InvalidValue("Period must be > 0"));
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Period::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OHLCV TRAITS
// ============================================================

/// One trading-day observation
pub trait OHLCV {
    fn date(&self) -> NaiveDate;
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;
    fn volume(&self) -> f64;
}

impl<T: OHLCV + ?Sized> OHLCV for &T {
    fn date(&self) -> NaiveDate {
        (**self).date()
    }

    fn open(&self) -> f64 {
        (**self).open()
    }

    fn high(&self) -> f64 {
        (**self).high()
    }

    fn low(&self) -> f64 {
        (**self).low()
    }

    fn close(&self) -> f64 {
        (**self).close()
    }

    fn volume(&self) -> f64 {
        (**self).volume()
    }
}

/// Price column selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceField {
    Open,
    High,
    Low,
    Close,
}

/// Extension trait with derived properties of a bar
pub trait OHLCVExt: OHLCV {
    #[inline]
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    #[inline]
    fn value(&self, field: PriceField) -> f64 {
        match field {
            PriceField::Open => self.open(),
            PriceField::High => self.high(),
            PriceField::Low => self.low(),
            PriceField::Close => self.close(),
        }
    }

    /// Validate a single bar. The reported index is 0; [`validate_series`] fills it in.
    fn validate(&self) -> Result<()> {
        let prices = [self.open(), self.high(), self.low(), self.close()];
        if prices.iter().any(|p| !p.is_finite()) {
            return Err(PatternError::MalformedSeries {
                index: 0,
                reason: "non-finite price",
            });
        }
        if prices.iter().any(|&p| p <= 0.0) {
            return Err(PatternError::MalformedSeries {
                index: 0,
                reason: "non-positive price",
            });
        }
        if self.high() < self.low() {
            return Err(PatternError::MalformedSeries {
                index: 0,
                reason: "high < low",
            });
        }
        if self.open() < self.low() || self.open() > self.high() {
            return Err(PatternError::MalformedSeries {
                index: 0,
                reason: "open outside [low, high]",
            });
        }
        if self.close() < self.low() || self.close() > self.high() {
            return Err(PatternError::MalformedSeries {
                index: 0,
                reason: "close outside [low, high]",
            });
        }
        if !self.volume().is_finite() || self.volume() < 0.0 {
            return Err(PatternError::MalformedSeries {
                index: 0,
                reason: "negative volume",
            });
        }
        Ok(())
    }
}

impl<T: OHLCV + ?Sized> OHLCVExt for T {}

/// Check bar invariants and strictly increasing dates across the series.
pub fn validate_series<T: OHLCV>(bars: &[T]) -> Result<()> {
    for (i, bar) in bars.iter().enumerate() {
        bar.validate().map_err(|e| match e {
            PatternError::MalformedSeries { reason, .. } => {
                PatternError::MalformedSeries { index: i, reason }
            }
            other => other,
        })?;
        if i > 0 && bars[i - 1].date() >= bar.date() {
            return Err(PatternError::MalformedSeries {
                index: i,
                reason: "timestamps not strictly increasing",
            });
        }
    }
    Ok(())
}

/// Owned daily bar as delivered by the data-retrieval layer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl PriceBar {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: u64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// A bar whose open, high, low and close are all `price`
    pub fn flat(date: NaiveDate, price: f64, volume: u64) -> Self {
        Self::new(date, price, price, price, price, volume)
    }
}

impl OHLCV for PriceBar {
    fn date(&self) -> NaiveDate {
        self.date
    }

    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn volume(&self) -> f64 {
        self.volume as f64
    }
}

// ============================================================
// PATTERN INSTANCE - result of detection
// ============================================================

/// Kind of reversal formation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    DoubleTop,
    DoubleBottom,
    HeadAndShoulders,
}

impl PatternType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternType::DoubleTop => "double_top",
            PatternType::DoubleBottom => "double_bottom",
            PatternType::HeadAndShoulders => "head_and_shoulders",
        }
    }

    /// Direction of the reversal the formation signals
    pub fn direction(&self) -> Direction {
        match self {
            PatternType::DoubleTop | PatternType::HeadAndShoulders => Direction::Bearish,
            PatternType::DoubleBottom => Direction::Bullish,
        }
    }

    /// Number of anchor extrema an instance of this type carries
    pub fn anchor_count(&self) -> usize {
        match self {
            PatternType::DoubleTop | PatternType::DoubleBottom => 2,
            PatternType::HeadAndShoulders => 3,
        }
    }
}

impl std::fmt::Display for PatternType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction/bias of a pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Bullish,
    Bearish,
}

impl Direction {
    #[inline]
    pub fn is_bullish(self) -> bool {
        matches!(self, Direction::Bullish)
    }

    #[inline]
    pub fn is_bearish(self) -> bool {
        matches!(self, Direction::Bearish)
    }
}

/// A classified formation, anchored on 2 or 3 extrema in time order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternInstance {
    pub pattern_type: PatternType,
    pub anchors: Vec<Extremum>,
    /// Matching threshold the formation was accepted under
    pub tolerance_pct: f64,
    /// 0.0..=1.0, 1.0 when the anchors match exactly
    pub confidence: f64,
}

impl PatternInstance {
    /// Bar index of the first anchor
    pub fn start_index(&self) -> usize {
        self.anchors.first().map_or(0, |a| a.index)
    }

    /// Bar index of the last anchor
    pub fn end_index(&self) -> usize {
        self.anchors.last().map_or(0, |a| a.index)
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        self.anchors.first().map(|a| a.timestamp)
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        self.anchors.last().map(|a| a.timestamp)
    }
}

// ============================================================
// PATTERN DETECTOR TRAIT
// ============================================================

/// A classifier that turns an extrema set into pattern instances
pub trait ChartPatternDetector: Send + Sync {
    fn pattern_type(&self) -> PatternType;

    /// Fewest extrema, maxima and minima together, needed to produce
    /// anything. The engine skips the detector below this count.
    fn min_extrema(&self) -> usize;

    fn detect(&self, extrema: &Extrema) -> Vec<PatternInstance>;

    fn validate_config(&self) -> Result<()> {
        Ok(())
    }
}

// ============================================================
// BUILTIN DETECTORS - generated via macro
// ============================================================

use detectors::*;

/// Macro to generate BuiltinDetector enum without boilerplate
macro_rules! define_builtin_detectors {
    (
        $(
            $variant:ident($detector:ty)
        ),* $(,)?
    ) => {
        /// All builtin detectors - enum dispatch
        #[derive(Debug, Clone)]
        pub enum BuiltinDetector {
            $($variant($detector)),*
        }

        impl BuiltinDetector {
            #[inline]
            pub fn detect(&self, extrema: &Extrema) -> Vec<PatternInstance> {
                match self {
                    $(Self::$variant(d) => ChartPatternDetector::detect(d, extrema)),*
                }
            }

            #[inline]
            pub fn pattern_type(&self) -> PatternType {
                match self {
                    $(Self::$variant(d) => ChartPatternDetector::pattern_type(d)),*
                }
            }

            #[inline]
            pub fn min_extrema(&self) -> usize {
                match self {
                    $(Self::$variant(d) => ChartPatternDetector::min_extrema(d)),*
                }
            }

            pub fn validate_config(&self) -> Result<()> {
                match self {
                    $(Self::$variant(d) => ChartPatternDetector::validate_config(d)),*
                }
            }
        }
    };
}

define_builtin_detectors! {
    DoubleTop(DoubleTopDetector),
    DoubleBottom(DoubleBottomDetector),
    HeadAndShoulders(HeadAndShouldersDetector),
}

// ============================================================
// PATTERN ENGINE
// ============================================================

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Half-width of the extrema comparison window
    pub order: Period,
    pub source: ExtremaSource,
    pub mode: ExtremaMode,
    pub min_confidence: Option<f64>,
    pub validate_data: bool,
    pub pattern_filter: Option<Vec<PatternType>>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            order: Period::new_const(DEFAULT_ORDER),
            source: ExtremaSource::default(),
            mode: ExtremaMode::default(),
            min_confidence: None,
            validate_data: false,
            pattern_filter: None,
        }
    }
}

/// Extrema extraction followed by pattern classification
pub struct PatternEngine {
    builtin: Vec<BuiltinDetector>,
    custom: Vec<Box<dyn ChartPatternDetector>>,
    config: EngineConfig,
}

impl PatternEngine {
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Local maxima and minima of the configured source series.
    pub fn extrema<T: OHLCV>(&self, bars: &[T]) -> Extrema {
        extract_extrema(bars, self.config.order, self.config.source, self.config.mode)
    }

    /// Run every detector over an already extracted extrema set.
    ///
    /// Output is ordered by first anchor, then pattern type, then last anchor.
    pub fn detect(&self, extrema: &Extrema) -> Vec<PatternInstance> {
        let mut results = Vec::new();
        let available = extrema.len();

        for detector in self.builtin.iter().filter(|d| available >= d.min_extrema()) {
            results.extend(
                detector
                    .detect(extrema)
                    .into_iter()
                    .filter(|m| self.should_include(m)),
            );
        }

        for detector in self.custom.iter().filter(|d| available >= d.min_extrema()) {
            results.extend(
                detector
                    .detect(extrema)
                    .into_iter()
                    .filter(|m| self.should_include(m)),
            );
        }

        results.sort_by(|a, b| {
            a.start_index()
                .cmp(&b.start_index())
                .then(a.pattern_type.cmp(&b.pattern_type))
                .then(a.end_index().cmp(&b.end_index()))
        });
        results
    }

    /// Extract extrema and classify them in one pass.
    pub fn scan<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<PatternInstance>> {
        if self.config.validate_data {
            validate_series(bars)?;
        }
        let extrema = self.extrema(bars);
        Ok(self.detect(&extrema))
    }

    /// Lower-highs/lower-lows trend label for the bars.
    pub fn trend<T: OHLCV>(&self, bars: &[T]) -> TrendLabel {
        classify_extrema_trend(&self.extrema(bars))
    }

    fn should_include(&self, m: &PatternInstance) -> bool {
        if let Some(min) = self.config.min_confidence {
            if m.confidence < min {
                return false;
            }
        }
        if let Some(ref filter) = self.config.pattern_filter {
            if !filter.contains(&m.pattern_type) {
                return false;
            }
        }
        true
    }

    fn validate(&self) -> Result<()> {
        if let Some(min) = self.config.min_confidence {
            Ratio::new(min)?;
        }
        for d in &self.builtin {
            d.validate_config()?;
        }
        for d in &self.custom {
            d.validate_config()?;
        }
        Ok(())
    }
}

// ============================================================
// BUILDER
// ============================================================

/// Builder for creating PatternEngine instances
pub struct EngineBuilder {
    builtin: Vec<BuiltinDetector>,
    custom: Vec<Box<dyn ChartPatternDetector>>,
    config: EngineConfig,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            builtin: Vec::new(),
            custom: Vec::new(),
            config: EngineConfig::default(),
        }
    }

    /// Add all builtin detectors with default tolerances
    pub fn with_all_defaults(mut self) -> Self {
        self.builtin.extend([
            BuiltinDetector::DoubleTop(DoubleTopDetector::default()),
            BuiltinDetector::DoubleBottom(DoubleBottomDetector::default()),
            BuiltinDetector::HeadAndShoulders(HeadAndShouldersDetector::default()),
        ]);
        self
    }

    /// Add all builtin detectors sharing one tolerance
    pub fn with_tolerance(mut self, tolerance_pct: Percent, shoulder_slack: Percent) -> Self {
        self.builtin.extend([
            BuiltinDetector::DoubleTop(DoubleTopDetector { tolerance_pct }),
            BuiltinDetector::DoubleBottom(DoubleBottomDetector { tolerance_pct }),
            BuiltinDetector::HeadAndShoulders(HeadAndShouldersDetector {
                tolerance_pct,
                shoulder_slack,
            }),
        ]);
        self
    }

    /// Add a builtin detector
    #[allow(clippy::should_implement_trait)]
    pub fn add(mut self, detector: BuiltinDetector) -> Self {
        self.builtin.push(detector);
        self
    }

    /// Add with config validation
    pub fn add_checked(mut self, detector: BuiltinDetector) -> Result<Self> {
        detector.validate_config()?;
        self.builtin.push(detector);
        Ok(self)
    }

    /// Add a custom detector
    pub fn add_custom<D: ChartPatternDetector + 'static>(mut self, detector: D) -> Self {
        self.custom.push(Box::new(detector));
        self
    }

    /// Extrema order (half-width of the comparison window)
    pub fn order(mut self, order: Period) -> Self {
        self.config.order = order;
        self
    }

    pub fn source(mut self, source: ExtremaSource) -> Self {
        self.config.source = source;
        self
    }

    pub fn mode(mut self, mode: ExtremaMode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Set minimum confidence filter
    pub fn min_confidence(mut self, confidence: f64) -> Self {
        self.config.min_confidence = Some(confidence);
        self
    }

    /// Enable/disable data validation
    pub fn validate_data(mut self, enable: bool) -> Self {
        self.config.validate_data = enable;
        self
    }

    /// Filter to specific patterns only
    pub fn only_patterns(mut self, types: impl IntoIterator<Item = PatternType>) -> Self {
        self.config.pattern_filter = Some(types.into_iter().collect());
        self
    }

    /// Build the engine
    pub fn build(self) -> Result<PatternEngine> {
        let engine = PatternEngine {
            builtin: self.builtin,
            custom: self.custom,
            config: self.config,
        };
        engine.validate()?;
        Ok(engine)
    }
}

// ============================================================
// PARALLEL SCANNING
// ============================================================

use rayon::prelude::*;

/// Result of scanning a single instrument
#[derive(Debug)]
pub struct ScanResult {
    pub symbol: String,
    pub patterns: Vec<PatternInstance>,
}

/// Error from scanning a single instrument
#[derive(Debug)]
pub struct ScanError {
    pub symbol: String,
    pub error: PatternError,
}

/// Parallel scanning of multiple instruments, one independent pass each
pub fn scan_parallel<'a, T, I>(
    engine: &PatternEngine,
    instruments: I,
) -> (Vec<ScanResult>, Vec<ScanError>)
where
    T: OHLCV + Sync + 'a,
    I: IntoParallelIterator<Item = (&'a str, &'a [T])>,
{
    let results: Vec<_> = instruments
        .into_par_iter()
        .map(|(symbol, bars)| {
            engine
                .scan(bars)
                .map(|patterns| ScanResult {
                    symbol: symbol.to_string(),
                    patterns,
                })
                .map_err(|error| ScanError {
                    symbol: symbol.to_string(),
                    error,
                })
        })
        .collect();

    partition_results(results)
}

pub(crate) fn partition_results<R, E>(results: Vec<std::result::Result<R, E>>) -> (Vec<R>, Vec<E>) {
    let mut successes = Vec::new();
    let mut errors = Vec::new();

    for result in results {
        match result {
            Ok(r) => successes.push(r),
            Err(e) => errors.push(e),
        }
    }

    (successes, errors)
}

// ============================================================
// TESTS
// ============================================================
