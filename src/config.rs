//! Analysis configuration and the ticker universe
//!
//! Both are plain immutable values supplied by the caller. [`AnalysisConfig`]
//! deserializes from any serde format with every field optional:
//!
//! ```rust
//! use chartpat::config::AnalysisConfig;
//!
//! let config: AnalysisConfig = serde_json::from_str(
//!     r#"{ "extrema": { "order": 3 }, "patterns": { "tolerance_pct": 1.5 } }"#,
//! ).unwrap();
//! assert_eq!(config.extrema.order.get(), 3);
//! assert_eq!(config.rsi_window.get(), 14);
//! config.validate().unwrap();
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::detectors::{
    ExtremaMode, ExtremaSource, DEFAULT_ORDER, DEFAULT_SHOULDER_SLACK, DEFAULT_TOLERANCE_PCT,
};
use crate::indicators::{
    BOLLINGER_NUM_STD, BOLLINGER_WINDOW, MACD_FAST, MACD_SIGNAL, MACD_SLOW, RSI_WINDOW,
};
use crate::{PatternError, Percent, Period, Ratio, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BollingerConfig {
    pub window: Period,
    pub num_std: f64,
}

impl Default for BollingerConfig {
    fn default() -> Self {
        Self {
            window: Period::new_const(BOLLINGER_WINDOW),
            num_std: BOLLINGER_NUM_STD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MacdConfig {
    pub fast: Period,
    pub slow: Period,
    pub signal: Period,
}

impl Default for MacdConfig {
    fn default() -> Self {
        Self {
            fast: Period::new_const(MACD_FAST),
            slow: Period::new_const(MACD_SLOW),
            signal: Period::new_const(MACD_SIGNAL),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtremaConfig {
    pub order: Period,
    pub source: ExtremaSource,
    pub mode: ExtremaMode,
}

impl Default for ExtremaConfig {
    fn default() -> Self {
        Self {
            order: Period::new_const(DEFAULT_ORDER),
            source: ExtremaSource::default(),
            mode: ExtremaMode::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    pub tolerance_pct: Percent,
    pub shoulder_slack: Percent,
    pub min_confidence: Option<Ratio>,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            tolerance_pct: Percent::new_const(DEFAULT_TOLERANCE_PCT),
            shoulder_slack: Percent::new_const(DEFAULT_SHOULDER_SLACK),
            min_confidence: None,
        }
    }
}

/// Moving-average pair for the coarse trend label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    pub short_window: Period,
    pub long_window: Period,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            short_window: Period::new_const(20),
            long_window: Period::new_const(50),
        }
    }
}

/// Every tunable of one analysis request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub sma_windows: Vec<Period>,
    pub rsi_window: Period,
    pub bollinger: BollingerConfig,
    pub macd: MacdConfig,
    pub volume_window: Period,
    pub extrema: ExtremaConfig,
    pub patterns: PatternConfig,
    pub trend: TrendConfig,
    /// Reject malformed bars before analysis
    pub validate_data: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sma_windows: vec![
                Period::new_const(20),
                Period::new_const(50),
                Period::new_const(200),
            ],
            rsi_window: Period::new_const(RSI_WINDOW),
            bollinger: BollingerConfig::default(),
            macd: MacdConfig::default(),
            volume_window: Period::new_const(20),
            extrema: ExtremaConfig::default(),
            patterns: PatternConfig::default(),
            trend: TrendConfig::default(),
            validate_data: true,
        }
    }
}

impl AnalysisConfig {
    /// Check cross-field constraints the individual types cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.macd.fast >= self.macd.slow {
            return Err(PatternError::InvalidConfig(format!(
                "macd.fast ({}) must be shorter than macd.slow ({})",
                self.macd.fast.get(),
                self.macd.slow.get()
            )));
        }
        if self.trend.short_window >= self.trend.long_window {
            return Err(PatternError::InvalidConfig(format!(
                "trend.short_window ({}) must be shorter than trend.long_window ({})",
                self.trend.short_window.get(),
                self.trend.long_window.get()
            )));
        }
        if !self.bollinger.num_std.is_finite() || self.bollinger.num_std < 0.0 {
            return Err(PatternError::OutOfRange {
                field: "bollinger.num_std",
                value: self.bollinger.num_std,
                min: 0.0,
                max: f64::MAX,
            });
        }
        Ok(())
    }
}

// ============================================================
// UNIVERSE
// ============================================================

/// Immutable display-name -> ticker mapping, iterated in name order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Universe {
    tickers: BTreeMap<String, String>,
}

impl Universe {
    pub fn new<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            tickers: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Ticker for a display name
    pub fn ticker(&self, name: &str) -> Result<&str> {
        self.tickers
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| PatternError::UnknownTicker(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tickers.contains_key(name)
    }

    /// Display names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tickers.keys().map(String::as_str)
    }

    /// `(name, ticker)` pairs, sorted by name
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tickers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.tickers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Universe {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(iter)
    }
}
