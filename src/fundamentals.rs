//! Fundamental ratios with provenance
//!
//! Each ratio is computed independently from whatever inputs are present, so
//! a missing EPS never hides a computable ROE. Values filled in by a
//! [`DebtToEquityEstimator`] are tagged [`Provenance::Estimated`] and never
//! pass for reported figures.
//!
//! ```rust
//! use chartpat::prelude::*;
//!
//! let inputs = Fundamentals {
//!     net_income: Some(250.0),
//!     equity: Some(1_000.0),
//!     eps: Some(5.0),
//!     price: Some(100.0),
//!     ..Fundamentals::default()
//! };
//! let estimates = StaticEstimates::new([("INFY.NS", 0.1)]);
//! let ratios = FundamentalRatios::compute("INFY.NS", &inputs, &estimates);
//!
//! assert_eq!(ratios.pe.unwrap(), RatioValue::derived(20.0));
//! assert_eq!(ratios.roe_pct.unwrap().value, 25.0);
//! assert_eq!(ratios.debt_to_equity.unwrap().source, Provenance::Estimated);
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Raw fundamentals as supplied by the caller; every field optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Fundamentals {
    pub net_income: Option<f64>,
    pub equity: Option<f64>,
    pub total_debt: Option<f64>,
    pub eps: Option<f64>,
    pub price: Option<f64>,
    /// Trailing P/E as published by the data source
    pub reported_pe: Option<f64>,
    pub market_cap: Option<f64>,
    pub week52_high: Option<f64>,
    pub week52_low: Option<f64>,
}

/// Where a ratio value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Published by the data source
    Reported,
    /// Computed from reported inputs
    Derived,
    /// Filled in by an estimator
    Estimated,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatioValue {
    pub value: f64,
    pub source: Provenance,
}

impl RatioValue {
    pub fn reported(value: f64) -> Self {
        Self { value, source: Provenance::Reported }
    }

    pub fn derived(value: f64) -> Self {
        Self { value, source: Provenance::Derived }
    }

    pub fn estimated(value: f64) -> Self {
        Self { value, source: Provenance::Estimated }
    }

    pub fn is_estimated(&self) -> bool {
        self.source == Provenance::Estimated
    }
}

/// Fallback for symbols whose balance sheet lacks debt or equity
pub trait DebtToEquityEstimator: Send + Sync {
    fn estimate(&self, symbol: &str) -> Option<f64>;
}

/// Never estimates; missing data stays missing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEstimate;

impl DebtToEquityEstimator for NoEstimate {
    fn estimate(&self, _symbol: &str) -> Option<f64> {
        None
    }
}

/// Caller-provided per-symbol table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticEstimates {
    table: HashMap<String, f64>,
}

impl StaticEstimates {
    pub fn new<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        Self {
            table: entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl DebtToEquityEstimator for StaticEstimates {
    fn estimate(&self, symbol: &str) -> Option<f64> {
        self.table.get(symbol).copied().filter(|v| v.is_finite())
    }
}

/// Computed ratios for one symbol
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FundamentalRatios {
    pub pe: Option<RatioValue>,
    /// Return on equity, in percent
    pub roe_pct: Option<RatioValue>,
    pub debt_to_equity: Option<RatioValue>,
    pub market_cap: Option<RatioValue>,
    pub week52_high: Option<RatioValue>,
    pub week52_low: Option<RatioValue>,
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// Denominators must be strictly positive for the ratio to mean anything.
fn positive(value: Option<f64>) -> Option<f64> {
    finite(value).filter(|&v| v > 0.0)
}

impl FundamentalRatios {
    pub fn compute(
        symbol: &str,
        inputs: &Fundamentals,
        estimator: &dyn DebtToEquityEstimator,
    ) -> Self {
        let pe = finite(inputs.reported_pe)
            .map(RatioValue::reported)
            .or_else(|| {
                let price = finite(inputs.price)?;
                let eps = positive(inputs.eps)?;
                Some(RatioValue::derived(price / eps))
            });

        let roe_pct = finite(inputs.net_income)
            .zip(positive(inputs.equity))
            .map(|(income, equity)| RatioValue::derived(income / equity * 100.0));

        let debt_to_equity = finite(inputs.total_debt)
            .zip(positive(inputs.equity))
            .map(|(debt, equity)| RatioValue::derived(debt / equity))
            .or_else(|| estimator.estimate(symbol).map(RatioValue::estimated));

        Self {
            pe,
            roe_pct,
            debt_to_equity,
            market_cap: finite(inputs.market_cap).map(RatioValue::reported),
            week52_high: finite(inputs.week52_high).map(RatioValue::reported),
            week52_low: finite(inputs.week52_low).map(RatioValue::reported),
        }
    }

    /// True if any value came from an estimator
    pub fn has_estimates(&self) -> bool {
        [
            self.pe,
            self.roe_pct,
            self.debt_to_equity,
            self.market_cap,
            self.week52_high,
            self.week52_low,
        ]
        .iter()
        .flatten()
        .any(RatioValue::is_estimated)
    }
}
