//! Parameter metadata for pattern detectors
//!
//! Describes each detector's tunable thresholds so they can be documented,
//! validated and swept over a grid.
//!
//! # Example
//!
//! ```rust
//! use chartpat::params::{ParamType, ParameterizedDetector};
//! use chartpat::prelude::*;
//!
//! for param in HeadAndShouldersDetector::param_meta() {
//!     assert_eq!(param.param_type, ParamType::Percent);
//!     println!("{}: default {} over {:?}", param.name, param.default, param.generate_grid());
//! }
//! ```

use std::collections::HashMap;

use crate::{PatternError, PatternType, Percent, Result};

// ============================================================
// PARAMETER TYPES
// ============================================================

/// Type of parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
  /// Percentage in 0.0..=100.0
  Percent,
}

/// Metadata for a single detector parameter
#[derive(Debug, Clone)]
pub struct ParamMeta {
  pub name: &'static str,
  pub param_type: ParamType,
  pub default: f64,
  /// Range for optimization: (min, max, step)
  pub range: (f64, f64, f64),
  pub description: &'static str,
}

impl ParamMeta {
  pub const fn percent(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Percent, default, range, description }
  }

  /// All grid values from `min` to `max` inclusive, stepping by `step`
  pub fn generate_grid(&self) -> Vec<f64> {
    let (min, max, step) = self.range;
    if step <= 0.0 {
      return vec![min];
    }
    let steps = ((max - min) / step + 1e-9).floor() as usize;
    (0..=steps).map(|k| min + k as f64 * step).collect()
  }

  /// Validate a value against the range and the parameter type
  pub fn validate(&self, value: f64) -> Result<()> {
    let (min, max, _) = self.range;
    if !(min..=max).contains(&value) {
      return Err(PatternError::OutOfRange { field: self.name, value, min, max });
    }
    match self.param_type {
      ParamType::Percent => Percent::new(value).map(|_| ()),
    }
  }
}

// ============================================================
// PARAMETERIZED DETECTOR TRAIT
// ============================================================

/// Detectors whose thresholds can be discovered and set by name
pub trait ParameterizedDetector: Sized {
  fn param_meta() -> &'static [ParamMeta];

  /// Missing parameters use their default values.
  fn with_params(params: &HashMap<&str, f64>) -> Result<Self>;

  fn pattern() -> PatternType;

  /// Name -> default value for every parameter
  fn default_params() -> HashMap<&'static str, f64> {
    Self::param_meta().iter().map(|m| (m.name, m.default)).collect()
  }
}

// ============================================================
// PARAMETER VALUE HELPERS
// ============================================================

pub fn get_percent(params: &HashMap<&str, f64>, key: &str, default: f64) -> Result<Percent> {
  Percent::new(params.get(key).copied().unwrap_or(default))
}
