//! Chart pattern detectors built on local extrema
//!
//! # Components
//!
//! - **Extrema**: symmetric-window local maxima/minima of a price series
//! - **Double top / double bottom**: consecutive equal-height peaks (troughs)
//!   separated by a pullback
//! - **Head and shoulders**: three consecutive peaks, the middle one highest,
//!   flanked by roughly level shoulders
//! - **Trend**: higher-highs/higher-lows style classification

pub mod helpers;

/// Generate `with_defaults()` -> `Self::default()` for multiple detector types.
macro_rules! impl_with_defaults {
  ($($detector:ty),* $(,)?) => {
    $(impl $detector {
      pub fn with_defaults() -> Self { Self::default() }
    })*
  };
}

pub mod double;
pub mod extrema;
pub mod head_shoulders;
pub mod trend;

pub use double::*;
pub use extrema::*;
pub use head_shoulders::*;
pub use helpers::*;
pub use trend::*;
