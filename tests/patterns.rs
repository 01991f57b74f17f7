//! Integration tests for chart-pattern detection and analysis.
//!
//! These tests exercise the public API through a caller-defined bar type.

use chartpat::prelude::*;
use chrono::NaiveDate;

/// Minimal caller-side bar
#[derive(Debug, Clone, Copy)]
struct TestBar {
    d: NaiveDate,
    o: f64,
    h: f64,
    l: f64,
    c: f64,
    v: f64,
}

impl OHLCV for TestBar {
    fn date(&self) -> NaiveDate {
        self.d
    }

    fn open(&self) -> f64 {
        self.o
    }

    fn high(&self) -> f64 {
        self.h
    }

    fn low(&self) -> f64 {
        self.l
    }

    fn close(&self) -> f64 {
        self.c
    }

    fn volume(&self) -> f64 {
        self.v
    }
}

fn day(i: usize) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(i as u64)
}

/// Bars whose high/low straddle the close by 1%
fn from_closes(closes: &[f64]) -> Vec<TestBar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| TestBar {
            d: day(i),
            o: c,
            h: c * 1.01,
            l: c * 0.99,
            c,
            v: 10_000.0,
        })
        .collect()
}

fn order(n: usize) -> Period {
    Period::new(n).unwrap()
}

fn pct(v: f64) -> Percent {
    Percent::new(v).unwrap()
}

// ============================================================
// DOUBLE TOP / BOTTOM
// ============================================================

#[test]
fn test_double_top_concrete_case() {
    let engine = EngineBuilder::new()
        .with_all_defaults()
        .order(order(1))
        .build()
        .unwrap();
    let bars = from_closes(&[10.0, 12.0, 15.0, 11.0, 15.2, 10.0]);

    let patterns = engine.scan(&bars).unwrap();
    assert_eq!(patterns.len(), 1);

    let top = &patterns[0];
    assert_eq!(top.pattern_type, PatternType::DoubleTop);
    assert_eq!(top.anchors.len(), 2);
    assert_eq!(top.anchors[0].index, 2);
    assert_eq!(top.anchors[1].index, 4);
    assert_eq!(top.tolerance_pct, 2.0);
    assert!(top.confidence > 0.0 && top.confidence < 1.0);
    assert!(top.pattern_type.direction().is_bearish());
}

#[test]
fn test_double_bottom_mirror() {
    let engine = EngineBuilder::new()
        .with_all_defaults()
        .order(order(1))
        .build()
        .unwrap();
    let bars = from_closes(&[15.0, 12.0, 10.0, 13.0, 10.1, 14.0]);

    let patterns = engine.scan(&bars).unwrap();
    assert_eq!(patterns.len(), 1);
    assert_eq!(patterns[0].pattern_type, PatternType::DoubleBottom);
    assert_eq!(patterns[0].start_index(), 2);
    assert_eq!(patterns[0].end_index(), 4);
}

#[test]
fn test_tolerance_is_relative() {
    let engine = EngineBuilder::new()
        .with_all_defaults()
        .order(order(1))
        .build()
        .unwrap();

    // Same shape at 100x the price level
    let small = from_closes(&[10.0, 12.0, 15.0, 11.0, 15.2, 10.0]);
    let large = from_closes(&[1000.0, 1200.0, 1500.0, 1100.0, 1520.0, 1000.0]);

    let a = engine.scan(&small).unwrap();
    let b = engine.scan(&large).unwrap();
    assert_eq!(a.len(), b.len());
    assert!((a[0].confidence - b[0].confidence).abs() < 1e-9);
}

#[test]
fn test_peaks_too_far_apart_rejected() {
    let engine = EngineBuilder::new()
        .with_all_defaults()
        .order(order(1))
        .build()
        .unwrap();
    // 15 vs 16: 6.25% apart
    let bars = from_closes(&[10.0, 12.0, 15.0, 11.0, 16.0, 10.0]);
    assert!(engine.scan(&bars).unwrap().is_empty());
}

// ============================================================
// HEAD AND SHOULDERS
// ============================================================

#[test]
fn test_head_and_shoulders_from_closes() {
    let engine = EngineBuilder::new()
        .with_tolerance(pct(5.0), pct(5.0))
        .order(order(1))
        .build()
        .unwrap();
    let bars = from_closes(&[8.0, 10.0, 9.0, 14.0, 7.0, 10.3, 6.0]);

    let patterns = engine.scan(&bars).unwrap();
    assert_eq!(patterns.len(), 1);
    let hs = &patterns[0];
    assert_eq!(hs.pattern_type, PatternType::HeadAndShoulders);
    let indices: Vec<usize> = hs.anchors.iter().map(|a| a.index).collect();
    assert_eq!(indices, vec![1, 3, 5]);
    assert_eq!(hs.start_date(), Some(day(1)));
    assert_eq!(hs.end_date(), Some(day(5)));
}

#[test]
fn test_uneven_shoulders_rejected() {
    let engine = EngineBuilder::new()
        .with_tolerance(pct(5.0), pct(5.0))
        .order(order(1))
        .only_patterns([PatternType::HeadAndShoulders])
        .build()
        .unwrap();
    let bars = from_closes(&[8.0, 10.0, 7.0, 11.0, 6.0, 9.0, 5.0]);
    assert!(engine.scan(&bars).unwrap().is_empty());
}

// ============================================================
// TREND
// ============================================================

#[test]
fn test_downtrend_label() {
    let engine = EngineBuilder::new().order(order(1)).build().unwrap();
    let bars = from_closes(&[10.0, 15.0, 8.0, 13.0, 6.0, 11.0, 4.0]);
    assert_eq!(engine.trend(&bars), TrendLabel::Downtrend);
}

#[test]
fn test_uptrend_label() {
    let engine = EngineBuilder::new().order(order(1)).build().unwrap();
    let bars = from_closes(&[4.0, 11.0, 6.0, 13.0, 8.0, 15.0, 10.0]);
    assert_eq!(engine.trend(&bars), TrendLabel::Uptrend);
}

#[test]
fn test_trend_needs_two_of_each() {
    let engine = EngineBuilder::new().order(order(1)).build().unwrap();
    let bars = from_closes(&[10.0, 15.0, 8.0, 13.0, 14.0]);
    assert_eq!(engine.trend(&bars), TrendLabel::InsufficientData);
}

// ============================================================
// ENGINE API
// ============================================================

#[test]
fn test_short_series_is_empty_not_error() {
    let engine = EngineBuilder::new().with_all_defaults().build().unwrap();
    let bars = from_closes(&[10.0, 12.0, 15.0, 11.0, 15.2, 10.0]);

    let extrema = engine.extrema(&bars);
    assert!(extrema.is_empty());
    assert!(engine.scan(&bars).unwrap().is_empty());
}

#[test]
fn test_scan_is_deterministic() {
    let engine = EngineBuilder::new()
        .with_all_defaults()
        .order(order(2))
        .build()
        .unwrap();
    let closes: Vec<f64> = (0..300)
        .map(|i| 100.0 + 10.0 * (i as f64 * 0.21).sin() + (i % 7) as f64 * 0.3)
        .collect();
    let bars = from_closes(&closes);

    let first = engine.scan(&bars).unwrap();
    let second = engine.scan(&bars).unwrap();
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn test_output_ordered_by_first_anchor() {
    let engine = EngineBuilder::new()
        .with_tolerance(pct(5.0), pct(5.0))
        .order(order(1))
        .build()
        .unwrap();
    let closes: Vec<f64> = (0..200)
        .map(|i| 50.0 + 5.0 * (i as f64 * 0.5).sin())
        .collect();
    let patterns = engine.scan(&from_closes(&closes)).unwrap();

    assert!(!patterns.is_empty());
    assert!(patterns
        .windows(2)
        .all(|w| w[0].start_index() <= w[1].start_index()));
}

#[test]
fn test_high_low_source() {
    let engine = EngineBuilder::new()
        .with_all_defaults()
        .order(order(1))
        .source(ExtremaSource::HighLow)
        .build()
        .unwrap();
    let bars = from_closes(&[10.0, 12.0, 15.0, 11.0, 15.2, 10.0]);

    let extrema = engine.extrema(&bars);
    assert_eq!(extrema.maxima.len(), 2);
    assert!((extrema.maxima[0].value - 15.15).abs() < 1e-9);
    assert!((extrema.minima[0].value - 10.89).abs() < 1e-9);
}

#[test]
fn test_strict_mode_drops_plateaus() {
    let closes = [10.0, 12.0, 15.0, 15.0, 11.0, 10.0];
    let loose = EngineBuilder::new().order(order(1)).build().unwrap();
    let strict = EngineBuilder::new()
        .order(order(1))
        .mode(ExtremaMode::Strict)
        .build()
        .unwrap();

    let bars = from_closes(&closes);
    assert_eq!(loose.extrema(&bars).maxima.len(), 2);
    assert!(strict.extrema(&bars).maxima.is_empty());
}

#[test]
fn test_malformed_series_surfaced() {
    let engine = EngineBuilder::new()
        .with_all_defaults()
        .validate_data(true)
        .build()
        .unwrap();
    let mut bars = from_closes(&[10.0, 11.0, 12.0, 13.0]);
    bars[3].h = bars[3].l - 1.0;

    assert_eq!(
        engine.scan(&bars),
        Err(PatternError::MalformedSeries {
            index: 3,
            reason: "high < low",
        })
    );
}

/// Double top restricted to peaks within half a percent
struct TightTop(DoubleTopDetector);

impl ChartPatternDetector for TightTop {
    fn pattern_type(&self) -> PatternType {
        PatternType::DoubleTop
    }

    fn min_extrema(&self) -> usize {
        3
    }

    fn detect(&self, extrema: &Extrema) -> Vec<PatternInstance> {
        self.0.detect(extrema)
    }
}

#[test]
fn test_custom_detector() {
    let tight = TightTop(DoubleTopDetector {
        tolerance_pct: pct(0.5),
    });
    let engine = EngineBuilder::new()
        .add_custom(tight)
        .order(order(1))
        .build()
        .unwrap();

    let near = from_closes(&[10.0, 12.0, 15.0, 11.0, 15.05, 10.0]);
    let far = from_closes(&[10.0, 12.0, 15.0, 11.0, 15.2, 10.0]);
    assert_eq!(engine.scan(&near).unwrap().len(), 1);
    assert!(engine.scan(&far).unwrap().is_empty());
}

#[test]
fn test_parameterized_construction() {
    let mut params = HeadAndShouldersDetector::default_params();
    params.insert("shoulder_slack", 0.0);
    let detector = HeadAndShouldersDetector::with_params(&params).unwrap();
    assert!((detector.shoulder_threshold() - 0.02).abs() < 1e-12);

    params.insert("tolerance_pct", 150.0);
    assert!(HeadAndShouldersDetector::with_params(&params).is_err());
}

// ============================================================
// SERIALIZATION
// ============================================================

#[test]
fn test_pattern_json_shape() {
    let engine = EngineBuilder::new()
        .with_all_defaults()
        .order(order(1))
        .build()
        .unwrap();
    let bars = from_closes(&[10.0, 12.0, 15.0, 11.0, 15.2, 10.0]);
    let patterns = engine.scan(&bars).unwrap();

    let json = serde_json::to_value(&patterns[0]).unwrap();
    assert_eq!(json["pattern_type"], "double_top");
    assert_eq!(json["tolerance_pct"], 2.0);
    assert_eq!(json["anchors"][0]["timestamp"], "2024-01-03");
    assert_eq!(json["anchors"][1]["value"], 15.2);
    assert!(json["anchors"][0].get("index").is_none());
}

#[test]
fn test_indicator_key_json() {
    let key = IndicatorKey::BollingerUpper {
        window: 20,
        num_std: 2.0,
    };
    assert_eq!(serde_json::to_value(key).unwrap(), "BB_UPPER(20,2)");
}
