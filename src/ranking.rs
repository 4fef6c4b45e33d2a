use crate::models::{ScreenResult, Trend};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

pub const DEFAULT_TOP_N: usize = 5;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Rankings {
    pub top_bullish: Vec<ScreenResult>,
    pub top_bearish: Vec<ScreenResult>,
}

fn deviation(r: &ScreenResult) -> f64 {
    r.deviation_pct.unwrap_or(0.0)
}

fn by_volume_desc(a: &ScreenResult, b: &ScreenResult) -> Ordering {
    b.volume_strength.total_cmp(&a.volume_strength)
}

/// Bullish results, highest deviation first; ties by stronger volume.
/// Results without a deviation are not ranked.
pub fn rank_bullish(results: &[ScreenResult], top_n: usize) -> Vec<ScreenResult> {
    let mut ranked: Vec<ScreenResult> = results
        .iter()
        .filter(|r| r.trend == Trend::Bullish && r.deviation_pct.is_some())
        .cloned()
        .collect();
    ranked.sort_by(|a, b| {
        deviation(b)
            .total_cmp(&deviation(a))
            .then_with(|| by_volume_desc(a, b))
    });
    ranked.truncate(top_n);
    ranked
}

/// Bearish results, most negative deviation first; ties by stronger volume.
pub fn rank_bearish(results: &[ScreenResult], top_n: usize) -> Vec<ScreenResult> {
    let mut ranked: Vec<ScreenResult> = results
        .iter()
        .filter(|r| r.trend == Trend::Bearish && r.deviation_pct.is_some())
        .cloned()
        .collect();
    ranked.sort_by(|a, b| {
        deviation(a)
            .total_cmp(&deviation(b))
            .then_with(|| by_volume_desc(a, b))
    });
    ranked.truncate(top_n);
    ranked
}

pub fn build_rankings(results: &[ScreenResult], top_n: usize) -> Rankings {
    Rankings {
        top_bullish: rank_bullish(results, top_n),
        top_bearish: rank_bearish(results, top_n),
    }
}

/// Keep results whose absolute deviation is at least `min_abs_pct`. A zero
/// threshold keeps everything, including results without a deviation.
pub fn filter_by_min_deviation(results: &[ScreenResult], min_abs_pct: f64) -> Vec<ScreenResult> {
    if min_abs_pct <= 0.0 {
        return results.to_vec();
    }
    results
        .iter()
        .filter(|r| r.deviation_pct.is_some_and(|d| d.abs() >= min_abs_pct))
        .cloned()
        .collect()
}

/// Case-insensitive substring match on the symbol.
pub fn filter_by_symbol(results: &[ScreenResult], needle: &str) -> Vec<ScreenResult> {
    let needle = needle.trim().to_uppercase();
    if needle.is_empty() {
        return results.to_vec();
    }
    results
        .iter()
        .filter(|r| r.symbol.to_uppercase().contains(&needle))
        .cloned()
        .collect()
}

/// Largest absolute deviation first; missing deviations last, then by symbol.
pub fn sort_by_abs_deviation(results: &mut [ScreenResult]) {
    results.sort_by(|a, b| match (a.deviation_pct, b.deviation_pct) {
        (Some(x), Some(y)) => y.abs().total_cmp(&x.abs()).then_with(|| a.symbol.cmp(&b.symbol)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.symbol.cmp(&b.symbol),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(symbol: &str, deviation: Option<f64>, volume: f64, trend: Trend) -> ScreenResult {
        ScreenResult {
            symbol: symbol.to_string(),
            price: 100.0,
            max_pain: Some(100.0),
            deviation_pct: deviation,
            ema20: Some(99.0),
            ema50: Some(98.0),
            volume_strength: volume,
            trend,
            low_confidence: false,
        }
    }

    fn symbols(results: &[ScreenResult]) -> Vec<&str> {
        results.iter().map(|r| r.symbol.as_str()).collect()
    }

    #[test]
    fn test_bullish_sorted_by_deviation_then_volume() {
        let results = vec![
            result("A", Some(2.0), 1.0, Trend::Bullish),
            result("B", Some(5.0), 1.0, Trend::Bullish),
            result("C", Some(5.0), 3.0, Trend::Bullish),
            result("D", Some(9.0), 1.0, Trend::Bearish),
        ];
        assert_eq!(symbols(&rank_bullish(&results, 5)), vec!["C", "B", "A"]);
    }

    #[test]
    fn test_bearish_most_negative_first() {
        let results = vec![
            result("A", Some(-2.0), 1.0, Trend::Bearish),
            result("B", Some(-7.0), 1.0, Trend::Bearish),
            result("C", Some(-7.0), 2.0, Trend::Bearish),
            result("D", None, 9.0, Trend::Bearish),
        ];
        assert_eq!(symbols(&rank_bearish(&results, 5)), vec!["C", "B", "A"]);
    }

    #[test]
    fn test_rankings_truncate_to_top_n() {
        let results: Vec<ScreenResult> = (0..8)
            .map(|i| result(&format!("S{}", i), Some(i as f64), 1.0, Trend::Bullish))
            .collect();
        let rankings = build_rankings(&results, DEFAULT_TOP_N);
        assert_eq!(rankings.top_bullish.len(), 5);
        assert_eq!(rankings.top_bullish[0].symbol, "S7");
        assert!(rankings.top_bearish.is_empty());
    }

    #[test]
    fn test_min_deviation_filter() {
        let results = vec![
            result("A", Some(1.0), 1.0, Trend::Neutral),
            result("B", Some(-3.0), 1.0, Trend::Neutral),
            result("C", None, 1.0, Trend::Neutral),
        ];
        assert_eq!(symbols(&filter_by_min_deviation(&results, 2.0)), vec!["B"]);
        assert_eq!(filter_by_min_deviation(&results, 0.0).len(), 3);
    }

    #[test]
    fn test_symbol_filter_is_case_insensitive() {
        let results = vec![
            result("INFY", Some(1.0), 1.0, Trend::Neutral),
            result("RELIANCE", Some(1.0), 1.0, Trend::Neutral),
        ];
        assert_eq!(symbols(&filter_by_symbol(&results, "inf")), vec!["INFY"]);
    }

    #[test]
    fn test_sort_by_abs_deviation() {
        let mut results = vec![
            result("A", Some(1.0), 1.0, Trend::Neutral),
            result("B", None, 1.0, Trend::Neutral),
            result("C", Some(-4.0), 1.0, Trend::Neutral),
        ];
        sort_by_abs_deviation(&mut results);
        assert_eq!(symbols(&results), vec!["C", "A", "B"]);
    }
}
