use crate::indicators::{self, EMA_LONG_SPAN, EMA_SHORT_SPAN, VOLUME_WINDOW};
use crate::models::{PriceSeries, ScreenResult, Trend};
use serde::{Deserialize, Serialize};

/// Indicators derived for one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub deviation_pct: Option<f64>,
    pub ema20: Option<f64>,
    pub ema50: Option<f64>,
    pub volume_strength: f64,
    pub trend: Trend,
}

/// Percent distance of the current price from the max-pain strike.
/// Absent when there is no strike, or the strike is zero.
pub fn deviation_pct(current_price: f64, max_pain_strike: Option<f64>) -> Option<f64> {
    let strike = max_pain_strike?;
    if strike == 0.0 {
        return None;
    }
    let pct = (current_price - strike) / strike * 100.0;
    pct.is_finite().then_some(pct)
}

/// Bullish when price > ema20 > ema50, Bearish when price < ema20 < ema50,
/// otherwise Neutral. Missing EMAs are Neutral.
pub fn classify_trend(current_price: f64, ema20: Option<f64>, ema50: Option<f64>) -> Trend {
    let (Some(short), Some(long)) = (ema20, ema50) else {
        return Trend::Neutral;
    };

    if current_price > short && short > long {
        Trend::Bullish
    } else if current_price < short && short < long {
        Trend::Bearish
    } else {
        Trend::Neutral
    }
}

pub fn classify(
    series: &PriceSeries,
    current_price: f64,
    max_pain_strike: Option<f64>,
) -> Classification {
    let closes = series.closes();
    let volumes = series.volumes();

    let ema20 = indicators::ema(&closes, EMA_SHORT_SPAN);
    let ema50 = indicators::ema(&closes, EMA_LONG_SPAN);

    Classification {
        deviation_pct: deviation_pct(current_price, max_pain_strike),
        ema20,
        ema50,
        volume_strength: indicators::volume_strength(&volumes, VOLUME_WINDOW),
        trend: classify_trend(current_price, ema20, ema50),
    }
}

/// Assemble the per-symbol record. Synthetic series or one too short for a
/// stable EMA50 marks the result low confidence.
pub fn build_screen_result(
    symbol: &str,
    current_price: f64,
    max_pain_strike: Option<f64>,
    series: &PriceSeries,
) -> ScreenResult {
    let c = classify(series, current_price, max_pain_strike);
    ScreenResult {
        symbol: symbol.to_string(),
        price: current_price,
        max_pain: max_pain_strike,
        deviation_pct: c.deviation_pct,
        ema20: c.ema20,
        ema50: c.ema50,
        volume_strength: c.volume_strength,
        trend: c.trend,
        low_confidence: series.synthetic || series.len() < EMA_LONG_SPAN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PricePoint;
    use chrono::NaiveDate;

    fn series_from(closes: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        PriceSeries::new(
            closes
                .iter()
                .enumerate()
                .map(|(i, &close)| PricePoint {
                    date: start + chrono::Duration::days(i as i64),
                    close,
                    volume: 1000.0,
                })
                .collect(),
        )
    }

    #[test]
    fn test_trend_labels() {
        assert_eq!(classify_trend(100.0, Some(95.0), Some(90.0)), Trend::Bullish);
        assert_eq!(classify_trend(80.0, Some(85.0), Some(90.0)), Trend::Bearish);
        assert_eq!(classify_trend(100.0, Some(105.0), Some(90.0)), Trend::Neutral);
        assert_eq!(classify_trend(100.0, None, Some(90.0)), Trend::Neutral);
    }

    #[test]
    fn test_trend_requires_strict_inequality() {
        assert_eq!(classify_trend(95.0, Some(95.0), Some(90.0)), Trend::Neutral);
        assert_eq!(classify_trend(100.0, Some(90.0), Some(90.0)), Trend::Neutral);
    }

    #[test]
    fn test_deviation_absent_for_zero_strike() {
        assert_eq!(deviation_pct(100.0, Some(0.0)), None);
        assert_eq!(deviation_pct(100.0, None), None);
    }

    #[test]
    fn test_deviation_value() {
        assert_eq!(deviation_pct(110.0, Some(100.0)), Some(10.0));
        assert_eq!(deviation_pct(90.0, Some(100.0)), Some(-10.0));
    }

    #[test]
    fn test_rising_series_is_bullish() {
        let closes: Vec<f64> = (0..80).map(|i| 100.0 + i as f64).collect();
        let c = classify(&series_from(&closes), 185.0, Some(170.0));
        assert_eq!(c.trend, Trend::Bullish);
        assert!(c.ema20.unwrap() > c.ema50.unwrap());
    }

    #[test]
    fn test_falling_series_is_bearish() {
        let closes: Vec<f64> = (0..80).map(|i| 200.0 - i as f64).collect();
        let c = classify(&series_from(&closes), 115.0, Some(130.0));
        assert_eq!(c.trend, Trend::Bearish);
        assert!(c.deviation_pct.unwrap() < 0.0);
    }

    #[test]
    fn test_empty_series_is_neutral() {
        let c = classify(&PriceSeries::default(), 100.0, Some(100.0));
        assert_eq!(c.trend, Trend::Neutral);
        assert_eq!(c.ema20, None);
        assert_eq!(c.volume_strength, 1.0);
    }

    #[test]
    fn test_short_series_marks_low_confidence() {
        let result = build_screen_result("TCS", 100.0, Some(100.0), &series_from(&[99.0; 10]));
        assert!(result.low_confidence);
        assert_eq!(result.deviation_pct, Some(0.0));
    }
}
