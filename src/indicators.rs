//! Smoothing and volume indicators over a closing-price series.
//!
//! EMA follows the recursive form with multiplier `k = 2 / (span + 1)`,
//! seeded from the first observation. With fewer points than `span` the value
//! is computed over what exists; it is less stable but still returned.

pub const EMA_SHORT_SPAN: usize = 20;
pub const EMA_LONG_SPAN: usize = 50;
pub const VOLUME_WINDOW: usize = 20;

/// Full EMA path, one value per input. Empty for empty input or `span == 0`.
pub fn ema_series(values: &[f64], span: usize) -> Vec<f64> {
    if values.is_empty() || span == 0 {
        return Vec::new();
    }

    let k = 2.0 / (span as f64 + 1.0);
    let mut result = Vec::with_capacity(values.len());
    let mut prev = values[0];
    result.push(prev);

    for &value in &values[1..] {
        prev += k * (value - prev);
        result.push(prev);
    }

    result
}

/// Latest EMA value.
pub fn ema(values: &[f64], span: usize) -> Option<f64> {
    ema_series(values, span).last().copied()
}

/// Simple average of the trailing `window` values. `None` if there are fewer.
pub fn sma(values: &[f64], window: usize) -> Option<f64> {
    if window == 0 || values.len() < window {
        return None;
    }
    let tail = &values[values.len() - window..];
    Some(tail.iter().sum::<f64>() / window as f64)
}

/// Latest volume over its trailing `window`-session average (the average
/// includes the latest session). Exactly `1.0` when there are fewer than
/// `window` samples or the average is zero or not finite.
pub fn volume_strength(volumes: &[f64], window: usize) -> f64 {
    let Some(latest) = volumes.last().copied() else {
        return 1.0;
    };

    match sma(volumes, window) {
        Some(avg) if avg.is_finite() && avg > 0.0 && latest.is_finite() => latest / avg,
        _ => 1.0,
    }
}
