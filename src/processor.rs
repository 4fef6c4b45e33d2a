use crate::models::{OptionChainSnapshot, StrikeOpenInterest};
use serde::{Deserialize, Serialize};

/// Outcome of the max-pain search over one expiry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MaxPain {
    /// `strike` is always one of the input strikes.
    Computed { strike: f64, payout: f64 },
    /// No valid strikes for the expiry.
    NotComputable,
}

impl MaxPain {
    pub fn strike(&self) -> Option<f64> {
        match self {
            MaxPain::Computed { strike, .. } => Some(*strike),
            MaxPain::NotComputable => None,
        }
    }

    pub fn is_computable(&self) -> bool {
        matches!(self, MaxPain::Computed { .. })
    }
}

/// Merge duplicate strikes (summing both legs) and sort ascending.
/// Non-finite strikes are dropped.
pub fn normalize_strikes(strikes: &[StrikeOpenInterest]) -> Vec<StrikeOpenInterest> {
    let mut sorted: Vec<StrikeOpenInterest> = strikes
        .iter()
        .filter(|s| s.strike.is_finite())
        .copied()
        .collect();
    sorted.sort_by(|a, b| a.strike.total_cmp(&b.strike));

    let mut merged: Vec<StrikeOpenInterest> = Vec::with_capacity(sorted.len());
    for row in sorted {
        match merged.last_mut() {
            Some(last) if last.strike == row.strike => {
                last.call_oi = last.call_oi.saturating_add(row.call_oi);
                last.put_oi = last.put_oi.saturating_add(row.put_oi);
            }
            _ => merged.push(row),
        }
    }
    merged
}

/// Total intrinsic value paid to option holders if the underlying settles at
/// `settlement`.
pub fn payout_at(strikes: &[StrikeOpenInterest], settlement: f64) -> f64 {
    strikes
        .iter()
        .map(|k| {
            let call = (settlement - k.strike).max(0.0) * k.call_oi as f64;
            let put = (k.strike - settlement).max(0.0) * k.put_oi as f64;
            call + put
        })
        .sum()
}

/// `(strike, payout)` for every distinct strike, ascending.
pub fn payout_curve(strikes: &[StrikeOpenInterest]) -> Vec<(f64, f64)> {
    let normalized = normalize_strikes(strikes);
    normalized
        .iter()
        .map(|candidate| (candidate.strike, payout_at(&normalized, candidate.strike)))
        .collect()
}

/// Strike minimising buyer payout. Ties resolve to the smallest strike.
pub fn compute_max_pain(strikes: &[StrikeOpenInterest]) -> MaxPain {
    let mut best: Option<(f64, f64)> = None;

    for (strike, payout) in payout_curve(strikes) {
        // strict comparison keeps the first (lowest) strike on ties
        match best {
            Some((_, best_payout)) if payout >= best_payout => {}
            _ => best = Some((strike, payout)),
        }
    }

    match best {
        Some((strike, payout)) => MaxPain::Computed { strike, payout },
        None => MaxPain::NotComputable,
    }
}

/// Max pain for a whole snapshot.
pub fn process_snapshot(snapshot: &OptionChainSnapshot) -> MaxPain {
    let max_pain = compute_max_pain(&snapshot.strikes);
    tracing::debug!(
        symbol = %snapshot.symbol,
        strikes = snapshot.strikes.len(),
        max_pain = ?max_pain.strike(),
        "computed max pain"
    );
    max_pain
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oi(strike: f64, call_oi: u64, put_oi: u64) -> StrikeOpenInterest {
        StrikeOpenInterest::new(strike, call_oi, put_oi)
    }

    #[test]
    fn test_normalize_sums_duplicates() {
        let rows = vec![oi(110.0, 5, 1), oi(100.0, 2, 3), oi(110.0, 4, 6)];
        let normalized = normalize_strikes(&rows);
        assert_eq!(normalized, vec![oi(100.0, 2, 3), oi(110.0, 9, 7)]);
    }

    #[test]
    fn test_normalize_drops_nan_strikes() {
        let rows = vec![oi(f64::NAN, 5, 5), oi(100.0, 1, 1)];
        assert_eq!(normalize_strikes(&rows), vec![oi(100.0, 1, 1)]);
    }

    #[test]
    fn test_payout_at_the_money_is_zero_for_that_strike() {
        let rows = vec![oi(100.0, 50, 50)];
        assert_eq!(payout_at(&rows, 100.0), 0.0);
    }

    #[test]
    fn test_two_strike_example() {
        let rows = vec![oi(100.0, 10, 0), oi(110.0, 0, 20)];
        assert_eq!(payout_at(&rows, 100.0), 200.0);
        assert_eq!(payout_at(&rows, 110.0), 100.0);
        assert_eq!(
            compute_max_pain(&rows),
            MaxPain::Computed { strike: 110.0, payout: 100.0 }
        );
    }

    #[test]
    fn test_empty_is_not_computable() {
        assert_eq!(compute_max_pain(&[]), MaxPain::NotComputable);
        assert_eq!(MaxPain::NotComputable.strike(), None);
    }

    #[test]
    fn test_all_zero_oi_returns_lowest_strike() {
        let rows = vec![oi(120.0, 0, 0), oi(100.0, 0, 0), oi(110.0, 0, 0)];
        assert_eq!(
            compute_max_pain(&rows),
            MaxPain::Computed { strike: 100.0, payout: 0.0 }
        );
    }

    #[test]
    fn test_tie_prefers_smaller_strike() {
        // payout(100) = 10 * 10 (put at 110) = 100
        // payout(110) = 10 * 10 (call at 100) = 100
        let rows = vec![oi(110.0, 0, 10), oi(100.0, 10, 0)];
        for _ in 0..5 {
            assert_eq!(compute_max_pain(&rows).strike(), Some(100.0));
        }
    }

    #[test]
    fn test_payout_curve_is_ascending() {
        let rows = vec![oi(120.0, 1, 0), oi(100.0, 0, 1), oi(110.0, 1, 1)];
        let curve = payout_curve(&rows);
        let strikes: Vec<f64> = curve.iter().map(|(s, _)| *s).collect();
        assert_eq!(strikes, vec![100.0, 110.0, 120.0]);
    }
}
