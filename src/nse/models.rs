use crate::models::{OptionChainSnapshot, PricePoint, PriceSeries, StrikeOpenInterest};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractInfo {
    #[serde(rename = "expiryDates")]
    pub expiry_dates: Vec<String>,

    #[serde(rename = "strikePrice", default)]
    pub strike_prices: Vec<String>,
}

/// Response from the NSE option chain API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionChain {
    pub records: Records,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Records {
    #[serde(default)]
    pub timestamp: Option<String>,

    #[serde(rename = "underlyingValue", default)]
    pub underlying_value: Option<f64>,

    #[serde(default)]
    pub data: Vec<OptionData>,

    #[serde(rename = "expiryDates", default)]
    pub expiry_dates: Vec<String>,
}

/// One strike row. The v3 endpoint names the expiry `expiryDates`, older
/// payloads use `expiryDate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionData {
    #[serde(rename = "expiryDates", alias = "expiryDate", default)]
    pub expiry_date: Option<String>,

    #[serde(rename = "strikePrice", default)]
    pub strike_price: Option<f64>,

    #[serde(rename = "CE", default)]
    pub call: Option<OptionDetail>,

    #[serde(rename = "PE", default)]
    pub put: Option<OptionDetail>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionDetail {
    #[serde(rename = "openInterest", default)]
    pub open_interest: Option<f64>,

    #[serde(rename = "lastPrice", default)]
    pub last_price: Option<f64>,

    #[serde(rename = "totalTradedVolume", default)]
    pub total_traded_volume: Option<f64>,
}

/// NSE reports OI as a float. Anything negative or non-finite counts as zero.
fn leg_oi(symbol: &str, strike: f64, detail: Option<&OptionDetail>) -> u64 {
    match detail.and_then(|d| d.open_interest) {
        Some(oi) if oi.is_finite() && oi >= 0.0 => oi.round() as u64,
        Some(oi) => {
            tracing::warn!(symbol, strike, oi, "discarding invalid open interest");
            0
        }
        None => 0,
    }
}

impl OptionChain {
    /// Rows for `expiry` folded into a snapshot. When `expiry` is `None` every
    /// row is used.
    pub fn to_snapshot(&self, symbol: &str, expiry: Option<&str>) -> OptionChainSnapshot {
        let strikes = self
            .records
            .data
            .iter()
            .filter(|row| match (expiry, row.expiry_date.as_deref()) {
                (Some(wanted), Some(actual)) => wanted.eq_ignore_ascii_case(actual),
                _ => true,
            })
            .filter_map(|row| {
                let strike = row.strike_price?;
                Some(StrikeOpenInterest::new(
                    strike,
                    leg_oi(symbol, strike, row.call.as_ref()),
                    leg_oi(symbol, strike, row.put.as_ref()),
                ))
            })
            .collect();

        OptionChainSnapshot {
            symbol: symbol.to_string(),
            expiry: expiry.map(str::to_string),
            underlying_value: self.records.underlying_value,
            strikes,
        }
    }
}

/// Response from the NSE historical equity API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalResponse {
    #[serde(default)]
    pub data: Vec<HistoricalRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalRow {
    #[serde(rename = "CH_TIMESTAMP")]
    pub timestamp: String,

    #[serde(rename = "CH_CLOSING_PRICE")]
    pub close: Option<f64>,

    #[serde(rename = "CH_TOT_TRADED_QTY", default)]
    pub volume: Option<f64>,
}

impl HistoricalResponse {
    /// Rows with a parseable date and close, oldest first, trimmed to the most
    /// recent `lookback` sessions. Same-day duplicates keep the last row.
    pub fn to_series(&self, lookback: usize) -> PriceSeries {
        let mut points: Vec<PricePoint> = self
            .data
            .iter()
            .filter_map(|row| {
                let date = NaiveDate::parse_from_str(&row.timestamp, "%Y-%m-%d").ok()?;
                let close = row.close.filter(|c| c.is_finite())?;
                Some(PricePoint {
                    date,
                    close,
                    volume: row.volume.filter(|v| v.is_finite()).unwrap_or(0.0),
                })
            })
            .collect();

        points.sort_by_key(|p| p.date);
        points.reverse();
        points.dedup_by_key(|p| p.date);
        points.reverse();

        let mut series = PriceSeries::new(points);
        series.truncate_to_recent(lookback);
        series
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHAIN_JSON: &str = r#"{
        "records": {
            "timestamp": "14-Oct-2026 15:30:00",
            "underlyingValue": 104.5,
            "expiryDates": ["28-Oct-2026", "25-Nov-2026"],
            "data": [
                {"expiryDates": "28-Oct-2026", "strikePrice": 100,
                 "CE": {"openInterest": 10}, "PE": {"openInterest": 5}},
                {"expiryDates": "28-Oct-2026", "strikePrice": 110,
                 "CE": {"openInterest": 3}},
                {"expiryDates": "25-Nov-2026", "strikePrice": 100,
                 "CE": {"openInterest": 999}, "PE": {"openInterest": 999}},
                {"expiryDates": "28-Oct-2026", "strikePrice": 120,
                 "PE": {"openInterest": -4}}
            ]
        }
    }"#;

    #[test]
    fn test_snapshot_filters_to_expiry() {
        let chain: OptionChain = serde_json::from_str(CHAIN_JSON).unwrap();
        let snapshot = chain.to_snapshot("TEST", Some("28-Oct-2026"));
        assert_eq!(snapshot.underlying_value, Some(104.5));
        assert_eq!(
            snapshot.strikes,
            vec![
                StrikeOpenInterest::new(100.0, 10, 5),
                StrikeOpenInterest::new(110.0, 3, 0),
                StrikeOpenInterest::new(120.0, 0, 0),
            ]
        );
    }

    #[test]
    fn test_snapshot_without_expiry_keeps_all_rows() {
        let chain: OptionChain = serde_json::from_str(CHAIN_JSON).unwrap();
        assert_eq!(chain.to_snapshot("TEST", None).strikes.len(), 4);
    }

    #[test]
    fn test_history_sorted_and_trimmed() {
        let json = r#"{"data": [
            {"CH_TIMESTAMP": "2026-10-13", "CH_CLOSING_PRICE": 103.0, "CH_TOT_TRADED_QTY": 300},
            {"CH_TIMESTAMP": "2026-10-09", "CH_CLOSING_PRICE": 101.0, "CH_TOT_TRADED_QTY": 100},
            {"CH_TIMESTAMP": "2026-10-12", "CH_CLOSING_PRICE": 102.0, "CH_TOT_TRADED_QTY": 200},
            {"CH_TIMESTAMP": "bad-date", "CH_CLOSING_PRICE": 1.0}
        ]}"#;
        let response: HistoricalResponse = serde_json::from_str(json).unwrap();
        let series = response.to_series(2);
        assert_eq!(series.closes(), vec![102.0, 103.0]);
        assert_eq!(series.volumes(), vec![200.0, 300.0]);
        assert!(!series.synthetic);
    }
}
