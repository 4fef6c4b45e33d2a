use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Security {
    pub symbol: String,
    pub security_type: SecurityType,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SecurityType {
    Equity,
    Indices,
}

impl Security {
    pub fn equity(symbol: String) -> Self {
        Self { symbol, security_type: SecurityType::Equity }
    }

    pub fn index(symbol: String) -> Self {
        Self { symbol, security_type: SecurityType::Indices }
    }
}

/// Open interest at one strike for one expiry. A missing leg is zero.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct StrikeOpenInterest {
    pub strike: f64,
    #[serde(default)]
    pub call_oi: u64,
    #[serde(default)]
    pub put_oi: u64,
}

impl StrikeOpenInterest {
    pub fn new(strike: f64, call_oi: u64, put_oi: u64) -> Self {
        Self { strike, call_oi, put_oi }
    }
}

/// Nearest-expiry option chain for one symbol.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OptionChainSnapshot {
    pub symbol: String,
    pub expiry: Option<String>,
    /// Spot price reported alongside the chain, when the source has one.
    #[serde(default)]
    pub underlying_value: Option<f64>,
    pub strikes: Vec<StrikeOpenInterest>,
}

impl OptionChainSnapshot {
    pub fn new(symbol: impl Into<String>, strikes: Vec<StrikeOpenInterest>) -> Self {
        Self {
            symbol: symbol.into(),
            expiry: None,
            underlying_value: None,
            strikes,
        }
    }

    pub fn with_underlying(mut self, value: f64) -> Self {
        self.underlying_value = Some(value);
        self
    }

    pub fn with_expiry(mut self, expiry: impl Into<String>) -> Self {
        self.expiry = Some(expiry.into());
        self
    }
}

/// One trading session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
    pub volume: f64,
}

/// Chronological sessions, oldest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PriceSeries {
    pub points: Vec<PricePoint>,
    /// Set when the series was fabricated instead of fetched.
    #[serde(default)]
    pub synthetic: bool,
}

impl PriceSeries {
    /// Builds a series and sorts it by date.
    pub fn new(mut points: Vec<PricePoint>) -> Self {
        points.sort_by_key(|p| p.date);
        Self { points, synthetic: false }
    }

    /// Repeats `price` for `sessions` days ending at `end` with zero volume.
    /// Every indicator computed over it is flat, so callers must treat the
    /// resulting trend read as low confidence.
    pub fn flat(price: f64, sessions: usize, end: NaiveDate) -> Self {
        let points = (0..sessions)
            .rev()
            .map(|offset| PricePoint {
                date: end - chrono::Duration::days(offset as i64),
                close: price,
                volume: 0.0,
            })
            .collect();
        Self { points, synthetic: true }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.volume).collect()
    }

    pub fn last_close(&self) -> Option<f64> {
        self.points.last().map(|p| p.close)
    }

    /// Keeps only the most recent `sessions` points.
    pub fn truncate_to_recent(&mut self, sessions: usize) {
        if self.points.len() > sessions {
            let excess = self.points.len() - sessions;
            self.points.drain(..excess);
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Trend {
    Bullish,
    Bearish,
    Neutral,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Trend::Bullish => write!(f, "Bullish"),
            Trend::Bearish => write!(f, "Bearish"),
            Trend::Neutral => write!(f, "Neutral"),
        }
    }
}

/// Per-symbol output of one screening run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScreenResult {
    pub symbol: String,
    pub price: f64,
    pub max_pain: Option<f64>,
    pub deviation_pct: Option<f64>,
    pub ema20: Option<f64>,
    pub ema50: Option<f64>,
    pub volume_strength: f64,
    pub trend: Trend,
    /// History was synthetic or too short for a stable EMA50.
    #[serde(default)]
    pub low_confidence: bool,
}
