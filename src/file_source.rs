//! Offline market data from a JSON dataset file.
//!
//! ```json
//! {
//!   "INFY": {
//!     "expiry": "28-Oct-2026",
//!     "underlying_value": 1510.5,
//!     "strikes": [{"strike": 1500, "call_oi": 1200, "put_oi": 900}],
//!     "history": [{"date": "2026-10-13", "close": 1502.0, "volume": 350000}]
//!   }
//! }
//! ```

use crate::error::{Result, ScreenError};
use crate::models::{OptionChainSnapshot, PricePoint, PriceSeries, StrikeOpenInterest};
use crate::source::MarketDataSource;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatasetEntry {
    #[serde(default)]
    pub expiry: Option<String>,
    #[serde(default)]
    pub underlying_value: Option<f64>,
    #[serde(default)]
    pub strikes: Vec<StrikeOpenInterest>,
    #[serde(default)]
    pub history: Vec<PricePoint>,
}

#[derive(Debug, Clone, Default)]
pub struct FileSource {
    entries: BTreeMap<String, DatasetEntry>,
}

impl FileSource {
    pub fn from_entries(entries: BTreeMap<String, DatasetEntry>) -> Self {
        Self { entries }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let entries: BTreeMap<String, DatasetEntry> = serde_json::from_str(json)?;
        Ok(Self { entries })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let source = Self::from_json(&json)?;
        tracing::info!(path = %path.display(), symbols = source.entries.len(), "loaded dataset");
        Ok(source)
    }

    fn entry(&self, symbol: &str) -> Result<&DatasetEntry> {
        self.entries
            .get(symbol)
            .ok_or_else(|| ScreenError::unavailable(symbol, "symbol not in dataset"))
    }
}

#[async_trait]
impl MarketDataSource for FileSource {
    async fn fetch_option_chain(&self, symbol: &str) -> Result<OptionChainSnapshot> {
        let entry = self.entry(symbol)?;
        Ok(OptionChainSnapshot {
            symbol: symbol.to_string(),
            expiry: entry.expiry.clone(),
            underlying_value: entry.underlying_value,
            strikes: entry.strikes.clone(),
        })
    }

    async fn fetch_price_history(
        &self,
        symbol: &str,
        lookback_sessions: usize,
    ) -> Result<PriceSeries> {
        let entry = self.entry(symbol)?;
        if entry.history.is_empty() {
            return Err(ScreenError::unavailable(symbol, "no price history"));
        }
        let mut series = PriceSeries::new(entry.history.clone());
        series.truncate_to_recent(lookback_sessions);
        Ok(series)
    }

    async fn list_symbols(&self) -> Result<Vec<String>> {
        Ok(self.entries.keys().cloned().collect())
    }
}
