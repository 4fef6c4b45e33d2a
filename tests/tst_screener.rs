
use async_trait::async_trait;
use chrono::NaiveDate;
use maxpain_screener::error::{Result, ScreenError};
use maxpain_screener::models::{
    OptionChainSnapshot, PricePoint, PriceSeries, StrikeOpenInterest, Trend,
};
use maxpain_screener::screener::{Screener, ScreenerConfig};
use maxpain_screener::source::MarketDataSource;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct FakeEntry {
    snapshot: OptionChainSnapshot,
    closes: Option<Vec<f64>>,
}

#[derive(Default)]
struct FakeSource {
    entries: HashMap<String, FakeEntry>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    delay: Option<Duration>,
}

impl FakeSource {
    fn with(mut self, symbol: &str, snapshot: OptionChainSnapshot, closes: Option<Vec<f64>>) -> Self {
        self.entries.insert(symbol.to_string(), FakeEntry { snapshot, closes });
        self
    }

    fn entry(&self, symbol: &str) -> Result<&FakeEntry> {
        self.entries
            .get(symbol)
            .ok_or_else(|| ScreenError::unavailable(symbol, "unknown symbol"))
    }
}

#[async_trait]
impl MarketDataSource for FakeSource {
    async fn fetch_option_chain(&self, symbol: &str) -> Result<OptionChainSnapshot> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(self.entry(symbol)?.snapshot.clone())
    }

    async fn fetch_price_history(&self, symbol: &str, lookback_sessions: usize) -> Result<PriceSeries> {
        let Some(closes) = &self.entry(symbol)?.closes else {
            return Err(ScreenError::unavailable(symbol, "no price history"));
        };
        let start = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        let mut series = PriceSeries::new(
            closes
                .iter()
                .enumerate()
                .map(|(i, &close)| PricePoint {
                    date: start + chrono::Duration::days(i as i64),
                    close,
                    volume: 1000.0,
                })
                .collect(),
        );
        series.truncate_to_recent(lookback_sessions);
        Ok(series)
    }

    async fn list_symbols(&self) -> Result<Vec<String>> {
        let mut symbols: Vec<String> = self.entries.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

fn rising() -> Vec<f64> {
    (0..60).map(|i| 100.0 + i as f64).collect()
}

fn falling() -> Vec<f64> {
    (0..60).map(|i| 160.0 - i as f64).collect()
}

fn chain(symbol: &str, strike: f64, underlying: f64) -> OptionChainSnapshot {
    OptionChainSnapshot::new(symbol, vec![StrikeOpenInterest::new(strike, 100, 100)])
        .with_underlying(underlying)
        .with_expiry("28-Oct-2026")
}

fn three_symbol_source() -> FakeSource {
    FakeSource::default()
        .with("AAA", chain("AAA", 150.0, 165.0), Some(rising()))
        .with("BBB", chain("BBB", 100.0, 95.0), Some(falling()))
        .with("CCC", OptionChainSnapshot::new("CCC", Vec::new()), Some(rising()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_end_to_end_three_symbols() {
        let screener = Screener::new(Arc::new(three_symbol_source()), ScreenerConfig::default());
        let symbols: Vec<String> = ["ccc", "BBB", "AAA"].iter().map(|s| s.to_string()).collect();
        let report = screener.run(&symbols).await;

        assert_eq!(report.total_symbols, 3);
        let screened: Vec<&str> = report.results.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(screened, vec!["AAA", "BBB"]);

        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].symbol, "CCC");

        let aaa = &report.results[0];
        assert_eq!(aaa.max_pain, Some(150.0));
        assert!((aaa.deviation_pct.unwrap() - 10.0).abs() < 1e-9);
        assert_eq!(aaa.trend, Trend::Bullish);
        assert_eq!(aaa.volume_strength, 1.0);
        assert!(!aaa.low_confidence);

        let bbb = &report.results[1];
        assert!((bbb.deviation_pct.unwrap() + 5.0).abs() < 1e-9);
        assert_eq!(bbb.trend, Trend::Bearish);

        // one qualifying symbol per side, well under the top-5 cap
        assert_eq!(report.rankings.top_bullish.len(), 1);
        assert_eq!(report.rankings.top_bearish.len(), 1);
        assert_eq!(report.rankings.top_bullish[0].symbol, "AAA");
        assert_eq!(report.rankings.top_bearish[0].symbol, "BBB");
    }

    #[tokio::test]
    async fn test_universe_from_source() {
        let screener = Screener::new(Arc::new(three_symbol_source()), ScreenerConfig::default());
        let report = screener.run_universe().await.unwrap();
        assert_eq!(report.total_symbols, 3);
        assert_eq!(report.results.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_symbol_is_skipped_not_fatal() {
        let screener = Screener::new(Arc::new(three_symbol_source()), ScreenerConfig::default());
        let report = screener.run(&["AAA".to_string(), "ZZZ".to_string()]).await;
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.skipped[0].symbol, "ZZZ");
        assert!(report.skipped[0].reason.contains("unknown symbol"));
    }

    #[tokio::test]
    async fn test_missing_history_skipped_without_fallback() {
        let source = FakeSource::default().with("DDD", chain("DDD", 100.0, 104.0), None);
        let screener = Screener::new(Arc::new(source), ScreenerConfig::default());
        let report = screener.run(&["DDD".to_string()]).await;
        assert!(report.results.is_empty());
        assert_eq!(report.skipped_count(), 1);
    }

    #[tokio::test]
    async fn test_flat_fallback_is_low_confidence() {
        let source = FakeSource::default().with("DDD", chain("DDD", 100.0, 104.0), None);
        let config = ScreenerConfig {
            flat_history_fallback: true,
            ..ScreenerConfig::default()
        };
        let screener = Screener::new(Arc::new(source), config);
        let result = screener.screen_symbol("DDD").await.unwrap();

        assert!(result.low_confidence);
        assert_eq!(result.trend, Trend::Neutral);
        assert_eq!(result.ema20, Some(104.0));
        assert!((result.deviation_pct.unwrap() - 4.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_price_falls_back_to_last_close() {
        let snapshot = OptionChainSnapshot::new("EEE", vec![StrikeOpenInterest::new(150.0, 10, 10)]);
        let source = FakeSource::default().with("EEE", snapshot, Some(rising()));
        let screener = Screener::new(Arc::new(source), ScreenerConfig::default());
        let result = screener.screen_symbol("EEE").await.unwrap();
        assert_eq!(result.price, 159.0);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let mut source = FakeSource {
            delay: Some(Duration::from_millis(20)),
            ..FakeSource::default()
        };
        for i in 0..10 {
            let symbol = format!("S{}", i);
            source = source.with(&symbol, chain(&symbol, 100.0, 100.0), Some(rising()));
        }
        let source = Arc::new(source);
        let config = ScreenerConfig {
            max_concurrent: 3,
            ..ScreenerConfig::default()
        };
        let screener = Screener::new(Arc::clone(&source), config);

        let symbols: Vec<String> = (0..10).map(|i| format!("S{}", i)).collect();
        let report = screener.run(&symbols).await;

        assert_eq!(report.results.len(), 10);
        assert!(source.peak.load(Ordering::SeqCst) <= 3);
        assert!(report.rankings.top_bullish.len() <= 5);
    }

    #[tokio::test]
    async fn test_concurrency_clamped() {
        let config = ScreenerConfig {
            max_concurrent: 0,
            ..ScreenerConfig::default()
        };
        let screener = Screener::new(Arc::new(FakeSource::default()), config);
        assert_eq!(screener.config().max_concurrent, 1);

        let report = screener.run(&[]).await;
        assert!(report.results.is_empty());
        assert!(report.rankings.top_bullish.is_empty());
    }
}
