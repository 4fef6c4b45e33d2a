//! TTL cache in front of a market-data source.

use crate::error::Result;
use crate::models::{OptionChainSnapshot, PriceSeries};
use crate::source::MarketDataSource;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CacheKey {
    Chain(String),
    History(String, usize),
}

#[derive(Default)]
struct Entries {
    chains: HashMap<CacheKey, (OptionChainSnapshot, Instant)>,
    histories: HashMap<CacheKey, (PriceSeries, Instant)>,
}

impl Entries {
    fn retain_fresh(&mut self, ttl: Duration) {
        self.chains.retain(|_, (_, at)| at.elapsed() < ttl);
        self.histories.retain(|_, (_, at)| at.elapsed() < ttl);
    }
}

/// Only successful fetches are cached; failures go straight back to the caller.
pub struct CachedSource<S> {
    inner: S,
    ttl: Duration,
    entries: RwLock<Entries>,
}

impl<S: MarketDataSource> CachedSource<S> {
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: RwLock::new(Entries::default()),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn is_fresh(&self, cached_at: Instant) -> bool {
        cached_at.elapsed() < self.ttl
    }

    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        entries.chains.clear();
        entries.histories.clear();
    }

    /// Number of cached chains and histories, expired or not.
    pub async fn entry_count(&self) -> usize {
        let entries = self.entries.read().await;
        entries.chains.len() + entries.histories.len()
    }
}

#[async_trait]
impl<S: MarketDataSource> MarketDataSource for CachedSource<S> {
    async fn fetch_option_chain(&self, symbol: &str) -> Result<OptionChainSnapshot> {
        let key = CacheKey::Chain(symbol.to_string());
        {
            let entries = self.entries.read().await;
            if let Some((snapshot, cached_at)) = entries.chains.get(&key) {
                if self.is_fresh(*cached_at) {
                    tracing::debug!(symbol, "option chain cache hit");
                    return Ok(snapshot.clone());
                }
            }
        }

        let snapshot = self.inner.fetch_option_chain(symbol).await?;
        // expired entries are swept on every insert
        let mut entries = self.entries.write().await;
        entries.retain_fresh(self.ttl);
        entries.chains.insert(key, (snapshot.clone(), Instant::now()));
        Ok(snapshot)
    }

    async fn fetch_price_history(
        &self,
        symbol: &str,
        lookback_sessions: usize,
    ) -> Result<PriceSeries> {
        let key = CacheKey::History(symbol.to_string(), lookback_sessions);
        {
            let entries = self.entries.read().await;
            if let Some((series, cached_at)) = entries.histories.get(&key) {
                if self.is_fresh(*cached_at) {
                    tracing::debug!(symbol, "price history cache hit");
                    return Ok(series.clone());
                }
            }
        }

        let series = self.inner.fetch_price_history(symbol, lookback_sessions).await?;
        let mut entries = self.entries.write().await;
        entries.retain_fresh(self.ttl);
        entries.histories.insert(key, (series.clone(), Instant::now()));
        Ok(series)
    }

    async fn list_symbols(&self) -> Result<Vec<String>> {
        self.inner.list_symbols().await
    }
}
