use crate::error::Result;
use crate::models::{OptionChainSnapshot, PriceSeries};
use async_trait::async_trait;

/// A market-data collaborator. Adapters own their own retries, timeouts and
/// credentials; the screener only sees normalized data or an error.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Nearest-expiry open interest by strike.
    async fn fetch_option_chain(&self, symbol: &str) -> Result<OptionChainSnapshot>;

    /// Chronological daily closes and volumes, at most `lookback_sessions` long.
    async fn fetch_price_history(&self, symbol: &str, lookback_sessions: usize)
        -> Result<PriceSeries>;

    /// Default universe when the caller supplies no symbols.
    async fn list_symbols(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

#[async_trait]
impl<S: MarketDataSource + ?Sized> MarketDataSource for std::sync::Arc<S> {
    async fn fetch_option_chain(&self, symbol: &str) -> Result<OptionChainSnapshot> {
        (**self).fetch_option_chain(symbol).await
    }

    async fn fetch_price_history(
        &self,
        symbol: &str,
        lookback_sessions: usize,
    ) -> Result<PriceSeries> {
        (**self).fetch_price_history(symbol, lookback_sessions).await
    }

    async fn list_symbols(&self) -> Result<Vec<String>> {
        (**self).list_symbols().await
    }
}

/// Type-erased source, chosen at runtime from configuration.
pub type DynSource = std::sync::Arc<dyn MarketDataSource>;
