use crate::error::{Result, ScreenError};
use crate::models::{PriceSeries, ScreenResult};
use crate::processor::{self, MaxPain};
use crate::ranking::{self, Rankings, DEFAULT_TOP_N};
use crate::rules;
use crate::source::MarketDataSource;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;

pub const DEFAULT_MAX_CONCURRENT: usize = 5;
pub const MAX_CONCURRENT_LIMIT: usize = 12;
pub const DEFAULT_LOOKBACK_SESSIONS: usize = 120;

#[derive(Debug, Clone)]
pub struct ScreenerConfig {
    pub max_concurrent: usize,
    pub top_n: usize,
    pub lookback_sessions: usize,
    /// Substitute a flat series when history is unavailable. Results built on
    /// it are flagged `low_confidence`.
    pub flat_history_fallback: bool,
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            top_n: DEFAULT_TOP_N,
            lookback_sessions: DEFAULT_LOOKBACK_SESSIONS,
            flat_history_fallback: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenReport {
    pub generated_at: String,
    pub total_symbols: usize,
    pub results: Vec<ScreenResult>,
    pub rankings: Rankings,
    pub skipped: Vec<SkippedSymbol>,
    pub processing_time_ms: u64,
}

impl ScreenReport {
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}

pub struct Screener<S: ?Sized> {
    source: Arc<S>,
    config: Arc<ScreenerConfig>,
}

/// Trim, uppercase and de-duplicate, keeping first-seen order.
pub fn normalize_symbols(symbols: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    symbols
        .iter()
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty() && seen.insert(s.clone()))
        .collect()
}

impl<S: MarketDataSource + ?Sized + 'static> Screener<S> {
    pub fn new(source: Arc<S>, mut config: ScreenerConfig) -> Self {
        config.max_concurrent = config.max_concurrent.clamp(1, MAX_CONCURRENT_LIMIT);
        Self {
            source,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ScreenerConfig {
        &self.config
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// Screen a single symbol. Any error means the symbol is skipped.
    pub async fn screen_symbol(&self, symbol: &str) -> Result<ScreenResult> {
        screen_one(self.source.as_ref(), symbol, &self.config).await
    }

    /// Screen every symbol the source lists.
    pub async fn run_universe(&self) -> Result<ScreenReport> {
        let symbols = self.source.list_symbols().await?;
        Ok(self.run(&symbols).await)
    }

    /// Fan out over a bounded pool. Failed symbols are recorded as skipped and
    /// never fail the run.
    pub async fn run(&self, symbols: &[String]) -> ScreenReport {
        let start = Instant::now();
        let symbols = normalize_symbols(symbols);
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent));

        tracing::info!(
            symbols = symbols.len(),
            max_concurrent = self.config.max_concurrent,
            "starting screen"
        );

        let handles: Vec<_> = symbols
            .iter()
            .cloned()
            .map(|symbol| {
                let source = Arc::clone(&self.source);
                let config = Arc::clone(&self.config);
                let sem = Arc::clone(&semaphore);

                tokio::spawn(async move {
                    let outcome = match sem.acquire_owned().await {
                        Ok(_permit) => screen_one(source.as_ref(), &symbol, &config).await,
                        Err(e) => Err(ScreenError::Request(format!("Semaphore error: {}", e))),
                    };
                    (symbol, outcome)
                })
            })
            .collect();

        let mut results = Vec::new();
        let mut skipped = Vec::new();

        for (symbol, joined) in symbols.iter().zip(futures::future::join_all(handles).await) {
            match joined {
                Ok((_, Ok(result))) => results.push(result),
                Ok((_, Err(e))) => {
                    if e.is_data_unavailable() {
                        tracing::warn!(symbol = %symbol, error = %e, "skipping symbol");
                    } else {
                        tracing::error!(symbol = %symbol, error = %e, "unexpected error, skipping symbol");
                    }
                    skipped.push(SkippedSymbol {
                        symbol: symbol.clone(),
                        reason: e.to_string(),
                    });
                }
                Err(e) => {
                    tracing::error!(symbol = %symbol, error = %e, "screen task failed");
                    skipped.push(SkippedSymbol {
                        symbol: symbol.clone(),
                        reason: format!("Task error: {}", e),
                    });
                }
            }
        }

        results.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        let rankings = ranking::build_rankings(&results, self.config.top_n);

        tracing::info!(
            screened = results.len(),
            skipped = skipped.len(),
            bullish = rankings.top_bullish.len(),
            bearish = rankings.top_bearish.len(),
            "screen complete"
        );

        ScreenReport {
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            total_symbols: symbols.len(),
            results,
            rankings,
            skipped,
            processing_time_ms: start.elapsed().as_millis() as u64,
        }
    }
}

async fn screen_one<S: MarketDataSource + ?Sized>(
    source: &S,
    symbol: &str,
    config: &ScreenerConfig,
) -> Result<ScreenResult> {
    let snapshot = source.fetch_option_chain(symbol).await?;

    let max_pain = processor::process_snapshot(&snapshot);
    let MaxPain::Computed { strike, .. } = max_pain else {
        return Err(ScreenError::unavailable(symbol, "no valid strikes for nearest expiry"));
    };

    let spot = snapshot
        .underlying_value
        .filter(|v| v.is_finite() && *v > 0.0);

    let series = match source.fetch_price_history(symbol, config.lookback_sessions).await {
        Ok(series) => series,
        Err(e) if config.flat_history_fallback && e.is_data_unavailable() => {
            let Some(price) = spot else {
                return Err(e);
            };
            tracing::warn!(symbol, error = %e, "using flat price history, trend is low confidence");
            PriceSeries::flat(price, config.lookback_sessions, Local::now().date_naive())
        }
        Err(e) => return Err(e),
    };

    let current_price = spot
        .or_else(|| series.last_close())
        .ok_or_else(|| ScreenError::unavailable(symbol, "no current price"))?;

    Ok(rules::build_screen_result(symbol, current_price, Some(strike), &series))
}
