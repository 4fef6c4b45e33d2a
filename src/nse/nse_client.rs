use super::config::{self, NseClientConfig};
use super::models::{ContractInfo, HistoricalResponse, OptionChain};
use crate::error::{Result, ScreenError};
use crate::models::{OptionChainSnapshot, PriceSeries, Security, SecurityType};
use crate::source::MarketDataSource;
use async_trait::async_trait;
use chrono::{Local, NaiveDate, NaiveDateTime, Timelike};
use rand::{seq::SliceRandom, thread_rng};
use reqwest::{header, Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_retry::strategy::ExponentialBackoff;
use tokio_retry::RetryIf;

// -----------------------------------------------
// CLIENT WRAPPER WITH SESSION STATE AND EXPIRY CACHE
// -----------------------------------------------
pub struct NSEClient {
    client: Client,
    config: NseClientConfig,
    warmed_up: Arc<RwLock<bool>>,
    // equities share one monthly expiry, one lookup serves them all until it lapses
    cached_equity_expiry: Arc<RwLock<Option<(String, NaiveDate)>>>,
}

/// An expiry is tradable on any later day, and on its own day until market close.
pub fn is_tradable(expiry: NaiveDate, now: NaiveDateTime) -> bool {
    let before_close = (now.hour(), now.minute())
        < (config::MARKET_CLOSE_HOUR, config::MARKET_CLOSE_MINUTE);
    expiry > now.date() || (expiry == now.date() && before_close)
}

/// 429 and 5xx are transient, any other failing status is final.
fn status_error(status: StatusCode, body: &str) -> ScreenError {
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        ScreenError::Transient(format!("Retryable error: {}", status))
    } else {
        let preview: String = body.chars().take(200).collect();
        ScreenError::Request(format!("Client error {}: {}", status, preview))
    }
}

/// Earliest expiry that is still tradable at `now`.
pub fn select_expiry(expiry_dates: &[String], now: NaiveDateTime) -> Result<String> {
    select_expiry_date(expiry_dates, now).map(|(expiry, _)| expiry)
}

fn select_expiry_date(expiry_dates: &[String], now: NaiveDateTime) -> Result<(String, NaiveDate)> {
    if expiry_dates.is_empty() {
        return Err(ScreenError::Parse("No expiry dates found".to_string()));
    }

    let mut parsed: Vec<(NaiveDate, usize)> = Vec::with_capacity(expiry_dates.len());
    for (idx, s) in expiry_dates.iter().enumerate() {
        let d = NaiveDate::parse_from_str(s, "%d-%b-%Y")
            .map_err(|e| ScreenError::Parse(format!("Failed to parse expiry date '{}': {}", s, e)))?;
        parsed.push((d, idx));
    }
    parsed.sort_by_key(|(d, _)| *d);

    parsed
        .into_iter()
        .find(|(date, _)| is_tradable(*date, now))
        .map(|(date, idx)| (expiry_dates[idx].clone(), date))
        .ok_or_else(|| {
            ScreenError::Parse("No valid expiry found (all past or after cutoff)".to_string())
        })
}

pub fn security_for(symbol: &str) -> Security {
    if config::NSE_INDICES.contains(&symbol) {
        Security::index(symbol.to_string())
    } else {
        Security::equity(symbol.to_string())
    }
}

impl NSEClient {
    pub fn new(config: NseClientConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(&config)?,
            config,
            warmed_up: Arc::new(RwLock::new(false)),
            cached_equity_expiry: Arc::new(RwLock::new(None)),
        })
    }

    /// Warmup NSE session (only once per client)
    async fn warmup_if_needed(&self) -> Result<()> {
        if *self.warmed_up.read().await {
            return Ok(());
        }

        let mut warmed = self.warmed_up.write().await;
        if !*warmed {
            self.client
                .get(config::NSE_BASE_URL)
                .header("Accept", config::HEADER_ACCEPT_HTML)
                .send()
                .await
                .map_err(|e| ScreenError::Request(format!("Failed to warm up NSE session: {}", e)))?;

            tokio::time::sleep(Duration::from_millis(self.config.warmup_delay_ms)).await;
            *warmed = true;
        }

        Ok(())
    }

    /// GET with exponential backoff. Only transport failures, 429 and 5xx are
    /// retried; everything else is returned on the first attempt.
    async fn fetch_json(&self, url: &str) -> Result<String> {
        self.warmup_if_needed().await?;

        let backoff = ExponentialBackoff::from_millis(self.config.retry_base_delay_ms)
            .factor(self.config.retry_factor)
            .max_delay(Duration::from_secs(self.config.retry_max_delay_secs))
            .take(self.config.retry_max_attempts);

        let attempt = || async {
            let res = self
                .client
                .get(url)
                .header("Referer", config::HEADER_REFERER)
                .header("X-Requested-With", config::HEADER_X_REQUESTED_WITH)
                .send()
                .await
                .map_err(|e| ScreenError::Transient(e.to_string()))?;

            let status = res.status();
            tracing::debug!(url, status = status.as_u16(), "NSE response");

            if status.is_success() {
                let text = res.text().await?;
                let trimmed = text.trim();
                if !trimmed.starts_with('{') && !trimmed.starts_with('[') {
                    let preview: String = text.chars().take(200).collect();
                    return Err(ScreenError::NonJsonResponse(preview));
                }
                Ok::<String, ScreenError>(text)
            } else {
                let body = res.text().await.unwrap_or_default();
                let err = status_error(status, &body);
                if err.is_retryable() {
                    tracing::warn!(url, status = status.as_u16(), "retryable NSE error");
                }
                Err(err)
            }
        };

        RetryIf::spawn(backoff, attempt, |e: &ScreenError| e.is_retryable()).await
    }

    /// All F&O equities plus the configured indices.
    pub async fn fetch_fno_list(&self) -> Result<Vec<Security>> {
        let text = self.fetch_json(config::NSE_API_MASTER_QUOTE).await?;
        let symbols: Vec<String> = serde_json::from_str(&text)?;

        let mut securities: Vec<Security> = symbols.into_iter().map(Security::equity).collect();
        for index in config::NSE_INDICES {
            securities.push(Security::index(index.to_string()));
        }

        Ok(securities)
    }

    pub async fn fetch_contract_info(&self, symbol: &str) -> Result<ContractInfo> {
        let url = config::nse_contract_info_url(symbol);
        let text = self.fetch_json(&url).await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Nearest expiry. Indices always look it up; equities reuse the first
    /// equity's answer while it is still tradable.
    async fn nearest_expiry(&self, security: &Security) -> Result<String> {
        let now = Local::now().naive_local();

        if security.security_type == SecurityType::Equity {
            if let Some((expiry, date)) = self.cached_equity_expiry.read().await.as_ref() {
                if is_tradable(*date, now) {
                    return Ok(expiry.clone());
                }
                tracing::info!(expiry = %expiry, "cached equity expiry lapsed, refreshing");
            }
        }

        let contract_info = self.fetch_contract_info(&security.symbol).await?;
        let (expiry, date) = select_expiry_date(&contract_info.expiry_dates, now)?;

        if security.security_type == SecurityType::Equity {
            *self.cached_equity_expiry.write().await = Some((expiry.clone(), date));
            tracing::info!(expiry = %expiry, "cached equity expiry");
        }

        Ok(expiry)
    }

    pub async fn fetch_raw_option_chain(
        &self,
        security: &Security,
        expiry: &str,
    ) -> Result<OptionChain> {
        let typ = match security.security_type {
            SecurityType::Equity => "Equity",
            SecurityType::Indices => "Indices",
        };

        let url = config::nse_option_chain_url(typ, &security.symbol, expiry);
        let text = self.fetch_json(&url).await?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl MarketDataSource for NSEClient {
    async fn fetch_option_chain(&self, symbol: &str) -> Result<OptionChainSnapshot> {
        let security = security_for(symbol);
        let expiry = self.nearest_expiry(&security).await?;
        let chain = self.fetch_raw_option_chain(&security, &expiry).await?;
        Ok(chain.to_snapshot(symbol, Some(&expiry)))
    }

    async fn fetch_price_history(
        &self,
        symbol: &str,
        lookback_sessions: usize,
    ) -> Result<PriceSeries> {
        if security_for(symbol).security_type == SecurityType::Indices {
            return Err(ScreenError::unavailable(symbol, "no equity history for indices"));
        }

        // ~5 sessions per 7 calendar days, plus holidays
        let calendar_days = (lookback_sessions * 7 / 5 + 10) as i64;
        let to = Local::now().date_naive();
        let from = to - chrono::Duration::days(calendar_days);

        let url = config::nse_equity_history_url(
            symbol,
            &from.format("%d-%m-%Y").to_string(),
            &to.format("%d-%m-%Y").to_string(),
        );
        let text = self.fetch_json(&url).await?;
        let response: HistoricalResponse = serde_json::from_str(&text)?;

        let series = response.to_series(lookback_sessions);
        if series.is_empty() {
            return Err(ScreenError::unavailable(symbol, "empty price history"));
        }
        Ok(series)
    }

    async fn list_symbols(&self) -> Result<Vec<String>> {
        Ok(self
            .fetch_fno_list()
            .await?
            .into_iter()
            .map(|s| s.symbol)
            .collect())
    }
}

// -----------------------------------------------
// HTTP CLIENT BUILDER
// -----------------------------------------------
fn build_client(client_config: &NseClientConfig) -> Result<Client> {
    let mut headers = header::HeaderMap::new();

    let lang = config::ACCEPT_LANGUAGES
        .choose(&mut thread_rng())
        .copied()
        .unwrap_or("en-US,en;q=0.9");
    headers.insert(
        header::ACCEPT_LANGUAGE,
        header::HeaderValue::from_str(lang).map_err(|e| ScreenError::Request(e.to_string()))?,
    );
    headers.insert(header::ACCEPT, header::HeaderValue::from_static("*/*"));

    if let Some(cookie) = &client_config.session_cookie {
        let mut value = header::HeaderValue::from_str(cookie)
            .map_err(|e| ScreenError::Request(format!("Invalid session cookie: {}", e)))?;
        value.set_sensitive(true);
        headers.insert(header::COOKIE, value);
    }

    Ok(Client::builder()
        .default_headers(headers)
        .cookie_store(true)
        .user_agent(client_config.user_agent.as_str())
        .timeout(client_config.timeout)
        .build()?)
}
