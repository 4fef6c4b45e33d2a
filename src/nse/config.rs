use std::time::Duration;

// -----------------------------------------------
// NSE API ENDPOINTS
// -----------------------------------------------
pub const NSE_BASE_URL: &str = "https://www.nseindia.com";
pub const NSE_API_MASTER_QUOTE: &str = "https://www.nseindia.com/api/master-quote";

pub fn nse_contract_info_url(symbol: &str) -> String {
    format!(
        "{}/api/option-chain-contract-info?symbol={}",
        NSE_BASE_URL,
        urlencoding::encode(symbol)
    )
}

pub fn nse_option_chain_url(typ: &str, symbol: &str, expiry: &str) -> String {
    format!(
        "{}/api/option-chain-v3?type={}&symbol={}&expiry={}",
        NSE_BASE_URL,
        typ,
        urlencoding::encode(symbol),
        urlencoding::encode(expiry)
    )
}

/// Dates are `dd-mm-yyyy`.
pub fn nse_equity_history_url(symbol: &str, from: &str, to: &str) -> String {
    format!(
        "{}/api/historical/cm/equity?symbol={}&series={}&from={}&to={}",
        NSE_BASE_URL,
        urlencoding::encode(symbol),
        urlencoding::encode("[\"EQ\"]"),
        from,
        to
    )
}

// -----------------------------------------------
// INDICES
// -----------------------------------------------
pub const NSE_INDICES: &[&str] = &["NIFTY", "BANKNIFTY", "FINNIFTY", "MIDCPNIFTY", "NIFTYNXT50"];

// -----------------------------------------------
// HTTP CLIENT CONFIG
// -----------------------------------------------
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
                               AppleWebKit/537.36 (KHTML, like Gecko) \
                               Chrome/131.0.0.0 Safari/537.36";

pub const ACCEPT_LANGUAGES: &[&str] = &[
    "en-US,en;q=0.9",
    "en-GB,en;q=0.8",
    "en-IN,en;q=0.9",
];

pub const HTTP_TIMEOUT: Duration = Duration::from_secs(20);
pub const CI_HTTP_TIMEOUT: Duration = Duration::from_secs(12);

pub const WARMUP_DELAY_MS: u64 = 200;

// -----------------------------------------------
// RETRY CONFIG
// -----------------------------------------------
pub const RETRY_BASE_DELAY_MS: u64 = 100;
pub const RETRY_FACTOR: u64 = 2;
pub const RETRY_MAX_DELAY_SECS: u64 = 3;
pub const RETRY_MAX_ATTEMPTS: usize = 3;

pub const CI_RETRY_BASE_DELAY_MS: u64 = 180;
pub const CI_RETRY_MAX_DELAY_SECS: u64 = 2;

// -----------------------------------------------
// HTTP HEADERS
// -----------------------------------------------
pub const HEADER_REFERER: &str = "https://www.nseindia.com/";
pub const HEADER_X_REQUESTED_WITH: &str = "XMLHttpRequest";
pub const HEADER_ACCEPT_HTML: &str = "text/html";

/// Market close; an expiry falling today is only usable before this.
pub const MARKET_CLOSE_HOUR: u32 = 15;
pub const MARKET_CLOSE_MINUTE: u32 = 30;

/// Everything the NSE adapter needs, handed to `NSEClient::new`.
#[derive(Debug, Clone)]
pub struct NseClientConfig {
    pub timeout: Duration,
    pub warmup_delay_ms: u64,
    pub retry_base_delay_ms: u64,
    pub retry_factor: u64,
    pub retry_max_delay_secs: u64,
    pub retry_max_attempts: usize,
    pub user_agent: String,
    /// Pre-authenticated session cookie, sent on every request when set.
    pub session_cookie: Option<String>,
}

impl Default for NseClientConfig {
    fn default() -> Self {
        Self {
            timeout: HTTP_TIMEOUT,
            warmup_delay_ms: WARMUP_DELAY_MS,
            retry_base_delay_ms: RETRY_BASE_DELAY_MS,
            retry_factor: RETRY_FACTOR,
            retry_max_delay_secs: RETRY_MAX_DELAY_SECS,
            retry_max_attempts: RETRY_MAX_ATTEMPTS,
            user_agent: USER_AGENT.to_string(),
            session_cookie: None,
        }
    }
}

impl NseClientConfig {
    /// Tighter timeouts on CI runners.
    pub fn ci() -> Self {
        Self {
            timeout: CI_HTTP_TIMEOUT,
            retry_base_delay_ms: CI_RETRY_BASE_DELAY_MS,
            retry_max_delay_secs: CI_RETRY_MAX_DELAY_SECS,
            ..Self::default()
        }
    }

    pub fn with_session_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.session_cookie = Some(cookie.into());
        self
    }
}
