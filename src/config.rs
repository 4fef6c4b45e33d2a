use crate::ranking::DEFAULT_TOP_N;
use crate::screener::{DEFAULT_LOOKBACK_SESSIONS, DEFAULT_MAX_CONCURRENT, MAX_CONCURRENT_LIMIT};

// -----------------------------------------------
// DEFAULTS
// -----------------------------------------------
pub const CI_MAX_CONCURRENT: usize = 8;
pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_SINGLE_SYMBOL: &str = "NIFTY";
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;
pub const DEFAULT_OUTPUT_DIR: &str = ".";
pub const DEFAULT_DATASET_PATH: &str = "data/dataset.json";

// -----------------------------------------------
// RUNTIME CONFIGURATION
// -----------------------------------------------

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

/// Execution mode, `batch` unless set.
pub fn get_execution_mode() -> String {
    std::env::var("SCREENER_MODE").unwrap_or_else(|_| "batch".to_string())
}

pub fn get_single_symbol() -> String {
    std::env::var("SCREENER_SYMBOL").unwrap_or_else(|_| DEFAULT_SINGLE_SYMBOL.to_string())
}

/// Comma separated. Empty means "whatever the source lists".
pub fn get_symbols() -> Vec<String> {
    parse_symbol_list(&std::env::var("SCREENER_SYMBOLS").unwrap_or_default())
}

pub fn parse_symbol_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// `nse` or `file`.
pub fn get_source_kind() -> String {
    std::env::var("SCREENER_SOURCE")
        .map(|s| s.trim().to_ascii_lowercase())
        .unwrap_or_else(|_| "nse".to_string())
}

pub fn get_dataset_path() -> String {
    std::env::var("SCREENER_DATASET").unwrap_or_else(|_| DEFAULT_DATASET_PATH.to_string())
}

pub fn is_ci_environment() -> bool {
    std::env::var("CI").is_ok() || std::env::var("GITHUB_ACTIONS").is_ok()
}

/// Worker count, clamped to 1..=12.
pub fn get_max_concurrent() -> usize {
    if let Some(num) = env_parse::<usize>("SCREENER_MAX_CONCURRENT") {
        return num.clamp(1, MAX_CONCURRENT_LIMIT);
    }

    if is_ci_environment() {
        CI_MAX_CONCURRENT
    } else {
        DEFAULT_MAX_CONCURRENT
    }
}

pub fn get_top_n() -> usize {
    env_parse("SCREENER_TOP_N").unwrap_or(DEFAULT_TOP_N)
}

pub fn get_lookback_sessions() -> usize {
    env_parse::<usize>("SCREENER_LOOKBACK")
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_LOOKBACK_SESSIONS)
}

pub fn get_min_deviation() -> f64 {
    env_parse::<f64>("SCREENER_MIN_DEVIATION")
        .filter(|v| v.is_finite() && *v >= 0.0)
        .unwrap_or(0.0)
}

/// Case-insensitive symbol substring applied to the results table.
pub fn get_search() -> Option<String> {
    non_blank(std::env::var("SCREENER_SEARCH").ok())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub fn get_flat_fallback() -> bool {
    env_flag("SCREENER_FLAT_FALLBACK")
}

pub fn get_cache_ttl_secs() -> u64 {
    env_parse("SCREENER_CACHE_TTL_SECS").unwrap_or(DEFAULT_CACHE_TTL_SECS)
}

pub fn get_output_dir() -> String {
    std::env::var("SCREENER_OUTPUT_DIR").unwrap_or_else(|_| DEFAULT_OUTPUT_DIR.to_string())
}

pub fn get_port() -> u16 {
    env_parse("SCREENER_PORT").unwrap_or(DEFAULT_PORT)
}

/// Optional NSE session cookie for the data adapter.
pub fn get_nse_session_cookie() -> Option<String> {
    std::env::var("NSE_SESSION_COOKIE")
        .ok()
        .filter(|v| !v.trim().is_empty())
}
