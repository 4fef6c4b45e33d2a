pub mod api_server;
pub mod app_config;
pub mod cache;
pub mod commands;
pub mod config;
pub mod error;
pub mod export;
pub mod file_source;
pub mod indicators;
pub mod logging;
pub mod models;
pub mod nse;
pub mod processor;
pub mod ranking;
pub mod rules;
pub mod screener;
pub mod source;

// Re-exports for convenience
pub use error::{Result, ScreenError};
pub use models::{OptionChainSnapshot, PricePoint, PriceSeries, ScreenResult, StrikeOpenInterest, Trend};
pub use processor::{compute_max_pain, MaxPain};
pub use ranking::Rankings;
pub use screener::{ScreenReport, Screener, ScreenerConfig};
pub use source::{DynSource, MarketDataSource};
