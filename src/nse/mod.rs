pub mod config;
pub mod models;
pub mod nse_client;

pub use config::NseClientConfig;
pub use models::{OptionChain, OptionData, OptionDetail, HistoricalResponse, HistoricalRow};
pub use nse_client::{select_expiry, NSEClient};
