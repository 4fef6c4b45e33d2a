use crate::cache::CachedSource;
use crate::config;
use crate::file_source::FileSource;
use crate::nse::{NSEClient, NseClientConfig};
use crate::screener::ScreenerConfig;
use crate::source::DynSource;
use anyhow::{bail, Context, Result};
use colored::Colorize;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Batch,
    Single,
    Server,
}

impl FromStr for Mode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "batch" => Ok(Mode::Batch),
            "single" => Ok(Mode::Single),
            "server" => Ok(Mode::Server),
            other => bail!("Invalid mode '{}'. Use 'batch', 'single' or 'server'", other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Nse,
    File,
}

impl FromStr for SourceKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nse" => Ok(SourceKind::Nse),
            "file" => Ok(SourceKind::File),
            other => bail!("Invalid source '{}'. Use 'nse' or 'file'", other),
        }
    }
}

/// Application configuration handler
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub mode: Mode,
    pub port: u16,
    pub source: SourceKind,
    pub dataset_path: String,
    pub symbols: Vec<String>,
    pub single_symbol: String,
    pub output_dir: String,
    pub min_deviation: f64,
    pub search: Option<String>,
    pub cache_ttl: Duration,
    pub screener: ScreenerConfig,
    pub nse: NseClientConfig,
}

impl AppConfig {
    /// Create new configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut mode: Mode = config::get_execution_mode().parse()?;
        if config::is_ci_environment() && mode != Mode::Batch {
            tracing::info!("CI only supports batch mode, switching to batch");
            mode = Mode::Batch;
        }

        let mut nse = if config::is_ci_environment() {
            NseClientConfig::ci()
        } else {
            NseClientConfig::default()
        };
        if let Some(cookie) = config::get_nse_session_cookie() {
            nse = nse.with_session_cookie(cookie);
        }

        Ok(Self {
            mode,
            port: config::get_port(),
            source: config::get_source_kind().parse()?,
            dataset_path: config::get_dataset_path(),
            symbols: config::get_symbols(),
            single_symbol: config::get_single_symbol().trim().to_uppercase(),
            output_dir: config::get_output_dir(),
            min_deviation: config::get_min_deviation(),
            search: config::get_search(),
            cache_ttl: Duration::from_secs(config::get_cache_ttl_secs()),
            screener: ScreenerConfig {
                max_concurrent: config::get_max_concurrent(),
                top_n: config::get_top_n(),
                lookback_sessions: config::get_lookback_sessions(),
                flat_history_fallback: config::get_flat_fallback(),
            },
            nse,
        })
    }

    /// Log configuration details for CI environments
    pub fn log_ci_config(&self) {
        if config::is_ci_environment() {
            println!("{}", "Running in CI environment (GitHub Actions)".blue().bold());
            println!("{} Mode: {:?}", "→".cyan(), self.mode);
            println!("{} Max concurrent: {}", "→".cyan(), self.screener.max_concurrent);
            println!();
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.source == SourceKind::File && !std::path::Path::new(&self.dataset_path).exists() {
            bail!("Dataset file '{}' does not exist (set SCREENER_DATASET)", self.dataset_path);
        }
        if self.screener.top_n == 0 {
            bail!("SCREENER_TOP_N must be at least 1");
        }
        Ok(())
    }

    /// The configured data source behind a TTL cache.
    pub fn build_source(&self) -> Result<DynSource> {
        let source: DynSource = match self.source {
            SourceKind::Nse => {
                let client = NSEClient::new(self.nse.clone()).context("Failed to build NSE client")?;
                Arc::new(CachedSource::new(client, self.cache_ttl))
            }
            SourceKind::File => {
                let file = FileSource::load(&self.dataset_path)
                    .with_context(|| format!("Failed to load dataset '{}'", self.dataset_path))?;
                Arc::new(CachedSource::new(file, self.cache_ttl))
            }
        };
        Ok(source)
    }
}
