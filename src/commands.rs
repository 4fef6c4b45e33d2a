use crate::api_server::{self, AppState};
use crate::app_config::AppConfig;
use crate::export;
use crate::models::{ScreenResult, Trend};
use crate::ranking;
use crate::screener::{ScreenReport, Screener};

use anyhow::{Context, Result};
use colored::Colorize;

fn fmt_opt(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "-".to_string())
}

fn trend_label(trend: Trend) -> colored::ColoredString {
    match trend {
        Trend::Bullish => "Bullish".green(),
        Trend::Bearish => "Bearish".red(),
        Trend::Neutral => "Neutral".normal(),
    }
}

/// Screener command handler - batch, single symbol and server runs
pub struct ScreenCommands;

impl ScreenCommands {
    fn banner(title: &str) {
        println!("{}", "=".repeat(60).blue());
        println!("{}", title.green().bold());
        println!("{}", "=".repeat(60).blue());
        println!();
    }

    /// Screen the configured symbols (or the source's whole universe), print
    /// the rankings and write the CSV and JSON report.
    pub async fn run_batch(app: &AppConfig) -> Result<()> {
        Self::banner("Max Pain Batch Screener");

        let source = app.build_source()?;
        let screener = Screener::new(source, app.screener.clone());

        println!(
            "{} Max concurrent requests: {}",
            "ℹ".blue(),
            screener.config().max_concurrent
        );
        println!();

        let report = if app.symbols.is_empty() {
            println!("{}", "Fetching symbol universe...".cyan());
            screener.run_universe().await.context("Failed to list symbols")?
        } else {
            screener.run(&app.symbols).await
        };

        Self::display_batch_summary(&report);
        Self::display_rankings(&report);

        let mut filtered = ranking::filter_by_min_deviation(&report.results, app.min_deviation);
        if let Some(search) = &app.search {
            filtered = ranking::filter_by_symbol(&filtered, search);
        }
        ranking::sort_by_abs_deviation(&mut filtered);
        Self::display_table(&filtered, app.min_deviation, app.search.as_deref());

        let (csv_path, json_path) =
            export::save_report(&app.output_dir, &report).context("Failed to save report")?;
        println!("{} Saved table to {}", "✓".green(), csv_path.display());
        println!("{} Saved report to {}", "✓".green(), json_path.display());

        println!();
        println!("{}", "=".repeat(60).blue());
        println!("{}", "Done!".green().bold());
        println!("{}", "=".repeat(60).blue());

        Ok(())
    }

    /// Screen one symbol and print every computed field.
    pub async fn run_single(app: &AppConfig, symbol: &str) -> Result<()> {
        Self::banner("Max Pain Single Symbol");

        let source = app.build_source()?;
        let screener = Screener::new(source, app.screener.clone());

        println!("{} Screening {}...", "→".cyan(), symbol.yellow());
        println!();

        let result = screener
            .screen_symbol(symbol)
            .await
            .with_context(|| format!("Failed to screen {}", symbol))?;

        println!("{} Symbol: {}", "✓".green(), result.symbol.yellow());
        println!("{} Price: {:.2}", "✓".green(), result.price);
        println!("{} Max pain: {}", "✓".green(), fmt_opt(result.max_pain));
        println!("{} Deviation: {}%", "✓".green(), fmt_opt(result.deviation_pct));
        println!("{} EMA20: {}", "✓".green(), fmt_opt(result.ema20));
        println!("{} EMA50: {}", "✓".green(), fmt_opt(result.ema50));
        println!("{} Volume strength: {:.2}", "✓".green(), result.volume_strength);
        println!("{} Trend: {}", "✓".green(), trend_label(result.trend));
        if result.low_confidence {
            println!("{} Low confidence: price history is short or synthetic", "⚠".yellow());
        }
        println!("{}", "=".repeat(60).blue());

        Ok(())
    }

    /// Run API server mode
    pub async fn run_server(app: &AppConfig) -> Result<()> {
        Self::banner("Max Pain Screener API");

        let source = app.build_source()?;
        let state = AppState::new(Screener::new(source, app.screener.clone()));
        api_server::start_server(app.port, state).await
    }

    fn display_batch_summary(report: &ScreenReport) {
        println!("{}", "=".repeat(60).blue());
        println!("{}", "Summary".cyan().bold());
        println!("{}", "=".repeat(60).blue());
        println!("{} Screened: {}", "✓".green(), report.results.len());
        println!("{} Skipped: {}", "✗".red(), report.skipped_count());
        println!(
            "{} Time taken: {:.2}s",
            "⏱".yellow(),
            report.processing_time_ms as f64 / 1000.0
        );
        println!();

        if !report.skipped.is_empty() {
            println!("{}", "Skipped Symbols:".red());
            for skipped in report.skipped.iter().take(10) {
                println!(
                    "  {} {} → {}",
                    "✗".red(),
                    skipped.symbol.yellow(),
                    skipped.reason.chars().take(80).collect::<String>()
                );
            }
            if report.skipped.len() > 10 {
                println!("  ... and {} more", report.skipped.len() - 10);
            }
            println!();
        }
    }

    fn display_rankings(report: &ScreenReport) {
        println!("{}", "Top Bullish (price > EMA20 > EMA50, largest deviation first):".green().bold());
        Self::print_rows(&report.rankings.top_bullish);
        println!("{}", "Top Bearish (price < EMA20 < EMA50, most negative deviation first):".red().bold());
        Self::print_rows(&report.rankings.top_bearish);
    }

    fn display_table(results: &[ScreenResult], min_deviation: f64, search: Option<&str>) {
        let heading = match search {
            Some(search) => format!(
                "Results matching '{}' (|deviation| ≥ {:.1}%):",
                search, min_deviation
            ),
            None => format!("All results (|deviation| ≥ {:.1}%):", min_deviation),
        };
        println!("{}", heading.cyan().bold());
        Self::print_rows(results);
    }

    fn print_rows(rows: &[ScreenResult]) {
        if rows.is_empty() {
            println!("  {}", "none".dimmed());
            println!();
            return;
        }
        println!(
            "  {:<14} {:>10} {:>10} {:>8} {:>10} {:>10} {:>6}  {}",
            "Symbol", "Price", "MaxPain", "Dev%", "EMA20", "EMA50", "Vol", "Trend"
        );
        for r in rows {
            println!(
                "  {:<14} {:>10.2} {:>10} {:>8} {:>10} {:>10} {:>6.2}  {}{}",
                r.symbol,
                r.price,
                fmt_opt(r.max_pain),
                fmt_opt(r.deviation_pct),
                fmt_opt(r.ema20),
                fmt_opt(r.ema50),
                r.volume_strength,
                trend_label(r.trend),
                if r.low_confidence { " *" } else { "" }
            );
        }
        println!();
    }

    /// Print usage instructions
    pub fn print_usage() {
        eprintln!("Set SCREENER_MODE environment variable to control execution mode");
        eprintln!("Examples:");
        eprintln!("  SCREENER_MODE=batch SCREENER_SYMBOLS=INFY,TCS cargo run");
        eprintln!("  SCREENER_MODE=single SCREENER_SYMBOL=RELIANCE cargo run");
        eprintln!("  SCREENER_MODE=server SCREENER_PORT=3001 cargo run");
        eprintln!("  SCREENER_SOURCE=file SCREENER_DATASET=data/dataset.json cargo run");
        eprintln!("  SCREENER_SEARCH=bank SCREENER_MIN_DEVIATION=2 cargo run");
        eprintln!("Note: CI only supports 'batch' mode");
    }
}
