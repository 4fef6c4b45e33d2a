use anyhow::Result;
use maxpain_screener::app_config::{AppConfig, Mode};
use maxpain_screener::commands::ScreenCommands;
use maxpain_screener::logging;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging();

    let app_config = match AppConfig::from_env() {
        Ok(app_config) => app_config,
        Err(e) => {
            eprintln!("{}", e);
            ScreenCommands::print_usage();
            std::process::exit(1);
        }
    };

    app_config.log_ci_config();
    app_config.validate()?;

    tracing::info!(mode = ?app_config.mode, source = ?app_config.source, "starting maxpain-screener");

    match app_config.mode {
        Mode::Batch => ScreenCommands::run_batch(&app_config).await,
        Mode::Single => {
            if app_config.single_symbol.is_empty() {
                eprintln!("SCREENER_SYMBOL is required in single mode");
                ScreenCommands::print_usage();
                std::process::exit(1);
            }
            ScreenCommands::run_single(&app_config, &app_config.single_symbol).await
        }
        Mode::Server => ScreenCommands::run_server(&app_config).await,
    }
}
