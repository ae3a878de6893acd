use clap::{Parser, Subcommand};
use log::{error, warn};
use std::process::ExitCode;

use sitewatch::{Config, diagnostics};

#[derive(Parser)]
#[command(version, about = "Watches a website and reports outages to Telegram and email")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Clone, Copy)]
enum Command {
    /// Monitor the site and serve the health endpoint (default)
    Run,
    /// Validate configuration, probe the site once and send a test message
    Check,
    /// Send one sample of every notification kind
    Samples,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            error!("Set the missing values in the environment, a .env file or config.toml");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command.unwrap_or(Command::Run) {
        Command::Run => sitewatch::run(config).await.map(|()| true),
        Command::Check => diagnostics::check(&config).await,
        Command::Samples => diagnostics::samples(&config).await,
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => {
            warn!("Some checks failed, see the messages above");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
