//! skywatch - current weather and forecasts from the terminal
//!
//! Parses the command line, sets up logging and runs one command. Errors
//! are printed to stderr and turn into a non-zero exit status.

use clap::Parser;
use std::io;
use std::process::ExitCode;

use skywatch::app::App;
use skywatch::cli::Cli;
use skywatch::config::AppConfig;
use skywatch::logging;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.verbose) {
        eprintln!("Warning: logging unavailable: {}", e);
    }

    let config = AppConfig::from_cli(&cli);
    tracing::debug!(
        ?config.cache_dir,
        data_dir = %config.data_dir.display(),
        offline = config.offline,
        "starting"
    );

    let result = match App::new(&config) {
        Ok(app) => app.run(cli.command, &mut io::stdout().lock()).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
