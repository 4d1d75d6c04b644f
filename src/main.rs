use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use picture_browser::config::{AppConfig, LogLevel};
use picture_browser::native::{self, Launch};

#[derive(Parser)]
#[command(name = "picture-browser", about = "Browse the images of a folder")]
#[command(version)]
struct Cli {
    /// Image file or folder to open
    path: Option<PathBuf>,

    /// Decode every image from disk instead of keeping it in memory
    #[arg(long)]
    no_cache: bool,

    /// Log verbosity: off, error, warn, info, debug or trace
    #[arg(long, value_parser = parse_log_level)]
    log_level: Option<LogLevel>,

    /// Settings file to use instead of the default location
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn parse_log_level(name: &str) -> Result<LogLevel, String> {
    LogLevel::from_name(name).ok_or_else(|| format!("unknown log level '{}'", name))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = AppConfig::load_or_default(cli.config.as_deref());

    let level = cli.log_level.unwrap_or(config.preferences.log_level);
    // RUST_LOG still overrides
    env_logger::Builder::new()
        .filter_level(level.to_level_filter())
        .parse_default_env()
        .init();

    let mut session = config.preferences.clone();
    if cli.no_cache {
        session.use_caching = false;
    }
    log::info!(
        "Starting with caching {}, log level {}",
        if session.use_caching { "on" } else { "off" },
        level.name()
    );

    let initial_path = cli.path.or_else(|| session.last_path.clone());

    let launch = Launch {
        config,
        config_path: cli.config,
        session,
        initial_path,
    };

    match native::run(launch) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("picture-browser: {}", e);
            ExitCode::FAILURE
        }
    }
}
