use secdoc::cli::commands::{CliArgs, Commands};
use secdoc::cli::handlers::{handle_classify, handle_config, handle_scan, handle_stream};
use secdoc::util::logging::{init_logging, parse_level, LoggingConfig};
use secdoc::VERSION;

use clap::Parser;
use std::env;
use tracing::{debug, Level};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("secdoc v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Classify(classify_args) => handle_classify(classify_args).await,
        Commands::Stream(document_args) => handle_stream(document_args).await,
        Commands::Scan(scan_args) => handle_scan(scan_args).await,
        Commands::Config(config_args) => handle_config(config_args),
    };

    std::process::exit(exit_code);
}

/// Flags win over `SECDOC_LOG_LEVEL`; `SECDOC_LOG_JSON` selects JSON lines
fn init_logging_from_args(args: &CliArgs) {
    let level = if let Some(level_str) = &args.log_level {
        parse_level(level_str)
    } else if args.verbose {
        Level::DEBUG
    } else if args.quiet {
        Level::ERROR
    } else {
        let level_str = env::var("SECDOC_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        parse_level(&level_str)
    };

    let use_json = env::var("SECDOC_LOG_JSON")
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(false);

    init_logging(LoggingConfig {
        level,
        use_json,
        ..LoggingConfig::default()
    });
}
