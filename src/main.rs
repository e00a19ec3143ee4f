//! CLI entry point for the fuel market analysis tool.
//!
//! `report` (the default) writes the market share and station growth
//! charts as PNG files. `serve` starts the interactive dashboard.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fuel_market::{
    cache::FetchCache,
    config::Config,
    dashboard::{self, AppState},
    fetch::BasicClient,
    report::{ReportOptions, run_report},
};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "fuel_market")]
#[command(about = "Charts and a dashboard over the Brazilian fuel market open data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the market share and station growth charts as PNG files
    Report {
        /// Directory the charts are written to
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Also write the full aggregates behind each chart as CSV
        #[arg(long, default_value_t = false)]
        export: bool,
    },
    /// Serve the interactive dashboard
    Serve {
        /// Address to listen on
        #[arg(short, long, default_value = "127.0.0.1:8501")]
        addr: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/fuel_market.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("fuel_market.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command.unwrap_or(Commands::Report {
        output_dir: PathBuf::from("."),
        export: false,
    }) {
        Commands::Report { output_dir, export } => {
            let client = BasicClient::with_timeout(config.http_timeout)
                .context("Failed to build HTTP client")?;
            let cache = FetchCache::new(config.cache_ttl);
            let options = ReportOptions { output_dir, export };

            info!(output_dir = %options.output_dir.display(), export, "Starting report");
            let summary = run_report(&client, &cache, &config, &options).await;

            let failures = summary.failures();
            if failures > 0 {
                error!(failures, "Report finished with failed analyses");
            } else {
                info!("Report finished");
            }
        }
        Commands::Serve { addr } => {
            let state = AppState::new(config).context("Failed to build HTTP client")?;
            dashboard::serve(Arc::new(state), &addr).await?;
        }
    }

    Ok(())
}
