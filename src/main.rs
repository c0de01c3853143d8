//! CLI entry point for release_stats.
//!
//! Provides subcommands for collecting and aggregating releases, serving the
//! resulting tables over HTTP, and summarizing the raw release table.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use release_stats::config::{DEFAULT_RAW_PATH, PipelineConfig, ServeConfig};
use release_stats::fetch::{BasicClient, auth::ApiKey};
use release_stats::output::{TableLayout, read_table};
use release_stats::release::ReleaseEvent;
use release_stats::summary::{log_summary, summarize};
use release_stats::{pipeline, server};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "release_stats")]
#[command(about = "Collects GitHub release counts and serves them", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch releases, aggregate them and write the raw and stats tables
    Collect {
        /// JSON pipeline config; built-in repositories are used when omitted
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Count releases published on Saturday and Sunday too
        #[arg(long, default_value_t = false)]
        include_weekends: bool,
    },
    /// Serve the raw and stats tables over HTTP
    Serve,
    /// Summarize the raw release table
    Summary {
        /// Raw release table to read
        #[arg(short, long, default_value = DEFAULT_RAW_PATH)]
        raw: PathBuf,

        /// Number of modules to list
        #[arg(short, long, default_value_t = 10)]
        top: usize,

        /// Print the summary as JSON instead of log lines
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Keep the guard alive so buffered file logs are flushed on exit.
    let _file_guard = init_tracing()?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Collect {
            config,
            include_weekends,
        } => {
            let mut config = match config {
                Some(path) => PipelineConfig::load(&path)?,
                None => PipelineConfig::default(),
            };
            if include_weekends {
                config.exclude_weekends = false;
            }

            let basic = BasicClient::new().context("failed to build HTTP client")?;
            let report = match std::env::var("GITHUB_TOKEN") {
                Ok(token) if !token.is_empty() => {
                    info!("Using GITHUB_TOKEN for API requests");
                    let client = ApiKey::bearer(basic, &token).context("invalid GITHUB_TOKEN")?;
                    pipeline::run(&client, &config).await?
                }
                _ => pipeline::run(&basic, &config).await?,
            };

            info!(
                events = report.events.len(),
                rows = report.stats.len(),
                exclude_weekends = config.exclude_weekends,
                "Release tables generated"
            );
        }
        Commands::Serve => {
            let config = ServeConfig::from_env();
            let state = server::AppState::load(&config)?;
            server::serve(state, &config.bind_addr)
                .await
                .with_context(|| format!("server on {} failed", config.bind_addr))?;
        }
        Commands::Summary { raw, top, json } => {
            let events: Vec<ReleaseEvent> = read_table(&raw, &TableLayout::raw_events())?;
            let summary = summarize(&events, top);
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                log_summary(&summary);
            }
        }
    }

    Ok(())
}

/// Colored stderr output plus a JSON daily-rolling log file.
fn init_tracing() -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/release_stats.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("release_stats.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

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

    Ok(guard)
}
