use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

use quake_pipeline::config::Config;
use quake_pipeline::infra::http_client::ReqwestHttp;
use quake_pipeline::pipeline::PipelineRunner;
use quake_pipeline::{
    logging, metrics, BatchKey, BatchWriter, DateWindow, FeedClient, StagingLoader, Warehouse,
    WindowTransformer,
};

#[derive(Parser)]
#[command(name = "quake_pipeline")]
#[command(about = "Seismic event extract, staging load and transform pipeline")]
#[command(version)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch recent events and write the batch file for a capture date
    Extract {
        /// Capture date (YYYY-MM-DD); defaults to today (UTC)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Replace the staged rows of a batch with the contents of its batch file
    Load {
        /// Batch key, e.g. 2026_01_16
        #[arg(long)]
        batch_key: String,
        /// Batch file; defaults to the configured path for the key
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Recompute the fact rows of a date window
    Transform {
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
    },
    /// Extract, load and transform for one capture date
    Run {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Show the load ledger and the fact row count of a window
    Status {
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
    },
}

/// Explicit bounds win; a missing bound falls back to the trailing look-back window.
fn resolve_window(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    lookback_days: u32,
) -> anyhow::Result<DateWindow> {
    let end = end.unwrap_or_else(|| Utc::now().date_naive());
    let default = DateWindow::trailing_days(end, lookback_days)?;
    Ok(DateWindow::new(start.unwrap_or(default.start()), end)?)
}

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config = Config::load(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;
    let _log_guard = logging::init_logging(&config.logging.dir);
    metrics::init_metrics(config.metrics.addr.as_deref());

    let today = Utc::now().date_naive();
    let lookback = config.feed.lookback_days;

    match cli.command {
        Commands::Extract { date } => {
            let capture_date = date.unwrap_or(today);
            let batch_key = BatchKey::from_capture_date(capture_date);
            let window = DateWindow::trailing_days(capture_date, lookback)?;

            let http = ReqwestHttp::new(Duration::from_secs(config.feed.timeout_seconds))?;
            let feed = FeedClient::new(Box::new(http), config.feed.url.clone());
            let writer = BatchWriter::new(&config.batch.output_dir, config.batch.file_prefix.clone());

            let records = feed.fetch(&window, &batch_key)?;
            let path = writer.write(&records, &batch_key)?;
            println!("Wrote {} events to {}", records.len(), path.display());
        }
        Commands::Load { batch_key, file } => {
            let batch_key = BatchKey::new(batch_key)?;
            let file = file.unwrap_or_else(|| {
                BatchWriter::new(&config.batch.output_dir, config.batch.file_prefix.clone())
                    .path_for(&batch_key)
            });
            let mut warehouse = Warehouse::open(&config.warehouse.path)?;
            let rows = StagingLoader::new(&mut warehouse).load(&batch_key, &file)?;
            println!("Loaded {} rows for batch {}", rows, batch_key);
        }
        Commands::Transform { start, end } => {
            let window = resolve_window(start, end, lookback)?;
            let mut warehouse = Warehouse::open(&config.warehouse.path)?;
            let rows = WindowTransformer::new(&mut warehouse).transform(&window)?;
            println!("Transformed {} rows for window {}", rows, window);
        }
        Commands::Run { date } => {
            let capture_date = date.unwrap_or(today);
            let window = DateWindow::trailing_days(capture_date, lookback)?;
            info!(%capture_date, %window, "Starting full pipeline run");

            let mut runner = PipelineRunner::from_config(&config)?;
            match runner.run(capture_date, window) {
                Ok(report) => {
                    println!("Pipeline run {} for batch {}", report.run_id, report.batch_key);
                    println!("   Window: {}", report.window);
                    println!("   Fetched: {}", report.fetched);
                    println!("   Batch file: {}", report.batch_file.display());
                    println!("   Loaded: {}", report.loaded);
                    println!("   Transformed: {}", report.transformed);
                }
                Err(e) => {
                    error!(stage = %e.stage(), "Run failed: {}", e);
                    return Err(anyhow::Error::new(e).context("pipeline run failed"));
                }
            }
        }
        Commands::Status { start, end } => {
            let window = resolve_window(start, end, lookback)?;
            let warehouse = Warehouse::open(&config.warehouse.path)?;

            println!("Loaded batches:");
            for entry in warehouse.load_log()? {
                println!(
                    "   {}  {} rows  sha256 {}  at {}",
                    entry.batch_key,
                    entry.row_count,
                    &entry.file_sha256[..12.min(entry.file_sha256.len())],
                    entry.loaded_at
                );
            }
            println!("Recent transforms:");
            for entry in warehouse.transform_log(5)? {
                println!(
                    "   [{}, {}]  {} rows  at {}",
                    entry.window_start, entry.window_end, entry.row_count, entry.ran_at
                );
            }
            println!(
                "Fact rows in {}: {}",
                window,
                warehouse.fact_row_count(&window)?
            );
        }
    }
    Ok(())
}
