use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use company_enrich::config::Config;
use company_enrich::enrichment::EnrichmentPipeline;
use company_enrich::rate_limiter::{CancellationFlag, RateLimiter, TokioSleeper};
use company_enrich::registry_client::RegistryClient;
use company_enrich::spreadsheet::{output_path, CsvResultWriter, InputTable};

/// Enrich a list of company numbers with status and active directors.
#[derive(Debug, Parser)]
#[command(name = "company-enrich", version)]
struct Args {
    /// Input CSV file with a header row.
    input: PathBuf,

    /// Name of the column holding company numbers (e.g. "Cro Nbr").
    column: String,

    /// Process at most this many rows.
    #[arg(long)]
    limit: Option<usize>,

    /// Directory the timestamped output file is written to.
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Override RATE_LIMIT_QUOTA.
    #[arg(long)]
    quota: Option<u32>,

    /// Override RATE_LIMIT_WINDOW_SECS.
    #[arg(long)]
    window_secs: Option<u64>,

    /// Override RATE_LIMIT_SAFETY_FACTOR.
    #[arg(long)]
    safety_factor: Option<f64>,

    /// Override MAX_RETRIES.
    #[arg(long)]
    max_retries: Option<u32>,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(quota) = self.quota {
            config.quota = quota;
        }
        if let Some(window_secs) = self.window_secs {
            config.window_secs = window_secs;
        }
        if let Some(safety_factor) = self.safety_factor {
            config.safety_factor = safety_factor;
        }
        if let Some(max_retries) = self.max_retries {
            config.max_retries = max_retries;
        }
    }
}

/// Main entry point.
///
/// Loads configuration, reads the input table, enriches each company number
/// in order and writes the output file. A partial output file is still
/// written when the run is cancelled with Ctrl-C.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "company_enrich=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    // Load configuration
    let mut config = Config::from_env()?;
    args.apply(&mut config);
    config.validate()?;

    let table = InputTable::read(&args.input, &args.column)?;
    let identifiers = table.identifiers();

    let cancel = CancellationFlag::new();
    let limiter = Arc::new(
        RateLimiter::from_config(&config, Arc::new(TokioSleeper))?
            .with_cancellation(cancel.clone()),
    );
    tracing::info!(
        "Pacing requests {:.2}s apart ({} per {}s, safety factor {})",
        limiter.delay().as_secs_f64(),
        config.quota,
        config.window_secs,
        config.safety_factor
    );

    let client = RegistryClient::from_config(&config, limiter.clone())?;
    let pipeline = EnrichmentPipeline::new(client);

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current request");
            cancel.cancel();
        }
    });

    let mut writer = CsvResultWriter::new(table);
    let outcome = pipeline.run(&identifiers, args.limit, &mut writer).await;

    // Flush whatever was collected, even when the run stopped early
    let path = output_path(&args.output_dir, chrono::Local::now());
    writer
        .finish(&path)
        .with_context(|| format!("Error saving output file {}", path.display()))?;

    tracing::info!(
        "Requests paced: {} waits, {} backoffs",
        limiter.wait_count(),
        limiter.backoff_count()
    );

    outcome?;
    Ok(())
}
