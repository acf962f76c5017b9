//! `catalog-ingest`: one ingestion run from the command line.
//!
//! Credentials and defaults come from the environment (a `.env` file is
//! loaded first); flags override them. Ctrl-C cancels the run.

mod args;
mod output;

use anyhow::{bail, Context, Result};
use args::Cli;
use bridge_desktop::ReqwestHttpClient;
use bridge_traits::http::HttpClient;
use clap::Parser;
use core_ingest::IngestPipeline;
use core_runtime::config::IngestConfig;
use core_runtime::logging::{init_logging, LoggingConfig};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let mut logging = LoggingConfig::default().with_level(cli.log_level);
    if let Some(format) = cli.log_format {
        logging = logging.with_format(format);
    }
    init_logging(logging).context("Failed to initialize logging")?;

    let config = IngestConfig::from_env().context("Failed to load configuration")?;
    let config = cli.apply_overrides(config)?;

    let request = cli.request()?;
    if request.is_empty() {
        bail!("Nothing to ingest: pass --playlists, --artists, --track-ids or --track-ids-file");
    }

    let http_client: Arc<dyn HttpClient> = Arc::new(
        ReqwestHttpClient::with_timeout(config.request_timeout)
            .context("Failed to build HTTP client")?,
    );

    let cancel = CancellationToken::new();
    install_shutdown_handler(cancel.clone());

    let pipeline = IngestPipeline::connect(config, http_client)
        .await
        .context("Failed to connect to the catalog API")?;
    let report = pipeline.run(request, &cancel).await?;

    let written = output::write_dataset(&cli.out, &report.dataset)?;
    let stats = &report.stats;
    info!(
        run_id = %report.run_id,
        rows = written,
        path = %cli.out.display(),
        metadata_only = !report.dataset.attributes_joined,
        "Dataset written"
    );
    if stats.is_degraded() {
        warn!(
            references_failed = stats.references_failed,
            primary_exhausted = stats.primary_exhausted,
            attribute_exhausted = stats.attribute_exhausted,
            attribute_skipped_ids = stats.attribute_skipped_ids,
            genre_batches_failed = stats.genre_batches_failed,
            "Run completed with partial data"
        );
    }

    println!(
        "Wrote {} rows to {} (audio features on {:.0}% of rows)",
        written,
        cli.out.display(),
        stats.attribute_coverage() * 100.0
    );
    Ok(())
}

fn install_shutdown_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("Ctrl+C received, cancelling run");
                cancel.cancel();
            }
            Err(err) => warn!(error = %err, "Failed to install Ctrl+C handler"),
        }
    });
}
