//! `platform-queue` — the report worker pool binary (§4.6, `SPEC_FULL.md` §7).
//!
//! Started once per worker process; the cluster scheduler autoscales the
//! number of processes, and each serializes against the others purely via
//! the database lease guarantee (`FOR UPDATE SKIP LOCKED`).

use std::time::Duration;

use clap::{Parser, ValueEnum};
use platform_entities::connect;
use platform_queue::{worker, NullScorer, DEFAULT_POLL_INTERVAL_SECS};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    Worker,
}

#[derive(Debug, Parser)]
#[command(name = "platform-queue", about = "Report lease queue worker")]
struct Cli {
    #[arg(long, value_enum, default_value = "worker")]
    mode: Mode,

    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    #[arg(long, env = "REPORT_POLL_INTERVAL_SECS", default_value_t = DEFAULT_POLL_INTERVAL_SECS)]
    poll_interval_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let pool = connect(&cli.database_url).await?;

    match cli.mode {
        Mode::Worker => {
            tracing::info!(poll_interval_secs = cli.poll_interval_secs, "starting report worker");
            worker::run_forever(
                pool,
                NullScorer,
                Duration::from_secs(cli.poll_interval_secs),
            )
            .await;
        }
    }

    Ok(())
}
