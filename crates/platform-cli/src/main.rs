//! Operator command-line tool for the control plane: the handful of tasks
//! that are deliberately kept out of the HTTP API because they are
//! operator-initiated, not user-initiated (report recovery, license
//! inspection, read-only model listing).

#![allow(clippy::print_stdout)]

use clap::{Parser, Subcommand};
use platform_entities::connect;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "platform-cli", about = "Control plane operator CLI")]
struct Cli {
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Report lease recovery.
    Reports {
        #[command(subcommand)]
        action: ReportsAction,
    },
    /// Read-only model inspection.
    Models {
        #[command(subcommand)]
        action: ModelsAction,
    },
    /// License file inspection.
    License {
        /// Path to the license JSON file.
        path: std::path::PathBuf,
    },
}

#[derive(Debug, Subcommand)]
enum ReportsAction {
    /// Reset a report stuck at its attempt limit back to `queued`.
    Reset { id: Uuid },
}

#[derive(Debug, Subcommand)]
enum ModelsAction {
    /// List a owner's non-hidden models.
    List { owner_username: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let pool = connect(&cli.database_url).await?;

    match cli.command {
        Command::Reports { action } => match action {
            ReportsAction::Reset { id } => {
                let report = platform_entities::repository::reset_report(&pool, id).await?;
                println!("{}", serde_json::to_string_pretty(&serde_json::json!({
                    "id": report.id,
                    "model_id": report.model_id,
                    "status": report.status,
                    "attempt": report.attempt,
                }))?);
            }
        },
        Command::Models { action } => match action {
            ModelsAction::List { owner_username } => {
                let models =
                    platform_entities::repository::list_models_for_owner(&pool, &owner_username)
                        .await?;
                for model in models {
                    println!(
                        "{}\t{}\t{:?}\t{:?}",
                        model.id, model.model_name, model.model_type, model.train_status
                    );
                }
            }
        },
        Command::License { path } => {
            let license = platform_core::license::verify_license(&path).await?;
            println!(
                "key={} expires_at={} max_concurrent_jobs={}",
                license.key, license.expires_at, license.max_concurrent_jobs
            );
        }
    }

    Ok(())
}
