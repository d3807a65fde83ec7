use anyhow::Result;
use clap::Parser;
use reqwest::Client;
use std::process::ExitCode;
use taxi_ingest::{config::Cli, db::Database, load};
use tokio::time::Instant;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();

    // ─── 2) options & datasets ───────────────────────────────────────
    let cli = Cli::parse();
    let conn = cli.connection();
    let datasets = cli.resolve_datasets()?;
    info!(url = %conn.redacted_url(), datasets = datasets.len(), "startup");

    // ─── 3) connectivity probe ───────────────────────────────────────
    let mut db = match Database::verify(&conn).await {
        Ok(db) => db,
        Err(err) => {
            error!(error = %err, "DB not reachable");
            return Ok(ExitCode::FAILURE);
        }
    };

    // ─── 4) load each dataset in order ───────────────────────────────
    let client = Client::new();
    let start = Instant::now();
    for dataset in &datasets {
        let report = load::load_dataset(&client, &mut db, dataset).await?;
        info!(
            dataset = %report.dataset,
            table = %report.table,
            rows = report.rows,
            "imported"
        );
    }

    info!(elapsed = ?start.elapsed(), "all done");
    Ok(ExitCode::SUCCESS)
}
