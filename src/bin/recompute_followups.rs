//! One-shot follow-up sweep.
//!
//! Re-classifies every pending follow-up against today's date and repairs each
//! contact's `next_followup`, then exits. Meant for cron hosts that run the
//! sweep outside the API process.

use dotenvy::dotenv;
use std::env;

use rust_followup_api::data::db::Database;
use rust_followup_api::data::db_storage::PgPipelineStore;
use rust_followup_api::sweep;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt::init();

    let database_url = env::var("DATABASE_URL")
        .or_else(|_| env::var("DB_URL"))
        .map_err(|_| anyhow::anyhow!("DATABASE_URL or DB_URL must be set"))?;
    let repair = !env::args().any(|arg| arg == "--no-repair");

    let db = Database::new(&database_url, 2).await?;
    db.ensure_schema().await?;
    let store = PgPipelineStore::new(db.pool.clone());

    tracing::info!("Connected to database. Starting follow-up sweep...");
    let report = sweep::run_sweep(&store, sweep::today(), repair).await?;

    tracing::info!(
        "Updated {} active follow-ups ({} contacts repaired).",
        report.followups_updated,
        report.contacts_repaired.unwrap_or(0)
    );

    Ok(())
}
