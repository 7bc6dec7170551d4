use std::env;
use std::sync::Arc;

use dotenvy::dotenv;
use tracing_subscriber::EnvFilter;

use personal_ledger::config::Config;
use personal_ledger::database::db::{connection, migrate};
use personal_ledger::database::store::{LedgerStore, SqliteStore};
use personal_ledger::backend;
use personal_ledger::schedule::ScheduleService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    let pool = connection::get_db_pool(&config.database_url).await?;
    migrate::run_migrations(&pool).await?;

    let args: Vec<String> = env::args().collect();

    if args.len() > 1 && args[1] == "sweep" {
        // One-shot sweep, handy for ops and cron-style deployments.
        let store: Arc<dyn LedgerStore> = Arc::new(SqliteStore::new(pool));
        let schedules = ScheduleService::new(store);
        let now = chrono::Utc::now().naive_utc();
        let report = schedules.process_due_transactions(now).await?;
        println!(
            "Sweep finished: {} processed, {} failed",
            report.processed_count(),
            report.failures.len()
        );
    } else {
        println!("Starting Backend Server...");
        backend::run_server(config, pool).await?;
    }
    Ok(())
}
