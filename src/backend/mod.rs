mod handlers;
mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use chrono::Utc;
use sqlx::{Pool, Sqlite};
use tracing::{error, info};

use crate::budget::BudgetService;
use crate::config::Config;
use crate::database::store::{LedgerStore, SqliteStore};
use crate::schedule::ScheduleService;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn LedgerStore>,
    pub schedules: Arc<ScheduleService>,
    pub budgets: Arc<BudgetService>,
}

impl AppState {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            schedules: Arc::new(ScheduleService::new(store.clone())),
            budgets: Arc::new(BudgetService::new(store.clone())),
            store,
        }
    }
}

/// Periodic trigger for the sweep. First tick fires immediately so overdue
/// schedules are caught up right after boot.
fn spawn_sweep_timer(schedules: Arc<ScheduleService>, interval_secs: u64) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        loop {
            ticker.tick().await;
            let now = Utc::now().naive_utc();
            match schedules.process_due_transactions(now).await {
                Ok(report) => info!(
                    processed = report.processed_count(),
                    failed = report.failures.len(),
                    "scheduled sweep finished"
                ),
                Err(e) => error!(error = %e, "scheduled sweep failed"),
            }
        }
    });
}

pub async fn run_server(config: Config, pool: Pool<Sqlite>) -> anyhow::Result<()> {
    let store: Arc<dyn LedgerStore> = Arc::new(SqliteStore::new(pool));
    let state = AppState::new(store);

    spawn_sweep_timer(state.schedules.clone(), config.sweep_interval_secs);

    let app = Router::new()
        .route("/health", get(|| async { "Backend is running" }))
        .merge(routes::api_routes())
        .with_state(state);

    info!("Server listening on http://{}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
