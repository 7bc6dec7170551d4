use axum::{
    routing::{get, post},
    Router,
};

use crate::backend::{handlers, AppState};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/accounts",
            get(handlers::list_accounts).post(handlers::create_account),
        )
        .route("/api/accounts/:id", get(handlers::get_account))
        .route("/api/accounts/:id/balance", get(handlers::account_balance))
        .route(
            "/api/accounts/:id/transactions",
            get(handlers::list_account_transactions),
        )
        .route(
            "/api/categories",
            get(handlers::list_categories).post(handlers::create_category),
        )
        .route("/api/transactions", post(handlers::create_transaction))
        .route(
            "/api/schedules",
            get(handlers::list_schedules).post(handlers::create_schedule),
        )
        .route("/api/schedules/upcoming", get(handlers::upcoming_schedules))
        .route(
            "/api/schedules/:id",
            get(handlers::get_schedule)
                .put(handlers::update_schedule)
                .delete(handlers::delete_schedule),
        )
        .route("/api/schedules/:id/toggle", post(handlers::toggle_schedule))
        .route(
            "/api/budgets",
            get(handlers::list_budgets).post(handlers::create_budget),
        )
        .route("/api/budgets/alerts", get(handlers::budget_alerts))
        .route(
            "/api/budgets/:id",
            get(handlers::get_budget)
                .put(handlers::update_budget)
                .delete(handlers::delete_budget),
        )
        .route("/api/budgets/:id/progress", get(handlers::budget_progress))
}
