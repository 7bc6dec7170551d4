//! Thin HTTP handlers: parse the request, call the service or store, map the
//! result to JSON. The owner id comes from the `x-user-id` header, which is
//! where the auth middleware would sit in a full deployment.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::backend::AppState;
use crate::database::models::{
    BudgetDraft, NewTransaction, ScheduleDraft, Transaction, TransactionKind,
};
use crate::error::{LedgerError, LedgerResult};

fn owner_id(headers: &HeaderMap) -> LedgerResult<i64> {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| {
            LedgerError::Validation(vec!["x-user-id header is required".to_string()])
        })
}

// ========== Accounts ==========

#[derive(Debug, Deserialize)]
pub struct CreateAccount {
    pub name: String,
    pub account_type: String,
}

pub async fn create_account(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateAccount>,
) -> LedgerResult<impl IntoResponse> {
    let owner = owner_id(&headers)?;
    let account = state
        .store
        .insert_account(owner, &payload.name, &payload.account_type)
        .await?;
    Ok((StatusCode::CREATED, Json(account)))
}

pub async fn list_accounts(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> LedgerResult<impl IntoResponse> {
    let owner = owner_id(&headers)?;
    Ok(Json(state.store.find_accounts_by_owner(owner).await?))
}

pub async fn get_account(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> LedgerResult<impl IntoResponse> {
    let owner = owner_id(&headers)?;
    match state.store.find_account_by_id(id).await? {
        Some(account) if account.user_id == owner => Ok(Json(account)),
        _ => Err(LedgerError::NotFound("account")),
    }
}

/// Balance is derived from postings, never stored: income adds, expense
/// subtracts, a transfer subtracts from the source and adds to the target.
fn fold_balance(account_id: i64, postings: &[Transaction]) -> Decimal {
    postings.iter().fold(Decimal::ZERO, |balance, t| {
        if t.account_id == account_id {
            match t.kind {
                TransactionKind::Income => balance + t.amount,
                TransactionKind::Expense | TransactionKind::Transfer => balance - t.amount,
            }
        } else if t.transfer_account_id == Some(account_id)
            && t.kind == TransactionKind::Transfer
        {
            balance + t.amount
        } else {
            balance
        }
    })
}

pub async fn account_balance(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> LedgerResult<impl IntoResponse> {
    let owner = owner_id(&headers)?;
    match state.store.find_account_by_id(id).await? {
        Some(account) if account.user_id == owner => {
            let postings = state.store.find_postings_for_account(id).await?;
            let balance = fold_balance(id, &postings);
            Ok(Json(serde_json::json!({
                "account_id": id,
                "balance": balance,
            })))
        }
        _ => Err(LedgerError::NotFound("account")),
    }
}

pub async fn list_account_transactions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> LedgerResult<impl IntoResponse> {
    let owner = owner_id(&headers)?;
    match state.store.find_account_by_id(id).await? {
        Some(account) if account.user_id == owner => {
            Ok(Json(state.store.find_postings_for_account(id).await?))
        }
        _ => Err(LedgerError::NotFound("account")),
    }
}

// ========== Categories ==========

#[derive(Debug, Deserialize)]
pub struct CreateCategory {
    pub name: String,
    pub category_type: String,
}

pub async fn create_category(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateCategory>,
) -> LedgerResult<impl IntoResponse> {
    let owner = owner_id(&headers)?;
    let category = state
        .store
        .insert_category(owner, &payload.name, &payload.category_type)
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn list_categories(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> LedgerResult<impl IntoResponse> {
    let owner = owner_id(&headers)?;
    Ok(Json(state.store.find_categories_by_owner(owner).await?))
}

// ========== Transactions ==========

#[derive(Debug, Deserialize)]
pub struct CreateTransaction {
    pub account_id: i64,
    pub description: String,
    pub amount: Decimal,
    pub kind: TransactionKind,
    pub category_id: Option<i64>,
    pub transfer_account_id: Option<i64>,
    pub transaction_date: NaiveDateTime,
}

/// Direct user-entered posting, outside the sweep.
pub async fn create_transaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateTransaction>,
) -> LedgerResult<impl IntoResponse> {
    let owner = owner_id(&headers)?;

    let mut errors = Vec::new();
    if payload.description.trim().is_empty() {
        errors.push("Description is required".to_string());
    }
    if payload.amount <= Decimal::ZERO {
        errors.push("Amount must be positive".to_string());
    }
    if payload.kind == TransactionKind::Transfer {
        match payload.transfer_account_id {
            None => errors.push("Transfer account is required for transfer transactions".to_string()),
            Some(target) if target == payload.account_id => {
                errors.push("Transfer account must differ from source account".to_string())
            }
            Some(_) => {}
        }
    }
    if !errors.is_empty() {
        return Err(LedgerError::Validation(errors));
    }

    let transaction = state
        .store
        .insert_posting(&NewTransaction {
            user_id: owner,
            account_id: payload.account_id,
            description: payload.description,
            amount: payload.amount,
            kind: payload.kind,
            category_id: payload.category_id,
            transfer_account_id: payload.transfer_account_id,
            transaction_date: payload.transaction_date,
            scheduled_id: None,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

// ========== Schedules ==========

pub async fn create_schedule(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(draft): Json<ScheduleDraft>,
) -> LedgerResult<impl IntoResponse> {
    let owner = owner_id(&headers)?;
    let schedule = state.schedules.create(owner, &draft).await?;
    Ok((StatusCode::CREATED, Json(schedule)))
}

pub async fn list_schedules(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> LedgerResult<impl IntoResponse> {
    let owner = owner_id(&headers)?;
    Ok(Json(state.schedules.list(owner).await?))
}

pub async fn get_schedule(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> LedgerResult<impl IntoResponse> {
    let owner = owner_id(&headers)?;
    Ok(Json(state.schedules.get(owner, id).await?))
}

pub async fn update_schedule(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(draft): Json<ScheduleDraft>,
) -> LedgerResult<impl IntoResponse> {
    let owner = owner_id(&headers)?;
    Ok(Json(state.schedules.update(owner, id, &draft).await?))
}

pub async fn delete_schedule(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> LedgerResult<impl IntoResponse> {
    let owner = owner_id(&headers)?;
    state.schedules.delete(owner, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn toggle_schedule(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> LedgerResult<impl IntoResponse> {
    let owner = owner_id(&headers)?;
    Ok(Json(state.schedules.toggle_active(owner, id).await?))
}

#[derive(Debug, Deserialize)]
pub struct UpcomingQuery {
    pub days: Option<i64>,
}

pub async fn upcoming_schedules(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<UpcomingQuery>,
) -> LedgerResult<impl IntoResponse> {
    let owner = owner_id(&headers)?;
    let days = query.days.unwrap_or(7);
    let now = Utc::now().naive_utc();
    Ok(Json(state.schedules.get_upcoming(owner, days, now).await?))
}

// ========== Budgets ==========

pub async fn create_budget(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(draft): Json<BudgetDraft>,
) -> LedgerResult<impl IntoResponse> {
    let owner = owner_id(&headers)?;
    let budget = state.budgets.create(owner, &draft).await?;
    Ok((StatusCode::CREATED, Json(budget)))
}

pub async fn list_budgets(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> LedgerResult<impl IntoResponse> {
    let owner = owner_id(&headers)?;
    Ok(Json(state.budgets.list(owner).await?))
}

pub async fn get_budget(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> LedgerResult<impl IntoResponse> {
    let owner = owner_id(&headers)?;
    Ok(Json(state.budgets.get(owner, id).await?))
}

pub async fn update_budget(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(draft): Json<BudgetDraft>,
) -> LedgerResult<impl IntoResponse> {
    let owner = owner_id(&headers)?;
    Ok(Json(state.budgets.update(owner, id, &draft).await?))
}

pub async fn delete_budget(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> LedgerResult<impl IntoResponse> {
    let owner = owner_id(&headers)?;
    state.budgets.delete(owner, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn budget_progress(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> LedgerResult<impl IntoResponse> {
    let owner = owner_id(&headers)?;
    Ok(Json(state.budgets.progress(owner, id).await?))
}

pub async fn budget_alerts(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> LedgerResult<impl IntoResponse> {
    let owner = owner_id(&headers)?;
    let now = Utc::now().naive_utc();
    Ok(Json(state.budgets.alerts_for_user(owner, now).await?))
}
