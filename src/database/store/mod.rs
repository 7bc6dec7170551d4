pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use crate::database::models::{
    Account, Budget, BudgetCriteria, BudgetDraft, Category, NewTransaction, ScheduleDraft,
    ScheduledTransaction, Transaction,
};
use crate::error::LedgerResult;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Partial schedule update applied by the sweep. Only `Some` fields are
/// written, so a retirement does not clobber the due date and an advance does
/// not touch the active flag.
#[derive(Debug, Clone, Default)]
pub struct SchedulePatch {
    pub next_due_date: Option<NaiveDateTime>,
    pub remaining_installments: Option<i64>,
    pub is_active: Option<bool>,
    pub last_executed: Option<NaiveDateTime>,
}

/// The abstract ledger/schedule store. Backed by SQLite in production and by
/// an in-memory map in tests.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    // Postings. Insert-only; a posting is immutable once written.
    async fn insert_posting(&self, posting: &NewTransaction) -> LedgerResult<Transaction>;
    /// Postings touching an account, either as source or as transfer target,
    /// newest first.
    async fn find_postings_for_account(&self, account_id: i64) -> LedgerResult<Vec<Transaction>>;
    /// Sum of posting amounts matching the criteria.
    async fn sum_postings(&self, criteria: &BudgetCriteria) -> LedgerResult<Decimal>;

    // Schedules.
    async fn insert_schedule(
        &self,
        owner_id: i64,
        draft: &ScheduleDraft,
        remaining_installments: Option<i64>,
    ) -> LedgerResult<ScheduledTransaction>;
    async fn find_schedule_by_id(&self, id: i64) -> LedgerResult<Option<ScheduledTransaction>>;
    async fn find_schedules_by_owner(&self, owner_id: i64)
        -> LedgerResult<Vec<ScheduledTransaction>>;
    /// Active schedules with `next_due_date <= cutoff`, ascending by due date
    /// then id.
    async fn find_due_schedules(
        &self,
        cutoff: NaiveDateTime,
    ) -> LedgerResult<Vec<ScheduledTransaction>>;
    /// Full-row update used by the CRUD paths.
    async fn save_schedule(&self, schedule: &ScheduledTransaction) -> LedgerResult<()>;
    /// Partial update used by the sweep.
    async fn update_schedule(&self, id: i64, patch: &SchedulePatch) -> LedgerResult<()>;
    async fn delete_schedule(&self, id: i64) -> LedgerResult<()>;

    // Budgets.
    async fn insert_budget(&self, owner_id: i64, draft: &BudgetDraft) -> LedgerResult<Budget>;
    async fn find_budget_by_id(&self, id: i64) -> LedgerResult<Option<Budget>>;
    async fn find_budgets_by_owner(&self, owner_id: i64) -> LedgerResult<Vec<Budget>>;
    /// Active budgets whose [start, end] window contains `now`.
    async fn find_active_budgets(
        &self,
        owner_id: i64,
        now: NaiveDateTime,
    ) -> LedgerResult<Vec<Budget>>;
    async fn save_budget(&self, budget: &Budget) -> LedgerResult<()>;
    async fn delete_budget(&self, id: i64) -> LedgerResult<()>;

    // Accounts and categories.
    async fn insert_account(
        &self,
        owner_id: i64,
        name: &str,
        account_type: &str,
    ) -> LedgerResult<Account>;
    async fn find_account_by_id(&self, id: i64) -> LedgerResult<Option<Account>>;
    async fn find_accounts_by_owner(&self, owner_id: i64) -> LedgerResult<Vec<Account>>;
    async fn insert_category(
        &self,
        owner_id: i64,
        name: &str,
        category_type: &str,
    ) -> LedgerResult<Category>;
    async fn find_categories_by_owner(&self, owner_id: i64) -> LedgerResult<Vec<Category>>;
}
