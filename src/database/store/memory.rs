//! In-memory store used by tests. Thread-safe through RwLock-guarded maps,
//! with optional per-account posting failures so sweep error isolation can be
//! exercised without a real database.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use crate::database::models::{
    Account, Budget, BudgetCriteria, BudgetDraft, Category, NewTransaction, ScheduleDraft,
    ScheduledTransaction, Transaction, TransactionKind,
};
use crate::error::{LedgerError, LedgerResult};

use super::{LedgerStore, SchedulePatch};

#[derive(Default)]
pub struct MemoryStore {
    accounts: RwLock<HashMap<i64, Account>>,
    categories: RwLock<HashMap<i64, Category>>,
    transactions: RwLock<HashMap<i64, Transaction>>,
    schedules: RwLock<HashMap<i64, ScheduledTransaction>>,
    budgets: RwLock<HashMap<i64, Budget>>,
    next_id: AtomicI64,
    /// Accounts for which `insert_posting` fails with a persistence error.
    failing_accounts: RwLock<HashSet<i64>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            ..Default::default()
        }
    }

    fn alloc_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Makes every subsequent `insert_posting` against `account_id` fail.
    pub async fn fail_postings_for_account(&self, account_id: i64) {
        self.failing_accounts.write().await.insert(account_id);
    }

    pub async fn clear_posting_failures(&self) {
        self.failing_accounts.write().await.clear();
    }

    pub async fn postings(&self) -> Vec<Transaction> {
        let mut all: Vec<_> = self.transactions.read().await.values().cloned().collect();
        all.sort_by_key(|t| t.transaction_id);
        all
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn insert_posting(&self, posting: &NewTransaction) -> LedgerResult<Transaction> {
        if self.failing_accounts.read().await.contains(&posting.account_id) {
            return Err(LedgerError::Persistence(format!(
                "posting insert failed for account {}",
                posting.account_id
            )));
        }

        let transaction = Transaction {
            transaction_id: self.alloc_id(),
            user_id: posting.user_id,
            account_id: posting.account_id,
            description: posting.description.clone(),
            amount: posting.amount,
            kind: posting.kind,
            category_id: posting.category_id,
            transfer_account_id: posting.transfer_account_id,
            transaction_date: posting.transaction_date,
            scheduled_id: posting.scheduled_id,
            created_at: Utc::now().naive_utc(),
        };
        self.transactions
            .write()
            .await
            .insert(transaction.transaction_id, transaction.clone());
        Ok(transaction)
    }

    async fn find_postings_for_account(&self, account_id: i64) -> LedgerResult<Vec<Transaction>> {
        let transactions = self.transactions.read().await;
        let mut matched: Vec<_> = transactions
            .values()
            .filter(|t| t.account_id == account_id || t.transfer_account_id == Some(account_id))
            .cloned()
            .collect();
        matched.sort_by(|a, b| {
            b.transaction_date
                .cmp(&a.transaction_date)
                .then(b.transaction_id.cmp(&a.transaction_id))
        });
        Ok(matched)
    }

    async fn sum_postings(&self, criteria: &BudgetCriteria) -> LedgerResult<Decimal> {
        let transactions = self.transactions.read().await;
        let total = transactions
            .values()
            .filter(|t| {
                t.user_id == criteria.user_id
                    && t.transaction_date >= criteria.start_date
                    && t.transaction_date <= criteria.end_date
                    && criteria.account_id.map_or(true, |a| t.account_id == a)
                    && criteria.category_id.map_or(true, |c| t.category_id == Some(c))
                    && (criteria.include_income || t.kind != TransactionKind::Income)
                    && (criteria.include_transfers || t.kind != TransactionKind::Transfer)
            })
            .fold(Decimal::ZERO, |acc, t| acc + t.amount);
        Ok(total)
    }

    async fn insert_schedule(
        &self,
        owner_id: i64,
        draft: &ScheduleDraft,
        remaining_installments: Option<i64>,
    ) -> LedgerResult<ScheduledTransaction> {
        let schedule = ScheduledTransaction {
            scheduled_id: self.alloc_id(),
            user_id: owner_id,
            account_id: draft.account_id,
            description: draft.description.clone(),
            amount: draft.amount,
            kind: draft.kind,
            category_id: draft.category_id,
            transfer_account_id: draft.transfer_account_id,
            schedule_type: draft.schedule_type,
            frequency: draft.frequency,
            num_installments: draft.num_installments,
            remaining_installments,
            next_due_date: draft.next_due_date,
            end_date: draft.end_date,
            last_executed: None,
            is_active: true,
            created_at: Utc::now().naive_utc(),
        };
        self.schedules
            .write()
            .await
            .insert(schedule.scheduled_id, schedule.clone());
        Ok(schedule)
    }

    async fn find_schedule_by_id(&self, id: i64) -> LedgerResult<Option<ScheduledTransaction>> {
        Ok(self.schedules.read().await.get(&id).cloned())
    }

    async fn find_schedules_by_owner(
        &self,
        owner_id: i64,
    ) -> LedgerResult<Vec<ScheduledTransaction>> {
        let schedules = self.schedules.read().await;
        let mut matched: Vec<_> = schedules
            .values()
            .filter(|s| s.user_id == owner_id)
            .cloned()
            .collect();
        matched.sort_by_key(|s| s.scheduled_id);
        Ok(matched)
    }

    async fn find_due_schedules(
        &self,
        cutoff: NaiveDateTime,
    ) -> LedgerResult<Vec<ScheduledTransaction>> {
        let schedules = self.schedules.read().await;
        let mut due: Vec<_> = schedules
            .values()
            .filter(|s| s.is_active && s.next_due_date <= cutoff)
            .cloned()
            .collect();
        due.sort_by(|a, b| {
            a.next_due_date
                .cmp(&b.next_due_date)
                .then(a.scheduled_id.cmp(&b.scheduled_id))
        });
        Ok(due)
    }

    async fn save_schedule(&self, schedule: &ScheduledTransaction) -> LedgerResult<()> {
        let mut schedules = self.schedules.write().await;
        if !schedules.contains_key(&schedule.scheduled_id) {
            return Err(LedgerError::NotFound("scheduled transaction"));
        }
        schedules.insert(schedule.scheduled_id, schedule.clone());
        Ok(())
    }

    async fn update_schedule(&self, id: i64, patch: &SchedulePatch) -> LedgerResult<()> {
        let mut schedules = self.schedules.write().await;
        let schedule = schedules
            .get_mut(&id)
            .ok_or(LedgerError::NotFound("scheduled transaction"))?;
        if let Some(next_due) = patch.next_due_date {
            schedule.next_due_date = next_due;
        }
        if let Some(remaining) = patch.remaining_installments {
            schedule.remaining_installments = Some(remaining);
        }
        if let Some(active) = patch.is_active {
            schedule.is_active = active;
        }
        if let Some(executed) = patch.last_executed {
            schedule.last_executed = Some(executed);
        }
        Ok(())
    }

    async fn delete_schedule(&self, id: i64) -> LedgerResult<()> {
        self.schedules.write().await.remove(&id);
        Ok(())
    }

    async fn insert_budget(&self, owner_id: i64, draft: &BudgetDraft) -> LedgerResult<Budget> {
        let budget = Budget {
            budget_id: self.alloc_id(),
            user_id: owner_id,
            name: draft.name.clone(),
            description: draft.description.clone(),
            amount: draft.amount,
            start_date: draft.start_date,
            end_date: draft.end_date,
            account_id: draft.account_id,
            category_id: draft.category_id,
            include_income: draft.include_income,
            include_transfers: draft.include_transfers,
            is_active: true,
            created_at: Utc::now().naive_utc(),
        };
        self.budgets
            .write()
            .await
            .insert(budget.budget_id, budget.clone());
        Ok(budget)
    }

    async fn find_budget_by_id(&self, id: i64) -> LedgerResult<Option<Budget>> {
        Ok(self.budgets.read().await.get(&id).cloned())
    }

    async fn find_budgets_by_owner(&self, owner_id: i64) -> LedgerResult<Vec<Budget>> {
        let budgets = self.budgets.read().await;
        let mut matched: Vec<_> = budgets
            .values()
            .filter(|b| b.user_id == owner_id)
            .cloned()
            .collect();
        matched.sort_by_key(|b| b.budget_id);
        Ok(matched)
    }

    async fn find_active_budgets(
        &self,
        owner_id: i64,
        now: NaiveDateTime,
    ) -> LedgerResult<Vec<Budget>> {
        let budgets = self.budgets.read().await;
        let mut matched: Vec<_> = budgets
            .values()
            .filter(|b| {
                b.user_id == owner_id && b.is_active && b.start_date <= now && b.end_date >= now
            })
            .cloned()
            .collect();
        matched.sort_by_key(|b| b.budget_id);
        Ok(matched)
    }

    async fn save_budget(&self, budget: &Budget) -> LedgerResult<()> {
        let mut budgets = self.budgets.write().await;
        if !budgets.contains_key(&budget.budget_id) {
            return Err(LedgerError::NotFound("budget"));
        }
        budgets.insert(budget.budget_id, budget.clone());
        Ok(())
    }

    async fn delete_budget(&self, id: i64) -> LedgerResult<()> {
        self.budgets.write().await.remove(&id);
        Ok(())
    }

    async fn insert_account(
        &self,
        owner_id: i64,
        name: &str,
        account_type: &str,
    ) -> LedgerResult<Account> {
        let account = Account {
            account_id: self.alloc_id(),
            user_id: owner_id,
            account_name: name.to_string(),
            account_type: account_type.to_string(),
            is_active: true,
            created_at: Utc::now().naive_utc(),
        };
        self.accounts
            .write()
            .await
            .insert(account.account_id, account.clone());
        Ok(account)
    }

    async fn find_account_by_id(&self, id: i64) -> LedgerResult<Option<Account>> {
        Ok(self.accounts.read().await.get(&id).cloned())
    }

    async fn find_accounts_by_owner(&self, owner_id: i64) -> LedgerResult<Vec<Account>> {
        let accounts = self.accounts.read().await;
        let mut matched: Vec<_> = accounts
            .values()
            .filter(|a| a.user_id == owner_id)
            .cloned()
            .collect();
        matched.sort_by_key(|a| a.account_id);
        Ok(matched)
    }

    async fn insert_category(
        &self,
        owner_id: i64,
        name: &str,
        category_type: &str,
    ) -> LedgerResult<Category> {
        let category = Category {
            category_id: self.alloc_id(),
            user_id: owner_id,
            category_name: name.to_string(),
            category_type: category_type.to_string(),
        };
        self.categories
            .write()
            .await
            .insert(category.category_id, category.clone());
        Ok(category)
    }

    async fn find_categories_by_owner(&self, owner_id: i64) -> LedgerResult<Vec<Category>> {
        let categories = self.categories.read().await;
        let mut matched: Vec<_> = categories
            .values()
            .filter(|c| c.user_id == owner_id)
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.category_name.cmp(&b.category_name));
        Ok(matched)
    }
}
