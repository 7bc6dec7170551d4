//! SQLite-backed store. Money columns are TEXT holding decimal strings and
//! are parsed on the way out; enum columns round-trip through `as_str`.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};

use crate::database::models::{
    Account, Budget, BudgetCriteria, BudgetDraft, Category, NewTransaction, ScheduleDraft,
    ScheduleType, ScheduledTransaction, Transaction, TransactionKind,
};
use crate::error::{LedgerError, LedgerResult};
use crate::schedule::recurrence::Frequency;

use super::{LedgerStore, SchedulePatch};

#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

fn decode_amount(row: &SqliteRow, column: &str) -> LedgerResult<Decimal> {
    let text: String = row.try_get(column)?;
    Decimal::from_str(&text)
        .map_err(|e| LedgerError::Persistence(format!("invalid decimal in {column}: {e}")))
}

fn decode_kind(row: &SqliteRow) -> LedgerResult<TransactionKind> {
    let text: String = row.try_get("kind")?;
    TransactionKind::parse(&text)
        .ok_or_else(|| LedgerError::Persistence(format!("unknown transaction kind: {text}")))
}

fn map_transaction(row: &SqliteRow) -> LedgerResult<Transaction> {
    Ok(Transaction {
        transaction_id: row.try_get("transaction_id")?,
        user_id: row.try_get("user_id")?,
        account_id: row.try_get("account_id")?,
        description: row.try_get("description")?,
        amount: decode_amount(row, "amount")?,
        kind: decode_kind(row)?,
        category_id: row.try_get("category_id")?,
        transfer_account_id: row.try_get("transfer_account_id")?,
        transaction_date: row.try_get("transaction_date")?,
        scheduled_id: row.try_get("scheduled_id")?,
        created_at: row.try_get("created_at")?,
    })
}

fn map_schedule(row: &SqliteRow) -> LedgerResult<ScheduledTransaction> {
    let type_text: String = row.try_get("schedule_type")?;
    let schedule_type = ScheduleType::parse(&type_text)
        .ok_or_else(|| LedgerError::Persistence(format!("unknown schedule type: {type_text}")))?;

    let frequency = match row.try_get::<Option<String>, _>("frequency")? {
        Some(text) => Some(
            Frequency::parse(&text)
                .ok_or_else(|| LedgerError::Persistence(format!("unknown frequency: {text}")))?,
        ),
        None => None,
    };

    Ok(ScheduledTransaction {
        scheduled_id: row.try_get("scheduled_id")?,
        user_id: row.try_get("user_id")?,
        account_id: row.try_get("account_id")?,
        description: row.try_get("description")?,
        amount: decode_amount(row, "amount")?,
        kind: decode_kind(row)?,
        category_id: row.try_get("category_id")?,
        transfer_account_id: row.try_get("transfer_account_id")?,
        schedule_type,
        frequency,
        num_installments: row.try_get("num_installments")?,
        remaining_installments: row.try_get("remaining_installments")?,
        next_due_date: row.try_get("next_due_date")?,
        end_date: row.try_get("end_date")?,
        last_executed: row.try_get("last_executed")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
    })
}

fn map_budget(row: &SqliteRow) -> LedgerResult<Budget> {
    Ok(Budget {
        budget_id: row.try_get("budget_id")?,
        user_id: row.try_get("user_id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        amount: decode_amount(row, "amount")?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        account_id: row.try_get("account_id")?,
        category_id: row.try_get("category_id")?,
        include_income: row.try_get("include_income")?,
        include_transfers: row.try_get("include_transfers")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
    })
}

fn map_account(row: &SqliteRow) -> LedgerResult<Account> {
    Ok(Account {
        account_id: row.try_get("account_id")?,
        user_id: row.try_get("user_id")?,
        account_name: row.try_get("account_name")?,
        account_type: row.try_get("account_type")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
    })
}

fn map_category(row: &SqliteRow) -> LedgerResult<Category> {
    Ok(Category {
        category_id: row.try_get("category_id")?,
        user_id: row.try_get("user_id")?,
        category_name: row.try_get("category_name")?,
        category_type: row.try_get("category_type")?,
    })
}

#[async_trait]
impl LedgerStore for SqliteStore {
    async fn insert_posting(&self, posting: &NewTransaction) -> LedgerResult<Transaction> {
        let now = Utc::now().naive_utc();
        let row = sqlx::query(
            r#"
            INSERT INTO transactions (
                user_id, account_id, description, amount, kind,
                category_id, transfer_account_id, transaction_date,
                scheduled_id, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(posting.user_id)
        .bind(posting.account_id)
        .bind(&posting.description)
        .bind(posting.amount.to_string())
        .bind(posting.kind.as_str())
        .bind(posting.category_id)
        .bind(posting.transfer_account_id)
        .bind(posting.transaction_date)
        .bind(posting.scheduled_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        map_transaction(&row)
    }

    async fn find_postings_for_account(&self, account_id: i64) -> LedgerResult<Vec<Transaction>> {
        let rows = sqlx::query(
            r#"
            SELECT *
            FROM transactions
            WHERE account_id = ? OR transfer_account_id = ?
            ORDER BY transaction_date DESC, transaction_id DESC
            "#,
        )
        .bind(account_id)
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_transaction).collect()
    }

    async fn sum_postings(&self, criteria: &BudgetCriteria) -> LedgerResult<Decimal> {
        // TEXT amounts cannot be summed in SQL, so matching rows are fetched
        // and folded here.
        let mut sql = String::from(
            "SELECT amount FROM transactions \
             WHERE user_id = ? AND transaction_date >= ? AND transaction_date <= ?",
        );
        if criteria.account_id.is_some() {
            sql.push_str(" AND account_id = ?");
        }
        if criteria.category_id.is_some() {
            sql.push_str(" AND category_id = ?");
        }
        if !criteria.include_income {
            sql.push_str(" AND kind != 'income'");
        }
        if !criteria.include_transfers {
            sql.push_str(" AND kind != 'transfer'");
        }

        let mut query = sqlx::query(&sql)
            .bind(criteria.user_id)
            .bind(criteria.start_date)
            .bind(criteria.end_date);
        if let Some(account_id) = criteria.account_id {
            query = query.bind(account_id);
        }
        if let Some(category_id) = criteria.category_id {
            query = query.bind(category_id);
        }

        let rows = query.fetch_all(&self.pool).await?;
        let mut total = Decimal::ZERO;
        for row in &rows {
            total += decode_amount(row, "amount")?;
        }
        Ok(total)
    }

    async fn insert_schedule(
        &self,
        owner_id: i64,
        draft: &ScheduleDraft,
        remaining_installments: Option<i64>,
    ) -> LedgerResult<ScheduledTransaction> {
        let now = Utc::now().naive_utc();
        let row = sqlx::query(
            r#"
            INSERT INTO scheduled_transactions (
                user_id, account_id, description, amount, kind,
                category_id, transfer_account_id, schedule_type, frequency,
                num_installments, remaining_installments, next_due_date,
                end_date, last_executed, is_active, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, NULL, 1, ?)
            RETURNING *
            "#,
        )
        .bind(owner_id)
        .bind(draft.account_id)
        .bind(&draft.description)
        .bind(draft.amount.to_string())
        .bind(draft.kind.as_str())
        .bind(draft.category_id)
        .bind(draft.transfer_account_id)
        .bind(draft.schedule_type.as_str())
        .bind(draft.frequency.map(|f| f.as_str()))
        .bind(draft.num_installments)
        .bind(remaining_installments)
        .bind(draft.next_due_date)
        .bind(draft.end_date)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        map_schedule(&row)
    }

    async fn find_schedule_by_id(&self, id: i64) -> LedgerResult<Option<ScheduledTransaction>> {
        let row = sqlx::query("SELECT * FROM scheduled_transactions WHERE scheduled_id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(map_schedule).transpose()
    }

    async fn find_schedules_by_owner(
        &self,
        owner_id: i64,
    ) -> LedgerResult<Vec<ScheduledTransaction>> {
        let rows = sqlx::query(
            "SELECT * FROM scheduled_transactions WHERE user_id = ? ORDER BY scheduled_id ASC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_schedule).collect()
    }

    async fn find_due_schedules(
        &self,
        cutoff: NaiveDateTime,
    ) -> LedgerResult<Vec<ScheduledTransaction>> {
        let rows = sqlx::query(
            r#"
            SELECT *
            FROM scheduled_transactions
            WHERE is_active = 1 AND next_due_date <= ?
            ORDER BY next_due_date ASC, scheduled_id ASC
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_schedule).collect()
    }

    async fn save_schedule(&self, schedule: &ScheduledTransaction) -> LedgerResult<()> {
        sqlx::query(
            r#"
            UPDATE scheduled_transactions
            SET account_id = ?, description = ?, amount = ?, kind = ?,
                category_id = ?, transfer_account_id = ?, schedule_type = ?,
                frequency = ?, num_installments = ?, remaining_installments = ?,
                next_due_date = ?, end_date = ?, last_executed = ?, is_active = ?
            WHERE scheduled_id = ?
            "#,
        )
        .bind(schedule.account_id)
        .bind(&schedule.description)
        .bind(schedule.amount.to_string())
        .bind(schedule.kind.as_str())
        .bind(schedule.category_id)
        .bind(schedule.transfer_account_id)
        .bind(schedule.schedule_type.as_str())
        .bind(schedule.frequency.map(|f| f.as_str()))
        .bind(schedule.num_installments)
        .bind(schedule.remaining_installments)
        .bind(schedule.next_due_date)
        .bind(schedule.end_date)
        .bind(schedule.last_executed)
        .bind(schedule.is_active)
        .bind(schedule.scheduled_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_schedule(&self, id: i64, patch: &SchedulePatch) -> LedgerResult<()> {
        let mut clauses = Vec::new();
        if patch.next_due_date.is_some() {
            clauses.push("next_due_date = ?");
        }
        if patch.remaining_installments.is_some() {
            clauses.push("remaining_installments = ?");
        }
        if patch.is_active.is_some() {
            clauses.push("is_active = ?");
        }
        if patch.last_executed.is_some() {
            clauses.push("last_executed = ?");
        }
        if clauses.is_empty() {
            return Ok(());
        }

        let sql = format!(
            "UPDATE scheduled_transactions SET {} WHERE scheduled_id = ?",
            clauses.join(", ")
        );
        let mut query = sqlx::query(&sql);
        if let Some(next_due) = patch.next_due_date {
            query = query.bind(next_due);
        }
        if let Some(remaining) = patch.remaining_installments {
            query = query.bind(remaining);
        }
        if let Some(active) = patch.is_active {
            query = query.bind(active);
        }
        if let Some(executed) = patch.last_executed {
            query = query.bind(executed);
        }
        query.bind(id).execute(&self.pool).await?;

        Ok(())
    }

    async fn delete_schedule(&self, id: i64) -> LedgerResult<()> {
        sqlx::query("DELETE FROM scheduled_transactions WHERE scheduled_id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_budget(&self, owner_id: i64, draft: &BudgetDraft) -> LedgerResult<Budget> {
        let now = Utc::now().naive_utc();
        let row = sqlx::query(
            r#"
            INSERT INTO budgets (
                user_id, name, description, amount, start_date, end_date,
                account_id, category_id, include_income, include_transfers,
                is_active, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?)
            RETURNING *
            "#,
        )
        .bind(owner_id)
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(draft.amount.to_string())
        .bind(draft.start_date)
        .bind(draft.end_date)
        .bind(draft.account_id)
        .bind(draft.category_id)
        .bind(draft.include_income)
        .bind(draft.include_transfers)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        map_budget(&row)
    }

    async fn find_budget_by_id(&self, id: i64) -> LedgerResult<Option<Budget>> {
        let row = sqlx::query("SELECT * FROM budgets WHERE budget_id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(map_budget).transpose()
    }

    async fn find_budgets_by_owner(&self, owner_id: i64) -> LedgerResult<Vec<Budget>> {
        let rows = sqlx::query("SELECT * FROM budgets WHERE user_id = ? ORDER BY budget_id ASC")
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(map_budget).collect()
    }

    async fn find_active_budgets(
        &self,
        owner_id: i64,
        now: NaiveDateTime,
    ) -> LedgerResult<Vec<Budget>> {
        let rows = sqlx::query(
            r#"
            SELECT *
            FROM budgets
            WHERE user_id = ? AND is_active = 1
              AND start_date <= ? AND end_date >= ?
            ORDER BY budget_id ASC
            "#,
        )
        .bind(owner_id)
        .bind(now)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_budget).collect()
    }

    async fn save_budget(&self, budget: &Budget) -> LedgerResult<()> {
        sqlx::query(
            r#"
            UPDATE budgets
            SET name = ?, description = ?, amount = ?, start_date = ?,
                end_date = ?, account_id = ?, category_id = ?,
                include_income = ?, include_transfers = ?, is_active = ?
            WHERE budget_id = ?
            "#,
        )
        .bind(&budget.name)
        .bind(&budget.description)
        .bind(budget.amount.to_string())
        .bind(budget.start_date)
        .bind(budget.end_date)
        .bind(budget.account_id)
        .bind(budget.category_id)
        .bind(budget.include_income)
        .bind(budget.include_transfers)
        .bind(budget.is_active)
        .bind(budget.budget_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_budget(&self, id: i64) -> LedgerResult<()> {
        sqlx::query("DELETE FROM budgets WHERE budget_id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_account(
        &self,
        owner_id: i64,
        name: &str,
        account_type: &str,
    ) -> LedgerResult<Account> {
        let now = Utc::now().naive_utc();
        let row = sqlx::query(
            r#"
            INSERT INTO accounts (user_id, account_name, account_type, is_active, created_at)
            VALUES (?, ?, ?, 1, ?)
            RETURNING *
            "#,
        )
        .bind(owner_id)
        .bind(name)
        .bind(account_type)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        map_account(&row)
    }

    async fn find_account_by_id(&self, id: i64) -> LedgerResult<Option<Account>> {
        let row = sqlx::query("SELECT * FROM accounts WHERE account_id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(map_account).transpose()
    }

    async fn find_accounts_by_owner(&self, owner_id: i64) -> LedgerResult<Vec<Account>> {
        let rows = sqlx::query("SELECT * FROM accounts WHERE user_id = ? ORDER BY account_id ASC")
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(map_account).collect()
    }

    async fn insert_category(
        &self,
        owner_id: i64,
        name: &str,
        category_type: &str,
    ) -> LedgerResult<Category> {
        let row = sqlx::query(
            r#"
            INSERT INTO categories (user_id, category_name, category_type)
            VALUES (?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(owner_id)
        .bind(name)
        .bind(category_type)
        .fetch_one(&self.pool)
        .await?;

        map_category(&row)
    }

    async fn find_categories_by_owner(&self, owner_id: i64) -> LedgerResult<Vec<Category>> {
        let rows = sqlx::query(
            "SELECT * FROM categories WHERE user_id = ? ORDER BY category_name ASC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_category).collect()
    }
}
