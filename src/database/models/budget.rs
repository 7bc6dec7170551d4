use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Budget {
    pub budget_id: i64,
    pub user_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub amount: Decimal,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    pub account_id: Option<i64>,
    pub category_id: Option<i64>,
    pub include_income: bool,
    pub include_transfers: bool,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

/// User-supplied budget fields, shared by create and update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetDraft {
    pub name: String,
    pub description: Option<String>,
    pub amount: Decimal,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    pub account_id: Option<i64>,
    pub category_id: Option<i64>,
    #[serde(default)]
    pub include_income: bool,
    #[serde(default)]
    pub include_transfers: bool,
}

impl BudgetDraft {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push("Budget name is required".to_string());
        }
        if self.name.len() > 255 {
            errors.push("Budget name must be less than 255 characters".to_string());
        }
        if self.amount <= Decimal::ZERO {
            errors.push("Budget amount must be positive".to_string());
        }
        if self.end_date <= self.start_date {
            errors.push("End date must be after start date".to_string());
        }

        errors
    }
}

/// Posting filter derived from a budget. Not persisted; selects the rows
/// whose amounts are summed into `spent`.
#[derive(Debug, Clone)]
pub struct BudgetCriteria {
    pub user_id: i64,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    pub account_id: Option<i64>,
    pub category_id: Option<i64>,
    pub include_income: bool,
    pub include_transfers: bool,
}

impl BudgetCriteria {
    pub fn for_budget(budget: &Budget) -> Self {
        Self {
            user_id: budget.user_id,
            start_date: budget.start_date,
            end_date: budget.end_date,
            account_id: budget.account_id,
            category_id: budget.category_id,
            include_income: budget.include_income,
            include_transfers: budget.include_transfers,
        }
    }
}
