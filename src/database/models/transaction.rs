use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
    Transfer,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
            Self::Transfer => "transfer",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "income" => Some(Self::Income),
            "expense" => Some(Self::Expense),
            "transfer" => Some(Self::Transfer),
            _ => None,
        }
    }
}

/// A materialized ledger posting. Immutable once inserted; the store exposes
/// no update or delete for this table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: i64,
    pub user_id: i64,
    pub account_id: i64,
    pub description: String,
    pub amount: Decimal,
    pub kind: TransactionKind,
    pub category_id: Option<i64>,
    pub transfer_account_id: Option<i64>,
    pub transaction_date: NaiveDateTime,
    /// Link back to the originating schedule; None for user-entered rows.
    pub scheduled_id: Option<i64>,
    pub created_at: NaiveDateTime,
}

/// A posting about to be inserted. The store assigns id and created_at.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransaction {
    pub user_id: i64,
    pub account_id: i64,
    pub description: String,
    pub amount: Decimal,
    pub kind: TransactionKind,
    pub category_id: Option<i64>,
    pub transfer_account_id: Option<i64>,
    pub transaction_date: NaiveDateTime,
    pub scheduled_id: Option<i64>,
}
