use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub account_id: i64,
    pub user_id: i64,
    pub account_name: String, // account name defined by user (cash/RBC chequing)
    pub account_type: String, // cash/debit/credit/other
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}
