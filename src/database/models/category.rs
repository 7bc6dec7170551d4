use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub category_id: i64,
    pub user_id: i64,
    pub category_name: String,
    pub category_type: String, // "Income" or "Expense"
}
