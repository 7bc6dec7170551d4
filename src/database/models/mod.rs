pub mod account;
pub mod budget;
pub mod category;
pub mod scheduled_transaction;
pub mod transaction;

pub use account::Account;
pub use budget::{Budget, BudgetCriteria, BudgetDraft};
pub use category::Category;
pub use scheduled_transaction::{ScheduleDraft, ScheduleType, ScheduledTransaction};
pub use transaction::{NewTransaction, Transaction, TransactionKind};
