pub mod service;

pub use service::{AlertStatus, BudgetAlert, BudgetProgress, BudgetService};
