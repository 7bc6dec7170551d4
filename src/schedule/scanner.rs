use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::database::models::ScheduledTransaction;
use crate::database::store::LedgerStore;
use crate::error::LedgerResult;

/// Finds the schedules a sweep has to process: active, with a due date at or
/// before the cutoff. Ordering (due date, then id) comes from the store.
pub struct DueScheduleScanner {
    store: Arc<dyn LedgerStore>,
}

impl DueScheduleScanner {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    pub async fn find_due(&self, cutoff: NaiveDateTime) -> LedgerResult<Vec<ScheduledTransaction>> {
        self.store.find_due_schedules(cutoff).await
    }
}
