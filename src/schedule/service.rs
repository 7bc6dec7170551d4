//! Schedule lifecycle: CRUD, lookahead queries, and the periodic sweep that
//! turns due schedules into ledger postings.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::database::models::{ScheduleDraft, ScheduleType, ScheduledTransaction, TransactionKind};
use crate::database::store::{LedgerStore, SchedulePatch};
use crate::error::{LedgerError, LedgerResult};
use crate::schedule::recurrence::next_due_date;
use crate::schedule::{posting, DueScheduleScanner};

/// What one sweep step does to a schedule after its posting is booked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepTransition {
    /// Deactivate the schedule. For installments the exhausted counter is
    /// persisted as zero; the due date is left where it was.
    Retire { remaining_installments: Option<i64> },
    /// Move the due date forward, decrementing the installment counter when
    /// one exists.
    Advance {
        next_due_date: NaiveDateTime,
        remaining_installments: Option<i64>,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepFailure {
    pub scheduled_id: i64,
    pub error: String,
}

/// Outcome of one sweep. Per-item failures are recorded here rather than
/// raised; only a scanner-level failure aborts the call.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
    pub processed: Vec<i64>,
    pub failures: Vec<SweepFailure>,
}

impl SweepReport {
    pub fn processed_count(&self) -> usize {
        self.processed.len()
    }
}

/// An active schedule annotated for the lookahead view.
#[derive(Debug, Clone, Serialize)]
pub struct UpcomingSchedule {
    pub scheduled_id: i64,
    pub description: String,
    pub amount: Decimal,
    pub kind: TransactionKind,
    pub due_date: NaiveDateTime,
    pub account_name: String,
    pub days_until_due: i64,
}

/// Computes the post-sweep state for a schedule. Pure; the store is only
/// touched by the caller.
pub fn plan_transition(schedule: &ScheduledTransaction) -> LedgerResult<SweepTransition> {
    match schedule.schedule_type {
        ScheduleType::Once => Ok(SweepTransition::Retire {
            remaining_installments: None,
        }),
        ScheduleType::Installment => {
            let remaining = schedule.remaining_installments.ok_or_else(|| {
                LedgerError::Validation(vec![
                    "installment schedule has no remaining installment count".to_string(),
                ])
            })?;
            let left = remaining - 1;
            if left <= 0 {
                Ok(SweepTransition::Retire {
                    remaining_installments: Some(0),
                })
            } else {
                let frequency = schedule.frequency.ok_or_else(|| {
                    LedgerError::Validation(vec![
                        "installment schedule has no frequency".to_string()
                    ])
                })?;
                Ok(SweepTransition::Advance {
                    next_due_date: next_due_date(schedule.next_due_date, frequency),
                    remaining_installments: Some(left),
                })
            }
        }
        ScheduleType::Recurring => {
            let frequency = schedule.frequency.ok_or_else(|| {
                LedgerError::Validation(vec!["recurring schedule has no frequency".to_string()])
            })?;
            let next = next_due_date(schedule.next_due_date, frequency);
            match schedule.end_date {
                Some(end) if next > end => Ok(SweepTransition::Retire {
                    remaining_installments: None,
                }),
                _ => Ok(SweepTransition::Advance {
                    next_due_date: next,
                    remaining_installments: None,
                }),
            }
        }
    }
}

pub struct ScheduleService {
    store: Arc<dyn LedgerStore>,
    scanner: DueScheduleScanner,
    /// Serializes sweep invocations within this process. A late second tick
    /// scans after the first finishes and finds nothing due. Cross-instance
    /// overlap is not guarded here.
    sweep_lock: Mutex<()>,
}

impl ScheduleService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            scanner: DueScheduleScanner::new(store.clone()),
            store,
            sweep_lock: Mutex::new(()),
        }
    }

    pub async fn create(
        &self,
        owner_id: i64,
        draft: &ScheduleDraft,
    ) -> LedgerResult<ScheduledTransaction> {
        let errors = draft.validate();
        if !errors.is_empty() {
            return Err(LedgerError::Validation(errors));
        }

        let remaining = match draft.schedule_type {
            ScheduleType::Installment => draft.num_installments,
            _ => None,
        };
        self.store.insert_schedule(owner_id, draft, remaining).await
    }

    pub async fn get(&self, owner_id: i64, id: i64) -> LedgerResult<ScheduledTransaction> {
        match self.store.find_schedule_by_id(id).await? {
            Some(schedule) if schedule.user_id == owner_id => Ok(schedule),
            _ => Err(LedgerError::NotFound("scheduled transaction")),
        }
    }

    pub async fn list(&self, owner_id: i64) -> LedgerResult<Vec<ScheduledTransaction>> {
        self.store.find_schedules_by_owner(owner_id).await
    }

    pub async fn update(
        &self,
        owner_id: i64,
        id: i64,
        draft: &ScheduleDraft,
    ) -> LedgerResult<ScheduledTransaction> {
        let existing = self.get(owner_id, id).await?;

        let errors = draft.validate();
        if !errors.is_empty() {
            return Err(LedgerError::Validation(errors));
        }

        // The installment countdown restarts from the new total.
        let remaining = match draft.schedule_type {
            ScheduleType::Installment => draft.num_installments,
            _ => None,
        };

        let updated = ScheduledTransaction {
            account_id: draft.account_id,
            description: draft.description.clone(),
            amount: draft.amount,
            kind: draft.kind,
            category_id: draft.category_id,
            transfer_account_id: draft.transfer_account_id,
            schedule_type: draft.schedule_type,
            frequency: draft.frequency,
            num_installments: draft.num_installments,
            remaining_installments: remaining,
            next_due_date: draft.next_due_date,
            end_date: draft.end_date,
            ..existing
        };
        self.store.save_schedule(&updated).await?;
        Ok(updated)
    }

    pub async fn delete(&self, owner_id: i64, id: i64) -> LedgerResult<()> {
        self.get(owner_id, id).await?;
        self.store.delete_schedule(id).await
    }

    pub async fn toggle_active(
        &self,
        owner_id: i64,
        id: i64,
    ) -> LedgerResult<ScheduledTransaction> {
        let mut schedule = self.get(owner_id, id).await?;
        schedule.is_active = !schedule.is_active;
        self.store.save_schedule(&schedule).await?;
        Ok(schedule)
    }

    /// Active schedules due within `[now, now + days_ahead]`, ascending by
    /// due date, annotated with the owning account's name.
    pub async fn get_upcoming(
        &self,
        owner_id: i64,
        days_ahead: i64,
        now: NaiveDateTime,
    ) -> LedgerResult<Vec<UpcomingSchedule>> {
        let horizon = now + Duration::days(days_ahead);

        let account_names: HashMap<i64, String> = self
            .store
            .find_accounts_by_owner(owner_id)
            .await?
            .into_iter()
            .map(|a| (a.account_id, a.account_name))
            .collect();

        let mut upcoming: Vec<UpcomingSchedule> = self
            .store
            .find_schedules_by_owner(owner_id)
            .await?
            .into_iter()
            .filter(|s| s.is_active && s.next_due_date >= now && s.next_due_date <= horizon)
            .map(|s| {
                let seconds = (s.next_due_date - now).num_seconds();
                UpcomingSchedule {
                    scheduled_id: s.scheduled_id,
                    description: s.description,
                    amount: s.amount,
                    kind: s.kind,
                    due_date: s.next_due_date,
                    account_name: account_names
                        .get(&s.account_id)
                        .cloned()
                        .unwrap_or_default(),
                    // Ceiling in whole days: due later today counts as 1.
                    days_until_due: (seconds + 86_399) / 86_400,
                }
            })
            .collect();

        upcoming.sort_by(|a, b| {
            a.due_date
                .cmp(&b.due_date)
                .then(a.scheduled_id.cmp(&b.scheduled_id))
        });
        Ok(upcoming)
    }

    /// The sweep. Processes every due schedule independently: a posting is
    /// booked first, and the schedule state is advanced or retired only if
    /// the posting succeeded. A failing item is logged, reported, and left
    /// untouched so the next sweep retries it; a scanner-level failure
    /// aborts the whole call.
    pub async fn process_due_transactions(
        &self,
        cutoff: NaiveDateTime,
    ) -> LedgerResult<SweepReport> {
        let _guard = self.sweep_lock.lock().await;

        let due = self.scanner.find_due(cutoff).await?;
        let mut report = SweepReport::default();

        for schedule in &due {
            match self.process_one(schedule, cutoff).await {
                Ok(()) => report.processed.push(schedule.scheduled_id),
                Err(e) => {
                    error!(
                        scheduled_id = schedule.scheduled_id,
                        error = %e,
                        "failed to process due schedule, leaving it for the next sweep"
                    );
                    report.failures.push(SweepFailure {
                        scheduled_id: schedule.scheduled_id,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            due = due.len(),
            processed = report.processed.len(),
            failed = report.failures.len(),
            "sweep finished"
        );
        Ok(report)
    }

    async fn process_one(
        &self,
        schedule: &ScheduledTransaction,
        cutoff: NaiveDateTime,
    ) -> LedgerResult<()> {
        let new_posting = posting::materialize(schedule);
        self.store.insert_posting(&new_posting).await?;

        let patch = match plan_transition(schedule)? {
            SweepTransition::Retire {
                remaining_installments,
            } => SchedulePatch {
                is_active: Some(false),
                remaining_installments,
                last_executed: Some(cutoff),
                ..Default::default()
            },
            SweepTransition::Advance {
                next_due_date,
                remaining_installments,
            } => SchedulePatch {
                next_due_date: Some(next_due_date),
                remaining_installments,
                last_executed: Some(cutoff),
                ..Default::default()
            },
        };
        self.store.update_schedule(schedule.scheduled_id, &patch).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::store::MemoryStore;
    use crate::schedule::recurrence::Frequency;
    use chrono::NaiveDate;

    fn dt(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn schedule_row(
        schedule_type: ScheduleType,
        frequency: Option<Frequency>,
        remaining: Option<i64>,
        end_date: Option<NaiveDateTime>,
    ) -> ScheduledTransaction {
        ScheduledTransaction {
            scheduled_id: 1,
            user_id: 1,
            account_id: 1,
            description: "Bill".to_string(),
            amount: Decimal::new(50, 0),
            kind: TransactionKind::Expense,
            category_id: None,
            transfer_account_id: None,
            schedule_type,
            frequency,
            num_installments: remaining,
            remaining_installments: remaining,
            next_due_date: dt(2025, 3, 1),
            end_date,
            last_executed: None,
            is_active: true,
            created_at: dt(2025, 1, 1),
        }
    }

    fn expense_draft(due: NaiveDateTime) -> ScheduleDraft {
        ScheduleDraft {
            account_id: 1,
            description: "Bill".to_string(),
            amount: Decimal::new(50, 0),
            kind: TransactionKind::Expense,
            category_id: None,
            transfer_account_id: None,
            schedule_type: ScheduleType::Recurring,
            frequency: Some(Frequency::Monthly),
            num_installments: None,
            next_due_date: due,
            end_date: None,
        }
    }

    #[test]
    fn once_retires() {
        let schedule = schedule_row(ScheduleType::Once, None, None, None);
        assert_eq!(
            plan_transition(&schedule).unwrap(),
            SweepTransition::Retire {
                remaining_installments: None
            }
        );
    }

    #[test]
    fn installment_counts_down() {
        let schedule = schedule_row(
            ScheduleType::Installment,
            Some(Frequency::Monthly),
            Some(3),
            None,
        );
        assert_eq!(
            plan_transition(&schedule).unwrap(),
            SweepTransition::Advance {
                next_due_date: dt(2025, 4, 1),
                remaining_installments: Some(2),
            }
        );
    }

    #[test]
    fn last_installment_retires_with_zero_counter() {
        let schedule = schedule_row(
            ScheduleType::Installment,
            Some(Frequency::Monthly),
            Some(1),
            None,
        );
        assert_eq!(
            plan_transition(&schedule).unwrap(),
            SweepTransition::Retire {
                remaining_installments: Some(0)
            }
        );
    }

    #[test]
    fn recurring_advances_by_frequency() {
        let schedule = schedule_row(ScheduleType::Recurring, Some(Frequency::Monthly), None, None);
        assert_eq!(
            plan_transition(&schedule).unwrap(),
            SweepTransition::Advance {
                next_due_date: dt(2025, 4, 1),
                remaining_installments: None,
            }
        );
    }

    #[test]
    fn recurring_retires_past_end_date() {
        let schedule = schedule_row(
            ScheduleType::Recurring,
            Some(Frequency::Monthly),
            None,
            Some(dt(2025, 3, 15)),
        );
        assert_eq!(
            plan_transition(&schedule).unwrap(),
            SweepTransition::Retire {
                remaining_installments: None
            }
        );
    }

    #[test]
    fn recurring_without_frequency_is_an_error() {
        let schedule = schedule_row(ScheduleType::Recurring, None, None, None);
        assert!(plan_transition(&schedule).is_err());
    }

    #[tokio::test]
    async fn create_rejects_invalid_draft() {
        let service = ScheduleService::new(Arc::new(MemoryStore::new()));
        let mut draft = expense_draft(dt(2025, 3, 1));
        draft.amount = Decimal::ZERO;

        match service.create(1, &draft).await {
            Err(LedgerError::Validation(errors)) => assert!(!errors.is_empty()),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn create_seeds_installment_countdown() {
        let service = ScheduleService::new(Arc::new(MemoryStore::new()));
        let mut draft = expense_draft(dt(2025, 3, 1));
        draft.schedule_type = ScheduleType::Installment;
        draft.num_installments = Some(12);

        let created = service.create(1, &draft).await.unwrap();
        assert_eq!(created.remaining_installments, Some(12));
        assert!(created.is_active);
    }

    #[tokio::test]
    async fn crud_enforces_ownership() {
        let service = ScheduleService::new(Arc::new(MemoryStore::new()));
        let created = service.create(1, &expense_draft(dt(2025, 3, 1))).await.unwrap();

        let wrong_owner = service.get(2, created.scheduled_id).await;
        assert!(matches!(wrong_owner, Err(LedgerError::NotFound(_))));
        assert!(matches!(
            service.delete(2, created.scheduled_id).await,
            Err(LedgerError::NotFound(_))
        ));
        assert!(matches!(
            service.toggle_active(2, created.scheduled_id).await,
            Err(LedgerError::NotFound(_))
        ));

        // The rightful owner still can.
        service.delete(1, created.scheduled_id).await.unwrap();
    }

    #[tokio::test]
    async fn update_recomputes_installment_countdown() {
        let store = Arc::new(MemoryStore::new());
        let service = ScheduleService::new(store);
        let mut draft = expense_draft(dt(2025, 3, 1));
        draft.schedule_type = ScheduleType::Installment;
        draft.num_installments = Some(3);
        let created = service.create(1, &draft).await.unwrap();

        draft.num_installments = Some(6);
        let updated = service.update(1, created.scheduled_id, &draft).await.unwrap();
        assert_eq!(updated.remaining_installments, Some(6));
    }

    #[tokio::test]
    async fn toggle_active_flips_the_flag() {
        let service = ScheduleService::new(Arc::new(MemoryStore::new()));
        let created = service.create(1, &expense_draft(dt(2025, 3, 1))).await.unwrap();

        let off = service.toggle_active(1, created.scheduled_id).await.unwrap();
        assert!(!off.is_active);
        let on = service.toggle_active(1, created.scheduled_id).await.unwrap();
        assert!(on.is_active);
    }

    #[tokio::test]
    async fn upcoming_is_scoped_sorted_and_annotated() {
        let store = Arc::new(MemoryStore::new());
        let account = store.insert_account(1, "Chequing", "debit").await.unwrap();
        let service = ScheduleService::new(store.clone());

        let now = dt(2025, 3, 1);
        let mut later = expense_draft(dt(2025, 3, 6));
        later.account_id = account.account_id;
        let mut sooner = expense_draft(dt(2025, 3, 3));
        sooner.account_id = account.account_id;
        let later = service.create(1, &later).await.unwrap();
        let sooner = service.create(1, &sooner).await.unwrap();
        // Outside the window, other owner, and inactive: all excluded.
        service.create(1, &expense_draft(dt(2025, 3, 20))).await.unwrap();
        service.create(2, &expense_draft(dt(2025, 3, 4))).await.unwrap();
        let off = service.create(1, &expense_draft(dt(2025, 3, 4))).await.unwrap();
        service.toggle_active(1, off.scheduled_id).await.unwrap();

        let upcoming = service.get_upcoming(1, 7, now).await.unwrap();
        let ids: Vec<_> = upcoming.iter().map(|u| u.scheduled_id).collect();
        assert_eq!(ids, vec![sooner.scheduled_id, later.scheduled_id]);
        assert_eq!(upcoming[0].account_name, "Chequing");
        assert_eq!(upcoming[0].days_until_due, 2);
        assert_eq!(upcoming[1].days_until_due, 5);
    }
}
