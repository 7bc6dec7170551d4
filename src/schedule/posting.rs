//! Builds concrete ledger postings from schedule definitions.

use crate::database::models::{NewTransaction, ScheduledTransaction};

/// Copies the schedule's posting template into a new transaction and links it
/// back to the schedule. The posting is dated at the schedule's due date, not
/// at processing time, so a delayed sweep still books the row where the user
/// expects it.
pub fn materialize(schedule: &ScheduledTransaction) -> NewTransaction {
    NewTransaction {
        user_id: schedule.user_id,
        account_id: schedule.account_id,
        description: schedule.description.clone(),
        amount: schedule.amount,
        kind: schedule.kind,
        category_id: schedule.category_id,
        transfer_account_id: schedule.transfer_account_id,
        transaction_date: schedule.next_due_date,
        scheduled_id: Some(schedule.scheduled_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{ScheduleType, TransactionKind};
    use crate::schedule::recurrence::Frequency;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    #[test]
    fn copies_template_and_links_schedule() {
        let due = NaiveDate::from_ymd_opt(2025, 4, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let schedule = ScheduledTransaction {
            scheduled_id: 42,
            user_id: 7,
            account_id: 3,
            description: "Rent".to_string(),
            amount: Decimal::new(1500, 0),
            kind: TransactionKind::Expense,
            category_id: Some(9),
            transfer_account_id: None,
            schedule_type: ScheduleType::Recurring,
            frequency: Some(Frequency::Monthly),
            num_installments: None,
            remaining_installments: None,
            next_due_date: due,
            end_date: None,
            last_executed: None,
            is_active: true,
            created_at: due,
        };

        let posting = materialize(&schedule);
        assert_eq!(posting.user_id, 7);
        assert_eq!(posting.account_id, 3);
        assert_eq!(posting.amount, Decimal::new(1500, 0));
        assert_eq!(posting.kind, TransactionKind::Expense);
        assert_eq!(posting.category_id, Some(9));
        assert_eq!(posting.transaction_date, due);
        assert_eq!(posting.scheduled_id, Some(42));
    }
}
