use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::database::models::TransactionKind;
use crate::schedule::recurrence::Frequency;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleType {
    Once,
    Recurring,
    Installment,
}

impl ScheduleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Once => "once",
            Self::Recurring => "recurring",
            Self::Installment => "installment",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "once" => Some(Self::Once),
            "recurring" => Some(Self::Recurring),
            "installment" => Some(Self::Installment),
            _ => None,
        }
    }
}

/// A schedule row. Never deleted by the sweep; retirement flips `is_active`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledTransaction {
    pub scheduled_id: i64,
    pub user_id: i64,
    pub account_id: i64,
    pub description: String,
    pub amount: Decimal,
    pub kind: TransactionKind,
    pub category_id: Option<i64>,
    pub transfer_account_id: Option<i64>,
    pub schedule_type: ScheduleType,
    pub frequency: Option<Frequency>,
    pub num_installments: Option<i64>,
    /// Counts down once per successful sweep of an installment schedule.
    pub remaining_installments: Option<i64>,
    pub next_due_date: NaiveDateTime,
    pub end_date: Option<NaiveDateTime>,
    pub last_executed: Option<NaiveDateTime>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

/// User-supplied schedule fields, shared by create and update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleDraft {
    pub account_id: i64,
    pub description: String,
    pub amount: Decimal,
    pub kind: TransactionKind,
    pub category_id: Option<i64>,
    pub transfer_account_id: Option<i64>,
    pub schedule_type: ScheduleType,
    pub frequency: Option<Frequency>,
    pub num_installments: Option<i64>,
    pub next_due_date: NaiveDateTime,
    pub end_date: Option<NaiveDateTime>,
}

impl ScheduleDraft {
    /// Checks every invariant and returns the full list of violations.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.description.trim().is_empty() {
            errors.push("Description is required".to_string());
        }
        if self.description.len() > 500 {
            errors.push("Description must be less than 500 characters".to_string());
        }
        if self.amount <= Decimal::ZERO {
            errors.push("Amount must be positive".to_string());
        }

        match self.kind {
            TransactionKind::Transfer => match self.transfer_account_id {
                None => errors.push(
                    "Transfer account is required for transfer transactions".to_string(),
                ),
                Some(target) if target == self.account_id => errors
                    .push("Transfer account must differ from source account".to_string()),
                Some(_) => {}
            },
            _ => {
                if self.transfer_account_id.is_some() {
                    errors.push(
                        "Transfer account is only valid for transfer transactions".to_string(),
                    );
                }
            }
        }

        match self.schedule_type {
            ScheduleType::Once => {
                if self.frequency.is_some() {
                    errors.push("One-time schedules must not have a frequency".to_string());
                }
            }
            ScheduleType::Recurring | ScheduleType::Installment => {
                if self.frequency.is_none() {
                    errors.push(
                        "Frequency is required for recurring and installment schedules"
                            .to_string(),
                    );
                }
            }
        }

        match self.schedule_type {
            ScheduleType::Installment => match self.num_installments {
                Some(n) if n > 0 => {}
                _ => errors.push(
                    "Number of installments is required for installment schedules".to_string(),
                ),
            },
            _ => {
                if self.num_installments.is_some() {
                    errors.push(
                        "Number of installments is only valid for installment schedules"
                            .to_string(),
                    );
                }
            }
        }

        if let Some(end) = self.end_date {
            if self.schedule_type != ScheduleType::Recurring {
                errors.push("End date is only valid for recurring schedules".to_string());
            } else if end < self.next_due_date {
                errors.push("End date must not be before the next due date".to_string());
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn base_draft() -> ScheduleDraft {
        ScheduleDraft {
            account_id: 1,
            description: "Rent".to_string(),
            amount: Decimal::new(1200, 0),
            kind: TransactionKind::Expense,
            category_id: None,
            transfer_account_id: None,
            schedule_type: ScheduleType::Recurring,
            frequency: Some(Frequency::Monthly),
            num_installments: None,
            next_due_date: NaiveDate::from_ymd_opt(2025, 3, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            end_date: None,
        }
    }

    #[test]
    fn valid_recurring_draft_passes() {
        assert!(base_draft().validate().is_empty());
    }

    #[test]
    fn collects_multiple_violations() {
        let mut draft = base_draft();
        draft.description = "".to_string();
        draft.amount = Decimal::ZERO;
        let errors = draft.validate();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn transfer_requires_target_account() {
        let mut draft = base_draft();
        draft.kind = TransactionKind::Transfer;
        assert!(draft
            .validate()
            .iter()
            .any(|e| e.contains("Transfer account is required")));
    }

    #[test]
    fn transfer_to_self_rejected() {
        let mut draft = base_draft();
        draft.kind = TransactionKind::Transfer;
        draft.transfer_account_id = Some(draft.account_id);
        assert!(draft
            .validate()
            .iter()
            .any(|e| e.contains("must differ from source")));
    }

    #[test]
    fn transfer_target_forbidden_for_expense() {
        let mut draft = base_draft();
        draft.transfer_account_id = Some(2);
        assert!(!draft.validate().is_empty());
    }

    #[test]
    fn once_must_not_carry_frequency() {
        let mut draft = base_draft();
        draft.schedule_type = ScheduleType::Once;
        assert!(draft
            .validate()
            .iter()
            .any(|e| e.contains("must not have a frequency")));
    }

    #[test]
    fn recurring_requires_frequency() {
        let mut draft = base_draft();
        draft.frequency = None;
        assert!(draft
            .validate()
            .iter()
            .any(|e| e.contains("Frequency is required")));
    }

    #[test]
    fn installment_requires_positive_count() {
        let mut draft = base_draft();
        draft.schedule_type = ScheduleType::Installment;
        draft.num_installments = Some(0);
        assert!(draft
            .validate()
            .iter()
            .any(|e| e.contains("Number of installments is required")));
    }

    #[test]
    fn installment_count_forbidden_elsewhere() {
        let mut draft = base_draft();
        draft.num_installments = Some(3);
        assert!(!draft.validate().is_empty());
    }

    #[test]
    fn end_date_before_due_date_rejected() {
        let mut draft = base_draft();
        draft.end_date = Some(
            NaiveDate::from_ymd_opt(2025, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        );
        assert!(draft
            .validate()
            .iter()
            .any(|e| e.contains("End date must not be before")));
    }

    #[test]
    fn end_date_only_for_recurring() {
        let mut draft = base_draft();
        draft.schedule_type = ScheduleType::Once;
        draft.frequency = None;
        draft.end_date = Some(draft.next_due_date);
        assert!(draft
            .validate()
            .iter()
            .any(|e| e.contains("only valid for recurring")));
    }
}
