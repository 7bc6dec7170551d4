//! Pure date arithmetic for advancing a schedule's due date.

use chrono::{Duration, Months, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Yearly => "yearly",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            "quarterly" => Some(Self::Quarterly),
            "yearly" => Some(Self::Yearly),
            _ => None,
        }
    }
}

/// Returns the due date one period after `current`.
///
/// Month-based increments clamp to the last day of the target month when the
/// source day does not exist there (Jan 31 + 1 month = Feb 28, or Feb 29 in
/// leap years). The same rule applies to quarterly and yearly steps.
pub fn next_due_date(current: NaiveDateTime, frequency: Frequency) -> NaiveDateTime {
    match frequency {
        Frequency::Daily => current + Duration::days(1),
        Frequency::Weekly => current + Duration::days(7),
        Frequency::Monthly => current + Months::new(1),
        Frequency::Quarterly => current + Months::new(3),
        Frequency::Yearly => current + Months::new(12),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    #[test]
    fn daily_adds_one_day() {
        assert_eq!(next_due_date(dt(2025, 3, 14), Frequency::Daily), dt(2025, 3, 15));
    }

    #[test]
    fn daily_crosses_month_boundary() {
        assert_eq!(next_due_date(dt(2025, 1, 31), Frequency::Daily), dt(2025, 2, 1));
    }

    #[test]
    fn weekly_adds_seven_days() {
        assert_eq!(next_due_date(dt(2025, 3, 28), Frequency::Weekly), dt(2025, 4, 4));
    }

    #[test]
    fn monthly_plain_step() {
        assert_eq!(next_due_date(dt(2025, 3, 14), Frequency::Monthly), dt(2025, 4, 14));
    }

    #[test]
    fn monthly_clamps_jan_31_to_feb_28() {
        assert_eq!(next_due_date(dt(2025, 1, 31), Frequency::Monthly), dt(2025, 2, 28));
    }

    #[test]
    fn monthly_clamps_to_feb_29_in_leap_year() {
        assert_eq!(next_due_date(dt(2024, 1, 31), Frequency::Monthly), dt(2024, 2, 29));
    }

    #[test]
    fn quarterly_clamps_jan_31_to_apr_30() {
        assert_eq!(next_due_date(dt(2025, 1, 31), Frequency::Quarterly), dt(2025, 4, 30));
    }

    #[test]
    fn quarterly_keeps_day_when_it_fits() {
        assert_eq!(next_due_date(dt(2025, 5, 31), Frequency::Quarterly), dt(2025, 8, 31));
    }

    #[test]
    fn yearly_clamps_leap_day() {
        assert_eq!(next_due_date(dt(2024, 2, 29), Frequency::Yearly), dt(2025, 2, 28));
    }

    #[test]
    fn preserves_time_of_day() {
        let next = next_due_date(dt(2025, 6, 10), Frequency::Monthly);
        assert_eq!(next.time(), dt(2025, 6, 10).time());
    }
}
