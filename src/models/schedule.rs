// src/models/schedule.rs

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "recurrence", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Recurrence {
    Once,
    Daily,
    Weekly,
    Biweekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl Recurrence {
    pub const ALL: [Recurrence; 7] = [
        Recurrence::Once,
        Recurrence::Daily,
        Recurrence::Weekly,
        Recurrence::Biweekly,
        Recurrence::Monthly,
        Recurrence::Quarterly,
        Recurrence::Yearly,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Recurrence::Once => "once",
            Recurrence::Daily => "daily",
            Recurrence::Weekly => "weekly",
            Recurrence::Biweekly => "biweekly",
            Recurrence::Monthly => "monthly",
            Recurrence::Quarterly => "quarterly",
            Recurrence::Yearly => "yearly",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.as_str() == raw)
    }

    pub fn label(self) -> &'static str {
        match self {
            Recurrence::Once => "One time",
            Recurrence::Daily => "Daily",
            Recurrence::Weekly => "Weekly",
            Recurrence::Biweekly => "Every 2 weeks",
            Recurrence::Monthly => "Monthly",
            Recurrence::Quarterly => "Quarterly",
            Recurrence::Yearly => "Yearly",
        }
    }

    fn step(self) -> Option<Step> {
        match self {
            Recurrence::Once => None,
            Recurrence::Daily => Some(Step::Days(1)),
            Recurrence::Weekly => Some(Step::Days(7)),
            Recurrence::Biweekly => Some(Step::Days(14)),
            Recurrence::Monthly => Some(Step::Months(1)),
            Recurrence::Quarterly => Some(Step::Months(3)),
            Recurrence::Yearly => Some(Step::Months(12)),
        }
    }

    /// First occurrence of the series starting at `anchor` that falls strictly
    /// after `floor`. Each occurrence is computed from the anchor, so month steps
    /// clamp per month (Jan 31 -> Feb 29 -> Mar 31) without drifting.
    /// `Ok(None)` for one-off schedules.
    pub fn next_after(self, anchor: NaiveDate, floor: NaiveDate) -> Result<Option<NaiveDate>, OutOfRange> {
        let Some(step) = self.step() else {
            return Ok(None);
        };
        if floor < anchor {
            return Ok(Some(anchor));
        }

        match step {
            Step::Days(days) => {
                let elapsed = (floor - anchor).num_days() as u64;
                let n = elapsed / days + 1;
                let date = n
                    .checked_mul(days)
                    .and_then(|offset| anchor.checked_add_days(Days::new(offset)))
                    .ok_or(OutOfRange)?;
                Ok(Some(date))
            }
            Step::Months(months) => {
                let elapsed = (floor.year() - anchor.year()) * 12 + floor.month() as i32 - anchor.month() as i32;
                let mut n = u32::try_from(elapsed).map_err(|_| OutOfRange)? / months;
                // the clamped estimate can land on or before the floor; at most two more steps
                loop {
                    let date = n
                        .checked_mul(months)
                        .and_then(|offset| anchor.checked_add_months(Months::new(offset)))
                        .ok_or(OutOfRange)?;
                    if date > floor {
                        return Ok(Some(date));
                    }
                    n += 1;
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Days(u64),
    Months(u32),
}

/// The next occurrence does not fit in the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutOfRange;

/// Display label for a stored recurrence value; unknown values render as-is.
pub fn recurrence_label(raw: &str) -> String {
    Recurrence::parse(raw)
        .map(|r| r.label().to_string())
        .unwrap_or_else(|| raw.to_string())
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledAudit {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub location_id: Uuid,
    pub template_id: Uuid,
    pub inspector_id: Option<Uuid>,
    pub recurrence: Recurrence,
    pub is_active: bool,
    pub next_scheduled_date: NaiveDate,
    /// First date of the series; reset when the next date is edited by hand.
    pub anchor_date: NaiveDate,
    pub last_run_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledAuditRow {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub schedule: ScheduledAudit,
    pub location_name: String,
    pub template_name: String,
    pub inspector_name: Option<String>,
    #[sqlx(skip)]
    pub recurrence_label: String,
}

impl ScheduledAuditRow {
    pub fn with_label(mut self) -> Self {
        self.recurrence_label = recurrence_label(self.schedule.recurrence.as_str());
        self
    }
}

#[derive(Debug, Clone)]
pub struct NewSchedule {
    pub name: String,
    pub location_id: Uuid,
    pub template_id: Uuid,
    pub inspector_id: Option<Uuid>,
    pub recurrence: Recurrence,
    pub next_scheduled_date: NaiveDate,
}

#[derive(Debug, Clone, Default)]
pub struct ScheduleChanges {
    pub name: Option<String>,
    pub inspector_id: Option<Uuid>,
    pub recurrence: Option<Recurrence>,
    pub next_scheduled_date: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn next(r: Recurrence, anchor: NaiveDate, floor: NaiveDate) -> Option<NaiveDate> {
        r.next_after(anchor, floor).unwrap()
    }

    #[test]
    fn advances_by_fixed_day_steps() {
        assert_eq!(next(Recurrence::Daily, date(2024, 12, 31), date(2024, 12, 31)), Some(date(2025, 1, 1)));
        assert_eq!(next(Recurrence::Weekly, date(2024, 3, 1), date(2024, 3, 1)), Some(date(2024, 3, 8)));
        assert_eq!(next(Recurrence::Biweekly, date(2024, 3, 1), date(2024, 3, 1)), Some(date(2024, 3, 15)));
        assert_eq!(next(Recurrence::Weekly, date(2024, 3, 1), date(2024, 3, 8)), Some(date(2024, 3, 15)));
    }

    #[test]
    fn month_steps_clamp_to_month_end() {
        assert_eq!(next(Recurrence::Monthly, date(2024, 1, 31), date(2024, 1, 31)), Some(date(2024, 2, 29)));
        assert_eq!(next(Recurrence::Monthly, date(2023, 1, 31), date(2023, 1, 31)), Some(date(2023, 2, 28)));
        assert_eq!(next(Recurrence::Quarterly, date(2024, 11, 30), date(2024, 11, 30)), Some(date(2025, 2, 28)));
        assert_eq!(next(Recurrence::Yearly, date(2024, 2, 29), date(2024, 2, 29)), Some(date(2025, 2, 28)));
    }

    #[test]
    fn month_steps_keep_the_anchor_day() {
        let anchor = date(2024, 1, 31);
        assert_eq!(next(Recurrence::Monthly, anchor, date(2024, 2, 29)), Some(date(2024, 3, 31)));
        assert_eq!(next(Recurrence::Monthly, anchor, date(2024, 3, 31)), Some(date(2024, 4, 30)));
        assert_eq!(next(Recurrence::Monthly, anchor, date(2024, 4, 30)), Some(date(2024, 5, 31)));
        assert_eq!(next(Recurrence::Yearly, date(2024, 2, 29), date(2025, 2, 28)), Some(date(2026, 2, 28)));
        assert_eq!(next(Recurrence::Yearly, date(2024, 2, 29), date(2027, 3, 1)), Some(date(2028, 2, 29)));
    }

    #[test]
    fn floors_before_the_anchor_yield_the_anchor() {
        assert_eq!(next(Recurrence::Weekly, date(2024, 5, 6), date(2024, 5, 1)), Some(date(2024, 5, 6)));
    }

    #[test]
    fn once_never_advances() {
        assert_eq!(next(Recurrence::Once, date(2024, 1, 1), date(2024, 1, 1)), None);
    }

    #[test]
    fn far_floors_are_reported_not_wrapped() {
        let anchor = date(2024, 5, 6);
        let last = NaiveDate::MAX;
        assert_eq!(Recurrence::Daily.next_after(anchor, last), Err(OutOfRange));
        assert_eq!(Recurrence::Monthly.next_after(anchor, last), Err(OutOfRange));
    }

    #[test]
    fn labels_fall_back_to_raw_value() {
        assert_eq!(recurrence_label("biweekly"), "Every 2 weeks");
        assert_eq!(recurrence_label("fortnightly"), "fortnightly");
        for r in Recurrence::ALL {
            assert_eq!(Recurrence::parse(r.as_str()), Some(r));
        }
    }
}
