//! Reporting time windows.
//!
//! Every window is half-open `[from, to)` and aligned to UTC midnight.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    #[error("Inconsistent window: from {from} is after to {to}")]
    Inconsistent {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },

    #[error("Invalid month: {year}-{month}")]
    InvalidMonth { year: i32, month: u32 },

    #[error("Unknown predefined range: {0}")]
    UnknownRange(String),
}

/// How a window was derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Day,
    MonthToDate,
    SamePeriodLastMonth,
    Week,
    Month,
    Custom,
}

/// Predefined range names accepted by [`TimeWindow::predefined`].
pub const PREDEFINED_RANGES: [&str; 5] = [
    "today",
    "yesterday",
    "last_week",
    "last_30_days",
    "last_90_days",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    granularity: Granularity,
}

/// UTC midnight at the start of `date`.
pub fn start_of(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.day0()))
}

pub fn days_in_month(date: NaiveDate) -> u32 {
    let first = first_of_month(date);
    // Day 1 plus 31 days always lands inside the following month.
    let next = first_of_month(first + Duration::days(31));
    (next - first).num_days() as u32
}

impl TimeWindow {
    pub fn new(
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        granularity: Granularity,
    ) -> Result<Self, WindowError> {
        if from > to {
            return Err(WindowError::Inconsistent { from, to });
        }
        Ok(Self {
            from,
            to,
            granularity,
        })
    }

    fn whole_days(first: NaiveDate, count: i64, granularity: Granularity) -> Self {
        let from = start_of(first);
        Self {
            from,
            to: from + Duration::days(count),
            granularity,
        }
    }

    pub fn day(date: NaiveDate) -> Self {
        Self::whole_days(date, 1, Granularity::Day)
    }

    /// Seven days starting at `week_start`.
    pub fn week(week_start: NaiveDate) -> Self {
        Self::whole_days(week_start, 7, Granularity::Week)
    }

    pub fn month(year: i32, month: u32) -> Result<Self, WindowError> {
        let first =
            NaiveDate::from_ymd_opt(year, month, 1).ok_or(WindowError::InvalidMonth { year, month })?;
        Ok(Self::whole_days(
            first,
            i64::from(days_in_month(first)),
            Granularity::Month,
        ))
    }

    /// First day of the month through the end of `date`.
    pub fn month_to_date(date: NaiveDate) -> Self {
        let first = first_of_month(date);
        Self::whole_days(first, i64::from(date.day()), Granularity::MonthToDate)
    }

    /// The matching span of the previous month. The day-of-month is clamped
    /// to that month's length, so March 31 compares against February 28/29.
    pub fn same_period_last_month(date: NaiveDate) -> Self {
        let prev_first = first_of_month(first_of_month(date) - Duration::days(1));
        let span = date.day().min(days_in_month(prev_first));
        Self::whole_days(prev_first, i64::from(span), Granularity::SamePeriodLastMonth)
    }

    /// Inclusive day range.
    pub fn days_between(first: NaiveDate, last: NaiveDate) -> Result<Self, WindowError> {
        let from = start_of(first);
        let to = start_of(last) + Duration::days(1);
        if first > last {
            return Err(WindowError::Inconsistent {
                from,
                to: start_of(last),
            });
        }
        Ok(Self {
            from,
            to,
            granularity: Granularity::Custom,
        })
    }

    /// Resolve a named range relative to `today`. Ranges other than `today`
    /// end with yesterday.
    pub fn predefined(name: &str, today: NaiveDate) -> Result<Self, WindowError> {
        let yesterday = today - Duration::days(1);
        match name {
            "today" => Ok(Self::day(today)),
            "yesterday" => Ok(Self::day(yesterday)),
            "last_week" => Self::days_between(today - Duration::days(7), yesterday),
            "last_30_days" => Self::days_between(today - Duration::days(30), yesterday),
            "last_90_days" => Self::days_between(today - Duration::days(90), yesterday),
            other => Err(WindowError::UnknownRange(other.to_string())),
        }
    }

    pub fn from(&self) -> DateTime<Utc> {
        self.from
    }

    pub fn to(&self) -> DateTime<Utc> {
        self.to
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn is_empty(&self) -> bool {
        self.from == self.to
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.from && ts < self.to
    }

    pub fn first_day(&self) -> NaiveDate {
        self.from.date_naive()
    }

    /// Last calendar day touched by the window.
    pub fn last_day(&self) -> NaiveDate {
        if self.is_empty() {
            return self.first_day();
        }
        (self.to - Duration::milliseconds(1)).date_naive()
    }

    /// Every calendar day the window touches, in order.
    pub fn days(&self) -> Vec<NaiveDate> {
        if self.is_empty() {
            return Vec::new();
        }
        let last = self.last_day();
        self.first_day()
            .iter_days()
            .take_while(|d| *d <= last)
            .collect()
    }

    pub fn day_count(&self) -> u32 {
        self.days().len() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_day_window_is_half_open() {
        let w = TimeWindow::day(date(2025, 3, 10));
        assert!(w.contains(start_of(date(2025, 3, 10))));
        assert!(!w.contains(start_of(date(2025, 3, 11))));
        assert_eq!(w.days(), vec![date(2025, 3, 10)]);
        assert_eq!(w.granularity(), Granularity::Day);
    }

    #[test]
    fn test_inconsistent_window_rejected() {
        let from = start_of(date(2025, 3, 11));
        let to = start_of(date(2025, 3, 10));
        assert!(matches!(
            TimeWindow::new(from, to, Granularity::Custom),
            Err(WindowError::Inconsistent { .. })
        ));
        assert!(TimeWindow::days_between(date(2025, 3, 11), date(2025, 3, 10)).is_err());
    }

    #[test]
    fn test_week_covers_seven_days() {
        let w = TimeWindow::week(date(2025, 3, 3));
        let days = w.days();
        assert_eq!(days.len(), 7);
        assert_eq!(days[6], date(2025, 3, 9));
    }

    #[test]
    fn test_month_lengths() {
        assert_eq!(days_in_month(date(2024, 2, 10)), 29);
        assert_eq!(days_in_month(date(2025, 2, 1)), 28);
        assert_eq!(days_in_month(date(2025, 12, 31)), 31);
        assert_eq!(TimeWindow::month(2025, 4).unwrap().day_count(), 30);
        assert!(matches!(
            TimeWindow::month(2025, 13),
            Err(WindowError::InvalidMonth { .. })
        ));
    }

    #[test]
    fn test_month_to_date() {
        let w = TimeWindow::month_to_date(date(2025, 3, 10));
        assert_eq!(w.first_day(), date(2025, 3, 1));
        assert_eq!(w.last_day(), date(2025, 3, 10));
    }

    #[test]
    fn test_same_period_last_month_clamps() {
        let w = TimeWindow::same_period_last_month(date(2025, 3, 31));
        assert_eq!(w.first_day(), date(2025, 2, 1));
        assert_eq!(w.last_day(), date(2025, 2, 28));

        let w = TimeWindow::same_period_last_month(date(2025, 1, 15));
        assert_eq!(w.first_day(), date(2024, 12, 1));
        assert_eq!(w.last_day(), date(2024, 12, 15));
    }

    #[test]
    fn test_predefined_ranges() {
        let today = date(2025, 3, 10);
        assert_eq!(
            TimeWindow::predefined("yesterday", today).unwrap().first_day(),
            date(2025, 3, 9)
        );
        let week = TimeWindow::predefined("last_week", today).unwrap();
        assert_eq!(week.first_day(), date(2025, 3, 3));
        assert_eq!(week.last_day(), date(2025, 3, 9));
        assert_eq!(
            TimeWindow::predefined("last_30_days", today).unwrap().day_count(),
            30
        );
        for name in PREDEFINED_RANGES {
            assert!(TimeWindow::predefined(name, today).is_ok());
        }
        assert!(matches!(
            TimeWindow::predefined("last_year", today),
            Err(WindowError::UnknownRange(_))
        ));
    }
}
