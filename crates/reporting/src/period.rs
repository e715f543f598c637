//! Named report periods resolved against a reference date.

use core::str::FromStr;

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tourdesk_core::DateRange;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PeriodError {
    #[error("custom period starts after it ends ({start} > {end})")]
    InvertedRange { start: NaiveDate, end: NaiveDate },

    #[error("unknown report period: {0}")]
    Unknown(String),

    #[error("report period falls outside the supported calendar")]
    OutOfRange,
}

/// A calendar interval relative to "today". Weeks are ISO weeks (Monday to
/// Sunday); every resolved range is inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportPeriod {
    Today,
    Yesterday,
    ThisWeek,
    LastWeek,
    #[serde(rename = "LAST_7_DAYS")]
    Last7Days,
    #[serde(rename = "LAST_30_DAYS")]
    Last30Days,
    ThisMonth,
    LastMonth,
    ThisQuarter,
    LastQuarter,
    ThisYear,
    LastYear,
    Custom { start: NaiveDate, end: NaiveDate },
}

impl ReportPeriod {
    /// Every period that needs no extra input.
    pub const NAMED: [ReportPeriod; 12] = [
        ReportPeriod::Today,
        ReportPeriod::Yesterday,
        ReportPeriod::ThisWeek,
        ReportPeriod::LastWeek,
        ReportPeriod::Last7Days,
        ReportPeriod::Last30Days,
        ReportPeriod::ThisMonth,
        ReportPeriod::LastMonth,
        ReportPeriod::ThisQuarter,
        ReportPeriod::LastQuarter,
        ReportPeriod::ThisYear,
        ReportPeriod::LastYear,
    ];

    pub fn custom(start: NaiveDate, end: NaiveDate) -> Result<Self, PeriodError> {
        if start > end {
            return Err(PeriodError::InvertedRange { start, end });
        }
        Ok(Self::Custom { start, end })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportPeriod::Today => "TODAY",
            ReportPeriod::Yesterday => "YESTERDAY",
            ReportPeriod::ThisWeek => "THIS_WEEK",
            ReportPeriod::LastWeek => "LAST_WEEK",
            ReportPeriod::Last7Days => "LAST_7_DAYS",
            ReportPeriod::Last30Days => "LAST_30_DAYS",
            ReportPeriod::ThisMonth => "THIS_MONTH",
            ReportPeriod::LastMonth => "LAST_MONTH",
            ReportPeriod::ThisQuarter => "THIS_QUARTER",
            ReportPeriod::LastQuarter => "LAST_QUARTER",
            ReportPeriod::ThisYear => "THIS_YEAR",
            ReportPeriod::LastYear => "LAST_YEAR",
            ReportPeriod::Custom { .. } => "CUSTOM",
        }
    }

    /// Resolve to an inclusive date range as seen on `today`.
    pub fn resolve(&self, today: NaiveDate) -> Result<DateRange, PeriodError> {
        match *self {
            ReportPeriod::Today => Ok(DateRange::single_day(today)),
            ReportPeriod::Yesterday => days_before(today, 1).map(DateRange::single_day),
            ReportPeriod::ThisWeek => week_of(today),
            ReportPeriod::LastWeek => week_of(days_before(today, 7)?),
            ReportPeriod::Last7Days => range(days_before(today, 6)?, today),
            ReportPeriod::Last30Days => range(days_before(today, 29)?, today),
            ReportPeriod::ThisMonth => months_from(first_of_month(today), 1),
            ReportPeriod::LastMonth => {
                months_from(first_of_month(days_before(first_of_month(today), 1)?), 1)
            }
            ReportPeriod::ThisQuarter => months_from(first_of_quarter(today)?, 3),
            ReportPeriod::LastQuarter => {
                let previous = days_before(first_of_quarter(today)?, 1)?;
                months_from(first_of_quarter(previous)?, 3)
            }
            ReportPeriod::ThisYear => year_of(today.year()),
            ReportPeriod::LastYear => year_of(today.year() - 1),
            ReportPeriod::Custom { start, end } => range(start, end),
        }
    }
}

fn range(start: NaiveDate, end: NaiveDate) -> Result<DateRange, PeriodError> {
    DateRange::new(start, end).map_err(|_| PeriodError::InvertedRange { start, end })
}

fn days_before(date: NaiveDate, days: u64) -> Result<NaiveDate, PeriodError> {
    date.checked_sub_days(Days::new(days))
        .ok_or(PeriodError::OutOfRange)
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.day0()))
}

fn first_of_quarter(date: NaiveDate) -> Result<NaiveDate, PeriodError> {
    first_of_month(date)
        .checked_sub_months(Months::new(date.month0() % 3))
        .ok_or(PeriodError::OutOfRange)
}

/// `[first, first + months)` as an inclusive range.
fn months_from(first: NaiveDate, months: u32) -> Result<DateRange, PeriodError> {
    let next = first
        .checked_add_months(Months::new(months))
        .ok_or(PeriodError::OutOfRange)?;
    range(first, days_before(next, 1)?)
}

fn week_of(date: NaiveDate) -> Result<DateRange, PeriodError> {
    let monday = days_before(date, u64::from(date.weekday().num_days_from_monday()))?;
    let sunday = monday
        .checked_add_days(Days::new(6))
        .ok_or(PeriodError::OutOfRange)?;
    range(monday, sunday)
}

fn year_of(year: i32) -> Result<DateRange, PeriodError> {
    let start = NaiveDate::from_ymd_opt(year, 1, 1).ok_or(PeriodError::OutOfRange)?;
    let end = NaiveDate::from_ymd_opt(year, 12, 31).ok_or(PeriodError::OutOfRange)?;
    range(start, end)
}

impl core::fmt::Display for ReportPeriod {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ReportPeriod::Custom { start, end } => write!(f, "CUSTOM({start}..={end})"),
            named => f.write_str(named.as_str()),
        }
    }
}

/// Parses the named periods only; custom ranges are built with
/// [`ReportPeriod::custom`].
impl FromStr for ReportPeriod {
    type Err = PeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::NAMED
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| PeriodError::Unknown(s.to_string()))
    }
}
