//! UTC payment calendar.
//!
//! Centralizes every piece of month arithmetic in the planner:
//! - `YYYY-MM` month labels computed from UTC epoch milliseconds.
//! - Epoch-day conversions for date-only fields (deadlines, start dates).
//! - Payment anchors: the day-of-month all scheduled payments align to,
//!   clamped to the length of the month.
//!
//! Everything here is pure arithmetic on a UTC calendar; the device timezone
//! never participates.

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};

use crate::utils::error::*;

/// Days from 0001-01-01 (CE) to 1970-01-01
const EPOCH_CE_DAYS: i64 = 719_163;

/// Converts an epoch-day into a calendar date
pub fn day_to_date(day: i64) -> PlannerResult<NaiveDate> {
    let ce_days = day
        .checked_add(EPOCH_CE_DAYS)
        .ok_or_else(|| validation_err("Epoch-day out of range."))?;
    let ce_days = i32::try_from(ce_days).map_err(|_| validation_err("Epoch-day out of range."))?;
    NaiveDate::from_num_days_from_ce_opt(ce_days)
        .ok_or_else(|| validation_err("Epoch-day out of range."))
}

/// Converts a calendar date into an epoch-day
pub fn date_to_day(date: NaiveDate) -> i64 {
    i64::from(date.num_days_from_ce()) - EPOCH_CE_DAYS
}

/// Converts epoch milliseconds into the UTC calendar date they fall on
pub fn ms_to_date(ms: u64) -> PlannerResult<NaiveDate> {
    let seconds = i64::try_from(ms / 1000).map_err(|_| validation_err("Timestamp out of range."))?;
    DateTime::<Utc>::from_timestamp(seconds, 0)
        .map(|datetime| datetime.date_naive())
        .ok_or_else(|| validation_err("Timestamp out of range."))
}

/// `YYYY-MM` label of the UTC month a timestamp falls in
pub fn month_label(ms: u64) -> PlannerResult<String> {
    Ok(ms_to_date(ms)?.format("%Y-%m").to_string())
}

/// `YYYY-MM` label for a calendar date
pub fn month_label_of(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

/// Parses a `YYYY-MM` month label
pub fn parse_month_label(label: &str) -> PlannerResult<(i32, u32)> {
    let (year_part, month_part) = label
        .split_once('-')
        .ok_or_else(|| validation_err("Month labels must be formatted as YYYY-MM."))?;
    let year: i32 = year_part
        .parse()
        .map_err(|_| validation_err("Month labels must be formatted as YYYY-MM."))?;
    let month: u32 = month_part
        .parse()
        .map_err(|_| validation_err("Month labels must be formatted as YYYY-MM."))?;
    if year_part.len() != 4 || month_part.len() != 2 || !(1..=12).contains(&month) {
        return Err(validation_err("Month labels must be formatted as YYYY-MM."));
    }
    Ok((year, month))
}

/// Number of days in a month
fn days_in_month(year: i32, month: u32) -> u32 {
    // the first of the next month minus one day
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

/// Adds whole months to a date, clamping the day to the target month's length
pub fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_add_months(Months::new(months)).unwrap_or(date)
}

fn month_index(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 12 + i64::from(date.month0())
}

/// Payment-day anchored calendar used for all schedule arithmetic
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PaymentCalendar {
    payment_day: u32,
}

impl PaymentCalendar {
    /// Creates a calendar anchored on the given day-of-month, clamped to [1, 28]
    pub fn new(payment_day: u32) -> Self {
        Self {
            payment_day: payment_day.clamp(1, 28),
        }
    }

    /// The anchor day this calendar aligns payments to
    pub fn payment_day(&self) -> u32 {
        self.payment_day
    }

    /// The payment anchor inside the given month
    pub fn anchor_in(&self, year: i32, month: u32) -> NaiveDate {
        let day = self.payment_day.min(days_in_month(year, month));
        // the clamp above keeps the day valid for every month
        NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
    }

    /// First anchor on or after the given date
    pub fn next_anchor_on_or_after(&self, date: NaiveDate) -> NaiveDate {
        let anchor = self.anchor_in(date.year(), date.month());
        if anchor >= date {
            anchor
        } else {
            self.advance(anchor)
        }
    }

    /// First anchor strictly after the given date
    pub fn next_anchor_after(&self, date: NaiveDate) -> NaiveDate {
        let anchor = self.anchor_in(date.year(), date.month());
        if anchor > date {
            anchor
        } else {
            self.advance(anchor)
        }
    }

    /// The anchor one month after the given anchor
    pub fn advance(&self, anchor: NaiveDate) -> NaiveDate {
        let (year, month) = if anchor.month() == 12 {
            (anchor.year() + 1, 1)
        } else {
            (anchor.year(), anchor.month() + 1)
        };
        self.anchor_in(year, month)
    }

    /// Number of anchors `a` with `after < a <= until`
    pub fn anchors_between(&self, after: NaiveDate, until: NaiveDate) -> u32 {
        let first = self.next_anchor_after(after);
        if first > until {
            return 0;
        }
        let last_index = if self.anchor_in(until.year(), until.month()) <= until {
            month_index(until)
        } else {
            month_index(until) - 1
        };
        u32::try_from(last_index - month_index(first) + 1).unwrap_or(0)
    }

    /// Anchors remaining strictly after `now` up to and including the
    /// deadline, floored at one payment
    pub fn months_remaining(&self, now: NaiveDate, deadline: NaiveDate) -> u32 {
        self.anchors_between(now, deadline).max(1)
    }

    /// Anchors in `[payment_date, deadline]`, floored at one payment.
    /// `payment_date` is expected to be an anchor itself.
    pub fn payments_until(&self, payment_date: NaiveDate, deadline: NaiveDate) -> u32 {
        if payment_date > deadline {
            return 1;
        }
        (1 + self.anchors_between(payment_date, deadline)).max(1)
    }
}
