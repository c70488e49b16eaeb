//! Scheduled maintenance.
//!
//! A daily timer drives the month-boundary automation and keeps the journal
//! bounded:
//! - auto-start an execution record on the first day of the month;
//! - auto-close the active record on the month's last day;
//! - prune the journal down to its retention limit.

use std::time::Duration;

use chrono::Datelike;
use ic_exports::{ic_cdk::spawn, ic_cdk_timers::set_timer_interval};

use crate::allocation::conversion_pairs;
use crate::calendar::{month_label, ms_to_date};
use crate::constants::MAX_JOURNAL_COLLECTIONS;
use crate::execution::record::{active_record, close_execution, record_for_month, start_execution};
use crate::journal::{JournalCollection, LogType};
use crate::model::ExecutionStatus;
use crate::rates::{warm_pairs, CachedRates};
use crate::state::{settings_snapshot, JOURNAL};
use crate::utils::common::now_ms;

/// Arms the daily maintenance timer.
pub fn start_timers() {
    set_timer_interval(Duration::from_secs(86_400), || {
        spawn(daily_maintenance());
    });
}

/// One maintenance pass. Public so the canister can trigger it on demand.
pub async fn daily_maintenance() {
    // conversions must be warm before the non-suspending automation runs
    warm_pairs(conversion_pairs()).await;

    let mut journal = JournalCollection::open(None);
    let now = now_ms();
    let settings = settings_snapshot();

    let today = match ms_to_date(now) {
        Ok(date) => date,
        Err(err) => {
            journal.append_note(Err(err), LogType::Maintenance, "Clock read failed.");
            return;
        }
    };
    let month = match month_label(now) {
        Ok(label) => label,
        Err(err) => {
            journal.append_note(Err(err), LogType::Maintenance, "Clock read failed.");
            return;
        }
    };

    if settings.auto_start_enabled && today.day() == 1 && record_for_month(&month).is_none() {
        let result = start_execution(&month, &CachedRates, now).map(|_| ());
        journal.append_note(
            result,
            LogType::Maintenance,
            format!("Auto-started tracking for {}.", month),
        );
    }

    if settings.auto_complete_enabled && is_last_day_of_month(today) {
        if let Some(record) = active_record() {
            if record.month == month && record.status == ExecutionStatus::Executing {
                let result = close_execution(record.id, now).map(|_| ());
                journal.append_note(
                    result,
                    LogType::Maintenance,
                    format!("Auto-closed tracking for {}.", month),
                );
            }
        }
    }

    journal_cleanup();
    journal.append_note(
        Ok(()),
        LogType::Maintenance,
        "Trimmed the journal to its retention limit.",
    );
}

fn is_last_day_of_month(date: chrono::NaiveDate) -> bool {
    date.succ_opt().map(|next| next.month() != date.month()).unwrap_or(false)
}

/// Keeps only the newest journal collections, shifting survivors down and
/// popping the excess.
pub fn journal_cleanup() {
    JOURNAL.with_borrow_mut(|journal| {
        let len = journal.len();
        if len <= MAX_JOURNAL_COLLECTIONS {
            return;
        }
        let excess = len - MAX_JOURNAL_COLLECTIONS;
        for index in excess..len {
            if let Some(item) = journal.get(index) {
                journal.set(index - excess, &item);
            }
        }
        for _ in 0..excess {
            journal.pop();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::StableJournalCollection;
    use crate::state::insert_journal_collection;
    use chrono::NaiveDate;

    fn collection(tag: &str) -> StableJournalCollection {
        StableJournalCollection {
            start_date_and_time: tag.to_string(),
            end_date_and_time: tag.to_string(),
            month: None,
            entries: vec![],
        }
    }

    #[test]
    fn last_day_detection_handles_month_lengths() {
        let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).expect("valid date");
        assert!(is_last_day_of_month(date(2025, 2, 28)));
        assert!(is_last_day_of_month(date(2024, 2, 29)));
        assert!(is_last_day_of_month(date(2025, 12, 31)));
        assert!(!is_last_day_of_month(date(2025, 2, 27)));
    }

    #[test]
    fn cleanup_keeps_the_newest_collections() {
        for index in 0..(MAX_JOURNAL_COLLECTIONS + 20) {
            insert_journal_collection(collection(&format!("entry-{}", index)));
        }
        journal_cleanup();
        JOURNAL.with_borrow(|journal| {
            assert_eq!(journal.len(), MAX_JOURNAL_COLLECTIONS);
            let first = journal.get(0).expect("exists");
            assert_eq!(first.start_date_and_time, "entry-20");
        });
    }
}
