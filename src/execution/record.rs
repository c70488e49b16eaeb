//! Execution record state machine.
//!
//! Starting a record freezes the month's plans into snapshots; contributions
//! accrue against the record while it executes; closing totals them and
//! completes the plans. A closed record can be reopened within the
//! configured undo window, against the untouched snapshots. At most one
//! record is non-closed at any time across all months.

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::calendar::parse_month_label;
use crate::events::{self, ChangeEvent};
use crate::model::{
    CompletedExecution, ExecutionRecord, ExecutionStatus, MonthlyGoalPlan, PlanState,
};
use crate::plans;
use crate::rates::RateLookup;
use crate::state::{
    next_id, settings_snapshot, COMPLETED_EXECUTIONS, EXECUTION_RECORDS, GOALS,
};
use crate::utils::common::{clamp_non_negative, decimal_to_string};
use crate::utils::error::*;

use super::snapshot::{push_snapshot, snapshots_for_record, StableExecutionSnapshot};

/// Per-goal outcome of a closed record
#[derive(Clone, Debug, PartialEq)]
pub struct ClosedGoal {
    pub goal_id: u32,
    pub currency: String,
    pub planned: Decimal,
    pub contributed: Decimal,
}

/// Close summary handed back to the caller
#[derive(Clone, Debug, PartialEq)]
pub struct ClosedSummary {
    pub record_id: u32,
    pub month: String,
    pub closed_at: u64,
    pub goals: Vec<ClosedGoal>,
}

/// Remaining amount needed to fulfil one goal's share of the month
#[derive(Clone, Debug, PartialEq)]
pub struct RemainingEntry {
    pub goal_id: u32,
    pub currency: String,
    /// `None` when the conversion rate could not be resolved
    pub amount: Option<Decimal>,
}

/// The single record that is not closed, if any
pub fn active_record() -> Option<ExecutionRecord> {
    EXECUTION_RECORDS.with_borrow(|records| {
        records
            .values()
            .find(|record| record.status != ExecutionStatus::Closed)
            .cloned()
    })
}

/// Record by id
pub fn get_record(record_id: u32) -> PlannerResult<ExecutionRecord> {
    EXECUTION_RECORDS
        .with_borrow(|records| records.get(&record_id).cloned())
        .ok_or_else(|| {
            PlannerError::NotFound(format!("Execution record {} does not exist.", record_id))
        })
}

/// Record by month label
pub fn record_for_month(month: &str) -> Option<ExecutionRecord> {
    EXECUTION_RECORDS.with_borrow(|records| {
        records.values().find(|record| record.month == month).cloned()
    })
}

fn save_record(record: &ExecutionRecord) {
    EXECUTION_RECORDS.with_borrow_mut(|records| {
        records.insert(record.id, record.clone());
    });
}

fn snapshot_plan(record_id: u32, plan: &MonthlyGoalPlan) -> PlannerResult<()> {
    let (goal_name, target_amount) = GOALS.with_borrow(|goals| {
        goals
            .get(&plan.goal_id)
            .map(|goal| (goal.name.clone(), goal.target_amount))
            .ok_or_else(|| {
                PlannerError::NotFound(format!("Goal {} does not exist.", plan.goal_id))
            })
    })?;
    let current_total = clamp_non_negative(target_amount - plan.remaining_amount);
    push_snapshot(&StableExecutionSnapshot {
        id: next_id(),
        record_id,
        goal_id: plan.goal_id,
        goal_name,
        currency: plan.currency.clone(),
        target_amount: decimal_to_string(target_amount),
        current_total: decimal_to_string(current_total),
        required_amount: decimal_to_string(plan.required_monthly),
        is_protected: plan.is_protected,
        is_skipped: plan.is_skipped,
        custom_amount: plan.custom_amount.map(decimal_to_string),
    })
}

/// Starts tracking a month: freezes every draft plan of the month into
/// snapshots and moves the record to `executing`.
pub fn start_execution(
    month: &str,
    lookup: &impl RateLookup,
    now_ms: u64,
) -> PlannerResult<ExecutionRecord> {
    parse_month_label(month)?;

    if let Some(open) = active_record() {
        if open.month != month {
            return Err(state_err(format!(
                "Execution record {} for {} is still open.",
                open.id, open.month
            )));
        }
        if open.status == ExecutionStatus::Executing {
            return Err(state_err("This month is already being tracked."));
        }
    }
    if let Some(existing) = record_for_month(month) {
        if existing.status == ExecutionStatus::Closed {
            return Err(state_err("This month was already tracked and closed."));
        }
    }

    let rows = plans::ensure_month_plans(month, lookup, now_ms)?;
    let tracked: Vec<MonthlyGoalPlan> = rows
        .into_iter()
        .filter(|row| row.state == PlanState::Draft)
        .collect();
    if tracked.is_empty() {
        return Err(validation_err("There are no plans to track for this month."));
    }

    let mut record = match record_for_month(month) {
        Some(existing) => existing,
        None => ExecutionRecord {
            id: next_id(),
            month: month.to_string(),
            status: ExecutionStatus::Draft,
            goal_ids: Vec::new(),
            started_at: None,
            closed_at: None,
            created_at: now_ms,
            modified_at: now_ms,
        },
    };

    record.goal_ids = tracked.iter().map(|plan| plan.goal_id).collect();
    for plan in &tracked {
        snapshot_plan(record.id, plan)?;
    }
    plans::transition(month, &record.goal_ids, &[PlanState::Draft], PlanState::Executing, now_ms)?;

    record.status = ExecutionStatus::Executing;
    record.started_at = Some(now_ms);
    record.modified_at = now_ms;
    save_record(&record);
    events::emit(ChangeEvent::ExecutionChanged {
        record_id: record.id,
        status: record.status,
    });
    Ok(record)
}

/// Accrues a contribution against an executing record, in the goal's
/// currency.
pub fn log_contribution(
    record_id: u32,
    goal_id: u32,
    amount: Decimal,
    now_ms: u64,
) -> PlannerResult<CompletedExecution> {
    if amount <= Decimal::ZERO {
        return Err(validation_err("Contributions must be positive."));
    }
    let record = get_record(record_id)?;
    if record.status != ExecutionStatus::Executing {
        return Err(state_err("Contributions only accrue while a record is executing."));
    }
    if !record.goal_ids.contains(&goal_id) {
        return Err(PlannerError::NotFound(format!(
            "Goal {} is not tracked by record {}.",
            goal_id, record_id
        )));
    }
    let row = CompletedExecution {
        id: next_id(),
        record_id,
        goal_id,
        amount,
        created_at: now_ms,
        modified_at: now_ms,
    };
    COMPLETED_EXECUTIONS.with_borrow_mut(|rows| rows.push(row.clone()));
    Ok(row)
}

/// Per-goal contribution totals of a record
pub fn contributed_totals(record_id: u32) -> HashMap<u32, Decimal> {
    COMPLETED_EXECUTIONS.with_borrow(|rows| {
        let mut totals: HashMap<u32, Decimal> = HashMap::new();
        for row in rows.iter().filter(|row| row.record_id == record_id) {
            *totals.entry(row.goal_id).or_default() += row.amount;
        }
        totals
    })
}

/// Closes an executing record: totals the accrued contributions, completes
/// the month's plans and seals the record.
pub fn close_execution(record_id: u32, now_ms: u64) -> PlannerResult<ClosedSummary> {
    let mut record = get_record(record_id)?;
    if record.status != ExecutionStatus::Executing {
        return Err(state_err("Only executing records can be closed."));
    }

    let totals = contributed_totals(record_id);
    let mut goals = Vec::with_capacity(record.goal_ids.len());
    for snapshot in snapshots_for_record(record_id) {
        let contributed = totals
            .get(&snapshot.goal_id)
            .copied()
            .unwrap_or(Decimal::ZERO);
        plans::finalize_status(&record.month, snapshot.goal_id, contributed, now_ms);
        goals.push(ClosedGoal {
            goal_id: snapshot.goal_id,
            currency: snapshot.currency.clone(),
            planned: snapshot.effective_amount()?,
            contributed,
        });
    }
    plans::transition(
        &record.month,
        &record.goal_ids,
        &[PlanState::Executing],
        PlanState::Completed,
        now_ms,
    )?;

    record.status = ExecutionStatus::Closed;
    record.closed_at = Some(now_ms);
    record.modified_at = now_ms;
    save_record(&record);
    events::emit(ChangeEvent::ExecutionChanged {
        record_id,
        status: record.status,
    });
    Ok(ClosedSummary {
        record_id,
        month: record.month,
        closed_at: now_ms,
        goals,
    })
}

/// Reopens a closed record within the undo grace window. Snapshots and
/// accrued contributions are untouched.
pub fn reopen_execution(record_id: u32, now_ms: u64) -> PlannerResult<ExecutionRecord> {
    let mut record = get_record(record_id)?;
    if record.status != ExecutionStatus::Closed {
        return Err(state_err("Only closed records can be reopened."));
    }
    let closed_at = record
        .closed_at
        .ok_or_else(|| state_err("This record has no close timestamp."))?;
    let grace = settings_snapshot().undo_grace_period_ms();
    if now_ms.saturating_sub(closed_at) > grace {
        return Err(state_err("The undo window for this record has passed."));
    }
    if let Some(open) = active_record() {
        return Err(state_err(format!(
            "Execution record {} for {} is still open.",
            open.id, open.month
        )));
    }

    plans::transition(
        &record.month,
        &record.goal_ids,
        &[PlanState::Completed],
        PlanState::Executing,
        now_ms,
    )?;
    record.status = ExecutionStatus::Executing;
    record.closed_at = None;
    record.modified_at = now_ms;
    save_record(&record);
    events::emit(ChangeEvent::ExecutionChanged {
        record_id,
        status: record.status,
    });
    Ok(record)
}

/// Remaining amount per goal to fulfil the month's plan, converted into the
/// execution display currency. A pair without a resolvable rate yields
/// `None` rather than a silent 1:1 substitute.
pub fn remaining_to_close(
    record_id: u32,
    lookup: &impl RateLookup,
) -> PlannerResult<Vec<RemainingEntry>> {
    let record = get_record(record_id)?;
    if record.status != ExecutionStatus::Executing {
        return Err(state_err("Only executing records have a remaining amount."));
    }
    let display_currency = settings_snapshot().execution_display_currency;
    let totals = contributed_totals(record_id);

    let mut entries = Vec::new();
    for snapshot in snapshots_for_record(record_id) {
        let contributed = totals
            .get(&snapshot.goal_id)
            .copied()
            .unwrap_or(Decimal::ZERO);
        let open = clamp_non_negative(snapshot.effective_amount()? - contributed);
        let amount = if snapshot.currency == display_currency {
            Some(open)
        } else {
            lookup
                .rate(&snapshot.currency, &display_currency)
                .map(|rate| open * rate)
        };
        entries.push(RemainingEntry {
            goal_id: snapshot.goal_id,
            currency: display_currency.clone(),
            amount,
        });
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{add_months, date_to_day};
    use crate::model::{Goal, GoalLifecycle, Reminder};
    use crate::rates::MockRateLookup;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    const T0: u64 = 1_749_546_000_000; // 2025-06-10 UTC
    const HOUR_MS: u64 = 3_600_000;

    fn seed_goal(id: u32, target: Decimal) {
        let today = NaiveDate::from_ymd_opt(2025, 6, 10).expect("valid date");
        GOALS.with_borrow_mut(|goals| {
            goals.insert(
                id,
                Goal {
                    id,
                    name: format!("goal-{}", id),
                    currency: "USD".to_string(),
                    target_amount: target,
                    deadline_day: date_to_day(add_months(today, 6)),
                    start_day: date_to_day(today),
                    lifecycle: GoalLifecycle::Active,
                    emoji: None,
                    description: None,
                    link: None,
                    reminder: Reminder::Off,
                    created_at: 0,
                    modified_at: 0,
                },
            );
        });
    }

    fn lookup() -> MockRateLookup {
        let mut lookup = MockRateLookup::new();
        lookup.expect_rate().returning(|_, _| Some(Decimal::ONE));
        lookup
    }

    #[test]
    fn the_lifecycle_freezes_accrues_and_closes() {
        seed_goal(1, dec!(600));
        let record = start_execution("2025-06", &lookup(), T0).expect("starts");
        assert_eq!(record.status, ExecutionStatus::Executing);
        assert_eq!(record.goal_ids, vec![1]);
        assert_eq!(snapshots_for_record(record.id).len(), 1);

        log_contribution(record.id, 1, dec!(60), T0 + HOUR_MS).expect("accrues");
        log_contribution(record.id, 1, dec!(40), T0 + 2 * HOUR_MS).expect("accrues");
        assert!(log_contribution(record.id, 99, dec!(10), T0).is_err());

        let summary = close_execution(record.id, T0 + 10 * HOUR_MS).expect("closes");
        assert_eq!(summary.goals.len(), 1);
        assert_eq!(summary.goals[0].contributed, dec!(100));
        assert_eq!(summary.goals[0].planned, dec!(100));
        assert_eq!(
            plans::plan_for("2025-06", 1).expect("exists").state,
            PlanState::Completed
        );

        // closed records accept no further contributions
        assert!(matches!(
            log_contribution(record.id, 1, dec!(5), T0 + 11 * HOUR_MS),
            Err(PlannerError::StateViolation(_))
        ));
    }

    #[test]
    fn reopen_obeys_the_undo_window() {
        seed_goal(2, dec!(600));
        let record = start_execution("2025-06", &lookup(), T0).expect("starts");
        close_execution(record.id, T0 + 10 * HOUR_MS).expect("closes");

        // within the default 24h window
        let reopened = reopen_execution(record.id, T0 + 20 * HOUR_MS).expect("reopens");
        assert_eq!(reopened.status, ExecutionStatus::Executing);
        assert_eq!(snapshots_for_record(record.id).len(), 1);

        // an executing record cannot be reopened again
        assert!(matches!(
            reopen_execution(record.id, T0 + 30 * HOUR_MS),
            Err(PlannerError::StateViolation(_))
        ));

        // re-close, then let the window lapse
        close_execution(record.id, T0 + 30 * HOUR_MS).expect("closes");
        assert!(matches!(
            reopen_execution(record.id, T0 + 60 * HOUR_MS),
            Err(PlannerError::StateViolation(_))
        ));
    }

    #[test]
    fn only_one_record_is_open_across_months() {
        seed_goal(3, dec!(600));
        let record = start_execution("2025-06", &lookup(), T0).expect("starts");
        assert!(matches!(
            start_execution("2025-07", &lookup(), T0),
            Err(PlannerError::StateViolation(_))
        ));
        close_execution(record.id, T0 + HOUR_MS).expect("closes");
        start_execution("2025-07", &lookup(), T0 + 2 * HOUR_MS).expect("starts");
    }

    #[test]
    fn remaining_to_close_converts_or_reports_unknown() {
        seed_goal(4, dec!(1200));
        let record = start_execution("2025-06", &lookup(), T0).expect("starts");
        log_contribution(record.id, 4, dec!(80), T0 + HOUR_MS).expect("accrues");

        // same currency: no conversion involved
        let entries = remaining_to_close(record.id, &lookup()).expect("computes");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].amount, Some(dec!(120)));

        // an unresolvable pair yields an unknown amount, never 1:1
        crate::state::SETTINGS.with_borrow_mut(|settings| {
            settings.execution_display_currency("EUR".to_string());
        });
        let mut failing = MockRateLookup::new();
        failing.expect_rate().returning(|_, _| None);
        let entries = remaining_to_close(record.id, &failing).expect("computes");
        assert_eq!(entries[0].amount, None);
    }
}
