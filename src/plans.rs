//! Monthly plan store.
//!
//! One row per (month label, goal): created as drafts when a month's
//! requirements are first computed, promoted to `executing` when an
//! execution record starts tracking them, and completed when it closes.
//! Overrides (protect, skip, custom amount) stay editable until completion.

use rust_decimal::Decimal;

use crate::calendar::{ms_to_date, parse_month_label, PaymentCalendar};
use crate::events::{self, ChangeEvent};
use crate::model::{GoalStatus, MonthlyGoalPlan, PlanState};
use crate::rates::RateLookup;
use crate::requirement::{self, GoalRequirement};
use crate::state::{next_id, settings_snapshot, GOALS, MONTHLY_PLANS};
use crate::utils::error::*;

/// All plan rows of a month, sorted by goal id
pub fn plans_for_month(month: &str) -> Vec<MonthlyGoalPlan> {
    let mut rows: Vec<MonthlyGoalPlan> = MONTHLY_PLANS.with_borrow(|plans| {
        plans
            .values()
            .filter(|plan| plan.month == month)
            .cloned()
            .collect()
    });
    rows.sort_by_key(|plan| plan.goal_id);
    rows
}

/// One plan row
pub fn plan_for(month: &str, goal_id: u32) -> Option<MonthlyGoalPlan> {
    MONTHLY_PLANS.with_borrow(|plans| plans.get(&(month.to_string(), goal_id)).cloned())
}

fn row_from_requirement(
    requirement: &GoalRequirement,
    month: &str,
    now_ms: u64,
) -> MonthlyGoalPlan {
    MonthlyGoalPlan {
        id: next_id(),
        goal_id: requirement.goal_id,
        month: month.to_string(),
        required_monthly: requirement.required_monthly,
        remaining_amount: requirement.remaining,
        months_remaining: requirement.months_remaining,
        currency: requirement.currency.clone(),
        status: requirement.status,
        state: PlanState::Draft,
        custom_amount: None,
        is_protected: false,
        is_skipped: false,
        created_at: now_ms,
        modified_at: now_ms,
    }
}

/// Computes (or refreshes) the month's draft rows for every active goal.
///
/// Existing rows keep their identity and overrides; only draft rows have
/// their requirement fields refreshed. Rows already executing or completed
/// are frozen.
pub fn ensure_month_plans(
    month: &str,
    lookup: &impl RateLookup,
    now_ms: u64,
) -> PlannerResult<Vec<MonthlyGoalPlan>> {
    parse_month_label(month)?;
    let settings = settings_snapshot();
    let calendar = PaymentCalendar::new(settings.payment_day);
    let now = ms_to_date(now_ms)?;

    let active_goals: Vec<_> =
        GOALS.with_borrow(|goals| goals.values().filter(|g| g.is_active()).cloned().collect());

    for goal in active_goals {
        let requirement = requirement::goal_requirement(&goal, lookup, now, &calendar)?;
        let key = (month.to_string(), goal.id);
        MONTHLY_PLANS.with_borrow_mut(|plans| {
            match plans.get_mut(&key) {
                Some(row) if row.state == PlanState::Draft => {
                    row.required_monthly = requirement.required_monthly;
                    row.remaining_amount = requirement.remaining;
                    row.months_remaining = requirement.months_remaining;
                    row.status = requirement.status;
                    row.modified_at = now_ms;
                }
                Some(_) => {}
                None => {
                    plans.insert(key, row_from_requirement(&requirement, month, now_ms));
                }
            }
        });
    }
    Ok(plans_for_month(month))
}

/// Applies protect/skip/custom-amount overrides to a plan row.
pub fn set_overrides(
    month: &str,
    goal_id: u32,
    is_protected: Option<bool>,
    is_skipped: Option<bool>,
    custom_amount: Option<Option<Decimal>>,
    now_ms: u64,
) -> PlannerResult<MonthlyGoalPlan> {
    if let Some(Some(amount)) = custom_amount {
        if amount < Decimal::ZERO {
            return Err(validation_err("Custom amounts cannot be negative."));
        }
    }
    let key = (month.to_string(), goal_id);
    let updated = MONTHLY_PLANS.with_borrow_mut(|plans| {
        let row = plans
            .get_mut(&key)
            .ok_or_else(|| PlannerError::NotFound("No plan exists for this month and goal.".to_string()))?;
        row.ensure_editable()?;
        if let Some(protected) = is_protected {
            row.is_protected = protected;
        }
        if let Some(skipped) = is_skipped {
            row.is_skipped = skipped;
        }
        if let Some(amount) = custom_amount {
            row.custom_amount = amount;
        }
        row.modified_at = now_ms;
        Ok::<MonthlyGoalPlan, PlannerError>(row.clone())
    })?;
    events::emit(ChangeEvent::MonthlyPlanChanged {
        month: month.to_string(),
        goal_id,
    });
    Ok(updated)
}

/// Moves the given goals' rows between plan states, enforcing the
/// draft → executing → completed progression (and its undo reversal).
pub fn transition(
    month: &str,
    goal_ids: &[u32],
    from: &[PlanState],
    to: PlanState,
    now_ms: u64,
) -> PlannerResult<()> {
    MONTHLY_PLANS.with_borrow_mut(|plans| {
        for goal_id in goal_ids {
            let row = plans
                .get_mut(&(month.to_string(), *goal_id))
                .ok_or_else(|| {
                    PlannerError::NotFound(format!(
                        "No plan exists for month {} and goal {}.",
                        month, goal_id
                    ))
                })?;
            if !from.contains(&row.state) {
                return Err(state_err(format!(
                    "Plan for goal {} cannot move to {:?} from {:?}.",
                    goal_id, to, row.state
                )));
            }
            row.state = to;
            row.modified_at = now_ms;
        }
        Ok(())
    })
}

/// Completed-state statuses are recomputed when a record closes: a plan
/// whose remainder was contributed counts as completed.
pub fn finalize_status(month: &str, goal_id: u32, contributed: Decimal, now_ms: u64) {
    MONTHLY_PLANS.with_borrow_mut(|plans| {
        if let Some(row) = plans.get_mut(&(month.to_string(), goal_id)) {
            if contributed + crate::constants::EPSILON >= row.effective_amount() {
                row.status = GoalStatus::Completed;
            }
            row.modified_at = now_ms;
        }
    });
}
