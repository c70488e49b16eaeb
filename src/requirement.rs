//! Per-goal monthly requirement and status classification.
//!
//! The aggregation path converts every funded portion into the goal's
//! currency through the cached rate seam; a pair that cannot be resolved
//! falls open to the unconverted amount so balances never silently vanish
//! from the totals.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::allocation::funded_portions_for_goal;
use crate::calendar::{day_to_date, PaymentCalendar};
use crate::constants::{ATTENTION_REQUIRED_FRACTION, CRITICAL_REMAINING_FRACTION, EPSILON};
use crate::model::{Goal, GoalStatus};
use crate::rates::RateLookup;
use crate::utils::common::clamp_non_negative;
use crate::utils::error::*;

/// Requirement snapshot for one goal
#[derive(Clone, Debug, PartialEq)]
pub struct GoalRequirement {
    pub goal_id: u32,
    pub name: String,
    pub currency: String,
    pub target_amount: Decimal,
    pub current_total: Decimal,
    pub remaining: Decimal,
    pub months_remaining: u32,
    pub required_monthly: Decimal,
    pub status: GoalStatus,
    pub deadline_day: i64,
}

/// Sums the goal's funded portions in the goal's own currency.
/// Conversion failures keep the unconverted amount.
pub fn current_total(goal: &Goal, lookup: &impl RateLookup) -> Decimal {
    funded_portions_for_goal(goal.id)
        .into_iter()
        .map(|(_, asset_currency, funded)| {
            if asset_currency == goal.currency {
                return funded;
            }
            match lookup.rate(&asset_currency, &goal.currency) {
                Some(rate) => funded * rate,
                None => funded,
            }
        })
        .sum()
}

/// Status thresholds applied to a computed requirement
fn classify(
    target: Decimal,
    remaining: Decimal,
    months_remaining: u32,
    required_monthly: Decimal,
) -> GoalStatus {
    if remaining <= EPSILON {
        GoalStatus::Completed
    } else if months_remaining <= 1 && remaining > CRITICAL_REMAINING_FRACTION * target {
        GoalStatus::Critical
    } else if required_monthly > ATTENTION_REQUIRED_FRACTION * target {
        GoalStatus::Attention
    } else {
        GoalStatus::OnTrack
    }
}

/// Builds the requirement snapshot for a goal given its aggregated total
pub fn compute(
    goal: &Goal,
    current_total: Decimal,
    now: NaiveDate,
    calendar: &PaymentCalendar,
) -> PlannerResult<GoalRequirement> {
    let deadline = day_to_date(goal.deadline_day)?;
    let months_remaining = calendar.months_remaining(now, deadline);
    let remaining = clamp_non_negative(goal.target_amount - current_total);
    let required_monthly = remaining
        .checked_div(Decimal::from(months_remaining))
        .ok_or_else(|| arithmetic_err("Monthly requirement division failed."))?;
    Ok(GoalRequirement {
        goal_id: goal.id,
        name: goal.name.clone(),
        currency: goal.currency.clone(),
        target_amount: goal.target_amount,
        current_total,
        remaining,
        months_remaining,
        required_monthly,
        status: classify(goal.target_amount, remaining, months_remaining, required_monthly),
        deadline_day: goal.deadline_day,
    })
}

/// Aggregates and computes the requirement for a goal in one step
pub fn goal_requirement(
    goal: &Goal,
    lookup: &impl RateLookup,
    now: NaiveDate,
    calendar: &PaymentCalendar,
) -> PlannerResult<GoalRequirement> {
    let total = current_total(goal, lookup);
    compute(goal, total, now, calendar)
}
