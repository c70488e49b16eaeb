//! Minimum and leveled budget derivation

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::{sort_goals, PlannedGoal};
use crate::calendar::{day_to_date, PaymentCalendar};
use crate::constants::EPSILON;
use crate::utils::error::*;

/// The smallest monthly budget that meets every deadline.
///
/// Scans goals in deadline order, accumulating their remainders: the budget
/// must cover each cumulative remainder within the months left to that
/// deadline. The binding constraint is the prefix with the steepest
/// cumulative requirement.
pub fn minimum_budget(
    goals: &[PlannedGoal],
    now: NaiveDate,
    calendar: &PaymentCalendar,
) -> PlannerResult<Decimal> {
    let mut cumulative_remaining = Decimal::ZERO;
    let mut minimum = Decimal::ZERO;
    for goal in sort_goals(goals) {
        if goal.remaining <= EPSILON {
            continue;
        }
        cumulative_remaining += goal.remaining;
        let months = calendar.months_remaining(now, day_to_date(goal.deadline_day)?);
        let required = cumulative_remaining
            .checked_div(Decimal::from(months))
            .ok_or_else(|| arithmetic_err("Minimum budget division failed."))?;
        minimum = minimum.max(required);
    }
    Ok(minimum)
}

/// The relaxed alternative: the total remainder spread evenly until the
/// latest deadline. Ignores intermediate deadlines by construction.
pub fn leveled_budget(
    goals: &[PlannedGoal],
    now: NaiveDate,
    calendar: &PaymentCalendar,
) -> PlannerResult<Decimal> {
    let mut total_remaining = Decimal::ZERO;
    let mut latest_deadline: Option<NaiveDate> = None;
    for goal in goals {
        if goal.remaining <= EPSILON {
            continue;
        }
        total_remaining += goal.remaining;
        let deadline = day_to_date(goal.deadline_day)?;
        latest_deadline = Some(match latest_deadline {
            Some(current) => current.max(deadline),
            None => deadline,
        });
    }
    let months = match latest_deadline {
        Some(deadline) => calendar.months_remaining(now, deadline),
        None => return Ok(Decimal::ZERO),
    };
    total_remaining
        .checked_div(Decimal::from(months))
        .ok_or_else(|| arithmetic_err("Leveled budget division failed."))
}
