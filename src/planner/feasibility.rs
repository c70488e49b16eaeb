//! Feasibility analysis for a proposed monthly budget

use chrono::NaiveDate;
use num_traits::ToPrimitive;
use rust_decimal::Decimal;

use super::budget::{leveled_budget, minimum_budget};
use super::{sort_goals, FeasibilityAnalysis, InfeasibleGoal, PlannedGoal, Suggestion};
use crate::calendar::{day_to_date, PaymentCalendar};
use crate::constants::{EPSILON, MAX_DEADLINE_EXTENSION_MONTHS};
use crate::utils::error::*;

/// Runs the cumulative deadline scan against the proposed budget.
///
/// Every goal whose cumulative requirement exceeds the budget is reported
/// with its shortfall, together with up to two suggestions: raising the
/// budget to the minimum, and pushing the first failing deadline out far
/// enough for the budget to cover it.
pub fn check_feasibility(
    goals: &[PlannedGoal],
    budget: Decimal,
    now: NaiveDate,
    calendar: &PaymentCalendar,
) -> PlannerResult<FeasibilityAnalysis> {
    if budget <= Decimal::ZERO {
        return Err(validation_err("Budgets must be positive."));
    }
    let minimum = minimum_budget(goals, now, calendar)?;
    let leveled = leveled_budget(goals, now, calendar)?;
    let infeasible = infeasible_goals(goals, budget, now, calendar)?;

    let mut suggestions = Vec::with_capacity(2);
    if !infeasible.is_empty() {
        suggestions.push(Suggestion::IncreaseBudget { to: minimum });
        if let Some(first) = infeasible.first() {
            if let Some(goal) = goals.iter().find(|goal| goal.id == first.goal_id) {
                if let Some(by_months) = extension_months(goal, budget, now, calendar)? {
                    suggestions.push(Suggestion::ExtendDeadline {
                        goal_id: goal.id,
                        by_months,
                    });
                }
            }
        }
    }

    Ok(FeasibilityAnalysis {
        budget,
        feasible: infeasible.is_empty(),
        minimum_budget: minimum,
        leveled_budget: leveled,
        infeasible,
        suggestions,
    })
}

/// Goals whose cumulative requirement exceeds the budget, in deadline order
pub fn infeasible_goals(
    goals: &[PlannedGoal],
    budget: Decimal,
    now: NaiveDate,
    calendar: &PaymentCalendar,
) -> PlannerResult<Vec<InfeasibleGoal>> {
    let mut cumulative_remaining = Decimal::ZERO;
    let mut infeasible = Vec::new();
    for goal in sort_goals(goals) {
        if goal.remaining <= EPSILON {
            continue;
        }
        cumulative_remaining += goal.remaining;
        let months = calendar.months_remaining(now, day_to_date(goal.deadline_day)?);
        let required = cumulative_remaining
            .checked_div(Decimal::from(months))
            .ok_or_else(|| arithmetic_err("Feasibility division failed."))?;
        if required > budget + EPSILON {
            infeasible.push(InfeasibleGoal {
                goal_id: goal.id,
                name: goal.name.clone(),
                required,
                shortfall: required - budget,
            });
        }
    }
    Ok(infeasible)
}

/// Months the goal's deadline must move out for the budget to cover its
/// remainder: `ceil(remaining / budget) - current_months`, clamped to
/// [1, 12]. `None` when no extension within a year is enough.
fn extension_months(
    goal: &PlannedGoal,
    budget: Decimal,
    now: NaiveDate,
    calendar: &PaymentCalendar,
) -> PlannerResult<Option<u32>> {
    let current_months = calendar.months_remaining(now, day_to_date(goal.deadline_day)?);
    let needed = goal
        .remaining
        .checked_div(budget)
        .ok_or_else(|| arithmetic_err("Deadline extension division failed."))?
        .ceil();
    let needed = needed
        .to_u32()
        .ok_or_else(|| arithmetic_err("Deadline extension overflowed."))?;
    if needed <= current_months {
        return Ok(None);
    }
    let by_months = needed - current_months;
    if by_months > MAX_DEADLINE_EXTENSION_MONTHS {
        return Ok(None);
    }
    Ok(Some(by_months.max(1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{add_months, date_to_day};
    use rust_decimal_macros::dec;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 10).expect("valid date")
    }

    fn planned(id: u32, remaining: Decimal, months_out: u32) -> PlannedGoal {
        PlannedGoal {
            id,
            name: format!("goal-{}", id),
            remaining,
            deadline_day: date_to_day(add_months(today(), months_out)),
        }
    }

    #[test]
    fn a_covered_budget_is_feasible() {
        let calendar = PaymentCalendar::new(1);
        let goals = vec![planned(1, dec!(600), 3), planned(2, dec!(1200), 6)];
        let analysis =
            check_feasibility(&goals, dec!(300), today(), &calendar).expect("analyzes");
        assert!(analysis.feasible);
        assert!(analysis.infeasible.is_empty());
        assert!(analysis.suggestions.is_empty());
    }

    #[test]
    fn shortfalls_and_suggestions_are_reported() {
        let calendar = PaymentCalendar::new(1);
        let goals = vec![planned(1, dec!(1000), 1)];
        let analysis =
            check_feasibility(&goals, dec!(400), today(), &calendar).expect("analyzes");
        assert!(!analysis.feasible);
        assert_eq!(analysis.infeasible.len(), 1);
        assert_eq!(analysis.infeasible[0].required, dec!(1000));
        assert_eq!(analysis.infeasible[0].shortfall, dec!(600));
        assert_eq!(
            analysis.suggestions,
            vec![
                Suggestion::IncreaseBudget { to: dec!(1000) },
                // ceil(1000 / 400) - 1 = 2
                Suggestion::ExtendDeadline {
                    goal_id: 1,
                    by_months: 2
                },
            ]
        );
    }

    #[test]
    fn hopeless_extensions_are_not_suggested() {
        let calendar = PaymentCalendar::new(1);
        let goals = vec![planned(1, dec!(100000), 1)];
        let analysis =
            check_feasibility(&goals, dec!(100), today(), &calendar).expect("analyzes");
        // a 1000-month extension is far beyond the one-year cap
        assert_eq!(
            analysis.suggestions,
            vec![Suggestion::IncreaseBudget { to: dec!(100000) }]
        );
    }

    #[test]
    fn zero_budgets_are_rejected() {
        let calendar = PaymentCalendar::new(1);
        assert!(check_feasibility(&[], Decimal::ZERO, today(), &calendar).is_err());
    }
}
