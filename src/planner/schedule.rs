//! Deadline-aware payment scheduling.
//!
//! ```plain
//! Payment loop:
//!
//!           ┌───────────┐     ┌──────────────┐
//! Anchor ──►│ Eligible  │────►│ Per-goal     │
//!           │ goals     │     │ minimums     │
//!           └───────────┘     └──────┬───────┘
//!                                    ▼
//!           ┌───────────┐     ┌──────────────┐
//!           │ Leftover  │◄────│ Fund minimums│
//!           │ top-up    │     │ deadline-first│
//!           └─────┬─────┘     └──────────────┘
//!                 ▼
//!           next anchor, until every remainder is spent
//! ```
//!
//! Goals are processed in deadline-ascending order throughout: when the
//! budget cannot cover every monthly minimum, earlier deadlines take their
//! full minimum first, and leftover budget tops up earlier deadlines first.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::budget::minimum_budget;
use super::feasibility::infeasible_goals;
use super::{
    sort_goals, FixedBudgetPlan, PlannedContribution, PlannedGoal, ScheduledPayment,
};
use crate::calendar::{date_to_day, day_to_date, PaymentCalendar};
use crate::constants::{EPSILON, MAX_SCHEDULE_PAYMENTS};
use crate::types::ContributionPolicy;
use crate::utils::error::*;

/// Mutable per-goal scheduling state, held in deadline order
struct GoalState {
    id: u32,
    name: String,
    remaining: Decimal,
    running_total: Decimal,
    deadline: NaiveDate,
}

fn goal_states(goals: &[PlannedGoal]) -> PlannerResult<Vec<GoalState>> {
    sort_goals(goals)
        .into_iter()
        .map(|goal| {
            Ok(GoalState {
                id: goal.id,
                name: goal.name,
                remaining: goal.remaining.max(Decimal::ZERO),
                running_total: Decimal::ZERO,
                deadline: day_to_date(goal.deadline_day)?,
            })
        })
        .collect()
}

fn open_remainder(states: &[GoalState]) -> bool {
    states.iter().any(|state| state.remaining > EPSILON)
}

/// Allocates one payment across the eligible goals and updates their state.
/// Returns the emitted contributions; an empty result means no goal was
/// eligible on this anchor.
fn allocate_payment(
    states: &mut [GoalState],
    budget: Decimal,
    payment_date: NaiveDate,
    calendar: &PaymentCalendar,
) -> PlannerResult<Vec<PlannedContribution>> {
    let mut minimums = vec![Decimal::ZERO; states.len()];
    let mut total_minimum = Decimal::ZERO;
    for (index, state) in states.iter().enumerate() {
        if state.deadline >= payment_date && state.remaining > EPSILON {
            let payments_left = calendar.payments_until(payment_date, state.deadline);
            minimums[index] = state
                .remaining
                .checked_div(Decimal::from(payments_left))
                .ok_or_else(|| arithmetic_err("Payment minimum division failed."))?;
            total_minimum += minimums[index];
        }
    }
    if total_minimum <= EPSILON {
        return Ok(Vec::new());
    }

    // When the budget covers every minimum the surplus flows through the
    // top-up pass; when it does not, earlier deadlines keep their full
    // minimum and later goals absorb the squeeze.
    let mut allocations = vec![Decimal::ZERO; states.len()];
    let mut remaining_budget = budget;
    for (index, minimum) in minimums.iter().enumerate() {
        if remaining_budget <= EPSILON {
            break;
        }
        if *minimum <= Decimal::ZERO {
            continue;
        }
        let amount = (*minimum).min(remaining_budget);
        allocations[index] = amount;
        remaining_budget -= amount;
    }

    if remaining_budget > EPSILON {
        for (index, minimum) in minimums.iter().enumerate() {
            if remaining_budget <= EPSILON {
                break;
            }
            if *minimum <= Decimal::ZERO {
                continue;
            }
            let headroom = states[index].remaining - allocations[index];
            if headroom <= EPSILON {
                continue;
            }
            let extra = headroom.min(remaining_budget);
            allocations[index] += extra;
            remaining_budget -= extra;
        }
    }

    let mut contributions = Vec::new();
    for (index, amount) in allocations.into_iter().enumerate() {
        if amount <= EPSILON {
            continue;
        }
        let state = &mut states[index];
        let is_goal_start = state.running_total <= EPSILON;
        state.remaining -= amount;
        state.running_total += amount;
        contributions.push(PlannedContribution {
            goal_id: state.id,
            goal_name: state.name.clone(),
            amount,
            is_goal_start,
            is_goal_complete: state.remaining <= EPSILON,
        });
    }
    Ok(contributions)
}

/// Runs the payment loop until every remainder is spent, no goal is
/// eligible anymore, or the iteration bound is hit.
fn run_schedule(
    states: &mut [GoalState],
    budget: Decimal,
    calendar: &PaymentCalendar,
    first_payment_date: NaiveDate,
    first_payment_number: u32,
) -> PlannerResult<Vec<ScheduledPayment>> {
    let mut payments = Vec::new();
    let mut payment_date = first_payment_date;
    let mut payment_number = first_payment_number;
    for _ in 0..MAX_SCHEDULE_PAYMENTS {
        if !open_remainder(states) {
            break;
        }
        let contributions = allocate_payment(states, budget, payment_date, calendar)?;
        if contributions.is_empty() {
            // the only open remainders belong to goals whose deadline passed
            break;
        }
        payments.push(ScheduledPayment {
            payment_number,
            date_day: date_to_day(payment_date),
            contributions,
        });
        payment_date = calendar.advance(payment_date);
        payment_number += 1;
    }
    Ok(payments)
}

/// Generates the payment-by-payment plan for the budget.
///
/// Goals whose cumulative requirement exceeds the budget end the schedule
/// underfunded; they are flagged in the plan's `infeasible` data rather than
/// silently dropped.
pub fn generate(
    goals: &[PlannedGoal],
    budget: Decimal,
    currency: &str,
    now: NaiveDate,
    calendar: &PaymentCalendar,
    generated_at: u64,
) -> PlannerResult<FixedBudgetPlan> {
    if budget <= Decimal::ZERO {
        return Err(validation_err("Budgets must be positive."));
    }
    let mut states = goal_states(goals)?;
    let first_payment_date = calendar.next_anchor_on_or_after(now);
    let payments = run_schedule(&mut states, budget, calendar, first_payment_date, 1)?;
    let infeasible = infeasible_goals(goals, budget, now, calendar)?;
    Ok(FixedBudgetPlan {
        monthly_budget: budget,
        currency: currency.to_string(),
        generated_at,
        payments,
        infeasible,
    })
}

fn apply_payment(states: &mut [GoalState], payment: &ScheduledPayment) {
    for contribution in &payment.contributions {
        if let Some(state) = states.iter_mut().find(|state| state.id == contribution.goal_id) {
            state.remaining = (state.remaining - contribution.amount).max(Decimal::ZERO);
            state.running_total += contribution.amount;
        }
    }
}

/// Rebuilds the schedule after an actual contribution landed for payment
/// `payment_number`.
///
/// The payments before it are kept verbatim. The contribution itself is
/// redistributed with the regular allocator when it diverges from plan, and
/// the remainder of the schedule is regenerated under the chosen policy:
/// the original budget for `FinishFaster`, or the remainder spread evenly
/// over the originally remaining payments (floored at the residual minimum
/// budget) for `LowerPayments`.
pub fn recalculate_after_contribution(
    original: &FixedBudgetPlan,
    goals: &[PlannedGoal],
    actual: Decimal,
    payment_number: u32,
    policy: ContributionPolicy,
    calendar: &PaymentCalendar,
    generated_at: u64,
) -> PlannerResult<FixedBudgetPlan> {
    if actual < Decimal::ZERO {
        return Err(validation_err("Contributions cannot be negative."));
    }
    let position = payment_number as usize;
    if position == 0 || position > original.payments.len() {
        return Err(validation_err("No scheduled payment has this number."));
    }

    let mut states = goal_states(goals)?;
    let mut payments: Vec<ScheduledPayment> = Vec::with_capacity(original.payments.len());
    for payment in &original.payments[..position - 1] {
        apply_payment(&mut states, payment);
        payments.push(payment.clone());
    }

    let adjusted = &original.payments[position - 1];
    let adjusted_date = day_to_date(adjusted.date_day)?;
    let planned_total: Decimal = adjusted.contributions.iter().map(|c| c.amount).sum();
    if (actual - planned_total).abs() <= EPSILON {
        apply_payment(&mut states, adjusted);
        payments.push(adjusted.clone());
    } else {
        let contributions = allocate_payment(&mut states, actual, adjusted_date, calendar)?;
        payments.push(ScheduledPayment {
            payment_number,
            date_day: adjusted.date_day,
            contributions,
        });
    }

    let residual: Vec<PlannedGoal> = states
        .iter()
        .filter(|state| state.remaining > EPSILON)
        .map(|state| PlannedGoal {
            id: state.id,
            name: state.name.clone(),
            remaining: state.remaining,
            deadline_day: date_to_day(state.deadline),
        })
        .collect();

    let continuation_budget = match policy {
        ContributionPolicy::FinishFaster => original.monthly_budget,
        ContributionPolicy::LowerPayments => {
            let remaining_total: Decimal = residual.iter().map(|goal| goal.remaining).sum();
            let remaining_payments = (original.payments.len() - position).max(1);
            let spread = remaining_total
                .checked_div(Decimal::from(remaining_payments as u64))
                .ok_or_else(|| arithmetic_err("Payment spread division failed."))?;
            spread.max(minimum_budget(&residual, adjusted_date, calendar)?)
        }
    };

    if continuation_budget > Decimal::ZERO && open_remainder(&states) {
        let continuation = run_schedule(
            &mut states,
            continuation_budget,
            calendar,
            calendar.advance(adjusted_date),
            payment_number + 1,
        )?;
        payments.extend(continuation);
    }

    let infeasible = infeasible_goals(&residual, continuation_budget.max(EPSILON), adjusted_date, calendar)?;
    Ok(FixedBudgetPlan {
        monthly_budget: continuation_budget,
        currency: original.currency.clone(),
        generated_at,
        payments,
        infeasible,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::add_months;
    use proptest::prelude::*;
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

    fn payment_total(payment: &ScheduledPayment) -> Decimal {
        payment.contributions.iter().map(|c| c.amount).sum()
    }

    fn goal_total(plan: &FixedBudgetPlan, goal_id: u32) -> Decimal {
        plan.payments
            .iter()
            .flat_map(|payment| &payment.contributions)
            .filter(|c| c.goal_id == goal_id)
            .map(|c| c.amount)
            .sum()
    }

    #[test]
    fn single_goal_exact_fit() {
        let calendar = PaymentCalendar::new(1);
        let goals = vec![planned(1, dec!(1200), 12)];
        let plan = generate(&goals, dec!(100), "USD", today(), &calendar, 0).expect("plans");

        assert_eq!(plan.payments.len(), 12);
        assert!(plan.infeasible.is_empty());
        for payment in &plan.payments {
            assert_eq!(payment_total(payment), dec!(100));
        }
        // first payment lands on the next first-of-month
        assert_eq!(
            day_to_date(plan.payments[0].date_day).expect("valid"),
            NaiveDate::from_ymd_opt(2025, 7, 1).expect("valid date")
        );
        assert!(plan.payments[0].contributions[0].is_goal_start);
        assert!(plan.payments[11].contributions[0].is_goal_complete);
        // every payment lands on or before the deadline
        let deadline = goals[0].deadline_day;
        assert!(plan.payments.iter().all(|payment| payment.date_day <= deadline));
    }

    #[test]
    fn earlier_deadline_takes_priority_under_a_tight_budget() {
        let calendar = PaymentCalendar::new(1);
        let goals = vec![planned(1, dec!(600), 3), planned(2, dec!(1200), 6)];
        let plan = generate(&goals, dec!(300), "USD", today(), &calendar, 0).expect("plans");

        assert_eq!(plan.payments.len(), 6);
        assert!(plan.infeasible.is_empty());
        // payments 1-3 split between both goals
        for payment in &plan.payments[..3] {
            assert_eq!(payment.contributions.len(), 2);
            assert_eq!(payment.contributions[0].goal_id, 1);
            assert_eq!(payment.contributions[0].amount, dec!(200));
            assert_eq!(payment.contributions[1].amount, dec!(100));
        }
        // payments 4-6 fund the second goal alone
        for payment in &plan.payments[3..] {
            assert_eq!(payment.contributions.len(), 1);
            assert_eq!(payment.contributions[0].goal_id, 2);
            assert_eq!(payment.contributions[0].amount, dec!(300));
        }
        assert!(plan.payments[2].contributions[0].is_goal_complete);
        assert!(plan.payments[5].contributions[0].is_goal_complete);
        assert_eq!(goal_total(&plan, 1), dec!(600));
        assert_eq!(goal_total(&plan, 2), dec!(1200));
    }

    #[test]
    fn underfunded_goals_are_flagged_not_dropped() {
        let calendar = PaymentCalendar::new(1);
        let goals = vec![planned(1, dec!(1000), 1)];
        let plan = generate(&goals, dec!(400), "USD", today(), &calendar, 0).expect("plans");

        assert_eq!(plan.payments.len(), 1);
        assert_eq!(payment_total(&plan.payments[0]), dec!(400));
        assert_eq!(plan.infeasible.len(), 1);
        assert_eq!(plan.infeasible[0].shortfall, dec!(600));
    }

    #[test]
    fn converted_remainders_schedule_in_the_target_currency() {
        let calendar = PaymentCalendar::new(1);
        // 1000 EUR remaining at 1.10: 1100 USD over 4 anchors
        let goals = vec![planned(1, dec!(1100), 4)];
        let plan = generate(&goals, dec!(275), "USD", today(), &calendar, 0).expect("plans");
        assert_eq!(plan.payments.len(), 4);
        for payment in &plan.payments {
            assert_eq!(payment_total(payment), dec!(275));
        }
    }

    #[test]
    fn surplus_budget_finishes_early() {
        let calendar = PaymentCalendar::new(1);
        let goals = vec![planned(1, dec!(600), 6)];
        let plan = generate(&goals, dec!(300), "USD", today(), &calendar, 0).expect("plans");
        assert_eq!(plan.payments.len(), 2);
        assert_eq!(goal_total(&plan, 1), dec!(600));
    }

    #[test]
    fn matching_contribution_keeps_the_plan() {
        let calendar = PaymentCalendar::new(1);
        let goals = vec![planned(1, dec!(600), 3), planned(2, dec!(1200), 6)];
        let plan = generate(&goals, dec!(300), "USD", today(), &calendar, 7).expect("plans");
        let recalculated = recalculate_after_contribution(
            &plan,
            &goals,
            dec!(300),
            2,
            ContributionPolicy::FinishFaster,
            &calendar,
            7,
        )
        .expect("recalculates");
        assert_eq!(recalculated, plan);
    }

    #[test]
    fn a_surplus_contribution_compresses_the_timeline() {
        let calendar = PaymentCalendar::new(1);
        let goals = vec![planned(1, dec!(1200), 12)];
        let plan = generate(&goals, dec!(100), "USD", today(), &calendar, 0).expect("plans");
        let recalculated = recalculate_after_contribution(
            &plan,
            &goals,
            dec!(400),
            1,
            ContributionPolicy::FinishFaster,
            &calendar,
            0,
        )
        .expect("recalculates");
        // 400 up front leaves 800 at 100 per month
        assert_eq!(recalculated.payments.len(), 9);
        assert_eq!(goal_total(&recalculated, 1), dec!(1200));
        assert_eq!(recalculated.monthly_budget, dec!(100));
    }

    #[test]
    fn lower_payments_spreads_the_surplus() {
        let calendar = PaymentCalendar::new(1);
        let goals = vec![planned(1, dec!(1200), 12)];
        let plan = generate(&goals, dec!(100), "USD", today(), &calendar, 0).expect("plans");
        let recalculated = recalculate_after_contribution(
            &plan,
            &goals,
            dec!(430),
            1,
            ContributionPolicy::LowerPayments,
            &calendar,
            0,
        )
        .expect("recalculates");
        // 770 left over 11 payments
        assert_eq!(recalculated.monthly_budget, dec!(70));
        assert_eq!(recalculated.payments.len(), 12);
        assert_eq!(goal_total(&recalculated, 1), dec!(1200));
    }

    proptest! {
        /// Per-payment totals never exceed the budget
        #[test]
        fn payments_respect_the_budget(
            first in 1u64..5_000,
            second in 1u64..5_000,
            months_first in 1u32..24,
            months_second in 1u32..24,
            budget in 1u64..2_000,
        ) {
            let calendar = PaymentCalendar::new(1);
            let goals = vec![
                planned(1, Decimal::from(first), months_first),
                planned(2, Decimal::from(second), months_second),
            ];
            let budget = Decimal::from(budget);
            let plan = generate(&goals, budget, "USD", today(), &calendar, 0)
                .expect("plans");
            for payment in &plan.payments {
                prop_assert!(payment_total(payment) <= budget + EPSILON);
            }
        }

        /// A schedule at the minimum budget leaves no infeasible remainder
        /// and funds every goal fully by its deadline
        #[test]
        fn minimum_budget_schedules_are_feasible(
            first in 1u64..5_000,
            second in 1u64..5_000,
            third in 1u64..5_000,
            months_first in 1u32..18,
            months_second in 1u32..18,
            months_third in 1u32..18,
        ) {
            let calendar = PaymentCalendar::new(1);
            let goals = vec![
                planned(1, Decimal::from(first), months_first),
                planned(2, Decimal::from(second), months_second),
                planned(3, Decimal::from(third), months_third),
            ];
            let minimum = minimum_budget(&goals, today(), &calendar).expect("computes");
            prop_assume!(minimum > Decimal::ZERO);
            let plan = generate(&goals, minimum, "USD", today(), &calendar, 0)
                .expect("plans");
            prop_assert!(plan.infeasible.is_empty());
            for goal in &goals {
                let funded = plan
                    .payments
                    .iter()
                    .flat_map(|payment| &payment.contributions)
                    .filter(|c| c.goal_id == goal.id)
                    .map(|c| c.amount)
                    .sum::<Decimal>();
                prop_assert!((funded - goal.remaining).abs() <= EPSILON);
                // nothing lands past the deadline
                for payment in &plan.payments {
                    if payment.contributions.iter().any(|c| c.goal_id == goal.id) {
                        prop_assert!(payment.date_day <= goal.deadline_day);
                    }
                }
            }
        }
    }
}
