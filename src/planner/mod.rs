//! Fixed-budget planning.
//! Includes:
//! - Minimum and leveled budget derivation
//! - Feasibility analysis with suggestions
//! - Deadline-aware payment scheduling and recalculation
//! - Timeline block aggregation and the input-keyed plan cache
//!
//! Everything in this module is pure arithmetic over pre-converted amounts
//! in a single target currency; nothing here suspends.

pub(crate) mod budget;
pub(crate) mod cache;
pub(crate) mod feasibility;
pub(crate) mod schedule;
pub(crate) mod timeline;

use rust_decimal::Decimal;

/// A goal reduced to its planning inputs, in the target currency
#[derive(Clone, Debug, PartialEq)]
pub struct PlannedGoal {
    pub id: u32,
    pub name: String,
    /// Amount still needed, converted into the target currency
    pub remaining: Decimal,
    /// Deadline as an epoch-day
    pub deadline_day: i64,
}

/// One goal's share of a scheduled payment
#[derive(Clone, Debug, PartialEq)]
pub struct PlannedContribution {
    pub goal_id: u32,
    pub goal_name: String,
    pub amount: Decimal,
    /// First money ever scheduled for this goal
    pub is_goal_start: bool,
    /// The goal's remainder reaches zero with this contribution
    pub is_goal_complete: bool,
}

/// All contributions falling on one payment anchor
#[derive(Clone, Debug, PartialEq)]
pub struct ScheduledPayment {
    pub payment_number: u32,
    /// Payment date as an epoch-day
    pub date_day: i64,
    pub contributions: Vec<PlannedContribution>,
}

/// A goal whose deadline cannot be met under the proposed budget
#[derive(Clone, Debug, PartialEq)]
pub struct InfeasibleGoal {
    pub goal_id: u32,
    pub name: String,
    /// Monthly budget the deadline would need
    pub required: Decimal,
    /// How far the proposed budget falls short
    pub shortfall: Decimal,
}

/// Actionable ways out of an infeasible budget
#[derive(Clone, Debug, PartialEq)]
pub enum Suggestion {
    IncreaseBudget { to: Decimal },
    ExtendDeadline { goal_id: u32, by_months: u32 },
    ReduceTarget { goal_id: u32, to: Decimal },
    EditGoal { goal_id: u32 },
}

/// Feasibility verdict for a proposed budget
#[derive(Clone, Debug, PartialEq)]
pub struct FeasibilityAnalysis {
    pub budget: Decimal,
    pub feasible: bool,
    pub minimum_budget: Decimal,
    pub leveled_budget: Decimal,
    pub infeasible: Vec<InfeasibleGoal>,
    pub suggestions: Vec<Suggestion>,
}

/// A generated fixed-budget plan
#[derive(Clone, Debug, PartialEq)]
pub struct FixedBudgetPlan {
    pub monthly_budget: Decimal,
    pub currency: String,
    pub generated_at: u64,
    pub payments: Vec<ScheduledPayment>,
    pub infeasible: Vec<InfeasibleGoal>,
}

/// Consecutive payments to one goal, aggregated for timeline rendering
#[derive(Clone, Debug, PartialEq)]
pub struct ScheduledGoalBlock {
    pub goal_id: u32,
    pub goal_name: String,
    pub start_payment: u32,
    pub end_payment: u32,
    pub start_day: i64,
    pub end_day: i64,
    pub total_amount: Decimal,
    pub payment_count: u32,
}

/// Deadline-ascending processing order used everywhere in the planner;
/// ids break ties so the order is total
pub fn sort_goals(goals: &[PlannedGoal]) -> Vec<PlannedGoal> {
    let mut sorted = goals.to_vec();
    sorted.sort_by(|a, b| {
        a.deadline_day
            .cmp(&b.deadline_day)
            .then(a.id.cmp(&b.id))
    });
    sorted
}
