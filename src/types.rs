//! Candid-facing types.
//!
//! Monetary fields cross the boundary as decimal strings; the conversions in
//! this module are the only place where parsing and rendering happen.

use candid::CandidType;
use serde::Deserialize;

use crate::model::*;
use crate::planner;
use crate::utils::common::{
    decimal_to_string, opt_string_to_decimal, string_to_decimal,
};
use crate::utils::error::*;

/// Goal payload provided by the caller on create/update
#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct GoalInput {
    pub name: String,
    pub currency: String,
    pub target_amount: String,
    /// Deadline as an epoch-day
    pub deadline_day: i64,
    /// Start as an epoch-day
    pub start_day: i64,
    pub emoji: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
    pub reminder: Reminder,
}

impl GoalInput {
    /// Validates the payload and builds a goal entity.
    pub fn into_goal(self, id: u32, now_ms: u64) -> PlannerResult<Goal> {
        if self.name.trim().is_empty() {
            return Err(validation_err("Goal names cannot be blank."));
        }
        if self.currency.trim().is_empty() {
            return Err(validation_err("Goal currencies cannot be blank."));
        }
        let target_amount = string_to_decimal(&self.target_amount)?;
        if target_amount <= rust_decimal::Decimal::ZERO {
            return Err(validation_err("Goal targets must be positive."));
        }
        if self.deadline_day < self.start_day {
            return Err(validation_err("Goal deadlines cannot precede their start date."));
        }
        Ok(Goal {
            id,
            name: self.name.trim().to_string(),
            currency: self.currency.trim().to_uppercase(),
            target_amount,
            deadline_day: self.deadline_day,
            start_day: self.start_day,
            lifecycle: GoalLifecycle::Active,
            emoji: self.emoji,
            description: self.description,
            link: self.link,
            reminder: self.reminder,
            created_at: now_ms,
            modified_at: now_ms,
        })
    }
}

/// Goal representation returned to callers
#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct GoalQuery {
    pub id: u32,
    pub name: String,
    pub currency: String,
    pub target_amount: String,
    pub deadline_day: i64,
    pub start_day: i64,
    pub lifecycle: GoalLifecycle,
    pub emoji: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
    pub reminder: Reminder,
    pub created_at: u64,
    pub modified_at: u64,
}

impl From<&Goal> for GoalQuery {
    fn from(goal: &Goal) -> Self {
        Self {
            id: goal.id,
            name: goal.name.clone(),
            currency: goal.currency.clone(),
            target_amount: decimal_to_string(goal.target_amount),
            deadline_day: goal.deadline_day,
            start_day: goal.start_day,
            lifecycle: goal.lifecycle,
            emoji: goal.emoji.clone(),
            description: goal.description.clone(),
            link: goal.link.clone(),
            reminder: goal.reminder.clone(),
            created_at: goal.created_at,
            modified_at: goal.modified_at,
        }
    }
}

/// On-chain reference payload
#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct OnChainRefInput {
    pub address: String,
    pub chain_id: u64,
    pub token_contract: Option<String>,
    pub decimals: u32,
}

/// Asset payload provided by the caller
#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct AssetInput {
    pub currency: String,
    pub on_chain: Option<OnChainRefInput>,
}

/// Asset representation returned to callers
#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct AssetQuery {
    pub id: u32,
    pub currency: String,
    pub address: Option<String>,
    pub chain_id: Option<u64>,
    pub token_contract: Option<String>,
    pub created_at: u64,
    pub modified_at: u64,
}

impl From<&Asset> for AssetQuery {
    fn from(asset: &Asset) -> Self {
        Self {
            id: asset.id,
            currency: asset.currency.clone(),
            address: asset.on_chain.as_ref().map(|c| c.address.clone()),
            chain_id: asset.on_chain.as_ref().map(|c| c.chain_id),
            token_contract: asset.on_chain.as_ref().and_then(|c| c.token_contract.clone()),
            created_at: asset.created_at,
            modified_at: asset.modified_at,
        }
    }
}

/// Transaction payload provided by the caller
#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct TransactionInput {
    pub asset_id: u32,
    /// Positive deposits, negative withdrawals
    pub amount: String,
    pub date_ms: u64,
    pub source: TransactionSource,
    pub external_id: Option<String>,
    pub counterparty: Option<String>,
    pub comment: Option<String>,
}

impl TransactionInput {
    pub fn into_transaction(self, id: u32) -> PlannerResult<Transaction> {
        let amount = string_to_decimal(&self.amount)?;
        if amount.is_zero() {
            return Err(validation_err("Transactions cannot have a zero amount."));
        }
        Ok(Transaction {
            id,
            asset_id: self.asset_id,
            amount,
            date_ms: self.date_ms,
            source: self.source,
            external_id: self.external_id,
            counterparty: self.counterparty,
            comment: self.comment,
        })
    }
}

/// Transaction representation returned to callers
#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct TransactionQuery {
    pub id: u32,
    pub asset_id: u32,
    pub amount: String,
    pub date_ms: u64,
    pub source: TransactionSource,
    pub external_id: Option<String>,
    pub counterparty: Option<String>,
    pub comment: Option<String>,
}

impl From<&Transaction> for TransactionQuery {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: tx.id,
            asset_id: tx.asset_id,
            amount: decimal_to_string(tx.amount),
            date_ms: tx.date_ms,
            source: tx.source,
            external_id: tx.external_id.clone(),
            counterparty: tx.counterparty.clone(),
            comment: tx.comment.clone(),
        }
    }
}

/// Allocation write payload
#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct AllocationInput {
    pub asset_id: u32,
    pub goal_id: u32,
    pub amount: String,
    /// Permits pushing the asset's total allocations above its balance
    pub allow_over_allocation: bool,
}

/// Allocation representation returned to callers
#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct AllocationQuery {
    pub id: u32,
    pub asset_id: u32,
    pub goal_id: u32,
    pub amount: String,
}

impl From<&Allocation> for AllocationQuery {
    fn from(allocation: &Allocation) -> Self {
        Self {
            id: allocation.id,
            asset_id: allocation.asset_id,
            goal_id: allocation.goal_id,
            amount: decimal_to_string(allocation.amount),
        }
    }
}

/// Legacy percentage-based allocation, migrated once at load time
#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct LegacyAllocationInput {
    pub asset_id: u32,
    pub goal_id: u32,
    /// Fraction of the asset's balance, in percent
    pub percentage: String,
}

/// One allocation history row
#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct AllocationHistoryQuery {
    pub id: u32,
    pub asset_id: u32,
    pub goal_id: u32,
    pub amount: String,
    pub month: String,
    pub timestamp_ms: u64,
}

impl From<&crate::allocation::StableAllocationHistory> for AllocationHistoryQuery {
    fn from(row: &crate::allocation::StableAllocationHistory) -> Self {
        Self {
            id: row.id,
            asset_id: row.asset_id,
            goal_id: row.goal_id,
            amount: row.amount.clone(),
            month: row.month.clone(),
            timestamp_ms: row.timestamp_ms,
        }
    }
}

/// Per-goal requirement summary
#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct GoalSummary {
    pub goal_id: u32,
    pub name: String,
    pub currency: String,
    pub target_amount: String,
    pub current_total: String,
    pub remaining: String,
    pub months_remaining: u32,
    pub required_monthly: String,
    pub status: GoalStatus,
    pub deadline_day: i64,
}

/// Monthly plan representation returned to callers
#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct MonthlyGoalPlanQuery {
    pub id: u32,
    pub goal_id: u32,
    pub month: String,
    pub required_monthly: String,
    pub remaining_amount: String,
    pub months_remaining: u32,
    pub currency: String,
    pub status: GoalStatus,
    pub state: PlanState,
    pub custom_amount: Option<String>,
    pub is_protected: bool,
    pub is_skipped: bool,
    pub effective_amount: String,
    pub created_at: u64,
    pub modified_at: u64,
}

impl From<&MonthlyGoalPlan> for MonthlyGoalPlanQuery {
    fn from(plan: &MonthlyGoalPlan) -> Self {
        Self {
            id: plan.id,
            goal_id: plan.goal_id,
            month: plan.month.clone(),
            required_monthly: decimal_to_string(plan.required_monthly),
            remaining_amount: decimal_to_string(plan.remaining_amount),
            months_remaining: plan.months_remaining,
            currency: plan.currency.clone(),
            status: plan.status,
            state: plan.state,
            custom_amount: plan.custom_amount.map(decimal_to_string),
            is_protected: plan.is_protected,
            is_skipped: plan.is_skipped,
            effective_amount: decimal_to_string(plan.effective_amount()),
            created_at: plan.created_at,
            modified_at: plan.modified_at,
        }
    }
}

/// Overrides applied to a draft or executing monthly plan
#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct PlanOverrides {
    pub is_protected: Option<bool>,
    pub is_skipped: Option<bool>,
    /// `Some(None)` clears a custom amount, `Some(Some(v))` sets it
    pub custom_amount: Option<Option<String>>,
}

impl PlanOverrides {
    pub fn parsed_custom_amount(&self) -> PlannerResult<Option<Option<rust_decimal::Decimal>>> {
        match &self.custom_amount {
            None => Ok(None),
            Some(inner) => Ok(Some(opt_string_to_decimal(inner)?)),
        }
    }
}

/// Execution record representation returned to callers
#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct ExecutionRecordQuery {
    pub id: u32,
    pub month: String,
    pub status: ExecutionStatus,
    pub goal_ids: Vec<u32>,
    pub started_at: Option<u64>,
    pub closed_at: Option<u64>,
    pub created_at: u64,
    pub modified_at: u64,
}

impl From<&ExecutionRecord> for ExecutionRecordQuery {
    fn from(record: &ExecutionRecord) -> Self {
        Self {
            id: record.id,
            month: record.month.clone(),
            status: record.status,
            goal_ids: record.goal_ids.clone(),
            started_at: record.started_at,
            closed_at: record.closed_at,
            created_at: record.created_at,
            modified_at: record.modified_at,
        }
    }
}

/// Per-goal outcome of a closed execution record
#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct ClosedGoalSummary {
    pub goal_id: u32,
    pub currency: String,
    pub planned: String,
    pub contributed: String,
}

/// Summary returned when an execution record closes
#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct CompletedSummary {
    pub record_id: u32,
    pub month: String,
    pub closed_at: u64,
    pub goals: Vec<ClosedGoalSummary>,
}

/// Per-goal remaining amount needed to fulfil the month's plan.
/// `amount` is `None` when the conversion rate could not be resolved.
#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct RemainingToClose {
    pub goal_id: u32,
    pub currency: String,
    pub amount: Option<String>,
}

/// Cached on-chain balance of an asset
#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct BalanceQuery {
    pub asset_id: u32,
    pub balance: String,
    pub fetched_at: u64,
    pub is_stale: bool,
}

/// A resolved conversion rate
#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct RateQuery {
    pub from: String,
    pub to: String,
    pub rate: String,
    pub fetched_at: u64,
}

/// Policy applied when a contribution diverges from plan
#[derive(CandidType, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContributionPolicy {
    /// Keep the monthly budget; surplus compresses the timeline
    FinishFaster,
    /// Spread the remainder evenly over the remaining payments
    LowerPayments,
}

/// Actionable ways out of an infeasible budget
#[derive(CandidType, Deserialize, Clone, Debug, PartialEq)]
pub enum FeasibilitySuggestion {
    IncreaseBudget { to: String, currency: String },
    ExtendDeadline { goal_id: u32, by_months: u32 },
    ReduceTarget { goal_id: u32, to: String },
    EditGoal { goal_id: u32 },
}

impl FeasibilitySuggestion {
    pub fn from_suggestion(suggestion: &planner::Suggestion, currency: &str) -> Self {
        match suggestion {
            planner::Suggestion::IncreaseBudget { to } => FeasibilitySuggestion::IncreaseBudget {
                to: decimal_to_string(*to),
                currency: currency.to_string(),
            },
            planner::Suggestion::ExtendDeadline { goal_id, by_months } => {
                FeasibilitySuggestion::ExtendDeadline {
                    goal_id: *goal_id,
                    by_months: *by_months,
                }
            }
            planner::Suggestion::ReduceTarget { goal_id, to } => {
                FeasibilitySuggestion::ReduceTarget {
                    goal_id: *goal_id,
                    to: decimal_to_string(*to),
                }
            }
            planner::Suggestion::EditGoal { goal_id } => {
                FeasibilitySuggestion::EditGoal { goal_id: *goal_id }
            }
        }
    }
}

/// A goal whose deadline cannot be met under the proposed budget
#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct InfeasibleGoalView {
    pub goal_id: u32,
    pub name: String,
    pub required: String,
    pub shortfall: String,
}

impl From<&planner::InfeasibleGoal> for InfeasibleGoalView {
    fn from(goal: &planner::InfeasibleGoal) -> Self {
        Self {
            goal_id: goal.goal_id,
            name: goal.name.clone(),
            required: decimal_to_string(goal.required),
            shortfall: decimal_to_string(goal.shortfall),
        }
    }
}

/// Feasibility verdict for a proposed budget
#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct FeasibilityCheck {
    pub budget: String,
    pub currency: String,
    pub feasible: bool,
    pub minimum_budget: String,
    pub leveled_budget: String,
    pub infeasible: Vec<InfeasibleGoalView>,
    pub suggestions: Vec<FeasibilitySuggestion>,
}

/// One goal's share of a scheduled payment
#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct PlannedContributionView {
    pub goal_id: u32,
    pub goal_name: String,
    pub amount: String,
    pub is_goal_start: bool,
    pub is_goal_complete: bool,
}

/// One payment date of a fixed-budget plan
#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct ScheduledPaymentView {
    pub payment_number: u32,
    /// Payment date as an epoch-day
    pub date_day: i64,
    pub contributions: Vec<PlannedContributionView>,
}

/// A generated fixed-budget plan
#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct FixedBudgetPlanView {
    pub monthly_budget: String,
    pub currency: String,
    pub generated_at: u64,
    pub payments: Vec<ScheduledPaymentView>,
    pub infeasible: Vec<InfeasibleGoalView>,
}

impl From<&planner::FixedBudgetPlan> for FixedBudgetPlanView {
    fn from(plan: &planner::FixedBudgetPlan) -> Self {
        Self {
            monthly_budget: decimal_to_string(plan.monthly_budget),
            currency: plan.currency.clone(),
            generated_at: plan.generated_at,
            payments: plan
                .payments
                .iter()
                .map(|payment| ScheduledPaymentView {
                    payment_number: payment.payment_number,
                    date_day: payment.date_day,
                    contributions: payment
                        .contributions
                        .iter()
                        .map(|c| PlannedContributionView {
                            goal_id: c.goal_id,
                            goal_name: c.goal_name.clone(),
                            amount: decimal_to_string(c.amount),
                            is_goal_start: c.is_goal_start,
                            is_goal_complete: c.is_goal_complete,
                        })
                        .collect(),
                })
                .collect(),
            infeasible: plan.infeasible.iter().map(InfeasibleGoalView::from).collect(),
        }
    }
}

/// Consecutive payments to one goal, aggregated for timeline rendering
#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct ScheduledGoalBlockView {
    pub goal_id: u32,
    pub goal_name: String,
    pub start_payment: u32,
    pub end_payment: u32,
    pub start_day: i64,
    pub end_day: i64,
    pub total_amount: String,
    pub payment_count: u32,
}

impl From<&planner::ScheduledGoalBlock> for ScheduledGoalBlockView {
    fn from(block: &planner::ScheduledGoalBlock) -> Self {
        Self {
            goal_id: block.goal_id,
            goal_name: block.goal_name.clone(),
            start_payment: block.start_payment,
            end_payment: block.end_payment,
            start_day: block.start_day,
            end_day: block.end_day,
            total_amount: decimal_to_string(block.total_amount),
            payment_count: block.payment_count,
        }
    }
}

/// Partial settings update; absent fields keep their current value
#[derive(CandidType, Deserialize, Clone, Debug, Default)]
pub struct SettingsInput {
    pub payment_day: Option<u32>,
    pub display_currency: Option<String>,
    pub execution_display_currency: Option<String>,
    pub notifications_enabled: Option<bool>,
    pub notification_days: Option<u32>,
    pub auto_start_enabled: Option<bool>,
    pub auto_complete_enabled: Option<bool>,
    pub undo_grace_period_hours: Option<u64>,
    /// `Some(None)` clears the persisted budget
    pub monthly_budget: Option<Option<String>>,
    pub budget_currency: Option<String>,
}

/// Settings snapshot returned to callers
#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct SettingsQuery {
    pub payment_day: u32,
    pub display_currency: String,
    pub execution_display_currency: String,
    pub notifications_enabled: bool,
    pub notification_days: u32,
    pub auto_start_enabled: bool,
    pub auto_complete_enabled: bool,
    pub undo_grace_period_hours: u64,
    pub monthly_budget: Option<String>,
    pub budget_currency: String,
    /// Monotonic tick bumped by every settings change
    pub tick: u64,
}
