//! Domain model: the persisted entities the planner operates on.
//!
//! All monetary fields are `Decimal` in the entity's own currency. Timestamps
//! are UTC epoch milliseconds; date-only fields are epoch-days. Candid-facing
//! representations live in `types` and convert at the boundary.

use candid::CandidType;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::utils::error::*;

/// Goal lifecycle; only `Active` goals participate in planning
#[derive(CandidType, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum GoalLifecycle {
    Active,
    Cancelled,
    Finished,
    Deleted,
}

/// Reminder cadence
#[derive(CandidType, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReminderFrequency {
    Weekly,
    Biweekly,
    Monthly,
}

/// Reminder configuration; `Off` replaces the legacy "null time means off"
/// encoding
#[derive(CandidType, Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub enum Reminder {
    #[default]
    Off,
    On {
        frequency: ReminderFrequency,
        /// Minutes after UTC midnight
        minutes_after_midnight: u16,
        /// First reminder date as an epoch-day
        first_day: Option<i64>,
    },
}

/// A savings goal
#[derive(Clone, Debug, PartialEq)]
pub struct Goal {
    pub id: u32,
    pub name: String,
    pub currency: String,
    pub target_amount: Decimal,
    /// Deadline as an epoch-day
    pub deadline_day: i64,
    /// Start as an epoch-day; never after the deadline
    pub start_day: i64,
    pub lifecycle: GoalLifecycle,
    pub emoji: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
    pub reminder: Reminder,
    pub created_at: u64,
    pub modified_at: u64,
}

impl Goal {
    pub fn is_active(&self) -> bool {
        self.lifecycle == GoalLifecycle::Active
    }
}

/// On-chain reference of an asset; address and chain id are both set or the
/// asset is purely manual
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OnChainRef {
    /// Checksummed EVM address
    pub address: String,
    pub chain_id: u64,
    /// ERC-20 contract address; `None` reads the native balance
    pub token_contract: Option<String>,
    /// Token decimals used to scale raw balances
    pub decimals: u32,
}

/// An asset holding value in a single currency
#[derive(Clone, Debug, PartialEq)]
pub struct Asset {
    pub id: u32,
    pub currency: String,
    pub on_chain: Option<OnChainRef>,
    pub created_at: u64,
    pub modified_at: u64,
}

/// Where a transaction was recorded from
#[derive(CandidType, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransactionSource {
    Manual,
    OnChain,
    Import,
}

/// A signed balance movement on an asset
#[derive(Clone, Debug, PartialEq)]
pub struct Transaction {
    pub id: u32,
    pub asset_id: u32,
    /// Positive deposits, negative withdrawals
    pub amount: Decimal,
    pub date_ms: u64,
    pub source: TransactionSource,
    /// Unique when present; makes imports idempotent
    pub external_id: Option<String>,
    pub counterparty: Option<String>,
    pub comment: Option<String>,
}

/// A goal's fixed-amount claim on an asset's balance, in the asset's currency
#[derive(Clone, Debug, PartialEq)]
pub struct Allocation {
    pub id: u32,
    pub asset_id: u32,
    pub goal_id: u32,
    pub amount: Decimal,
}

/// Requirement status of a goal for a month
#[derive(CandidType, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum GoalStatus {
    Completed,
    OnTrack,
    Attention,
    Critical,
}

/// Lifecycle of a monthly plan row
#[derive(CandidType, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlanState {
    Draft,
    Executing,
    Completed,
}

/// Per-goal plan for one month; unique on `(month, goal_id)`
#[derive(Clone, Debug, PartialEq)]
pub struct MonthlyGoalPlan {
    pub id: u32,
    pub goal_id: u32,
    /// `YYYY-MM` label
    pub month: String,
    pub required_monthly: Decimal,
    pub remaining_amount: Decimal,
    pub months_remaining: u32,
    pub currency: String,
    pub status: GoalStatus,
    pub state: PlanState,
    pub custom_amount: Option<Decimal>,
    pub is_protected: bool,
    pub is_skipped: bool,
    pub created_at: u64,
    pub modified_at: u64,
}

impl MonthlyGoalPlan {
    /// Zero when skipped, otherwise the custom amount when set, otherwise the
    /// required monthly amount
    pub fn effective_amount(&self) -> Decimal {
        if self.is_skipped {
            Decimal::ZERO
        } else {
            self.custom_amount.unwrap_or(self.required_monthly)
        }
    }

    /// Flag and custom-amount edits are only legal before completion
    pub fn ensure_editable(&self) -> PlannerResult<()> {
        if self.state == PlanState::Completed {
            return Err(state_err("Completed monthly plans cannot be edited."));
        }
        Ok(())
    }
}

/// Lifecycle of an execution record
#[derive(CandidType, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionStatus {
    Draft,
    Executing,
    Closed,
}

/// Per-month execution state machine instance; unique on `month`
#[derive(Clone, Debug, PartialEq)]
pub struct ExecutionRecord {
    pub id: u32,
    /// `YYYY-MM` label
    pub month: String,
    pub status: ExecutionStatus,
    pub goal_ids: Vec<u32>,
    pub started_at: Option<u64>,
    pub closed_at: Option<u64>,
    pub created_at: u64,
    pub modified_at: u64,
}

/// A contribution accrued against an executing record, in the goal's currency
#[derive(Clone, Debug, PartialEq)]
pub struct CompletedExecution {
    pub id: u32,
    pub record_id: u32,
    pub goal_id: u32,
    pub amount: Decimal,
    pub created_at: u64,
    pub modified_at: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn plan(state: PlanState) -> MonthlyGoalPlan {
        MonthlyGoalPlan {
            id: 1,
            goal_id: 7,
            month: "2025-11".to_string(),
            required_monthly: dec!(120),
            remaining_amount: dec!(600),
            months_remaining: 5,
            currency: "USD".to_string(),
            status: GoalStatus::OnTrack,
            state,
            custom_amount: None,
            is_protected: false,
            is_skipped: false,
            created_at: 0,
            modified_at: 0,
        }
    }

    #[test]
    fn effective_amount_prefers_custom_then_required() {
        let mut row = plan(PlanState::Draft);
        assert_eq!(row.effective_amount(), dec!(120));
        row.custom_amount = Some(dec!(80));
        assert_eq!(row.effective_amount(), dec!(80));
        row.is_skipped = true;
        assert_eq!(row.effective_amount(), Decimal::ZERO);
    }

    #[test]
    fn completed_plans_reject_edits() {
        assert!(plan(PlanState::Draft).ensure_editable().is_ok());
        assert!(plan(PlanState::Executing).ensure_editable().is_ok());
        assert!(plan(PlanState::Completed).ensure_editable().is_err());
    }
}
