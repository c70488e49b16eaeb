#![deny(clippy::unwrap_used)]
#![allow(clippy::missing_const_for_thread_local)]

mod allocation;
mod calendar;
mod canister;
mod chain;
mod constants;
mod events;
mod execution;
mod journal;
mod migration;
mod model;
mod planner;
mod plans;
mod rates;
mod requirement;
mod settings;
mod state;
mod timers;
mod types;
mod utils;

pub use canister::SavingsPlanner;
use candid::CandidType;
use ic_exports::ic_kit::RejectionCode;
use serde::Deserialize;

/// Savings Planner Canister Result
pub type PlannerResult<T> = Result<T, PlannerError>;

/// Savings Planner Canister Errors
#[derive(Clone, CandidType, Debug, Deserialize, PartialEq)]
pub enum PlannerError {
    /// `CallResult` error
    CallResult(RejectionCode, String),
    /// Unauthorized access
    Unauthorized,
    /// A referenced entity does not exist
    NotFound(String),
    /// No conversion rate could be resolved for the pair and no stale value exists
    RateUnavailable {
        /// Source currency symbol
        from: String,
        /// Target currency symbol
        to: String,
    },
    /// The rate provider's request budget is exhausted
    RateLimited,
    /// The rate provider rejected the configured credentials
    ApiKeyMissing,
    /// Transient I/O failure
    NetworkError(String),
    /// A write would push the asset's total allocations above its balance
    OverAllocation {
        /// Asset whose balance is exceeded
        asset_id: u32,
        /// The asset's current balance
        balance: String,
        /// The total that the write would have produced
        requested: String,
    },
    /// A second allocation for the same (asset, goal) pair
    DuplicateAllocation,
    /// Rejected input with a human-readable reason
    Validation(String),
    /// An operation that is illegal in the entity's current state
    StateViolation(String),
    /// Decoding issue
    Decoding(String),
    /// Arithmetic error
    Arithmetic(String),
}

pub fn arithmetic_err<S: AsRef<str>>(s: S) -> PlannerError {
    PlannerError::Arithmetic(format!("{:#?}", s.as_ref()))
}

pub fn validation_err<S: AsRef<str>>(s: S) -> PlannerError {
    PlannerError::Validation(s.as_ref().to_string())
}

pub fn state_err<S: AsRef<str>>(s: S) -> PlannerError {
    PlannerError::StateViolation(s.as_ref().to_string())
}
