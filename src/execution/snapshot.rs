//! Immutable execution snapshots.
//!
//! One row per (record, goal), written exactly once when the record starts
//! and never touched again; undo reopens a record against the original
//! snapshots.

use std::borrow::Cow;

use candid::{CandidType, Decode, Encode};
use ic_stable_structures::{storable::Bound, Storable};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::state::EXECUTION_SNAPSHOTS;
use crate::utils::common::string_to_decimal;
use crate::utils::error::*;

/// A goal's frozen state at the moment execution started
#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct StableExecutionSnapshot {
    pub id: u32,
    pub record_id: u32,
    pub goal_id: u32,
    pub goal_name: String,
    pub currency: String,
    pub target_amount: String,
    /// Aggregated total at the moment the record started
    pub current_total: String,
    pub required_amount: String,
    pub is_protected: bool,
    pub is_skipped: bool,
    pub custom_amount: Option<String>,
}

impl Storable for StableExecutionSnapshot {
    fn to_bytes(&self) -> Cow<[u8]> {
        Cow::Owned(Encode!(self).expect("Failed to encode snapshot."))
    }

    fn from_bytes(bytes: Cow<[u8]>) -> Self {
        Decode!(bytes.as_ref(), Self).expect("Failed to decode snapshot.")
    }

    const BOUND: Bound = Bound::Bounded {
        max_size: 1_024,
        is_fixed_size: false,
    };
}

impl StableExecutionSnapshot {
    /// The amount the month plans to put toward this goal: zero when
    /// skipped, else the custom amount when set, else the requirement.
    pub fn effective_amount(&self) -> PlannerResult<Decimal> {
        if self.is_skipped {
            return Ok(Decimal::ZERO);
        }
        match &self.custom_amount {
            Some(amount) => string_to_decimal(amount),
            None => string_to_decimal(&self.required_amount),
        }
    }
}

/// Appends a snapshot row
pub fn push_snapshot(snapshot: &StableExecutionSnapshot) -> PlannerResult<()> {
    EXECUTION_SNAPSHOTS.with_borrow_mut(|snapshots| {
        snapshots
            .push(snapshot)
            .map_err(|err| PlannerError::Decoding(format!("{:#?}", err)))
    })
}

/// All snapshots of a record, in insertion order
pub fn snapshots_for_record(record_id: u32) -> Vec<StableExecutionSnapshot> {
    EXECUTION_SNAPSHOTS.with_borrow(|snapshots| {
        snapshots
            .iter()
            .filter(|snapshot| snapshot.record_id == record_id)
            .collect()
    })
}
