//! Typed change events emitted by every state-changing operation.
//!
//! Subscribers (UIs, exporters) drain the queue; the core never couples to
//! them. Events that alter planner inputs also drop the cached plan.

use candid::CandidType;
use serde::Deserialize;

use crate::constants::MAX_PENDING_EVENTS;
use crate::model::ExecutionStatus;
use crate::planner::cache;
use crate::state::EVENTS;

/// A state change observable from the outside
#[derive(CandidType, Deserialize, Clone, Debug, PartialEq)]
pub enum ChangeEvent {
    GoalChanged { goal_id: u32 },
    AssetChanged { asset_id: u32 },
    TransactionRecorded { transaction_id: u32, asset_id: u32 },
    AllocationChanged { asset_id: u32, goal_id: u32 },
    MonthlyPlanChanged { month: String, goal_id: u32 },
    PlanRecomputed { currency: String },
    ExecutionChanged { record_id: u32, status: ExecutionStatus },
    SettingsChanged { tick: u64 },
}

impl ChangeEvent {
    /// Whether the event invalidates cached planner output
    fn touches_planner_inputs(&self) -> bool {
        !matches!(self, ChangeEvent::PlanRecomputed { .. })
    }
}

/// Queues an event, dropping the oldest entry when the queue is full
pub fn emit(event: ChangeEvent) {
    if event.touches_planner_inputs() {
        cache::invalidate();
    }
    EVENTS.with_borrow_mut(|queue| {
        if queue.len() >= MAX_PENDING_EVENTS {
            queue.pop_front();
        }
        queue.push_back(event);
    });
}

/// Returns all pending events and clears the queue
pub fn drain() -> Vec<ChangeEvent> {
    EVENTS.with_borrow_mut(|queue| queue.drain(..).collect())
}
