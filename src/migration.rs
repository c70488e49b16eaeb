//! One-shot migration of legacy percentage allocations.
//!
//! Earlier releases stored allocations as a percentage of the asset's
//! balance. The migration freezes each percentage into a fixed amount at
//! the balance observed during the pass and never revises it afterwards;
//! price moves no longer change what a goal claims.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::allocation::{self, asset_balance};
use crate::journal::{JournalCollection, LogType};
use crate::state::MIGRATION_DONE;
use crate::utils::error::*;

/// A legacy percentage claim on an asset
#[derive(Clone, Debug)]
pub struct LegacyAllocation {
    pub asset_id: u32,
    pub goal_id: u32,
    /// Fraction of the asset's balance, in percent
    pub percentage: Decimal,
}

/// Converts legacy percentage allocations into fixed amounts.
///
/// Runs exactly once; each migrated row emits one history entry. Rows whose
/// (asset, goal) pair already holds a fixed allocation are skipped so a
/// partially migrated store can be completed safely.
pub fn migrate_legacy_allocations(
    rows: Vec<LegacyAllocation>,
    now_ms: u64,
) -> PlannerResult<u32> {
    if MIGRATION_DONE.with(|done| done.get()) {
        return Err(state_err("Legacy allocations were already migrated."));
    }

    let mut journal = JournalCollection::open(None);
    let mut migrated = 0;
    for row in rows {
        if row.percentage < Decimal::ZERO || row.percentage > dec!(100) {
            return Err(validation_err("Percentages must lie within [0, 100]."));
        }
        let fixed = asset_balance(row.asset_id) * row.percentage / dec!(100);
        match allocation::add_allocation(row.asset_id, row.goal_id, fixed, true, now_ms) {
            Ok(_) => {
                migrated += 1;
                journal.append_note(
                    Ok(()),
                    LogType::Allocation,
                    format!(
                        "Migrated a {}% claim on asset {} into a fixed amount for goal {}.",
                        row.percentage.normalize(),
                        row.asset_id,
                        row.goal_id
                    ),
                );
            }
            Err(PlannerError::DuplicateAllocation) => {}
            Err(err) => return Err(err),
        }
    }

    MIGRATION_DONE.with(|done| done.set(true));
    journal.append_note(
        Ok(()),
        LogType::Allocation,
        format!("Legacy allocation migration finished; {} rows migrated.", migrated),
    );
    Ok(migrated)
}
