//! Allocation engine: maps asset balances onto goals.
//!
//! Allocations are fixed amounts in the asset's currency. When the amounts
//! claimed across goals exceed the asset's balance, every goal is funded
//! proportionally; a fully covered asset funds each allocation exactly.
//! Every state change appends at most one history row, and a change that
//! lands on the last recorded amount appends none.

use std::borrow::Cow;

use candid::{CandidType, Decode, Encode};
use ic_stable_structures::{storable::Bound, Storable};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

use crate::calendar::month_label;
use crate::constants::EPSILON;
use crate::events::{self, ChangeEvent};
use crate::model::{Allocation, GoalLifecycle, Transaction};
use crate::state::{next_id, ALLOCATIONS, ALLOCATION_HISTORY, ASSETS, GOALS, TRANSACTIONS};
use crate::utils::common::clamp_non_negative;
use crate::utils::error::*;
use crate::{chain, PlannerError};

/// Append-only record of one allocation change
#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct StableAllocationHistory {
    pub id: u32,
    pub asset_id: u32,
    pub goal_id: u32,
    /// Allocation amount after the change; `0` records a deletion
    pub amount: String,
    /// `YYYY-MM` label of the month the change landed in
    pub month: String,
    pub timestamp_ms: u64,
}

impl Storable for StableAllocationHistory {
    fn to_bytes(&self) -> Cow<[u8]> {
        Cow::Owned(Encode!(self).expect("Failed to encode allocation history."))
    }

    fn from_bytes(bytes: Cow<[u8]>) -> Self {
        Decode!(bytes.as_ref(), Self).expect("Failed to decode allocation history.")
    }

    const BOUND: Bound = Bound::Bounded {
        max_size: 256,
        is_fixed_size: false,
    };
}

/// The portion of an allocation currently backed by the asset's balance.
///
/// `ratio = min(1, balance / total_allocated)`; an uncovered asset funds all
/// goals proportionally, a covered one funds each allocation exactly.
pub fn funded_portion(amount: Decimal, balance: Decimal, total_allocated: Decimal) -> Decimal {
    if total_allocated <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let balance = clamp_non_negative(balance);
    let ratio = (balance / total_allocated).min(Decimal::ONE);
    amount * ratio
}

/// Sum of the asset's transactions
pub fn manual_balance(asset_id: u32) -> Decimal {
    TRANSACTIONS.with_borrow(|transactions| {
        transactions
            .values()
            .filter(|tx| tx.asset_id == asset_id)
            .map(|tx| tx.amount)
            .sum()
    })
}

/// Manual balance plus the cached on-chain balance
pub fn asset_balance(asset_id: u32) -> Decimal {
    let on_chain = chain::cached_balance(asset_id)
        .map(|entry| entry.balance)
        .unwrap_or(Decimal::ZERO);
    manual_balance(asset_id) + on_chain
}

/// Sum of all allocation amounts claiming the asset
pub fn total_allocated(asset_id: u32) -> Decimal {
    ALLOCATIONS.with_borrow(|allocations| {
        allocations
            .values()
            .filter(|allocation| allocation.asset_id == asset_id)
            .map(|allocation| allocation.amount)
            .sum()
    })
}

/// Whether the asset's allocations exceed its balance
pub fn is_over_allocated(asset_id: u32) -> bool {
    total_allocated(asset_id) > asset_balance(asset_id) + EPSILON
}

/// Funded portions of every allocation claiming the goal, with the asset's
/// currency
pub fn funded_portions_for_goal(goal_id: u32) -> Vec<(u32, String, Decimal)> {
    let rows: Vec<Allocation> = ALLOCATIONS.with_borrow(|allocations| {
        allocations
            .values()
            .filter(|allocation| allocation.goal_id == goal_id)
            .cloned()
            .collect()
    });
    rows.into_iter()
        .filter_map(|allocation| {
            let currency = ASSETS.with_borrow(|assets| {
                assets.get(&allocation.asset_id).map(|asset| asset.currency.clone())
            })?;
            let balance = asset_balance(allocation.asset_id);
            let total = total_allocated(allocation.asset_id);
            Some((
                allocation.asset_id,
                currency,
                funded_portion(allocation.amount, balance, total),
            ))
        })
        .collect()
}

/// Currency pairs the aggregation path will need, one per allocation whose
/// asset and goal currencies differ
pub fn conversion_pairs() -> Vec<(String, String)> {
    let rows: Vec<Allocation> =
        ALLOCATIONS.with_borrow(|allocations| allocations.values().cloned().collect());
    let mut pairs = Vec::new();
    for allocation in rows {
        let asset_currency = ASSETS.with_borrow(|assets| {
            assets.get(&allocation.asset_id).map(|asset| asset.currency.clone())
        });
        let goal_currency = GOALS.with_borrow(|goals| {
            goals.get(&allocation.goal_id).map(|goal| goal.currency.clone())
        });
        if let (Some(from), Some(to)) = (asset_currency, goal_currency) {
            if from != to && !pairs.contains(&(from.clone(), to.clone())) {
                pairs.push((from, to));
            }
        }
    }
    pairs
}

fn existing_pair(asset_id: u32, goal_id: u32) -> Option<Allocation> {
    ALLOCATIONS.with_borrow(|allocations| {
        allocations
            .values()
            .find(|allocation| allocation.asset_id == asset_id && allocation.goal_id == goal_id)
            .cloned()
    })
}

fn ensure_endpoints(asset_id: u32, goal_id: u32) -> PlannerResult<()> {
    let asset_exists = ASSETS.with_borrow(|assets| assets.contains_key(&asset_id));
    if !asset_exists {
        return Err(PlannerError::NotFound(format!("Asset {} does not exist.", asset_id)));
    }
    let goal_alive = GOALS.with_borrow(|goals| {
        goals
            .get(&goal_id)
            .map(|goal| goal.lifecycle != GoalLifecycle::Deleted)
            .unwrap_or(false)
    });
    if !goal_alive {
        return Err(PlannerError::NotFound(format!("Goal {} does not exist.", goal_id)));
    }
    Ok(())
}

fn ensure_within_balance(
    asset_id: u32,
    new_total: Decimal,
    allow_over_allocation: bool,
) -> PlannerResult<()> {
    let balance = asset_balance(asset_id);
    if new_total > balance + EPSILON && !allow_over_allocation {
        return Err(PlannerError::OverAllocation {
            asset_id,
            balance: balance.normalize().to_string(),
            requested: new_total.normalize().to_string(),
        });
    }
    Ok(())
}

/// Last recorded amount for the pair, scanning the history backwards
fn last_recorded_amount(asset_id: u32, goal_id: u32) -> Option<Decimal> {
    ALLOCATION_HISTORY.with_borrow(|history| {
        let len = history.len();
        for index in (0..len).rev() {
            if let Some(row) = history.get(index) {
                if row.asset_id == asset_id && row.goal_id == goal_id {
                    return Decimal::from_str_exact(&row.amount).ok();
                }
            }
        }
        None
    })
}

/// Appends a history row unless the amount equals the last recorded one.
/// Returns whether a row was written.
pub fn record_history(
    asset_id: u32,
    goal_id: u32,
    amount: Decimal,
    timestamp_ms: u64,
) -> PlannerResult<bool> {
    if last_recorded_amount(asset_id, goal_id) == Some(amount.normalize()) {
        return Ok(false);
    }
    let row = StableAllocationHistory {
        id: next_id(),
        asset_id,
        goal_id,
        amount: amount.normalize().to_string(),
        month: month_label(timestamp_ms)?,
        timestamp_ms,
    };
    ALLOCATION_HISTORY.with_borrow_mut(|history| {
        history
            .push(&row)
            .map_err(|err| PlannerError::Decoding(format!("{:#?}", err)))
    })?;
    Ok(true)
}

/// Creates a new allocation; the (asset, goal) pair must not exist yet.
pub fn add_allocation(
    asset_id: u32,
    goal_id: u32,
    amount: Decimal,
    allow_over_allocation: bool,
    now_ms: u64,
) -> PlannerResult<Allocation> {
    if amount < Decimal::ZERO {
        return Err(validation_err("Allocation amounts cannot be negative."));
    }
    ensure_endpoints(asset_id, goal_id)?;
    if existing_pair(asset_id, goal_id).is_some() {
        return Err(PlannerError::DuplicateAllocation);
    }
    ensure_within_balance(asset_id, total_allocated(asset_id) + amount, allow_over_allocation)?;

    let allocation = Allocation {
        id: next_id(),
        asset_id,
        goal_id,
        amount,
    };
    ALLOCATIONS.with_borrow_mut(|allocations| {
        allocations.insert(allocation.id, allocation.clone());
    });
    record_history(asset_id, goal_id, amount, now_ms)?;
    events::emit(ChangeEvent::AllocationChanged { asset_id, goal_id });
    Ok(allocation)
}

/// Updates the amount of an existing allocation.
pub fn update_allocation(
    asset_id: u32,
    goal_id: u32,
    amount: Decimal,
    allow_over_allocation: bool,
    now_ms: u64,
) -> PlannerResult<Allocation> {
    if amount < Decimal::ZERO {
        return Err(validation_err("Allocation amounts cannot be negative."));
    }
    ensure_endpoints(asset_id, goal_id)?;
    let current = existing_pair(asset_id, goal_id).ok_or_else(|| {
        PlannerError::NotFound("No allocation exists for this asset and goal.".to_string())
    })?;
    let new_total = total_allocated(asset_id) - current.amount + amount;
    ensure_within_balance(asset_id, new_total, allow_over_allocation)?;

    let updated = Allocation {
        amount,
        ..current
    };
    ALLOCATIONS.with_borrow_mut(|allocations| {
        allocations.insert(updated.id, updated.clone());
    });
    record_history(asset_id, goal_id, amount, now_ms)?;
    events::emit(ChangeEvent::AllocationChanged { asset_id, goal_id });
    Ok(updated)
}

/// Removes an allocation, recording the deletion as a zero-amount row.
pub fn remove_allocation(asset_id: u32, goal_id: u32, now_ms: u64) -> PlannerResult<()> {
    let current = existing_pair(asset_id, goal_id).ok_or_else(|| {
        PlannerError::NotFound("No allocation exists for this asset and goal.".to_string())
    })?;
    ALLOCATIONS.with_borrow_mut(|allocations| {
        allocations.remove(&current.id);
    });
    record_history(asset_id, goal_id, Decimal::ZERO, now_ms)?;
    events::emit(ChangeEvent::AllocationChanged { asset_id, goal_id });
    Ok(())
}

/// Tolerance for matching deposits against the unallocated excess
fn dedication_tolerance(unallocated: Decimal, deposits: Decimal) -> Decimal {
    EPSILON.max(unallocated.max(deposits) * dec!(0.000001))
}

/// Dedicated auto-allocation: an asset claimed by exactly one goal absorbs
/// on-chain deposits that match its unallocated excess, extending the
/// allocation and emitting one history row per deposit.
///
/// Returns whether the allocation was extended.
pub fn auto_allocate_deposits(asset_id: u32, deposits: &[Transaction]) -> PlannerResult<bool> {
    let mut claims: Vec<Allocation> = ALLOCATIONS.with_borrow(|allocations| {
        allocations
            .values()
            .filter(|allocation| allocation.asset_id == asset_id)
            .cloned()
            .collect()
    });
    if claims.len() != 1 {
        return Ok(false);
    }
    let allocation = claims.remove(0);
    let goal_active = GOALS.with_borrow(|goals| {
        goals
            .get(&allocation.goal_id)
            .map(|goal| goal.is_active())
            .unwrap_or(false)
    });
    if !goal_active {
        return Ok(false);
    }

    let deposit_rows: Vec<&Transaction> = deposits
        .iter()
        .filter(|tx| tx.asset_id == asset_id && tx.amount > Decimal::ZERO)
        .collect();
    let deposit_total: Decimal = deposit_rows.iter().map(|tx| tx.amount).sum();
    if deposit_total <= Decimal::ZERO {
        return Ok(false);
    }

    let unallocated = asset_balance(asset_id) - total_allocated(asset_id);
    if (unallocated - deposit_total).abs() > dedication_tolerance(unallocated, deposit_total) {
        return Ok(false);
    }

    let mut amount = allocation.amount;
    for deposit in deposit_rows {
        amount += deposit.amount;
        record_history(asset_id, allocation.goal_id, amount, deposit.date_ms)?;
    }
    ALLOCATIONS.with_borrow_mut(|allocations| {
        if let Some(row) = allocations.get_mut(&allocation.id) {
            row.amount = amount;
        }
    });
    events::emit(ChangeEvent::AllocationChanged {
        asset_id,
        goal_id: allocation.goal_id,
    });
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Asset, Goal, Reminder, TransactionSource};
    use proptest::prelude::*;

    fn seed_endpoints(asset_id: u32, goal_id: u32, balance: Decimal) {
        ASSETS.with_borrow_mut(|assets| {
            assets.insert(
                asset_id,
                Asset {
                    id: asset_id,
                    currency: "USD".to_string(),
                    on_chain: None,
                    created_at: 0,
                    modified_at: 0,
                },
            );
        });
        GOALS.with_borrow_mut(|goals| {
            goals.insert(
                goal_id,
                Goal {
                    id: goal_id,
                    name: "seed".to_string(),
                    currency: "USD".to_string(),
                    target_amount: dec!(1000),
                    deadline_day: 21_000,
                    start_day: 20_000,
                    lifecycle: GoalLifecycle::Active,
                    emoji: None,
                    description: None,
                    link: None,
                    reminder: Reminder::Off,
                    created_at: 0,
                    modified_at: 0,
                },
            );
        });
        TRANSACTIONS.with_borrow_mut(|transactions| {
            transactions.insert(
                900,
                Transaction {
                    id: 900,
                    asset_id,
                    amount: balance,
                    date_ms: 0,
                    source: TransactionSource::Manual,
                    external_id: None,
                    counterparty: None,
                    comment: None,
                },
            );
        });
    }

    fn history_rows(asset_id: u32, goal_id: u32) -> Vec<String> {
        ALLOCATION_HISTORY.with_borrow(|history| {
            history
                .iter()
                .filter(|row| row.asset_id == asset_id && row.goal_id == goal_id)
                .map(|row| row.amount.clone())
                .collect()
        })
    }

    #[test]
    fn unchanged_amounts_write_no_history() {
        seed_endpoints(1, 2, dec!(500));
        add_allocation(1, 2, dec!(200), false, 1_000).expect("adds");
        // writing the amount already on record is suppressed
        update_allocation(1, 2, dec!(200), false, 2_000).expect("updates");
        update_allocation(1, 2, dec!(200.00), false, 3_000).expect("updates");
        assert_eq!(history_rows(1, 2), vec!["200".to_string()]);

        update_allocation(1, 2, dec!(300), false, 4_000).expect("updates");
        remove_allocation(1, 2, 5_000).expect("removes");
        assert_eq!(
            history_rows(1, 2),
            vec!["200".to_string(), "300".to_string(), "0".to_string()]
        );
    }

    #[test]
    fn over_allocation_needs_the_override_flag() {
        seed_endpoints(3, 4, dec!(100));
        assert!(matches!(
            add_allocation(3, 4, dec!(150), false, 1_000),
            Err(PlannerError::OverAllocation { .. })
        ));
        add_allocation(3, 4, dec!(150), true, 1_000).expect("flagged write goes through");
        assert!(is_over_allocated(3));
    }

    #[test]
    fn duplicate_pairs_are_rejected() {
        seed_endpoints(5, 6, dec!(500));
        add_allocation(5, 6, dec!(100), false, 1_000).expect("adds");
        assert_eq!(
            add_allocation(5, 6, dec!(50), false, 2_000),
            Err(PlannerError::DuplicateAllocation)
        );
    }

    #[test]
    fn dedicated_deposits_extend_the_single_allocation() {
        seed_endpoints(7, 8, dec!(500));
        add_allocation(7, 8, dec!(500), false, 1_000).expect("adds");
        // two deposits arrive, exactly the new unallocated excess
        let deposits = vec![
            Transaction {
                id: 901,
                asset_id: 7,
                amount: dec!(30),
                date_ms: 2_000,
                source: TransactionSource::OnChain,
                external_id: None,
                counterparty: None,
                comment: None,
            },
            Transaction {
                id: 902,
                asset_id: 7,
                amount: dec!(20),
                date_ms: 3_000,
                source: TransactionSource::OnChain,
                external_id: None,
                counterparty: None,
                comment: None,
            },
        ];
        TRANSACTIONS.with_borrow_mut(|transactions| {
            for tx in &deposits {
                transactions.insert(tx.id, tx.clone());
            }
        });
        assert!(auto_allocate_deposits(7, &deposits).expect("absorbs"));
        assert_eq!(total_allocated(7), dec!(550));
        // one history row per deposit, on top of the initial write
        assert_eq!(
            history_rows(7, 8),
            vec!["500".to_string(), "530".to_string(), "550".to_string()]
        );
    }

    #[test]
    fn proportional_funding_splits_the_balance() {
        // 10 BTC backing 12 BTC of claims funds goals at a 10/12 ratio
        let balance = dec!(10);
        let total = dec!(12);
        let first = funded_portion(dec!(8), balance, total);
        let second = funded_portion(dec!(4), balance, total);
        assert_eq!(first.round_dp(4), dec!(6.6667));
        assert_eq!(second.round_dp(4), dec!(3.3333));
        assert!((first + second - balance).abs() <= EPSILON);
    }

    #[test]
    fn covered_assets_fund_allocations_exactly() {
        assert_eq!(funded_portion(dec!(8), dec!(20), dec!(12)), dec!(8));
    }

    #[test]
    fn negative_balances_fund_nothing() {
        assert_eq!(funded_portion(dec!(8), dec!(-3), dec!(8)), Decimal::ZERO);
    }

    #[test]
    fn dedication_tolerance_scales_with_the_amounts() {
        assert_eq!(dedication_tolerance(Decimal::ZERO, Decimal::ZERO), EPSILON);
        assert_eq!(dedication_tolerance(dec!(2000000), dec!(1)), dec!(2));
    }

    proptest! {
        /// Σ funded ≤ balance, with equality iff the claims cover the balance
        #[test]
        fn funding_law(
            balance in 0u64..1_000_000,
            first in 0u64..1_000_000,
            second in 0u64..1_000_000,
        ) {
            prop_assume!(first + second > 0);
            let balance = Decimal::from(balance);
            let first = Decimal::from(first);
            let second = Decimal::from(second);
            let total = first + second;
            let funded = funded_portion(first, balance, total)
                + funded_portion(second, balance, total);
            prop_assert!(funded <= balance + EPSILON);
            if total >= balance {
                prop_assert!((funded - balance).abs() <= EPSILON);
            } else {
                prop_assert!((funded - total).abs() <= EPSILON);
            }
        }
    }
}
