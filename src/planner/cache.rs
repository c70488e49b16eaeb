//! Input-keyed cache for the last generated plan

use rust_decimal::Decimal;

use super::FixedBudgetPlan;
use crate::constants::{PLAN_CACHE_BUDGET_TOLERANCE, PLAN_CACHE_TTL_MS};
use crate::state::PLAN_CACHE;

/// The last generated plan together with its cache key
#[derive(Clone, Debug)]
pub struct CachedPlan {
    /// Sorted ids of the goals the plan covers
    pub goal_ids: Vec<u32>,
    pub budget: Decimal,
    pub currency: String,
    pub cached_at: u64,
    pub plan: FixedBudgetPlan,
}

/// Returns the cached plan when the inputs match: the same goal set, a
/// budget within a cent, the same currency, and an age below the TTL.
pub fn lookup(goal_ids: &[u32], budget: Decimal, currency: &str, now_ms: u64) -> Option<FixedBudgetPlan> {
    let mut sorted = goal_ids.to_vec();
    sorted.sort_unstable();
    PLAN_CACHE.with_borrow(|slot| {
        let cached = slot.as_ref()?;
        if cached.goal_ids != sorted
            || cached.currency != currency
            || (cached.budget - budget).abs() > PLAN_CACHE_BUDGET_TOLERANCE
            || now_ms.saturating_sub(cached.cached_at) > PLAN_CACHE_TTL_MS
        {
            return None;
        }
        Some(cached.plan.clone())
    })
}

/// Replaces the cached plan
pub fn store(goal_ids: &[u32], budget: Decimal, currency: &str, now_ms: u64, plan: &FixedBudgetPlan) {
    let mut sorted = goal_ids.to_vec();
    sorted.sort_unstable();
    PLAN_CACHE.with_borrow_mut(|slot| {
        *slot = Some(CachedPlan {
            goal_ids: sorted,
            budget,
            currency: currency.to_string(),
            cached_at: now_ms,
            plan: plan.clone(),
        });
    });
}

/// Drops the cached plan; called on every edit of the planner's inputs
pub fn invalidate() {
    PLAN_CACHE.with_borrow_mut(|slot| *slot = None);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn plan(budget: Decimal) -> FixedBudgetPlan {
        FixedBudgetPlan {
            monthly_budget: budget,
            currency: "USD".to_string(),
            generated_at: 42,
            payments: vec![],
            infeasible: vec![],
        }
    }

    #[test]
    fn identical_inputs_hit_within_the_ttl() {
        let stored = plan(dec!(300));
        store(&[2, 1], dec!(300), "USD", 1_000, &stored);
        // the key ignores goal ordering and cent-level budget jitter
        let hit = lookup(&[1, 2], dec!(300.004), "USD", 2_000).expect("hits");
        assert_eq!(hit, stored);
    }

    #[test]
    fn mismatched_inputs_or_expiry_miss() {
        store(&[1, 2], dec!(300), "USD", 1_000, &plan(dec!(300)));
        assert!(lookup(&[1, 3], dec!(300), "USD", 2_000).is_none());
        assert!(lookup(&[1, 2], dec!(301), "USD", 2_000).is_none());
        assert!(lookup(&[1, 2], dec!(300), "EUR", 2_000).is_none());
        assert!(lookup(&[1, 2], dec!(300), "USD", 1_000 + PLAN_CACHE_TTL_MS + 1).is_none());
    }

    #[test]
    fn invalidation_clears_the_slot() {
        store(&[1], dec!(300), "USD", 1_000, &plan(dec!(300)));
        invalidate();
        assert!(lookup(&[1], dec!(300), "USD", 1_001).is_none());
    }
}
