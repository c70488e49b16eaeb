//! The canister's public methods

use ic_canister::{generate_idl, query, update, Canister, Idl, PreUpdate};
use ic_exports::{candid::Principal, ic_cdk::caller};
use rust_decimal::Decimal;

use crate::allocation::{self, conversion_pairs};
use crate::calendar::{ms_to_date, PaymentCalendar};
use crate::chain;
use crate::events::{self, ChangeEvent};
use crate::execution::record as execution;
use crate::execution::snapshot::{snapshots_for_record, StableExecutionSnapshot};
use crate::journal::{JournalCollection, LogType, StableJournalCollection};
use crate::migration::{self, LegacyAllocation};
use crate::model::*;
use crate::planner::{self, cache, PlannedGoal};
use crate::plans;
use crate::rates::{self, CachedRates};
use crate::settings::PlanningSettings;
use crate::state::*;
use crate::timers;
use crate::types::*;
use crate::utils::common::*;
use crate::utils::error::*;

#[derive(Canister)]
pub struct SavingsPlanner {
    #[id]
    id: Principal,
}

impl PreUpdate for SavingsPlanner {}

impl SavingsPlanner {
    // ---------------------------------------------------------------- goals

    #[update]
    pub async fn create_goal(&self, input: GoalInput) -> PlannerResult<GoalQuery> {
        only_controller(caller())?;
        let goal = input.into_goal(next_id(), now_ms())?;
        GOALS.with_borrow_mut(|goals| {
            goals.insert(goal.id, goal.clone());
        });
        events::emit(ChangeEvent::GoalChanged { goal_id: goal.id });
        Ok(GoalQuery::from(&goal))
    }

    #[update]
    pub async fn update_goal(&self, goal_id: u32, input: GoalInput) -> PlannerResult<GoalQuery> {
        only_controller(caller())?;
        let now = now_ms();
        let parsed = input.into_goal(goal_id, now)?;
        let updated = GOALS.with_borrow_mut(|goals| {
            let goal = goals
                .get_mut(&goal_id)
                .ok_or_else(|| PlannerError::NotFound(format!("Goal {} does not exist.", goal_id)))?;
            goal.name = parsed.name;
            goal.currency = parsed.currency;
            goal.target_amount = parsed.target_amount;
            goal.deadline_day = parsed.deadline_day;
            goal.start_day = parsed.start_day;
            goal.emoji = parsed.emoji;
            goal.description = parsed.description;
            goal.link = parsed.link;
            goal.reminder = parsed.reminder;
            goal.modified_at = now;
            Ok::<GoalQuery, PlannerError>(GoalQuery::from(&*goal))
        })?;
        events::emit(ChangeEvent::GoalChanged { goal_id });
        Ok(updated)
    }

    /// Moves a goal through its lifecycle. Deleting a goal releases every
    /// allocation claiming it.
    #[update]
    pub async fn set_goal_lifecycle(
        &self,
        goal_id: u32,
        lifecycle: GoalLifecycle,
    ) -> PlannerResult<GoalQuery> {
        only_controller(caller())?;
        let now = now_ms();
        let updated = GOALS.with_borrow_mut(|goals| {
            let goal = goals
                .get_mut(&goal_id)
                .ok_or_else(|| PlannerError::NotFound(format!("Goal {} does not exist.", goal_id)))?;
            goal.lifecycle = lifecycle;
            goal.modified_at = now;
            Ok::<GoalQuery, PlannerError>(GoalQuery::from(&*goal))
        })?;
        if lifecycle == GoalLifecycle::Deleted {
            let claims: Vec<u32> = ALLOCATIONS.with_borrow(|allocations| {
                allocations
                    .values()
                    .filter(|allocation| allocation.goal_id == goal_id)
                    .map(|allocation| allocation.asset_id)
                    .collect()
            });
            for asset_id in claims {
                allocation::remove_allocation(asset_id, goal_id, now)?;
            }
        }
        events::emit(ChangeEvent::GoalChanged { goal_id });
        Ok(updated)
    }

    #[query]
    pub fn get_goals(&self) -> Vec<GoalQuery> {
        GOALS.with_borrow(|goals| {
            let mut rows: Vec<GoalQuery> = goals.values().map(GoalQuery::from).collect();
            rows.sort_by_key(|goal| goal.id);
            rows
        })
    }

    // --------------------------------------------------------------- assets

    #[update]
    pub async fn create_asset(&self, input: AssetInput) -> PlannerResult<AssetQuery> {
        only_controller(caller())?;
        if input.currency.trim().is_empty() {
            return Err(validation_err("Asset currencies cannot be blank."));
        }
        let on_chain = match input.on_chain {
            Some(reference) => {
                chain::string_to_address(&reference.address)?;
                if reference.chain_id != crate::constants::CHAIN_ID {
                    return Err(validation_err("This chain is not supported by the build."));
                }
                let duplicate = ASSETS.with_borrow(|assets| {
                    assets.values().any(|asset| {
                        asset
                            .on_chain
                            .as_ref()
                            .map(|existing| existing.address == reference.address)
                            .unwrap_or(false)
                    })
                });
                if duplicate {
                    return Err(validation_err("Another asset already uses this address."));
                }
                Some(OnChainRef {
                    address: reference.address,
                    chain_id: reference.chain_id,
                    token_contract: reference.token_contract,
                    decimals: reference.decimals,
                })
            }
            None => None,
        };
        let now = now_ms();
        let asset = Asset {
            id: next_id(),
            currency: input.currency.trim().to_uppercase(),
            on_chain,
            created_at: now,
            modified_at: now,
        };
        ASSETS.with_borrow_mut(|assets| {
            assets.insert(asset.id, asset.clone());
        });
        events::emit(ChangeEvent::AssetChanged { asset_id: asset.id });
        Ok(AssetQuery::from(&asset))
    }

    /// Deletes an asset with no remaining allocations, together with its
    /// transactions.
    #[update]
    pub async fn delete_asset(&self, asset_id: u32) -> PlannerResult<()> {
        only_controller(caller())?;
        let exists = ASSETS.with_borrow(|assets| assets.contains_key(&asset_id));
        if !exists {
            return Err(PlannerError::NotFound(format!("Asset {} does not exist.", asset_id)));
        }
        let claimed = ALLOCATIONS.with_borrow(|allocations| {
            allocations.values().any(|allocation| allocation.asset_id == asset_id)
        });
        if claimed {
            return Err(validation_err(
                "Release the asset's allocations before deleting it.",
            ));
        }
        ASSETS.with_borrow_mut(|assets| {
            assets.remove(&asset_id);
        });
        TRANSACTIONS.with_borrow_mut(|transactions| {
            transactions.retain(|_, tx| tx.asset_id != asset_id);
        });
        ONCHAIN_CACHE.with_borrow_mut(|cache| {
            cache.remove(&asset_id);
        });
        events::emit(ChangeEvent::AssetChanged { asset_id });
        Ok(())
    }

    #[query]
    pub fn get_assets(&self) -> Vec<AssetQuery> {
        ASSETS.with_borrow(|assets| {
            let mut rows: Vec<AssetQuery> = assets.values().map(AssetQuery::from).collect();
            rows.sort_by_key(|asset| asset.id);
            rows
        })
    }

    #[update]
    pub async fn refresh_on_chain_balance(
        &self,
        asset_id: u32,
        force_refresh: bool,
    ) -> PlannerResult<BalanceQuery> {
        only_controller(caller())?;
        let asset = ASSETS
            .with_borrow(|assets| assets.get(&asset_id).cloned())
            .ok_or_else(|| PlannerError::NotFound(format!("Asset {} does not exist.", asset_id)))?;
        let reading = chain::get_balance(&asset, force_refresh).await?;
        Ok(BalanceQuery {
            asset_id,
            balance: decimal_to_string(reading.balance),
            fetched_at: reading.fetched_at,
            is_stale: reading.is_stale,
        })
    }

    // --------------------------------------------------------- transactions

    #[update]
    pub async fn record_transaction(
        &self,
        input: TransactionInput,
    ) -> PlannerResult<TransactionQuery> {
        only_controller(caller())?;
        let mut recorded = self.record_batch(vec![input])?;
        recorded
            .pop()
            .ok_or_else(|| arithmetic_err("Transaction batch returned no rows."))
    }

    /// Records a batch of transactions. Entries whose external id was seen
    /// before return the stored row instead of a duplicate.
    #[update]
    pub async fn record_transactions(
        &self,
        inputs: Vec<TransactionInput>,
    ) -> PlannerResult<Vec<TransactionQuery>> {
        only_controller(caller())?;
        self.record_batch(inputs)
    }

    #[query]
    pub fn get_transactions(&self, asset_id: Option<u32>) -> Vec<TransactionQuery> {
        TRANSACTIONS.with_borrow(|transactions| {
            let mut rows: Vec<TransactionQuery> = transactions
                .values()
                .filter(|tx| asset_id.map(|id| tx.asset_id == id).unwrap_or(true))
                .map(TransactionQuery::from)
                .collect();
            rows.sort_by_key(|tx| (tx.date_ms, tx.id));
            rows
        })
    }

    // ---------------------------------------------------------- allocations

    #[update]
    pub async fn add_allocation(&self, input: AllocationInput) -> PlannerResult<AllocationQuery> {
        only_controller(caller())?;
        let amount = string_to_decimal(&input.amount)?;
        let allocation = allocation::add_allocation(
            input.asset_id,
            input.goal_id,
            amount,
            input.allow_over_allocation,
            now_ms(),
        )?;
        Ok(AllocationQuery::from(&allocation))
    }

    #[update]
    pub async fn update_allocation(
        &self,
        input: AllocationInput,
    ) -> PlannerResult<AllocationQuery> {
        only_controller(caller())?;
        let amount = string_to_decimal(&input.amount)?;
        let allocation = allocation::update_allocation(
            input.asset_id,
            input.goal_id,
            amount,
            input.allow_over_allocation,
            now_ms(),
        )?;
        Ok(AllocationQuery::from(&allocation))
    }

    #[update]
    pub async fn remove_allocation(&self, asset_id: u32, goal_id: u32) -> PlannerResult<()> {
        only_controller(caller())?;
        allocation::remove_allocation(asset_id, goal_id, now_ms())
    }

    #[query]
    pub fn get_allocations(&self) -> Vec<AllocationQuery> {
        ALLOCATIONS.with_borrow(|allocations| {
            let mut rows: Vec<AllocationQuery> =
                allocations.values().map(AllocationQuery::from).collect();
            rows.sort_by_key(|allocation| allocation.id);
            rows
        })
    }

    #[query]
    pub fn get_allocation_history(&self, depth: u64) -> Vec<AllocationHistoryQuery> {
        ALLOCATION_HISTORY.with_borrow(|history| {
            let len = history.len();
            let start = len.saturating_sub(depth);
            (start..len)
                .filter_map(|index| history.get(index))
                .map(|row| AllocationHistoryQuery::from(&row))
                .collect()
        })
    }

    #[update]
    pub async fn migrate_legacy_allocations(
        &self,
        rows: Vec<LegacyAllocationInput>,
    ) -> PlannerResult<u32> {
        only_controller(caller())?;
        let parsed = rows
            .into_iter()
            .map(|row| {
                Ok(LegacyAllocation {
                    asset_id: row.asset_id,
                    goal_id: row.goal_id,
                    percentage: string_to_decimal(&row.percentage)?,
                })
            })
            .collect::<PlannerResult<Vec<LegacyAllocation>>>()?;
        migration::migrate_legacy_allocations(parsed, now_ms())
    }

    // ---------------------------------------------------------------- rates

    #[update]
    pub async fn fetch_rate(&self, from: String, to: String) -> PlannerResult<String> {
        let rate = rates::fetch_rate(&from, &to).await?;
        Ok(decimal_to_string(rate))
    }

    #[query]
    pub fn get_cached_rate(&self, from: String, to: String) -> Option<RateQuery> {
        rates::cached_rate(&from, &to).map(|cached| RateQuery {
            from: from.to_uppercase(),
            to: to.to_uppercase(),
            rate: decimal_to_string(cached.rate),
            fetched_at: cached.fetched_at,
        })
    }

    #[query]
    pub fn has_valid_rate_configuration(&self) -> bool {
        rates::has_valid_configuration()
    }

    // ----------------------------------------------------------- summaries

    /// Requirement summaries for every active goal, in each goal's own
    /// currency.
    #[update]
    pub async fn get_goal_summaries(&self) -> PlannerResult<Vec<GoalSummary>> {
        rates::warm_pairs(conversion_pairs()).await;
        let calendar = PaymentCalendar::new(settings_snapshot().payment_day);
        let now = ms_to_date(now_ms())?;
        let goals: Vec<Goal> = GOALS.with_borrow(|goals| {
            let mut rows: Vec<Goal> = goals.values().filter(|g| g.is_active()).cloned().collect();
            rows.sort_by_key(|goal| goal.id);
            rows
        });
        goals
            .iter()
            .map(|goal| {
                let requirement =
                    crate::requirement::goal_requirement(goal, &CachedRates, now, &calendar)?;
                Ok(GoalSummary {
                    goal_id: requirement.goal_id,
                    name: requirement.name.clone(),
                    currency: requirement.currency.clone(),
                    target_amount: decimal_to_string(requirement.target_amount),
                    current_total: decimal_to_string(requirement.current_total),
                    remaining: decimal_to_string(requirement.remaining),
                    months_remaining: requirement.months_remaining,
                    required_monthly: decimal_to_string(requirement.required_monthly),
                    status: requirement.status,
                    deadline_day: requirement.deadline_day,
                })
            })
            .collect()
    }

    // ------------------------------------------------------------- planning

    #[update]
    pub async fn minimum_budget(&self, currency: String) -> PlannerResult<String> {
        let (goals, _) = self.planned_goals(&currency).await?;
        let calendar = PaymentCalendar::new(settings_snapshot().payment_day);
        let now = ms_to_date(now_ms())?;
        let minimum = planner::budget::minimum_budget(&goals, now, &calendar)?;
        Ok(decimal_to_string(minimum))
    }

    #[update]
    pub async fn check_feasibility(
        &self,
        budget: String,
        currency: String,
    ) -> PlannerResult<FeasibilityCheck> {
        let budget = string_to_decimal(&budget)?;
        let (goals, _) = self.planned_goals(&currency).await?;
        let calendar = PaymentCalendar::new(settings_snapshot().payment_day);
        let now = ms_to_date(now_ms())?;
        let analysis = planner::feasibility::check_feasibility(&goals, budget, now, &calendar)?;
        Ok(FeasibilityCheck {
            budget: decimal_to_string(analysis.budget),
            currency: currency.clone(),
            feasible: analysis.feasible,
            minimum_budget: decimal_to_string(analysis.minimum_budget),
            leveled_budget: decimal_to_string(analysis.leveled_budget),
            infeasible: analysis.infeasible.iter().map(InfeasibleGoalView::from).collect(),
            suggestions: analysis
                .suggestions
                .iter()
                .map(|suggestion| FeasibilitySuggestion::from_suggestion(suggestion, &currency))
                .collect(),
        })
    }

    #[update]
    pub async fn generate_schedule(
        &self,
        budget: String,
        currency: String,
    ) -> PlannerResult<FixedBudgetPlanView> {
        let budget = string_to_decimal(&budget)?;
        let plan = self.plan_for(budget, &currency).await?;
        Ok(FixedBudgetPlanView::from(&plan))
    }

    #[update]
    pub async fn build_timeline_blocks(
        &self,
        budget: String,
        currency: String,
    ) -> PlannerResult<Vec<ScheduledGoalBlockView>> {
        let budget = string_to_decimal(&budget)?;
        let plan = self.plan_for(budget, &currency).await?;
        Ok(planner::timeline::build_blocks(&plan)
            .iter()
            .map(ScheduledGoalBlockView::from)
            .collect())
    }

    #[update]
    pub async fn recalculate_after_contribution(
        &self,
        budget: String,
        currency: String,
        actual: String,
        payment_number: u32,
        policy: ContributionPolicy,
    ) -> PlannerResult<FixedBudgetPlanView> {
        let budget = string_to_decimal(&budget)?;
        let actual = string_to_decimal(&actual)?;
        let original = self.plan_for(budget, &currency).await?;
        let (goals, _) = self.planned_goals(&currency).await?;
        let calendar = PaymentCalendar::new(settings_snapshot().payment_day);
        let recalculated = planner::schedule::recalculate_after_contribution(
            &original,
            &goals,
            actual,
            payment_number,
            policy,
            &calendar,
            now_ms(),
        )?;
        let mut journal = JournalCollection::open(None);
        journal.append_note(
            Ok(()),
            LogType::Planning,
            format!(
                "Recalculated the schedule after payment {} with policy {:?}.",
                payment_number, policy
            ),
        );
        events::emit(ChangeEvent::PlanRecomputed { currency });
        Ok(FixedBudgetPlanView::from(&recalculated))
    }

    // -------------------------------------------------------- monthly plans

    #[update]
    pub async fn ensure_monthly_plans(
        &self,
        month: String,
    ) -> PlannerResult<Vec<MonthlyGoalPlanQuery>> {
        only_controller(caller())?;
        rates::warm_pairs(conversion_pairs()).await;
        let rows = plans::ensure_month_plans(&month, &CachedRates, now_ms())?;
        Ok(rows.iter().map(MonthlyGoalPlanQuery::from).collect())
    }

    #[query]
    pub fn get_monthly_plans(&self, month: String) -> Vec<MonthlyGoalPlanQuery> {
        plans::plans_for_month(&month)
            .iter()
            .map(MonthlyGoalPlanQuery::from)
            .collect()
    }

    #[update]
    pub async fn set_plan_overrides(
        &self,
        month: String,
        goal_id: u32,
        overrides: PlanOverrides,
    ) -> PlannerResult<MonthlyGoalPlanQuery> {
        only_controller(caller())?;
        let custom_amount = overrides.parsed_custom_amount()?;
        let row = plans::set_overrides(
            &month,
            goal_id,
            overrides.is_protected,
            overrides.is_skipped,
            custom_amount,
            now_ms(),
        )?;
        Ok(MonthlyGoalPlanQuery::from(&row))
    }

    // ------------------------------------------------------------ execution

    #[update]
    pub async fn start_execution(&self, month: String) -> PlannerResult<ExecutionRecordQuery> {
        only_controller(caller())?;
        rates::warm_pairs(conversion_pairs()).await;
        let record = execution::start_execution(&month, &CachedRates, now_ms())?;
        let mut journal = JournalCollection::open(Some(month));
        journal.append_note(
            Ok(()),
            LogType::Execution,
            format!("Started tracking with record {}.", record.id),
        );
        Ok(ExecutionRecordQuery::from(&record))
    }

    #[update]
    pub async fn log_contribution(
        &self,
        record_id: u32,
        goal_id: u32,
        amount: String,
    ) -> PlannerResult<u32> {
        only_controller(caller())?;
        let amount = string_to_decimal(&amount)?;
        let row = execution::log_contribution(record_id, goal_id, amount, now_ms())?;
        Ok(row.id)
    }

    #[update]
    pub async fn close_execution(&self, record_id: u32) -> PlannerResult<CompletedSummary> {
        only_controller(caller())?;
        let summary = execution::close_execution(record_id, now_ms())?;
        let mut journal = JournalCollection::open(Some(summary.month.clone()));
        journal.append_note(
            Ok(()),
            LogType::Execution,
            format!("Closed record {}.", record_id),
        );
        Ok(CompletedSummary {
            record_id: summary.record_id,
            month: summary.month,
            closed_at: summary.closed_at,
            goals: summary
                .goals
                .iter()
                .map(|goal| ClosedGoalSummary {
                    goal_id: goal.goal_id,
                    currency: goal.currency.clone(),
                    planned: decimal_to_string(goal.planned),
                    contributed: decimal_to_string(goal.contributed),
                })
                .collect(),
        })
    }

    #[update]
    pub async fn reopen_execution(&self, record_id: u32) -> PlannerResult<ExecutionRecordQuery> {
        only_controller(caller())?;
        let record = execution::reopen_execution(record_id, now_ms())?;
        let mut journal = JournalCollection::open(Some(record.month.clone()));
        journal.append_note(
            Ok(()),
            LogType::Execution,
            format!("Reopened record {} within the undo window.", record_id),
        );
        Ok(ExecutionRecordQuery::from(&record))
    }

    #[update]
    pub async fn remaining_to_close(
        &self,
        record_id: u32,
    ) -> PlannerResult<Vec<RemainingToClose>> {
        let display = settings_snapshot().execution_display_currency;
        let pairs: Vec<(String, String)> = snapshots_for_record(record_id)
            .iter()
            .filter(|snapshot| snapshot.currency != display)
            .map(|snapshot| (snapshot.currency.clone(), display.clone()))
            .collect();
        rates::warm_pairs(pairs).await;
        let entries = execution::remaining_to_close(record_id, &CachedRates)?;
        Ok(entries
            .into_iter()
            .map(|entry| RemainingToClose {
                goal_id: entry.goal_id,
                currency: entry.currency,
                amount: entry.amount.map(decimal_to_string),
            })
            .collect())
    }

    #[query]
    pub fn get_execution_record(&self, month: String) -> Option<ExecutionRecordQuery> {
        execution::record_for_month(&month).map(|record| ExecutionRecordQuery::from(&record))
    }

    #[query]
    pub fn get_active_execution(&self) -> Option<ExecutionRecordQuery> {
        execution::active_record().map(|record| ExecutionRecordQuery::from(&record))
    }

    #[query]
    pub fn get_execution_snapshots(&self, record_id: u32) -> Vec<StableExecutionSnapshot> {
        snapshots_for_record(record_id)
    }

    // ------------------------------------------------------------- settings

    #[query]
    pub fn get_settings(&self) -> SettingsQuery {
        settings_query()
    }

    #[update]
    pub async fn update_settings(&self, input: SettingsInput) -> PlannerResult<SettingsQuery> {
        only_controller(caller())?;
        SETTINGS.with_borrow_mut(|settings| apply_settings(settings, input))?;
        let tick = bump_settings_tick();
        events::emit(ChangeEvent::SettingsChanged { tick });
        Ok(settings_query())
    }

    // ------------------------------------------------------- infrastructure

    /// Arms the daily maintenance timer (auto start/close, journal pruning).
    #[update]
    pub async fn start_timers(&self) -> PlannerResult<()> {
        only_controller(caller())?;
        timers::start_timers();
        Ok(())
    }

    #[update]
    pub async fn drain_events(&self) -> Vec<ChangeEvent> {
        events::drain()
    }

    #[query]
    pub fn get_logs(&self, depth: u64) -> Vec<StableJournalCollection> {
        JOURNAL.with_borrow(|journal| {
            let len = journal.len();
            let start = len.saturating_sub(depth);
            (start..len).filter_map(|index| journal.get(index)).collect()
        })
    }

    /// Generates the IDL for the canister interface.
    pub fn idl() -> Idl {
        generate_idl!()
    }

    // -------------------------------------------------------------- helpers

    fn record_batch(&self, inputs: Vec<TransactionInput>) -> PlannerResult<Vec<TransactionQuery>> {
        let mut recorded = Vec::with_capacity(inputs.len());
        let mut fresh: Vec<Transaction> = Vec::new();
        for input in inputs {
            let exists = ASSETS.with_borrow(|assets| assets.contains_key(&input.asset_id));
            if !exists {
                return Err(PlannerError::NotFound(format!(
                    "Asset {} does not exist.",
                    input.asset_id
                )));
            }
            if let Some(external_id) = &input.external_id {
                let existing = TRANSACTIONS.with_borrow(|transactions| {
                    transactions
                        .values()
                        .find(|tx| tx.external_id.as_deref() == Some(external_id.as_str()))
                        .cloned()
                });
                if let Some(tx) = existing {
                    recorded.push(TransactionQuery::from(&tx));
                    continue;
                }
            }
            let tx = input.into_transaction(next_id())?;
            TRANSACTIONS.with_borrow_mut(|transactions| {
                transactions.insert(tx.id, tx.clone());
            });
            events::emit(ChangeEvent::TransactionRecorded {
                transaction_id: tx.id,
                asset_id: tx.asset_id,
            });
            recorded.push(TransactionQuery::from(&tx));
            fresh.push(tx);
        }

        // freshly arrived on-chain deposits may extend a dedicated allocation
        let mut asset_ids: Vec<u32> = fresh
            .iter()
            .filter(|tx| tx.source == TransactionSource::OnChain && tx.amount > Decimal::ZERO)
            .map(|tx| tx.asset_id)
            .collect();
        asset_ids.sort_unstable();
        asset_ids.dedup();
        for asset_id in asset_ids {
            allocation::auto_allocate_deposits(asset_id, &fresh)?;
        }
        Ok(recorded)
    }

    /// Converts every active goal's remainder into the target currency.
    async fn planned_goals(&self, currency: &str) -> PlannerResult<(Vec<PlannedGoal>, Vec<u32>)> {
        rates::warm_pairs(conversion_pairs()).await;
        let calendar = PaymentCalendar::new(settings_snapshot().payment_day);
        let now = ms_to_date(now_ms())?;
        let goals: Vec<Goal> = GOALS.with_borrow(|goals| {
            let mut rows: Vec<Goal> = goals.values().filter(|g| g.is_active()).cloned().collect();
            rows.sort_by_key(|goal| goal.id);
            rows
        });

        let mut planned = Vec::with_capacity(goals.len());
        let mut ids = Vec::with_capacity(goals.len());
        for goal in goals {
            let requirement =
                crate::requirement::goal_requirement(&goal, &CachedRates, now, &calendar)?;
            let remaining = if goal.currency == currency {
                requirement.remaining
            } else {
                let rate = rates::fetch_rate(&goal.currency, currency).await?;
                round_rate(requirement.remaining * rate)
            };
            ids.push(goal.id);
            planned.push(PlannedGoal {
                id: goal.id,
                name: goal.name.clone(),
                remaining,
                deadline_day: goal.deadline_day,
            });
        }
        Ok((planned, ids))
    }

    /// Returns the cached plan for the inputs or generates and caches a new
    /// one.
    async fn plan_for(
        &self,
        budget: Decimal,
        currency: &str,
    ) -> PlannerResult<planner::FixedBudgetPlan> {
        let (goals, ids) = self.planned_goals(currency).await?;
        let now = now_ms();
        if let Some(plan) = cache::lookup(&ids, budget, currency, now) {
            return Ok(plan);
        }
        let calendar = PaymentCalendar::new(settings_snapshot().payment_day);
        let today = ms_to_date(now)?;
        let plan = planner::schedule::generate(&goals, budget, currency, today, &calendar, now)?;
        cache::store(&ids, budget, currency, now, &plan);
        let mut journal = JournalCollection::open(None);
        journal.append_note(
            Ok(()),
            LogType::Planning,
            format!(
                "Generated a {}-payment schedule at {} {}.",
                plan.payments.len(),
                decimal_to_string(budget),
                currency
            ),
        );
        events::emit(ChangeEvent::PlanRecomputed {
            currency: currency.to_string(),
        });
        Ok(plan)
    }
}

fn settings_query() -> SettingsQuery {
    let settings = settings_snapshot();
    SettingsQuery {
        payment_day: settings.payment_day,
        display_currency: settings.display_currency,
        execution_display_currency: settings.execution_display_currency,
        notifications_enabled: settings.notifications_enabled,
        notification_days: settings.notification_days,
        auto_start_enabled: settings.auto_start_enabled,
        auto_complete_enabled: settings.auto_complete_enabled,
        undo_grace_period_hours: settings.undo_grace_period_hours,
        monthly_budget: settings.monthly_budget.map(decimal_to_string),
        budget_currency: settings.budget_currency,
        tick: SETTINGS_TICK.with(|tick| tick.get()),
    }
}

fn apply_settings(settings: &mut PlanningSettings, input: SettingsInput) -> PlannerResult<()> {
    if let Some(day) = input.payment_day {
        settings.payment_day(day);
    }
    if let Some(currency) = input.display_currency {
        if currency.trim().is_empty() {
            return Err(validation_err("The display currency cannot be blank."));
        }
        settings.display_currency(currency.trim().to_uppercase());
    }
    if let Some(currency) = input.execution_display_currency {
        if currency.trim().is_empty() {
            return Err(validation_err("The execution currency cannot be blank."));
        }
        settings.execution_display_currency(currency.trim().to_uppercase());
    }
    if let Some(enabled) = input.notifications_enabled {
        settings.notifications_enabled(enabled);
    }
    if let Some(days) = input.notification_days {
        settings.notification_days(days);
    }
    if let Some(enabled) = input.auto_start_enabled {
        settings.auto_start_enabled(enabled);
    }
    if let Some(enabled) = input.auto_complete_enabled {
        settings.auto_complete_enabled(enabled);
    }
    if let Some(hours) = input.undo_grace_period_hours {
        settings.undo_grace_period_hours(hours)?;
    }
    if let Some(budget) = input.monthly_budget {
        let parsed = opt_string_to_decimal(&budget)?;
        if let Some(amount) = parsed {
            if amount <= Decimal::ZERO {
                return Err(validation_err("Budgets must be positive."));
            }
        }
        settings.monthly_budget(parsed);
    }
    if let Some(currency) = input.budget_currency {
        if currency.trim().is_empty() {
            return Err(validation_err("The budget currency cannot be blank."));
        }
        settings.budget_currency(currency.trim().to_uppercase());
    }
    Ok(())
}
