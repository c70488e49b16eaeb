//! The thread storage of the canister containing mutable data structures

use std::{
    cell::{Cell, RefCell},
    collections::{HashMap, VecDeque},
};

use evm_rpc_types::RpcService;
use ic_stable_structures::{
    memory_manager::{MemoryId, MemoryManager, VirtualMemory},
    DefaultMemoryImpl, StableBTreeMap, Vec as StableVec,
};

use crate::{
    allocation::StableAllocationHistory,
    chain::OnChainBalance,
    events::ChangeEvent,
    execution::snapshot::StableExecutionSnapshot,
    journal::StableJournalCollection,
    model::{Allocation, Asset, CompletedExecution, ExecutionRecord, Goal, MonthlyGoalPlan, Transaction},
    planner::cache::CachedPlan,
    rates::{CachedRate, StableRate, TokenBucket},
    settings::PlanningSettings,
};

/// Stable memory handle shared by all durable collections
pub type VMem = VirtualMemory<DefaultMemoryImpl>;

const JOURNAL_MEMORY: MemoryId = MemoryId::new(0);
const ALLOCATION_HISTORY_MEMORY: MemoryId = MemoryId::new(1);
const SNAPSHOT_MEMORY: MemoryId = MemoryId::new(2);
const RATE_MEMORY: MemoryId = MemoryId::new(3);

thread_local! {
    /// Routes the canister's stable memory between the durable collections
    static MEMORY_MANAGER: RefCell<MemoryManager<DefaultMemoryImpl>> =
        RefCell::new(MemoryManager::init(DefaultMemoryImpl::default()));
    /// Monotonic id source for every entity
    pub static NEXT_ID: Cell<u32> = Cell::new(1);
    /// All goals by id
    pub static GOALS: RefCell<HashMap<u32, Goal>> = RefCell::new(HashMap::new());
    /// All assets by id
    pub static ASSETS: RefCell<HashMap<u32, Asset>> = RefCell::new(HashMap::new());
    /// All transactions by id
    pub static TRANSACTIONS: RefCell<HashMap<u32, Transaction>> = RefCell::new(HashMap::new());
    /// All allocations by id; at most one per (asset, goal) pair
    pub static ALLOCATIONS: RefCell<HashMap<u32, Allocation>> = RefCell::new(HashMap::new());
    /// Monthly plans keyed on (month label, goal id)
    pub static MONTHLY_PLANS: RefCell<HashMap<(String, u32), MonthlyGoalPlan>> =
        RefCell::new(HashMap::new());
    /// Execution records by id; at most one per month label
    pub static EXECUTION_RECORDS: RefCell<HashMap<u32, ExecutionRecord>> =
        RefCell::new(HashMap::new());
    /// Contributions accrued against execution records
    pub static COMPLETED_EXECUTIONS: RefCell<Vec<CompletedExecution>> = RefCell::new(Vec::new());
    /// In-memory conversion rate cache
    pub static RATE_CACHE: RefCell<HashMap<(String, String), CachedRate>> =
        RefCell::new(HashMap::new());
    /// Token bucket limiting outbound rate requests
    pub static RATE_BUCKET: RefCell<TokenBucket> = RefCell::new(TokenBucket::default());
    /// Last generated plan, keyed on its inputs
    pub static PLAN_CACHE: RefCell<Option<CachedPlan>> = RefCell::new(None);
    /// Cached on-chain balances by asset id
    pub static ONCHAIN_CACHE: RefCell<HashMap<u32, OnChainBalance>> = RefCell::new(HashMap::new());
    /// Planning settings snapshot
    pub static SETTINGS: RefCell<PlanningSettings> = RefCell::new(PlanningSettings::default());
    /// Monotonic tick bumped by every settings change
    pub static SETTINGS_TICK: Cell<u64> = Cell::new(0);
    /// Pending typed change events, drained by subscribers
    pub static EVENTS: RefCell<VecDeque<ChangeEvent>> = RefCell::new(VecDeque::new());
    /// Guards the one-shot legacy allocation migration
    pub static MIGRATION_DONE: Cell<bool> = Cell::new(false);
    /// RPC Service Vec Deque
    #[cfg(feature = "sepolia")]
    pub static RPC_SERVICE: RefCell<VecDeque<RpcService>> = RefCell::new(VecDeque::from([
        RpcService::EthSepolia(evm_rpc_types::EthSepoliaService::Alchemy),
        RpcService::EthSepolia(evm_rpc_types::EthSepoliaService::Ankr),
        RpcService::EthSepolia(evm_rpc_types::EthSepoliaService::BlockPi),
        RpcService::EthSepolia(evm_rpc_types::EthSepoliaService::PublicNode),
    ]));
    /// RPC Service Vec Deque
    #[cfg(feature = "mainnet")]
    pub static RPC_SERVICE: RefCell<VecDeque<RpcService>> = RefCell::new(VecDeque::from([
        RpcService::EthMainnet(evm_rpc_types::EthMainnetService::Alchemy),
        RpcService::EthMainnet(evm_rpc_types::EthMainnetService::Ankr),
        RpcService::EthMainnet(evm_rpc_types::EthMainnetService::BlockPi),
        RpcService::EthMainnet(evm_rpc_types::EthMainnetService::PublicNode),
    ]));
    /// Journal
    pub static JOURNAL: RefCell<StableVec<StableJournalCollection, VMem>> = RefCell::new(
        StableVec::init(MEMORY_MANAGER.with_borrow(|mm| mm.get(JOURNAL_MEMORY)))
            .expect("Failed to create the journal memory.")
    );
    /// Append-only allocation history
    pub static ALLOCATION_HISTORY: RefCell<StableVec<StableAllocationHistory, VMem>> = RefCell::new(
        StableVec::init(MEMORY_MANAGER.with_borrow(|mm| mm.get(ALLOCATION_HISTORY_MEMORY)))
            .expect("Failed to create the allocation history memory.")
    );
    /// Immutable execution snapshots
    pub static EXECUTION_SNAPSHOTS: RefCell<StableVec<StableExecutionSnapshot, VMem>> = RefCell::new(
        StableVec::init(MEMORY_MANAGER.with_borrow(|mm| mm.get(SNAPSHOT_MEMORY)))
            .expect("Failed to create the snapshot memory.")
    );
    /// Durable write-through of the rate cache, keyed on "FROM:TO"
    pub static STABLE_RATES: RefCell<StableBTreeMap<String, StableRate, VMem>> = RefCell::new(
        StableBTreeMap::init(MEMORY_MANAGER.with_borrow(|mm| mm.get(RATE_MEMORY)))
    );
}

/// Hands out the next entity id
pub fn next_id() -> u32 {
    NEXT_ID.with(|counter| {
        let id = counter.get();
        counter.set(id + 1);
        id
    })
}

/// Inserts a new journal collection
pub fn insert_journal_collection(entry: StableJournalCollection) {
    let _ = JOURNAL.with_borrow_mut(|vec| vec.push(&entry));
}

/// Clones the current settings snapshot
pub fn settings_snapshot() -> PlanningSettings {
    SETTINGS.with_borrow(|settings| settings.clone())
}

/// Bumps the settings tick; callers must invalidate input-derived caches
pub fn bump_settings_tick() -> u64 {
    SETTINGS_TICK.with(|tick| {
        let next = tick.get() + 1;
        tick.set(next);
        next
    })
}
