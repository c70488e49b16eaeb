//! # Savings Planner's Constants
//!
//! This module defines the constants and helper functions used by the
//! Savings Planner, including:
//! - Monetary comparison epsilons and rounding precision.
//! - Cache freshness windows and the planner's iteration bound.
//! - Status classification thresholds.
//! - Principal IDs for interacting with external canisters.
//! - Currency classification tables.

use candid::Principal;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Comparison epsilon for monetary quantities
pub const EPSILON: Decimal = dec!(0.00000001); // 1e-8

/// Significant digits kept at every currency conversion hop
pub const RATE_SIGNIFICANT_DIGITS: u32 = 8;

/// Chain ID
#[cfg(feature = "sepolia")]
pub const CHAIN_ID: u64 = 11155111;
/// Chain ID
#[cfg(feature = "mainnet")]
pub const CHAIN_ID: u64 = 1;

/// Freshness window for cached conversion rates, in milliseconds
pub const RATE_CACHE_TTL_MS: u64 = 300_000; // 5 minutes

/// Freshness window for cached plans, in milliseconds
pub const PLAN_CACHE_TTL_MS: u64 = 300_000; // 5 minutes

/// Freshness window for cached on-chain balances, in milliseconds
pub const ONCHAIN_CACHE_TTL_MS: u64 = 600_000; // 10 minutes

/// Budgets closer than this are considered the same plan-cache key
pub const PLAN_CACHE_BUDGET_TOLERANCE: Decimal = dec!(0.01);

/// Hard bound on scheduling iterations (50 years of monthly payments)
pub const MAX_SCHEDULE_PAYMENTS: u32 = 600;

/// Fraction of the target above which a goal with one month left is `Critical`
pub const CRITICAL_REMAINING_FRACTION: Decimal = dec!(0.8);

/// Fraction of the target above which a monthly requirement is `Attention`
pub const ATTENTION_REQUIRED_FRACTION: Decimal = dec!(0.5);

/// Token bucket capacity for outbound rate requests
pub const RATE_BUCKET_CAPACITY: u32 = 10;

/// Tokens added back to the bucket per minute
pub const RATE_BUCKET_REFILL_PER_MINUTE: u32 = 10;

/// Deadline extension suggestions are clamped to this many months
pub const MAX_DEADLINE_EXTENSION_MONTHS: u32 = 12;

/// Journal collections kept after a pruning pass
pub const MAX_JOURNAL_COLLECTIONS: u64 = 300;

/// Bounded size of the pending change-event queue
pub const MAX_PENDING_EVENTS: usize = 256;

/// Undo grace windows recognized by the settings, in hours
pub const UNDO_GRACE_HOURS: [u64; 4] = [0, 24, 48, 168];

/// USD-pegged symbols that convert 1:1 within the set
pub const USD_PEGGED: [&str; 3] = ["USD", "USDT", "USDC"];

/// Fiat symbols recognized by the pair classifier; everything else is
/// treated as a crypto symbol
pub const FIAT_SYMBOLS: [&str; 20] = [
    "USD", "EUR", "GBP", "JPY", "CHF", "CAD", "AUD", "NZD", "CNY", "SEK", "NOK", "DKK", "PLN",
    "CZK", "HUF", "INR", "BRL", "KRW", "TRY", "MXN",
];

/// Exchange rate canister's principal ID as a constant string slice.
const EXCHANGE_RATE_CANISTER_RAW: &str = "uf6dk-hyaaa-aaaaq-qaaaq-cai";

/// Returns the Principal for the exchange rate canister.
///
/// # Panics
/// This function will panic if the hardcoded principal string is invalid.
/// The panic should be caught by the unit tests.
pub fn exchange_rate_canister() -> Principal {
    Principal::from_text(EXCHANGE_RATE_CANISTER_RAW)
        .expect("Invalid principal ID for the exchange rate canister.")
}

/// Cycles attached to one exchange-rate canister call
pub const XRC_CALL_CYCLES: u128 = 1_000_000_000;

/// EVM RPC canister's principal ID as a constant string slice.
const EVM_RPC_CANISTER_RAW: &str = "7hfb6-caaaa-aaaar-qadga-cai";

/// Returns the Principal for the EVM RPC canister.
///
/// # Panics
/// This function will panic if the hardcoded principal string is invalid.
/// The panic should be caught by the unit tests.
pub fn evm_rpc_canister() -> Principal {
    Principal::from_text(EVM_RPC_CANISTER_RAW)
        .expect("Invalid principal ID for the EVM RPC canister.")
}

/// Default max response bytes for EVM RPC requests
pub const DEFAULT_MAX_RESPONSE_BYTES: u64 = 8_000;

/// Number of providers needed to reach consensus on EVM reads
pub const PROVIDER_THRESHOLD: u8 = 2;

/// Number of providers to use for EVM reads
pub const PROVIDER_COUNT: u8 = 3;

/// Sepolia providers
#[cfg(feature = "sepolia")]
pub const PROVIDERS: [evm_rpc_types::EthSepoliaService; 4] = [
    evm_rpc_types::EthSepoliaService::BlockPi,
    evm_rpc_types::EthSepoliaService::PublicNode,
    evm_rpc_types::EthSepoliaService::Alchemy,
    evm_rpc_types::EthSepoliaService::Ankr,
];

/// Ethereum main-net providers
#[cfg(feature = "mainnet")]
pub const PROVIDERS: [evm_rpc_types::EthMainnetService; 4] = [
    evm_rpc_types::EthMainnetService::BlockPi,
    evm_rpc_types::EthMainnetService::PublicNode,
    evm_rpc_types::EthMainnetService::Alchemy,
    evm_rpc_types::EthMainnetService::Ankr,
];
