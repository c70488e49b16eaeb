//! Utility and helper functions needed for:
//! - Candid/decimal boundary conversions and rounding
//! - Interacting with the EVM RPC and the exchange rate canisters
//! - Error handling

pub(crate) mod common;
pub(crate) mod error;
pub(crate) mod evm_rpc;
pub(crate) mod exchange;
