//! Common utility and helper functions that are used across the project

use alloy_primitives::U256;
use candid::Principal;
use ic_exports::ic_cdk::api::{call::CallResult, is_controller};
use num_bigint::BigUint;
use rust_decimal::{Decimal, RoundingStrategy};

use super::error::*;
use crate::constants::RATE_SIGNIFICANT_DIGITS;

/// Nanoseconds since the UNIX epoch. The system API only exists inside the
/// canister; native builds (tests, IDL generation) read zero.
pub fn ic_time_ns() -> u64 {
    #[cfg(target_family = "wasm")]
    {
        ic_exports::ic_cdk::api::time()
    }
    #[cfg(not(target_family = "wasm"))]
    {
        0
    }
}

/// Current UTC time in epoch milliseconds
pub fn now_ms() -> u64 {
    ic_time_ns() / 1_000_000 // ic time is in nanoseconds
}

/// Returns Err if the `caller` is not a controller of the canister
pub fn only_controller(caller: Principal) -> PlannerResult<()> {
    if !is_controller(&caller) {
        // only the controller should be able to call this function
        return Err(PlannerError::Unauthorized);
    }
    Ok(())
}

/// Extracts the Ok or Err values of a canister call and returns them.
pub fn extract_call_result<T>(result: CallResult<(T,)>) -> PlannerResult<T> {
    result
        .map(|(success_value,)| success_value)
        .map_err(|(rejection_code, error_message)| {
            PlannerError::CallResult(rejection_code, error_message)
        })
}

/// Parses a decimal string received over candid
pub fn string_to_decimal(input: &str) -> PlannerResult<Decimal> {
    Decimal::from_str_exact(input.trim())
        .map_err(|err| PlannerError::Decoding(format!("Invalid decimal amount: {:#?}", err)))
}

/// Parses an optional decimal string received over candid
pub fn opt_string_to_decimal(input: &Option<String>) -> PlannerResult<Option<Decimal>> {
    match input {
        Some(value) => Ok(Some(string_to_decimal(value)?)),
        None => Ok(None),
    }
}

/// Renders a decimal for the candid boundary without a trailing exponent
pub fn decimal_to_string(value: Decimal) -> String {
    value.normalize().to_string()
}

/// Banker's rounding to the configured number of significant digits.
/// Values whose rounding would not be representable are returned unchanged.
pub fn round_rate(value: Decimal) -> Decimal {
    value
        .round_sf_with_strategy(
            RATE_SIGNIFICANT_DIGITS,
            RoundingStrategy::MidpointNearestEven,
        )
        .unwrap_or(value)
}

/// Converts a raw integer amount with the given number of decimals into a `Decimal`
pub fn scaled_to_decimal(raw: i128, decimals: u32) -> PlannerResult<Decimal> {
    Decimal::try_from_i128_with_scale(raw, decimals)
        .map_err(|err| arithmetic_err(format!("Scaled conversion failed: {:#?}", err)))
}

/// Converts values of type `U256` with the given number of decimals to `Decimal`
pub fn u256_to_decimal(value: U256, decimals: u32) -> PlannerResult<Decimal> {
    let big: BigUint = BigUint::from_bytes_be(&value.to_be_bytes::<32>());
    let raw = i128::try_from(big).map_err(|_| {
        PlannerError::Decoding(
            "The `U256` input exceeds 128 bits and cannot be represented as an amount."
                .to_string(),
        )
    })?;
    scaled_to_decimal(raw, decimals)
}

/// Decodes a `0x`-prefixed hex quantity (e.g. an `eth_getBalance` result)
pub fn hex_quantity_to_u256(input: &str) -> PlannerResult<U256> {
    let stripped = input.strip_prefix("0x").unwrap_or(input);
    if stripped.is_empty() {
        return Err(PlannerError::Decoding("Empty hex quantity.".to_string()));
    }
    U256::from_str_radix(stripped, 16)
        .map_err(|err| PlannerError::Decoding(format!("Invalid hex quantity: {:#?}", err)))
}

/// `max(0, value)` for decimals
pub fn clamp_non_negative(value: Decimal) -> Decimal {
    if value.is_sign_negative() {
        Decimal::ZERO
    } else {
        value
    }
}
