//! On-chain balance reads through the EVM RPC canister.
//!
//! Native balances go through a raw JSON-RPC `eth_getBalance` request; ERC-20
//! balances go through a typed `eth_call` to `balanceOf`. Results are cached
//! per asset with a ten-minute staleness window and reused as a stale
//! fallback when providers misbehave.

use alloy_primitives::Address;
use alloy_sol_types::{sol, SolCall};
use evm_rpc_types::{HttpOutcallError, MultiRpcResult, RpcConfig, RpcError, RpcServices};
use rust_decimal::Decimal;
use serde_json::json;
use std::str::FromStr;

use crate::constants::{
    evm_rpc_canister, DEFAULT_MAX_RESPONSE_BYTES, ONCHAIN_CACHE_TTL_MS, PROVIDERS,
    PROVIDER_COUNT, PROVIDER_THRESHOLD,
};
use crate::model::{Asset, OnChainRef};
use crate::state::{ONCHAIN_CACHE, RPC_SERVICE};
use crate::utils::common::{
    extract_call_result, hex_quantity_to_u256, now_ms, u256_to_decimal,
};
use crate::utils::error::*;
use crate::utils::evm_rpc::{BlockTag, CallArgs, EthCallResponse, Service, TransactionRequest};

sol!(
    function balanceOf(address account) external view returns (uint256);
);

/// A cached on-chain balance in the asset's own currency
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OnChainBalance {
    pub balance: Decimal,
    pub fetched_at: u64,
}

/// A balance read returned to callers, with its staleness verdict
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BalanceReading {
    pub balance: Decimal,
    pub fetched_at: u64,
    pub is_stale: bool,
}

/// Last cached balance for an asset, if any
pub fn cached_balance(asset_id: u32) -> Option<OnChainBalance> {
    ONCHAIN_CACHE.with_borrow(|cache| cache.get(&asset_id).copied())
}

/// Reads an asset's on-chain balance.
///
/// Without `force_refresh`, a cache entry younger than ten minutes is
/// returned directly. Fetch failures degrade to the stale cached value when
/// one exists.
pub async fn get_balance(asset: &Asset, force_refresh: bool) -> PlannerResult<BalanceReading> {
    let reference = asset
        .on_chain
        .as_ref()
        .ok_or_else(|| validation_err("This asset has no on-chain address."))?;

    let now = now_ms();
    let cached = cached_balance(asset.id);
    if !force_refresh {
        if let Some(entry) = cached {
            if now.saturating_sub(entry.fetched_at) <= ONCHAIN_CACHE_TTL_MS {
                return Ok(BalanceReading {
                    balance: entry.balance,
                    fetched_at: entry.fetched_at,
                    is_stale: false,
                });
            }
        }
    }

    match fetch_balance(reference).await {
        Ok(balance) => {
            ONCHAIN_CACHE.with_borrow_mut(|cache| {
                cache.insert(
                    asset.id,
                    OnChainBalance {
                        balance,
                        fetched_at: now,
                    },
                );
            });
            Ok(BalanceReading {
                balance,
                fetched_at: now,
                is_stale: false,
            })
        }
        Err(err) => match cached {
            Some(entry) => Ok(BalanceReading {
                balance: entry.balance,
                fetched_at: entry.fetched_at,
                is_stale: true,
            }),
            None => Err(err),
        },
    }
}

async fn fetch_balance(reference: &OnChainRef) -> PlannerResult<Decimal> {
    let holder = string_to_address(&reference.address)?;
    match &reference.token_contract {
        Some(contract) => {
            let contract = string_to_address(contract)?;
            let data = balanceOfCall { account: holder }.abi_encode();
            let response = eth_call_with_retries(contract, data).await?;
            let raw = decode_abi_response::<balanceOfReturn, balanceOfCall>(response)?;
            u256_to_decimal(raw._0, reference.decimals)
        }
        None => {
            let json_data = eth_get_balance_args(&reference.address);
            let response = request_with_dynamic_retries(json_data).await?;
            let parsed: EthCallResponse = serde_json::from_str(&response)
                .map_err(|err| PlannerError::Decoding(format!("{:#?}", err)))?;
            u256_to_decimal(hex_quantity_to_u256(&parsed.result)?, reference.decimals)
        }
    }
}

/// Converts String to Address and returns PlannerError on failure
pub fn string_to_address(input: &str) -> PlannerResult<Address> {
    Address::from_str(input).map_err(|err| PlannerError::Decoding(format!("{:#?}", err)))
}

/// Returns `T` from Solidity struct.
fn decode_abi_response<T, F: SolCall<Return = T>>(hex_data: String) -> PlannerResult<T> {
    let stripped_hex = hex_data.strip_prefix("0x").unwrap_or(&hex_data);
    let hex_bytes =
        hex::decode(stripped_hex).map_err(|err| PlannerError::Decoding(err.to_string()))?;
    F::abi_decode_returns(&hex_bytes, false)
        .map_err(|err| PlannerError::Decoding(err.to_string()))
}

fn eth_get_balance_args(address: &str) -> String {
    json!({
        "id": 1,
        "jsonrpc": "2.0",
        "method": "eth_getBalance",
        "params": [address, "latest"],
    })
    .to_string()
}

fn providers() -> RpcServices {
    #[cfg(feature = "sepolia")]
    {
        RpcServices::EthSepolia(Some(PROVIDERS.to_vec()))
    }
    #[cfg(feature = "mainnet")]
    {
        RpcServices::EthMainnet(Some(PROVIDERS.to_vec()))
    }
}

fn rpc_config(max_response_bytes: Option<u64>) -> RpcConfig {
    RpcConfig {
        response_size_estimate: max_response_bytes,
        response_consensus: Some(evm_rpc_types::ConsensusStrategy::Threshold {
            total: Some(PROVIDER_COUNT),
            min: PROVIDER_THRESHOLD,
        }),
    }
}

fn is_response_size_error(err: &RpcError) -> bool {
    if let RpcError::HttpOutcallError(HttpOutcallError::IcError { code, message }) = err {
        *code == ic_exports::ic_cdk::api::call::RejectionCode::SysFatal
            && (message.contains("size limit") || message.contains("length limit"))
    } else {
        false
    }
}

fn extract_multi_rpc_result<T>(result: MultiRpcResult<T>) -> PlannerResult<T> {
    match result {
        MultiRpcResult::Consistent(Ok(value)) => Ok(value),
        MultiRpcResult::Consistent(Err(err)) => Err(map_rpc_error(err)),
        MultiRpcResult::Inconsistent(_) => Err(PlannerError::NetworkError(
            "No consensus was reached among RPC providers.".to_string(),
        )),
    }
}

fn map_rpc_error(err: RpcError) -> PlannerError {
    PlannerError::NetworkError(format!("{:#?}", err))
}

/// Performs `eth_call` reads and doubles the max response bytes argument if
/// insufficient. Exits the loop if either of the following are satisfied:
/// A) The EVM RPC canister responds with Ok() or an error unrelated to the
///    response size.
/// B) The limit of 2MB is reached.
async fn eth_call_with_retries(to: Address, data: Vec<u8>) -> PlannerResult<String> {
    let rpc_canister = Service(evm_rpc_canister());
    let provider_set = providers();
    let data_string = format!("0x{}", hex::encode(data));
    let mut max_response_bytes = DEFAULT_MAX_RESPONSE_BYTES;

    // There is a 2 MB limit on the response size, an ICP limitation.
    while max_response_bytes < 2_000_000 {
        let transaction = TransactionRequest {
            to: Some(to.to_string()),
            input: Some(data_string.clone()),
            ..Default::default()
        };
        let args = CallArgs {
            transaction,
            block: Some(BlockTag::Latest),
        };

        let response = rpc_canister
            .eth_call(provider_set.clone(), Some(rpc_config(Some(max_response_bytes))), args)
            .await;
        let extracted_response = extract_call_result(response)?;
        match extract_multi_rpc_result(extracted_response) {
            Err(PlannerError::NetworkError(message)) if message.contains("size limit") => {
                max_response_bytes *= 2;
                continue;
            }
            other => return other,
        }
    }

    Err(PlannerError::NetworkError(
        "Request with dynamic retries reached its ceiling of 2 Megabytes.".to_string(),
    ))
}

fn next_rpc_service() -> evm_rpc_types::RpcService {
    RPC_SERVICE.with_borrow_mut(|state| {
        let rpc = match state.front() {
            Some(inner) => inner.clone(),
            None => unreachable!(),
        };
        state.rotate_left(1);
        rpc
    })
}

/// Performs raw JSON-RPC `request` calls, doubling the response size limit
/// and rotating providers until a non-transport error or a result arrives.
async fn request_with_dynamic_retries(json_data: String) -> PlannerResult<String> {
    let rpc_canister = Service(evm_rpc_canister());
    let mut max_response_bytes = DEFAULT_MAX_RESPONSE_BYTES;
    let mut rpc = next_rpc_service();
    let mut rpc_changes = 0;

    // There is a 2 MB limit on the response size, an ICP limitation.
    while max_response_bytes < 2_000_000 && rpc_changes < 3 {
        let cycles = estimate_cycles(&rpc_canister, json_data.clone(), max_response_bytes).await?;
        let call_result = rpc_canister
            .request(rpc.clone(), json_data.clone(), max_response_bytes, cycles)
            .await;

        match extract_call_result(call_result)? {
            Ok(response) => return Ok(response),
            Err(err) => {
                if is_response_size_error(&err) {
                    max_response_bytes *= 2;
                    continue;
                }
                rpc = next_rpc_service();
                rpc_changes += 1;
            }
        }
    }

    Err(PlannerError::NetworkError(
        "Request with dynamic retries exhausted its size and provider budget.".to_string(),
    ))
}

/// Returns the estimated cycles cost of performing the RPC call if successful
async fn estimate_cycles(
    rpc_canister: &Service,
    json_data: String,
    max_response_bytes: u64,
) -> PlannerResult<u128> {
    let rpc = next_rpc_service();
    let call_result = rpc_canister
        .request_cost(rpc, json_data, max_response_bytes)
        .await;

    let extracted_call_result = extract_call_result(call_result)?;

    match extracted_call_result {
        Ok(cost) => {
            let cost_u128 = u128::try_from(cost.0).map_err(|err| {
                PlannerError::Decoding(format!("Error converting Nat to u128: {:#?}", err))
            })?;
            Ok(cost_u128)
        }
        Err(rpc_err) => Err(map_rpc_error(rpc_err)),
    }
}
