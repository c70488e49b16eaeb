//! Candid client types for the EVM RPC canister, trimmed to the read-only
//! surface this canister uses (`eth_call` and raw JSON-RPC `request`).

use candid::{self, CandidType, Deserialize, Nat, Principal};
use evm_rpc_types::{MultiRpcResult, RpcConfig, RpcResult, RpcService, RpcServices};
use ic_exports::ic_cdk::{self, api::call::CallResult as Result};
use serde::Serialize;

/// Block selector for read calls
#[derive(Clone, Debug, PartialEq, Eq, CandidType, Deserialize, Default)]
pub enum BlockTag {
    #[default]
    Latest,
    Finalized,
    Safe,
    Earliest,
    Pending,
    Number(Nat),
}

#[derive(Clone, Debug, PartialEq, Eq, CandidType, Deserialize)]
pub struct CallArgs {
    pub transaction: TransactionRequest,
    /// Integer block number, or "latest" for the last mined block or "pending", "earliest" for not yet mined transactions.
    /// Default to "latest" if unspecified, see https://github.com/ethereum/execution-apis/issues/461.
    pub block: Option<BlockTag>,
}

/// Read-call transaction envelope; only `to` and `input` are populated here,
/// the remaining fields exist to satisfy the canister's record shape.
#[derive(Clone, Debug, Default, PartialEq, Eq, CandidType, Deserialize)]
pub struct TransactionRequest {
    /// The type of the transaction:
    /// - "0x0" for legacy transactions (pre- EIP-2718)
    /// - "0x1" for access list transactions (EIP-2930)
    /// - "0x2" for EIP-1559 transactions
    #[serde(rename = "type")]
    pub tx_type: Option<String>,

    /// Transaction nonce
    pub nonce: Option<Nat>,

    /// Address of the receiver or `None` in a contract creation transaction.
    pub to: Option<String>,

    /// The address of the sender.
    pub from: Option<String>,

    /// Gas limit for the transaction.
    pub gas: Option<Nat>,

    /// Amount of ETH sent with this transaction.
    pub value: Option<Nat>,

    /// Transaction input data
    pub input: Option<String>,

    /// The legacy gas price willing to be paid by the sender in wei.
    #[serde(rename = "gasPrice")]
    pub gas_price: Option<Nat>,

    /// Maximum fee per gas the sender is willing to pay to miners in wei.
    #[serde(rename = "maxPriorityFeePerGas")]
    pub max_priority_fee_per_gas: Option<Nat>,

    /// The maximum total fee per gas the sender is willing to pay (includes the network / base fee and miner / priority fee) in wei.
    #[serde(rename = "maxFeePerGas")]
    pub max_fee_per_gas: Option<Nat>,

    /// The maximum total fee per gas the sender is willing to pay for blob gas in wei.
    #[serde(rename = "maxFeePerBlobGas")]
    pub max_fee_per_blob_gas: Option<Nat>,

    /// EIP-2930 access list
    #[serde(rename = "accessList")]
    pub access_list: Option<AccessList>,

    /// List of versioned blob hashes associated with the transaction's EIP-4844 data blobs.
    #[serde(rename = "blobVersionedHashes")]
    pub blob_versioned_hashes: Option<Vec<String>>,

    /// Raw blob data.
    pub blobs: Option<Vec<String>>,

    /// Chain ID that this transaction is valid on.
    #[serde(rename = "chainId")]
    pub chain_id: Option<Nat>,
}

#[derive(Clone, Debug, PartialEq, Eq, CandidType, Deserialize)]
#[serde(transparent)]
pub struct AccessList(pub Vec<AccessListEntry>);

#[derive(Clone, Debug, PartialEq, Eq, CandidType, Deserialize)]
pub struct AccessListEntry {
    pub address: String,
    #[serde(rename = "storageKeys")]
    pub storage_keys: Vec<String>,
}

/// The HTTPS response format for raw JSON-RPC requests.
#[derive(Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EthCallResponse {
    pub id: u64,
    pub jsonrpc: String,
    pub result: String,
}

/// EVM RPC canister handle
#[derive(Copy, Clone, Debug)]
pub struct Service(pub Principal);

impl Default for Service {
    fn default() -> Self {
        Self(Principal::anonymous())
    }
}

impl Service {
    pub async fn request(
        &self,
        arg0: RpcService,
        arg1: String,
        arg2: u64,
        cycles: u128,
    ) -> Result<(RpcResult<String>,)> {
        ic_cdk::api::call::call_with_payment128(self.0, "request", (arg0, arg1, arg2), cycles).await
    }

    pub async fn request_cost(
        &self,
        arg0: RpcService,
        arg1: String,
        arg2: u64,
    ) -> Result<(RpcResult<Nat>,)> {
        ic_cdk::call(self.0, "requestCost", (arg0, arg1, arg2)).await
    }

    pub async fn eth_call(
        &self,
        source: RpcServices,
        config: Option<RpcConfig>,
        args: CallArgs,
    ) -> Result<(MultiRpcResult<String>,)> {
        ic_cdk::call(self.0, "eth_call", (source, config, args)).await
    }
}
