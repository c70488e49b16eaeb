//! Candid types for the exchange rate canister (XRC) interface

use candid::CandidType;
use serde::Deserialize;

use super::error::*;

/// Asset class recognized by the exchange rate canister
#[derive(CandidType, Deserialize, Clone, Debug, PartialEq)]
pub enum AssetClass {
    Cryptocurrency,
    FiatCurrency,
}

/// An asset symbol with its class
#[derive(CandidType, Deserialize, Clone, Debug, PartialEq)]
pub struct Asset {
    pub symbol: String,
    pub class: AssetClass,
}

/// Request payload for `get_exchange_rate`
#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct GetExchangeRateRequest {
    pub base_asset: Asset,
    pub quote_asset: Asset,
    /// UNIX epoch seconds; `None` requests the latest rate
    pub timestamp: Option<u64>,
}

/// Rate metadata returned alongside every exchange rate
#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct ExchangeRateMetadata {
    pub decimals: u32,
    pub base_asset_num_queried_sources: u64,
    pub base_asset_num_received_rates: u64,
    pub quote_asset_num_queried_sources: u64,
    pub quote_asset_num_received_rates: u64,
    pub standard_deviation: u64,
    pub forex_timestamp: Option<u64>,
}

/// A scaled exchange rate: the real rate is `rate / 10^metadata.decimals`
#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct ExchangeRate {
    pub base_asset: Asset,
    pub quote_asset: Asset,
    pub timestamp: u64,
    pub rate: u64,
    pub metadata: ExchangeRateMetadata,
}

/// Errors returned by the exchange rate canister
#[derive(CandidType, Deserialize, Clone, Debug, PartialEq)]
pub enum ExchangeRateError {
    AnonymousPrincipalNotAllowed,
    Pending,
    CryptoBaseAssetNotFound,
    CryptoQuoteAssetNotFound,
    StablecoinRateNotFound,
    StablecoinRateTooFewRates,
    StablecoinRateZeroRate,
    ForexInvalidTimestamp,
    ForexBaseAssetNotFound,
    ForexQuoteAssetNotFound,
    ForexAssetsNotFound,
    RateLimited,
    NotEnoughCycles,
    FailedToAcceptCycles,
    InflightCryptoUsdtRateAlreadyInProgress,
    Other { code: u32, description: String },
}

/// Response payload for `get_exchange_rate`
pub type GetExchangeRateResult = Result<ExchangeRate, ExchangeRateError>;

/// Maps an exchange-rate canister error onto the planner taxonomy.
/// Pair-not-found conditions keep the original pair for the caller.
pub fn map_exchange_rate_error(err: ExchangeRateError, from: &str, to: &str) -> PlannerError {
    match err {
        ExchangeRateError::RateLimited | ExchangeRateError::Pending => PlannerError::RateLimited,
        ExchangeRateError::AnonymousPrincipalNotAllowed => PlannerError::ApiKeyMissing,
        ExchangeRateError::NotEnoughCycles | ExchangeRateError::FailedToAcceptCycles => {
            PlannerError::NetworkError(format!("Exchange rate canister refused the call: {:#?}", err))
        }
        ExchangeRateError::InflightCryptoUsdtRateAlreadyInProgress => {
            PlannerError::NetworkError("A rate for this pair is already being resolved.".to_string())
        }
        _ => PlannerError::RateUnavailable {
            from: from.to_string(),
            to: to.to_string(),
        },
    }
}
