//! Conversion rate provider.
//!
//! Resolves fiat and crypto pairs through the exchange rate canister with a
//! five-minute cache, a token-bucket request limiter, and stale-value
//! fallback. Every resolved value is written through to stable memory so
//! restarts keep the last known rates.
//!
//! ```plain
//! fetch_rate(from, to)
//!     │ same symbol / USD-pegged pair ──────────────► 1.0
//!     │ fresh cache entry ─────────────────────────► cached value
//!     ▼
//!  token bucket ── empty ──► stale value | RateLimited
//!     │
//!     ▼
//!  pair dispatch ── fiat↔fiat via USDT ── crypto↔fiat direct + fallback
//!     │             fiat→crypto reciprocal ── crypto↔crypto via USD
//!     ▼
//!  round to 8 significant digits, cache, write through
//! ```

use std::borrow::Cow;

use candid::{CandidType, Decode, Encode};
use ic_stable_structures::{storable::Bound, Storable};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::constants::{
    exchange_rate_canister, FIAT_SYMBOLS, RATE_BUCKET_CAPACITY, RATE_BUCKET_REFILL_PER_MINUTE,
    RATE_CACHE_TTL_MS, USD_PEGGED, XRC_CALL_CYCLES,
};
use crate::journal::{JournalCollection, LogType};
use crate::state::{RATE_BUCKET, RATE_CACHE, STABLE_RATES};
use crate::utils::common::{extract_call_result, now_ms, round_rate, scaled_to_decimal};
use crate::utils::error::*;
use crate::utils::exchange::{
    map_exchange_rate_error, Asset, AssetClass, GetExchangeRateRequest, GetExchangeRateResult,
};

/// A cached conversion rate
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CachedRate {
    pub rate: Decimal,
    pub fetched_at: u64,
}

/// Durable counterpart of a cached rate
#[derive(CandidType, Deserialize, Clone)]
pub struct StableRate {
    pub rate: String,
    pub fetched_at: u64,
}

impl Storable for StableRate {
    fn to_bytes(&self) -> Cow<[u8]> {
        Cow::Owned(Encode!(self).expect("Failed to encode rate."))
    }

    fn from_bytes(bytes: Cow<[u8]>) -> Self {
        Decode!(bytes.as_ref(), Self).expect("Failed to decode rate.")
    }

    const BOUND: Bound = Bound::Bounded {
        max_size: 128,
        is_fixed_size: false,
    };
}

/// Token bucket limiting outbound rate requests
#[derive(Clone, Copy, Debug)]
pub struct TokenBucket {
    tokens: u32,
    last_refill_ms: u64,
}

impl Default for TokenBucket {
    fn default() -> Self {
        Self {
            tokens: RATE_BUCKET_CAPACITY,
            last_refill_ms: 0,
        }
    }
}

impl TokenBucket {
    /// Takes one token, refilling first. Returns `false` when the bucket is
    /// empty.
    pub fn try_take(&mut self, now_ms: u64) -> bool {
        let elapsed_minutes = now_ms.saturating_sub(self.last_refill_ms) / 60_000;
        if elapsed_minutes > 0 {
            let refill = elapsed_minutes.saturating_mul(u64::from(RATE_BUCKET_REFILL_PER_MINUTE));
            self.tokens = u32::try_from(u64::from(self.tokens).saturating_add(refill))
                .unwrap_or(RATE_BUCKET_CAPACITY)
                .min(RATE_BUCKET_CAPACITY);
            // keep the fractional minute for the next refill
            self.last_refill_ms += elapsed_minutes * 60_000;
        }
        if self.tokens == 0 {
            return false;
        }
        self.tokens -= 1;
        true
    }
}

/// Read-only rate resolution seam used by non-suspending aggregation code
#[cfg_attr(test, mockall::automock)]
pub trait RateLookup {
    /// Last known rate for the pair, fresh or stale
    fn rate(&self, from: &str, to: &str) -> Option<Decimal>;
}

/// `RateLookup` over the canister's cache and its durable write-through
#[derive(Clone, Copy, Default)]
pub struct CachedRates;

impl RateLookup for CachedRates {
    fn rate(&self, from: &str, to: &str) -> Option<Decimal> {
        let from = from.to_uppercase();
        let to = to.to_uppercase();
        if trivial_rate(&from, &to).is_some() {
            return Some(Decimal::ONE);
        }
        last_known(&from, &to).map(|cached| cached.rate)
    }
}

/// `1.0` for identical symbols and USD-pegged pairs
fn trivial_rate(from: &str, to: &str) -> Option<Decimal> {
    if from == to || (USD_PEGGED.contains(&from) && USD_PEGGED.contains(&to)) {
        return Some(Decimal::ONE);
    }
    None
}

fn is_fiat(symbol: &str) -> bool {
    FIAT_SYMBOLS.contains(&symbol)
}

/// Last cached value for the pair regardless of freshness, hydrating the
/// in-memory map from stable memory when needed
fn last_known(from: &str, to: &str) -> Option<CachedRate> {
    let key = (from.to_string(), to.to_string());
    if let Some(cached) = RATE_CACHE.with_borrow(|cache| cache.get(&key).copied()) {
        return Some(cached);
    }
    let stable = STABLE_RATES.with_borrow(|rates| rates.get(&stable_key(from, to)))?;
    let rate = Decimal::from_str_exact(&stable.rate).ok()?;
    let cached = CachedRate {
        rate,
        fetched_at: stable.fetched_at,
    };
    RATE_CACHE.with_borrow_mut(|cache| cache.insert(key, cached));
    Some(cached)
}

fn stable_key(from: &str, to: &str) -> String {
    format!("{}:{}", from, to)
}

/// Caches a freshly resolved rate in memory and in stable memory
fn store_rate(from: &str, to: &str, rate: Decimal, fetched_at: u64) {
    RATE_CACHE.with_borrow_mut(|cache| {
        cache.insert((from.to_string(), to.to_string()), CachedRate { rate, fetched_at });
    });
    STABLE_RATES.with_borrow_mut(|rates| {
        rates.insert(
            stable_key(from, to),
            StableRate {
                rate: rate.to_string(),
                fetched_at,
            },
        );
    });
}

/// Whether the provider can be used at all. The exchange rate canister is
/// addressed by a hardcoded principal, so this only guards against a broken
/// build-time configuration.
pub fn has_valid_configuration() -> bool {
    exchange_rate_canister().as_slice().len() <= 29
}

/// Public query helper: last known rate with its fetch timestamp
pub fn cached_rate(from: &str, to: &str) -> Option<CachedRate> {
    let from = from.to_uppercase();
    let to = to.to_uppercase();
    if trivial_rate(&from, &to).is_some() {
        return Some(CachedRate {
            rate: Decimal::ONE,
            fetched_at: 0,
        });
    }
    last_known(&from, &to)
}

/// Resolves a conversion rate for the pair.
///
/// Freshness, limiting and fallback behavior:
/// - identical symbols and USD-pegged pairs short-circuit to `1.0`;
/// - cache entries younger than five minutes are returned as-is;
/// - an empty token bucket degrades to the stale value, else `RateLimited`;
/// - any fetch failure degrades to the stale value when one exists.
pub async fn fetch_rate(from: &str, to: &str) -> PlannerResult<Decimal> {
    let from = from.to_uppercase();
    let to = to.to_uppercase();
    if from.trim().is_empty() || to.trim().is_empty() {
        return Err(validation_err("Currency symbols cannot be blank."));
    }
    if let Some(rate) = trivial_rate(&from, &to) {
        return Ok(rate);
    }

    let now = now_ms();
    let stale = last_known(&from, &to);
    if let Some(cached) = stale {
        if now.saturating_sub(cached.fetched_at) <= RATE_CACHE_TTL_MS {
            return Ok(cached.rate);
        }
    }

    if !RATE_BUCKET.with_borrow_mut(|bucket| bucket.try_take(now)) {
        return match stale {
            Some(cached) => Ok(cached.rate),
            None => Err(PlannerError::RateLimited),
        };
    }

    match dispatch_pair(&from, &to).await {
        Ok(rate) => {
            let rate = round_rate(rate);
            store_rate(&from, &to, rate, now);
            Ok(rate)
        }
        Err(err) => match stale {
            Some(cached) => {
                let mut journal = JournalCollection::open(None);
                journal.append_note(
                    Err(err),
                    LogType::RateFetch,
                    format!("Serving stale {}/{} rate from {}.", from, to, cached.fetched_at),
                );
                Ok(cached.rate)
            }
            None => Err(err),
        },
    }
}

/// Routes a non-trivial pair to the conversion path for its kind
async fn dispatch_pair(from: &str, to: &str) -> PlannerResult<Decimal> {
    match (is_fiat(from), is_fiat(to)) {
        (true, true) => fiat_to_fiat(from, to).await,
        (false, true) => crypto_to_fiat(from, to).await,
        (true, false) => {
            let inverse = crypto_to_fiat(to, from).await?;
            if inverse.is_zero() {
                return Err(arithmetic_err("Reciprocal of a zero rate."));
            }
            Decimal::ONE
                .checked_div(inverse)
                .ok_or_else(|| arithmetic_err("Reciprocal rate overflowed."))
        }
        (false, false) => {
            let from_usd = crypto_to_fiat(from, "USD").await?;
            let to_usd = crypto_to_fiat(to, "USD").await?;
            if to_usd.is_zero() {
                return Err(arithmetic_err("Cross rate denominator was zero."));
            }
            from_usd
                .checked_div(to_usd)
                .ok_or_else(|| arithmetic_err("Cross rate overflowed."))
        }
    }
}

/// Fiat cross conversion through USDT: `rate = to_leg / from_leg`
async fn fiat_to_fiat(from: &str, to: &str) -> PlannerResult<Decimal> {
    let from_leg = usdt_leg(from).await?;
    let to_leg = usdt_leg(to).await?;
    if from_leg.is_zero() {
        return Err(arithmetic_err("Fiat cross denominator was zero."));
    }
    to_leg
        .checked_div(from_leg)
        .ok_or_else(|| arithmetic_err("Fiat cross overflowed."))
}

/// One USDT quoted in the given fiat currency
async fn usdt_leg(fiat: &str) -> PlannerResult<Decimal> {
    if USD_PEGGED.contains(&fiat) {
        return Ok(Decimal::ONE);
    }
    exchange_rate("USDT", AssetClass::Cryptocurrency, fiat, AssetClass::FiatCurrency).await
}

/// Crypto priced in fiat: direct lookup with a USDT-quoted fallback for
/// pairs the provider does not list directly
async fn crypto_to_fiat(crypto: &str, fiat: &str) -> PlannerResult<Decimal> {
    let direct =
        exchange_rate(crypto, AssetClass::Cryptocurrency, fiat, AssetClass::FiatCurrency).await;
    match direct {
        Ok(rate) => Ok(rate),
        Err(PlannerError::RateUnavailable { .. }) => {
            let in_usdt = exchange_rate(
                crypto,
                AssetClass::Cryptocurrency,
                "USDT",
                AssetClass::Cryptocurrency,
            )
            .await?;
            let leg = usdt_leg(fiat).await?;
            in_usdt
                .checked_mul(leg)
                .map(round_rate)
                .ok_or_else(|| arithmetic_err("Fallback conversion overflowed."))
        }
        Err(err) => Err(err),
    }
}

/// Fetches one scaled rate from the exchange rate canister
async fn exchange_rate(
    base: &str,
    base_class: AssetClass,
    quote: &str,
    quote_class: AssetClass,
) -> PlannerResult<Decimal> {
    let fetch_args = GetExchangeRateRequest {
        base_asset: Asset {
            symbol: base.to_string(),
            class: base_class,
        },
        quote_asset: Asset {
            symbol: quote.to_string(),
            class: quote_class,
        },
        timestamp: None,
    };

    let call_result: ic_exports::ic_cdk::api::call::CallResult<(GetExchangeRateResult,)> =
        ic_exports::ic_cdk::api::call::call_with_payment128(
            exchange_rate_canister(),
            "get_exchange_rate",
            (fetch_args,),
            XRC_CALL_CYCLES,
        )
        .await;
    let canister_response = extract_call_result(call_result)?;
    match canister_response {
        Ok(response) => {
            let raw = i128::from(response.rate);
            let rate = scaled_to_decimal(raw, response.metadata.decimals)?;
            Ok(round_rate(rate))
        }
        Err(err) => Err(map_exchange_rate_error(err, base, quote)),
    }
}

/// Warms the cache for the given pairs so subsequent synchronous lookups can
/// run without suspending. Failures are deliberately swallowed; lookups fall
/// back to stale or unconverted values.
pub async fn warm_pairs(pairs: Vec<(String, String)>) {
    for (from, to) in pairs {
        let _ = fetch_rate(&from, &to).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn identical_and_pegged_pairs_are_unit() {
        assert_eq!(trivial_rate("EUR", "EUR"), Some(Decimal::ONE));
        assert_eq!(trivial_rate("USD", "USDT"), Some(Decimal::ONE));
        assert_eq!(trivial_rate("USDC", "USDT"), Some(Decimal::ONE));
        assert_eq!(trivial_rate("EUR", "USD"), None);
    }

    #[test]
    fn fiat_classification_covers_the_table() {
        assert!(is_fiat("USD"));
        assert!(is_fiat("EUR"));
        assert!(!is_fiat("BTC"));
        assert!(!is_fiat("USDT"));
    }

    #[test]
    fn bucket_drains_and_refills() {
        let mut bucket = TokenBucket::default();
        for _ in 0..RATE_BUCKET_CAPACITY {
            assert!(bucket.try_take(0));
        }
        assert!(!bucket.try_take(30_000)); // half a minute: no refill yet
        assert!(bucket.try_take(60_000)); // one minute refills the bucket
    }

    #[test]
    fn bucket_keeps_fractional_minutes() {
        let mut bucket = TokenBucket::default();
        for _ in 0..RATE_BUCKET_CAPACITY {
            assert!(bucket.try_take(0));
        }
        // 90 seconds: one whole minute consumed, 30 seconds carried over
        assert!(bucket.try_take(90_000));
        for _ in 0..RATE_BUCKET_CAPACITY - 1 {
            bucket.try_take(90_000);
        }
        // the carried 30 seconds complete a minute at t = 120s
        assert!(bucket.try_take(120_000));
    }

    #[test]
    fn bucket_caps_at_capacity() {
        let mut bucket = TokenBucket::default();
        assert!(bucket.try_take(3_600_000)); // an hour refills at most to capacity
        for _ in 0..RATE_BUCKET_CAPACITY - 1 {
            assert!(bucket.try_take(3_600_000));
        }
        assert!(!bucket.try_take(3_600_000));
    }

    #[test]
    fn store_and_lookup_round_trips_through_both_caches() {
        store_rate("EUR", "USD", dec!(1.1), 1_000);
        assert_eq!(
            last_known("EUR", "USD"),
            Some(CachedRate {
                rate: dec!(1.1),
                fetched_at: 1_000
            })
        );
        // drop the hot cache; the stable copy must hydrate it back
        RATE_CACHE.with_borrow_mut(|cache| cache.clear());
        assert_eq!(
            last_known("EUR", "USD").map(|cached| cached.rate),
            Some(dec!(1.1))
        );
    }

    #[test]
    fn cached_rates_lookup_is_case_insensitive_and_pegged_aware() {
        store_rate("EUR", "USD", dec!(1.1), 1_000);
        let lookup = CachedRates;
        assert_eq!(lookup.rate("eur", "usd"), Some(dec!(1.1)));
        assert_eq!(lookup.rate("USDT", "USDC"), Some(Decimal::ONE));
        assert_eq!(lookup.rate("CHF", "NOK"), None);
    }
}
