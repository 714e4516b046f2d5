//! Fixed point precisions used by the protocol and helpers to turn them
//! into printable numbers.

use drift::state::user::PerpPosition;

pub const BASE_PRECISION: u128 = 1_000_000_000;
pub const PRICE_PRECISION: u128 = 1_000_000;
pub const QUOTE_PRECISION: u128 = 1_000_000;
pub const PERCENTAGE_PRECISION: u128 = 1_000_000;
pub const SPOT_UTILIZATION_PRECISION: u128 = 1_000_000;
pub const SPOT_RATE_PRECISION: u128 = 1_000_000;
pub const SPOT_WEIGHT_PRECISION: u128 = 10_000;
pub const MARGIN_PRECISION: u128 = 10_000;
pub const AMM_TO_QUOTE_PRECISION_RATIO: u128 = BASE_PRECISION / QUOTE_PRECISION;

pub const BASE_PRECISION_U64: u64 = BASE_PRECISION as u64;
pub const QUOTE_PRECISION_U64: u64 = QUOTE_PRECISION as u64;

/// Converts a fixed point value into a float for display.
pub fn convert_to_number(value: i128, precision: u128) -> f64 {
    let precision = precision as i128;
    let whole = value / precision;
    let rem = value % precision;
    whole as f64 + rem as f64 / precision as f64
}

/// Average entry price of a perp position in [`PRICE_PRECISION`], 0 when flat.
pub fn calculate_entry_price(position: &PerpPosition) -> i128 {
    if position.base_asset_amount == 0 {
        return 0;
    }
    (position.quote_entry_amount as i128
        * PRICE_PRECISION as i128
        * AMM_TO_QUOTE_PRECISION_RATIO as i128
        / position.base_asset_amount as i128)
        .abs()
}

/// Offset from the oracle of `pct` (e.g. `0.01` for 1%) below it.
pub fn oracle_offset_pct(oracle_price: i64, pct: f64) -> i64 {
    -((oracle_price as f64 * pct).round() as i64)
}

/// Price `bps` basis points below the oracle.
pub fn price_from_bps(oracle_price: i64, bps: i64) -> i64 {
    oracle_price * (10_000 - bps) / 10_000
}

/// Whole tokens scaled to a market's token precision, `None` on overflow.
pub fn scale_token_amount(whole_tokens: u64, precision: u128) -> Option<u64> {
    u64::try_from(precision)
        .ok()
        .and_then(|precision| whole_tokens.checked_mul(precision))
}

/// Precision of a spot market's token amounts.
pub fn token_precision(decimals: u32) -> u128 {
    10u128.pow(decimals)
}
