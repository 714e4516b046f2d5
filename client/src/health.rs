//! Account value and free collateral of a user account.
//!
//! Values are in `QUOTE_PRECISION`. Account value marks spot balances and
//! perp positions (funding included) at the loaded oracle prices. Free
//! collateral runs the program's own margin calculation over the raw
//! market and oracle accounts.

use drift::instructions::optional_accounts::{load_maps, AccountMaps};
use drift::math::funding::calculate_funding_payment;
use drift::math::margin::calculate_margin_requirement_and_total_collateral_and_liability_info;
use drift::math::spot_balance::{get_signed_token_amount, get_token_amount};
use drift::state::margin_calculation::{MarginCalculation, MarginContext};
use drift::state::perp_market::PerpMarket;
use drift::state::perp_market_map::MarketSet;
use drift::state::spot_market::SpotMarket;
use drift::state::state::OracleGuardRails;
use drift::state::user::{PerpPosition, SpotPosition, User};
use solana_sdk::account::Account;
use solana_sdk::account_info::{AccountInfo, IntoAccountInfo};
use solana_sdk::pubkey::Pubkey;

pub use drift::math::margin::MarginRequirementType;

use crate::context::MarketLookup;
use crate::error::{Error, Result};
use crate::math::BASE_PRECISION;
use crate::orders::{is_perp_position_empty, is_spot_position_empty};

/// Signed token amount of a spot position, in the market's token precision.
pub fn spot_token_amount(position: &SpotPosition, market: &SpotMarket) -> Result<i128> {
    let amount = get_token_amount(position.scaled_balance as u128, market, &position.balance_type)
        .map_err(Error::program)?;
    get_signed_token_amount(amount, &position.balance_type).map_err(Error::program)
}

/// Quote value of a signed token amount at `oracle_price`.
fn token_value(token_amount: i128, oracle_price: i64, decimals: u32) -> i128 {
    token_amount * oracle_price as i128 / 10i128.pow(decimals)
}

/// Net value of all spot deposits minus borrows.
pub fn net_spot_market_value(user: &User, markets: &impl MarketLookup) -> Result<i128> {
    let mut total = 0i128;
    for position in user.spot_positions.iter().filter(|p| !is_spot_position_empty(p)) {
        let ctx = markets
            .spot_market(position.market_index)
            .ok_or(Error::MarketNotLoaded {
                kind: "spot",
                index: position.market_index,
            })?;
        let amount = spot_token_amount(position, &ctx.market)?;
        total += token_value(amount, ctx.price()?, ctx.market.decimals);
    }
    Ok(total)
}

/// Funding owed to (positive) or by (negative) a position since its last
/// settlement.
pub fn unsettled_funding(position: &PerpPosition, market: &PerpMarket) -> Result<i64> {
    let cumulative_funding_rate = if position.base_asset_amount > 0 {
        market.amm.cumulative_funding_rate_long
    } else {
        market.amm.cumulative_funding_rate_short
    };
    calculate_funding_payment(cumulative_funding_rate, position).map_err(Error::program)
}

/// Unrealized pnl of all perp positions marked at the oracle, including
/// unsettled funding.
pub fn unrealized_pnl(user: &User, markets: &impl MarketLookup) -> Result<i128> {
    let mut total = 0i128;
    for position in user.perp_positions.iter().filter(|p| !is_perp_position_empty(p)) {
        let ctx = markets
            .perp_market(position.market_index)
            .ok_or(Error::MarketNotLoaded {
                kind: "perp",
                index: position.market_index,
            })?;
        total += position.base_asset_amount as i128 * ctx.price()? as i128 / BASE_PRECISION as i128
            + position.quote_asset_amount as i128
            + unsettled_funding(position, &ctx.market)? as i128;
    }
    Ok(total)
}

/// Net spot value plus unrealized perp pnl.
pub fn account_value(user: &User, markets: &impl MarketLookup) -> Result<i128> {
    Ok(net_spot_market_value(user, markets)? + unrealized_pnl(user, markets)?)
}

/// Runs the program's margin calculation for `user`.
///
/// `accounts` are the oracle, spot market and perp market accounts in
/// remaining accounts order, as returned by
/// [`DriftClient::margin_accounts`](crate::DriftClient::margin_accounts).
pub fn margin_calculation(
    user: &User,
    accounts: &mut [(Pubkey, Account)],
    slot: u64,
    oracle_guard_rails: Option<OracleGuardRails>,
    requirement: MarginRequirementType,
) -> Result<MarginCalculation> {
    let infos: Vec<AccountInfo> = accounts
        .iter_mut()
        .map(|(key, account)| (&*key, account).into_account_info())
        .collect();
    let writable_perp = MarketSet::new();
    let writable_spot = MarketSet::new();
    let AccountMaps {
        perp_market_map,
        spot_market_map,
        mut oracle_map,
    } = load_maps(
        &mut infos.iter().peekable(),
        &writable_perp,
        &writable_spot,
        slot,
        oracle_guard_rails,
    )
    .map_err(Error::program)?;

    calculate_margin_requirement_and_total_collateral_and_liability_info(
        user,
        &perp_market_map,
        &spot_market_map,
        &mut oracle_map,
        MarginContext::standard(requirement),
    )
    .map_err(Error::program)
}

/// Collateral left for new positions (`Initial`) or before liquidation
/// (`Maintenance`). Never negative.
pub fn free_collateral(
    user: &User,
    accounts: &mut [(Pubkey, Account)],
    slot: u64,
    oracle_guard_rails: Option<OracleGuardRails>,
    requirement: MarginRequirementType,
) -> Result<u128> {
    margin_calculation(user, accounts, slot, oracle_guard_rails, requirement)?
        .get_free_collateral()
        .map_err(Error::program)
}
