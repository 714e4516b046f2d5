//! Spot market borrow and deposit rates.
//!
//! Rates are annualized in `SPOT_RATE_PRECISION`. The `delta` arguments
//! let callers see how a hypothetical deposit (positive) or borrow
//! (negative), in token units, would move the rate.

use drift::math::spot_balance::{calculate_utilization, get_token_amount};
use drift::state::spot_market::{SpotBalanceType, SpotMarket};

use crate::error::{Error, Result};
use crate::math::{PERCENTAGE_PRECISION, SPOT_UTILIZATION_PRECISION};

/// `min_borrow_rate` is stored in units of 0.5%.
const MIN_BORROW_RATE_UNIT: u128 = PERCENTAGE_PRECISION / 200;

/// Token amounts deposited into and borrowed from the market.
pub fn market_token_amounts(market: &SpotMarket) -> Result<(u128, u128)> {
    let deposits = get_token_amount(market.deposit_balance, market, &SpotBalanceType::Deposit)
        .map_err(Error::program)?;
    let borrows = get_token_amount(market.borrow_balance, market, &SpotBalanceType::Borrow)
        .map_err(Error::program)?;
    Ok((deposits, borrows))
}

/// Borrowed share of deposits in `SPOT_UTILIZATION_PRECISION` after a
/// hypothetical deposit (positive `delta`) or borrow (negative).
pub fn utilization_after(market: &SpotMarket, delta: i128) -> Result<u128> {
    let (mut deposits, mut borrows) = market_token_amounts(market)?;
    if delta > 0 {
        deposits += delta as u128;
    } else {
        borrows += delta.unsigned_abs();
    }
    calculate_utilization(deposits, borrows).map_err(Error::program)
}

/// Borrow rate at a given utilization.
///
/// Linear up to the optimal utilization, then a steeper line to the max
/// rate at full utilization. Floored by the market's minimum rate.
pub fn borrow_rate_at(market: &SpotMarket, utilization: u128) -> u128 {
    let optimal_utilization = market.optimal_utilization as u128;
    let optimal_rate = market.optimal_borrow_rate as u128;
    let max_rate = market.max_borrow_rate as u128;

    let rate = if utilization > optimal_utilization {
        let surplus = utilization - optimal_utilization;
        let slope = max_rate.saturating_sub(optimal_rate) * SPOT_UTILIZATION_PRECISION
            / (SPOT_UTILIZATION_PRECISION - optimal_utilization).max(1);
        optimal_rate + surplus * slope / SPOT_UTILIZATION_PRECISION
    } else if optimal_utilization == 0 {
        0
    } else {
        optimal_rate * utilization / optimal_utilization
    };

    rate.max(market.min_borrow_rate as u128 * MIN_BORROW_RATE_UNIT)
}

pub fn calculate_borrow_rate(market: &SpotMarket, delta: i128) -> Result<u128> {
    Ok(borrow_rate_at(market, utilization_after(market, delta)?))
}

/// Rate earned by depositors: the borrow rate scaled by utilization, less
/// the insurance fund's cut.
pub fn calculate_deposit_rate(market: &SpotMarket, delta: i128) -> Result<u128> {
    let utilization = utilization_after(market, delta)?;
    let borrow_rate = borrow_rate_at(market, utilization);
    let total_factor = (market.insurance_fund.total_factor as u128).min(PERCENTAGE_PRECISION);
    Ok(borrow_rate * (PERCENTAGE_PRECISION - total_factor) * utilization
        / SPOT_UTILIZATION_PRECISION
        / PERCENTAGE_PRECISION)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPOT_CUMULATIVE_INTEREST_PRECISION: u128 = 10_000_000_000;
    const SPOT_BALANCE_PRECISION: u128 = 1_000_000_000;

    fn market(deposits: u128, borrows: u128) -> SpotMarket {
        SpotMarket {
            decimals: 6,
            cumulative_deposit_interest: SPOT_CUMULATIVE_INTEREST_PRECISION,
            cumulative_borrow_interest: SPOT_CUMULATIVE_INTEREST_PRECISION,
            deposit_balance: deposits * SPOT_BALANCE_PRECISION,
            borrow_balance: borrows * SPOT_BALANCE_PRECISION,
            optimal_utilization: 800_000,
            optimal_borrow_rate: 100_000,
            max_borrow_rate: 1_000_000,
            ..SpotMarket::default()
        }
    }

    #[test]
    fn test_utilization_after() {
        assert_eq!(utilization_after(&market(0, 0), 0).unwrap(), 0);
        assert_eq!(
            utilization_after(&market(0, 0), -5).unwrap(),
            SPOT_UTILIZATION_PRECISION
        );
        assert_eq!(utilization_after(&market(100, 50), 0).unwrap(), 500_000);
        assert_eq!(
            utilization_after(&market(100, 50), 100_000_000).unwrap(),
            250_000
        );
    }

    #[test]
    fn test_borrow_rate_curve() {
        let m = market(0, 0);
        assert_eq!(borrow_rate_at(&m, 0), 0);
        assert_eq!(borrow_rate_at(&m, 500_000), 62_500);
        assert_eq!(borrow_rate_at(&m, 800_000), 100_000);
        assert_eq!(borrow_rate_at(&m, 900_000), 550_000);
        assert_eq!(borrow_rate_at(&m, 1_000_000), 1_000_000);

        let floored = SpotMarket {
            min_borrow_rate: 2,
            ..m
        };
        assert_eq!(borrow_rate_at(&floored, 0), 10_000);
    }

    #[test]
    fn test_rates_with_delta() {
        // 100 deposited, 50 borrowed
        let m = market(100, 50);
        assert_eq!(calculate_borrow_rate(&m, 0).unwrap(), 62_500);
        assert_eq!(calculate_deposit_rate(&m, 0).unwrap(), 31_250);

        // another 100 deposited halves utilization
        let more_deposits = 100_000_000;
        assert_eq!(calculate_borrow_rate(&m, more_deposits).unwrap(), 31_250);

        // borrowing 40 more pushes utilization to 90%
        let more_borrows = -40_000_000;
        assert_eq!(calculate_borrow_rate(&m, more_borrows).unwrap(), 550_000);
    }

    #[test]
    fn test_deposit_rate_insurance_cut() {
        let mut m = market(100, 50);
        m.insurance_fund.total_factor = 100_000;
        // 31_250 less 10%
        assert_eq!(calculate_deposit_rate(&m, 0).unwrap(), 28_125);
    }

    #[test]
    fn test_deposit_rate_keeps_precision() {
        // utilization 333_333, borrow rate 41_666
        let mut m = market(300, 100);
        m.insurance_fund.total_factor = 30;
        assert_eq!(utilization_after(&m, 0).unwrap(), 333_333);
        assert_eq!(calculate_borrow_rate(&m, 0).unwrap(), 41_666);
        // 41_666 * 999_970 * 333_333 / 1e12, truncated once
        assert_eq!(calculate_deposit_rate(&m, 0).unwrap(), 13_888);
    }
}
