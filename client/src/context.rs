use std::collections::HashMap;

use drift::state::perp_market::{ContractType, PerpMarket};
use drift::state::spot_market::SpotMarket;
use solana_sdk::pubkey::Pubkey;

use crate::error::{Error, Result};
use crate::math::token_precision;
use crate::utils::decode_name;

#[derive(Clone)]
pub struct PerpMarketContext {
    pub address: Pubkey,
    pub market: PerpMarket,
    /// Latest oracle price in `PRICE_PRECISION`, `None` when the oracle
    /// could not be read.
    pub oracle_price: Option<i64>,
}

impl PerpMarketContext {
    pub fn index(&self) -> u16 {
        self.market.market_index
    }

    pub fn price(&self) -> Result<i64> {
        self.oracle_price.ok_or(Error::OraclePriceUnavailable {
            kind: "perp",
            index: self.index(),
        })
    }

    pub fn name(&self) -> String {
        decode_name(&self.market.name)
    }

    pub fn oracle(&self) -> Pubkey {
        self.market.amm.oracle
    }

    pub fn min_order_size(&self) -> u64 {
        self.market.amm.min_order_size
    }

    pub fn tick_size(&self) -> u64 {
        self.market.amm.order_tick_size.max(1)
    }

    pub fn is_prediction_market(&self) -> bool {
        self.market.contract_type == ContractType::Prediction
    }
}

#[derive(Clone)]
pub struct SpotMarketContext {
    pub address: Pubkey,
    pub market: SpotMarket,
    pub oracle_price: Option<i64>,
}

impl SpotMarketContext {
    pub fn index(&self) -> u16 {
        self.market.market_index
    }

    pub fn price(&self) -> Result<i64> {
        self.oracle_price.ok_or(Error::OraclePriceUnavailable {
            kind: "spot",
            index: self.index(),
        })
    }

    pub fn name(&self) -> String {
        decode_name(&self.market.name)
    }

    pub fn oracle(&self) -> Pubkey {
        self.market.oracle
    }

    /// `10^decimals` of the market's token.
    pub fn precision(&self) -> u128 {
        token_precision(self.market.decimals)
    }
}

/// Access to loaded markets by index.
pub trait MarketLookup {
    fn perp_market(&self, market_index: u16) -> Option<PerpMarketContext>;
    fn spot_market(&self, market_index: u16) -> Option<SpotMarketContext>;
}

/// Plain in-memory market set.
#[derive(Clone, Default)]
pub struct MarketMap {
    pub perp: HashMap<u16, PerpMarketContext>,
    pub spot: HashMap<u16, SpotMarketContext>,
}

impl MarketMap {
    pub fn insert_perp(&mut self, ctx: PerpMarketContext) {
        self.perp.insert(ctx.index(), ctx);
    }

    pub fn insert_spot(&mut self, ctx: SpotMarketContext) {
        self.spot.insert(ctx.index(), ctx);
    }
}

impl MarketLookup for MarketMap {
    fn perp_market(&self, market_index: u16) -> Option<PerpMarketContext> {
        self.perp.get(&market_index).cloned()
    }

    fn spot_market(&self, market_index: u16) -> Option<SpotMarketContext> {
        self.spot.get(&market_index).cloned()
    }
}
