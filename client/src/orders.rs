//! Order parameter construction and read helpers over a `User` account.

use drift::controller::position::PositionDirection;
use drift::state::order_params::{OrderParams, PostOnlyParam};
use drift::state::user::{MarketType, Order, OrderStatus, OrderType, PerpPosition, SpotPosition, User};

/// Builds [`OrderParams`] for `place_perp_order` and signed-message orders.
///
/// ```rust
/// use drift::controller::position::PositionDirection;
/// use drift_client::orders::OrderBuilder;
///
/// let params = OrderBuilder::limit(0, PositionDirection::Long, 100_000_000)
///     .price(150_000_000)
///     .build();
/// assert_eq!(params.price, 150_000_000);
/// ```
#[derive(Clone, Debug)]
pub struct OrderBuilder {
    params: OrderParams,
}

impl OrderBuilder {
    fn new(
        order_type: OrderType,
        market_index: u16,
        direction: PositionDirection,
        base_asset_amount: u64,
    ) -> Self {
        Self {
            params: OrderParams {
                order_type,
                market_type: MarketType::Perp,
                direction,
                base_asset_amount,
                market_index,
                ..OrderParams::default()
            },
        }
    }

    pub fn limit(market_index: u16, direction: PositionDirection, base_asset_amount: u64) -> Self {
        Self::new(OrderType::Limit, market_index, direction, base_asset_amount)
    }

    pub fn market(market_index: u16, direction: PositionDirection, base_asset_amount: u64) -> Self {
        Self::new(OrderType::Market, market_index, direction, base_asset_amount)
    }

    /// Auction priced relative to the oracle.
    pub fn oracle(market_index: u16, direction: PositionDirection, base_asset_amount: u64) -> Self {
        Self::new(OrderType::Oracle, market_index, direction, base_asset_amount)
    }

    pub fn market_type(mut self, market_type: MarketType) -> Self {
        self.params.market_type = market_type;
        self
    }

    pub fn price(mut self, price: u64) -> Self {
        self.params.price = price;
        self
    }

    /// Floating limit: the order rests at oracle + `offset`.
    pub fn oracle_price_offset(mut self, offset: i32) -> Self {
        self.params.oracle_price_offset = Some(offset);
        self
    }

    /// Price moves linearly from `start` to `end` over `duration` slots.
    pub fn auction(mut self, start: i64, end: i64, duration: u8) -> Self {
        self.params.auction_start_price = Some(start);
        self.params.auction_end_price = Some(end);
        self.params.auction_duration = Some(duration);
        self
    }

    pub fn reduce_only(mut self, reduce_only: bool) -> Self {
        self.params.reduce_only = reduce_only;
        self
    }

    pub fn post_only(mut self, post_only: PostOnlyParam) -> Self {
        self.params.post_only = post_only;
        self
    }

    pub fn user_order_id(mut self, id: u8) -> Self {
        self.params.user_order_id = id;
        self
    }

    pub fn build(self) -> OrderParams {
        self.params
    }
}

/// Orders still resting or in auction.
pub fn open_orders(user: &User) -> impl Iterator<Item = &Order> {
    user.orders.iter().filter(|o| o.status == OrderStatus::Open)
}

pub fn perp_position(user: &User, market_index: u16) -> Option<&PerpPosition> {
    user.perp_positions
        .iter()
        .find(|p| p.market_index == market_index && !is_perp_position_empty(p))
}

pub fn spot_position(user: &User, market_index: u16) -> Option<&SpotPosition> {
    user.spot_positions
        .iter()
        .find(|p| p.market_index == market_index && !is_spot_position_empty(p))
}

pub(crate) fn is_perp_position_empty(position: &PerpPosition) -> bool {
    position.base_asset_amount == 0 && position.quote_asset_amount == 0 && position.open_orders == 0
}

pub(crate) fn is_spot_position_empty(position: &SpotPosition) -> bool {
    position.scaled_balance == 0 && position.open_orders == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let params = OrderBuilder::limit(3, PositionDirection::Short, 42).build();
        assert_eq!(params.order_type, OrderType::Limit);
        assert_eq!(params.market_type, MarketType::Perp);
        assert_eq!(params.direction, PositionDirection::Short);
        assert_eq!(params.market_index, 3);
        assert_eq!(params.base_asset_amount, 42);
        assert_eq!(params.price, 0);
        assert_eq!(params.oracle_price_offset, None);
        assert_eq!(params.auction_duration, None);
        assert!(!params.reduce_only);
    }

    #[test]
    fn test_builder_auction_and_offset() {
        let params = OrderBuilder::oracle(0, PositionDirection::Long, 10)
            .auction(-150, 150, 50)
            .build();
        assert_eq!(params.order_type, OrderType::Oracle);
        assert_eq!(params.auction_start_price, Some(-150));
        assert_eq!(params.auction_end_price, Some(150));
        assert_eq!(params.auction_duration, Some(50));

        let floating = OrderBuilder::limit(0, PositionDirection::Long, 10)
            .oracle_price_offset(-1_500_000)
            .reduce_only(true)
            .build();
        assert_eq!(floating.oracle_price_offset, Some(-1_500_000));
        assert!(floating.reduce_only);
    }

    #[test]
    fn test_user_lookups() {
        let mut user = User::default();
        user.orders[1] = Order {
            status: OrderStatus::Open,
            order_id: 7,
            ..Order::default()
        };
        user.perp_positions[2] = PerpPosition {
            market_index: 5,
            base_asset_amount: 1,
            ..PerpPosition::default()
        };
        user.spot_positions[0] = SpotPosition {
            market_index: 0,
            scaled_balance: 10,
            ..SpotPosition::default()
        };

        let ids: Vec<u32> = open_orders(&user).map(|o| o.order_id).collect();
        assert_eq!(ids, vec![7]);
        assert_eq!(perp_position(&user, 5).map(|p| p.base_asset_amount), Some(1));
        assert!(perp_position(&user, 0).is_none());
        assert_eq!(spot_position(&user, 0).map(|p| p.scaled_balance), Some(10));
        assert!(spot_position(&user, 1).is_none());
    }
}
