//! Local order book built from the open orders of every user account.
//!
//! The book is a snapshot: [`DlobSubscriber`] rebuilds it periodically from
//! an [`OrderSource`] and hands out the latest one. Only resting limit
//! orders are listed: limit orders (trigger limits once triggered) that are
//! post only or past their auction. Taking orders still in auction are
//! priced separately with [`auction_price`].

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use drift::controller::position::PositionDirection;
use drift::math::auction::{calculate_auction_price, is_auction_complete};
use drift::state::user::{MarketType, Order, OrderStatus, OrderTriggerCondition, OrderType, User};
use itertools::Itertools;
use solana_sdk::pubkey::Pubkey;
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::rpc::Rpc;

/// Source of user accounts carrying open orders.
#[async_trait]
pub trait OrderSource: Send + Sync {
    async fn user_accounts_with_orders(&self) -> Result<Vec<(Pubkey, User)>>;
}

/// Loads users with open orders through `getProgramAccounts`.
///
/// This scans the whole program and is heavy on the RPC node.
pub struct ProgramOrderSource {
    rpc: Rpc,
    program_id: Pubkey,
}

impl ProgramOrderSource {
    pub fn new(rpc: Rpc, program_id: Pubkey) -> Self {
        Self { rpc, program_id }
    }
}

#[async_trait]
impl OrderSource for ProgramOrderSource {
    async fn user_accounts_with_orders(&self) -> Result<Vec<(Pubkey, User)>> {
        self.rpc
            .fetch_user_accounts(self.program_id, None, true)
            .await
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DlobOrder {
    /// User account holding the order.
    pub user: Pubkey,
    pub order: Order,
}

/// Query parameters shared by [`Dlob::get_l2`] and [`Dlob::get_l3`].
#[derive(Debug, Clone, Copy)]
pub struct BookParams {
    pub market_index: u16,
    pub market_type: MarketType,
    pub slot: u64,
    pub oracle_price: i64,
    pub tick_size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct L2Level {
    pub price: u64,
    pub size: u64,
}

#[derive(Debug, Default, Clone)]
pub struct L2Orderbook {
    pub bids: Vec<L2Level>,
    pub asks: Vec<L2Level>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct L3Level {
    pub price: u64,
    pub size: u64,
    pub maker: Pubkey,
    pub order_id: u32,
}

#[derive(Debug, Default, Clone)]
pub struct L3Orderbook {
    pub bids: Vec<L3Level>,
    pub asks: Vec<L3Level>,
}

#[derive(Debug, Default, Clone)]
pub struct Dlob {
    orders: Vec<DlobOrder>,
}

impl Dlob {
    pub fn from_users(users: impl IntoIterator<Item = (Pubkey, User)>) -> Self {
        let orders = users
            .into_iter()
            .flat_map(|(user, account)| {
                account
                    .orders
                    .into_iter()
                    .filter(|o| o.status == OrderStatus::Open && remaining_size(o) > 0)
                    .map(move |order| DlobOrder { user, order })
            })
            .collect();
        Self { orders }
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Price level view, best levels first, at most `depth` levels a side.
    pub fn get_l2(&self, params: &BookParams, depth: usize) -> L2Orderbook {
        let l3 = self.get_l3(params);
        L2Orderbook {
            bids: aggregate(&l3.bids, depth),
            asks: aggregate(&l3.asks, depth),
        }
    }

    /// Every resting order, in price then time priority.
    pub fn get_l3(&self, params: &BookParams) -> L3Orderbook {
        let mut bids = Vec::new();
        let mut asks = Vec::new();
        for entry in self.orders.iter().filter(|e| {
            e.order.market_index == params.market_index && e.order.market_type == params.market_type
        }) {
            let Some(price) =
                order_price(&entry.order, params.slot, params.oracle_price, params.tick_size)
            else {
                continue;
            };
            let level = (
                entry.order.slot,
                L3Level {
                    price,
                    size: remaining_size(&entry.order),
                    maker: entry.user,
                    order_id: entry.order.order_id,
                },
            );
            match entry.order.direction {
                PositionDirection::Long => bids.push(level),
                PositionDirection::Short => asks.push(level),
            }
        }

        let bids = bids
            .into_iter()
            .sorted_by(|(slot_a, a), (slot_b, b)| b.price.cmp(&a.price).then(slot_a.cmp(slot_b)))
            .map(|(_, level)| level)
            .collect();
        let asks = asks
            .into_iter()
            .sorted_by(|(slot_a, a), (slot_b, b)| a.price.cmp(&b.price).then(slot_a.cmp(slot_b)))
            .map(|(_, level)| level)
            .collect();
        L3Orderbook { bids, asks }
    }
}

fn remaining_size(order: &Order) -> u64 {
    order
        .base_asset_amount
        .saturating_sub(order.base_asset_amount_filled)
}

fn aggregate(levels: &[L3Level], depth: usize) -> Vec<L2Level> {
    // Input is already sorted best first; keep that order while merging.
    let mut index: BTreeMap<u64, usize> = BTreeMap::new();
    let mut out: Vec<L2Level> = Vec::new();
    for level in levels {
        match index.get(&level.price) {
            Some(&i) => out[i].size += level.size,
            None => {
                if out.len() == depth {
                    break;
                }
                index.insert(level.price, out.len());
                out.push(L2Level {
                    price: level.price,
                    size: level.size,
                });
            }
        }
    }
    out
}

/// Whether `order` rests on the book at `slot`: a limit order, or a
/// trigger limit that has triggered, that is post only or done with its
/// auction.
pub fn is_resting_limit_order(order: &Order, slot: u64) -> bool {
    let is_limit = match order.order_type {
        OrderType::Limit => true,
        OrderType::TriggerLimit => matches!(
            order.trigger_condition,
            OrderTriggerCondition::TriggeredAbove | OrderTriggerCondition::TriggeredBelow
        ),
        _ => false,
    };
    // the slot source can lag behind orders placed since its last poll
    is_limit
        && (order.post_only
            || is_auction_complete(order.slot, order.auction_duration, slot.max(order.slot))
                .unwrap_or(false))
}

/// Price a resting limit order sits at: oracle + offset for floating
/// limits (at least one tick), else its fixed price.
pub fn resting_limit_price(order: &Order, oracle_price: i64, tick_size: u64) -> Option<u64> {
    if order.oracle_price_offset != 0 {
        let price = oracle_price.saturating_add(order.oracle_price_offset as i64);
        return Some(price.max(tick_size as i64) as u64);
    }
    (order.price > 0).then_some(order.price)
}

/// Book price of `order` at `slot`, `None` when it does not rest on the
/// book.
pub fn order_price(order: &Order, slot: u64, oracle_price: i64, tick_size: u64) -> Option<u64> {
    if !is_resting_limit_order(order, slot) {
        return None;
    }
    resting_limit_price(order, oracle_price, tick_size)
}

/// Current auction price of `order`. Slots older than the order count as
/// the order's own slot.
pub fn auction_price(
    order: &Order,
    slot: u64,
    oracle_price: i64,
    tick_size: u64,
    is_prediction_market: bool,
) -> Result<u64> {
    calculate_auction_price(
        order,
        slot.max(order.slot),
        tick_size,
        Some(oracle_price),
        is_prediction_market,
    )
    .map_err(Error::program)
}

/// Periodically rebuilds a [`Dlob`] from an [`OrderSource`].
pub struct DlobSubscriber {
    rx: watch::Receiver<Arc<Dlob>>,
    handle: JoinHandle<()>,
}

impl DlobSubscriber {
    /// Builds the first book, then refreshes it every `update_frequency`.
    /// A failed refresh keeps the previous book.
    pub async fn subscribe(source: Arc<dyn OrderSource>, update_frequency: Duration) -> Result<Self> {
        let initial = Dlob::from_users(source.user_accounts_with_orders().await?);
        debug!(orders = initial.len(), "initial dlob built");
        let (tx, rx) = watch::channel(Arc::new(initial));

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(update_frequency);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match source.user_accounts_with_orders().await {
                    Ok(users) => {
                        let dlob = Dlob::from_users(users);
                        debug!(orders = dlob.len(), "dlob rebuilt");
                        tx.send_replace(Arc::new(dlob));
                    }
                    Err(e) => warn!(%e, "failed to refresh dlob"),
                }
                if tx.is_closed() {
                    break;
                }
            }
        });

        Ok(Self { rx, handle })
    }

    pub fn get_dlob(&self) -> Arc<Dlob> {
        self.rx.borrow().clone()
    }
}

impl Drop for DlobSubscriber {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const ORACLE: i64 = 100_000_000;

    fn params() -> BookParams {
        BookParams {
            market_index: 0,
            market_type: MarketType::Perp,
            slot: 1_000,
            oracle_price: ORACLE,
            tick_size: 1,
        }
    }

    fn limit(id: u32, direction: PositionDirection, price: u64, size: u64, slot: u64) -> Order {
        Order {
            status: OrderStatus::Open,
            order_type: OrderType::Limit,
            market_type: MarketType::Perp,
            order_id: id,
            direction,
            price,
            base_asset_amount: size,
            slot,
            ..Order::default()
        }
    }

    fn user_with(orders: &[Order]) -> (Pubkey, User) {
        let mut user = User::default();
        for (i, order) in orders.iter().enumerate() {
            user.orders[i] = *order;
        }
        (Pubkey::new_unique(), user)
    }

    #[test]
    fn test_l3_sorted_by_price_then_slot() {
        let (maker_a, user_a) = user_with(&[
            limit(1, PositionDirection::Long, 99_000_000, 10, 5),
            limit(2, PositionDirection::Short, 101_000_000, 10, 5),
        ]);
        let (maker_b, user_b) = user_with(&[
            limit(1, PositionDirection::Long, 99_000_000, 20, 3),
            limit(2, PositionDirection::Long, 99_500_000, 5, 9),
            limit(3, PositionDirection::Short, 100_500_000, 7, 9),
        ]);
        let dlob = Dlob::from_users(vec![(maker_a, user_a), (maker_b, user_b)]);
        assert_eq!(dlob.len(), 5);

        let l3 = dlob.get_l3(&params());
        let bids: Vec<(u64, Pubkey)> = l3.bids.iter().map(|l| (l.price, l.maker)).collect();
        assert_eq!(
            bids,
            vec![
                (99_500_000, maker_b),
                (99_000_000, maker_b),
                (99_000_000, maker_a)
            ]
        );
        let asks: Vec<u64> = l3.asks.iter().map(|l| l.price).collect();
        assert_eq!(asks, vec![100_500_000, 101_000_000]);
    }

    #[test]
    fn test_l2_aggregates_and_truncates() {
        let users = vec![
            user_with(&[
                limit(1, PositionDirection::Long, 99_000_000, 10, 1),
                limit(2, PositionDirection::Long, 98_000_000, 1, 1),
                limit(3, PositionDirection::Long, 97_000_000, 1, 1),
            ]),
            user_with(&[limit(1, PositionDirection::Long, 99_000_000, 15, 2)]),
        ];
        let dlob = Dlob::from_users(users);

        let l2 = dlob.get_l2(&params(), 2);
        assert_eq!(
            l2.bids,
            vec![
                L2Level { price: 99_000_000, size: 25 },
                L2Level { price: 98_000_000, size: 1 },
            ]
        );
        assert!(l2.asks.is_empty());
    }

    #[test]
    fn test_filters_market_and_filled_orders() {
        let mut filled = limit(1, PositionDirection::Long, 99_000_000, 10, 1);
        filled.base_asset_amount_filled = 10;
        let mut other_market = limit(2, PositionDirection::Long, 99_000_000, 10, 1);
        other_market.market_index = 1;
        let mut spot = limit(3, PositionDirection::Long, 99_000_000, 10, 1);
        spot.market_type = MarketType::Spot;
        let mut partially_filled = limit(4, PositionDirection::Short, 101_000_000, 10, 1);
        partially_filled.base_asset_amount_filled = 4;

        let dlob = Dlob::from_users(vec![user_with(&[
            filled,
            other_market,
            spot,
            partially_filled,
        ])]);
        let l3 = dlob.get_l3(&params());
        assert!(l3.bids.is_empty());
        assert_eq!(l3.asks.len(), 1);
        assert_eq!(l3.asks[0].size, 6);
        assert_eq!(l3.asks[0].order_id, 4);
    }

    #[test]
    fn test_order_prices() {
        let fixed = limit(1, PositionDirection::Long, 99_000_000, 1, 1);
        assert_eq!(order_price(&fixed, 1_000, ORACLE, 1), Some(99_000_000));

        let mut floating = limit(2, PositionDirection::Long, 0, 1, 1);
        floating.oracle_price_offset = -1_000_000;
        assert_eq!(order_price(&floating, 1_000, ORACLE, 1), Some(99_000_000));

        // floating limits never price below one tick
        floating.oracle_price_offset = -200_000_000;
        assert_eq!(order_price(&floating, 1_000, ORACLE, 10), Some(10));

        let mut untriggered = limit(4, PositionDirection::Long, 99_000_000, 1, 1);
        untriggered.order_type = OrderType::TriggerLimit;
        untriggered.trigger_condition = OrderTriggerCondition::Above;
        assert_eq!(order_price(&untriggered, 1_000, ORACLE, 1), None);

        let triggered = Order {
            trigger_condition: OrderTriggerCondition::TriggeredAbove,
            ..untriggered
        };
        assert_eq!(order_price(&triggered, 1_000, ORACLE, 1), Some(99_000_000));
    }

    #[test]
    fn test_taking_orders_are_not_listed() {
        let mut market = limit(1, PositionDirection::Long, 101_000_000, 1, 1);
        market.order_type = OrderType::Market;
        let mut oracle = limit(2, PositionDirection::Short, 0, 1, 1);
        oracle.order_type = OrderType::Oracle;
        oracle.oracle_price_offset = 500_000;
        let mut trigger_market = limit(3, PositionDirection::Long, 99_000_000, 1, 1);
        trigger_market.order_type = OrderType::TriggerMarket;
        trigger_market.trigger_condition = OrderTriggerCondition::TriggeredBelow;

        for order in [market, oracle, trigger_market] {
            assert_eq!(order_price(&order, 1_000, ORACLE, 1), None);
        }
        let l3 = Dlob::from_users(vec![user_with(&[market, oracle, trigger_market])]).get_l3(&params());
        assert!(l3.bids.is_empty() && l3.asks.is_empty());
    }

    #[test]
    fn test_limit_order_rests_after_auction() {
        let mut auction = limit(1, PositionDirection::Long, 100_000_000, 1, 1_000);
        auction.auction_duration = 10;
        auction.auction_start_price = 99_000_000;
        auction.auction_end_price = 100_000_000;

        assert!(!is_resting_limit_order(&auction, 1_000));
        assert!(!is_resting_limit_order(&auction, 1_010));
        assert!(is_resting_limit_order(&auction, 1_011));
        assert_eq!(order_price(&auction, 1_005, ORACLE, 1), None);
        assert_eq!(order_price(&auction, 2_000, ORACLE, 1), Some(100_000_000));

        // post only orders rest straight away
        let post_only = Order {
            post_only: true,
            ..auction
        };
        assert_eq!(order_price(&post_only, 1_000, ORACLE, 1), Some(100_000_000));
    }

    #[test]
    fn test_order_newer_than_slot() {
        // placed after the last slot poll
        let mut auction = limit(1, PositionDirection::Long, 100_000_000, 1, 1_001);
        auction.auction_duration = 10;
        auction.auction_start_price = 99_000_000;
        auction.auction_end_price = 100_000_000;
        let resting = limit(2, PositionDirection::Long, 98_000_000, 1, 1_001);

        let l3 = Dlob::from_users(vec![user_with(&[auction, resting])]).get_l3(&params());
        assert_eq!(l3.bids.len(), 1);
        assert_eq!(l3.bids[0].order_id, 2);

        assert_eq!(auction_price(&auction, 1_000, ORACLE, 1, false).unwrap(), 99_000_000);
        assert_eq!(auction_price(&auction, 1_011, ORACLE, 1, false).unwrap(), 100_000_000);
    }

    struct FlakySource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl OrderSource for FlakySource {
        async fn user_accounts_with_orders(&self) -> Result<Vec<(Pubkey, User)>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            match call {
                0 => Ok(vec![user_with(&[limit(
                    1,
                    PositionDirection::Long,
                    99_000_000,
                    1,
                    1,
                )])]),
                1 => Err(Error::Program("node unavailable".into())),
                _ => Ok(vec![
                    user_with(&[limit(1, PositionDirection::Long, 99_000_000, 1, 1)]),
                    user_with(&[limit(1, PositionDirection::Short, 101_000_000, 1, 1)]),
                ]),
            }
        }
    }

    #[tokio::test]
    async fn test_subscriber_keeps_book_on_error() {
        let source = Arc::new(FlakySource {
            calls: AtomicUsize::new(0),
        });
        let subscriber = DlobSubscriber::subscribe(source.clone(), Duration::from_millis(5))
            .await
            .unwrap();
        assert_eq!(subscriber.get_dlob().len(), 1);

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while subscriber.get_dlob().len() != 2 {
            assert!(tokio::time::Instant::now() < deadline, "book never refreshed");
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(source.calls.load(Ordering::SeqCst) >= 3);
    }
}
