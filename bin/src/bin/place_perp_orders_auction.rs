//! Places an auction order on a perp market.
//!
//! The order's price starts at the auction start price and moves linearly
//! to the end price over the auction duration (in slots). Unfilled orders
//! then rest at their limit price. Auctions give makers the chance to fill
//! at better prices than a plain market order.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use drift::controller::position::PositionDirection;
use drift_client::config::EnvConfig;
use drift_client::dlob::auction_price;
use drift_client::math::{
    calculate_entry_price, convert_to_number, price_from_bps, BASE_PRECISION, BASE_PRECISION_U64,
    PRICE_PRECISION,
};
use drift_client::orders::{open_orders, perp_position, OrderBuilder};
use drift_client::slot::{SlotSubscriber, DEFAULT_SLOT_POLL_INTERVAL};
use drift_client::utils::{init_logging, read_keypair, solscan_tx_url};
use drift_client::DriftClient;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::signer::Signer;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(about = "Place a perp auction order")]
struct Args {
    /// Perp market, 0 is SOL-PERP
    #[arg(long, default_value_t = 0)]
    market_index: u16,

    /// Auction starts this many basis points below the oracle
    #[arg(long, default_value_t = 20)]
    auction_bps: i64,

    /// Auction length in slots
    #[arg(long, default_value_t = 69)]
    auction_duration: u8,

    /// Seconds to watch the open orders
    #[arg(long, default_value_t = 30)]
    iterations: u32,

    #[arg(long, default_value_t = 1_000)]
    compute_unit_price: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let args = Args::parse();
    let config = EnvConfig::load()?;

    let keypair = read_keypair(config.private_key()?)?;
    info!("Using keypair for user: {}", keypair.pubkey());

    let client = DriftClient::new(
        config.rpc_url()?.to_string(),
        Arc::new(keypair),
        None,
        CommitmentConfig::confirmed(),
        drift::ID,
    )
    .await?
    .with_sub_account(config.sub_account_id());

    let slots = SlotSubscriber::subscribe(Arc::new(client.rpc().clone()), DEFAULT_SLOT_POLL_INTERVAL).await?;

    let user = client.get_user().await?;
    client.load_user_markets(&user).await?;
    client.load_markets(&[args.market_index], &[0]).await?;

    let order_size = BASE_PRECISION_U64 / 10;
    let direction = PositionDirection::Long;
    let market = client.get_perp_market(args.market_index)?;

    let oracle_price = market.price()?;
    println!(
        "Current oracle price: {}",
        convert_to_number(oracle_price as i128, PRICE_PRECISION)
    );

    let auction_start_price = price_from_bps(oracle_price, args.auction_bps);
    let auction_end_price = oracle_price;
    println!(
        "\nPlacing a {:?} order for {} {} at ${} to {} over {} slots",
        direction,
        convert_to_number(order_size as i128, BASE_PRECISION),
        market.name(),
        convert_to_number(auction_start_price as i128, PRICE_PRECISION),
        convert_to_number(auction_end_price as i128, PRICE_PRECISION),
        args.auction_duration
    );

    let params = OrderBuilder::limit(args.market_index, direction, order_size)
        .auction(auction_start_price, auction_end_price, args.auction_duration)
        .price(auction_end_price as u64)
        .build();
    let tx = client
        .place_perp_order(params, Some(args.compute_unit_price))
        .await?;
    println!("Placed auction order tx: {}", solscan_tx_url(&tx));

    let mut remaining_orders = 0;
    for _ in 0..args.iterations {
        println!();
        client.refresh_markets().await?;
        let user = client.get_user().await?;
        let slot = slots.get_slot();
        remaining_orders = 0;
        for order in open_orders(&user) {
            remaining_orders += 1;
            let market = client.get_perp_market(order.market_index)?;
            let oracle_price = market.oracle_price.unwrap_or_default();
            let price = match auction_price(
                order,
                slot,
                oracle_price,
                market.tick_size(),
                market.is_prediction_market(),
            ) {
                Ok(price) => price,
                Err(err) => {
                    warn!(order_id = order.order_id, %err, "no auction price");
                    0
                }
            };
            println!(
                "Open order {}: {:?}, market: {:?}-{}, {} {:?}, auctionPrice: {}, oraclePrice: {}",
                order.order_id,
                order.order_type,
                order.market_type,
                order.market_index,
                convert_to_number(order.base_asset_amount as i128, BASE_PRECISION),
                order.direction,
                convert_to_number(price as i128, PRICE_PRECISION),
                convert_to_number(oracle_price as i128, PRICE_PRECISION),
            );
        }

        match perp_position(&user, args.market_index) {
            Some(position) => println!(
                "Open position: {}, entryPrice: {}",
                convert_to_number(position.base_asset_amount as i128, BASE_PRECISION),
                convert_to_number(calculate_entry_price(position), PRICE_PRECISION)
            ),
            None => println!("No position found"),
        }

        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    if remaining_orders > 0 {
        println!("Cancelling orders");
        let tx = client
            .cancel_orders(None, None, None, Some(args.compute_unit_price))
            .await?;
        println!("Cancel orders tx: {}", solscan_tx_url(&tx));
    } else {
        println!("No open orders to cancel");
    }
    Ok(())
}
