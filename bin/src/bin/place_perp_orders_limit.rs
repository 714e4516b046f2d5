//! Places a limit order and a floating (oracle offset) limit order on a perp
//! market, watches the open orders for a while, then cancels them.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use drift::controller::position::PositionDirection;
use drift_client::config::EnvConfig;
use drift_client::math::{
    calculate_entry_price, convert_to_number, oracle_offset_pct, BASE_PRECISION,
    BASE_PRECISION_U64, PRICE_PRECISION,
};
use drift_client::orders::{open_orders, perp_position, OrderBuilder};
use drift_client::utils::{init_logging, read_keypair, solscan_tx_url};
use drift_client::DriftClient;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::signer::Signer;
use tracing::info;

#[derive(Debug, Parser)]
#[command(about = "Place perp limit orders")]
struct Args {
    /// Perp market, 0 is SOL-PERP
    #[arg(long, default_value_t = 0)]
    market_index: u16,

    /// Place the order this fraction below the oracle
    #[arg(long, default_value_t = 0.01)]
    price_pct: f64,

    /// Seconds to watch the open orders before cancelling
    #[arg(long, default_value_t = 10)]
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

    let user = client.get_user().await?;
    client.load_user_markets(&user).await?;
    client.load_markets(&[args.market_index], &[0]).await?;

    let order_size = BASE_PRECISION_U64 / 10;
    let direction = PositionDirection::Long;
    let market = client.get_perp_market(args.market_index)?;
    let name = market.name();

    let oracle_price = market.price()?;
    println!(
        "Current oracle price: {}",
        convert_to_number(oracle_price as i128, PRICE_PRECISION)
    );

    let price_offset = oracle_offset_pct(oracle_price, args.price_pct);
    let order_price = oracle_price + price_offset;
    println!(
        "\nPlacing a {:?} order for {} {name} at ${}",
        direction,
        convert_to_number(order_size as i128, BASE_PRECISION),
        convert_to_number(order_price as i128, PRICE_PRECISION)
    );

    // 1) a normal limit order
    let params = OrderBuilder::limit(args.market_index, direction, order_size)
        .price(order_price as u64)
        .build();
    let tx = client
        .place_perp_order(params, Some(args.compute_unit_price))
        .await?;
    println!("Place perp limit order tx: {}", solscan_tx_url(&tx));

    // 2) a floating limit order, offset from the oracle
    println!(
        "\nPlacing a floating limit order for {} {name} at ${} offset from oracle",
        convert_to_number(order_size as i128, BASE_PRECISION),
        convert_to_number(price_offset as i128, PRICE_PRECISION)
    );
    let params = OrderBuilder::limit(args.market_index, direction, order_size)
        .oracle_price_offset(i32::try_from(price_offset)?)
        .build();
    let tx = client
        .place_perp_order(params, Some(args.compute_unit_price))
        .await?;
    println!("Place perp floating limit order tx: {}", solscan_tx_url(&tx));

    // 3) read back the open orders
    for _ in 0..args.iterations {
        println!();
        let user = client.get_user().await?;
        for order in open_orders(&user) {
            println!(
                "Open order {}: {:?}, market: {:?}-{}, {} {:?}, price: {}, oraclePriceOffset: {}",
                order.order_id,
                order.order_type,
                order.market_type,
                order.market_index,
                convert_to_number(order.base_asset_amount as i128, BASE_PRECISION),
                order.direction,
                convert_to_number(order.price as i128, PRICE_PRECISION),
                order.oracle_price_offset,
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

    println!("Cancelling orders");
    let tx = client
        .cancel_orders(None, None, None, Some(args.compute_unit_price))
        .await?;
    println!("Cancel orders tx: {}", solscan_tx_url(&tx));
    Ok(())
}
