//! Places a signed-message (swift) order as a delegate of another user.
//!
//! PRIVATE_KEY holds the delegate's key and TARGET_AUTHORITY the authority
//! of the user traded for. The delegate must already be set on the target
//! user account.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use drift::controller::position::PositionDirection;
use drift_client::config::EnvConfig;
use drift_client::math::{convert_to_number, BASE_PRECISION, PRICE_PRECISION};
use drift_client::pda;
use drift_client::slot::{SlotSubscriber, DEFAULT_SLOT_POLL_INTERVAL};
use drift_client::swift::{
    delegate_message, digest_signature, oracle_auction_params, sign_delegate_message,
    SwiftClient, SwiftOrderRequest,
};
use drift_client::utils::{init_logging, read_keypair, solscan_tx_url};
use drift_client::DriftClient;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::signer::Signer;
use tracing::info;

#[derive(Debug, Parser)]
#[command(about = "Place a swift order on behalf of another user")]
struct Args {
    #[arg(long, default_value_t = 0)]
    market_index: u16,

    /// Auction bounds as basis points around the oracle
    #[arg(long, default_value_t = 10)]
    offset_bps: i64,

    #[arg(long, default_value_t = 50)]
    auction_duration: u8,

    /// Order slots in a newly created signed-message orders account
    #[arg(long, default_value_t = 8)]
    num_orders: u16,

    #[arg(long, default_value_t = 10)]
    poll_interval_secs: u64,

    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let args = Args::parse();
    let config = EnvConfig::load()?;

    let delegate = read_keypair(config.private_key()?)?;
    let target_authority = config.target_authority()?;
    info!(delegate = %delegate.pubkey(), %target_authority, "trading as delegate");

    let delegate = Arc::new(delegate);
    let client = DriftClient::new(
        config.rpc_url()?.to_string(),
        delegate.clone(),
        Some(target_authority),
        CommitmentConfig::confirmed(),
        drift::ID,
    )
    .await?
    .with_sub_account(0);

    let orders_account = pda::signed_msg_user_orders(&client.program_id(), &target_authority);
    if client.rpc().account_exists(&orders_account).await? {
        info!(%orders_account, "signed msg user orders account exists");
    } else {
        println!("Creating signed msg user orders account {orders_account}");
        let (tx, _) = client
            .initialize_signed_msg_user_orders(target_authority, args.num_orders, None)
            .await?;
        println!("Init tx: {}", solscan_tx_url(&tx));
    }

    let slots = SlotSubscriber::subscribe(Arc::new(client.rpc().clone()), DEFAULT_SLOT_POLL_INTERVAL).await?;
    client.load_markets(&[args.market_index], &[]).await?;
    let market = client.get_perp_market(args.market_index)?;

    let order_size = market.min_order_size() * 2;
    let oracle_price = market.price()?;
    let offset = oracle_price * args.offset_bps / 10_000;
    println!(
        "Oracle price: {}, order size: {} {}",
        convert_to_number(oracle_price as i128, PRICE_PRECISION),
        convert_to_number(order_size as i128, BASE_PRECISION),
        market.name()
    );

    // auction floats from oracle - offset to oracle + offset for a long
    let params = oracle_auction_params(
        args.market_index,
        PositionDirection::Long,
        order_size,
        offset,
        args.auction_duration,
    );
    // taker is the user account, not the target authority
    let slot = slots.get_slot();
    let message = delegate_message(params, client.user_account_pubkey(), slot);

    let signed = sign_delegate_message(&delegate, &message)?;
    let hash = digest_signature(&signed.signature);
    let swift = SwiftClient::new(config.swift_url());
    swift
        .send_order(&SwiftOrderRequest::perp(
            args.market_index,
            &signed,
            &target_authority,
            &delegate.pubkey(),
        ))
        .await?;
    println!("Sent swift order in slot {slot}, hash: {hash}");

    let status = swift
        .wait_for_confirmation(
            &hash,
            Duration::from_secs(args.poll_interval_secs),
            Duration::from_secs(args.timeout_secs),
        )
        .await?;
    println!("Order status: {status:?}");
    Ok(())
}
