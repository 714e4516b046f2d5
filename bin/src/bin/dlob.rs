//! Builds the decentralized limit order book (DLOB) straight from RPC data.
//!
//! This scans every user account with open orders and is heavy on the RPC
//! node. The hosted DLOB server at https://dlob.drift.trade serves the same
//! data without the load.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use drift::state::user::MarketType;
use drift_client::config::EnvConfig;
use drift_client::dlob::{BookParams, DlobSubscriber, ProgramOrderSource};
use drift_client::slot::{SlotSubscriber, DEFAULT_SLOT_POLL_INTERVAL};
use drift_client::utils::{init_logging, read_keypair};
use drift_client::DriftClient;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::signer::Signer;
use tracing::info;

/// L3 orders printed per side.
const L3_PREVIEW: usize = 4;

#[derive(Debug, Parser)]
#[command(about = "Build the perp order book from RPC data")]
struct Args {
    /// Perp market, 0 is SOL-PERP
    #[arg(long, default_value_t = 0)]
    market_index: u16,

    /// L2 levels per side
    #[arg(long, default_value_t = 10)]
    depth: usize,

    #[arg(long, default_value_t = 10)]
    iterations: u32,

    /// Book rebuild interval in milliseconds
    #[arg(long, default_value_t = 1_000)]
    update_frequency_ms: u64,
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
    .await?;
    client.load_markets(&[args.market_index], &[]).await?;

    let slots = SlotSubscriber::subscribe(Arc::new(client.rpc().clone()), DEFAULT_SLOT_POLL_INTERVAL).await?;
    let source = ProgramOrderSource::new(client.rpc().clone(), client.program_id());
    let dlob_subscriber = DlobSubscriber::subscribe(
        Arc::new(source),
        Duration::from_millis(args.update_frequency_ms),
    )
    .await?;

    for _ in 0..args.iterations {
        client.refresh_markets().await?;
        let market = client.get_perp_market(args.market_index)?;
        let name = market.name();
        let params = BookParams {
            market_index: args.market_index,
            market_type: MarketType::Perp,
            slot: slots.get_slot(),
            oracle_price: market.price()?,
            tick_size: market.tick_size(),
        };
        let dlob = dlob_subscriber.get_dlob();

        println!("{name} L2:");
        let l2 = dlob.get_l2(&params, args.depth);
        println!("l2-bids:");
        for level in &l2.bids {
            println!("  {}, {}", level.price, level.size);
        }
        println!("l2-asks:");
        for level in &l2.asks {
            println!("  {}, {}", level.price, level.size);
        }

        println!();
        println!("{name} L3:");
        let l3 = dlob.get_l3(&params);
        for (label, levels) in [("l3-bids", &l3.bids), ("l3-asks", &l3.asks)] {
            println!("{label}:");
            for level in levels.iter().take(L3_PREVIEW) {
                println!(
                    "  {}, {}, {}-{}",
                    level.price, level.size, level.maker, level.order_id
                );
            }
            if levels.len() > L3_PREVIEW {
                println!("...");
            }
        }

        println!();
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
    Ok(())
}
