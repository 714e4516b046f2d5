//! Deposits spot assets into a user account.
//!
//! Spot market indexes are listed on the market details page of the app.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use drift_client::config::EnvConfig;
use drift_client::math::scale_token_amount;
use drift_client::utils::{init_logging, read_keypair, solscan_tx_url};
use drift_client::DriftClient;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::signer::Signer;
use tracing::info;

#[derive(Debug, Parser)]
#[command(about = "Deposit into a Drift spot market")]
struct Args {
    /// Spot market to deposit into, 0 is USDC
    #[arg(long, default_value_t = 0)]
    market_index: u16,

    /// Amount in whole tokens
    #[arg(long, default_value_t = 100)]
    amount: u64,

    /// Priority fee in micro lamports per compute unit
    #[arg(long, default_value_t = 10_000)]
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
    client.load_markets(&[], &[args.market_index]).await?;

    let market = client.get_spot_market(args.market_index)?;
    let amount = scale_token_amount(args.amount, market.precision())
        .with_context(|| format!("deposit of {} {} overflows", args.amount, market.name()))?;
    let token_account = client.get_associated_token_account(args.market_index)?;
    info!(%token_account, "depositing {} {}", args.amount, market.name());

    let tx = client
        .deposit(
            amount,
            args.market_index,
            token_account,
            false,
            Some(args.compute_unit_price),
        )
        .await?;
    println!("Deposit tx: {}", solscan_tx_url(&tx));
    Ok(())
}
