//! Calculates borrow and lend rates of a spot market, and how a large
//! deposit or borrow would move them.

use std::sync::Arc;

use clap::Parser;
use drift_client::config::EnvConfig;
use drift_client::math::{convert_to_number, SPOT_RATE_PRECISION};
use drift_client::rates::{calculate_borrow_rate, calculate_deposit_rate};
use drift_client::utils::init_logging;
use drift_client::DriftClient;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::signature::Keypair;

#[derive(Debug, Parser)]
#[command(about = "Print spot market deposit and borrow APRs")]
struct Args {
    /// Spot market, 0 is USDC
    #[arg(long, default_value_t = 0)]
    market_index: u16,

    /// Hypothetical deposit/borrow size in whole tokens
    #[arg(long, default_value_t = 1_000_000)]
    size: u64,
}

fn apr_pct(rate: u128) -> f64 {
    (convert_to_number(rate as i128, SPOT_RATE_PRECISION) * 10_000.0).round() / 100.0
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let args = Args::parse();
    let config = EnvConfig::load()?;

    let client = DriftClient::new(
        config.rpc_url()?.to_string(),
        Arc::new(Keypair::new()),
        None,
        CommitmentConfig::confirmed(),
        drift::ID,
    )
    .await?;
    client.load_markets(&[], &[args.market_index]).await?;

    let spot = client.get_spot_market(args.market_index)?;
    let name = spot.name();

    let deposit_apr = apr_pct(calculate_deposit_rate(&spot.market, 0)?);
    let borrow_apr = apr_pct(calculate_borrow_rate(&spot.market, 0)?);
    println!("{name} Deposit APR: {deposit_apr}%");
    println!("{name} Borrow APR:  {borrow_apr}%");

    let amount = args.size as i128 * spot.precision() as i128;
    let deposit_apr_after = apr_pct(calculate_deposit_rate(&spot.market, amount)?);
    let borrow_apr_after = apr_pct(calculate_borrow_rate(&spot.market, -amount)?);
    println!(
        "{name} Deposit APR (after {} deposit): {deposit_apr}% -> {deposit_apr_after}%",
        args.size
    );
    println!(
        "{name} Borrow APR (after {} borrow):   {borrow_apr}% -> {borrow_apr_after}%",
        args.size
    );
    Ok(())
}
