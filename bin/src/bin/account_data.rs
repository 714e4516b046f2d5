//! Reads the metrics that matter for account health.

use std::sync::Arc;

use clap::Parser;
use drift_client::config::EnvConfig;
use drift_client::health::{account_value, spot_token_amount, MarginRequirementType};
use drift_client::math::{convert_to_number, QUOTE_PRECISION};
use drift_client::orders::spot_position;
use drift_client::utils::{init_logging, read_keypair};
use drift_client::DriftClient;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::signer::Signer;
use tracing::info;

#[derive(Debug, Parser)]
#[command(about = "Print balances and free collateral of your account")]
struct Args {
    /// Spot market whose balance is printed, 0 is USDC
    #[arg(long, default_value_t = 0)]
    spot_market_index: u16,
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
    client.load_markets(&[], &[args.spot_market_index]).await?;

    let market = client.get_spot_market(args.spot_market_index)?;
    match spot_position(&user, args.spot_market_index) {
        Some(position) => {
            let balance = spot_token_amount(position, &market.market)?;
            println!(
                "{} Spot Balance: {}",
                market.name(),
                convert_to_number(balance, market.precision())
            );
        }
        None => println!("No {} position found", market.name()),
    }

    let value = account_value(&user, &client)?;
    println!("Account Value USD: {}", convert_to_number(value, QUOTE_PRECISION));

    // collateral available for new positions
    let initial = client.free_collateral(&user, MarginRequirementType::Initial)?;
    println!(
        "Free Collateral (Initial): {}",
        convert_to_number(initial as i128, QUOTE_PRECISION)
    );

    // the account is liquidated when this reaches 0
    let maintenance = client.free_collateral(&user, MarginRequirementType::Maintenance)?;
    println!(
        "Free Collateral (Maintenance): {}",
        convert_to_number(maintenance as i128, QUOTE_PRECISION)
    );
    Ok(())
}
