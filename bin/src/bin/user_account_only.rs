//! Reads a user account without owning it. Read-only: no private key is
//! needed, a throwaway keypair stands in for the signer.

use std::str::FromStr;
use std::sync::Arc;

use clap::Parser;
use drift_client::config::EnvConfig;
use drift_client::health::spot_token_amount;
use drift_client::math::{
    calculate_entry_price, convert_to_number, BASE_PRECISION, PRICE_PRECISION, QUOTE_PRECISION,
};
use drift_client::orders::{perp_position, spot_position};
use drift_client::utils::init_logging;
use drift_client::DriftClient;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;

#[derive(Debug, Parser)]
#[command(about = "Read any user account")]
struct Args {
    /// User account (not authority) to read
    #[arg(long, default_value = "2aMcirYcF9W8aTFem6qe8QtvfQ22SLY6KUe6yUQbqfHk")]
    user: String,

    #[arg(long, default_value_t = 0)]
    spot_market_index: u16,

    #[arg(long, default_value_t = 0)]
    perp_market_index: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let args = Args::parse();
    let config = EnvConfig::load()?;
    let user_account = Pubkey::from_str(&args.user)?;

    let client = DriftClient::new(
        config.rpc_url()?.to_string(),
        Arc::new(Keypair::new()),
        None,
        CommitmentConfig::confirmed(),
        drift::ID,
    )
    .await?;

    // only the markets read below are loaded
    client
        .load_markets(&[args.perp_market_index], &[args.spot_market_index])
        .await?;
    let user = client.fetch_user(&user_account).await?;

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

    match perp_position(&user, args.perp_market_index) {
        Some(position) => println!(
            "Perp Position: {}, base: {}, quote: {}, entryPrice: {}",
            position.market_index,
            convert_to_number(position.base_asset_amount as i128, BASE_PRECISION),
            convert_to_number(position.quote_asset_amount as i128, QUOTE_PRECISION),
            convert_to_number(calculate_entry_price(position), PRICE_PRECISION)
        ),
        None => println!("No perp position found"),
    }
    Ok(())
}
