//! Initializes a user account. Not needed if the account was already
//! created through the app.

use std::sync::Arc;

use clap::Parser;
use drift_client::config::EnvConfig;
use drift_client::utils::{encode_name, init_logging, read_keypair, solscan_tx_url};
use drift_client::DriftClient;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::signer::Signer;
use tracing::info;

#[derive(Debug, Parser)]
#[command(about = "Initialize a Drift user account")]
struct Args {
    /// Sub account to create, 0 is the default account
    #[arg(long, default_value_t = 0)]
    sub_account_id: u16,

    #[arg(long, default_value = "Main Account")]
    name: String,
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
    .with_sub_account(args.sub_account_id);

    if client.user_exists().await? {
        println!(
            "User {} already exists: {}",
            args.sub_account_id,
            client.user_account_pubkey()
        );
        return Ok(());
    }

    println!("User does not exist, initializing...");
    let (tx, user) = client
        .initialize_user_account(args.sub_account_id, encode_name(&args.name), None)
        .await?;
    println!("User initialized sub account {}: {user}", args.sub_account_id);
    println!("{}", solscan_tx_url(&tx));
    Ok(())
}
