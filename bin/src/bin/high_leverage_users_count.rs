//! Prints how many users are in high leverage mode.

use std::sync::Arc;

use drift::state::high_leverage_mode_config::HighLeverageModeConfig;
use drift_client::config::EnvConfig;
use drift_client::pda;
use drift_client::utils::init_logging;
use drift_client::{DriftClient, Error};
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::signature::Keypair;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let config = EnvConfig::load()?;

    // read-only, any keypair will do
    let client = DriftClient::new(
        config.rpc_url()?.to_string(),
        Arc::new(Keypair::new()),
        None,
        CommitmentConfig::confirmed(),
        drift::ID,
    )
    .await?;
    info!("Connected to the Drift program");

    let address = pda::high_leverage_mode_config(&client.program_id());
    info!(%address, "derived HighLeverageModeConfig address");

    match client
        .rpc()
        .fetch_anchor_account::<HighLeverageModeConfig>(&address)
        .await
    {
        Ok(hlm_config) => println!(
            "Current number of users in high leverage mode: {} (max {})",
            hlm_config.current_users, hlm_config.max_users
        ),
        Err(Error::AccountNotFound(_)) => {
            error!("HighLeverageModeConfig is not initialized on this cluster");
            println!("Could not determine the number of users in high leverage mode.");
        }
        Err(e) => {
            error!(%e, "failed to fetch HighLeverageModeConfig");
            println!("Could not determine the number of users in high leverage mode.");
        }
    }
    Ok(())
}
