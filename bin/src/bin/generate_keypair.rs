//! Generates a new keypair and writes it where the other binaries can load
//! it from (`PRIVATE_KEY=<path>`).

use std::path::PathBuf;

use anyhow::anyhow;
use clap::Parser;
use drift_client::utils::init_logging;
use solana_sdk::signature::{write_keypair_file, Keypair};
use solana_sdk::signer::Signer;
use tracing::info;

#[derive(Debug, Parser)]
#[command(about = "Generate a new Solana keypair file")]
struct Args {
    /// Output file, overwritten if it exists
    #[arg(long, default_value = "private-key.json")]
    outfile: PathBuf,
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let args = Args::parse();

    info!(outfile = %args.outfile.display(), "generating new keypair");
    let keypair = Keypair::new();
    write_keypair_file(&keypair, &args.outfile)
        .map_err(|e| anyhow!("failed to write {}: {e}", args.outfile.display()))?;

    println!(
        "Successfully generated and saved new private key to {}.",
        args.outfile.display()
    );
    println!("Public key: {}", keypair.pubkey());
    println!("Use it in the other binaries by setting the environment variable:");
    println!("  PRIVATE_KEY={}", args.outfile.display());
    Ok(())
}
