//! Environment configuration shared by the example binaries.
//!
//! Values come from the process environment, optionally seeded from a
//! `.env` file in the working directory.

use std::str::FromStr;

use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;
use tracing::debug;

use crate::error::{Error, Result};

/// Signed-message relay used when `SWIFT_URL` is not set.
pub const DEFAULT_SWIFT_URL: &str = "https://swift.drift.trade";

/// Connection details and credentials.
///
/// Every field is optional at parse time; each example asks only for what
/// it needs through the accessors, which fail with
/// [`Error::MissingEnv`].
#[derive(Debug, Default, Deserialize)]
pub struct EnvConfig {
    /// RPC endpoint of the Solana node.
    pub rpc_url: Option<String>,

    /// Keypair file path, JSON byte array, or base58 secret key.
    pub private_key: Option<String>,

    /// Authority of the user account traded by a delegate.
    pub target_authority: Option<String>,

    /// Signed-message order relay.
    pub swift_url: Option<String>,

    /// Sub account to operate on.
    pub sub_account_id: Option<u16>,
}

impl EnvConfig {
    /// Load `.env` (if present) and parse the environment.
    pub fn load() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            debug!(%e, "no .env file loaded");
        }
        Ok(envy::from_env()?)
    }

    /// Parse configuration from explicit key/value pairs.
    pub fn from_pairs<I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Ok(envy::from_iter(pairs)?)
    }

    pub fn rpc_url(&self) -> Result<&str> {
        self.rpc_url.as_deref().ok_or(Error::MissingEnv("RPC_URL"))
    }

    pub fn private_key(&self) -> Result<&str> {
        self.private_key
            .as_deref()
            .ok_or(Error::MissingEnv("PRIVATE_KEY"))
    }

    pub fn target_authority(&self) -> Result<Pubkey> {
        let value = self
            .target_authority
            .as_deref()
            .ok_or(Error::MissingEnv("TARGET_AUTHORITY"))?;
        Pubkey::from_str(value).map_err(|_| Error::InvalidPubkey(value.to_string()))
    }

    pub fn swift_url(&self) -> &str {
        self.swift_url.as_deref().unwrap_or(DEFAULT_SWIFT_URL)
    }

    pub fn sub_account_id(&self) -> u16 {
        self.sub_account_id.unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_full_config() {
        let authority = Pubkey::new_unique();
        let config = EnvConfig::from_pairs(pairs(&[
            ("RPC_URL", "https://api.mainnet-beta.solana.com"),
            ("PRIVATE_KEY", "./private-key.json"),
            ("TARGET_AUTHORITY", &authority.to_string()),
            ("SUB_ACCOUNT_ID", "3"),
        ]))
        .unwrap();

        assert_eq!(
            config.rpc_url().unwrap(),
            "https://api.mainnet-beta.solana.com"
        );
        assert_eq!(config.private_key().unwrap(), "./private-key.json");
        assert_eq!(config.target_authority().unwrap(), authority);
        assert_eq!(config.sub_account_id(), 3);
        assert_eq!(config.swift_url(), DEFAULT_SWIFT_URL);
    }

    #[test]
    fn test_missing_values() {
        let config = EnvConfig::from_pairs(Vec::new()).unwrap();

        let err = config.rpc_url().unwrap_err();
        assert_eq!(err.to_string(), "RPC_URL environment variable is not set");
        assert!(matches!(
            config.private_key(),
            Err(Error::MissingEnv("PRIVATE_KEY"))
        ));
        assert!(matches!(
            config.target_authority(),
            Err(Error::MissingEnv("TARGET_AUTHORITY"))
        ));
        assert_eq!(config.sub_account_id(), 0);
    }

    #[test]
    fn test_invalid_target_authority() {
        let config =
            EnvConfig::from_pairs(pairs(&[("TARGET_AUTHORITY", "not-a-key")])).unwrap();
        assert!(matches!(
            config.target_authority(),
            Err(Error::InvalidPubkey(_))
        ));
    }
}
