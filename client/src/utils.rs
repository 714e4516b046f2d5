//! This module contains utility functions shared by the example binaries.

use solana_sdk::bs58;
use solana_sdk::signature::{Keypair, Signature};
use std::path::Path;
use std::{fs, time::SystemTime, time::UNIX_EPOCH};

use crate::error::{Error, Result};

/// Reads a keypair from a file or from an inline secret.
///
/// # Arguments
///
/// * `value` - Either a path to a keypair file, or the secret key itself.
///   Both the file contents and the inline secret may be a JSON byte array
///   (as written by `solana-keygen`) or a base58 string.
///
/// # Returns
///
/// The decoded `Keypair`.
///
/// # Examples
///
/// ```rust
/// use drift_client::utils::read_keypair;
///
/// let path = "/path/to/keypair_file.json";
/// // let keypair = read_keypair(path)?;
/// ```
pub fn read_keypair(value: &str) -> Result<Keypair> {
    let secret_string = if Path::new(value).is_file() {
        fs::read_to_string(value)?
    } else {
        value.to_string()
    };
    let secret_string = secret_string.trim();
    if secret_string.is_empty() {
        return Err(Error::Keypair("empty secret key".into()));
    }

    let secret_bytes: Vec<u8> = match serde_json::from_str(secret_string) {
        Ok(bytes) => bytes,
        Err(_) => bs58::decode(secret_string)
            .into_vec()
            .map_err(|_| Error::Keypair("secret is neither a JSON array nor base58".into()))?,
    };
    Keypair::from_bytes(&secret_bytes).map_err(|e| Error::Keypair(e.to_string()))
}

/// Gets the current UNIX timestamp in seconds.
///
/// # Examples
///
/// ```rust
/// use drift_client::utils::get_unix_secs;
///
/// let timestamp = get_unix_secs();
/// ```
pub fn get_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Gets the current UNIX timestamp in milliseconds.
pub fn get_unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

/// Decodes an on-chain, space padded market or account name.
pub fn decode_name(name: &[u8; 32]) -> String {
    String::from_utf8_lossy(name)
        .trim_end_matches(|c: char| c == ' ' || c == '\0')
        .to_string()
}

/// Encodes a name into the fixed width, space padded on-chain form.
/// Names longer than 32 bytes are truncated.
pub fn encode_name(name: &str) -> [u8; 32] {
    let mut out = [b' '; 32];
    let bytes = name.as_bytes();
    let len = bytes.len().min(out.len());
    out[..len].copy_from_slice(&bytes[..len]);
    out
}

pub fn solscan_tx_url(signature: &Signature) -> String {
    format!("https://solscan.io/tx/{signature}")
}

/// Installs the `tracing` subscriber, honouring `RUST_LOG` and defaulting
/// to `info`.
pub fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::signer::Signer;

    #[test]
    fn test_read_keypair_inline_json_and_base58() {
        let keypair = Keypair::new();
        let json = serde_json::to_string(&keypair.to_bytes().to_vec()).unwrap();

        let from_json = read_keypair(&json).unwrap();
        assert_eq!(from_json.pubkey(), keypair.pubkey());

        let from_base58 = read_keypair(&keypair.to_base58_string()).unwrap();
        assert_eq!(from_base58.pubkey(), keypair.pubkey());
    }

    #[test]
    fn test_read_keypair_file() {
        let keypair = Keypair::new();
        let path = std::env::temp_dir().join(format!("drift-client-{}.json", keypair.pubkey()));
        fs::write(
            &path,
            serde_json::to_string(&keypair.to_bytes().to_vec()).unwrap(),
        )
        .unwrap();

        let loaded = read_keypair(path.to_str().unwrap()).unwrap();
        assert_eq!(loaded.pubkey(), keypair.pubkey());
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_read_keypair_rejects_garbage() {
        assert!(matches!(read_keypair(""), Err(Error::Keypair(_))));
        assert!(matches!(read_keypair("0OIl"), Err(Error::Keypair(_))));
        assert!(matches!(read_keypair("[1,2,3]"), Err(Error::Keypair(_))));
    }

    #[test]
    fn test_names() {
        let encoded = encode_name("SOL-PERP");
        assert_eq!(&encoded[..8], b"SOL-PERP");
        assert_eq!(encoded[8], b' ');
        assert_eq!(decode_name(&encoded), "SOL-PERP");
        assert_eq!(decode_name(&encode_name(&"x".repeat(40))).len(), 32);
    }
}
