use std::fmt::Debug;

use solana_sdk::pubkey::Pubkey;

/// Error returned by the client library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0} environment variable is not set")]
    MissingEnv(&'static str),

    #[error("environment configuration error: {0}")]
    Env(#[from] envy::Error),

    #[error("invalid public key: {0}")]
    InvalidPubkey(String),

    #[error("failed to load keypair: {0}")]
    Keypair(String),

    #[error("rpc error: {0}")]
    Rpc(#[from] Box<solana_rpc_client_api::client_error::Error>),

    #[error("account not found: {0}")]
    AccountNotFound(Pubkey),

    #[error("failed to deserialize account {0}: {1}")]
    Deserialize(Pubkey, String),

    #[error("{kind} market {index} is not loaded")]
    MarketNotLoaded { kind: &'static str, index: u16 },

    #[error("no oracle price for {kind} market {index}")]
    OraclePriceUnavailable { kind: &'static str, index: u16 },

    #[error("program error: {0}")]
    Program(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("order rejected by relay ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wraps an error coming out of the on-chain program's math helpers.
    pub(crate) fn program(err: impl Debug) -> Self {
        Self::Program(format!("{err:?}"))
    }
}

impl From<solana_rpc_client_api::client_error::Error> for Error {
    fn from(value: solana_rpc_client_api::client_error::Error) -> Self {
        Self::Rpc(Box::new(value))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
