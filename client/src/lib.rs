/// Library shared by the Drift protocol example binaries.
///
/// Wraps the RPC connection and the on-chain program's account types into a
/// small client: market and user account reads, the transactions the
/// binaries send, a local order book, account health and lending rates, and
/// the signed-message order relay.
pub mod client;
pub mod config;
pub mod context;
pub mod dlob;
pub mod error;
pub mod health;
pub mod math;
pub mod oracle;
pub mod orders;
pub mod pda;
pub mod rates;
pub mod rpc;
pub mod slot;
pub mod swift;
pub mod utils;

pub use client::DriftClient;
pub use error::{Error, Result};
