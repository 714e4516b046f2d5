//! This module implements a thread safe client to interact with a remote Solana node.

use std::sync::Arc;

use solana_client::{nonblocking::rpc_client::RpcClient, rpc_config::RpcAccountInfoConfig};
use solana_sdk::{
    account::Account, compute_budget::ComputeBudgetInstruction, instruction::Instruction,
    pubkey::Pubkey, signature::Keypair, signature::Signature, signer::Signer,
    transaction::Transaction,
};

use anchor_lang::{AccountDeserialize, Discriminator};

use drift::state::user::User;

use solana_client::{
    rpc_config::RpcProgramAccountsConfig,
    rpc_filter::{Memcmp, RpcFilterType},
};

use solana_account_decoder::UiAccountEncoding;
use tracing::debug;

use crate::error::{Error, Result};

/// `getMultipleAccounts` accepts at most this many keys per request.
const MAX_MULTIPLE_ACCOUNTS: usize = 100;

/// Offset of the `has_open_order` flag inside a `User` account.
const USER_HAS_OPEN_ORDER_OFFSET: usize = 4352;

/// Offset of the authority inside a `User` account (after the discriminator).
const USER_AUTHORITY_OFFSET: usize = 8;

/// Wrapper type for RpcClient providing additional functionality.
///
/// This struct holds an `Arc` of `RpcClient` so clones share one connection
/// pool across tasks.
#[derive(Clone)]
pub struct Rpc(Arc<RpcClient>);

impl Rpc {
    /// Constructs a new Rpc wrapper around the provided RpcClient instance.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use drift_client::rpc::Rpc;
    /// use solana_client::nonblocking::rpc_client::RpcClient;
    ///
    /// let rpc_url = std::env::var("RPC_URL").unwrap_or_default();
    /// let rpc = Rpc::new(RpcClient::new(rpc_url));
    /// ```
    pub fn new(rpc_client: RpcClient) -> Self {
        Rpc(Arc::new(rpc_client))
    }

    /// Returns a reference to the inner RpcClient instance wrapped by this wrapper.
    pub fn inner(&self) -> &RpcClient {
        &self.0
    }

    pub async fn fetch_anchor_account<T: AccountDeserialize>(&self, address: &Pubkey) -> Result<T> {
        let account = self
            .inner()
            .get_account_with_commitment(address, self.inner().commitment())
            .await?
            .value
            .ok_or(Error::AccountNotFound(*address))?;
        decode_anchor_account(address, &account.data)
    }

    pub async fn account_exists(&self, address: &Pubkey) -> Result<bool> {
        Ok(self
            .inner()
            .get_account_with_commitment(address, self.inner().commitment())
            .await?
            .value
            .is_some())
    }

    /// Fetches many accounts with batched `getMultipleAccounts` calls,
    /// preserving the order of `addresses`.
    pub async fn fetch_multiple_accounts(&self, addresses: &[Pubkey]) -> Result<Vec<Option<Account>>> {
        let mut accounts = Vec::with_capacity(addresses.len());
        for chunk in addresses.chunks(MAX_MULTIPLE_ACCOUNTS) {
            debug!(count = chunk.len(), "getMultipleAccounts");
            accounts.extend(self.inner().get_multiple_accounts(chunk).await?);
        }
        Ok(accounts)
    }

    /// Fetches `User` accounts of the program, optionally restricted to one
    /// authority and/or to users with at least one open order.
    pub async fn fetch_user_accounts(
        &self,
        program: Pubkey,
        authority: Option<Pubkey>,
        with_open_orders: bool,
    ) -> Result<Vec<(Pubkey, User)>> {
        let mut filters = vec![RpcFilterType::Memcmp(Memcmp::new_raw_bytes(
            0,
            User::discriminator().to_vec(),
        ))];
        if let Some(authority) = authority {
            filters.push(RpcFilterType::Memcmp(Memcmp::new_raw_bytes(
                USER_AUTHORITY_OFFSET,
                authority.to_bytes().to_vec(),
            )));
        }
        if with_open_orders {
            filters.push(RpcFilterType::Memcmp(Memcmp::new_raw_bytes(
                USER_HAS_OPEN_ORDER_OFFSET,
                vec![1],
            )));
        }
        let config = RpcProgramAccountsConfig {
            filters: Some(filters),
            account_config: RpcAccountInfoConfig {
                encoding: Some(UiAccountEncoding::Base64),
                commitment: Some(self.inner().commitment()),
                ..RpcAccountInfoConfig::default()
            },
            ..RpcProgramAccountsConfig::default()
        };
        self.inner()
            .get_program_accounts_with_config(&program, config)
            .await?
            .into_iter()
            .map(|(key, account)| Ok((key, decode_anchor_account(&key, &account.data)?)))
            .collect()
    }

    /// Signs `instructions` with `signer` as fee payer, sends and confirms
    /// the transaction. A compute unit price (micro lamports) is prepended
    /// when given.
    pub async fn send_instructions(
        &self,
        signer: &Keypair,
        instructions: Vec<Instruction>,
        compute_unit_price: Option<u64>,
    ) -> Result<Signature> {
        let mut ixs = Vec::with_capacity(instructions.len() + 1);
        if let Some(price) = compute_unit_price {
            ixs.push(ComputeBudgetInstruction::set_compute_unit_price(price));
        }
        ixs.extend(instructions);

        let blockhash = self.inner().get_latest_blockhash().await?;
        let tx = Transaction::new_signed_with_payer(
            &ixs,
            Some(&signer.pubkey()),
            &[signer],
            blockhash,
        );
        Ok(self.inner().send_and_confirm_transaction(&tx).await?)
    }
}

pub(crate) fn decode_anchor_account<T: AccountDeserialize>(address: &Pubkey, data: &[u8]) -> Result<T> {
    T::try_deserialize(&mut &data[..]).map_err(|e| Error::Deserialize(*address, e.to_string()))
}
