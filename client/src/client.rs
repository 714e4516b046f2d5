//! Client for the Drift program: market loading, user account reads and
//! the transactions the example binaries send.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anchor_lang::InstructionData;
use dashmap::DashMap;
use drift::controller::position::PositionDirection;
use drift::state::order_params::OrderParams;
use drift::state::perp_market::PerpMarket;
use drift::state::spot_market::SpotMarket;
use drift::state::state::State;
use drift::state::user::{MarketType, User};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    account::Account,
    commitment_config::CommitmentConfig,
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
    system_program, sysvar,
};
use spl_associated_token_account::get_associated_token_address;
use tracing::{debug, info, warn};

use crate::context::{MarketLookup, PerpMarketContext, SpotMarketContext};
use crate::error::{Error, Result};
use crate::health::{self, MarginRequirementType};
use crate::oracle::decode_oracle_price;
use crate::orders::{is_perp_position_empty, is_spot_position_empty};
use crate::pda;
use crate::rpc::{decode_anchor_account, Rpc};

/// Quote spot market, always part of margin checks for perp positions.
pub const QUOTE_SPOT_MARKET_INDEX: u16 = 0;

pub struct DriftClient {
    rpc: Rpc,
    signer: Arc<Keypair>,
    authority: Pubkey,
    program_id: Pubkey,
    sub_account_id: u16,
    state: State,
    perp_markets: DashMap<u16, PerpMarketContext>,
    spot_markets: DashMap<u16, SpotMarketContext>,
    /// Raw market and oracle accounts for the program's margin math.
    accounts: DashMap<Pubkey, Account>,
    slot: AtomicU64,
}

impl DriftClient {
    /// Connects and reads the program's `State` account.
    ///
    /// `authority` is the owner of the user accounts traded; it defaults to
    /// the signer and differs from it when the signer is a delegate.
    pub async fn new(
        rpc_url: String,
        signer: Arc<Keypair>,
        authority: Option<Pubkey>,
        commitment: CommitmentConfig,
        program_id: Pubkey,
    ) -> Result<Self> {
        let rpc = Rpc::new(RpcClient::new_with_commitment(rpc_url, commitment));
        let state: State = rpc.fetch_anchor_account(&pda::state(&program_id)).await?;
        let authority = authority.unwrap_or_else(|| signer.pubkey());
        debug!(
            perp_markets = state.number_of_markets,
            spot_markets = state.number_of_spot_markets,
            %authority,
            "connected"
        );

        Ok(Self {
            rpc,
            signer,
            authority,
            program_id,
            sub_account_id: 0,
            state,
            perp_markets: DashMap::new(),
            spot_markets: DashMap::new(),
            accounts: DashMap::new(),
            slot: AtomicU64::new(0),
        })
    }

    /// Sub account used by user reads and trading instructions.
    pub fn with_sub_account(mut self, sub_account_id: u16) -> Self {
        self.sub_account_id = sub_account_id;
        self
    }

    pub fn rpc(&self) -> &Rpc {
        &self.rpc
    }

    pub fn authority(&self) -> Pubkey {
        self.authority
    }

    pub fn signer_pubkey(&self) -> Pubkey {
        self.signer.pubkey()
    }

    pub fn program_id(&self) -> Pubkey {
        self.program_id
    }

    pub fn sub_account_id(&self) -> u16 {
        self.sub_account_id
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    // === Markets ===

    /// Loads the given markets and their oracle prices.
    ///
    /// A market whose oracle cannot be read is kept without a price.
    pub async fn load_markets(&self, perp_indexes: &[u16], spot_indexes: &[u16]) -> Result<()> {
        let perp_addresses: Vec<Pubkey> = perp_indexes
            .iter()
            .map(|i| pda::perp_market(&self.program_id, *i))
            .collect();
        let spot_addresses: Vec<Pubkey> = spot_indexes
            .iter()
            .map(|i| pda::spot_market(&self.program_id, *i))
            .collect();
        let addresses: Vec<Pubkey> = perp_addresses
            .iter()
            .chain(spot_addresses.iter())
            .copied()
            .collect();
        let accounts = self.rpc.fetch_multiple_accounts(&addresses).await?;

        let mut perp_markets = Vec::with_capacity(perp_addresses.len());
        let mut spot_markets = Vec::with_capacity(spot_addresses.len());
        for (i, (address, account)) in addresses.iter().zip(accounts).enumerate() {
            let account = account.ok_or(Error::AccountNotFound(*address))?;
            if i < perp_addresses.len() {
                let market: PerpMarket = decode_anchor_account(address, &account.data)?;
                perp_markets.push((*address, market));
            } else {
                let market: SpotMarket = decode_anchor_account(address, &account.data)?;
                spot_markets.push((*address, market));
            }
            self.accounts.insert(*address, account);
        }

        let oracles: Vec<Pubkey> = perp_markets
            .iter()
            .map(|(_, m)| m.amm.oracle)
            .chain(spot_markets.iter().map(|(_, m)| m.oracle))
            .collect();
        let slot = self.rpc.inner().get_slot().await?;
        let oracle_accounts = self.rpc.fetch_multiple_accounts(&oracles).await?;
        let mut prices = Vec::with_capacity(oracles.len());
        for ((oracle, account), source) in oracles.iter().zip(oracle_accounts).zip(
            perp_markets
                .iter()
                .map(|(_, m)| m.amm.oracle_source)
                .chain(spot_markets.iter().map(|(_, m)| m.oracle_source)),
        ) {
            let price = match decode_oracle_price(&source, oracle, account.as_ref(), slot) {
                Ok(price) => Some(price.price),
                Err(err) => {
                    warn!(%oracle, %err, "oracle price unavailable");
                    None
                }
            };
            if let Some(account) = account {
                self.accounts.insert(*oracle, account);
            }
            prices.push(price);
        }
        let mut prices = prices.into_iter();

        for (address, market) in perp_markets {
            self.perp_markets.insert(
                market.market_index,
                PerpMarketContext {
                    address,
                    market,
                    oracle_price: prices.next().flatten(),
                },
            );
        }
        for (address, market) in spot_markets {
            self.spot_markets.insert(
                market.market_index,
                SpotMarketContext {
                    address,
                    market,
                    oracle_price: prices.next().flatten(),
                },
            );
        }
        self.slot.fetch_max(slot, Ordering::Relaxed);
        info!(
            perp = perp_indexes.len(),
            spot = spot_indexes.len(),
            slot,
            "markets loaded"
        );
        Ok(())
    }

    /// Loads every market listed in the program state.
    pub async fn load_all_markets(&self) -> Result<()> {
        let perp: Vec<u16> = (0..self.state.number_of_markets).collect();
        let spot: Vec<u16> = (0..self.state.number_of_spot_markets).collect();
        self.load_markets(&perp, &spot).await
    }

    /// Refetches every loaded market and its oracle.
    pub async fn refresh_markets(&self) -> Result<()> {
        let perp: Vec<u16> = self.perp_markets.iter().map(|e| *e.key()).collect();
        let spot: Vec<u16> = self.spot_markets.iter().map(|e| *e.key()).collect();
        self.load_markets(&perp, &spot).await
    }

    pub fn get_perp_market(&self, market_index: u16) -> Result<PerpMarketContext> {
        self.perp_market(market_index).ok_or(Error::MarketNotLoaded {
            kind: "perp",
            index: market_index,
        })
    }

    pub fn get_spot_market(&self, market_index: u16) -> Result<SpotMarketContext> {
        self.spot_market(market_index).ok_or(Error::MarketNotLoaded {
            kind: "spot",
            index: market_index,
        })
    }

    pub fn get_oracle_price_for_perp_market(&self, market_index: u16) -> Result<i64> {
        self.get_perp_market(market_index)?.price()
    }

    /// Slot of the most recent market load.
    pub fn markets_slot(&self) -> u64 {
        self.slot.load(Ordering::Relaxed)
    }

    // === Users ===

    pub fn user_account_pubkey(&self) -> Pubkey {
        pda::user(&self.program_id, &self.authority, self.sub_account_id)
    }

    pub fn user_stats_pubkey(&self) -> Pubkey {
        pda::user_stats(&self.program_id, &self.authority)
    }

    pub async fn user_exists(&self) -> Result<bool> {
        self.rpc.account_exists(&self.user_account_pubkey()).await
    }

    /// Fetches the client's own user account.
    pub async fn get_user(&self) -> Result<User> {
        self.fetch_user(&self.user_account_pubkey()).await
    }

    pub async fn fetch_user(&self, user_account: &Pubkey) -> Result<User> {
        self.rpc.fetch_anchor_account(user_account).await
    }

    /// Loads the markets a user has positions or orders in, plus the quote
    /// market.
    pub async fn load_user_markets(&self, user: &User) -> Result<()> {
        let (perp, spot) = user_market_indexes(user);
        let perp: Vec<u16> = perp.into_iter().collect();
        let spot: Vec<u16> = spot.into_iter().collect();
        self.load_markets(&perp, &spot).await
    }

    /// Market and oracle accounts a margin check of `user` reads, in
    /// remaining accounts order. The user's markets must be loaded.
    pub fn margin_accounts(&self, user: &User) -> Result<Vec<(Pubkey, Account)>> {
        remaining_accounts(user, self, &[], &[], &[])?
            .into_iter()
            .map(|meta| {
                self.accounts
                    .get(&meta.pubkey)
                    .map(|account| (meta.pubkey, account.value().clone()))
                    .ok_or(Error::AccountNotFound(meta.pubkey))
            })
            .collect()
    }

    /// Free collateral of `user` as the program computes it.
    pub fn free_collateral(&self, user: &User, requirement: MarginRequirementType) -> Result<u128> {
        let mut accounts = self.margin_accounts(user)?;
        health::free_collateral(
            user,
            &mut accounts,
            self.markets_slot(),
            Some(self.state.oracle_guard_rails),
            requirement,
        )
    }

    // === Transactions ===

    /// Creates the user account for `sub_account_id`, creating the user
    /// stats account first when the authority has none yet.
    pub async fn initialize_user_account(
        &self,
        sub_account_id: u16,
        name: [u8; 32],
        compute_unit_price: Option<u64>,
    ) -> Result<(Signature, Pubkey)> {
        let user = pda::user(&self.program_id, &self.authority, sub_account_id);
        let user_stats = self.user_stats_pubkey();
        let state = pda::state(&self.program_id);
        let payer = self.signer.pubkey();

        let mut ixs = Vec::with_capacity(2);
        if !self.rpc.account_exists(&user_stats).await? {
            debug!(%user_stats, "initializing user stats");
            ixs.push(Instruction {
                program_id: self.program_id,
                accounts: vec![
                    AccountMeta::new(user_stats, false),
                    AccountMeta::new(state, false),
                    AccountMeta::new_readonly(self.authority, true),
                    AccountMeta::new(payer, true),
                    AccountMeta::new_readonly(sysvar::rent::ID, false),
                    AccountMeta::new_readonly(system_program::ID, false),
                ],
                data: drift::instruction::InitializeUserStats {}.data(),
            });
        }
        ixs.push(Instruction {
            program_id: self.program_id,
            accounts: vec![
                AccountMeta::new(user, false),
                AccountMeta::new(user_stats, false),
                AccountMeta::new(state, false),
                AccountMeta::new_readonly(self.authority, true),
                AccountMeta::new(payer, true),
                AccountMeta::new_readonly(sysvar::rent::ID, false),
                AccountMeta::new_readonly(system_program::ID, false),
            ],
            data: drift::instruction::InitializeUser {
                sub_account_id,
                name,
            }
            .data(),
        });

        let signature = self
            .rpc
            .send_instructions(&self.signer, ixs, compute_unit_price)
            .await?;
        Ok((signature, user))
    }

    /// Associated token account of the authority for a spot market's mint.
    pub fn get_associated_token_account(&self, spot_market_index: u16) -> Result<Pubkey> {
        let market = self.get_spot_market(spot_market_index)?;
        Ok(get_associated_token_address(&self.authority, &market.market.mint))
    }

    /// Deposits `amount` (token precision) into the client's sub account.
    pub async fn deposit(
        &self,
        amount: u64,
        spot_market_index: u16,
        user_token_account: Pubkey,
        reduce_only: bool,
        compute_unit_price: Option<u64>,
    ) -> Result<Signature> {
        let user = self.get_user().await?;
        let mut accounts = vec![
            AccountMeta::new_readonly(pda::state(&self.program_id), false),
            AccountMeta::new(self.user_account_pubkey(), false),
            AccountMeta::new(self.user_stats_pubkey(), false),
            AccountMeta::new_readonly(self.signer.pubkey(), true),
            AccountMeta::new(pda::spot_market_vault(&self.program_id, spot_market_index), false),
            AccountMeta::new(user_token_account, false),
            AccountMeta::new_readonly(anchor_spl::token::ID, false),
        ];
        accounts.extend(remaining_accounts(&user, self, &[], &[], &[spot_market_index])?);

        let ix = Instruction {
            program_id: self.program_id,
            accounts,
            data: drift::instruction::Deposit {
                market_index: spot_market_index,
                amount,
                reduce_only,
            }
            .data(),
        };
        info!(amount, spot_market_index, "depositing");
        self.rpc
            .send_instructions(&self.signer, vec![ix], compute_unit_price)
            .await
    }

    pub async fn place_perp_order(
        &self,
        params: OrderParams,
        compute_unit_price: Option<u64>,
    ) -> Result<Signature> {
        let user = self.get_user().await?;
        let mut accounts = self.order_accounts();
        accounts.extend(remaining_accounts(&user, self, &[params.market_index], &[], &[])?);

        let ix = Instruction {
            program_id: self.program_id,
            accounts,
            data: drift::instruction::PlacePerpOrder { params }.data(),
        };
        self.rpc
            .send_instructions(&self.signer, vec![ix], compute_unit_price)
            .await
    }

    /// Cancels open orders; `None` filters match everything.
    pub async fn cancel_orders(
        &self,
        market_type: Option<MarketType>,
        market_index: Option<u16>,
        direction: Option<PositionDirection>,
        compute_unit_price: Option<u64>,
    ) -> Result<Signature> {
        let user = self.get_user().await?;
        let mut accounts = self.order_accounts();
        accounts.extend(remaining_accounts(&user, self, &[], &[], &[])?);

        let ix = Instruction {
            program_id: self.program_id,
            accounts,
            data: drift::instruction::CancelOrders {
                market_type,
                market_index,
                direction,
            }
            .data(),
        };
        self.rpc
            .send_instructions(&self.signer, vec![ix], compute_unit_price)
            .await
    }

    /// Creates the account tracking `authority`'s signed-message orders.
    /// Paid for by the signer, which may be a delegate.
    pub async fn initialize_signed_msg_user_orders(
        &self,
        authority: Pubkey,
        num_orders: u16,
        compute_unit_price: Option<u64>,
    ) -> Result<(Signature, Pubkey)> {
        let account = pda::signed_msg_user_orders(&self.program_id, &authority);
        let ix = Instruction {
            program_id: self.program_id,
            accounts: vec![
                AccountMeta::new(account, false),
                AccountMeta::new_readonly(authority, false),
                AccountMeta::new(self.signer.pubkey(), true),
                AccountMeta::new_readonly(sysvar::rent::ID, false),
                AccountMeta::new_readonly(system_program::ID, false),
            ],
            data: drift::instruction::InitializeSignedMsgUserOrders { num_orders }.data(),
        };
        let signature = self
            .rpc
            .send_instructions(&self.signer, vec![ix], compute_unit_price)
            .await?;
        Ok((signature, account))
    }

    fn order_accounts(&self) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new_readonly(pda::state(&self.program_id), false),
            AccountMeta::new(self.user_account_pubkey(), false),
            AccountMeta::new_readonly(self.signer.pubkey(), true),
        ]
    }
}

impl MarketLookup for DriftClient {
    fn perp_market(&self, market_index: u16) -> Option<PerpMarketContext> {
        self.perp_markets.get(&market_index).map(|e| e.value().clone())
    }

    fn spot_market(&self, market_index: u16) -> Option<SpotMarketContext> {
        self.spot_markets.get(&market_index).map(|e| e.value().clone())
    }
}

/// Accounts the program reads for margin checks: oracles, then spot
/// markets, then perp markets. Every market involved must be loaded;
/// perp markets pull in the quote spot market.
pub fn remaining_accounts(
    user: &User,
    markets: &impl MarketLookup,
    extra_perp: &[u16],
    extra_spot: &[u16],
    writable_spot: &[u16],
) -> Result<Vec<AccountMeta>> {
    let (mut perp, mut spot) = user_market_indexes(user);
    perp.extend(extra_perp);
    spot.extend(extra_spot);
    spot.extend(writable_spot);
    if !perp.is_empty() {
        spot.insert(QUOTE_SPOT_MARKET_INDEX);
    }

    let mut oracles = BTreeSet::new();
    let mut spot_metas = Vec::with_capacity(spot.len());
    let mut perp_metas = Vec::with_capacity(perp.len());
    for index in &spot {
        let ctx = markets.spot_market(*index).ok_or(Error::MarketNotLoaded {
            kind: "spot",
            index: *index,
        })?;
        oracles.insert(ctx.oracle());
        spot_metas.push(if writable_spot.contains(index) {
            AccountMeta::new(ctx.address, false)
        } else {
            AccountMeta::new_readonly(ctx.address, false)
        });
    }
    for index in &perp {
        let ctx = markets.perp_market(*index).ok_or(Error::MarketNotLoaded {
            kind: "perp",
            index: *index,
        })?;
        oracles.insert(ctx.oracle());
        perp_metas.push(AccountMeta::new_readonly(ctx.address, false));
    }
    // quote asset oracles are the default key and not passed
    oracles.remove(&Pubkey::default());

    Ok(oracles
        .into_iter()
        .map(|o| AccountMeta::new_readonly(o, false))
        .chain(spot_metas)
        .chain(perp_metas)
        .collect())
}

/// Perp and spot market indexes a user holds positions in. Perp positions
/// imply the quote spot market.
pub fn user_market_indexes(user: &User) -> (BTreeSet<u16>, BTreeSet<u16>) {
    let perp: BTreeSet<u16> = user
        .perp_positions
        .iter()
        .filter(|p| !is_perp_position_empty(p))
        .map(|p| p.market_index)
        .collect();
    let mut spot: BTreeSet<u16> = user
        .spot_positions
        .iter()
        .filter(|p| !is_spot_position_empty(p))
        .map(|p| p.market_index)
        .collect();
    if !perp.is_empty() {
        spot.insert(QUOTE_SPOT_MARKET_INDEX);
    }
    (perp, spot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::MarketMap;
    use drift::state::user::{PerpPosition, SpotPosition};

    struct Fixture {
        markets: MarketMap,
        shared_oracle: Pubkey,
        perp_oracle: Pubkey,
    }

    fn fixture() -> Fixture {
        let shared_oracle = Pubkey::new_unique();
        let perp_oracle = Pubkey::new_unique();
        let mut markets = MarketMap::default();
        for (index, oracle) in [(0, Pubkey::default()), (1, shared_oracle)] {
            markets.insert_spot(SpotMarketContext {
                address: Pubkey::new_unique(),
                market: SpotMarket {
                    market_index: index,
                    oracle,
                    ..SpotMarket::default()
                },
                oracle_price: None,
            });
        }
        for (index, oracle) in [(0, perp_oracle), (1, shared_oracle)] {
            let mut market = PerpMarket {
                market_index: index,
                ..PerpMarket::default()
            };
            market.amm.oracle = oracle;
            markets.insert_perp(PerpMarketContext {
                address: Pubkey::new_unique(),
                market,
                oracle_price: None,
            });
        }
        Fixture {
            markets,
            shared_oracle,
            perp_oracle,
        }
    }

    fn readonly(pubkey: Pubkey) -> AccountMeta {
        AccountMeta::new_readonly(pubkey, false)
    }

    #[test]
    fn test_user_market_indexes() {
        let mut user = User::default();
        assert_eq!(user_market_indexes(&user), (BTreeSet::new(), BTreeSet::new()));

        user.perp_positions[0] = PerpPosition {
            market_index: 2,
            open_orders: 1,
            ..PerpPosition::default()
        };
        user.spot_positions[3] = SpotPosition {
            market_index: 5,
            scaled_balance: 1,
            ..SpotPosition::default()
        };
        let (perp, spot) = user_market_indexes(&user);
        assert_eq!(perp.into_iter().collect::<Vec<_>>(), vec![2]);
        assert_eq!(spot.into_iter().collect::<Vec<_>>(), vec![0, 5]);
    }

    #[test]
    fn test_remaining_accounts_order() {
        let f = fixture();
        let mut user = User::default();
        user.perp_positions[0] = PerpPosition {
            market_index: 0,
            base_asset_amount: 1,
            ..PerpPosition::default()
        };
        user.spot_positions[0] = SpotPosition {
            market_index: 1,
            scaled_balance: 1,
            ..SpotPosition::default()
        };

        let metas = remaining_accounts(&user, &f.markets, &[1], &[], &[]).unwrap();
        let mut oracles = vec![f.shared_oracle, f.perp_oracle];
        oracles.sort();
        let spot = |i: u16| f.markets.spot[&i].address;
        let perp = |i: u16| f.markets.perp[&i].address;
        // shared oracle listed once, quote oracle left out
        assert_eq!(
            metas,
            vec![
                readonly(oracles[0]),
                readonly(oracles[1]),
                readonly(spot(0)),
                readonly(spot(1)),
                readonly(perp(0)),
                readonly(perp(1)),
            ]
        );
    }

    #[test]
    fn test_remaining_accounts_writable_spot() {
        let f = fixture();
        let metas = remaining_accounts(&User::default(), &f.markets, &[], &[], &[1]).unwrap();
        assert_eq!(
            metas,
            vec![
                readonly(f.shared_oracle),
                AccountMeta::new(f.markets.spot[&1].address, false),
            ]
        );

        // a quote deposit alone has no oracle account
        let metas = remaining_accounts(&User::default(), &f.markets, &[], &[0], &[]).unwrap();
        assert_eq!(metas, vec![readonly(f.markets.spot[&0].address)]);
    }

    #[test]
    fn test_remaining_accounts_requires_loaded_markets() {
        let f = fixture();
        assert!(matches!(
            remaining_accounts(&User::default(), &f.markets, &[7], &[], &[]),
            Err(Error::MarketNotLoaded { kind: "perp", index: 7 })
        ));
        assert!(matches!(
            remaining_accounts(&User::default(), &MarketMap::default(), &[], &[2], &[]),
            Err(Error::MarketNotLoaded { kind: "spot", index: 2 })
        ));
    }
}
