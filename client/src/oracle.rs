use drift::state::oracle::{get_oracle_price, OraclePriceData, OracleSource};
use solana_sdk::{account::Account, account_info::AccountInfo, pubkey::Pubkey};

use crate::error::{Error, Result};
use crate::math::PRICE_PRECISION;

/// Decodes the price held by an oracle account.
///
/// Quote-asset oracles are pegged to one and need no account data.
pub fn decode_oracle_price(
    source: &OracleSource,
    address: &Pubkey,
    account: Option<&Account>,
    slot: u64,
) -> Result<OraclePriceData> {
    if *source == OracleSource::QuoteAsset {
        return Ok(OraclePriceData {
            price: PRICE_PRECISION as i64,
            ..OraclePriceData::default()
        });
    }
    let account = account.ok_or(Error::AccountNotFound(*address))?;

    let mut lamports = account.lamports;
    let mut data = account.data.clone();
    let info = AccountInfo::new(
        address,
        false,
        false,
        &mut lamports,
        &mut data,
        &account.owner,
        account.executable,
        account.rent_epoch,
    );
    get_oracle_price(source, &info, slot).map_err(Error::program)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_asset_is_pegged() {
        let price = decode_oracle_price(&OracleSource::QuoteAsset, &Pubkey::default(), None, 0)
            .unwrap();
        assert_eq!(price.price, PRICE_PRECISION as i64);
    }

    #[test]
    fn test_missing_oracle_account() {
        let address = Pubkey::new_unique();
        assert!(matches!(
            decode_oracle_price(&OracleSource::Pyth, &address, None, 0),
            Err(Error::AccountNotFound(a)) if a == address
        ));
    }
}
