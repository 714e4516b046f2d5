//! Program derived addresses of the protocol accounts.

use solana_sdk::pubkey::Pubkey;

pub fn state(program_id: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[b"drift_state"], program_id).0
}

pub fn user(program_id: &Pubkey, authority: &Pubkey, sub_account_id: u16) -> Pubkey {
    Pubkey::find_program_address(
        &[b"user", authority.as_ref(), &sub_account_id.to_le_bytes()],
        program_id,
    )
    .0
}

pub fn user_stats(program_id: &Pubkey, authority: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[b"user_stats", authority.as_ref()], program_id).0
}

pub fn perp_market(program_id: &Pubkey, market_index: u16) -> Pubkey {
    Pubkey::find_program_address(&[b"perp_market", &market_index.to_le_bytes()], program_id).0
}

pub fn spot_market(program_id: &Pubkey, market_index: u16) -> Pubkey {
    Pubkey::find_program_address(&[b"spot_market", &market_index.to_le_bytes()], program_id).0
}

pub fn spot_market_vault(program_id: &Pubkey, market_index: u16) -> Pubkey {
    Pubkey::find_program_address(
        &[b"spot_market_vault", &market_index.to_le_bytes()],
        program_id,
    )
    .0
}

/// Account holding a user's signed-message (swift) order ids.
pub fn signed_msg_user_orders(program_id: &Pubkey, authority: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[b"SIGNED_MSG", authority.as_ref()], program_id).0
}

pub fn high_leverage_mode_config(program_id: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[b"high_leverage_mode_config"], program_id).0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_accounts_differ_per_sub_account() {
        let program = drift::ID;
        let authority = Pubkey::new_unique();

        let first = user(&program, &authority, 0);
        assert_eq!(first, user(&program, &authority, 0));
        assert_ne!(first, user(&program, &authority, 1));
        assert_ne!(first, user(&program, &Pubkey::new_unique(), 0));
        assert_ne!(first, user_stats(&program, &authority));
    }

    #[test]
    fn test_market_accounts_are_distinct() {
        let program = drift::ID;
        assert_ne!(perp_market(&program, 0), spot_market(&program, 0));
        assert_ne!(spot_market(&program, 0), spot_market_vault(&program, 0));
        assert_ne!(perp_market(&program, 0), perp_market(&program, 1));
    }
}
