//! On-chain accounts.

use crate::coin::CoinType;
use crate::ids::{KeyId, PublicKey, RegId};
use crate::params::ChainParams;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use std::collections::BTreeMap;

/// An on-chain account.
///
/// Delegate-eligible accounts carry `received_votes`; accounts operated by a
/// mining machine may register a second, miner-only public key so the cold
/// owner key never touches the producing host.
#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Account {
    /// Stable registration id.
    pub reg_id: RegId,
    /// Address-level key id (derived from `pub_key`).
    pub key_id: KeyId,
    /// Primary public key.
    #[serde_as(as = "Bytes")]
    pub pub_key: PublicKey,
    /// Optional miner-only public key.
    #[serde_as(as = "Option<Bytes>")]
    pub miner_pub_key: Option<PublicKey>,
    /// Free balances per coin domain, in smallest units.
    pub balances: BTreeMap<CoinType, u64>,
    /// Votes received as a delegate candidate, in smallest units.
    pub received_votes: u64,
}

impl Account {
    /// Creates an account from its registration id and primary public key.
    pub fn new(reg_id: RegId, pub_key: PublicKey) -> Self {
        Self {
            reg_id,
            key_id: KeyId::from_pubkey(&pub_key),
            pub_key,
            miner_pub_key: None,
            balances: BTreeMap::new(),
            received_votes: 0,
        }
    }

    /// Free balance in the given coin domain.
    pub fn balance(&self, coin: CoinType) -> u64 {
        self.balances.get(&coin).copied().unwrap_or(0)
    }

    /// Credits `amount` to the given coin domain.
    pub fn add_balance(&mut self, coin: CoinType, amount: u64) {
        *self.balances.entry(coin).or_insert(0) += amount;
    }

    /// Debits `amount` from the given coin domain; returns false on
    /// insufficient funds (balance untouched).
    pub fn sub_balance(&mut self, coin: CoinType, amount: u64) -> bool {
        match self.balances.get_mut(&coin) {
            Some(bal) if *bal >= amount => {
                *bal -= amount;
                true
            }
            _ => false,
        }
    }

    /// Block-inflation interest owed to this delegate for producing the
    /// block at `height`.
    ///
    /// The annual inflation rate starts at 5% of received votes and decays
    /// one percentage point per on-chain year down to a 1% floor; the
    /// per-block payout divides the annual amount by the network's blocks
    /// per year.
    pub fn block_inflate_interest(&self, height: u32, params: &ChainParams) -> u64 {
        let blocks_per_year = params.blocks_per_year();
        if blocks_per_year == 0 || self.received_votes == 0 {
            return 0;
        }
        let year = height as u64 / blocks_per_year;
        let rate_bps = 500u64.saturating_sub(year * 100).max(100);
        let annual = self.received_votes as u128 * rate_bps as u128 / 10_000;
        (annual / blocks_per_year as u128) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_account(votes: u64) -> Account {
        let mut account = Account::new(RegId::new(2, 1), [0x02; 33]);
        account.received_votes = votes;
        account
    }

    #[test]
    fn key_id_matches_pubkey_derivation() {
        let account = test_account(0);
        assert_eq!(account.key_id, KeyId::from_pubkey(&account.pub_key));
    }

    #[test]
    fn balance_credit_and_debit() {
        let mut account = test_account(0);
        account.add_balance(CoinType::Base, 1_000);
        assert_eq!(account.balance(CoinType::Base), 1_000);
        assert!(account.sub_balance(CoinType::Base, 400));
        assert_eq!(account.balance(CoinType::Base), 600);
        assert!(!account.sub_balance(CoinType::Base, 601));
        assert_eq!(account.balance(CoinType::Base), 600);
        assert!(!account.sub_balance(CoinType::Stable, 1));
    }

    #[test]
    fn inflate_interest_decays_with_height() {
        let params = ChainParams::main();
        let votes = 1_000_000 * params.blocks_per_year();
        let account = test_account(votes);

        // Year 0: 5% annual.
        let y0 = account.block_inflate_interest(0, &params);
        assert_eq!(y0, 1_000_000 * 500 / 10_000);

        // Year 2: 3% annual.
        let h2 = (2 * params.blocks_per_year()) as u32;
        let y2 = account.block_inflate_interest(h2, &params);
        assert_eq!(y2, 1_000_000 * 300 / 10_000);

        // Far future: 1% floor.
        let h9 = (9 * params.blocks_per_year()) as u32;
        let y9 = account.block_inflate_interest(h9, &params);
        assert_eq!(y9, 1_000_000 * 100 / 10_000);
    }

    #[test]
    fn inflate_interest_zero_without_votes() {
        let params = ChainParams::main();
        assert_eq!(test_account(0).block_inflate_interest(100, &params), 0);
    }
}
