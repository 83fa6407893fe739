//! Per-network chain parameters.
//!
//! Network constants travel inside [`ChainParams`]; there is no process-wide
//! configuration singleton. Subsystems receive the parameters at
//! construction time and thread them through explicitly.

use crate::ids::{Hash, RegId};
use serde::{Deserialize, Serialize};

/// Network identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Network {
    /// Public main network.
    #[serde(rename = "main")]
    Main,
    /// Public test network.
    #[serde(rename = "test")]
    Test,
    /// Local regression-test network (single node, no peers required).
    #[serde(rename = "regtest")]
    Regtest,
}

/// Consensus-critical constants of one network.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChainParams {
    /// Network identity.
    pub network: Network,
    /// Delegate slot width in seconds.
    pub block_interval_s: i64,
    /// Size of the active delegate set (slots per round).
    pub total_delegate_num: u32,
    /// Upper bound (inclusive) for the randomized block nonce.
    pub max_nonce: u32,
    /// Hash of the genesis block.
    pub genesis_hash: Hash,
    /// Height at which the stablecoin fork activates; the block at this
    /// height is the fund coin genesis block.
    pub stablecoin_genesis_height: u32,
}

impl ChainParams {
    /// Main network parameters.
    pub fn main() -> Self {
        Self {
            network: Network::Main,
            block_interval_s: 10,
            total_delegate_num: 11,
            max_nonce: 1000,
            genesis_hash: [0x4a; 32],
            stablecoin_genesis_height: 1_600_000,
        }
    }

    /// Test network parameters.
    pub fn test() -> Self {
        Self {
            network: Network::Test,
            genesis_hash: [0x7e; 32],
            stablecoin_genesis_height: 500_000,
            ..Self::main()
        }
    }

    /// Regression-test parameters: one-second slots so integration tests can
    /// cross slot boundaries quickly.
    pub fn regtest() -> Self {
        Self {
            network: Network::Regtest,
            block_interval_s: 1,
            genesis_hash: [0x11; 32],
            stablecoin_genesis_height: 100_000,
            ..Self::main()
        }
    }

    /// Blocks per (365-day) year at this network's slot width.
    pub fn blocks_per_year(&self) -> u64 {
        (365 * 24 * 3600 / self.block_interval_s) as u64
    }

    /// Initial fund coin allocation released in the fund coin genesis block.
    ///
    /// Returns `(recipient, amount)` pairs in smallest units.
    pub fn fund_coin_genesis_outputs(&self) -> Vec<(RegId, u64)> {
        match self.network {
            // 210M fund coins, 8 decimals, split between the foundation
            // account and the risk reserve.
            Network::Main => vec![
                (RegId::new(0, 1), 18_900_000_000_000_000),
                (RegId::new(0, 2), 2_100_000_000_000_000),
            ],
            Network::Test | Network::Regtest => vec![(RegId::new(0, 1), 21_000_000_000_000_000)],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn networks_have_distinct_genesis_hashes() {
        let hashes = [
            ChainParams::main().genesis_hash,
            ChainParams::test().genesis_hash,
            ChainParams::regtest().genesis_hash,
        ];
        assert_ne!(hashes[0], hashes[1]);
        assert_ne!(hashes[1], hashes[2]);
        assert_ne!(hashes[0], hashes[2]);
    }

    #[test]
    fn regtest_uses_short_slots() {
        assert_eq!(ChainParams::regtest().block_interval_s, 1);
        assert_eq!(ChainParams::main().block_interval_s, 10);
    }

    #[test]
    fn fund_genesis_totals_match_across_networks() {
        let total = |p: &ChainParams| {
            p.fund_coin_genesis_outputs()
                .iter()
                .map(|(_, v)| v)
                .sum::<u64>()
        };
        assert_eq!(total(&ChainParams::main()), 21_000_000_000_000_000);
        assert_eq!(total(&ChainParams::regtest()), 21_000_000_000_000_000);
    }

    #[test]
    fn blocks_per_year_scales_with_interval() {
        assert_eq!(ChainParams::main().blocks_per_year(), 3_153_600);
        assert_eq!(ChainParams::regtest().blocks_per_year(), 31_536_000);
    }
}
