//! Runtime configuration for the mining core.

use serde::Deserialize;

/// Miner tunables, typically sourced from the node's CLI flags.
///
/// Raw values are stored as given; the `effective_*` accessors apply the
/// protocol clamps, so a misconfigured node still produces valid blocks.
#[derive(Clone, Debug, Deserialize)]
pub struct MinerConfig {
    /// Largest block to create, in bytes (`-blockmaxsize`).
    pub block_max_size: u64,

    /// Bytes dedicated to high-priority transactions regardless of fee
    /// (`-blockprioritysize`).
    pub block_priority_size: u64,

    /// Fill the block with free transactions until it reaches this size
    /// (`-blockminsize`).
    pub block_min_size: u64,

    /// Number of recent blocks averaged by the fuel estimator
    /// (`-blocksizeforburn`).
    pub burn_block_window: u32,

    /// Candidates below this fee rate are skipped once the block has
    /// reached `block_min_size`.
    pub min_relay_fee_per_kb: f64,

    /// Record execution rejections in the failure log.
    pub log_failures: bool,

    /// Keep mining on a stale tip (`-genblockforce`).
    pub gen_block_force: bool,

    /// Pre-stablecoin compatibility: emit the historical second reward
    /// placeholder. Old nodes produced two reward transactions before the
    /// fork; leave off unless replaying that chain segment.
    pub legacy_double_reward: bool,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            block_max_size: crate::DEFAULT_BLOCK_MAX_SIZE,
            block_priority_size: crate::DEFAULT_BLOCK_PRIORITY_SIZE,
            block_min_size: crate::DEFAULT_BLOCK_MIN_SIZE,
            burn_block_window: crate::DEFAULT_BURN_BLOCK_SIZE,
            min_relay_fee_per_kb: 0.0,
            log_failures: false,
            gen_block_force: false,
            legacy_double_reward: false,
        }
    }
}

impl MinerConfig {
    /// Block size limit clamped to `[1 KB, MAX_BLOCK_SIZE - 1 KB]`.
    pub fn effective_block_max_size(&self) -> u64 {
        self.block_max_size.clamp(1000, crate::MAX_BLOCK_SIZE - 1000)
    }

    /// Priority budget, never above the effective block size limit.
    pub fn effective_block_priority_size(&self) -> u64 {
        self.block_priority_size.min(self.effective_block_max_size())
    }

    /// Minimum block size, never above the effective block size limit.
    pub fn effective_block_min_size(&self) -> u64 {
        self.block_min_size.min(self.effective_block_max_size())
    }
}
