//! # Corvus Chain - Block Production & Validation Core
//!
//! **Bounded Context:** Delegated Proof-of-Stake Mining
//!
//! ## Purpose
//!
//! This crate produces candidate blocks for the wallet's delegate identities
//! and validates blocks received from the network:
//!
//! - Deterministic delegate-slot scheduling (seeded per-round shuffle)
//! - Priority-driven transaction packing under size and run-step budgets
//! - Adaptive fuel-rate control from recent block utilization
//! - A long-running, cancellable miner worker reconciling slots, tip
//!   changes, mempool churn and network readiness
//!
//! ## Key Design Principles
//!
//! 1. **Determinism**: every honest node derives the same delegate order for
//!    the same height.
//! 2. **Speculative Execution**: a transaction joins the block only after it
//!    executes cleanly against a forked state cache.
//! 3. **No Hidden Globals**: chain, mempool, wallet and state arrive in a
//!    [`MinerContext`](service::MinerContext) at worker startup.
//! 4. **Zero-Trust Validation**: received blocks re-run the full producer,
//!    structure and execution checks.
//!
//! ## Module Structure
//!
//! - [`domain`]: pure logic (fuel estimator, shuffle, selection, assembly,
//!   sealing, verification, speculative state cache)
//! - [`ports`]: hexagonal interfaces (inbound API, outbound SPI)
//! - [`adapters`]: in-memory reference adapters for tests and regtest
//! - [`service`]: the miner worker and its public handle

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

mod config;
mod error;
mod metrics;

pub use config::MinerConfig;
pub use error::{MiningError, Result, TxReject, VerifyError};
pub use metrics::Metrics;

// Re-export commonly used types
pub use domain::{
    build_block_index_entry, fuel_for, fuel_rate_for_next_block, shuffle_delegates,
    verify_delegate_block, AssembledBlock, Block, BlockAssembler, BlockHeader, BlockIndexEntry,
    BlockTx, CacheDelta, CacheView, CacheWrapper, ExecTrace, ExecutableTx, MempoolEntry,
    MinedBlockInfo, MinedBlockRing, PriorityMode, TxPriority,
};

pub use service::{Miner, MinerContext};

/// Hard cap on the summed run steps of one block's transactions.
pub const MAX_BLOCK_RUN_STEP: u64 = 12_000_000;

/// Fuel rate used while the chain is too young for the burn window.
pub const INIT_FUEL_RATES: u64 = 100;

/// Floor for the adaptive fuel rate.
pub const MIN_FUEL_RATES: u64 = 1;

/// Protocol maximum serialized block size in bytes.
pub const MAX_BLOCK_SIZE: u64 = 4_000_000;

/// Default `-blockmaxsize`: largest block the assembler will create.
pub const DEFAULT_BLOCK_MAX_SIZE: u64 = 3_750_000;

/// Default `-blockprioritysize`: bytes reserved for high-priority inclusion.
pub const DEFAULT_BLOCK_PRIORITY_SIZE: u64 = 27_000;

/// Default `-blockminsize`: fill with free transactions up to this size.
pub const DEFAULT_BLOCK_MIN_SIZE: u64 = 0;

/// Default `-blocksizeforburn`: burn-window width for the fuel estimator.
pub const DEFAULT_BURN_BLOCK_SIZE: u32 = 50;

/// Percent scale (100.00%) used when normalizing fee value by median price.
pub const PERCENT_BOOST: u64 = 10_000;

/// Upper bound on an attached block signature, in bytes.
pub const MAX_BLOCK_SIGNATURE_SIZE: usize = 100;

/// Capacity of the recently-mined-blocks ring.
pub const MAX_MINED_BLOCKS: usize = 100;

/// Wall-clock cap on one mining attempt before the outer loop restarts.
pub const MINE_ATTEMPT_TIMEOUT_S: u64 = 60;

/// Granularity of the worker's cancellable sleeps.
pub const MINER_SLEEP_MS: u64 = 100;

/// A tip older than this is considered stale outside regtest.
pub const STALE_TIP_SECS: i64 = 60 * 60;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(MAX_BLOCK_RUN_STEP, 12_000_000);
        assert_eq!(INIT_FUEL_RATES, 100);
        assert_eq!(MIN_FUEL_RATES, 1);
        assert!(DEFAULT_BLOCK_MAX_SIZE < MAX_BLOCK_SIZE);
        assert_eq!(STALE_TIP_SECS, 3600);
    }
}
