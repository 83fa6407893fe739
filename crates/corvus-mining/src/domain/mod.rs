//! Domain layer - pure logic of the mining core.
//!
//! Everything here is synchronous and I/O-free. The worker in
//! [`crate::service`] orchestrates these services under the node's locks.
//!
//! ## Services
//!
//! - [`fuel`]: adaptive fuel-rate estimation from the burn window
//! - [`shuffle`]: deterministic per-round delegate ordering and slot lookup
//! - [`priority`]: dual-mode priority heap over mempool candidates
//! - [`assembler`]: constrained block packing against a speculative cache
//! - [`seal`]: reward-transaction population and delegate signing
//! - [`verify`]: structural and execution validation of received blocks
//! - [`state`]: the forkable speculative cache stack
//! - [`mined_blocks`]: bounded ring of recently produced block summaries

pub mod assembler;
pub mod block;
pub mod fuel;
pub mod mined_blocks;
pub mod priority;
pub mod seal;
pub mod shuffle;
pub mod state;
#[cfg(test)]
pub(crate) mod testutil;
pub mod verify;

pub use assembler::{AssembledBlock, BlockAssembler};
pub use block::{
    build_block_index_entry, fuel_for, Block, BlockHeader, BlockIndexEntry, BlockPriceMedianTx,
    BlockRewardTx, BlockTx, ExecTrace, ExecutableTx, FundCoinGenesisTx, MultiCoinRewardTx,
    TX_VERSION1,
};
pub use fuel::fuel_rate_for_next_block;
pub use mined_blocks::{MinedBlockInfo, MinedBlockRing};
pub use priority::{MempoolEntry, PriorityMode, TxPriority};
pub use seal::create_block_reward_tx;
pub use shuffle::{current_delegate, shuffle_delegates};
pub use state::{CacheDelta, CacheView, CacheWrapper, ExecFailure};
pub use verify::verify_delegate_block;
