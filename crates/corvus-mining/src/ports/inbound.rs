//! Inbound port (driving side - API).

use crate::domain::mined_blocks::MinedBlockInfo;
use crate::error::Result;
use async_trait::async_trait;

/// Primary port: control surface of the miner worker.
#[async_trait]
pub trait MinerControl: Send + Sync {
    /// Starts (or restarts) the worker.
    ///
    /// `target_delta` is the number of blocks to mine beyond the current
    /// height; outside the main network it must be positive and the worker
    /// exits once the chain reaches the target. On the main network the
    /// worker mines indefinitely regardless of the delta.
    async fn start_mining(&self, target_delta: i64) -> Result<()>;

    /// Cancels the worker and waits for it to wind down.
    async fn stop_mining(&self);

    /// Current worker status.
    fn status(&self) -> MinerStatus;

    /// The last `min(count, ring)` produced-block records, most recent
    /// first.
    fn mined_blocks(&self, count: usize) -> Vec<MinedBlockInfo>;
}

/// Snapshot of the worker's state.
#[derive(Clone, Debug, Default)]
pub struct MinerStatus {
    /// True while the worker loop is running.
    pub active: bool,
    /// Blocks produced and accepted during this session.
    pub blocks_produced: u64,
    /// Time of the last produced block.
    pub last_block_time: Option<i64>,
}
