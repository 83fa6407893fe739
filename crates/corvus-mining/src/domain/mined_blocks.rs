//! Bounded ring of recently produced block summaries.

use crate::domain::assembler::AssembledBlock;
use shared_types::Hash;
use std::collections::VecDeque;

/// Summary record of one block produced by this node.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MinedBlockInfo {
    /// Block time (unix seconds).
    pub time: i64,
    /// Header nonce.
    pub nonce: u32,
    /// Block height.
    pub height: u32,
    /// Total fuel burned by the block.
    pub total_fuel: u64,
    /// Fuel rate of the block.
    pub fuel_rate: u64,
    /// Total fees collected.
    pub total_fees: u64,
    /// User transaction count.
    pub tx_count: u64,
    /// Serialized block size in bytes.
    pub block_size: u64,
    /// Block hash.
    pub hash: Hash,
    /// Previous block hash.
    pub prev_hash: Hash,
}

impl MinedBlockInfo {
    /// Builds the record for a sealed and accepted block.
    pub fn from_assembled(assembled: &AssembledBlock) -> Self {
        let header = &assembled.block.header;
        Self {
            time: header.time,
            nonce: header.nonce,
            height: header.height,
            total_fuel: header.fuel,
            fuel_rate: header.fuel_rate,
            total_fees: assembled.total_fees,
            tx_count: assembled.tx_count,
            block_size: assembled.block_size,
            hash: assembled.block.hash(),
            prev_hash: header.prev_hash,
        }
    }

    /// The producer's net reward: fees minus burned fuel.
    pub fn reward(&self) -> i64 {
        self.total_fees as i64 - self.total_fuel as i64
    }
}

/// Fixed-capacity ring of [`MinedBlockInfo`], most recent at the front.
#[derive(Clone, Debug)]
pub struct MinedBlockRing {
    buf: VecDeque<MinedBlockInfo>,
    capacity: usize,
}

impl MinedBlockRing {
    /// Creates a ring holding at most `capacity` records.
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Pushes a record to the front, evicting the oldest when full.
    pub fn push_front(&mut self, info: MinedBlockInfo) {
        if self.buf.len() == self.capacity {
            self.buf.pop_back();
        }
        self.buf.push_front(info);
    }

    /// Number of retained records.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True when no records are retained.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Snapshot of the `min(count, len)` most recent records, newest first.
    pub fn snapshot(&self, count: usize) -> Vec<MinedBlockInfo> {
        self.buf.iter().take(count).cloned().collect()
    }
}

impl Default for MinedBlockRing {
    fn default() -> Self {
        Self::new(crate::MAX_MINED_BLOCKS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(height: u32) -> MinedBlockInfo {
        MinedBlockInfo {
            height,
            total_fees: 500,
            total_fuel: 200,
            ..Default::default()
        }
    }

    #[test]
    fn newest_record_sits_at_the_front() {
        let mut ring = MinedBlockRing::new(10);
        for height in 1..=3 {
            ring.push_front(record(height));
        }
        let snapshot = ring.snapshot(10);
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot[0].height, 3);
        assert_eq!(snapshot[2].height, 1);
    }

    #[test]
    fn capacity_evicts_the_oldest() {
        let mut ring = MinedBlockRing::new(3);
        for height in 1..=5 {
            ring.push_front(record(height));
        }
        assert_eq!(ring.len(), 3);
        let snapshot = ring.snapshot(10);
        assert_eq!(snapshot[0].height, 5);
        assert_eq!(snapshot[2].height, 3);
    }

    #[test]
    fn snapshot_is_bounded_by_count() {
        let mut ring = MinedBlockRing::new(10);
        for height in 1..=6 {
            ring.push_front(record(height));
        }
        assert_eq!(ring.snapshot(2).len(), 2);
        assert_eq!(ring.snapshot(0).len(), 0);
    }

    #[test]
    fn reward_is_fees_minus_fuel() {
        assert_eq!(record(1).reward(), 300);
        let negative = MinedBlockInfo {
            total_fees: 100,
            total_fuel: 150,
            ..Default::default()
        };
        assert_eq!(negative.reward(), -50);
    }
}
