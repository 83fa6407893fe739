//! Outbound ports (driven side - SPI).
//!
//! The collaborators behind these traits are lock-guarded by the worker
//! (chain, then mempool, then wallet — always in that order), so the
//! contracts themselves are synchronous.

use crate::domain::block::{Block, BlockIndexEntry};
use crate::domain::priority::MempoolEntry;
use crate::error::Result;
use shared_types::{Hash, KeyId, Signature};
use std::collections::HashSet;
use std::sync::Arc;

/// Port: the node's chain view and block submission path.
pub trait ChainStore: Send + Sync {
    /// The active tip, if any block has been connected.
    fn tip(&self) -> Option<Arc<BlockIndexEntry>>;

    /// Height of the active tip (0 for a genesis-only chain).
    fn height(&self) -> u32;

    /// Reads a full block by hash.
    fn read_block(&self, hash: &Hash) -> Option<Block>;

    /// Validates and connects a block, advancing the tip on success.
    fn process_block(&mut self, block: Block) -> Result<()>;
}

/// Port: snapshot access to the mempool.
pub trait MempoolView: Send + Sync {
    /// Snapshot of all pool entries.
    fn entries(&self) -> Vec<MempoolEntry>;

    /// Monotonic counter bumped on every pool mutation; the worker restarts
    /// a mining attempt when it diverges.
    fn updated_count(&self) -> u64;
}

/// Port: wallet-mediated key lookup and signing.
pub trait WalletKeystore: Send + Sync {
    /// Key ids of the wallet's miner keys.
    fn miner_key_ids(&self) -> HashSet<KeyId>;

    /// True if the wallet holds a key for `key_id`; with `miner_only` the
    /// lookup is restricted to miner keys.
    fn has_key(&self, key_id: &KeyId, miner_only: bool) -> bool;

    /// Signs `msg` with the key behind `key_id`, preferring the miner key
    /// when `use_miner_key` is set.
    fn sign(&self, key_id: &KeyId, msg: &[u8], use_miner_key: bool) -> Result<Signature>;
}

/// Port: network readiness and time.
pub trait NetworkInfo: Send + Sync {
    /// Number of connected peers.
    fn peer_count(&self) -> usize;

    /// Network-adjusted unix time in seconds.
    fn adjusted_time(&self) -> i64;
}
