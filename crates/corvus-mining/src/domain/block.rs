//! Blocks, block transactions and the in-memory block index.

use crate::domain::state::CacheView;
use crate::error::TxReject;
use serde::{Deserialize, Serialize};
use shared_crypto::{build_merkle_root, hash256};
use shared_types::{CoinPricePair, CoinType, Hash, RegId, Signature, TxId};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Current transaction serialization version.
pub const TX_VERSION1: u32 = 1;

/// Fuel consumed by `run_step` execution steps at the given per-step rate.
pub fn fuel_for(run_step: u64, fuel_rate: u64) -> u64 {
    run_step * fuel_rate / 100
}

/// Execution trace returned by a successful transaction run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExecTrace {
    /// Execution steps consumed; priced into fuel via [`fuel_for`].
    pub run_step: u64,
}

/// The opaque user-transaction contract.
///
/// The mining core never inspects transaction semantics; it only needs
/// content identity, serialized size, the declared fee and the two hooks
/// used during packing and validation. `execute` returns its run-step count
/// instead of mutating the transaction, so candidates can be shared freely
/// between the mempool and in-flight blocks.
pub trait ExecutableTx: fmt::Debug + Send + Sync {
    /// Canonical serialized bytes.
    fn to_bytes(&self) -> Vec<u8>;

    /// Content hash of the serialized transaction.
    fn txid(&self) -> TxId {
        hash256(&self.to_bytes())
    }

    /// Serialized size in bytes.
    fn serialized_size(&self) -> u64 {
        self.to_bytes().len() as u64
    }

    /// Serialization version.
    fn version(&self) -> u32 {
        TX_VERSION1
    }

    /// Declared fee: coin domain and amount.
    fn fees(&self) -> (CoinType, u64);

    /// Fuel this transaction burns at the given rate, from the run-step
    /// count observed at mempool admission. Used to discount fee value
    /// during selection; the authoritative count comes from [`Self::execute`].
    fn fuel(&self, fuel_rate: u64) -> u64 {
        let _ = fuel_rate;
        0
    }

    /// True for coinbase-style transactions, which are never selected from
    /// the mempool.
    fn is_coinbase(&self) -> bool {
        false
    }

    /// Executes the transaction at `(height, index)` against a speculative
    /// state view.
    fn execute(
        &self,
        height: u32,
        index: u32,
        view: &mut CacheView<'_>,
    ) -> Result<ExecTrace, TxReject>;
}

/// The block reward transaction (pre-stablecoin form).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlockRewardTx {
    /// Serialization version.
    pub version: u32,
    /// Producing delegate.
    pub tx_uid: RegId,
    /// Height of the containing block.
    pub valid_height: u32,
    /// Reward value: total fees minus total fuel.
    pub reward_value: u64,
}

impl Default for BlockRewardTx {
    fn default() -> Self {
        Self {
            version: TX_VERSION1,
            tx_uid: RegId::default(),
            valid_height: 0,
            reward_value: 0,
        }
    }
}

/// The multi-coin block reward transaction (post-stablecoin form); also
/// carries the delegate's block-inflation interest.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MultiCoinRewardTx {
    /// Serialization version.
    pub version: u32,
    /// Producing delegate.
    pub tx_uid: RegId,
    /// Height of the containing block.
    pub valid_height: u32,
    /// Reward value: total fees minus total fuel.
    pub reward_value: u64,
    /// Block-inflation interest owed to the delegate.
    pub profits: u64,
}

impl Default for MultiCoinRewardTx {
    fn default() -> Self {
        Self {
            version: TX_VERSION1,
            tx_uid: RegId::default(),
            valid_height: 0,
            reward_value: 0,
            profits: 0,
        }
    }
}

/// The block price-median transaction: a snapshot of the oracle median
/// price points at the block's height (post-stablecoin blocks only).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlockPriceMedianTx {
    /// Serialization version.
    pub version: u32,
    /// Height of the containing block.
    pub valid_height: u32,
    /// Median price per coin pair.
    pub median_price_points: BTreeMap<CoinPricePair, u64>,
}

impl Default for BlockPriceMedianTx {
    fn default() -> Self {
        Self {
            version: TX_VERSION1,
            valid_height: 0,
            median_price_points: BTreeMap::new(),
        }
    }
}

/// Fund coin genesis output, carried only by the stablecoin genesis block.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FundCoinGenesisTx {
    /// Serialization version.
    pub version: u32,
    /// Receiving account.
    pub to_uid: RegId,
    /// Fund coin amount in smallest units.
    pub coin_amount: u64,
    /// Height of the containing block.
    pub valid_height: u32,
}

impl FundCoinGenesisTx {
    /// Creates a genesis output.
    pub fn new(to_uid: RegId, coin_amount: u64, valid_height: u32) -> Self {
        Self {
            version: TX_VERSION1,
            to_uid,
            coin_amount,
            valid_height,
        }
    }
}

/// One transaction slot of a block: a system transaction or an opaque user
/// transaction.
#[derive(Clone, Debug)]
pub enum BlockTx {
    /// Pre-fork reward transaction.
    Reward(BlockRewardTx),
    /// Post-fork multi-coin reward transaction.
    MultiCoinReward(MultiCoinRewardTx),
    /// Post-fork oracle median snapshot.
    PriceMedian(BlockPriceMedianTx),
    /// Stablecoin-genesis fund coin output.
    FundCoinGenesis(FundCoinGenesisTx),
    /// A user transaction from the mempool.
    User(Arc<dyn ExecutableTx>),
}

impl BlockTx {
    /// Canonical serialized bytes, with a type tag for system transactions.
    pub fn to_bytes(&self) -> Vec<u8> {
        fn tagged<T: Serialize>(tag: u8, tx: &T) -> Vec<u8> {
            let mut bytes = vec![tag];
            // BTreeMap fields keep the JSON encoding deterministic.
            bytes.extend(serde_json::to_vec(tx).expect("system tx serialization"));
            bytes
        }
        match self {
            BlockTx::Reward(tx) => tagged(0x01, tx),
            BlockTx::MultiCoinReward(tx) => tagged(0x02, tx),
            BlockTx::PriceMedian(tx) => tagged(0x03, tx),
            BlockTx::FundCoinGenesis(tx) => tagged(0x04, tx),
            BlockTx::User(tx) => tx.to_bytes(),
        }
    }

    /// Content hash.
    pub fn txid(&self) -> TxId {
        match self {
            BlockTx::User(tx) => tx.txid(),
            _ => hash256(&self.to_bytes()),
        }
    }

    /// Serialized size in bytes.
    pub fn serialized_size(&self) -> u64 {
        match self {
            BlockTx::User(tx) => tx.serialized_size(),
            _ => self.to_bytes().len() as u64,
        }
    }

    /// Serialization version.
    pub fn version(&self) -> u32 {
        match self {
            BlockTx::Reward(tx) => tx.version,
            BlockTx::MultiCoinReward(tx) => tx.version,
            BlockTx::PriceMedian(tx) => tx.version,
            BlockTx::FundCoinGenesis(tx) => tx.version,
            BlockTx::User(tx) => tx.version(),
        }
    }

    /// Producing/receiving account id for system transactions; the empty
    /// id for user transactions.
    pub fn tx_uid(&self) -> RegId {
        match self {
            BlockTx::Reward(tx) => tx.tx_uid,
            BlockTx::MultiCoinReward(tx) => tx.tx_uid,
            BlockTx::FundCoinGenesis(tx) => tx.to_uid,
            _ => RegId::default(),
        }
    }

    /// True for the reward-transaction forms allowed at slot 0.
    pub fn is_reward(&self) -> bool {
        matches!(self, BlockTx::Reward(_) | BlockTx::MultiCoinReward(_))
    }

    /// Declared fee; system transactions carry none.
    pub fn fees(&self) -> (CoinType, u64) {
        match self {
            BlockTx::User(tx) => tx.fees(),
            _ => (CoinType::Base, 0),
        }
    }

    /// Executes this transaction against a speculative state view.
    ///
    /// System transactions are free (`run_step == 0`): rewards credit the
    /// producing delegate, the median snapshot is cross-checked against the
    /// oracle, and fund genesis outputs are credited.
    pub fn execute(
        &self,
        height: u32,
        index: u32,
        view: &mut CacheView<'_>,
    ) -> Result<ExecTrace, TxReject> {
        match self {
            BlockTx::Reward(tx) => {
                credit(view, tx.tx_uid, CoinType::Base, tx.reward_value)?;
                Ok(ExecTrace::default())
            }
            BlockTx::MultiCoinReward(tx) => {
                credit(view, tx.tx_uid, CoinType::Base, tx.reward_value + tx.profits)?;
                Ok(ExecTrace::default())
            }
            BlockTx::PriceMedian(tx) => {
                let expected = view.block_median_price_points(height);
                if expected != tx.median_price_points {
                    return Err(TxReject::new(
                        TxReject::INVALID,
                        "median price points mismatch",
                    ));
                }
                Ok(ExecTrace::default())
            }
            BlockTx::FundCoinGenesis(tx) => {
                // Genesis outputs may target accounts that do not exist yet.
                let mut account = view.get_account(&tx.to_uid).unwrap_or_else(|| {
                    shared_types::Account::new(tx.to_uid, [0u8; 33])
                });
                account.add_balance(CoinType::Fund, tx.coin_amount);
                view.set_account(account);
                Ok(ExecTrace::default())
            }
            BlockTx::User(tx) => tx.execute(height, index, view),
        }
    }
}

fn credit(
    view: &mut CacheView<'_>,
    uid: RegId,
    coin: CoinType,
    amount: u64,
) -> Result<(), TxReject> {
    let mut account = view
        .get_account(&uid)
        .ok_or_else(|| TxReject::new(TxReject::INVALID, format!("unknown account {uid}")))?;
    account.add_balance(coin, amount);
    view.set_account(account);
    Ok(())
}

/// Block header.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Header version.
    pub version: u32,
    /// Hash of the previous block.
    pub prev_hash: Hash,
    /// Merkle root over the block's transaction ids.
    pub merkle_root: Hash,
    /// Block height.
    pub height: u32,
    /// Unix-second timestamp.
    pub time: i64,
    /// Randomized nonce in `[0, max_nonce]`.
    pub nonce: u32,
    /// Total fuel consumed by the block's transactions.
    pub fuel: u64,
    /// Per-step fuel price used by this block.
    pub fuel_rate: u64,
    /// Producing delegate's signature over [`Block::signature_hash`].
    pub signature: Signature,
}

impl BlockHeader {
    fn unsigned_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(100);
        bytes.extend_from_slice(&self.version.to_le_bytes());
        bytes.extend_from_slice(&self.prev_hash);
        bytes.extend_from_slice(&self.merkle_root);
        bytes.extend_from_slice(&self.height.to_le_bytes());
        bytes.extend_from_slice(&self.time.to_le_bytes());
        bytes.extend_from_slice(&self.nonce.to_le_bytes());
        bytes.extend_from_slice(&self.fuel.to_le_bytes());
        bytes.extend_from_slice(&self.fuel_rate.to_le_bytes());
        bytes
    }

    /// Serialized header size, including the attached signature.
    pub fn serialized_size(&self) -> u64 {
        (self.unsigned_bytes().len() + self.signature.len()) as u64
    }
}

/// A block: the reward transaction first, user transactions after.
#[derive(Clone, Debug, Default)]
pub struct Block {
    /// Header.
    pub header: BlockHeader,
    /// Transactions; index 0 is the block reward transaction.
    pub txs: Vec<BlockTx>,
}

impl Block {
    /// Merkle root over the current transaction set.
    pub fn build_merkle_root(&self) -> Hash {
        let leaves: Vec<Hash> = self.txs.iter().map(|tx| tx.txid()).collect();
        build_merkle_root(&leaves)
    }

    /// The digest the producing delegate signs: every header field except
    /// the signature itself.
    pub fn signature_hash(&self) -> Hash {
        hash256(&self.header.unsigned_bytes())
    }

    /// Block hash (header including the signature).
    pub fn hash(&self) -> Hash {
        let mut bytes = self.header.unsigned_bytes();
        bytes.extend_from_slice(&self.header.signature);
        hash256(&bytes)
    }

    /// Serialized size of header plus all transactions.
    pub fn serialized_size(&self) -> u64 {
        self.header.serialized_size()
            + self
                .txs
                .iter()
                .map(|tx| tx.serialized_size())
                .sum::<u64>()
    }

    /// The reward transaction, if the block has one at slot 0.
    pub fn reward_tx(&self) -> Option<&BlockTx> {
        self.txs.first().filter(|tx| tx.is_reward())
    }
}

/// One entry of the in-memory block index: a header summary linked to its
/// parent, reachable backward from the active tip.
#[derive(Clone, Debug)]
pub struct BlockIndexEntry {
    /// Block height.
    pub height: u32,
    /// Block time (unix seconds).
    pub time: i64,
    /// Total fuel of the block.
    pub fuel: u64,
    /// Fuel rate of the block.
    pub fuel_rate: u64,
    /// Block hash.
    pub hash: Hash,
    /// Parent entry; `None` only for genesis.
    pub prev: Option<Arc<BlockIndexEntry>>,
}

/// Builds the index entry for an accepted block on top of its parent.
pub fn build_block_index_entry(block: &Block, prev: Option<Arc<BlockIndexEntry>>) -> BlockIndexEntry {
    BlockIndexEntry {
        height: block.header.height,
        time: block.header.time,
        fuel: block.header.fuel,
        fuel_rate: block.header.fuel_rate,
        hash: block.hash(),
        prev,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_tx_ids_commit_to_content() {
        let a = BlockTx::Reward(BlockRewardTx {
            reward_value: 1,
            ..Default::default()
        });
        let b = BlockTx::Reward(BlockRewardTx {
            reward_value: 2,
            ..Default::default()
        });
        assert_ne!(a.txid(), b.txid());
        assert_eq!(a.txid(), a.txid());
    }

    #[test]
    fn reward_and_price_median_tags_differ() {
        // A default reward tx and a default price median tx must never
        // collide even when their JSON bodies are small.
        let reward = BlockTx::Reward(BlockRewardTx::default());
        let median = BlockTx::PriceMedian(BlockPriceMedianTx::default());
        assert_ne!(reward.txid(), median.txid());
    }

    #[test]
    fn merkle_root_follows_tx_set() {
        let mut block = Block::default();
        block.txs.push(BlockTx::Reward(BlockRewardTx::default()));
        let root_one = block.build_merkle_root();

        block
            .txs
            .push(BlockTx::PriceMedian(BlockPriceMedianTx::default()));
        let root_two = block.build_merkle_root();
        assert_ne!(root_one, root_two);
    }

    #[test]
    fn signature_hash_ignores_signature() {
        let mut block = Block::default();
        block.header.height = 7;
        let before = block.signature_hash();
        block.header.signature = vec![0xAA; 64];
        assert_eq!(before, block.signature_hash());
        // The block hash, by contrast, commits to the signature.
        let signed_hash = block.hash();
        block.header.signature.clear();
        assert_ne!(signed_hash, block.hash());
    }

    #[test]
    fn serialized_size_counts_header_and_txs() {
        let mut block = Block::default();
        let header_only = block.serialized_size();
        block.txs.push(BlockTx::Reward(BlockRewardTx::default()));
        assert!(block.serialized_size() > header_only);
    }

    #[test]
    fn index_entry_links_to_parent() {
        let mut parent_block = Block::default();
        parent_block.header.height = 1;
        let parent = Arc::new(build_block_index_entry(&parent_block, None));

        let mut child_block = Block::default();
        child_block.header.height = 2;
        child_block.header.prev_hash = parent.hash;
        let child = build_block_index_entry(&child_block, Some(Arc::clone(&parent)));

        assert_eq!(child.height, 2);
        assert_eq!(child.prev.as_ref().unwrap().hash, parent.hash);
    }
}
