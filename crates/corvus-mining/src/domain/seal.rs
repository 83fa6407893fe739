//! Block sealing: reward population, nonce, merkle and the delegate
//! signature.

use crate::domain::block::{Block, BlockTx};
use crate::domain::state::CacheWrapper;
use crate::error::{MiningError, Result};
use crate::ports::outbound::{ChainStore, WalletKeystore};
use rand::Rng;
use shared_types::{Account, ChainParams};
use tracing::debug;

/// Populates and signs the candidate block's reward transaction.
///
/// Before touching the block, the same-slot guard re-reads the previous
/// block: a delegate that produced the tip less than one slot width ago may
/// not produce again (boundary equality counts as a new slot). The reward
/// transaction then receives the producer identity (and, for the multi-coin
/// form, the delegate's inflation interest), the nonce is randomized within
/// `[0, max_nonce]`, the merkle root and timestamp are finalized and the
/// wallet signs the header digest.
pub fn create_block_reward_tx(
    current_time: i64,
    delegate: &Account,
    cw: &CacheWrapper,
    block: &mut Block,
    chain: &dyn ChainStore,
    wallet: &dyn WalletKeystore,
    params: &ChainParams,
) -> Result<()> {
    let genesis_successor =
        block.header.height == 1 && block.header.prev_hash == params.genesis_hash;
    if !genesis_successor {
        let previous = chain.read_block(&block.header.prev_hash).ok_or_else(|| {
            MiningError::Chain(format!(
                "read block info fail from disk, hash={}",
                hex::encode(block.header.prev_hash)
            ))
        })?;
        let previous_uid = previous
            .reward_tx()
            .map(|tx| tx.tx_uid())
            .ok_or_else(|| MiningError::Chain("previous block lacks a reward tx".into()))?;
        let previous_delegate = cw.accounts.get(&previous_uid).ok_or_else(|| {
            MiningError::Chain(format!(
                "get preblock delegate account info error, regid={previous_uid}"
            ))
        })?;
        if current_time - previous.header.time < params.block_interval_s
            && previous_delegate.reg_id == delegate.reg_id
        {
            return Err(MiningError::SlotConflict(delegate.reg_id));
        }
    }

    let height = block.header.height;
    match block.txs.first_mut() {
        Some(BlockTx::Reward(tx)) => {
            tx.tx_uid = delegate.reg_id;
            tx.valid_height = height;
        }
        Some(BlockTx::MultiCoinReward(tx)) => {
            tx.tx_uid = delegate.reg_id;
            tx.valid_height = height;
            tx.profits = delegate.block_inflate_interest(height, params);
        }
        other => {
            return Err(MiningError::BlockCreation(format!(
                "slot 0 holds {other:?}, expected a reward tx"
            )))
        }
    }

    block.header.nonce = rand::thread_rng().gen_range(0..=params.max_nonce);
    block.header.merkle_root = block.build_merkle_root();
    block.header.time = current_time;

    let digest = block.signature_hash();
    let use_miner_key = delegate.miner_pub_key.is_some();
    let signature = wallet.sign(&delegate.key_id, &digest, use_miner_key)?;
    block.header.signature = signature;

    debug!(
        "[miner] sealed block height={} nonce={} miner={}",
        block.header.height, block.header.nonce, delegate.reg_id
    );
    Ok(())
}
