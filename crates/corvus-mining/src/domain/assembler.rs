//! Block assembly: priority-driven packing under size and step budgets.

use crate::config::MinerConfig;
use crate::domain::block::{
    fuel_for, Block, BlockIndexEntry, BlockPriceMedianTx, BlockRewardTx, BlockTx,
    FundCoinGenesisTx, MultiCoinRewardTx,
};
use crate::domain::fuel::fuel_rate_for_next_block;
use crate::domain::priority::{collect_tx_priorities, MempoolEntry, PriorityMode};
use crate::domain::state::CacheWrapper;
use crate::error::Result;
use crate::MAX_BLOCK_RUN_STEP;
use shared_types::ChainParams;
use std::sync::Arc;
use tracing::{debug, info, trace};

/// A freshly assembled (not yet sealed) block with its running totals.
#[derive(Clone, Debug)]
pub struct AssembledBlock {
    /// The candidate block.
    pub block: Block,
    /// Number of user transactions packed.
    pub tx_count: u64,
    /// Serialized size, header and placeholders included.
    pub block_size: u64,
    /// Sum of declared fee amounts over packed transactions.
    pub total_fees: u64,
    /// Sum of fuel over packed transactions.
    pub total_fuel: u64,
    /// Sum of run steps over packed transactions.
    pub total_run_step: u64,
}

/// Packs mempool candidates into a candidate block on top of the tip.
#[derive(Clone, Copy, Debug)]
pub struct BlockAssembler<'a> {
    params: &'a ChainParams,
    config: &'a MinerConfig,
}

impl<'a> BlockAssembler<'a> {
    /// Creates an assembler over the given network and miner configuration.
    pub fn new(params: &'a ChainParams, config: &'a MinerConfig) -> Self {
        Self { params, config }
    }

    /// Assembles a new candidate block.
    ///
    /// Candidates pop off the priority heap (priority-first order) and join
    /// the block only if they fit the size budget, execute cleanly against
    /// the speculative cache and fit the run-step budget. Accepted writes
    /// commit back into `cw` so later candidates observe them; skipped
    /// candidates are never retried within the same block.
    pub fn create_new_block(
        &self,
        cw: &mut CacheWrapper,
        tip: &BlockIndexEntry,
        entries: &[MempoolEntry],
        adjusted_now: i64,
    ) -> Result<AssembledBlock> {
        let height = tip.height + 1;
        let post_fork = height >= self.params.stablecoin_genesis_height;
        let fuel_rate = fuel_rate_for_next_block(Some(tip), self.config.burn_block_window);

        let mut block = Block::default();
        block.header.version = 1;

        // Reward placeholders; populated by the sealing step.
        if post_fork {
            block.txs.push(BlockTx::MultiCoinReward(MultiCoinRewardTx {
                valid_height: height,
                ..Default::default()
            }));
            block.txs.push(BlockTx::PriceMedian(BlockPriceMedianTx {
                valid_height: height,
                median_price_points: cw.prices.block_median_price_points(height),
                ..Default::default()
            }));
        } else {
            block.txs.push(BlockTx::Reward(BlockRewardTx {
                valid_height: height,
                ..Default::default()
            }));
            if self.config.legacy_double_reward {
                // Historical chains carried a second (empty) reward
                // placeholder before the stablecoin fork.
                block.txs.push(BlockTx::Reward(BlockRewardTx {
                    valid_height: height,
                    ..Default::default()
                }));
            }
        }

        let block_max_size = self.config.effective_block_max_size();
        let block_min_size = self.config.effective_block_min_size();

        let mut running_size = block.serialized_size();
        let mut tx_count = 0u64;
        let mut total_run_step = 0u64;
        let mut total_fuel = 0u64;
        // Fee revenue accumulates as candidates are accepted; the reward
        // value below depends on it.
        let mut total_fees = 0u64;

        let mut heap =
            collect_tx_priorities(entries, cw, height, fuel_rate, PriorityMode::ByPriority);
        debug!(
            "[miner] create_new_block: got {} transaction(s) sorted by priority rules",
            heap.len()
        );

        while let Some(scored) = heap.pop() {
            let tx = &scored.entry.tx;
            let txid = hex::encode(tx.txid());
            let tx_size = tx.serialized_size();

            // Size limits.
            if running_size + tx_size >= block_max_size {
                debug!("[miner] create_new_block: exceed max block size, txid: {txid}");
                continue;
            }

            // Skip low-fee transactions once the accumulated size has
            // passed the minimum block size.
            if scored.fee_per_kb < self.config.min_relay_fee_per_kb
                && running_size + tx_size >= block_min_size
            {
                debug!("[miner] create_new_block: skip free transaction, txid: {txid}");
                continue;
            }

            let mut delta = cw.fork();
            let executed = {
                let mut view = cw.view(&mut delta);
                tx.execute(height, (tx_count + 1) as u32, &mut view)
            };
            let executed = match executed {
                Ok(trace) => trace,
                Err(reject) => {
                    debug!("[miner] create_new_block: failed to execute transaction, txid: {txid}");
                    if self.config.log_failures {
                        cw.exec_log
                            .set_execute_fail(height, tx.txid(), reject.code, reject.reason);
                    }
                    continue;
                }
            };

            // Run step limits.
            if total_run_step + executed.run_step >= MAX_BLOCK_RUN_STEP {
                debug!("[miner] create_new_block: exceed max block run steps, txid: {txid}");
                continue;
            }

            // Accepted: later candidates must see this transaction's writes.
            cw.commit(delta);

            let tx_fuel = fuel_for(executed.run_step, fuel_rate);
            total_fees += scored.entry.fee_amount;
            running_size += tx_size;
            total_run_step += executed.run_step;
            total_fuel += tx_fuel;
            tx_count += 1;
            block.txs.push(BlockTx::User(Arc::clone(tx)));

            trace!(
                target: "fuel",
                "miner total fuel:{total_fuel}, tx fuel:{tx_fuel} runStep:{} fuelRate:{fuel_rate} txid:{txid}",
                executed.run_step
            );
        }

        let reward_value = total_fees.saturating_sub(total_fuel);
        match &mut block.txs[0] {
            BlockTx::Reward(tx) => tx.reward_value = reward_value,
            BlockTx::MultiCoinReward(tx) => tx.reward_value = reward_value,
            _ => unreachable!("slot 0 is always a reward placeholder"),
        }

        block.header.prev_hash = tip.hash;
        block.header.nonce = 0;
        block.header.height = height;
        block.header.fuel = total_fuel;
        block.header.fuel_rate = fuel_rate;
        block.header.time = (tip.time + 1).max(adjusted_now);
        block.header.merkle_root = block.build_merkle_root();

        info!("[miner] create_new_block: total size {running_size}");

        Ok(AssembledBlock {
            block,
            tx_count,
            block_size: running_size,
            total_fees,
            total_fuel,
            total_run_step,
        })
    }

    /// Assembles the fund coin genesis block produced at the stablecoin
    /// fork height: a reward placeholder plus the per-network fund coin
    /// allocation, no user transactions, zero fuel.
    pub fn create_stablecoin_genesis_block(
        &self,
        tip: &BlockIndexEntry,
        adjusted_now: i64,
    ) -> Result<AssembledBlock> {
        let height = tip.height + 1;
        let fuel_rate = fuel_rate_for_next_block(Some(tip), self.config.burn_block_window);

        let mut block = Block::default();
        block.header.version = 1;
        block.txs.push(BlockTx::Reward(BlockRewardTx {
            valid_height: height,
            ..Default::default()
        }));
        for (to_uid, amount) in self.params.fund_coin_genesis_outputs() {
            block
                .txs
                .push(BlockTx::FundCoinGenesis(FundCoinGenesisTx::new(
                    to_uid, amount, height,
                )));
        }

        block.header.prev_hash = tip.hash;
        block.header.nonce = 0;
        block.header.height = height;
        block.header.fuel = 0;
        block.header.fuel_rate = fuel_rate;
        block.header.time = (tip.time + 1).max(adjusted_now);
        block.header.merkle_root = block.build_merkle_root();

        let block_size = block.serialized_size();
        Ok(AssembledBlock {
            block,
            tx_count: 0,
            block_size,
            total_fees: 0,
            total_fuel: 0,
            total_run_step: 0,
        })
    }
}
