//! The miner worker: a single long-running, cancellable producer task.
//!
//! One worker runs per wallet. Each outer iteration snapshots the tip and
//! the mempool counter, assembles a candidate block against a fresh fork of
//! the global state and enters the inner mine loop, which sleeps to the
//! next slot boundary in 100 ms cancellable ticks, resolves the scheduled
//! delegate, and seals and submits when the wallet holds that delegate's
//! key. Tip changes, peer loss, mempool churn and a 60-second attempt cap
//! all restart the outer loop.
//!
//! Lock order is fixed: chain, then mempool, then wallet. The mined-block
//! ring has its own lock and is never held together with the others.

use crate::config::MinerConfig;
use crate::domain::assembler::{AssembledBlock, BlockAssembler};
use crate::domain::block::BlockIndexEntry;
use crate::domain::mined_blocks::{MinedBlockInfo, MinedBlockRing};
use crate::domain::seal::create_block_reward_tx;
use crate::domain::shuffle::{current_delegate, shuffle_delegates};
use crate::domain::state::CacheWrapper;
use crate::error::{MiningError, Result};
use crate::metrics::Metrics;
use crate::ports::inbound::{MinerControl, MinerStatus};
use crate::ports::outbound::{ChainStore, MempoolView, NetworkInfo, WalletKeystore};
use crate::{MINER_SLEEP_MS, MINE_ATTEMPT_TIMEOUT_S, STALE_TIP_SECS};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use shared_types::{ChainParams, Network};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, trace, warn};

/// Everything the worker needs, passed at startup. No process-wide state.
#[derive(Clone)]
pub struct MinerContext {
    /// Network constants.
    pub params: ChainParams,
    /// Miner tunables.
    pub config: MinerConfig,
    /// Chain view and submission path (the chain lock).
    pub chain: Arc<RwLock<dyn ChainStore>>,
    /// Mempool snapshot access (the mempool lock).
    pub mempool: Arc<Mutex<dyn MempoolView>>,
    /// Wallet keys and signing (the wallet lock).
    pub wallet: Arc<Mutex<dyn WalletKeystore>>,
    /// Peer count and adjusted time.
    pub network: Arc<dyn NetworkInfo>,
    /// Global state cache; each attempt works on a clone.
    pub state: Arc<RwLock<CacheWrapper>>,
    /// Ring of recently produced blocks (independent lock).
    pub mined_blocks: Arc<Mutex<MinedBlockRing>>,
    /// Metrics sink.
    pub metrics: Arc<Metrics>,
}

#[derive(Clone, Default)]
struct WorkerShared {
    active: Arc<AtomicBool>,
    cancel: Arc<AtomicBool>,
    blocks_produced: Arc<AtomicU64>,
    last_block_time: Arc<AtomicI64>,
}

/// The miner handle: spawns, cancels and observes the worker task.
pub struct Miner {
    ctx: MinerContext,
    shared: WorkerShared,
    worker: Mutex<Option<JoinHandle<Result<()>>>>,
}

impl Miner {
    /// Creates a miner over the given context. No task runs until
    /// [`MinerControl::start_mining`].
    pub fn new(ctx: MinerContext) -> Self {
        Self {
            ctx,
            shared: WorkerShared::default(),
            worker: Mutex::new(None),
        }
    }
}

#[async_trait]
impl MinerControl for Miner {
    async fn start_mining(&self, target_delta: i64) -> Result<()> {
        self.stop_mining().await;

        // Outside the main network the worker stops at a target height, so
        // the delta must actually move the chain forward.
        if self.ctx.params.network != Network::Main && target_delta <= 0 {
            error!("[miner] target height delta <= 0 ({target_delta})");
            return Err(MiningError::InvalidTargetHeight(target_delta));
        }

        self.shared.cancel.store(false, Ordering::SeqCst);
        let handle = tokio::spawn(coin_miner(
            self.ctx.clone(),
            self.shared.clone(),
            target_delta,
        ));
        *self.worker.lock() = Some(handle);
        Ok(())
    }

    async fn stop_mining(&self) {
        self.shared.cancel.store(true, Ordering::SeqCst);
        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            // The worker observes the cancel flag at every sleep tick.
            let _ = handle.await;
        }
    }

    fn status(&self) -> MinerStatus {
        let last = self.shared.last_block_time.load(Ordering::Relaxed);
        MinerStatus {
            active: self.shared.active.load(Ordering::Relaxed),
            blocks_produced: self.shared.blocks_produced.load(Ordering::Relaxed),
            last_block_time: (last != 0).then_some(last),
        }
    }

    fn mined_blocks(&self, count: usize) -> Vec<MinedBlockInfo> {
        self.ctx.mined_blocks.lock().snapshot(count)
    }
}

/// Worker entry point: miner-key precheck, then the outer loop; the active
/// flag is held for the worker's whole lifetime.
async fn coin_miner(ctx: MinerContext, shared: WorkerShared, target_delta: i64) -> Result<()> {
    let have_miner_key = !ctx.wallet.lock().miner_key_ids().is_empty();
    if !have_miner_key {
        error!("[miner] terminated for lack of miner key");
        return Err(MiningError::NoMinerKey);
    }

    shared.active.store(true, Ordering::SeqCst);
    let result = mine_loop(&ctx, &shared, target_delta).await;
    shared.active.store(false, Ordering::SeqCst);
    match &result {
        Ok(()) => info!("[miner] terminated"),
        Err(e) => error!("[miner] terminated: {e}"),
    }
    result
}

async fn mine_loop(ctx: &MinerContext, shared: &WorkerShared, target_delta: i64) -> Result<()> {
    let start_height = ctx.chain.read().height();
    let target_height = start_height as i64 + target_delta;
    info!("[miner] started at height {start_height}");

    loop {
        if shared.cancel.load(Ordering::Relaxed) {
            return Ok(());
        }

        // Outside regtest, block until the network is usable: at least one
        // peer, and a tip fresher than an hour unless forced.
        if ctx.params.network != Network::Regtest {
            loop {
                if shared.cancel.load(Ordering::Relaxed) {
                    return Ok(());
                }
                let peers = ctx.network.peer_count();
                let tip_stale = ctx
                    .chain
                    .read()
                    .tip()
                    .map(|tip| {
                        tip.height > 1
                            && ctx.network.adjusted_time() - tip.time > STALE_TIP_SECS
                    })
                    .unwrap_or(false);
                if peers > 0 && (!tip_stale || ctx.config.gen_block_force) {
                    break;
                }
                sleep(Duration::from_millis(1000)).await;
            }
        }

        // Freshness snapshot for this attempt.
        let tx_updated = ctx.mempool.lock().updated_count();
        let mut cw = ctx.state.read().clone();

        let assembly_started = Instant::now();
        let (tip, assembled) = {
            let chain = ctx.chain.write();
            let mempool = ctx.mempool.lock();
            let tip = chain
                .tip()
                .ok_or_else(|| MiningError::Chain("chain has no tip".into()))?;
            let assembler = BlockAssembler::new(&ctx.params, &ctx.config);
            let adjusted_now = ctx.network.adjusted_time();
            let assembled = if tip.height + 1 == ctx.params.stablecoin_genesis_height {
                assembler.create_stablecoin_genesis_block(&tip, adjusted_now)?
            } else {
                let entries = mempool.entries();
                assembler.create_new_block(&mut cw, &tip, &entries, adjusted_now)?
            };
            (tip, assembled)
        };
        debug!(
            "[miner] succeed to create new block, contain {} transactions, used {} ms",
            assembled.block.txs.len(),
            assembly_started.elapsed().as_millis()
        );

        // Producer resolution must re-read the received-votes ranking.
        cw.delegates.clear_cache();

        let produced = mine_block(ctx, shared, assembled, &tip, tx_updated, &mut cw).await?;
        if !produced {
            ctx.metrics.record_attempt_abandoned();
        }

        if ctx.params.network != Network::Main
            && ctx.chain.read().height() as i64 >= target_height
        {
            info!("[miner] target height {target_height} reached");
            return Ok(());
        }
    }
}

/// One mining attempt over a fixed candidate block. Returns true when the
/// block was produced and accepted; false restarts the outer loop.
async fn mine_block(
    ctx: &MinerContext,
    shared: &WorkerShared,
    mut assembled: AssembledBlock,
    tip: &Arc<BlockIndexEntry>,
    tx_updated: u64,
    cw: &mut CacheWrapper,
) -> Result<bool> {
    let attempt_started = Instant::now();
    let height = assembled.block.header.height;

    loop {
        if shared.cancel.load(Ordering::Relaxed) {
            return Ok(false);
        }
        if ctx.params.network != Network::Regtest && ctx.network.peer_count() == 0 {
            return Ok(false);
        }
        match ctx.chain.read().tip() {
            Some(current) if current.hash == tip.hash => {}
            _ => return Ok(false),
        }

        // Sleep to the slot boundary in cancellable ticks.
        let earliest = tip.time + ctx.params.block_interval_s;
        while ctx.network.adjusted_time() < earliest {
            if shared.cancel.load(Ordering::Relaxed) {
                return Ok(false);
            }
            sleep(Duration::from_millis(MINER_SLEEP_MS)).await;
        }

        let mut delegates = cw
            .delegates
            .top_delegates(ctx.params.total_delegate_num as usize);
        if delegates.len() < ctx.params.total_delegate_num as usize {
            debug!("[miner] failed to get top delegates");
            return Ok(false);
        }
        for (index, delegate) in delegates.iter().enumerate() {
            trace!(target: "shuffle", "before shuffle: index={index}, regId={delegate}");
        }
        shuffle_delegates(height, &mut delegates, &ctx.params);
        for (index, delegate) in delegates.iter().enumerate() {
            trace!(target: "shuffle", "after shuffle: index={index}, regId={delegate}");
        }

        let current_time = ctx.network.adjusted_time();
        let reg_id = current_delegate(current_time, &delegates, &ctx.params);
        let Some(miner_account) = cw.accounts.get(&reg_id) else {
            debug!("[miner] failed to get miner's account: {reg_id}");
            return Ok(false);
        };

        let mut sealed = false;
        {
            let chain = ctx.chain.read();
            let wallet = ctx.wallet.lock();
            if chain.tip().map(|t| t.height + 1) != Some(height) {
                return Ok(false);
            }
            if wallet.has_key(&miner_account.key_id, true)
                || wallet.has_key(&miner_account.key_id, false)
            {
                let sealing_started = Instant::now();
                match create_block_reward_tx(
                    current_time,
                    &miner_account,
                    cw,
                    &mut assembled.block,
                    &*chain,
                    &*wallet,
                    &ctx.params,
                ) {
                    Ok(()) => sealed = true,
                    Err(e) => debug!("[miner] failed to seal block: {e}"),
                }
                debug!(
                    "[miner] {} to create block reward transaction, used {} ms, miner regid {}",
                    if sealed { "succeed" } else { "failed" },
                    sealing_started.elapsed().as_millis(),
                    miner_account.reg_id
                );
            }
        }

        if sealed {
            match check_work(ctx, &assembled) {
                Ok(()) => {
                    let info = MinedBlockInfo::from_assembled(&assembled);
                    shared.blocks_produced.fetch_add(1, Ordering::Relaxed);
                    shared.last_block_time.store(info.time, Ordering::Relaxed);
                    ctx.metrics
                        .record_block_produced(info.tx_count, info.total_fuel, info.total_fees);
                    info!(
                        "[miner] produced block height={} hash={} txs={}",
                        info.height,
                        hex::encode(info.hash),
                        info.tx_count
                    );
                    ctx.mined_blocks.lock().push_front(info);
                    return Ok(true);
                }
                Err(e) if e.is_transient() => {
                    warn!("[miner] submit failed: {e}");
                    return Ok(false);
                }
                Err(e) => return Err(e),
            }
        }

        if ctx.mempool.lock().updated_count() != tx_updated
            || attempt_started.elapsed() > Duration::from_secs(MINE_ATTEMPT_TIMEOUT_S)
        {
            return Ok(false);
        }

        // Another delegate owns the current slot; idle one tick before
        // re-resolving.
        sleep(Duration::from_millis(MINER_SLEEP_MS)).await;
    }
}

/// Submits the sealed block, confirming under the chain lock that it still
/// extends the tip.
fn check_work(ctx: &MinerContext, assembled: &AssembledBlock) -> Result<()> {
    let mut chain = ctx.chain.write();
    let tip = chain
        .tip()
        .ok_or_else(|| MiningError::Chain("chain has no tip".into()))?;
    if assembled.block.header.prev_hash != tip.hash {
        return Err(MiningError::StaleBlock {
            prev: hex::encode(assembled.block.header.prev_hash),
            tip: hex::encode(tip.hash),
        });
    }
    chain.process_block(assembled.block.clone())
}
