//! In-memory reference adapters, used by the test suites and the regtest
//! harness.

use crate::config::MinerConfig;
use crate::domain::block::{
    build_block_index_entry, fuel_for, Block, BlockIndexEntry, ExecTrace, ExecutableTx,
};
use crate::domain::priority::MempoolEntry;
use crate::domain::state::CacheWrapper;
use crate::domain::verify::verify_delegate_block;
use crate::error::{MiningError, Result, TxReject};
use crate::ports::outbound::{ChainStore, MempoolView, NetworkInfo, WalletKeystore};
use crate::INIT_FUEL_RATES;
use parking_lot::RwLock;
use serde::Serialize;
use shared_crypto::Secp256k1KeyPair;
use shared_types::{ChainParams, CoinType, Hash, KeyId, RegId, Signature, TxId};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// In-memory chain store.
///
/// `process_block` behaves like the node's block connection path: the block
/// is verified (unless verification is switched off for a fixture), every
/// transaction is executed into the shared global cache and the tip
/// advances.
pub struct MemoryChain {
    params: ChainParams,
    config: MinerConfig,
    verify_blocks: bool,
    blocks: HashMap<Hash, Block>,
    index: HashMap<Hash, Arc<BlockIndexEntry>>,
    tip: Option<Arc<BlockIndexEntry>>,
    state: Arc<RwLock<CacheWrapper>>,
}

impl MemoryChain {
    /// Creates a chain holding only the genesis index entry.
    pub fn new(
        params: ChainParams,
        config: MinerConfig,
        genesis_time: i64,
        state: Arc<RwLock<CacheWrapper>>,
    ) -> Self {
        let genesis = Arc::new(BlockIndexEntry {
            height: 0,
            time: genesis_time,
            fuel: 0,
            fuel_rate: INIT_FUEL_RATES,
            hash: params.genesis_hash,
            prev: None,
        });
        let mut index = HashMap::new();
        index.insert(genesis.hash, Arc::clone(&genesis));
        Self {
            params,
            config,
            verify_blocks: true,
            blocks: HashMap::new(),
            index,
            tip: Some(genesis),
            state,
        }
    }

    /// Switches incoming-block verification on or off (fixtures only).
    pub fn with_verification(mut self, on: bool) -> Self {
        self.verify_blocks = on;
        self
    }

    /// The global state cache this chain connects blocks into.
    pub fn state(&self) -> &Arc<RwLock<CacheWrapper>> {
        &self.state
    }
}

impl ChainStore for MemoryChain {
    fn tip(&self) -> Option<Arc<BlockIndexEntry>> {
        self.tip.clone()
    }

    fn height(&self) -> u32 {
        self.tip.as_ref().map(|t| t.height).unwrap_or(0)
    }

    fn read_block(&self, hash: &Hash) -> Option<Block> {
        self.blocks.get(hash).cloned()
    }

    fn process_block(&mut self, block: Block) -> Result<()> {
        let tip = self
            .tip
            .clone()
            .ok_or_else(|| MiningError::Chain("chain has no tip".into()))?;
        if block.header.prev_hash != tip.hash {
            return Err(MiningError::Chain(format!(
                "block does not extend the tip: prev={}, tip={}",
                hex::encode(block.header.prev_hash),
                hex::encode(tip.hash)
            )));
        }

        if self.verify_blocks {
            let mut cw = self.state.read().clone();
            verify_delegate_block(&block, &mut cw, true, &*self, &self.params, &self.config)?;
        }

        // Connect: apply every transaction to the global cache and record
        // the txids as confirmed.
        {
            let mut state = self.state.write();
            let mut delta = state.fork();
            {
                let mut view = state.view(&mut delta);
                for (index, tx) in block.txs.iter().enumerate() {
                    tx.execute(block.header.height, index as u32, &mut view)
                        .map_err(|reject| {
                            MiningError::Chain(format!(
                                "connect failed, txid={}: {reject}",
                                hex::encode(tx.txid())
                            ))
                        })?;
                    view.add_confirmed_tx(tx.txid());
                }
            }
            state.commit(delta);
        }

        let entry = Arc::new(build_block_index_entry(&block, Some(tip)));
        self.index.insert(entry.hash, Arc::clone(&entry));
        self.blocks.insert(entry.hash, block);
        self.tip = Some(entry);
        Ok(())
    }
}

/// In-memory mempool with the monotonic update counter.
#[derive(Default)]
pub struct MemoryMempool {
    entries: HashMap<TxId, MempoolEntry>,
    updated: AtomicU64,
}

impl MemoryMempool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Admits a transaction with the given age-weighted priority.
    pub fn add(&mut self, tx: Arc<dyn ExecutableTx>, priority: f64) {
        let (fee_coin, fee_amount) = tx.fees();
        let entry = MempoolEntry {
            size: tx.serialized_size(),
            tx,
            fee_coin,
            fee_amount,
            priority,
        };
        self.entries.insert(entry.tx.txid(), entry);
        self.updated.fetch_add(1, Ordering::Relaxed);
    }

    /// Drops a transaction (e.g. after confirmation).
    pub fn remove(&mut self, txid: &TxId) {
        if self.entries.remove(txid).is_some() {
            self.updated.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Number of pooled transactions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl MempoolView for MemoryMempool {
    fn entries(&self) -> Vec<MempoolEntry> {
        self.entries.values().cloned().collect()
    }

    fn updated_count(&self) -> u64 {
        self.updated.load(Ordering::Relaxed)
    }
}

/// In-memory wallet over secp256k1 keypairs.
///
/// The adapter does not distinguish a separate miner key per account; the
/// miner flag marks which keys the worker may produce with.
#[derive(Default)]
pub struct MemoryWallet {
    keys: HashMap<KeyId, Secp256k1KeyPair>,
    miner_keys: HashSet<KeyId>,
}

impl MemoryWallet {
    /// Creates an empty wallet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Imports a keypair; `miner` marks it usable for block production.
    /// Returns the derived key id.
    pub fn import_key(&mut self, keypair: Secp256k1KeyPair, miner: bool) -> KeyId {
        let key_id = KeyId::from_pubkey(&keypair.public_key());
        if miner {
            self.miner_keys.insert(key_id);
        }
        self.keys.insert(key_id, keypair);
        key_id
    }

    /// Signs without the key-selection policy; fixture helper.
    ///
    /// # Panics
    ///
    /// Panics when the wallet does not hold `key_id`.
    pub fn sign_raw(&self, key_id: &KeyId, msg: &[u8]) -> Signature {
        self.keys.get(key_id).expect("wallet holds key").sign(msg)
    }
}

impl WalletKeystore for MemoryWallet {
    fn miner_key_ids(&self) -> HashSet<KeyId> {
        self.miner_keys.clone()
    }

    fn has_key(&self, key_id: &KeyId, miner_only: bool) -> bool {
        if miner_only && !self.miner_keys.contains(key_id) {
            return false;
        }
        self.keys.contains_key(key_id)
    }

    fn sign(&self, key_id: &KeyId, msg: &[u8], _use_miner_key: bool) -> Result<Signature> {
        let keypair = self
            .keys
            .get(key_id)
            .ok_or_else(|| MiningError::Wallet(format!("no key for {key_id}")))?;
        Ok(keypair.sign(msg))
    }
}

/// Fixed network view with an adjustable peer count.
pub struct StaticNetwork {
    peers: AtomicUsize,
}

impl StaticNetwork {
    /// Creates a view reporting `peers` connected peers.
    pub fn new(peers: usize) -> Self {
        Self {
            peers: AtomicUsize::new(peers),
        }
    }

    /// Adjusts the reported peer count.
    pub fn set_peers(&self, peers: usize) {
        self.peers.store(peers, Ordering::Relaxed);
    }
}

impl NetworkInfo for StaticNetwork {
    fn peer_count(&self) -> usize {
        self.peers.load(Ordering::Relaxed)
    }

    fn adjusted_time(&self) -> i64 {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }
}

/// Fixed execution cost of a plain transfer.
pub const TRANSFER_RUN_STEP: u64 = 100;

/// A minimal balance transfer, the reference [`ExecutableTx`].
#[derive(Clone, Debug, Serialize)]
pub struct PlainTransferTx {
    /// Serialization version.
    pub version: u32,
    /// Paying account.
    pub from: RegId,
    /// Receiving account.
    pub to: RegId,
    /// Transferred coin domain (also the fee domain).
    pub coin: CoinType,
    /// Transferred amount.
    pub amount: u64,
    /// Declared fee.
    pub fee: u64,
    /// Height the transfer was authored against.
    pub valid_height: u32,
}

impl PlainTransferTx {
    /// Creates a transfer.
    pub fn new(from: RegId, to: RegId, coin: CoinType, amount: u64, fee: u64, valid_height: u32) -> Self {
        Self {
            version: crate::domain::block::TX_VERSION1,
            from,
            to,
            coin,
            amount,
            fee,
            valid_height,
        }
    }
}

impl ExecutableTx for PlainTransferTx {
    fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("transfer serialization")
    }

    fn fees(&self) -> (CoinType, u64) {
        (self.coin, self.fee)
    }

    fn fuel(&self, fuel_rate: u64) -> u64 {
        fuel_for(TRANSFER_RUN_STEP, fuel_rate)
    }

    fn execute(
        &self,
        _height: u32,
        _index: u32,
        view: &mut crate::domain::state::CacheView<'_>,
    ) -> std::result::Result<ExecTrace, TxReject> {
        let mut payer = view.get_account(&self.from).ok_or_else(|| {
            TxReject::new(TxReject::INVALID, format!("unknown account {}", self.from))
        })?;
        let debit = self.amount + self.fee;
        if !payer.sub_balance(self.coin, debit) {
            return Err(TxReject::new(
                TxReject::INSUFFICIENT_FUNDS,
                format!("account {} lacks {} {}", self.from, debit, self.coin),
            ));
        }
        let mut payee = view.get_account(&self.to).ok_or_else(|| {
            TxReject::new(TxReject::INVALID, format!("unknown account {}", self.to))
        })?;
        payee.add_balance(self.coin, self.amount);
        view.set_account(payer);
        view.set_account(payee);
        Ok(ExecTrace {
            run_step: TRANSFER_RUN_STEP,
        })
    }
}
