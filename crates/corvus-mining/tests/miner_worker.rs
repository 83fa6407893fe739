//! End-to-end worker test on regtest parameters: eleven delegates, a real
//! wallet, a verifying in-memory chain and a seeded mempool.

use corvus_mining::adapters::{
    MemoryChain, MemoryMempool, MemoryWallet, PlainTransferTx, StaticNetwork,
};
use corvus_mining::domain::{CacheWrapper, ExecutableTx, MinedBlockRing};
use corvus_mining::ports::{ChainStore, MinerControl};
use corvus_mining::{Metrics, Miner, MinerConfig, MinerContext};
use parking_lot::{Mutex, RwLock};
use shared_crypto::Secp256k1KeyPair;
use shared_types::{Account, ChainParams, CoinType, RegId};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::{sleep, timeout};

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock after epoch")
        .as_secs() as i64
}

struct Node {
    params: ChainParams,
    state: Arc<RwLock<CacheWrapper>>,
    chain: Arc<RwLock<MemoryChain>>,
    mempool: Arc<Mutex<MemoryMempool>>,
    accounts: Vec<Account>,
    miner: Miner,
}

/// Builds a regtest node whose wallet holds every delegate key, so the
/// worker can produce whichever slot comes up.
fn regtest_node() -> Node {
    let params = ChainParams::regtest();
    let state = Arc::new(RwLock::new(CacheWrapper::new()));
    let mut wallet = MemoryWallet::new();
    let mut accounts = Vec::new();

    {
        let mut global = state.write();
        for i in 0..params.total_delegate_num {
            let keypair = Secp256k1KeyPair::generate();
            let mut account = Account::new(RegId::new(i + 1, 1), keypair.public_key());
            account.received_votes = 1_000_000 - i as u64;
            account.add_balance(CoinType::Stable, 10_000_000);
            global.accounts.set(account.clone());
            global
                .delegates
                .set_votes(account.reg_id, account.received_votes);
            wallet.import_key(keypair, true);
            accounts.push(account);
        }
    }

    let chain = Arc::new(RwLock::new(MemoryChain::new(
        params.clone(),
        MinerConfig::default(),
        unix_now() - 3,
        state.clone(),
    )));
    let mempool = Arc::new(Mutex::new(MemoryMempool::new()));

    let ctx = MinerContext {
        params: params.clone(),
        config: MinerConfig::default(),
        chain: chain.clone(),
        mempool: mempool.clone(),
        wallet: Arc::new(Mutex::new(wallet)),
        network: Arc::new(StaticNetwork::new(0)),
        state: state.clone(),
        mined_blocks: Arc::new(Mutex::new(MinedBlockRing::default())),
        metrics: Arc::new(Metrics::new()),
    };
    let miner = Miner::new(ctx);

    Node {
        params,
        state,
        chain,
        mempool,
        accounts,
        miner,
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn produces_verified_blocks_to_the_target_height() {
    let node = regtest_node();
    let sender = node.accounts[0].reg_id;
    let receiver = node.accounts[1].reg_id;

    let transfer = Arc::new(PlainTransferTx::new(
        sender,
        receiver,
        CoinType::Stable,
        100_000,
        500,
        1,
    ));
    node.mempool.lock().add(transfer.clone(), 10.0);

    node.miner.start_mining(2).await.unwrap();

    timeout(Duration::from_secs(30), async {
        while node.chain.read().height() < 2 {
            sleep(Duration::from_millis(100)).await;
        }
    })
    .await
    .expect("worker reaches the target height");

    // Off-mainnet the worker exits by itself at the target.
    node.miner.stop_mining().await;
    let status = node.miner.status();
    assert!(!status.active);
    assert_eq!(status.blocks_produced, 2);
    assert!(status.last_block_time.is_some());

    // Ring records are newest-first and mirror the connected blocks.
    let records = node.miner.mined_blocks(10);
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].height, 2);
    assert_eq!(records[1].height, 1);
    for record in &records {
        let block = node
            .chain
            .read()
            .read_block(&record.hash)
            .expect("produced block is stored");
        assert_eq!(block.header.fuel, record.total_fuel);
        assert_eq!(block.header.prev_hash, record.prev_hash);
        assert!(block.header.nonce <= node.params.max_nonce);
    }

    // The transfer confirmed in block 1 and moved real balances.
    assert_eq!(records[1].tx_count, 1);
    assert_eq!(records[1].total_fees, 500);
    let global = node.state.read();
    assert!(global.txs.have_tx(&transfer.txid()));
    assert_eq!(
        global
            .accounts
            .get(&receiver)
            .unwrap()
            .balance(CoinType::Stable),
        10_000_000 + 100_000
    );
    assert_eq!(
        global
            .accounts
            .get(&sender)
            .unwrap()
            .balance(CoinType::Stable),
        10_000_000 - 100_000 - 500
    );

    // Block 2 must not re-include the confirmed transfer.
    assert_eq!(records[0].tx_count, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn consecutive_blocks_never_share_a_slot_producer() {
    let node = regtest_node();
    node.miner.start_mining(3).await.unwrap();

    timeout(Duration::from_secs(30), async {
        while node.chain.read().height() < 3 {
            sleep(Duration::from_millis(100)).await;
        }
    })
    .await
    .expect("worker reaches the target height");
    node.miner.stop_mining().await;

    // Walk the produced chain: any two adjacent blocks closer than one
    // slot width must have distinct producers.
    let chain = node.chain.read();
    let mut entry = chain.tip().unwrap();
    while entry.height > 1 {
        let block = chain.read_block(&entry.hash).unwrap();
        let parent = entry.prev.clone().unwrap();
        if parent.height > 0 {
            let parent_block = chain.read_block(&parent.hash).unwrap();
            if block.header.time - parent_block.header.time
                < node.params.block_interval_s
            {
                assert_ne!(
                    block.txs[0].tx_uid(),
                    parent_block.txs[0].tx_uid(),
                    "same delegate produced twice in one slot"
                );
            }
        }
        entry = parent;
    }
}
