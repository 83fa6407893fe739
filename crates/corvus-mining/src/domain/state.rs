//! # Speculative State Cache
//!
//! The forkable cache stack the assembler and verifier execute against.
//!
//! ## Problem
//!
//! Transaction packing is trial-and-error: a candidate joins the block only
//! if it executes cleanly on top of everything accepted so far, and a failed
//! candidate must leave no trace.
//!
//! ## Solution: explicit layer stack
//!
//! [`CacheWrapper`] owns the full state of one mining attempt. A candidate
//! executes through a [`CacheView`] that reads through to the wrapper and
//! writes into a private [`CacheDelta`]; [`CacheWrapper::commit`] rebases an
//! accepted delta onto the parent atomically, and a rejected delta is simply
//! dropped.

use shared_types::{Account, CoinPricePair, CoinType, RegId, TxId};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Sub-cache of on-chain accounts, keyed by registration id.
#[derive(Clone, Debug, Default)]
pub struct AccountCache {
    accounts: HashMap<RegId, Account>,
}

impl AccountCache {
    /// Looks up an account.
    pub fn get(&self, reg_id: &RegId) -> Option<Account> {
        self.accounts.get(reg_id).cloned()
    }

    /// Inserts or replaces an account.
    pub fn set(&mut self, account: Account) {
        self.accounts.insert(account.reg_id, account);
    }

    /// Number of cached accounts.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// True when no accounts are cached.
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

/// Sub-cache of delegate vote tallies with a memoized ranking.
#[derive(Clone, Debug, Default)]
pub struct DelegateCache {
    votes: BTreeMap<RegId, u64>,
    ranking: Option<Vec<RegId>>,
}

impl DelegateCache {
    /// Records a candidate's received votes.
    pub fn set_votes(&mut self, reg_id: RegId, votes: u64) {
        self.votes.insert(reg_id, votes);
        self.ranking = None;
    }

    /// Received votes of a candidate.
    pub fn votes(&self, reg_id: &RegId) -> u64 {
        self.votes.get(reg_id).copied().unwrap_or(0)
    }

    /// The top `n` delegates by received votes, descending, ties broken by
    /// ascending registration id. The ranking is memoized until the next
    /// vote update or [`Self::clear_cache`].
    pub fn top_delegates(&mut self, n: usize) -> Vec<RegId> {
        if self.ranking.is_none() {
            let mut ordered: Vec<(RegId, u64)> =
                self.votes.iter().map(|(id, v)| (*id, *v)).collect();
            ordered.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
            self.ranking = Some(ordered.into_iter().map(|(id, _)| id).collect());
        }
        let ranking = self.ranking.as_ref().expect("memoized above");
        ranking.iter().take(n).copied().collect()
    }

    /// Drops the memoized ranking so the next lookup re-reads fresh votes.
    pub fn clear_cache(&mut self) {
        self.ranking = None;
    }
}

/// Sub-cache of confirmed transaction ids (double-inclusion guard).
#[derive(Clone, Debug, Default)]
pub struct TxConfirmCache {
    confirmed: HashSet<TxId>,
}

impl TxConfirmCache {
    /// True if the transaction is already confirmed in a block.
    pub fn have_tx(&self, txid: &TxId) -> bool {
        self.confirmed.contains(txid)
    }

    /// Marks a transaction as confirmed.
    pub fn add(&mut self, txid: TxId) {
        self.confirmed.insert(txid);
    }
}

/// Sub-cache of oracle median price points, per height.
///
/// Prices are fed by the oracle pipeline outside this core; the mining side
/// only reads. A lookup resolves to the latest feed at or below the height.
#[derive(Clone, Debug, Default)]
pub struct PricePointCache {
    bcoin: BTreeMap<u32, u64>,
    fcoin: BTreeMap<u32, u64>,
}

impl PricePointCache {
    /// Feeds the base coin median price effective from `height`.
    pub fn feed_bcoin_median_price(&mut self, height: u32, price: u64) {
        self.bcoin.insert(height, price);
    }

    /// Feeds the fund coin median price effective from `height`.
    pub fn feed_fcoin_median_price(&mut self, height: u32, price: u64) {
        self.fcoin.insert(height, price);
    }

    /// Base coin median price at `height` (0 when never fed).
    pub fn bcoin_median_price(&self, height: u32) -> u64 {
        latest_at(&self.bcoin, height)
    }

    /// Fund coin median price at `height` (0 when never fed).
    pub fn fcoin_median_price(&self, height: u32) -> u64 {
        latest_at(&self.fcoin, height)
    }

    /// The full median snapshot attached to post-fork blocks.
    pub fn block_median_price_points(&self, height: u32) -> BTreeMap<CoinPricePair, u64> {
        let mut points = BTreeMap::new();
        points.insert(
            CoinPricePair::new(CoinType::Base, CoinType::Stable),
            self.bcoin_median_price(height),
        );
        points.insert(
            CoinPricePair::new(CoinType::Fund, CoinType::Stable),
            self.fcoin_median_price(height),
        );
        points
    }
}

fn latest_at(feed: &BTreeMap<u32, u64>, height: u32) -> u64 {
    feed.range(..=height).next_back().map(|(_, p)| *p).unwrap_or(0)
}

/// One recorded execution failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecFailure {
    /// Height the execution was attempted at.
    pub height: u32,
    /// Offending transaction.
    pub txid: TxId,
    /// Reject code.
    pub code: u32,
    /// Reject reason.
    pub reason: String,
}

/// Execution-failure sink, enabled by the `log_failures` tunable.
#[derive(Clone, Debug, Default)]
pub struct ExecFailLog {
    failures: Vec<ExecFailure>,
}

impl ExecFailLog {
    /// Records one execution failure.
    pub fn set_execute_fail(&mut self, height: u32, txid: TxId, code: u32, reason: String) {
        self.failures.push(ExecFailure {
            height,
            txid,
            code,
            reason,
        });
    }

    /// All recorded failures, oldest first.
    pub fn failures(&self) -> &[ExecFailure] {
        &self.failures
    }
}

/// The full state of one mining or verification attempt.
#[derive(Clone, Debug, Default)]
pub struct CacheWrapper {
    /// Account state.
    pub accounts: AccountCache,
    /// Delegate vote tallies and ranking.
    pub delegates: DelegateCache,
    /// Confirmed transaction ids.
    pub txs: TxConfirmCache,
    /// Oracle median price points.
    pub prices: PricePointCache,
    /// Execution-failure sink.
    pub exec_log: ExecFailLog,
}

impl CacheWrapper {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forks an empty overlay on top of this cache.
    pub fn fork(&self) -> CacheDelta {
        CacheDelta::default()
    }

    /// Opens a read-through view pairing this cache with an overlay.
    pub fn view<'a>(&'a self, delta: &'a mut CacheDelta) -> CacheView<'a> {
        CacheView { base: self, delta }
    }

    /// Rebases an accepted overlay onto this cache.
    ///
    /// The confirmed-tx set is carried over as written; account and vote
    /// writes replace the parent entries. A vote write invalidates the
    /// memoized delegate ranking.
    pub fn commit(&mut self, delta: CacheDelta) {
        for account in delta.accounts.into_values() {
            self.accounts.set(account);
        }
        for (reg_id, votes) in delta.votes {
            self.delegates.set_votes(reg_id, votes);
        }
        for txid in delta.confirmed_txs {
            self.txs.add(txid);
        }
        for failure in delta.exec_failures {
            self.exec_log
                .set_execute_fail(failure.height, failure.txid, failure.code, failure.reason);
        }
    }
}

/// Uncommitted writes of one speculative execution.
#[derive(Clone, Debug, Default)]
pub struct CacheDelta {
    accounts: HashMap<RegId, Account>,
    votes: HashMap<RegId, u64>,
    confirmed_txs: HashSet<TxId>,
    exec_failures: Vec<ExecFailure>,
}

impl CacheDelta {
    /// True when the delta holds no writes.
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
            && self.votes.is_empty()
            && self.confirmed_txs.is_empty()
            && self.exec_failures.is_empty()
    }
}

/// Read-through view: reads fall back from the delta to the base cache,
/// writes land in the delta only.
pub struct CacheView<'a> {
    base: &'a CacheWrapper,
    delta: &'a mut CacheDelta,
}

impl CacheView<'_> {
    /// Looks up an account (delta first, then base).
    pub fn get_account(&self, reg_id: &RegId) -> Option<Account> {
        self.delta
            .accounts
            .get(reg_id)
            .cloned()
            .or_else(|| self.base.accounts.get(reg_id))
    }

    /// Writes an account into the overlay.
    pub fn set_account(&mut self, account: Account) {
        self.delta.accounts.insert(account.reg_id, account);
    }

    /// Received votes of a delegate candidate (delta first, then base).
    pub fn delegate_votes(&self, reg_id: &RegId) -> u64 {
        self.delta
            .votes
            .get(reg_id)
            .copied()
            .unwrap_or_else(|| self.base.delegates.votes(reg_id))
    }

    /// Writes a vote tally into the overlay.
    pub fn set_delegate_votes(&mut self, reg_id: RegId, votes: u64) {
        self.delta.votes.insert(reg_id, votes);
    }

    /// True if the transaction is confirmed in the base cache or marked in
    /// the overlay.
    pub fn have_tx(&self, txid: &TxId) -> bool {
        self.delta.confirmed_txs.contains(txid) || self.base.txs.have_tx(txid)
    }

    /// Marks a transaction as confirmed in the overlay.
    pub fn add_confirmed_tx(&mut self, txid: TxId) {
        self.delta.confirmed_txs.insert(txid);
    }

    /// Base coin median price at `height`.
    pub fn bcoin_median_price(&self, height: u32) -> u64 {
        self.base.prices.bcoin_median_price(height)
    }

    /// Fund coin median price at `height`.
    pub fn fcoin_median_price(&self, height: u32) -> u64 {
        self.base.prices.fcoin_median_price(height)
    }

    /// The full median snapshot at `height`.
    pub fn block_median_price_points(&self, height: u32) -> BTreeMap<CoinPricePair, u64> {
        self.base.prices.block_median_price_points(height)
    }

    /// Records an execution failure in the overlay.
    pub fn set_execute_fail(&mut self, height: u32, txid: TxId, code: u32, reason: String) {
        self.delta.exec_failures.push(ExecFailure {
            height,
            txid,
            code,
            reason,
        });
    }
}
