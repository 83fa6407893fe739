//! Transaction scoring and priority ordering.
//!
//! Every selectable mempool candidate gets two scores: the age-weighted
//! `priority` supplied by the mempool, and a fee rate normalized through the
//! oracle median price of the fee coin. A max-heap orders candidates by one
//! of two comparator modes; assembly pops in priority-first order.

use crate::domain::block::ExecutableTx;
use crate::domain::state::CacheWrapper;
use crate::PERCENT_BOOST;
use shared_types::CoinType;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

/// Mempool entry snapshot handed to the selector.
#[derive(Clone, Debug)]
pub struct MempoolEntry {
    /// The transaction itself.
    pub tx: Arc<dyn ExecutableTx>,
    /// Serialized size in bytes.
    pub size: u64,
    /// Declared fee coin.
    pub fee_coin: CoinType,
    /// Declared fee amount.
    pub fee_amount: u64,
    /// Age-weighted input-value priority, computed by the mempool.
    pub priority: f64,
}

/// Comparator mode of the priority heap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PriorityMode {
    /// Priority descending, fee rate as tiebreak (assembly order).
    ByPriority,
    /// Fee rate descending, priority as tiebreak.
    ByFee,
}

/// A scored candidate, ordered per its embedded comparator mode.
#[derive(Clone, Debug)]
pub struct TxPriority {
    /// Age-weighted priority.
    pub priority: f64,
    /// Median-price-normalized fee per kilobyte.
    pub fee_per_kb: f64,
    /// The scored entry.
    pub entry: MempoolEntry,
    mode: PriorityMode,
}

impl TxPriority {
    /// Creates a scored candidate for the given comparator mode.
    pub fn new(priority: f64, fee_per_kb: f64, entry: MempoolEntry, mode: PriorityMode) -> Self {
        Self {
            priority,
            fee_per_kb,
            entry,
            mode,
        }
    }
}

impl PartialEq for TxPriority {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TxPriority {}

impl PartialOrd for TxPriority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TxPriority {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.mode {
            PriorityMode::ByPriority => self
                .priority
                .total_cmp(&other.priority)
                .then(self.fee_per_kb.total_cmp(&other.fee_per_kb)),
            PriorityMode::ByFee => self
                .fee_per_kb
                .total_cmp(&other.fee_per_kb)
                .then(self.priority.total_cmp(&other.priority)),
        }
    }
}

/// Oracle median price of a fee coin at `height`, in stable coin units.
///
/// The stable coin always values at 1 against itself.
fn median_price(coin: CoinType, cw: &CacheWrapper, height: u32) -> u64 {
    match coin {
        CoinType::Base => cw.prices.bcoin_median_price(height),
        CoinType::Fund => cw.prices.fcoin_median_price(height),
        CoinType::Stable => 1,
    }
}

/// Scores the selectable mempool entries and heap-orders them.
///
/// Coinbase transactions and transactions already confirmed on chain are
/// excluded. The fee score discounts the fuel the transaction would burn at
/// the given rate:
///
/// `fee_per_kb = median_price(coin) / PERCENT_BOOST * (fee - fuel) / size / 1000`
pub fn collect_tx_priorities(
    entries: &[MempoolEntry],
    cw: &CacheWrapper,
    height: u32,
    fuel_rate: u64,
    mode: PriorityMode,
) -> BinaryHeap<TxPriority> {
    let mut heap = BinaryHeap::with_capacity(entries.len());
    for entry in entries {
        if entry.tx.is_coinbase() || cw.txs.have_tx(&entry.tx.txid()) {
            continue;
        }
        // The fuel already priced into execution is not fee revenue.
        let fuel = entry.tx.fuel(fuel_rate);
        let fee_per_kb = median_price(entry.fee_coin, cw, height) as f64 / PERCENT_BOOST as f64
            * (entry.fee_amount as f64 - fuel as f64)
            / entry.size as f64
            / 1000.0;
        heap.push(TxPriority::new(
            entry.priority,
            fee_per_kb,
            entry.clone(),
            mode,
        ));
    }
    heap
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::block::{fuel_for, ExecTrace};
    use crate::domain::state::CacheView;
    use crate::error::TxReject;

    #[derive(Debug)]
    struct NoteTx {
        note: Vec<u8>,
        coinbase: bool,
    }

    impl ExecutableTx for NoteTx {
        fn to_bytes(&self) -> Vec<u8> {
            self.note.clone()
        }

        fn fees(&self) -> (CoinType, u64) {
            (CoinType::Stable, 10_000)
        }

        fn fuel(&self, fuel_rate: u64) -> u64 {
            fuel_for(10, fuel_rate)
        }

        fn is_coinbase(&self) -> bool {
            self.coinbase
        }

        fn execute(
            &self,
            _height: u32,
            _index: u32,
            _view: &mut CacheView<'_>,
        ) -> Result<ExecTrace, TxReject> {
            Ok(ExecTrace { run_step: 1 })
        }
    }

    fn entry(note: u8, priority: f64, fee_amount: u64) -> MempoolEntry {
        let tx = Arc::new(NoteTx {
            note: vec![note],
            coinbase: false,
        });
        MempoolEntry {
            size: tx.serialized_size(),
            tx,
            fee_coin: CoinType::Stable,
            fee_amount,
            priority,
        }
    }

    #[test]
    fn priority_mode_pops_highest_priority_first() {
        let cw = CacheWrapper::new();
        let entries = vec![entry(1, 100.0, 1_000), entry(2, 1.0, 1_000_000)];
        let mut heap = collect_tx_priorities(&entries, &cw, 10, 100, PriorityMode::ByPriority);
        let first = heap.pop().unwrap();
        assert_eq!(first.priority, 100.0);
    }

    #[test]
    fn fee_mode_pops_highest_fee_first() {
        let cw = CacheWrapper::new();
        let entries = vec![entry(1, 100.0, 1_000), entry(2, 1.0, 1_000_000)];
        let mut heap = collect_tx_priorities(&entries, &cw, 10, 100, PriorityMode::ByFee);
        let first = heap.pop().unwrap();
        assert_eq!(first.priority, 1.0);
    }

    #[test]
    fn ties_fall_through_to_secondary_score() {
        let cw = CacheWrapper::new();
        let entries = vec![entry(1, 50.0, 1_000), entry(2, 50.0, 900_000)];
        let mut heap = collect_tx_priorities(&entries, &cw, 10, 100, PriorityMode::ByPriority);
        let first = heap.pop().unwrap();
        assert_eq!(first.entry.fee_amount, 900_000);
    }

    #[test]
    fn coinbase_and_confirmed_txs_are_excluded() {
        let mut cw = CacheWrapper::new();
        let coinbase = MempoolEntry {
            tx: Arc::new(NoteTx {
                note: vec![9],
                coinbase: true,
            }),
            size: 1,
            fee_coin: CoinType::Stable,
            fee_amount: 0,
            priority: 1.0,
        };
        let confirmed = entry(3, 1.0, 1_000);
        cw.txs.add(confirmed.tx.txid());
        let fresh = entry(4, 1.0, 1_000);

        let heap = collect_tx_priorities(
            &[coinbase, confirmed, fresh],
            &cw,
            10,
            100,
            PriorityMode::ByPriority,
        );
        assert_eq!(heap.len(), 1);
    }

    #[test]
    fn unpriced_fee_coin_scores_zero_fee_rate() {
        // No oracle feed for the base coin: median price 0.
        let cw = CacheWrapper::new();
        let mut unpriced = entry(5, 1.0, 1_000_000);
        unpriced.fee_coin = CoinType::Base;
        let mut heap =
            collect_tx_priorities(&[unpriced], &cw, 10, 100, PriorityMode::ByFee);
        assert_eq!(heap.pop().unwrap().fee_per_kb, 0.0);
    }

    #[test]
    fn fee_rate_discounts_fuel() {
        let cw = CacheWrapper::new();
        let cheap = entry(6, 1.0, 1_000);
        let size = cheap.size;
        let fuel = cheap.tx.fuel(100);
        let mut heap = collect_tx_priorities(&[cheap], &cw, 10, 100, PriorityMode::ByFee);
        let scored = heap.pop().unwrap();
        let expected = 1.0 / PERCENT_BOOST as f64 * (1_000.0 - fuel as f64) / size as f64 / 1000.0;
        assert_eq!(scored.fee_per_kb, expected);
        assert!(fuel > 0);
    }
}
