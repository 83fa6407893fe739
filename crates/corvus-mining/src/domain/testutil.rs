//! Shared fixtures for domain tests.

use crate::domain::block::{fuel_for, BlockIndexEntry, ExecTrace, ExecutableTx};
use crate::domain::priority::MempoolEntry;
use crate::domain::state::CacheView;
use crate::error::TxReject;
use crate::INIT_FUEL_RATES;
use shared_types::{CoinType, RegId};
use std::sync::Arc;

/// A scriptable user transaction: fixed cost, optional rejection, optional
/// balance debit, adjustable size.
#[derive(Debug, Clone)]
pub struct StubTx {
    note: u8,
    priority: f64,
    fee_coin: CoinType,
    fee_amount: u64,
    run_step: u64,
    padding: usize,
    reject: Option<TxReject>,
    debit: Option<(RegId, CoinType, u64)>,
}

impl StubTx {
    /// A stub identified (and made content-unique) by `note`.
    pub fn new(note: u8) -> Self {
        Self {
            note,
            priority: 1.0,
            fee_coin: CoinType::Stable,
            fee_amount: 1_000,
            run_step: 1_000,
            padding: 0,
            reject: None,
            debit: None,
        }
    }

    /// Sets the mempool priority score.
    pub fn priority(mut self, priority: f64) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the declared fee.
    pub fn fee(mut self, coin: CoinType, amount: u64) -> Self {
        self.fee_coin = coin;
        self.fee_amount = amount;
        self
    }

    /// Sets the execution cost.
    pub fn run_step(mut self, run_step: u64) -> Self {
        self.run_step = run_step;
        self
    }

    /// Pads the serialized form by `padding` bytes.
    pub fn padding(mut self, padding: usize) -> Self {
        self.padding = padding;
        self
    }

    /// Makes execution fail with the given rejection.
    pub fn reject(mut self, reject: TxReject) -> Self {
        self.reject = Some(reject);
        self
    }

    /// Makes execution debit an account balance.
    pub fn debit(mut self, from: RegId, coin: CoinType, amount: u64) -> Self {
        self.debit = Some((from, coin, amount));
        self
    }
}

impl ExecutableTx for StubTx {
    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![self.note];
        bytes.extend(std::iter::repeat(0xEE).take(self.padding));
        bytes
    }

    fn fees(&self) -> (CoinType, u64) {
        (self.fee_coin, self.fee_amount)
    }

    fn fuel(&self, fuel_rate: u64) -> u64 {
        fuel_for(self.run_step, fuel_rate)
    }

    fn execute(
        &self,
        _height: u32,
        _index: u32,
        view: &mut CacheView<'_>,
    ) -> Result<ExecTrace, TxReject> {
        if let Some(reject) = &self.reject {
            return Err(reject.clone());
        }
        if let Some((from, coin, amount)) = self.debit {
            let mut account = view
                .get_account(&from)
                .ok_or_else(|| TxReject::new(TxReject::INVALID, format!("unknown account {from}")))?;
            if !account.sub_balance(coin, amount) {
                return Err(TxReject::new(
                    TxReject::INSUFFICIENT_FUNDS,
                    format!("account {from} lacks {amount} {coin}"),
                ));
            }
            view.set_account(account);
        }
        Ok(ExecTrace {
            run_step: self.run_step,
        })
    }
}

/// Wraps a stub into a mempool entry snapshot.
pub fn stub_entry(stub: StubTx) -> MempoolEntry {
    let priority = stub.priority;
    let fee_coin = stub.fee_coin;
    let fee_amount = stub.fee_amount;
    let tx = Arc::new(stub);
    MempoolEntry {
        size: tx.serialized_size(),
        tx,
        fee_coin,
        fee_amount,
        priority,
    }
}

/// A standalone tip index entry at the given height and time.
pub fn tip_entry(height: u32, time: i64) -> Arc<BlockIndexEntry> {
    Arc::new(BlockIndexEntry {
        height,
        time,
        fuel: 0,
        fuel_rate: INIT_FUEL_RATES,
        hash: [0x22; 32],
        prev: None,
    })
}
