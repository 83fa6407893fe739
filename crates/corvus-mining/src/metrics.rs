//! Metrics collection for the mining core.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics collector for block production and validation.
#[derive(Debug, Default)]
pub struct Metrics {
    /// Total blocks produced and accepted.
    pub blocks_produced: AtomicU64,

    /// Total user transactions included.
    pub transactions_included: AtomicU64,

    /// Total fuel burned across produced blocks.
    pub total_fuel_burned: AtomicU64,

    /// Total fees collected across produced blocks.
    pub total_fees_collected: AtomicU64,

    /// Mining attempts abandoned (tip change, mempool churn, timeout).
    pub attempts_abandoned: AtomicU64,

    /// Received blocks rejected by verification.
    pub blocks_rejected: AtomicU64,
}

impl Metrics {
    /// Create a new metrics collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a produced and accepted block.
    pub fn record_block_produced(&self, tx_count: u64, fuel: u64, fees: u64) {
        self.blocks_produced.fetch_add(1, Ordering::Relaxed);
        self.transactions_included.fetch_add(tx_count, Ordering::Relaxed);
        self.total_fuel_burned.fetch_add(fuel, Ordering::Relaxed);
        self.total_fees_collected.fetch_add(fees, Ordering::Relaxed);
    }

    /// Record an abandoned mining attempt.
    pub fn record_attempt_abandoned(&self) {
        self.attempts_abandoned.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a verification rejection.
    pub fn record_block_rejected(&self) {
        self.blocks_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Blocks produced so far.
    pub fn get_blocks_produced(&self) -> u64 {
        self.blocks_produced.load(Ordering::Relaxed)
    }

    /// Average user transactions per produced block.
    pub fn get_avg_transactions_per_block(&self) -> f64 {
        let blocks = self.blocks_produced.load(Ordering::Relaxed);
        if blocks == 0 {
            return 0.0;
        }
        let txs = self.transactions_included.load(Ordering::Relaxed);
        txs as f64 / blocks as f64
    }

    /// Average fuel per produced block.
    pub fn get_avg_fuel_per_block(&self) -> f64 {
        let blocks = self.blocks_produced.load(Ordering::Relaxed);
        if blocks == 0 {
            return 0.0;
        }
        let fuel = self.total_fuel_burned.load(Ordering::Relaxed);
        fuel as f64 / blocks as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_recording() {
        let metrics = Metrics::new();

        metrics.record_block_produced(10, 4_000, 9_000);
        metrics.record_block_produced(20, 6_000, 11_000);

        assert_eq!(metrics.get_blocks_produced(), 2);
        assert_eq!(metrics.get_avg_transactions_per_block(), 15.0);
        assert_eq!(metrics.get_avg_fuel_per_block(), 5_000.0);
        assert_eq!(metrics.total_fees_collected.load(Ordering::Relaxed), 20_000);
    }

    #[test]
    fn test_empty_metrics_average_is_zero() {
        let metrics = Metrics::new();
        assert_eq!(metrics.get_avg_transactions_per_block(), 0.0);
        assert_eq!(metrics.get_avg_fuel_per_block(), 0.0);
    }
}
