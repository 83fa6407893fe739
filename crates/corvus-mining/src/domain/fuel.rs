//! Adaptive fuel-rate estimation.
//!
//! The per-step fuel price for the next block follows recent utilization: a
//! quiet burn window cheapens computation, a saturated one raises the price,
//! and the 75%/85% hysteresis band keeps the rate from oscillating.

use crate::domain::block::BlockIndexEntry;
use crate::{INIT_FUEL_RATES, MAX_BLOCK_RUN_STEP, MIN_FUEL_RATES};

/// Computes the fuel rate for the block built on top of `tip`.
///
/// Averages the run steps of the last `window` blocks (each reconstructed
/// as `fuel * 100 / fuel_rate`). Against `MAX_BLOCK_RUN_STEP`:
///
/// - below 75% utilization the rate decays to `⌊rate * 0.9⌋`,
/// - above 85% it rises to `⌊rate * 1.1⌋`,
/// - in between it is unchanged,
///
/// floored at `MIN_FUEL_RATES`. A missing tip or a chain shorter than twice
/// the window yields `INIT_FUEL_RATES`.
pub fn fuel_rate_for_next_block(tip: Option<&BlockIndexEntry>, window: u32) -> u64 {
    let Some(tip) = tip else {
        return INIT_FUEL_RATES;
    };
    if window == 0 || 2 * window as u64 >= tip.height.saturating_sub(1) as u64 {
        return INIT_FUEL_RATES;
    }

    let mut total_step: u64 = 0;
    let mut cursor = Some(tip);
    for _ in 0..window {
        let Some(entry) = cursor else { break };
        if entry.fuel_rate > 0 {
            total_step += entry.fuel * 100 / entry.fuel_rate;
        }
        cursor = entry.prev.as_deref();
    }
    let average_step = total_step / window as u64;

    let rate = tip.fuel_rate;
    let new_rate = if average_step * 100 < MAX_BLOCK_RUN_STEP * 75 {
        rate * 9 / 10
    } else if average_step * 100 > MAX_BLOCK_RUN_STEP * 85 {
        rate * 11 / 10
    } else {
        rate
    };
    let new_rate = new_rate.max(MIN_FUEL_RATES);

    tracing::debug!(
        target: "fuel",
        "preFuelRate={} fuelRate={}, height={}",
        rate,
        new_rate,
        tip.height
    );
    new_rate
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    /// Chain of `len` index entries, newest first, all with the same
    /// per-block fuel and fuel rate.
    fn chain(len: u32, fuel: u64, fuel_rate: u64) -> Arc<BlockIndexEntry> {
        let mut prev: Option<Arc<BlockIndexEntry>> = None;
        for height in 1..=len {
            prev = Some(Arc::new(BlockIndexEntry {
                height,
                time: height as i64 * 10,
                fuel,
                fuel_rate,
                hash: [height as u8; 32],
                prev,
            }));
        }
        prev.expect("len > 0")
    }

    #[test]
    fn missing_tip_returns_initial_rate() {
        assert_eq!(fuel_rate_for_next_block(None, 50), INIT_FUEL_RATES);
    }

    #[test]
    fn short_chain_returns_initial_rate() {
        // 2 * 50 >= height - 1 for any height <= 101.
        let tip = chain(101, 0, 100);
        assert_eq!(fuel_rate_for_next_block(Some(&tip), 50), INIT_FUEL_RATES);
    }

    #[test]
    fn idle_chain_decays_rate() {
        // 150 blocks of zero fuel at rate 100: average step 0 < 75% of max.
        let tip = chain(150, 0, 100);
        let rate = fuel_rate_for_next_block(Some(&tip), 50);
        assert_eq!(rate, 90_u64.max(MIN_FUEL_RATES));
    }

    #[test]
    fn saturated_chain_raises_rate() {
        // Per-block steps at 90% of the budget, rate 100.
        // At rate 100 a block's fuel equals its run steps.
        let step = MAX_BLOCK_RUN_STEP * 9 / 10;
        let tip = chain(150, step, 100);
        assert_eq!(fuel_rate_for_next_block(Some(&tip), 50), 110);
    }

    #[test]
    fn band_keeps_rate_unchanged() {
        // 80% utilization sits inside the hysteresis band.
        let step = MAX_BLOCK_RUN_STEP * 8 / 10;
        let tip = chain(150, step, 100);
        assert_eq!(fuel_rate_for_next_block(Some(&tip), 50), 100);
    }

    #[test]
    fn decay_respects_floor() {
        let tip = chain(150, 0, MIN_FUEL_RATES);
        assert_eq!(fuel_rate_for_next_block(Some(&tip), 50), MIN_FUEL_RATES);
    }
}
