//! Deterministic delegate ordering and slot assignment.
//!
//! Once per round (`total_delegate_num` slots) the active delegate set is
//! re-ordered by a seeded Fisher-Yates variant. The seed derives from the
//! round number alone, so every honest node computes the identical
//! permutation for the same height, and the producer of a slot is just an
//! index into that permutation.

use shared_crypto::{hash256, hash256_concat};
use shared_types::{ChainParams, RegId};

/// Shuffles the delegate list in place for the round containing `height`.
///
/// The seed starts as the content hash of the decimal round number and is
/// renewed as `H(seed ‖ seed)` after every group of four swaps. Each swap
/// exchanges the cursor position with `t mod N`, where `t` is one of the
/// seed's four little-endian u64 lanes. The cursor advances once per swap
/// and once more per group, faithfully retaining the historical walk in
/// which every fifth position is never used as a swap source (it may still
/// be chosen as a swap target).
pub fn shuffle_delegates(height: u32, delegates: &mut [RegId], params: &ChainParams) {
    let del_count = delegates.len();
    if del_count == 0 {
        return;
    }

    let n = params.total_delegate_num;
    let round_no = height / n + u32::from(height % n > 0);
    let mut seed = hash256(round_no.to_string().as_bytes());

    let mut i = 0usize;
    while i < del_count {
        for lane in 0..4usize {
            if i >= del_count {
                break;
            }
            let t = u64::from_le_bytes(
                seed[lane * 8..lane * 8 + 8]
                    .try_into()
                    .expect("8-byte lane"),
            );
            let target = (t % del_count as u64) as usize;
            delegates.swap(i, target);
            i += 1;
        }
        seed = hash256_concat(&[&seed, &seed]);
        i += 1;
    }
}

/// The delegate scheduled to produce at `time`.
///
/// Slot index is `time / block_interval`; the producer is that slot's
/// position in the shuffled list, modulo the active set size. The list must
/// hold the full active set.
pub fn current_delegate(time: i64, delegates: &[RegId], params: &ChainParams) -> RegId {
    debug_assert_eq!(delegates.len(), params.total_delegate_num as usize);
    let slot = time / params.block_interval_s;
    let index = (slot % params.total_delegate_num as i64) as usize;
    let delegate = delegates[index];
    tracing::debug!(
        "currentTime={}, slot={}, miner={}, regId={}",
        time,
        slot,
        index,
        delegate
    );
    delegate
}
