//! Error types for the mining core.

use shared_types::RegId;
use thiserror::Error;

/// Result type alias for mining operations.
pub type Result<T> = std::result::Result<T, MiningError>;

/// Errors that can occur while producing or submitting blocks.
#[derive(Debug, Error)]
pub enum MiningError {
    /// Wallet holds no miner key; the worker refuses to start.
    #[error("no miner key in wallet")]
    NoMinerKey,

    /// Requested target height is not ahead of the current tip.
    #[error("invalid target height delta: {0}")]
    InvalidTargetHeight(i64),

    /// The candidate block no longer extends the tip at submission time.
    #[error("generated block is stale: prev={prev}, tip={tip}")]
    StaleBlock {
        /// Candidate's previous-block hash (hex).
        prev: String,
        /// Current tip hash (hex).
        tip: String,
    },

    /// Same-slot self-production guard tripped at sealing time.
    #[error("one delegate can't produce more than one block at the same slot: regid={0}")]
    SlotConflict(RegId),

    /// Block assembly failed; fatal for the worker.
    #[error("failed to create new block: {0}")]
    BlockCreation(String),

    /// Chain view failure (missing tip, unreadable block, rejected submit).
    #[error("chain error: {0}")]
    Chain(String),

    /// Wallet failure (missing key, signing error).
    #[error("wallet error: {0}")]
    Wallet(String),

    /// A received block failed validation.
    #[error("block verification failed: {0}")]
    Verify(#[from] VerifyError),
}

impl MiningError {
    /// Transient errors restart the outer mining loop without escalating.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::StaleBlock { .. } | Self::SlotConflict(_))
    }

    /// Fatal errors terminate the worker and clear the active flag.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::NoMinerKey | Self::InvalidTargetHeight(_) | Self::BlockCreation(_)
        )
    }
}

/// Why a received block was rejected.
///
/// Every variant renders a human-readable reason; callers forward it to peer
/// ban-scoring, so the message always names the offending txid / regid /
/// height.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    /// The delegate ranking could not supply a full active set.
    #[error("failed to get top delegates")]
    MissingDelegates,

    /// An account referenced by the block does not exist.
    #[error("failed to get account, regid={0}")]
    MissingAccount(RegId),

    /// Header nonce above the network maximum.
    #[error("invalid nonce: {nonce} > max {max}")]
    NonceOverflow {
        /// Header nonce.
        nonce: u32,
        /// Network maximum.
        max: u32,
    },

    /// Header merkle root does not match the transaction set.
    #[error("wrong merkle root hash")]
    MerkleMismatch,

    /// Previous block could not be read from the chain store.
    #[error("read previous block failed, hash={0}")]
    PrevBlockRead(String),

    /// Producer already produced the previous block within the same slot.
    #[error("one delegate can't produce more than one block at the same slot: regid={0}")]
    SameSlotProducer(RegId),

    /// Block's reward tx uid is not the scheduled delegate.
    #[error("delegate should be {expected} vs what we got {got}")]
    WrongProducer {
        /// Scheduled delegate for the block's slot.
        expected: RegId,
        /// Producer claimed by the block.
        got: RegId,
    },

    /// Signature length outside `(0, MAX_BLOCK_SIGNATURE_SIZE]`.
    #[error("invalid block signature size: {0}")]
    SignatureSize(usize),

    /// Signature does not verify against either producer key.
    #[error("verify signature error, regid={0}")]
    BadSignature(RegId),

    /// Block has no reward transaction at index 0.
    #[error("missing block reward transaction")]
    MissingRewardTx,

    /// Reward transaction version differs from the current version.
    #[error("transaction version {got} vs current {expected}")]
    TxVersion {
        /// Version carried by the reward transaction.
        got: u32,
        /// Expected version.
        expected: u32,
    },

    /// A block transaction is already confirmed on chain.
    #[error("duplicate transaction, txid={0}")]
    DuplicateTx(String),

    /// A block transaction failed to execute.
    #[error("failed to execute transaction, txid={txid}: {reason}")]
    TxExecution {
        /// Offending transaction id (hex).
        txid: String,
        /// Reject reason from the executor.
        reason: String,
    },

    /// Accumulated run steps exceed the block budget.
    #[error("block total run steps ({total}) exceed max run step ({max})")]
    StepOverflow {
        /// Accumulated steps.
        total: u64,
        /// Protocol maximum.
        max: u64,
    },

    /// Recomputed fuel does not match the header.
    #[error("total fuel ({computed}) mismatch what ({header}) in block header")]
    FuelMismatch {
        /// Fuel recomputed from execution.
        computed: u64,
        /// Fuel claimed by the header.
        header: u64,
    },
}

/// A transaction execution rejection: numeric code plus reason string.
///
/// The code/reason pair flows into the execution-failure log when
/// `log_failures` is enabled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("rejected ({code}): {reason}")]
pub struct TxReject {
    /// Numeric reject code.
    pub code: u32,
    /// Human-readable reason.
    pub reason: String,
}

impl TxReject {
    /// Reject code: malformed or semantically invalid transaction.
    pub const INVALID: u32 = 0x10;
    /// Reject code: insufficient funds or fee.
    pub const INSUFFICIENT_FUNDS: u32 = 0x40;

    /// Creates a rejection.
    pub fn new(code: u32, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_policy() {
        assert!(MiningError::NoMinerKey.is_fatal());
        assert!(MiningError::BlockCreation("oom".into()).is_fatal());
        assert!(MiningError::SlotConflict(RegId::new(1, 0)).is_transient());
        assert!(!MiningError::NoMinerKey.is_transient());
    }

    #[test]
    fn test_verify_error_names_the_offender() {
        let err = VerifyError::WrongProducer {
            expected: RegId::new(5, 1),
            got: RegId::new(7, 2),
        };
        let msg = err.to_string();
        assert!(msg.contains("5-1"));
        assert!(msg.contains("7-2"));
    }

    #[test]
    fn test_tx_reject_display() {
        let reject = TxReject::new(TxReject::INSUFFICIENT_FUNDS, "balance too low");
        assert_eq!(reject.to_string(), "rejected (64): balance too low");
    }
}
