//! Validation of received delegate blocks.

use crate::config::MinerConfig;
use crate::domain::block::{fuel_for, Block, TX_VERSION1};
use crate::domain::shuffle::{current_delegate, shuffle_delegates};
use crate::domain::state::CacheWrapper;
use crate::error::VerifyError;
use crate::ports::outbound::ChainStore;
use crate::{MAX_BLOCK_RUN_STEP, MAX_BLOCK_SIGNATURE_SIZE};
use shared_crypto::verify_signature;
use shared_types::{ChainParams, TxId};
use tracing::{debug, trace};

/// Verifies that a received block was produced by the scheduled delegate at
/// its timestamp, with a valid signature and, when `need_run_tx` is set,
/// internally consistent execution results.
///
/// `cw` must be a speculative snapshot of the parent state; execution runs
/// in a fork of it and never commits.
pub fn verify_delegate_block(
    block: &Block,
    cw: &mut CacheWrapper,
    need_run_tx: bool,
    chain: &dyn ChainStore,
    params: &ChainParams,
    config: &MinerConfig,
) -> Result<(), VerifyError> {
    // 1. Derive the scheduled producer for the block's slot.
    let mut delegates = cw
        .delegates
        .top_delegates(params.total_delegate_num as usize);
    if delegates.len() < params.total_delegate_num as usize {
        return Err(VerifyError::MissingDelegates);
    }
    shuffle_delegates(block.header.height, &mut delegates, params);
    let expected = current_delegate(block.header.time, &delegates, params);
    let expected_account = cw
        .accounts
        .get(&expected)
        .ok_or(VerifyError::MissingAccount(expected))?;

    // 2. Structural header checks.
    if block.header.nonce > params.max_nonce {
        return Err(VerifyError::NonceOverflow {
            nonce: block.header.nonce,
            max: params.max_nonce,
        });
    }
    if block.header.merkle_root != block.build_merkle_root() {
        return Err(VerifyError::MerkleMismatch);
    }

    // 3. Same-slot producer uniqueness against the previous block.
    let genesis_successor =
        block.header.height == 1 && block.header.prev_hash == params.genesis_hash;
    if !genesis_successor {
        let previous = chain
            .read_block(&block.header.prev_hash)
            .ok_or_else(|| VerifyError::PrevBlockRead(hex::encode(block.header.prev_hash)))?;
        let previous_uid = previous
            .reward_tx()
            .map(|tx| tx.tx_uid())
            .ok_or(VerifyError::MissingRewardTx)?;
        let previous_delegate = cw
            .accounts
            .get(&previous_uid)
            .ok_or(VerifyError::MissingAccount(previous_uid))?;
        if block.header.time - previous.header.time < params.block_interval_s
            && previous_delegate.reg_id == expected_account.reg_id
        {
            return Err(VerifyError::SameSlotProducer(expected_account.reg_id));
        }
    }

    // 4. The claimed producer must be the scheduled one.
    let reward = block.reward_tx().ok_or(VerifyError::MissingRewardTx)?;
    let producer_uid = reward.tx_uid();
    let producer = cw
        .accounts
        .get(&producer_uid)
        .ok_or(VerifyError::MissingAccount(producer_uid))?;
    if producer.reg_id != expected_account.reg_id {
        return Err(VerifyError::WrongProducer {
            expected: expected_account.reg_id,
            got: producer.reg_id,
        });
    }

    // 5. Signature over the header digest, owner key first, miner key as
    // fallback.
    let signature = &block.header.signature;
    if signature.is_empty() || signature.len() > MAX_BLOCK_SIGNATURE_SIZE {
        return Err(VerifyError::SignatureSize(signature.len()));
    }
    let digest = block.signature_hash();
    let owner_ok = verify_signature(&digest, signature, &producer.pub_key).is_ok();
    let miner_ok = || {
        producer
            .miner_pub_key
            .map(|key| verify_signature(&digest, signature, &key).is_ok())
            .unwrap_or(false)
    };
    if !owner_ok && !miner_ok() {
        return Err(VerifyError::BadSignature(producer.reg_id));
    }

    // 6. Reward transaction version.
    if reward.version() != TX_VERSION1 {
        return Err(VerifyError::TxVersion {
            got: reward.version(),
            expected: TX_VERSION1,
        });
    }

    if need_run_tx {
        verify_block_execution(block, cw, config)?;
    }

    debug!(
        "[miner] verified block height={} producer={}",
        block.header.height, producer.reg_id
    );
    Ok(())
}

/// Re-executes every non-reward transaction in index order against a fork
/// of the parent state and checks the step budget and the header's fuel.
fn verify_block_execution(
    block: &Block,
    cw: &mut CacheWrapper,
    config: &MinerConfig,
) -> Result<(), VerifyError> {
    let height = block.header.height;
    let fuel_rate = block.header.fuel_rate;
    let mut total_fuel = 0u64;
    let mut total_run_step = 0u64;

    let mut delta = cw.fork();
    let mut failure: Option<(TxId, u32, String)> = None;
    let mut outcome = Ok(());

    {
        let mut view = cw.view(&mut delta);
        for (index, tx) in block.txs.iter().enumerate().skip(1) {
            let txid = tx.txid();
            if view.have_tx(&txid) {
                outcome = Err(VerifyError::DuplicateTx(hex::encode(txid)));
                break;
            }
            match tx.execute(height, index as u32, &mut view) {
                Ok(trace) => {
                    view.add_confirmed_tx(txid);
                    total_run_step += trace.run_step;
                    if total_run_step > MAX_BLOCK_RUN_STEP {
                        outcome = Err(VerifyError::StepOverflow {
                            total: total_run_step,
                            max: MAX_BLOCK_RUN_STEP,
                        });
                        break;
                    }
                    total_fuel += fuel_for(trace.run_step, fuel_rate);
                    trace!(
                        target: "fuel",
                        "verify total fuel:{total_fuel}, tx fuel:{} runStep:{} fuelRate:{fuel_rate} txid:{}",
                        fuel_for(trace.run_step, fuel_rate),
                        trace.run_step,
                        hex::encode(txid)
                    );
                }
                Err(reject) => {
                    failure = Some((txid, reject.code, reject.reason.clone()));
                    outcome = Err(VerifyError::TxExecution {
                        txid: hex::encode(txid),
                        reason: reject.reason,
                    });
                    break;
                }
            }
        }
    }

    if let Some((txid, code, reason)) = failure {
        if config.log_failures {
            cw.exec_log.set_execute_fail(height, txid, code, reason);
        }
    }
    outcome?;

    if total_fuel != block.header.fuel {
        return Err(VerifyError::FuelMismatch {
            computed: total_fuel,
            header: block.header.fuel,
        });
    }
    Ok(())
}
