mod common;

use alloy_primitives::U256;
use common::*;
use glide_commitment::MerkleTree;
use glide_db::TransactionQueue;
use glide_primitives::{BatchId, BatchStatus, Role, Timestamp, TransactionError};
use glide_rollup::RollupError;

#[test]
fn verify_then_finalize_applies_transfers_once() {
    let harness = MemoryHarness::funded();
    let batch = harness.cut(&scenario_transfers());
    assert_eq!(batch.status, BatchStatus::Committed);
    assert_eq!(batch.submitter, OPERATOR);

    let verified = harness.rollup.verify_batch(batch.id, VERIFIER).unwrap();
    assert_eq!(verified.status, BatchStatus::Verified);
    assert_eq!(verified.verified_at, Some(START));
    assert_eq!(
        verified.challenge_deadline,
        Some(Timestamp(START.0 + CHALLENGE_PERIOD_MS))
    );
    assert_eq!(harness.balance(ALICE), amount(10));
    assert_eq!(harness.balance(BOB), amount(15));
    assert_eq!(harness.balance(CAROL), amount(5));

    harness.pass_challenge_period();
    let finalized = harness.rollup.finalize_batch(batch.id).unwrap();
    assert_eq!(finalized.status, BatchStatus::Finalized);
    assert_eq!(harness.balance(ALICE), amount(10));
    assert_eq!(harness.balance(BOB), amount(15));
    assert_eq!(harness.balance(CAROL), amount(5));
}

#[test]
fn duplicate_finalize_is_refused_without_ledger_change() {
    let harness = MemoryHarness::funded();
    let batch = harness.cut_and_verify(&scenario_transfers());
    harness.pass_challenge_period();
    harness.rollup.finalize_batch(batch.id).unwrap();
    let supply = harness.rollup.total_balance(&domain()).unwrap();

    assert!(matches!(
        harness.rollup.finalize_batch(batch.id),
        Err(RollupError::AlreadyFinalized(id)) if id == batch.id
    ));
    assert_eq!(harness.balance(ALICE), amount(10));
    assert_eq!(harness.balance(BOB), amount(15));
    assert_eq!(harness.rollup.total_balance(&domain()).unwrap(), supply);
}

#[test]
fn verification_conserves_value() {
    let harness = MemoryHarness::funded();
    let before = harness.rollup.total_balance(&domain()).unwrap();
    harness.cut_and_verify(&scenario_transfers());
    assert_eq!(harness.rollup.total_balance(&domain()).unwrap(), before);
}

#[test]
fn finalize_requires_verification() {
    let harness = MemoryHarness::funded();
    let batch = harness.cut(&scenario_transfers());
    harness.pass_challenge_period();
    assert!(matches!(
        harness.rollup.finalize_batch(batch.id),
        Err(RollupError::NotVerified {
            status: BatchStatus::Committed,
            ..
        })
    ));
    assert_eq!(harness.balance(ALICE), amount(20));
}

#[test]
fn finalize_waits_for_the_deadline() {
    let harness = MemoryHarness::funded();
    let batch = harness.cut_and_verify(&scenario_transfers());

    harness.clock.advance(CHALLENGE_PERIOD_MS - 1);
    assert!(matches!(
        harness.rollup.finalize_batch(batch.id),
        Err(RollupError::ChallengePeriodActive { .. })
    ));

    harness.clock.advance(1);
    assert_eq!(
        harness.rollup.finalize_batch(batch.id).unwrap().finalized_at,
        Some(Timestamp(START.0 + CHALLENGE_PERIOD_MS))
    );
}

#[test]
fn reverify_is_refused() {
    let harness = MemoryHarness::funded();
    let batch = harness.cut_and_verify(&scenario_transfers());
    assert!(matches!(
        harness.rollup.verify_batch(batch.id, VERIFIER),
        Err(RollupError::AlreadyVerified(_))
    ));
    harness.pass_challenge_period();
    harness.rollup.finalize_batch(batch.id).unwrap();
    assert!(matches!(
        harness.rollup.verify_batch(batch.id, VERIFIER),
        Err(RollupError::AlreadyVerified(_))
    ));
    assert_eq!(harness.balance(ALICE), amount(10));
}

#[test]
fn overdrawing_batch_stays_committed() {
    let harness = MemoryHarness::funded();
    let batch = harness.cut(&[transfer(ALICE, BOB, 15), transfer(ALICE, CAROL, 10)]);

    assert!(matches!(
        harness.rollup.verify_batch(batch.id, VERIFIER),
        Err(RollupError::Ledger(_))
    ));
    assert_eq!(
        harness.rollup.get_batch(batch.id).unwrap().status,
        BatchStatus::Committed
    );
    assert_eq!(harness.balance(ALICE), amount(20));
    assert_eq!(harness.balance(BOB), amount(10));

    harness.deposit(ALICE, 5);
    harness.rollup.verify_batch(batch.id, VERIFIER).unwrap();
    assert_eq!(harness.balance(ALICE), U256::ZERO);
}

#[test]
fn cut_needs_queued_transactions() {
    let harness = MemoryHarness::new();
    assert!(matches!(
        harness.rollup.cut_batch(),
        Err(RollupError::EmptyBatch)
    ));
    assert!(harness.rollup.list_batches().is_empty());
}

#[test]
fn cut_takes_at_most_max_batch_size() {
    let harness = MemoryHarness::funded();
    for i in 0..12u64 {
        harness
            .rollup
            .submit_transaction(transfer(ALICE, BOB, i + 1))
            .unwrap();
    }
    let first = harness.rollup.cut_batch().unwrap();
    assert_eq!(first.leaves.len(), 10);
    assert_eq!(first.leaves[0].amount, amount(1));
    assert_eq!(harness.rollup.pending_transaction_count().unwrap(), 2);

    let second = harness.rollup.cut_batch().unwrap();
    assert_eq!(second.id, BatchId(2));
    assert_eq!(second.leaves[0].amount, amount(11));
}

#[test]
fn malformed_submissions_are_rejected() {
    let harness = MemoryHarness::new();
    assert!(matches!(
        harness.rollup.submit_transaction(transfer(ALICE, BOB, 0)),
        Err(RollupError::MalformedTransaction(TransactionError::ZeroAmount))
    ));
    assert!(matches!(
        harness.rollup.submit_transaction(transfer(ALICE, ALICE, 1)),
        Err(RollupError::MalformedTransaction(TransactionError::SelfTransfer(_)))
    ));
    assert_eq!(harness.rollup.pending_transaction_count().unwrap(), 0);
}

#[test]
fn malformed_queue_entries_are_dropped_and_rest_kept() {
    let harness = MemoryHarness::funded();
    // bypass submit_transaction validation
    harness.store.enqueue_transaction(transfer(ALICE, BOB, 1)).unwrap();
    harness.store.enqueue_transaction(transfer(BOB, BOB, 1)).unwrap();
    harness.store.enqueue_transaction(transfer(BOB, CAROL, 2)).unwrap();

    assert!(matches!(
        harness.rollup.cut_batch(),
        Err(RollupError::MalformedTransaction(TransactionError::SelfTransfer(_)))
    ));
    assert_eq!(harness.rollup.pending_transaction_count().unwrap(), 2);

    let batch = harness.rollup.cut_batch().unwrap();
    assert_eq!(batch.leaves, vec![transfer(ALICE, BOB, 1), transfer(BOB, CAROL, 2)]);
}

#[test]
fn privileged_actions_check_roles() {
    let harness = MemoryHarness::funded();
    harness.rollup.submit_transaction(transfer(ALICE, BOB, 1)).unwrap();

    assert!(matches!(
        harness.rollup.cut_batch_as(ALICE),
        Err(RollupError::Unauthorized {
            role: Role::Operator,
            ..
        })
    ));
    assert_eq!(harness.rollup.pending_transaction_count().unwrap(), 1);

    let batch = harness.rollup.cut_batch().unwrap();
    assert!(matches!(
        harness.rollup.verify_batch(batch.id, OPERATOR),
        Err(RollupError::Unauthorized {
            role: Role::Verifier,
            ..
        })
    ));
    assert!(matches!(
        harness.rollup.record_deposit(VERIFIER, ALICE, amount(1)),
        Err(RollupError::Unauthorized { .. })
    ));

    harness
        .roles
        .grant_role(ADMIN, Role::Verifier, OPERATOR)
        .unwrap();
    harness.rollup.verify_batch(batch.id, OPERATOR).unwrap();
}

#[test]
fn admin_holds_operator_role() {
    let harness = MemoryHarness::funded();
    harness.rollup.submit_transaction(transfer(ALICE, BOB, 1)).unwrap();
    let batch = harness.rollup.cut_batch_as(ADMIN).unwrap();
    assert_eq!(batch.submitter, ADMIN);
}

#[test]
fn proofs_verify_against_the_stored_root() {
    let harness = MemoryHarness::funded();
    let txs: Vec<_> = (1..=5u64).map(|i| transfer(ALICE, BOB, i)).collect();
    let batch = harness.cut(&txs);

    for (index, tx) in batch.leaves.iter().enumerate() {
        let proof = harness.rollup.get_proof(batch.id, index).unwrap();
        assert!(MerkleTree::verify(&tx.digest(), &proof, &batch.root));
    }
    assert!(matches!(
        harness.rollup.get_proof(batch.id, 5),
        Err(RollupError::Commitment(_))
    ));
    assert!(matches!(
        harness.rollup.get_proof(BatchId(9), 0),
        Err(RollupError::BatchNotFound(_))
    ));
}

#[test]
fn withdrawals_never_overdraw() {
    let harness = MemoryHarness::funded();
    assert_eq!(
        harness
            .rollup
            .record_withdrawal(OPERATOR, ALICE, amount(5))
            .unwrap(),
        amount(15)
    );
    assert!(matches!(
        harness.rollup.record_withdrawal(OPERATOR, ALICE, amount(16)),
        Err(RollupError::Ledger(_))
    ));
    assert_eq!(harness.balance(ALICE), amount(15));
}

#[test]
fn address_queries() {
    let harness = MemoryHarness::funded();
    harness.cut(&[transfer(ALICE, BOB, 1)]);
    harness.cut(&[transfer(BOB, CAROL, 1)]);

    let alice: Vec<_> = harness
        .rollup
        .batches_for_address(&ALICE)
        .into_iter()
        .map(|b| b.id)
        .collect();
    let bob: Vec<_> = harness
        .rollup
        .batches_for_address(&BOB)
        .into_iter()
        .map(|b| b.id)
        .collect();
    assert_eq!(alice, vec![BatchId(1)]);
    assert_eq!(bob, vec![BatchId(1), BatchId(2)]);
    assert_eq!(harness.rollup.list_batches().len(), 2);
}
