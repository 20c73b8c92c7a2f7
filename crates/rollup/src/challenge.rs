use alloy_primitives::{Address, U256};
use glide_db::{ChangeSet, RollupStore};
use glide_ledger::{LedgerError, StagedLedger};
use glide_primitives::{
    BatchId, BatchStatus, Challenge, ChallengeId, ChallengeStatus, FraudClaim, Role,
    SettlementDomain, MAX_PROOF_DEPTH,
};
use tracing::{info, instrument, warn};

use crate::error::RollupError;
use crate::fraud::{assess, ClaimAssessment};
use crate::lifecycle::advance;
use crate::rollup::Rollup;

const DEFAULT_REJECTION_REASON: &str = "fraud proof accepted";

impl<Db: RollupStore> Rollup<Db> {
    /// Opens a dispute against a verified batch whose window is still open.
    ///
    /// The challenger must be able to cover the penalty at submission time.
    #[instrument(level = "debug", skip(self), err)]
    pub fn submit_challenge(
        &self,
        batch_id: BatchId,
        challenger: Address,
        claim: FraudClaim,
    ) -> Result<Challenge, RollupError> {
        if challenger.is_zero() {
            return Err(RollupError::MalformedClaim("challenger address is zero".to_string()));
        }
        if claim.merkle_proof.len() > MAX_PROOF_DEPTH {
            return Err(RollupError::MalformedClaim(format!(
                "proof has {} siblings, at most {} allowed",
                claim.merkle_proof.len(),
                MAX_PROOF_DEPTH
            )));
        }

        let handle = self.batch_handle(batch_id)?;
        let batch = handle.lock();
        let now = self.clock.now();
        if !batch.is_challengeable_at(now) {
            return Err(RollupError::BatchNotChallengeable {
                id: batch_id,
                status: batch.status,
            });
        }

        let mut challenges = self.challenges.write();
        if let Some(in_flight) = challenges
            .values()
            .find(|challenge| challenge.batch_id == batch_id && challenge.is_pending())
        {
            return Err(RollupError::ChallengeInFlight {
                id: batch_id,
                challenge: in_flight.id,
            });
        }

        let bond = self.config.fraud_penalty;
        let balance = self.ledger.lock().balance_of(&challenger, &batch.domain);
        if balance < bond {
            return Err(RollupError::InsufficientPenaltyFunds {
                address: challenger,
                balance,
                required: bond,
            });
        }

        let id = challenges
            .keys()
            .next_back()
            .map_or(ChallengeId(1), |last| last.next());
        let challenge = Challenge::new(id, batch_id, challenger, claim, now);

        self.store
            .commit(&ChangeSet::new().with_challenge(challenge.clone()))
            .map_err(RollupError::Storage)?;
        challenges.insert(id, challenge.clone());

        info!(%id, %batch_id, %challenger, "Challenge submitted");
        Ok(challenge)
    }

    /// Settles a pending challenge.
    ///
    /// A valid claim reverses the batch's transfers, rejects it and moves the
    /// penalty from the batch submitter to the challenger. An invalid claim
    /// moves the penalty from the challenger to the submitter and leaves the
    /// batch on its way to finalization.
    #[instrument(level = "debug", skip(self), err)]
    pub fn resolve_challenge(
        &self,
        challenge_id: ChallengeId,
        is_valid: bool,
        resolver: Address,
    ) -> Result<Challenge, RollupError> {
        self.authorize(&resolver, Role::Adjudicator)?;
        let batch_id = self.get_challenge(challenge_id)?.batch_id;

        let handle = self.batch_handle(batch_id)?;
        let mut batch = handle.lock();
        let mut challenges = self.challenges.write();
        let mut challenge = challenges
            .get(&challenge_id)
            .cloned()
            .ok_or(RollupError::ChallengeNotFound(challenge_id))?;
        if !challenge.is_pending() {
            return Err(RollupError::AlreadyResolved(challenge_id));
        }
        if batch.status != BatchStatus::Verified {
            return Err(RollupError::ImmutableState {
                id: batch_id,
                status: batch.status,
            });
        }

        let now = self.clock.now();
        let penalty = self.config.fraud_penalty;
        let mut ledger = self.ledger.lock();
        let mut staged = ledger.stage();
        let mut updated_batch = None;

        if is_valid {
            for tx in batch.leaves.iter().rev() {
                staged.revert_transaction(tx, batch.domain).map_err(|e| {
                    warn!(%batch_id, "Cannot reverse batch transfer: {}", e);
                    e
                })?;
            }
            charge_penalty(
                &mut staged,
                batch.submitter,
                challenge.challenger,
                batch.domain,
                penalty,
            )?;

            let mut rejected = batch.clone();
            advance(&mut rejected, BatchStatus::Rejected)?;
            rejected.rejection_reason = Some(
                challenge
                    .claim
                    .reason
                    .clone()
                    .unwrap_or_else(|| DEFAULT_REJECTION_REASON.to_string()),
            );
            updated_batch = Some(rejected);
            challenge.status = ChallengeStatus::Accepted;
        } else {
            charge_penalty(
                &mut staged,
                challenge.challenger,
                batch.submitter,
                batch.domain,
                penalty,
            )?;
            challenge.status = ChallengeStatus::Rejected;
        }
        challenge.resolved_by = Some(resolver);
        challenge.resolved_at = Some(now);
        let change = staged.into_change();

        let mut changes = ChangeSet::new()
            .with_challenge(challenge.clone())
            .with_ledger(change.clone());
        if let Some(rejected) = &updated_batch {
            changes = changes.with_batch(rejected.clone());
        }
        self.store.commit(&changes).map_err(RollupError::Storage)?;

        ledger.commit(&change);
        challenges.insert(challenge_id, challenge.clone());
        if let Some(rejected) = updated_batch {
            *batch = rejected;
            info!(%batch_id, %challenge_id, %resolver, "Batch rejected by accepted challenge");
        } else {
            info!(%batch_id, %challenge_id, %resolver, "Challenge rejected");
        }
        Ok(challenge)
    }

    /// Runs the fraud predicate for a pending challenge without changing state.
    pub fn assess_claim(&self, challenge_id: ChallengeId) -> Result<ClaimAssessment, RollupError> {
        let challenge = self.get_challenge(challenge_id)?;
        if !challenge.is_pending() {
            return Err(RollupError::AlreadyResolved(challenge_id));
        }
        let handle = self.batch_handle(challenge.batch_id)?;
        let batch = handle.lock();
        let ledger = self.ledger.lock();
        assess(&batch, &challenge.claim, &ledger)
    }

    /// Assesses a challenge and resolves it with the verdict.
    #[instrument(level = "debug", skip(self), err)]
    pub fn adjudicate_challenge(
        &self,
        challenge_id: ChallengeId,
        resolver: Address,
    ) -> Result<Challenge, RollupError> {
        self.authorize(&resolver, Role::Adjudicator)?;
        let assessment = self.assess_claim(challenge_id)?;
        info!(
            %challenge_id,
            inclusion_proven = assessment.inclusion_proven,
            violation = ?assessment.semantic_violation,
            "Assessed fraud claim"
        );
        self.resolve_challenge(challenge_id, assessment.is_fraud(), resolver)
    }
}

fn charge_penalty(
    staged: &mut StagedLedger<'_>,
    from: Address,
    to: Address,
    domain: SettlementDomain,
    penalty: U256,
) -> Result<(), RollupError> {
    if penalty.is_zero() {
        return Ok(());
    }
    staged
        .transfer(from, to, domain, penalty)
        .map_err(|e| match e {
            LedgerError::InsufficientBalance {
                address,
                balance,
                required,
                ..
            } => RollupError::InsufficientPenaltyFunds {
                address,
                balance,
                required,
            },
            other => RollupError::Ledger(other),
        })
}
