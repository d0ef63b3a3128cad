//! Transition engine
//!
//! The single write path for submission records. Every mutating action runs
//! a load → pure-domain-mutation → conditional-save cycle: the save commits
//! only if the record version is unchanged since the load, so concurrent
//! deciders serialize per record and exactly one writer wins each version.
//!
//! A lost race is retried against freshly loaded state, which re-runs the
//! domain validation — a caller whose action stopped being valid mid-race
//! gets the precise post-state error (`OutOfTurn`, `AlreadyDecided`,
//! `InvalidState`) instead of a stale success or a generic failure.
//! `Conflict` surfaces only when contention persists through every attempt.

use std::time::Duration;

use rand::Rng;
use uuid::Uuid;

use thesistrack_common::{Error, Result};

use crate::domain::entities::{
    GateOutcome, Role, RoleAssignment, SubmissionRecord, WorkflowKind,
};
use crate::repository::WorkflowRepositories;

/// Conditional-write attempts per action before surfacing `Conflict`
const MAX_CAS_ATTEMPTS: u32 = 3;

/// Base backoff between attempts; doubled per attempt, plus jitter
const BASE_RETRY_DELAY_MS: u64 = 10;

#[derive(Clone)]
pub struct TransitionEngine {
    repos: WorkflowRepositories,
}

impl TransitionEngine {
    pub fn new(repos: WorkflowRepositories) -> Self {
        Self { repos }
    }

    /// Create a submission record for a subject.
    ///
    /// Fails with `AlreadyExists` while an active record for the same
    /// (subject, kind) exists.
    pub async fn create(
        &self,
        subject_id: Uuid,
        kind: WorkflowKind,
        assignments: Vec<RoleAssignment>,
        created_by: Uuid,
    ) -> Result<SubmissionRecord> {
        let record = SubmissionRecord::new(subject_id, kind, assignments, created_by)?;
        let created = self.repos.submissions.create(&record).await?;
        tracing::info!(
            record_id = %created.id,
            subject_id = %subject_id,
            kind = %kind,
            "submission record created"
        );
        Ok(created)
    }

    /// Send a draft or returned record into review.
    ///
    /// `ready` is the content-readiness collaborator's verdict; the engine
    /// itself never inspects content.
    pub async fn submit(
        &self,
        record_id: Uuid,
        actor_id: Uuid,
        ready: bool,
    ) -> Result<SubmissionRecord> {
        let (record, ()) = self
            .apply(record_id, "submit", move |record| record.submit(actor_id, ready))
            .await?;
        Ok(record)
    }

    /// Resubmit after a return.
    ///
    /// The transition is the same as `submit`; the readiness flag is expected
    /// to have been re-validated against the revised content.
    pub async fn resubmit(
        &self,
        record_id: Uuid,
        actor_id: Uuid,
        ready: bool,
    ) -> Result<SubmissionRecord> {
        self.submit(record_id, actor_id, ready).await
    }

    /// Record an approval at the current gate.
    ///
    /// The returned [`GateOutcome`] tells the caller whether to notify the
    /// next gate or the submitter.
    pub async fn approve(
        &self,
        record_id: Uuid,
        role: Role,
        actor_id: Uuid,
        note: Option<String>,
    ) -> Result<(SubmissionRecord, GateOutcome)> {
        self.apply(record_id, "approve", move |record| {
            record.approve(role, actor_id, note.clone())
        })
        .await
    }

    /// Return the record to the submitter with feedback
    pub async fn return_submission(
        &self,
        record_id: Uuid,
        role: Role,
        actor_id: Uuid,
        note: Option<String>,
    ) -> Result<SubmissionRecord> {
        let (record, ()) = self
            .apply(record_id, "return", move |record| {
                record.return_to_submitter(role, actor_id, note.clone())
            })
        .await?;
        Ok(record)
    }

    /// The compare-and-swap cycle shared by every mutating action.
    ///
    /// Domain errors abort immediately (retrying cannot make them succeed);
    /// only lost write races are retried, each time against fresh state.
    async fn apply<T>(
        &self,
        record_id: Uuid,
        action: &'static str,
        mutate: impl Fn(&mut SubmissionRecord) -> Result<T>,
    ) -> Result<(SubmissionRecord, T)> {
        let mut attempt: u32 = 1;
        loop {
            let (mut record, version) = self
                .repos
                .submissions
                .find_versioned(record_id)
                .await?
                .ok_or_else(|| Error::NotFound(format!("no submission record {record_id}")))?;

            let outcome = mutate(&mut record)?;

            match self.repos.submissions.save(&record, version).await {
                Ok(saved) => {
                    tracing::info!(
                        record_id = %record_id,
                        action,
                        status = %saved.status,
                        attempt,
                        "transition accepted"
                    );
                    return Ok((saved, outcome));
                }
                Err(Error::Conflict(message)) => {
                    if attempt >= MAX_CAS_ATTEMPTS {
                        tracing::warn!(
                            record_id = %record_id,
                            action,
                            attempt,
                            "conditional write exhausted retries"
                        );
                        return Err(Error::Conflict(message));
                    }
                    let delay = retry_delay(attempt);
                    tracing::debug!(
                        record_id = %record_id,
                        action,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "conditional write lost race; retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Exponential backoff with jitter, so raced retries do not collide again
fn retry_delay(attempt: u32) -> Duration {
    let base = BASE_RETRY_DELAY_MS << (attempt - 1);
    let jitter = rand::thread_rng().gen_range(0..BASE_RETRY_DELAY_MS);
    Duration::from_millis(base + jitter)
}
