//! Read model projection
//!
//! Derives UI-facing status from a submission record without mutating it.
//! Safe to call on stale or cached copies: `can_decide` is advisory only,
//! and the authoritative check is re-performed by the transition engine at
//! action time.

use serde::Serialize;
use uuid::Uuid;

use super::entities::{Role, SubmissionRecord, SubmissionStatus};
use super::policy::GateStep;

/// Viewer-facing workflow status
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum DisplayStatus {
    /// Draft awaiting the submitter's first submit
    ReadyToSubmit,
    /// In review; shown to the submitter, whose content is locked
    Locked,
    /// In review; shown to reviewers, naming the gating role
    AwaitingReview { gate: Role },
    /// Returned to the submitter with feedback
    Returned,
    /// Terminal: every gate approved
    Approved,
}

impl DisplayStatus {
    /// Human-readable label for list rows and notifications
    pub fn label(&self) -> String {
        match self {
            Self::ReadyToSubmit => "ready to submit".to_string(),
            Self::Locked => "locked for review".to_string(),
            Self::AwaitingReview { gate } => format!("awaiting {gate}"),
            Self::Returned => "returned for revision".to_string(),
            Self::Approved => "approved".to_string(),
        }
    }
}

/// What one viewer sees for one submission record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionView {
    pub submission_id: Uuid,
    pub subject_id: Uuid,
    #[serde(flatten)]
    pub status: DisplayStatus,
    pub label: String,
    pub locked: bool,
    /// Advisory: whether this viewer may decide right now
    pub can_decide: bool,
    /// Advisory: whether this viewer may submit or resubmit right now
    pub can_submit: bool,
    pub return_note: Option<String>,
    pub resubmission_count: u32,
}

/// Derive the view of `record` for one viewer. Pure; never mutates.
pub fn project(record: &SubmissionRecord, viewer_id: Uuid, viewer_role: Role) -> SubmissionView {
    let status = match record.status {
        SubmissionStatus::Draft => DisplayStatus::ReadyToSubmit,
        SubmissionStatus::InReview => match (&record.current_gate, viewer_role) {
            (_, Role::Student) | (None, _) => DisplayStatus::Locked,
            (Some(step), _) => DisplayStatus::AwaitingReview { gate: step.role() },
        },
        SubmissionStatus::Returned => DisplayStatus::Returned,
        SubmissionStatus::Approved => DisplayStatus::Approved,
    };

    let can_decide = record.status == SubmissionStatus::InReview
        && record.locked
        && viewer_gates_now(record, viewer_id, viewer_role)
        && !has_decided(record, viewer_id, viewer_role);

    let can_submit = viewer_role == Role::Student
        && matches!(
            record.status,
            SubmissionStatus::Draft | SubmissionStatus::Returned
        );

    SubmissionView {
        submission_id: record.id,
        subject_id: record.subject_id,
        label: status.label(),
        status,
        locked: record.locked,
        can_decide,
        can_submit,
        return_note: record.return_note.clone(),
        resubmission_count: record.resubmission_count,
    }
}

/// Whether the viewer holds a seat at the currently awaiting gate
fn viewer_gates_now(record: &SubmissionRecord, viewer_id: Uuid, viewer_role: Role) -> bool {
    match &record.current_gate {
        Some(GateStep::Single { role }) => {
            *role == viewer_role
                && record
                    .assignments
                    .iter()
                    .find(|assignment| assignment.role == viewer_role)
                    .is_some_and(|assignment| {
                        assignment.members.is_empty() || assignment.members.contains(&viewer_id)
                    })
        }
        Some(GateStep::Panel { role, members }) => {
            *role == viewer_role && members.contains(&viewer_id)
        }
        None => false,
    }
}

/// Whether the viewer already recorded a decision for this attempt
fn has_decided(record: &SubmissionRecord, viewer_id: Uuid, viewer_role: Role) -> bool {
    record
        .decisions
        .get(&viewer_role)
        .is_some_and(|decision| decision.entries.contains_key(&viewer_id))
}
