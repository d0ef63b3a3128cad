//! Submission workflow API handlers

use std::collections::BTreeMap;
use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, Sse},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_stream::StreamExt;
use uuid::Uuid;

use thesistrack_common::{Error, Result};

use crate::api::middleware::{ActorContext, WorkflowState};
use crate::domain::entities::{
    GateOutcome, HistoryEntry, Role, RoleAssignment, RoleDecision, SubmissionRecord,
    SubmissionStatus, WorkflowKind,
};
use crate::domain::policy::GateStep;
use crate::domain::projection::{project, SubmissionView};

/// Submission response DTO.
///
/// The audit trail is large and append-only, so it is served by the
/// dedicated history endpoint instead of riding on every response.
#[derive(Debug, Serialize)]
pub struct SubmissionResponse {
    pub id: Uuid,
    pub subject_id: Uuid,
    pub kind: WorkflowKind,
    pub assignments: Vec<RoleAssignment>,
    pub status: SubmissionStatus,
    pub current_gate: Option<GateStep>,
    pub locked: bool,
    pub decisions: BTreeMap<Role, RoleDecision>,
    pub returned_by: Option<Role>,
    pub returned_at: Option<DateTime<Utc>>,
    pub return_note: Option<String>,
    pub resubmission_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<SubmissionRecord> for SubmissionResponse {
    fn from(record: SubmissionRecord) -> Self {
        Self {
            id: record.id,
            subject_id: record.subject_id,
            kind: record.kind,
            assignments: record.assignments,
            status: record.status,
            current_gate: record.current_gate,
            locked: record.locked,
            decisions: record.decisions,
            returned_by: record.returned_by,
            returned_at: record.returned_at,
            return_note: record.return_note,
            resubmission_count: record.resubmission_count,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Request for creating a submission record
#[derive(Debug, Deserialize)]
pub struct CreateSubmissionRequest {
    pub subject_id: Uuid,
    pub kind: WorkflowKind,
    pub assignments: Vec<RoleAssignment>,
}

/// Request for submitting or resubmitting
#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    /// The content-readiness collaborator's verdict for this subject
    pub ready: bool,
}

/// Request body for approve/return decisions
#[derive(Debug, Default, Deserialize)]
pub struct DecisionRequest {
    pub note: Option<String>,
}

/// Response for an accepted approval
#[derive(Debug, Serialize)]
pub struct ApprovalResponse {
    pub submission: SubmissionResponse,
    pub outcome: GateOutcome,
}

/// Create a submission record for a subject
pub async fn create_submission(
    actor: ActorContext,
    State(state): State<WorkflowState>,
    Json(req): Json<CreateSubmissionRequest>,
) -> Result<(StatusCode, Json<SubmissionResponse>)> {
    let record = state
        .engine
        .create(req.subject_id, req.kind, req.assignments, actor.actor_id)
        .await?;
    Ok((StatusCode::CREATED, Json(record.into())))
}

/// Get a single submission record by ID
pub async fn get_submission(
    State(state): State<WorkflowState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SubmissionResponse>> {
    let record = find_record(&state, id).await?;
    Ok(Json(record.into()))
}

/// List all submission records for a subject, oldest first
pub async fn list_subject_submissions(
    State(state): State<WorkflowState>,
    Path(subject_id): Path<Uuid>,
) -> Result<Json<Vec<SubmissionResponse>>> {
    let records = state.repos.submissions.find_by_subject(subject_id).await?;
    Ok(Json(records.into_iter().map(Into::into).collect()))
}

/// Get the caller's view of a submission (display status + advisory flags)
pub async fn get_submission_view(
    actor: ActorContext,
    State(state): State<WorkflowState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SubmissionView>> {
    let record = find_record(&state, id).await?;
    Ok(Json(project(&record, actor.actor_id, actor.actor_role)))
}

/// Get the audit trail of a submission
pub async fn get_submission_history(
    State(state): State<WorkflowState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<HistoryEntry>>> {
    let record = find_record(&state, id).await?;
    Ok(Json(record.history))
}

/// Submit a draft record into review
pub async fn submit_submission(
    actor: ActorContext,
    State(state): State<WorkflowState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SubmitRequest>,
) -> Result<Json<SubmissionResponse>> {
    let record = state.engine.submit(id, actor.actor_id, req.ready).await?;
    Ok(Json(record.into()))
}

/// Resubmit a returned record into review
pub async fn resubmit_submission(
    actor: ActorContext,
    State(state): State<WorkflowState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SubmitRequest>,
) -> Result<Json<SubmissionResponse>> {
    let record = state.engine.resubmit(id, actor.actor_id, req.ready).await?;
    Ok(Json(record.into()))
}

/// Record the caller's approval at the current gate
pub async fn approve_submission(
    actor: ActorContext,
    State(state): State<WorkflowState>,
    Path(id): Path<Uuid>,
    body: Option<Json<DecisionRequest>>,
) -> Result<Json<ApprovalResponse>> {
    let note = body.and_then(|Json(req)| req.note);
    let (record, outcome) = state
        .engine
        .approve(id, actor.actor_role, actor.actor_id, note)
        .await?;
    Ok(Json(ApprovalResponse {
        submission: record.into(),
        outcome,
    }))
}

/// Return the submission to the submitter with feedback
pub async fn return_submission(
    actor: ActorContext,
    State(state): State<WorkflowState>,
    Path(id): Path<Uuid>,
    body: Option<Json<DecisionRequest>>,
) -> Result<Json<SubmissionResponse>> {
    let note = body.and_then(|Json(req)| req.note);
    let record = state
        .engine
        .return_submission(id, actor.actor_role, actor.actor_id, note)
        .await?;
    Ok(Json(record.into()))
}

/// Watch a submission record (SSE stream of snapshots)
///
/// Emits one `submission` event per committed transition, starting with the
/// current snapshot, and closes once the record reaches a terminal state.
pub async fn watch_submission(
    State(state): State<WorkflowState>,
    Path(id): Path<Uuid>,
) -> Result<Sse<impl futures_core::Stream<Item = std::result::Result<Event, Infallible>>>> {
    // Reject watches on unknown records up front
    find_record(&state, id).await?;

    let updates = state.repos.submissions.watch(id).await?;
    Ok(Sse::new(snapshot_events(updates)))
}

/// Watch the active submission for a subject and workflow kind (SSE)
pub async fn watch_subject(
    State(state): State<WorkflowState>,
    Path((subject_id, kind)): Path<(Uuid, WorkflowKind)>,
) -> Result<Sse<impl futures_core::Stream<Item = std::result::Result<Event, Infallible>>>> {
    let updates = state
        .repos
        .submissions
        .watch_subject(subject_id, kind)
        .await?;
    Ok(Sse::new(snapshot_events(updates)))
}

/// Encode record snapshots as SSE events, closing after a terminal snapshot
fn snapshot_events(
    mut updates: crate::repository::SubmissionStream,
) -> impl futures_core::Stream<Item = std::result::Result<Event, Infallible>> {
    async_stream::stream! {
        while let Some(update) = updates.next().await {
            match update {
                Ok(record) => {
                    let id = record.id;
                    let terminal = record.is_terminal();
                    let data = match serde_json::to_string(&SubmissionResponse::from(record)) {
                        Ok(data) => data,
                        Err(err) => {
                            tracing::error!(error = %err, submission_id = %id, "failed to encode watch event");
                            break;
                        }
                    };
                    yield Ok(Event::default().event("submission").data(data));
                    if terminal {
                        break;
                    }
                }
                Err(err) => {
                    tracing::error!(error = %err, "watch stream failed");
                    break;
                }
            }
        }
    }
}

async fn find_record(state: &WorkflowState, id: Uuid) -> Result<SubmissionRecord> {
    state
        .repos
        .submissions
        .find(id)
        .await?
        .ok_or_else(|| Error::NotFound("Submission not found".to_string()))
}
