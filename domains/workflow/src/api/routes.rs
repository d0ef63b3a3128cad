//! Route definitions for the workflow domain API

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::submissions;
use super::middleware::WorkflowState;

/// Create all workflow domain API routes
pub fn routes() -> Router<WorkflowState> {
    Router::new()
        .route("/v1/submissions", post(submissions::create_submission))
        .route("/v1/submissions/{id}", get(submissions::get_submission))
        .route("/v1/submissions/{id}/view", get(submissions::get_submission_view))
        .route(
            "/v1/submissions/{id}/history",
            get(submissions::get_submission_history),
        )
        .route("/v1/submissions/{id}/submit", post(submissions::submit_submission))
        .route(
            "/v1/submissions/{id}/resubmit",
            post(submissions::resubmit_submission),
        )
        .route(
            "/v1/submissions/{id}/approve",
            post(submissions::approve_submission),
        )
        .route(
            "/v1/submissions/{id}/return",
            post(submissions::return_submission),
        )
        .route("/v1/submissions/{id}/events", get(submissions::watch_submission))
        .route(
            "/v1/subjects/{subject_id}/submissions",
            get(submissions::list_subject_submissions),
        )
        .route(
            "/v1/subjects/{subject_id}/submissions/{kind}/events",
            get(submissions::watch_subject),
        )
}
