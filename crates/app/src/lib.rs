//! ThesisTrack application composition root
//!
//! Composes the workflow domain router over a document store into a single
//! application.

use std::sync::Arc;

use axum::Router;
use thesistrack_store::DocumentStore;
use thesistrack_workflow::WorkflowState;

/// Create the main application router with all routes
pub fn create_app(store: Arc<dyn DocumentStore>) -> Router {
    let workflow_state = WorkflowState::new(store);

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .route(
            "/",
            axum::routing::get(|| async { "ThesisTrack API v0.1.0" }),
        )
        .merge(thesistrack_workflow::routes().with_state(workflow_state))
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
