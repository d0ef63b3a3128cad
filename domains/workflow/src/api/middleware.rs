//! Workflow domain state and caller identity extraction

use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use thesistrack_common::{Error, Result};
use thesistrack_store::DocumentStore;

use crate::domain::entities::Role;
use crate::engine::TransitionEngine;
use crate::repository::WorkflowRepositories;

/// Application state for the workflow domain
#[derive(Clone)]
pub struct WorkflowState {
    pub repos: WorkflowRepositories,
    pub engine: TransitionEngine,
}

impl WorkflowState {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let repos = WorkflowRepositories::new(store);
        let engine = TransitionEngine::new(repos.clone());
        Self { repos, engine }
    }
}

/// Caller identity, asserted by the authenticating gateway upstream.
///
/// The workflow service trusts these headers as already authenticated and
/// performs role-assignment checks only; session management is not its
/// concern.
#[derive(Debug, Clone)]
pub struct ActorContext {
    pub actor_id: Uuid,
    pub actor_role: Role,
}

impl<S> FromRequestParts<S> for ActorContext
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        let actor_id = parts
            .headers
            .get("x-actor-id")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| Error::Validation("missing x-actor-id header".to_string()))?
            .parse::<Uuid>()
            .map_err(|_| Error::Validation("x-actor-id must be a UUID".to_string()))?;

        let actor_role = parts
            .headers
            .get("x-actor-role")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| Error::Validation("missing x-actor-role header".to_string()))?
            .parse::<Role>()?;

        Ok(ActorContext {
            actor_id,
            actor_role,
        })
    }
}
