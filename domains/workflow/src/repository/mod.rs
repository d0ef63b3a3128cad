//! Typed store access for the workflow domain

use std::sync::Arc;

use thesistrack_store::DocumentStore;

pub mod submissions;

pub use submissions::{SubmissionRepository, SubmissionStream};

/// All repositories for the workflow domain
#[derive(Clone)]
pub struct WorkflowRepositories {
    pub submissions: SubmissionRepository,
}

impl WorkflowRepositories {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            submissions: SubmissionRepository::new(store),
        }
    }
}
