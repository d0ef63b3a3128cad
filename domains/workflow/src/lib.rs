//! Workflow domain: multi-role approval gates for thesis submissions
//!
//! A submission record moves through an ordered sequence of reviewer gates.
//! Each gate approves (advancing the sequence) or returns the record to the
//! submitter; a returned record can be resubmitted, which restarts the gate
//! sequence. All mutations go through [`engine::TransitionEngine`], which
//! serializes concurrent decisions with a compare-and-swap discipline.

pub mod api;
pub mod domain;
pub mod engine;
pub mod repository;

// Re-export domain types at the crate root for convenience
pub use api::routes::routes;
pub use api::middleware::WorkflowState;
pub use domain::entities::*;
pub use domain::policy::{gate_order, resolve_gate_order, GateStep};
pub use domain::projection::{project, DisplayStatus, SubmissionView};
pub use domain::state::{StateError, SubmissionEvent, SubmissionState, SubmissionStateMachine};
pub use engine::TransitionEngine;
pub use repository::{SubmissionRepository, WorkflowRepositories};
