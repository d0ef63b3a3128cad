//! Role sequence policy
//!
//! Maps a workflow kind and the reviewer roles actually assigned to a subject
//! onto the ordered gate sequence the submission must clear. Pure and
//! deterministic: the priority tables are fixed, absent roles are skipped
//! (never inserted as no-op gates), and multi-member assignments become
//! panel gates requiring unanimous approval.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entities::{Role, RoleAssignment, WorkflowKind};

/// One step in the gate sequence: a single-reviewer gate, or a panel gate
/// that every named member must approve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "gate", rename_all = "snake_case")]
pub enum GateStep {
    Single { role: Role },
    Panel { role: Role, members: Vec<Uuid> },
}

impl GateStep {
    /// The role whose decision this step awaits
    pub fn role(&self) -> Role {
        match self {
            Self::Single { role } | Self::Panel { role, .. } => *role,
        }
    }
}

impl std::fmt::Display for GateStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single { role } => write!(f, "{role}"),
            Self::Panel { role, members } => write!(f, "{role} ({} members)", members.len()),
        }
    }
}

/// Fixed reviewer priority per workflow kind.
///
/// Chapter reviews are checked for statistical soundness before the adviser
/// reads them; the editor always signs off last. Terminal requirements start
/// with the defense panel and end with the statistician's verification of the
/// final data set.
pub fn gate_order(kind: WorkflowKind) -> &'static [Role] {
    match kind {
        WorkflowKind::ChapterReview => &[Role::Statistician, Role::Adviser, Role::Editor],
        WorkflowKind::TerminalRequirement => &[
            Role::Panel,
            Role::Adviser,
            Role::Editor,
            Role::Statistician,
        ],
    }
}

/// Resolve the gate sequence for a submission.
///
/// Filters the kind's priority table down to the roles present in
/// `assignments`. An assignment naming more than one member becomes a
/// [`GateStep::Panel`]; everything else is a single-reviewer gate.
pub fn resolve_gate_order(kind: WorkflowKind, assignments: &[RoleAssignment]) -> Vec<GateStep> {
    gate_order(kind)
        .iter()
        .filter_map(|role| {
            assignments
                .iter()
                .find(|assignment| assignment.role == *role)
                .map(|assignment| {
                    if assignment.members.len() > 1 {
                        GateStep::Panel {
                            role: *role,
                            members: assignment.members.clone(),
                        }
                    } else {
                        GateStep::Single { role: *role }
                    }
                })
        })
        .collect()
}
