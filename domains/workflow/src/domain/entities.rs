//! Workflow domain entities
//!
//! The central entity is [`SubmissionRecord`]: one unit of work moving
//! through the multi-role approval workflow for a subject (a chapter or a
//! thesis stage). All transition rules live on the record itself as pure
//! mutation methods; persistence and concurrency control are layered on top
//! by the repository and the transition engine.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use thesistrack_common::{Error, Result};

use crate::domain::policy::{gate_order, resolve_gate_order, GateStep};
use crate::domain::state::{
    StateError, SubmissionEvent, SubmissionState, SubmissionStateMachine,
};

/// Actor roles known to the portal
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Adviser,
    Editor,
    Statistician,
    Panel,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Student => write!(f, "student"),
            Self::Adviser => write!(f, "adviser"),
            Self::Editor => write!(f, "editor"),
            Self::Statistician => write!(f, "statistician"),
            Self::Panel => write!(f, "panel"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "student" => Ok(Self::Student),
            "adviser" => Ok(Self::Adviser),
            "editor" => Ok(Self::Editor),
            "statistician" => Ok(Self::Statistician),
            "panel" => Ok(Self::Panel),
            other => Err(Error::Validation(format!("unknown role '{other}'"))),
        }
    }
}

/// The two workflow kinds the portal runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowKind {
    ChapterReview,
    TerminalRequirement,
}

impl std::fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ChapterReview => write!(f, "chapter_review"),
            Self::TerminalRequirement => write!(f, "terminal_requirement"),
        }
    }
}

/// A reviewer role assigned to a subject.
///
/// `members` names the individuals who hold the seat. An empty list means any
/// authenticated holder of the role may decide; more than one member makes
/// the role a panel gate requiring unanimous approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub role: Role,
    #[serde(default)]
    pub members: Vec<Uuid>,
}

impl RoleAssignment {
    /// Role decided by any one holder
    pub fn any_holder(role: Role) -> Self {
        Self {
            role,
            members: Vec::new(),
        }
    }

    /// Role decided by the named members, unanimously
    pub fn panel(role: Role, members: Vec<Uuid>) -> Self {
        Self { role, members }
    }
}

/// Submission status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    #[default]
    Draft,
    InReview,
    Returned,
    Approved,
}

impl SubmissionStatus {
    /// Check if status is terminal (the workflow has finished)
    pub fn is_terminal(&self) -> bool {
        self.to_state().is_terminal()
    }

    /// Convert to state machine state
    pub fn to_state(&self) -> SubmissionState {
        match self {
            SubmissionStatus::Draft => SubmissionState::Draft,
            SubmissionStatus::InReview => SubmissionState::InReview,
            SubmissionStatus::Returned => SubmissionState::Returned,
            SubmissionStatus::Approved => SubmissionState::Approved,
        }
    }

    /// Create from state machine state
    pub fn from_state(state: SubmissionState) -> Self {
        match state {
            SubmissionState::Draft => SubmissionStatus::Draft,
            SubmissionState::InReview => SubmissionStatus::InReview,
            SubmissionState::Returned => SubmissionStatus::Returned,
            SubmissionState::Approved => SubmissionStatus::Approved,
        }
    }
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_state())
    }
}

/// Outcome of one member's decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionOutcome {
    Approved,
    Returned,
}

/// One member's recorded decision for the current attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberDecision {
    pub outcome: DecisionOutcome,
    pub decided_by: Uuid,
    pub decided_at: DateTime<Utc>,
    pub note: Option<String>,
}

/// A role's decisions, keyed by member identity.
///
/// Single-reviewer roles hold exactly one entry; panel roles accumulate one
/// entry per member.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RoleDecision {
    pub entries: BTreeMap<Uuid, MemberDecision>,
}

/// Audit trail actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryAction {
    Created,
    Submitted,
    Approved,
    Returned,
    Resubmitted,
}

impl std::fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Submitted => write!(f, "submitted"),
            Self::Approved => write!(f, "approved"),
            Self::Returned => write!(f, "returned"),
            Self::Resubmitted => write!(f, "resubmitted"),
        }
    }
}

/// One accepted transition, as recorded in the audit trail. Entries are
/// append-only and immutable once written; rejected attempts produce none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub actor_id: Uuid,
    pub actor_role: Role,
    pub action: HistoryAction,
    pub message: Option<String>,
}

/// What an accepted approval did to the gate sequence. Returned to callers
/// so they can drive notifications (tell the next gate it is their turn, or
/// tell the submitter the workflow completed).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum GateOutcome {
    /// The sequence advanced; the named step now awaits a decision
    Advanced { next: GateStep },
    /// Every gate has unanimously approved; the submission is final
    Completed,
}

/// The persistent state of one workflow attempt for one subject entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub id: Uuid,
    pub subject_id: Uuid,
    pub kind: WorkflowKind,
    /// Fixed at creation; a different reviewer set requires a new record
    pub assignments: Vec<RoleAssignment>,
    pub status: SubmissionStatus,
    /// The step currently awaiting a decision; `None` unless in review
    pub current_gate: Option<GateStep>,
    /// While locked the submitter must not mutate the underlying content
    pub locked: bool,
    pub decisions: BTreeMap<Role, RoleDecision>,
    pub returned_by: Option<Role>,
    pub returned_at: Option<DateTime<Utc>>,
    pub return_note: Option<String>,
    pub resubmission_count: u32,
    pub history: Vec<HistoryEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SubmissionRecord {
    /// Create a new record in `draft` with validation of the reviewer set.
    pub fn new(
        subject_id: Uuid,
        kind: WorkflowKind,
        assignments: Vec<RoleAssignment>,
        created_by: Uuid,
    ) -> Result<Self> {
        if assignments.is_empty() {
            return Err(Error::Validation(
                "at least one reviewer role must be assigned".to_string(),
            ));
        }

        let mut seen = BTreeSet::new();
        for assignment in &assignments {
            if !seen.insert(assignment.role) {
                return Err(Error::Validation(format!(
                    "role '{}' is assigned more than once",
                    assignment.role
                )));
            }
            if !gate_order(kind).contains(&assignment.role) {
                return Err(Error::Validation(format!(
                    "role '{}' has no gate in {} workflows",
                    assignment.role, kind
                )));
            }
            let unique_members: BTreeSet<&Uuid> = assignment.members.iter().collect();
            if unique_members.len() != assignment.members.len() {
                return Err(Error::Validation(format!(
                    "duplicate members in the '{}' assignment",
                    assignment.role
                )));
            }
        }

        let now = Utc::now();
        let mut record = SubmissionRecord {
            id: Uuid::new_v4(),
            subject_id,
            kind,
            assignments,
            status: SubmissionStatus::default(),
            current_gate: None,
            locked: false,
            decisions: BTreeMap::new(),
            returned_by: None,
            returned_at: None,
            return_note: None,
            resubmission_count: 0,
            history: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        record.push_history(now, created_by, Role::Student, HistoryAction::Created, None);
        Ok(record)
    }

    /// Check if the workflow has finished
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// The full gate sequence for this record's kind and reviewer set
    pub fn gate_sequence(&self) -> Vec<GateStep> {
        resolve_gate_order(self.kind, &self.assignments)
    }

    /// Send the record into review.
    ///
    /// Valid from `draft` (first submission) and `returned` (resubmission).
    /// A resubmission discards every prior decision and restarts the gate
    /// sequence from the first step.
    pub fn submit(&mut self, actor_id: Uuid, ready: bool) -> Result<()> {
        let resubmission = self.status == SubmissionStatus::Returned;
        let event = if resubmission {
            SubmissionEvent::Resubmit
        } else {
            SubmissionEvent::Submit
        };
        let next = self.apply_transition(event)?;

        if !ready {
            return Err(Error::NotReady(
                "required submission content is incomplete".to_string(),
            ));
        }

        if resubmission {
            self.decisions.clear();
            self.resubmission_count += 1;
            self.returned_by = None;
            self.returned_at = None;
            self.return_note = None;
        }

        self.status = SubmissionStatus::from_state(next);
        self.locked = true;
        self.recompute_gate();

        let action = if resubmission {
            HistoryAction::Resubmitted
        } else {
            HistoryAction::Submitted
        };
        let now = Utc::now();
        self.push_history(now, actor_id, Role::Student, action, None);
        self.updated_at = now;
        Ok(())
    }

    /// Record one member's approval at the current gate.
    ///
    /// The gate advances once its decision is unanimous; when the last gate
    /// approves, the record reaches `approved` and unlocks.
    pub fn approve(&mut self, role: Role, actor_id: Uuid, note: Option<String>) -> Result<GateOutcome> {
        if self.status != SubmissionStatus::InReview {
            return Err(Error::InvalidState(format!(
                "cannot approve a submission in state '{}'",
                self.status
            )));
        }
        self.check_standing(role, actor_id)?;
        let gate = self
            .current_gate
            .clone()
            .ok_or_else(|| Error::Internal("in-review submission has no awaiting gate".to_string()))?;
        if gate.role() != role {
            return Err(Error::OutOfTurn(format!(
                "the current gate is '{}', not '{}'",
                gate.role(),
                role
            )));
        }
        if self
            .decisions
            .get(&role)
            .is_some_and(|decision| decision.entries.contains_key(&actor_id))
        {
            return Err(Error::AlreadyDecided(format!(
                "actor {actor_id} has already decided at the '{role}' gate for this attempt"
            )));
        }

        let now = Utc::now();
        self.decisions.entry(role).or_default().entries.insert(
            actor_id,
            MemberDecision {
                outcome: DecisionOutcome::Approved,
                decided_by: actor_id,
                decided_at: now,
                note: note.clone(),
            },
        );
        self.push_history(now, actor_id, role, HistoryAction::Approved, note);
        self.recompute_gate();
        self.updated_at = now;

        match self.current_gate.clone() {
            Some(next) => Ok(GateOutcome::Advanced { next }),
            None => {
                let final_state = self.apply_transition(SubmissionEvent::FinalApproval)?;
                self.status = SubmissionStatus::from_state(final_state);
                self.locked = false;
                Ok(GateOutcome::Completed)
            }
        }
    }

    /// Return the record to the submitter with feedback.
    ///
    /// Any single member of the current gate may return unilaterally;
    /// rejection is not subject to quorum.
    pub fn return_to_submitter(
        &mut self,
        role: Role,
        actor_id: Uuid,
        note: Option<String>,
    ) -> Result<()> {
        if self.status != SubmissionStatus::InReview {
            return Err(Error::InvalidState(format!(
                "cannot return a submission in state '{}'",
                self.status
            )));
        }
        self.check_standing(role, actor_id)?;
        let gate = self
            .current_gate
            .clone()
            .ok_or_else(|| Error::Internal("in-review submission has no awaiting gate".to_string()))?;
        if gate.role() != role {
            return Err(Error::OutOfTurn(format!(
                "the current gate is '{}', not '{}'",
                gate.role(),
                role
            )));
        }

        let next = self.apply_transition(SubmissionEvent::Return)?;
        let now = Utc::now();
        self.decisions.entry(role).or_default().entries.insert(
            actor_id,
            MemberDecision {
                outcome: DecisionOutcome::Returned,
                decided_by: actor_id,
                decided_at: now,
                note: note.clone(),
            },
        );
        self.status = SubmissionStatus::from_state(next);
        self.locked = false;
        self.current_gate = None;
        self.returned_by = Some(role);
        self.returned_at = Some(now);
        self.return_note = note.clone();
        self.push_history(now, actor_id, role, HistoryAction::Returned, note);
        self.updated_at = now;
        Ok(())
    }

    /// Whether `actor_id` holds standing to decide as `role` on this record
    fn check_standing(&self, role: Role, actor_id: Uuid) -> Result<()> {
        let assignment = self
            .assignments
            .iter()
            .find(|assignment| assignment.role == role)
            .ok_or_else(|| {
                Error::NotAssigned(format!(
                    "role '{role}' has no standing in this workflow"
                ))
            })?;
        if !assignment.members.is_empty() && !assignment.members.contains(&actor_id) {
            return Err(Error::NotAssigned(format!(
                "actor {actor_id} is not a named member of the '{role}' gate"
            )));
        }
        Ok(())
    }

    /// Whether `step` has been unanimously approved for the current attempt
    fn step_approved(&self, step: &GateStep) -> bool {
        match step {
            GateStep::Single { role } => self.decisions.get(role).is_some_and(|decision| {
                decision
                    .entries
                    .values()
                    .any(|entry| entry.outcome == DecisionOutcome::Approved)
            }),
            GateStep::Panel { role, members } => {
                self.decisions.get(role).is_some_and(|decision| {
                    members.iter().all(|member| {
                        decision
                            .entries
                            .get(member)
                            .is_some_and(|entry| entry.outcome == DecisionOutcome::Approved)
                    })
                })
            }
        }
    }

    /// Restore the currentGate invariant: the first step in policy order not
    /// yet fully approved, or `None` outside review.
    fn recompute_gate(&mut self) {
        let next = if self.status == SubmissionStatus::InReview {
            self.gate_sequence()
                .into_iter()
                .find(|step| !self.step_approved(step))
        } else {
            None
        };
        self.current_gate = next;
    }

    fn push_history(
        &mut self,
        timestamp: DateTime<Utc>,
        actor_id: Uuid,
        actor_role: Role,
        action: HistoryAction,
        message: Option<String>,
    ) {
        self.history.push(HistoryEntry {
            timestamp,
            actor_id,
            actor_role,
            action,
            message,
        });
    }

    /// Apply a state transition using the state machine
    fn apply_transition(&self, event: SubmissionEvent) -> Result<SubmissionState> {
        SubmissionStateMachine::transition(self.status.to_state(), event).map_err(|e| match e {
            StateError::InvalidTransition { from, event } => Error::InvalidState(format!(
                "cannot {event} a submission in state '{from}'"
            )),
            StateError::TerminalState(state) => Error::InvalidState(format!(
                "submission is in terminal state '{state}'"
            )),
        })
    }
}
