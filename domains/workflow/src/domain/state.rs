//! State machine for submission records
//!
//! The submission lifecycle is:
//! - `draft → in_review` on submit
//! - `in_review → approved` when the last gate approves (terminal)
//! - `in_review → returned` when any gating reviewer returns
//! - `returned → in_review` on resubmit

use thiserror::Error;

/// Errors that can occur during state transitions
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StateError {
    #[error("Invalid transition: cannot apply {event} from {from}")]
    InvalidTransition { from: String, event: String },

    #[error("Terminal state: {0} is a terminal state and cannot transition")]
    TerminalState(String),
}

/// Submission lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubmissionState {
    Draft,
    InReview,
    Returned,
    Approved,
}

impl SubmissionState {
    /// Check if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved)
    }

    /// Get all valid next states from current state
    pub fn valid_transitions(&self) -> &'static [SubmissionState] {
        match self {
            Self::Draft => &[Self::InReview],
            Self::InReview => &[Self::Approved, Self::Returned],
            Self::Returned => &[Self::InReview],
            Self::Approved => &[],
        }
    }
}

impl std::fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Draft => write!(f, "draft"),
            Self::InReview => write!(f, "in_review"),
            Self::Returned => write!(f, "returned"),
            Self::Approved => write!(f, "approved"),
        }
    }
}

/// Events that trigger submission state transitions
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionEvent {
    /// Submitter sends the record into review for the first time
    Submit,
    /// Submitter re-enters review after being returned
    Resubmit,
    /// The final gate in the sequence approves unanimously
    FinalApproval,
    /// A gating reviewer sends the record back to the submitter
    Return,
}

impl std::fmt::Display for SubmissionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Submit => write!(f, "submit"),
            Self::Resubmit => write!(f, "resubmit"),
            Self::FinalApproval => write!(f, "final_approval"),
            Self::Return => write!(f, "return"),
        }
    }
}

/// Submission state machine
pub struct SubmissionStateMachine;

impl SubmissionStateMachine {
    /// Attempt a state transition
    ///
    /// Returns the new state if the transition is valid, or an error otherwise.
    pub fn transition(
        current: SubmissionState,
        event: SubmissionEvent,
    ) -> Result<SubmissionState, StateError> {
        if current.is_terminal() {
            return Err(StateError::TerminalState(current.to_string()));
        }

        let next = match (&current, &event) {
            (SubmissionState::Draft, SubmissionEvent::Submit) => SubmissionState::InReview,
            (SubmissionState::Returned, SubmissionEvent::Resubmit) => SubmissionState::InReview,

            (SubmissionState::InReview, SubmissionEvent::FinalApproval) => {
                SubmissionState::Approved
            }
            (SubmissionState::InReview, SubmissionEvent::Return) => SubmissionState::Returned,

            _ => {
                return Err(StateError::InvalidTransition {
                    from: current.to_string(),
                    event: event.to_string(),
                });
            }
        };

        Ok(next)
    }

    /// Check if a transition is valid without performing it
    pub fn can_transition(current: SubmissionState, event: &SubmissionEvent) -> bool {
        Self::transition(current, event.clone()).is_ok()
    }
}
