//! End-to-end workflow scenarios
//!
//! Exercises the engine's observable properties over the in-memory store:
//! gate ordering, terminal-state convergence, resubmission round-trips, and
//! panel semantics.

mod common;

use uuid::Uuid;

use common::TestApp;
use thesistrack_common::Error;
use thesistrack_workflow::{
    GateOutcome, GateStep, HistoryAction, Role, SubmissionStatus,
};

#[tokio::test]
async fn test_simple_approval_scenario() {
    let app = TestApp::new();
    let student = Uuid::new_v4();

    let record = app.submitted_chapter_submission(student).await;
    assert_eq!(record.status, SubmissionStatus::InReview);
    assert_eq!(
        record.current_gate,
        Some(GateStep::Single {
            role: Role::Adviser
        })
    );

    let (record, _) = app
        .engine
        .approve(record.id, Role::Adviser, Uuid::new_v4(), None)
        .await
        .unwrap();
    assert_eq!(record.status, SubmissionStatus::InReview);
    assert_eq!(
        record.current_gate,
        Some(GateStep::Single { role: Role::Editor })
    );

    let (record, outcome) = app
        .engine
        .approve(record.id, Role::Editor, Uuid::new_v4(), None)
        .await
        .unwrap();
    assert_eq!(outcome, GateOutcome::Completed);
    assert_eq!(record.status, SubmissionStatus::Approved);
    assert_eq!(record.current_gate, None);
    assert!(!record.locked);
}

#[tokio::test]
async fn test_out_of_turn_rejection_leaves_state_unchanged() {
    let app = TestApp::new();
    let record = app.submitted_chapter_submission(Uuid::new_v4()).await;

    let result = app
        .engine
        .approve(record.id, Role::Editor, Uuid::new_v4(), None)
        .await;
    assert!(matches!(result, Err(Error::OutOfTurn(_))));

    let current = app.repos.submissions.find(record.id).await.unwrap().unwrap();
    assert_eq!(current, record);
}

#[tokio::test]
async fn test_return_and_resubmit_scenario() {
    let app = TestApp::new();
    let student = Uuid::new_v4();
    let record = app.submitted_chapter_submission(student).await;

    app.engine
        .approve(record.id, Role::Adviser, Uuid::new_v4(), None)
        .await
        .unwrap();
    let returned = app
        .engine
        .return_submission(
            record.id,
            Role::Editor,
            Uuid::new_v4(),
            Some("fix citations".to_string()),
        )
        .await
        .unwrap();

    assert_eq!(returned.status, SubmissionStatus::Returned);
    assert_eq!(returned.return_note.as_deref(), Some("fix citations"));
    assert_eq!(returned.current_gate, None);
    assert!(!returned.locked);

    let resubmitted = app.engine.resubmit(record.id, student, true).await.unwrap();
    assert_eq!(resubmitted.status, SubmissionStatus::InReview);
    assert_eq!(resubmitted.resubmission_count, 1);
    // Reset to the first step; the adviser's earlier approval is discarded
    assert_eq!(
        resubmitted.current_gate,
        Some(GateStep::Single {
            role: Role::Adviser
        })
    );
    assert!(resubmitted.decisions.is_empty());
}

#[tokio::test]
async fn test_resubmission_round_trip_reaches_same_terminal_state() {
    let app = TestApp::new();
    let student = Uuid::new_v4();

    // Direct path
    let direct = app.submitted_chapter_submission(student).await;
    app.engine
        .approve(direct.id, Role::Adviser, Uuid::new_v4(), None)
        .await
        .unwrap();
    let (direct, _) = app
        .engine
        .approve(direct.id, Role::Editor, Uuid::new_v4(), None)
        .await
        .unwrap();

    // Round-trip path: return once, then approve through
    let round_trip = app.submitted_chapter_submission(student).await;
    app.engine
        .return_submission(round_trip.id, Role::Adviser, Uuid::new_v4(), None)
        .await
        .unwrap();
    app.engine
        .resubmit(round_trip.id, student, true)
        .await
        .unwrap();
    app.engine
        .approve(round_trip.id, Role::Adviser, Uuid::new_v4(), None)
        .await
        .unwrap();
    let (round_trip, _) = app
        .engine
        .approve(round_trip.id, Role::Editor, Uuid::new_v4(), None)
        .await
        .unwrap();

    // Both converge on the same terminal shape
    for record in [&direct, &round_trip] {
        assert_eq!(record.status, SubmissionStatus::Approved);
        assert_eq!(record.current_gate, None);
        assert!(!record.locked);
    }
    assert_eq!(direct.resubmission_count, 0);
    assert_eq!(round_trip.resubmission_count, 1);

    let actions: Vec<HistoryAction> = round_trip
        .history
        .iter()
        .map(|entry| entry.action)
        .collect();
    assert!(actions.contains(&HistoryAction::Returned));
    assert!(actions.contains(&HistoryAction::Resubmitted));
}

#[tokio::test]
async fn test_ordering_invariant_over_full_terminal_sequence() {
    let app = TestApp::new();
    let student = Uuid::new_v4();
    let panel = [Uuid::new_v4(), Uuid::new_v4()];
    let record = app.submitted_terminal_submission(student, &panel).await;

    let expected_gates = [
        Role::Panel,
        Role::Adviser,
        Role::Editor,
        Role::Statistician,
    ];

    let mut current = record;
    for (index, gate) in expected_gates.iter().enumerate() {
        assert_eq!(current.current_gate.as_ref().map(GateStep::role), Some(*gate));

        // Every later role is out of turn at this point
        for later in &expected_gates[index + 1..] {
            let actor = if *later == Role::Panel {
                panel[0]
            } else {
                Uuid::new_v4()
            };
            let result = app.engine.approve(current.id, *later, actor, None).await;
            assert!(
                matches!(result, Err(Error::OutOfTurn(_))),
                "role {later} decided before {gate}"
            );
        }

        // Satisfy the gate itself
        let deciders: Vec<Uuid> = if *gate == Role::Panel {
            panel.to_vec()
        } else {
            vec![Uuid::new_v4()]
        };
        for decider in deciders {
            let (updated, _) = app
                .engine
                .approve(current.id, *gate, decider, None)
                .await
                .unwrap();
            current = updated;
        }
    }

    assert_eq!(current.status, SubmissionStatus::Approved);
    assert_eq!(current.current_gate, None);
}

#[tokio::test]
async fn test_panel_gate_requires_every_member() {
    let app = TestApp::new();
    let panel = [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
    let record = app
        .submitted_terminal_submission(Uuid::new_v4(), &panel)
        .await;

    let (record, outcome) = app
        .engine
        .approve(record.id, Role::Panel, panel[0], None)
        .await
        .unwrap();
    assert_eq!(record.current_gate.as_ref().map(GateStep::role), Some(Role::Panel));
    assert!(matches!(outcome, GateOutcome::Advanced { .. }));

    let (record, _) = app
        .engine
        .approve(record.id, Role::Panel, panel[1], None)
        .await
        .unwrap();
    assert_eq!(record.current_gate.as_ref().map(GateStep::role), Some(Role::Panel));

    let (record, _) = app
        .engine
        .approve(record.id, Role::Panel, panel[2], None)
        .await
        .unwrap();
    assert_eq!(
        record.current_gate,
        Some(GateStep::Single {
            role: Role::Adviser
        })
    );
}

#[tokio::test]
async fn test_single_panel_member_returns_for_everyone() {
    let app = TestApp::new();
    let panel = [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
    let record = app
        .submitted_terminal_submission(Uuid::new_v4(), &panel)
        .await;

    app.engine
        .approve(record.id, Role::Panel, panel[0], None)
        .await
        .unwrap();
    let returned = app
        .engine
        .return_submission(
            record.id,
            Role::Panel,
            panel[1],
            Some("revise chapter 3".to_string()),
        )
        .await
        .unwrap();

    // No waiting for the remaining members
    assert_eq!(returned.status, SubmissionStatus::Returned);
    assert_eq!(returned.returned_by, Some(Role::Panel));
    assert!(!returned.locked);
}

#[tokio::test]
async fn test_history_only_records_accepted_transitions() {
    let app = TestApp::new();
    let student = Uuid::new_v4();
    let record = app.submitted_chapter_submission(student).await;

    // Two rejected attempts: out of turn, then invalid resubmit
    let _ = app
        .engine
        .approve(record.id, Role::Editor, Uuid::new_v4(), None)
        .await;
    let _ = app.engine.resubmit(record.id, student, true).await;

    app.engine
        .approve(record.id, Role::Adviser, Uuid::new_v4(), None)
        .await
        .unwrap();
    let (record, _) = app
        .engine
        .approve(record.id, Role::Editor, Uuid::new_v4(), None)
        .await
        .unwrap();

    let actions: Vec<HistoryAction> = record.history.iter().map(|entry| entry.action).collect();
    assert_eq!(
        actions,
        vec![
            HistoryAction::Created,
            HistoryAction::Submitted,
            HistoryAction::Approved,
            HistoryAction::Approved,
        ]
    );
}

#[tokio::test]
async fn test_duplicate_active_record_is_rejected() {
    let app = TestApp::new();
    let subject_id = Uuid::new_v4();

    app.engine
        .create(
            subject_id,
            thesistrack_workflow::WorkflowKind::ChapterReview,
            common::chapter_assignments(),
            Uuid::new_v4(),
        )
        .await
        .unwrap();

    let result = app
        .engine
        .create(
            subject_id,
            thesistrack_workflow::WorkflowKind::ChapterReview,
            common::chapter_assignments(),
            Uuid::new_v4(),
        )
        .await;
    assert!(matches!(result, Err(Error::AlreadyExists(_))));
}
