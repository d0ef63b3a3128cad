//! Router-level API tests
//!
//! Drives the assembled application over `tower::ServiceExt::oneshot`,
//! asserting response shapes, identity-header extraction, and the error
//! body contract.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use common::{authed_request, TestApp};
use thesistrack_workflow::{Role, SubmissionStatus};

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new();
    let response = app
        .router()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_full_workflow_over_http() {
    let app = TestApp::new();
    let router = app.router();
    let student = Uuid::new_v4();
    let subject_id = Uuid::new_v4();

    // Create
    let response = router
        .clone()
        .oneshot(authed_request(
            "POST",
            "/v1/submissions",
            student,
            "student",
            Some(json!({
                "subject_id": subject_id,
                "kind": "chapter_review",
                "assignments": [
                    {"role": "adviser"},
                    {"role": "editor"}
                ]
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["status"], "draft");
    let id = body["id"].as_str().unwrap().to_string();

    // Submit
    let response = router
        .clone()
        .oneshot(authed_request(
            "POST",
            &format!("/v1/submissions/{id}/submit"),
            student,
            "student",
            Some(json!({"ready": true})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "in_review");
    assert_eq!(body["current_gate"]["role"], "adviser");
    assert_eq!(body["locked"], true);

    // Adviser approves
    let response = router
        .clone()
        .oneshot(authed_request(
            "POST",
            &format!("/v1/submissions/{id}/approve"),
            Uuid::new_v4(),
            "adviser",
            Some(json!({})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["submission"]["current_gate"]["role"], "editor");
    assert_eq!(body["outcome"]["Advanced"]["next"]["role"], "editor");

    // Editor approves; the workflow completes
    let response = router
        .clone()
        .oneshot(authed_request(
            "POST",
            &format!("/v1/submissions/{id}/approve"),
            Uuid::new_v4(),
            "editor",
            Some(json!({})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["submission"]["status"], "approved");
    assert_eq!(body["outcome"], json!("Completed"));

    // Final state via GET
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/v1/submissions/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["status"], "approved");
    assert_eq!(body["locked"], false);
    assert_eq!(body["current_gate"], Value::Null);
}

#[tokio::test]
async fn test_out_of_turn_error_body_names_the_kind() {
    let app = TestApp::new();
    let record = app.submitted_chapter_submission(Uuid::new_v4()).await;
    let router = app.router();

    let response = router
        .oneshot(authed_request(
            "POST",
            &format!("/v1/submissions/{}/approve", record.id),
            Uuid::new_v4(),
            "editor",
            Some(json!({})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "OUT_OF_TURN");
    assert!(body["error"]["message"].as_str().unwrap().contains("adviser"));
}

#[tokio::test]
async fn test_unassigned_role_is_forbidden() {
    let app = TestApp::new();
    let record = app.submitted_chapter_submission(Uuid::new_v4()).await;
    let router = app.router();

    let response = router
        .oneshot(authed_request(
            "POST",
            &format!("/v1/submissions/{}/approve", record.id),
            Uuid::new_v4(),
            "statistician",
            Some(json!({})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "NOT_ASSIGNED");
}

#[tokio::test]
async fn test_missing_identity_headers_are_rejected() {
    let app = TestApp::new();
    let record = app.submitted_chapter_submission(Uuid::new_v4()).await;
    let router = app.router();

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/v1/submissions/{}/approve", record.id))
                .header("content-type", "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_view_reflects_the_caller() {
    let app = TestApp::new();
    let record = app.submitted_chapter_submission(Uuid::new_v4()).await;
    let router = app.router();

    // The adviser gates now and may decide
    let response = router
        .clone()
        .oneshot(authed_request(
            "GET",
            &format!("/v1/submissions/{}/view", record.id),
            Uuid::new_v4(),
            "adviser",
            None,
        ))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["status"], "awaiting_review");
    assert_eq!(body["can_decide"], true);

    // The student sees a locked submission
    let response = router
        .clone()
        .oneshot(authed_request(
            "GET",
            &format!("/v1/submissions/{}/view", record.id),
            Uuid::new_v4(),
            "student",
            None,
        ))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["status"], "locked");
    assert_eq!(body["can_decide"], false);
}

#[tokio::test]
async fn test_history_endpoint_returns_the_audit_trail() {
    let app = TestApp::new();
    let record = app.submitted_chapter_submission(Uuid::new_v4()).await;
    app.engine
        .approve(record.id, Role::Adviser, Uuid::new_v4(), None)
        .await
        .unwrap();
    let router = app.router();

    let response = router
        .oneshot(
            Request::builder()
                .uri(format!("/v1/submissions/{}/history", record.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let actions: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["action"].as_str().unwrap())
        .collect();
    assert_eq!(actions, vec!["created", "submitted", "approved"]);
}

#[tokio::test]
async fn test_get_missing_submission_is_not_found() {
    let app = TestApp::new();
    let router = app.router();

    let response = router
        .oneshot(
            Request::builder()
                .uri(format!("/v1/submissions/{}", Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_subject_listing_spans_review_cycles() {
    let app = TestApp::new();
    let student = Uuid::new_v4();
    let subject_id = Uuid::new_v4();

    // First cycle runs to approval
    let first = app
        .engine
        .create(
            subject_id,
            thesistrack_workflow::WorkflowKind::ChapterReview,
            common::chapter_assignments(),
            student,
        )
        .await
        .unwrap();
    app.engine.submit(first.id, student, true).await.unwrap();
    app.engine
        .approve(first.id, Role::Adviser, Uuid::new_v4(), None)
        .await
        .unwrap();
    let (first, _) = app
        .engine
        .approve(first.id, Role::Editor, Uuid::new_v4(), None)
        .await
        .unwrap();
    assert_eq!(first.status, SubmissionStatus::Approved);

    // Second cycle begins fresh
    app.engine
        .create(
            subject_id,
            thesistrack_workflow::WorkflowKind::ChapterReview,
            common::chapter_assignments(),
            student,
        )
        .await
        .unwrap();

    let router = app.router();
    let response = router
        .oneshot(
            Request::builder()
                .uri(format!("/v1/subjects/{subject_id}/submissions"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = json_body(response).await;
    let listed = body.as_array().unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0]["status"], "approved");
    assert_eq!(listed[1]["status"], "draft");
}
