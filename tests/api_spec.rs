use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};

use rehearsal::api::{create_router, AppState};
use rehearsal::config::{CacheConfig, CoachConfig};
use rehearsal::generator::ScriptedGenerator;
use rehearsal::models::{Case, CaseMetaData, CreateCaseInput};
use rehearsal::orchestrator::Coach;
use rehearsal::scoring::FixedScorer;
use rehearsal::Database;

const USER: HeaderName = HeaderName::from_static("x-user-id");

fn create_case(db: &Database, order_index: i64, name: &str) -> Case {
    db.insert_case(CreateCaseInput {
        customer_name: name.into(),
        intro: format!("{name} is shopping around"),
        avatar: "/avatars/test.png".into(),
        order_index,
        meta_data: CaseMetaData {
            budget: "$20k".into(),
            decision_level: "Manager".into(),
            personality: vec!["direct".into()],
            points: vec!["price".into()],
            background: "Buys for a mid-sized company.".into(),
        },
        script: None,
    })
    .expect("Failed to insert case")
}

/// Server with two cases; the persona closes on the second trainee message.
fn setup() -> (TestServer, Database, Vec<Case>) {
    let db = Database::open_memory().expect("Failed to create test database");
    db.migrate().expect("Failed to migrate");
    let cases = vec![create_case(&db, 1, "Mr. Zhang"), create_case(&db, 2, "Ms. Li")];

    let coach = Coach::new(
        db.clone(),
        Arc::new(ScriptedGenerator::new(2)),
        Arc::new(FixedScorer(88)),
        CoachConfig::default(),
    );
    let app = create_router(AppState::new(coach, &CacheConfig::default()));
    let server = TestServer::new(app).expect("Failed to start test server");
    (server, db, cases)
}

fn alice() -> HeaderValue {
    HeaderValue::from_static("alice")
}

#[tokio::test]
async fn health_reports_generator_and_case_count() {
    let (server, _, _) = setup();

    let response = server.get("/api/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["generator"], "scripted");
    assert_eq!(body["data"]["cases"], 2);
}

#[tokio::test]
async fn requests_without_a_user_are_rejected() {
    let (server, _, _) = setup();

    let response = server.get("/api/progress").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["kind"], "authentication");
}

#[tokio::test]
async fn user_can_come_from_the_cookie() {
    let (server, _, _) = setup();

    let response = server
        .get("/api/progress")
        .add_header(
            HeaderName::from_static("cookie"),
            HeaderValue::from_static("userId=bob"),
        )
        .await;
    response.assert_status_ok();
}

#[tokio::test]
async fn lists_cases_in_order() {
    let (server, _, cases) = setup();

    let response = server.get("/api/cases").add_header(USER, alice()).await;
    response.assert_status_ok();
    let body: Value = response.json();
    let listed = body["data"].as_array().unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0]["id"], cases[0].id.to_string());
    assert_eq!(listed[0]["orderIndex"], 1);
    assert_eq!(listed[0]["metaData"]["decisionLevel"], "Manager");
}

#[tokio::test]
async fn unknown_case_is_not_found() {
    let (server, _, _) = setup();

    let response = server
        .get(&format!("/api/cases/{}", uuid::Uuid::new_v4()))
        .add_header(USER, alice())
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["error"]["kind"], "not_found");

    let response = server
        .get("/api/cases/not-an-id/current-attempt")
        .add_header(USER, alice())
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn chat_requires_case_and_message() {
    let (server, _, cases) = setup();

    let response = server
        .post("/api/chat")
        .add_header(USER, alice())
        .json(&json!({ "message": "hello" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"]["kind"], "validation");

    let response = server
        .post("/api/chat")
        .add_header(USER, alice())
        .json(&json!({ "caseId": cases[0].id, "message": "   " }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn fresh_user_sees_first_case_unlocked() {
    let (server, _, _) = setup();

    let response = server.get("/api/progress").add_header(USER, alice()).await;
    response.assert_status_ok();
    let body: Value = response.json();
    let entries = body["data"]["cases"].as_array().unwrap();
    assert_eq!(entries[0]["isLocked"], false);
    assert_eq!(entries[1]["isLocked"], true);
    assert_eq!(entries[0]["progress"]["isCompleted"], false);
    assert_eq!(body["data"]["summary"]["totalCases"], 2);
    assert_eq!(body["data"]["summary"]["maxTotalStars"], 10);
}

#[tokio::test]
async fn full_conversation_unlocks_the_next_case() {
    let (server, _, cases) = setup();
    let case_id = cases[0].id;

    // Prime the progress cache so completion has to invalidate it.
    server.get("/api/progress").add_header(USER, alice()).await.assert_status_ok();

    let first = server
        .post("/api/chat")
        .add_header(USER, alice())
        .json(&json!({ "caseId": case_id, "message": "Hi, thanks for meeting me.", "conversationHistory": [] }))
        .await;
    first.assert_status_ok();
    let first: Value = first.json();
    assert_eq!(first["data"]["isComplete"], false);
    assert!(first["data"].get("result").is_none());
    assert_eq!(first["data"]["conversationHistory"].as_array().unwrap().len(), 2);

    let resumed: Value = server
        .get(&format!("/api/cases/{case_id}/current-attempt"))
        .add_header(USER, alice())
        .await
        .json();
    assert_eq!(resumed["data"]["hasAttempt"], true);
    assert_eq!(resumed["data"]["messages"], first["data"]["conversationHistory"]);

    let second = server
        .post("/api/chat")
        .add_header(USER, alice())
        .json(&json!({ "caseId": case_id, "message": "What would make this worth it for you?" }))
        .await;
    second.assert_status_ok();
    let second: Value = second.json();
    assert_eq!(second["data"]["isComplete"], true);
    assert_eq!(second["data"]["result"]["score"], 88);
    assert_eq!(second["data"]["result"]["stars"], 4);
    assert_eq!(second["data"]["result"]["totalAttempts"], 1);
    assert_eq!(second["data"]["result"]["bestScore"], 88);

    let progress: Value = server.get("/api/progress").add_header(USER, alice()).await.json();
    let entries = progress["data"]["cases"].as_array().unwrap();
    assert_eq!(entries[0]["progress"]["isCompleted"], true);
    assert_eq!(entries[0]["progress"]["bestStars"], 4);
    assert_eq!(entries[1]["isLocked"], false);
    assert_eq!(progress["data"]["summary"]["completedCount"], 1);
    assert_eq!(progress["data"]["summary"]["totalStars"], 4);
    assert_eq!(progress["data"]["summary"]["completionPercentage"], 40);

    let history: Value = server
        .get(&format!("/api/cases/{case_id}/attempts"))
        .add_header(USER, alice())
        .await
        .json();
    assert_eq!(history["data"].as_array().unwrap().len(), 1);
    assert_eq!(history["data"][0]["messageCount"], 4);
}

#[tokio::test]
async fn abandon_clears_the_current_attempt() {
    let (server, _, cases) = setup();
    let case_id = cases[0].id;

    server
        .post("/api/chat")
        .add_header(USER, alice())
        .json(&json!({ "caseId": case_id, "message": "Hello" }))
        .await
        .assert_status_ok();

    let abandoned: Value = server
        .post(&format!("/api/cases/{case_id}/abandon-attempt"))
        .add_header(USER, alice())
        .await
        .json();
    assert_eq!(abandoned["data"]["deletedCount"], 1);

    let current: Value = server
        .get(&format!("/api/cases/{case_id}/current-attempt"))
        .add_header(USER, alice())
        .await
        .json();
    assert_eq!(current["data"]["hasAttempt"], false);
    assert_eq!(current["data"]["messages"], json!([]));

    let again: Value = server
        .post(&format!("/api/cases/{case_id}/abandon-attempt"))
        .add_header(USER, alice())
        .await
        .json();
    assert_eq!(again["data"]["deletedCount"], 0);
}

#[tokio::test]
async fn users_do_not_see_each_others_attempts() {
    let (server, _, cases) = setup();
    let case_id = cases[0].id;

    server
        .post("/api/chat")
        .add_header(USER, alice())
        .json(&json!({ "caseId": case_id, "message": "Hello" }))
        .await
        .assert_status_ok();

    let other: Value = server
        .get(&format!("/api/cases/{case_id}/current-attempt"))
        .add_header(USER, HeaderValue::from_static("carol"))
        .await
        .json();
    assert_eq!(other["data"]["hasAttempt"], false);
}
