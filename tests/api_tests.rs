// tests/api_tests.rs

use std::sync::Arc;

use proctor::{
    config::Config,
    engine::AttemptRegistry,
    routes,
    state::AppState,
    store::MemorySessionStore,
    utils::jwt::sign_jwt,
};
use serde_json::{Value, json};

const SECRET: &str = "test_secret_for_integration_tests";

/// Helper function to spawn the app on a random port for testing.
/// Returns the base URL (e.g., "http://127.0.0.1:12345").
async fn spawn_app() -> String {
    let config = Config {
        database_url: None,
        jwt_secret: SECRET.to_string(),
        rust_log: "error".to_string(),
        port: 0,
        log_dir: "logs".to_string(),
        cors_origins: vec!["http://localhost:3000".to_string()],
        default_duration_secs: Some(3600),
        warning_ttl_ms: 3000,
    };

    let state = AppState {
        store: Arc::new(MemorySessionStore::new()),
        attempts: AttemptRegistry::new(),
        config,
    };

    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}

fn token_for(student: &str) -> String {
    sign_jwt(student, "student", SECRET, 600).unwrap()
}

fn questions() -> Value {
    json!({
        "questions": [
            {
                "questionText": "What is 2 + 2?",
                "options": ["3", "4", "5", "6"],
                "correctAnswer": "4",
                "explanation": "Basic addition."
            },
            {
                "questionText": "Which gas do plants absorb?",
                "options": ["Oxygen", "Carbon dioxide", "Nitrogen"],
                "correctAnswer": "Carbon dioxide",
                "explanation": "Photosynthesis consumes CO2."
            },
            {
                "questionText": "What is $\\sqrt{16}$?",
                "options": ["2", "4", "8"],
                "correctAnswer": "4",
                "explanation": "$4^2 = 16$"
            }
        ]
    })
}

/// Creates a draft and processes the three questions above. Returns the id.
async fn active_session(client: &reqwest::Client, address: &str, token: &str) -> String {
    let created: Value = client
        .post(format!("{}/api/sessions", address))
        .bearer_auth(token)
        .json(&json!({ "title": "Mixed review" }))
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .unwrap();
    let id = created["id"].as_str().unwrap().to_string();

    let response = client
        .post(format!("{}/api/sessions/{}/process", address, id))
        .bearer_auth(token)
        .json(&questions())
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 200);

    id
}

async fn attempt_post(
    client: &reqwest::Client,
    address: &str,
    token: &str,
    id: &str,
    action: &str,
    body: Option<Value>,
) -> reqwest::Response {
    let mut request = client
        .post(format!("{}/api/sessions/{}/attempt/{}", address, id, action))
        .bearer_auth(token);
    if let Some(body) = body {
        request = request.json(&body);
    }
    request.send().await.expect("Failed to execute request")
}

async fn send_signal(
    client: &reqwest::Client,
    address: &str,
    token: &str,
    id: &str,
    kind: &str,
) -> Value {
    attempt_post(client, address, token, id, "signals", Some(json!({ "kind": kind })))
        .await
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn health_check_404() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    // Act
    let response = client
        .get(format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn sessions_require_token() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/api/sessions", address))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 401);

    let response = client
        .get(format!("{}/api/sessions", address))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn create_process_and_fetch_session() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = token_for("student-1");

    let id = active_session(&client, &address, &token).await;

    let response = client
        .get(format!("{}/api/sessions/{}", address, id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["session"]["status"], "active");
    assert_eq!(body["session"]["questions"].as_array().unwrap().len(), 3);
    assert_eq!(body["session"]["questions"][2]["explanation"], "$4^2 = 16$");

    let list: Value = client
        .get(format!("{}/api/sessions", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn process_rejects_answer_outside_options() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = token_for("student-1");

    let created: Value = client
        .post(format!("{}/api/sessions", address))
        .bearer_auth(&token)
        .json(&json!({ "title": "Broken" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let response = client
        .post(format!("{}/api/sessions/{}/process", address, created["id"].as_str().unwrap()))
        .bearer_auth(&token)
        .json(&json!({
            "questions": [{
                "questionText": "Pick one",
                "options": ["A", "B"],
                "correctAnswer": "C",
                "explanation": ""
            }]
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn create_rejects_empty_title() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/sessions", address))
        .bearer_auth(token_for("student-1"))
        .json(&json!({ "title": "" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn full_attempt_is_scored_and_stored() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = token_for("student-1");
    let id = active_session(&client, &address, &token).await;

    // Start
    let response = client
        .post(format!("{}/api/sessions/{}/attempt", address, id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);
    let view: Value = response.json().await.unwrap();
    assert_eq!(view["phase"], "in-progress");
    assert_eq!(view["questionIndex"], 0);
    assert_eq!(view["remainingSecs"], 3600);
    assert!(view["question"].get("correctAnswer").is_none());

    // Q1 correct
    attempt_post(&client, &address, &token, &id, "select", Some(json!({ "option": "4" }))).await;
    let view: Value = attempt_post(&client, &address, &token, &id, "confirm", None)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(view["answer"]["isCorrect"], true);
    assert_eq!(view["question"]["correctAnswer"], "4");
    attempt_post(&client, &address, &token, &id, "advance", None).await;

    // Q2 wrong
    attempt_post(&client, &address, &token, &id, "select", Some(json!({ "option": "Oxygen" }))).await;
    attempt_post(&client, &address, &token, &id, "confirm", None).await;
    attempt_post(&client, &address, &token, &id, "advance", None).await;

    // Q3 skipped, then the last advance submits
    attempt_post(&client, &address, &token, &id, "skip", None).await;
    let view: Value = attempt_post(&client, &address, &token, &id, "advance", None)
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(view["phase"], "completed");
    assert_eq!(view["result"]["score"], 1);
    assert_eq!(view["result"]["totalQuestions"], 3);
    assert_eq!(view["result"]["percentage"], 33);
    assert_eq!(view["review"][1]["status"], "incorrect");
    assert_eq!(view["review"][2]["yourSelection"], "Skipped");

    let body: Value = client
        .get(format!("{}/api/sessions/{}", address, id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["session"]["status"], "completed");
    assert_eq!(body["session"]["results"]["percentage"], 33);
    assert_eq!(body["review"][2]["yourSelection"], "Skipped");

    // The stored attempt is released and the session cannot be taken again.
    let response = client
        .get(format!("{}/api/sessions/{}/attempt", address, id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);

    let response = client
        .post(format!("{}/api/sessions/{}/attempt", address, id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 409);
}

#[tokio::test]
async fn confirm_without_selection_is_rejected() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = token_for("student-1");
    let id = active_session(&client, &address, &token).await;

    let response = client
        .post(format!("{}/api/sessions/{}/attempt", address, id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);

    let response = attempt_post(&client, &address, &token, &id, "confirm", None).await;
    assert_eq!(response.status().as_u16(), 400);

    let response =
        attempt_post(&client, &address, &token, &id, "select", Some(json!({ "option": "7" }))).await;
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn second_start_conflicts() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = token_for("student-1");
    let id = active_session(&client, &address, &token).await;

    let start = || {
        client
            .post(format!("{}/api/sessions/{}/attempt", address, id))
            .bearer_auth(&token)
            .send()
    };
    assert_eq!(start().await.unwrap().status().as_u16(), 201);
    assert_eq!(start().await.unwrap().status().as_u16(), 409);
}

#[tokio::test]
async fn signals_are_logged_in_order() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = token_for("student-1");
    let id = active_session(&client, &address, &token).await;

    client
        .post(format!("{}/api/sessions/{}/attempt", address, id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    let copy: Value = send_signal(&client, &address, &token, &id, "copy-attempt").await;
    assert_eq!(copy["action"], "cancel");
    assert_eq!(copy["violationCount"], 1);
    assert_eq!(copy["warning"]["kind"], "copy-attempt");

    let focus: Value = send_signal(&client, &address, &token, &id, "focus-lost").await;
    assert_eq!(focus["action"], "allow");

    send_signal(&client, &address, &token, &id, "paste-attempt").await;

    let response = attempt_post(&client, &address, &token, &id, "submit", None).await;
    assert_eq!(response.status().as_u16(), 200);
    let view: Value = response.json().await.unwrap();
    assert_eq!(view["result"]["score"], 0);

    let body: Value = client
        .get(format!("{}/api/sessions/{}", address, id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let kinds: Vec<&str> = body["session"]["violations"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["kind"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, ["copy-attempt", "focus-lost", "paste-attempt"]);

    // The stored attempt is released; later signals are let through.
    let late: Value = send_signal(&client, &address, &token, &id, "copy-attempt").await;
    assert_eq!(late["action"], "allow");
    assert_eq!(body["session"]["violations"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn sessions_are_private_to_their_owner() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let owner = token_for("student-1");
    let other = token_for("student-2");
    let id = active_session(&client, &address, &owner).await;

    let response = client
        .get(format!("{}/api/sessions/{}", address, id))
        .bearer_auth(&other)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);

    let response = client
        .post(format!("{}/api/sessions/{}/attempt", address, id))
        .bearer_auth(&other)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn process_checks_owner_before_payload() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let owner = token_for("student-1");

    let created: Value = client
        .post(format!("{}/api/sessions", address))
        .bearer_auth(&owner)
        .json(&json!({ "title": "Private" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let response = client
        .post(format!("{}/api/sessions/{}/process", address, created["id"].as_str().unwrap()))
        .bearer_auth(token_for("student-2"))
        .json(&json!({ "questions": [] }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn abandoned_attempt_is_gone() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = token_for("student-1");
    let id = active_session(&client, &address, &token).await;

    client
        .post(format!("{}/api/sessions/{}/attempt", address, id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    let response = client
        .delete(format!("{}/api/sessions/{}/attempt", address, id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);

    let response = client
        .get(format!("{}/api/sessions/{}/attempt", address, id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);

    // Nothing was stored.
    let body: Value = client
        .get(format!("{}/api/sessions/{}", address, id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["session"]["status"], "active");
}

#[tokio::test]
async fn client_submission_is_regraded() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = token_for("student-1");
    let id = active_session(&client, &address, &token).await;

    // Claims full marks for one right answer.
    let response = client
        .post(format!("{}/api/sessions/{}/submit", address, id))
        .bearer_auth(&token)
        .json(&json!({
            "score": 2,
            "totalQuestions": 3,
            "percentage": 67,
            "answers": [
                { "questionIndex": 0, "selectedOption": "4" },
                { "questionIndex": 1, "selectedOption": "Oxygen" }
            ]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let response = client
        .post(format!("{}/api/sessions/{}/submit", address, id))
        .bearer_auth(&token)
        .json(&json!({
            "score": 1,
            "totalQuestions": 3,
            "percentage": 33,
            "answers": [
                { "questionIndex": 0, "selectedOption": "4" },
                { "questionIndex": 1, "selectedOption": "Oxygen" }
            ],
            "violations": [
                { "at": "2026-01-01T10:00:00Z", "kind": "focus-lost" }
            ]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["results"]["answers"].as_array().unwrap().len(), 2);

    // A completed session cannot be submitted twice.
    let response = client
        .post(format!("{}/api/sessions/{}/submit", address, id))
        .bearer_auth(&token)
        .json(&json!({
            "score": 0,
            "totalQuestions": 3,
            "percentage": 0,
            "answers": []
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 409);
}

#[tokio::test]
async fn draft_cannot_be_attempted() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = token_for("student-1");

    let created: Value = client
        .post(format!("{}/api/sessions", address))
        .bearer_auth(&token)
        .json(&json!({ "title": "Empty" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let response = client
        .post(format!("{}/api/sessions/{}/attempt", address, created["id"].as_str().unwrap()))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 409);
}
