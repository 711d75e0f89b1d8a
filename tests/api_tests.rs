// tests/api_tests.rs

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use codequiz::{
    config::Config,
    generator::{ChatMessage, CompletionClient, GenerationError, QuestionGenerator},
    routes,
    state::AppState,
    utils::hash::hash_password,
};
use sqlx::{PgPool, postgres::PgPoolOptions};

/// Completion client that replays canned responses.
struct StubClient {
    responses: Mutex<VecDeque<String>>,
}

#[async_trait]
impl CompletionClient for StubClient {
    async fn complete(&self, _messages: &[ChatMessage]) -> Result<String, GenerationError> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| GenerationError::Transport("no more stub responses".to_string()))
    }
}

fn quiz_json(count: usize) -> String {
    let questions: Vec<serde_json::Value> = (0..count)
        .map(|i| {
            serde_json::json!({
                "question": format!("What does CSS property {} do?", i),
                "options": ["One", "Two", "Three", "Four"],
                "correct_answer": i % 4,
            })
        })
        .collect();
    format!(
        "Sure! Here is the quiz:\n```json\n{}\n```",
        serde_json::json!({ "questions": questions })
    )
}

fn test_config(database_url: &str) -> Config {
    Config {
        database_url: database_url.to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        admin_username: None,
        admin_password: None,
        llm_api_key: "unused".to_string(),
        llm_base_url: "http://127.0.0.1:9".to_string(),
        llm_model: "stub".to_string(),
        quiz_time_limit_minutes: 15,
        generation_rate_limit: None,
        port: 0,
        cors_origins: vec![],
    }
}

/// Spawns the app on a random port and returns its base URL.
async fn spawn_app(pool: PgPool, config: Config, responses: Vec<String>) -> String {
    let client = StubClient {
        responses: Mutex::new(responses.into()),
    };
    let generator = QuestionGenerator::new(Arc::new(client)).with_retry_delay(Duration::ZERO);

    let state = AppState {
        pool,
        config,
        generator: Arc::new(generator),
    };

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    address
}

/// App without a live database; fine for the generation endpoint.
async fn spawn_stateless_app(responses: Vec<String>) -> String {
    let url = "postgres://localhost/unused";
    let pool = PgPoolOptions::new().connect_lazy(url).unwrap();
    spawn_app(pool, test_config(url), responses).await
}

/// Stateless app with per-IP throttling on the generation routes.
async fn spawn_throttled_app(per_second: u64, responses: Vec<String>) -> String {
    let url = "postgres://localhost/unused";
    let pool = PgPoolOptions::new().connect_lazy(url).unwrap();
    let config = Config {
        generation_rate_limit: Some(per_second),
        ..test_config(url)
    };
    spawn_app(pool, config, responses).await
}

/// App backed by the Postgres at DATABASE_URL, migrated.
async fn spawn_db_app(responses: Vec<String>) -> (String, PgPool) {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing. Make sure DATABASE_URL is set.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let address = spawn_app(pool.clone(), test_config(&database_url), responses).await;
    (address, pool)
}

async fn admin_token(client: &reqwest::Client, address: &str, pool: &PgPool) -> String {
    let username = format!("admin_{}", &uuid::Uuid::new_v4().to_string()[..8]);
    sqlx::query("INSERT INTO admins (username, password) VALUES ($1, $2)")
        .bind(&username)
        .bind(hash_password("password123").unwrap())
        .execute(pool)
        .await
        .unwrap();

    let login: serde_json::Value = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({ "username": username, "password": "password123" }))
        .send()
        .await
        .expect("Login failed")
        .json()
        .await
        .unwrap();

    login["token"].as_str().expect("Token not found").to_string()
}

async fn start_quiz(client: &reqwest::Client, address: &str, class_id: Option<&str>) -> String {
    let response = client
        .post(format!("{}/api/submissions", address))
        .json(&serde_json::json!({
            "student_name": "<b>Ayu</b> Lestari",
            "student_nim": "2201001",
            "student_email": "ayu@example.com",
            "class_id": class_id,
            "code": "<style>h1 { font-weight: bold; }</style><h1>Hi</h1>",
        }))
        .send()
        .await
        .expect("Create submission failed");

    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["question_count"], 10);
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn generate_questions_over_http() {
    // Arrange
    let address = spawn_stateless_app(vec!["garbage".to_string(), quiz_json(12)]).await;
    let client = reqwest::Client::new();

    // Act
    let response = client
        .post(format!("{}/api/generate-questions", address))
        .json(&serde_json::json!({ "code": "<p style=\"color: red\">Hi</p>" }))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert: first attempt failed to parse, second was truncated to ten
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    let questions = body["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 10);
    assert_eq!(questions[0]["options"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn generate_questions_rejects_empty_code() {
    let address = spawn_stateless_app(vec![]).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/generate-questions", address))
        .json(&serde_json::json!({ "code": "" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn generate_questions_reports_terminal_failure() {
    let address = spawn_stateless_app(vec![]).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/generate-questions", address))
        .json(&serde_json::json!({ "code": "<p>hi</p>" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 500);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["error"].is_string());
    assert!(body["details"].as_str().unwrap().contains("3 attempts"));
    assert!(body["hint"].is_string());
}

async fn generate_status(client: &reqwest::Client, address: &str) -> u16 {
    client
        .post(format!("{}/api/generate-questions", address))
        .json(&serde_json::json!({ "code": "<p>hi</p>" }))
        .send()
        .await
        .expect("Failed to execute request")
        .status()
        .as_u16()
}

#[tokio::test]
async fn generation_rate_limit_is_requests_per_second() {
    // Arrange: 10 per second, burst of 5
    let address = spawn_throttled_app(10, vec![quiz_json(10); 20]).await;
    let client = reqwest::Client::new();

    // Act: drain the burst
    let mut burst = Vec::new();
    for _ in 0..8 {
        burst.push(generate_status(&client, &address).await);
    }

    // Assert: the burst is served, then throttled
    assert_eq!(&burst[..5], &[200; 5]);
    assert!(burst[5..].contains(&429), "statuses = {:?}", burst);

    // Well under a second refills the bucket
    tokio::time::sleep(Duration::from_millis(700)).await;
    let mut refilled = Vec::new();
    for _ in 0..3 {
        refilled.push(generate_status(&client, &address).await);
    }
    assert_eq!(refilled, vec![200; 3]);
}

/// Moves the quiz start back so the 15 minute limit has passed.
async fn backdate(pool: &PgPool, id: &str) {
    sqlx::query(
        "UPDATE submissions SET started_at = NOW() - INTERVAL '20 minutes' WHERE id = $1",
    )
    .bind(uuid::Uuid::parse_str(id).unwrap())
    .execute(pool)
    .await
    .unwrap();
}

#[tokio::test]
#[ignore = "requires a Postgres database at DATABASE_URL"]
async fn expired_quiz_is_submitted_on_load() {
    // Arrange
    let (address, pool) = spawn_db_app(vec![quiz_json(10)]).await;
    let client = reqwest::Client::new();
    let id = start_quiz(&client, &address, None).await;
    backdate(&pool, &id).await;

    // Act
    let response = client
        .get(format!("{}/api/quiz/{}", address, id))
        .send()
        .await
        .unwrap();

    // Assert: closed with no answers
    assert_eq!(response.status().as_u16(), 409);

    let result: serde_json::Value = client
        .get(format!("{}/api/result/{}", address, id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(result["score"], 0);
    assert_eq!(result["auto_submitted"], true);
    assert_eq!(result["review"][0]["chosen"], -1);
}

#[tokio::test]
#[ignore = "requires a Postgres database at DATABASE_URL"]
async fn late_answers_are_scored_and_flagged() {
    let (address, pool) = spawn_db_app(vec![quiz_json(10)]).await;
    let client = reqwest::Client::new();
    let id = start_quiz(&client, &address, None).await;
    backdate(&pool, &id).await;

    let answers = vec![0, 1, 2, 3, 0, 1, 2, 3, 0, 1];
    let submit = client
        .post(format!("{}/api/submit-answers", address))
        .json(&serde_json::json!({ "submissionId": id, "answers": answers }))
        .send()
        .await
        .unwrap();
    assert_eq!(submit.status().as_u16(), 200);
    let scored: serde_json::Value = submit.json().await.unwrap();
    assert_eq!(scored["score"], 100);

    let result: serde_json::Value = client
        .get(format!("{}/api/result/{}", address, id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(result["score"], 100);
    assert_eq!(result["auto_submitted"], true);
}

#[tokio::test]
#[ignore = "requires a Postgres database at DATABASE_URL"]
async fn focus_loss_after_completion_is_conflict() {
    let (address, _pool) = spawn_db_app(vec![quiz_json(10)]).await;
    let client = reqwest::Client::new();
    let id = start_quiz(&client, &address, None).await;

    let submit = client
        .post(format!("{}/api/submit-answers", address))
        .json(&serde_json::json!({ "submissionId": id, "answers": vec![-1; 10] }))
        .send()
        .await
        .unwrap();
    assert_eq!(submit.status().as_u16(), 200);

    let report = client
        .post(format!("{}/api/quiz/{}/focus-loss", address, id))
        .send()
        .await
        .unwrap();
    assert_eq!(report.status().as_u16(), 409);

    // An on-time submission is not flagged
    let result: serde_json::Value = client
        .get(format!("{}/api/result/{}", address, id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(result["auto_submitted"], false);
}

#[tokio::test]
#[ignore = "requires a Postgres database at DATABASE_URL"]
async fn quiz_submit_and_review_flow() {
    // Arrange
    let (address, _pool) = spawn_db_app(vec![quiz_json(10)]).await;
    let client = reqwest::Client::new();
    let id = start_quiz(&client, &address, None).await;

    // The quiz hides the answer key
    let quiz: serde_json::Value = client
        .get(format!("{}/api/quiz/{}", address, id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(quiz["student_name"], "Ayu Lestari");
    assert_eq!(quiz["questions"].as_array().unwrap().len(), 10);
    assert!(quiz["questions"][0].get("correct_answer").is_none());
    assert!(quiz["time_left_seconds"].as_i64().unwrap() > 0);

    // A short answer sheet is rejected
    let short = client
        .post(format!("{}/api/submit-answers", address))
        .json(&serde_json::json!({ "submissionId": id, "answers": [0, 1] }))
        .send()
        .await
        .unwrap();
    assert_eq!(short.status().as_u16(), 400);

    // Eight correct, one wrong, one unanswered
    let answers = vec![0, 1, 2, 3, 0, 1, 2, 3, 3, -1];
    let submit = client
        .post(format!("{}/api/submit-answers", address))
        .json(&serde_json::json!({ "submissionId": id, "answers": answers }))
        .send()
        .await
        .unwrap();
    assert_eq!(submit.status().as_u16(), 200);
    let scored: serde_json::Value = submit.json().await.unwrap();
    assert_eq!(scored["score"], 80);
    assert_eq!(scored["correct_count"], 8);

    // Second submission is refused
    let again = client
        .post(format!("{}/api/submit-answers", address))
        .json(&serde_json::json!({ "submissionId": id, "answers": answers }))
        .send()
        .await
        .unwrap();
    assert_eq!(again.status().as_u16(), 409);

    // The quiz itself is closed, the result is open
    let closed = client
        .get(format!("{}/api/quiz/{}", address, id))
        .send()
        .await
        .unwrap();
    assert_eq!(closed.status().as_u16(), 409);

    let result: serde_json::Value = client
        .get(format!("{}/api/result/{}", address, id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(result["score"], 80);
    assert_eq!(result["review"][9]["chosen"], -1);
}

#[tokio::test]
#[ignore = "requires a Postgres database at DATABASE_URL"]
async fn third_focus_loss_auto_submits() {
    let (address, _pool) = spawn_db_app(vec![quiz_json(10)]).await;
    let client = reqwest::Client::new();
    let id = start_quiz(&client, &address, None).await;

    for expected in 1..=2 {
        let report: serde_json::Value = client
            .post(format!("{}/api/quiz/{}/focus-loss", address, id))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(report["tab_switch_count"], expected);
        assert_eq!(report["auto_submitted"], false);
    }

    let report: serde_json::Value = client
        .post(format!("{}/api/quiz/{}/focus-loss", address, id))
        .json(&serde_json::json!({ "answers": [0, 1, 2] }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(report["tab_switch_count"], 3);
    assert_eq!(report["auto_submitted"], true);

    let result: serde_json::Value = client
        .get(format!("{}/api/result/{}", address, id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(result["score"], 30);
    assert_eq!(result["auto_submitted"], true);
}

#[tokio::test]
#[ignore = "requires a Postgres database at DATABASE_URL"]
async fn admin_lists_and_filters_submissions() {
    let (address, pool) = spawn_db_app(vec![quiz_json(10), quiz_json(10)]).await;
    let client = reqwest::Client::new();
    let token = admin_token(&client, &address, &pool).await;

    // Create a class
    let class_name = format!("Class {}", &uuid::Uuid::new_v4().to_string()[..8]);
    let class: serde_json::Value = client
        .post(format!("{}/api/admin/classes", address))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "name": class_name }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let class_id = class["id"].as_str().unwrap().to_string();

    let in_class = start_quiz(&client, &address, Some(&class_id)).await;
    let _unassigned = start_quiz(&client, &address, None).await;

    // Filtered listing only shows the class member, still in progress
    let listing: serde_json::Value = client
        .get(format!("{}/api/admin/submissions?class_id={}", address, class_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listing["total"], 1);
    assert_eq!(listing["submissions"][0]["id"], in_class);
    assert_eq!(listing["submissions"][0]["grade"], "in_progress");
    assert_eq!(listing["submissions"][0]["class_name"], class_name);

    // "all" lists everything
    let all: serde_json::Value = client
        .get(format!("{}/api/admin/submissions?class_id=all", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(all["total"].as_u64().unwrap() >= 2);

    // Detail and sandboxed preview
    let detail: serde_json::Value = client
        .get(format!("{}/api/admin/submissions/{}", address, in_class))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(detail["code"].as_str().unwrap().contains("font-weight"));
    assert!(detail["score"].is_null());

    let preview = client
        .get(format!("{}/api/admin/submissions/{}/preview", address, in_class))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(preview.status().as_u16(), 200);
    assert!(
        preview.headers()["content-security-policy"]
            .to_str()
            .unwrap()
            .starts_with("sandbox")
    );

    // Delete
    let deleted = client
        .delete(format!("{}/api/admin/submissions/{}", address, in_class))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status().as_u16(), 204);
}

#[tokio::test]
#[ignore = "requires a Postgres database at DATABASE_URL"]
async fn unknown_submission_is_404() {
    let (address, _pool) = spawn_db_app(vec![]).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/api/quiz/{}", address, uuid::Uuid::new_v4()))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 404);
}
