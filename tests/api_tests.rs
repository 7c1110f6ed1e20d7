// tests/api_tests.rs
//
// End-to-end tests against a running Postgres. They are #[ignore]d by
// default; run with a DATABASE_URL pointing at a scratch database:
//
//   DATABASE_URL=postgres://... cargo test -- --ignored

use std::sync::Arc;
use std::time::Duration;

use quizhub::{bank::QuestionBank, config::Config, routes, state::AppState};
use sqlx::postgres::PgPoolOptions;

/// Helper function to spawn the app on a random port for testing.
/// Returns the base URL (e.g., "http://127.0.0.1:12345").
async fn spawn_app() -> String {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    // 1. Create a pool
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing. Make sure DATABASE_URL is set.");

    // 2. Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    // 3. Create test configuration and state
    let config = Config {
        database_url: database_url.clone(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        admin_username: None,
        admin_password: None,
        question_bank_url: "http://127.0.0.1:9".to_string(), // never reached
        bank_cache_ttl: 300,
    };

    let bank = Arc::new(QuestionBank::new(
        config.question_bank_url.clone(),
        Duration::from_secs(config.bank_cache_ttl),
    ));

    let state = AppState { pool, config, bank };

    // 4. Create the router with the app state
    let app = routes::create_router(state);

    // 5. Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    // 6. Spawn the server in the background
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}

/// Registers a user with the given role and returns a bearer token.
async fn register_and_login(
    client: &reqwest::Client,
    address: &str,
    role: &str,
) -> (String, String) {
    let username = format!("u_{}", &uuid::Uuid::new_v4().to_string()[..8]);
    let password = "password123";

    let resp = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "username": username,
            "password": password,
            "role": role
        }))
        .send()
        .await
        .expect("Register failed");
    assert_eq!(resp.status().as_u16(), 201);

    let login: serde_json::Value = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({
            "username": username,
            "password": password
        }))
        .send()
        .await
        .expect("Login failed")
        .json()
        .await
        .expect("Failed to parse login json");

    let token = login["token"].as_str().expect("Token not found").to_string();
    (username, token)
}

/// Creates a 5-question quiz with answer key [0, 1, 2, 3, 1] and returns
/// its id together with its (unique) subject.
async fn seed_quiz(client: &reqwest::Client, address: &str, teacher_token: &str) -> (i64, String) {
    let subject = format!("Subject-{}", &uuid::Uuid::new_v4().to_string()[..8]);
    let questions: Vec<serde_json::Value> = [0, 1, 2, 3, 1]
        .iter()
        .enumerate()
        .map(|(i, correct)| {
            serde_json::json!({
                "content": format!("Question {}", i),
                "options": ["A", "B", "C", "D"],
                "correct_answer": correct,
                "points": 1
            })
        })
        .collect();

    let resp = client
        .post(format!("{}/api/teach/quizzes", address))
        .header("Authorization", format!("Bearer {}", teacher_token))
        .json(&serde_json::json!({
            "title": "Integration quiz",
            "subject": subject,
            "questions": questions
        }))
        .send()
        .await
        .expect("Create quiz failed");
    assert_eq!(resp.status().as_u16(), 201);

    let body: serde_json::Value = resp.json().await.unwrap();
    (body["id"].as_i64().unwrap(), subject)
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn health_check_404() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn register_fails_validation() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    // Username too short
    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "username": "yo",
            "password": "password123"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn quiz_list_hides_answer_key() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let (_, teacher_token) = register_and_login(&client, &address, "teacher").await;
    let (quiz_id, _) = seed_quiz(&client, &address, &teacher_token).await;

    let quiz: serde_json::Value = client
        .get(format!("{}/api/quizzes/{}", address, quiz_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let first = &quiz["questions"][0];
    assert!(first["content"].is_string());
    assert!(first.get("correct_answer").is_none(), "answer key leaked");
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn submission_scoring_duplicates_and_leaderboard() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let (_, teacher_token) = register_and_login(&client, &address, "teacher").await;
    let (quiz_id, subject) = seed_quiz(&client, &address, &teacher_token).await;
    let (student_name, student_token) = register_and_login(&client, &address, "student").await;

    // Submit [0,1,2,3,0] against key [0,1,2,3,1]: 4 of 5 correct.
    let submit = client
        .post(format!("{}/api/results", address))
        .header("Authorization", format!("Bearer {}", student_token))
        .json(&serde_json::json!({
            "quiz_id": quiz_id,
            "answers": [0, 1, 2, 3, 0],
            "time_spent": 120
        }))
        .send()
        .await
        .expect("Submit failed");
    assert_eq!(submit.status().as_u16(), 201);

    let result: serde_json::Value = submit.json().await.unwrap();
    assert_eq!(result["correct_answers"], 4);
    assert_eq!(result["total_questions"], 5);
    assert_eq!(result["score"], 80);
    assert_eq!(result["subject"], subject.as_str());

    // Second submission for the same (user, quiz) pair must conflict.
    let dup = client
        .post(format!("{}/api/results", address))
        .header("Authorization", format!("Bearer {}", student_token))
        .json(&serde_json::json!({
            "quiz_id": quiz_id,
            "answers": [0, 1, 2, 3, 1],
            "time_spent": 60
        }))
        .send()
        .await
        .expect("Duplicate submit failed");
    assert_eq!(dup.status().as_u16(), 409);

    // The student shows up on the subject leaderboard with the first score.
    let board: Vec<serde_json::Value> = client
        .get(format!("{}/api/leaderboard/{}?limit=10", address, subject))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let entry = board
        .iter()
        .find(|e| e["username"] == student_name.as_str())
        .expect("student missing from leaderboard");
    assert_eq!(entry["latest_score"], 80);
    assert_eq!(entry["best_score"], 80);
    assert_eq!(entry["total_quizzes"], 1);
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn concurrent_duplicate_submissions_yield_one_conflict() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let (_, teacher_token) = register_and_login(&client, &address, "teacher").await;
    let (quiz_id, _) = seed_quiz(&client, &address, &teacher_token).await;
    let (_, student_token) = register_and_login(&client, &address, "student").await;

    let submit = |answers: Vec<i32>| {
        let client = client.clone();
        let address = address.clone();
        let token = student_token.clone();
        async move {
            client
                .post(format!("{}/api/results", address))
                .header("Authorization", format!("Bearer {}", token))
                .json(&serde_json::json!({
                    "quiz_id": quiz_id,
                    "answers": answers,
                    "time_spent": 30
                }))
                .send()
                .await
                .expect("Submit failed")
                .status()
                .as_u16()
        }
    };

    // Both requests race on the same (user, quiz) pair; the unique index
    // must let exactly one through.
    let (a, b) = tokio::join!(submit(vec![0, 1, 2, 3, 1]), submit(vec![0, 0, 0, 0, 0]));

    let mut statuses = [a, b];
    statuses.sort();
    assert_eq!(statuses, [201, 409]);
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn non_student_submission_is_forbidden() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let (_, teacher_token) = register_and_login(&client, &address, "teacher").await;
    let (quiz_id, _) = seed_quiz(&client, &address, &teacher_token).await;

    let resp = client
        .post(format!("{}/api/results", address))
        .header("Authorization", format!("Bearer {}", teacher_token))
        .json(&serde_json::json!({
            "quiz_id": quiz_id,
            "answers": [0],
            "time_spent": 5
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 403);
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn missing_quiz_is_not_found() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let (_, student_token) = register_and_login(&client, &address, "student").await;

    let resp = client
        .post(format!("{}/api/results", address))
        .header("Authorization", format!("Bearer {}", student_token))
        .json(&serde_json::json!({
            "quiz_id": 999_999_999,
            "answers": [0],
            "time_spent": 5
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn external_result_is_recorded_verbatim() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let (_, student_token) = register_and_login(&client, &address, "student").await;
    let subject = format!("Subject-{}", &uuid::Uuid::new_v4().to_string()[..8]);

    let resp = client
        .post(format!("{}/api/results/external", address))
        .header("Authorization", format!("Bearer {}", student_token))
        .json(&serde_json::json!({
            "subject": subject,
            "score": 70,
            "total_questions": 10,
            "correct_answers": 7,
            "time_spent": 300,
            "user_answers": [0, 1, 0, 2, 3, 1, 0, 0, 2, 1]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);

    let result: serde_json::Value = resp.json().await.unwrap();
    assert!(result["quiz_id"].is_null());
    assert_eq!(result["score"], 70);

    // No duplicate check on the external path: a second record succeeds.
    let again = client
        .post(format!("{}/api/results/external", address))
        .header("Authorization", format!("Bearer {}", student_token))
        .json(&serde_json::json!({
            "subject": subject,
            "score": 90,
            "total_questions": 10,
            "correct_answers": 9,
            "time_spent": 250,
            "user_answers": [0, 1, 0, 2, 3, 1, 0, 0, 2, 1]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(again.status().as_u16(), 201);
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn empty_subject_leaderboard_is_empty_not_an_error() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/api/leaderboard/NoSuchSubject?limit=10", address))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 200);
    let board: Vec<serde_json::Value> = resp.json().await.unwrap();
    assert!(board.is_empty());
}
