// tests/attempt_tests.rs
//
// End-to-end coverage of the attempt lifecycle: start, submit, retries,
// concurrency, and the analytics dashboards fed by completed attempts.

use backend::{
    config::{Config, ScoringConfig},
    routes,
    state::AppState,
};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

async fn spawn_app() -> (String, SqlitePool) {
    spawn_app_with_scoring(ScoringConfig::default()).await
}

async fn spawn_app_with_scoring(scoring: ScoringConfig) -> (String, SqlitePool) {
    // Single connection so the in-memory database survives for the whole test.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory SQLite database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        admin_username: None,
        admin_password: None,
        scoring,
    };

    let state = AppState {
        pool: pool.clone(),
        config,
    };

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (address, pool)
}

fn unique_name(prefix: &str) -> String {
    format!("{}_{}", prefix, &uuid::Uuid::new_v4().to_string()[..8])
}

/// Registers a fresh user with the given role and returns their token.
async fn signup(client: &reqwest::Client, address: &str, role: &str) -> String {
    let username = unique_name(role);
    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "username": username,
            "password": "password123",
            "role": role,
        }))
        .send()
        .await
        .expect("Register failed");
    assert_eq!(response.status().as_u16(), 201);

    let body = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({
            "username": username,
            "password": "password123",
        }))
        .send()
        .await
        .expect("Login failed")
        .json::<serde_json::Value>()
        .await
        .expect("Failed to parse login json");

    body["token"].as_str().expect("Token not found").to_string()
}

async fn create_exercise(
    client: &reqwest::Client,
    address: &str,
    token: &str,
    payload: serde_json::Value,
) -> i64 {
    let response = client
        .post(format!("{}/api/exercises", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&payload)
        .send()
        .await
        .expect("Create exercise failed");
    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    body["id"].as_i64().unwrap()
}

/// Two multiple-choice questions, 100 points, pass threshold 60.
fn two_question_exercise(max_attempts: i64) -> serde_json::Value {
    serde_json::json!({
        "title": "Basic Arithmetic",
        "subject": "Mathematics",
        "difficulty": "easy",
        "question_type": "multiple_choice",
        "questions": [
            {"text": "What is 15 + 27?", "options": ["40", "42", "44", "46"]},
            {"text": "What is 8 x 7?", "options": ["54", "56", "58", "60"]}
        ],
        "solutions": [
            {"correct_option": 1},
            {"correct_option": 1}
        ],
        "max_score": 100.0,
        "max_attempts": max_attempts,
        "is_published": true
    })
}

async fn start(client: &reqwest::Client, address: &str, token: &str, id: i64) -> reqwest::Response {
    client
        .post(format!("{}/api/exercises/{}/start", address, id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Start failed")
}

async fn submit(
    client: &reqwest::Client,
    address: &str,
    token: &str,
    id: i64,
    payload: &serde_json::Value,
) -> reqwest::Response {
    client
        .post(format!("{}/api/exercises/{}/submit", address, id))
        .header("Authorization", format!("Bearer {}", token))
        .json(payload)
        .send()
        .await
        .expect("Submit failed")
}

#[tokio::test]
async fn start_and_submit_full_flow() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let prof_token = signup(&client, &address, "professor").await;
    let student_token = signup(&client, &address, "student").await;
    let exercise_id = create_exercise(&client, &address, &prof_token, two_question_exercise(1)).await;

    // First start creates the record.
    let response = start(&client, &address, &student_token, exercise_id).await;
    assert_eq!(response.status().as_u16(), 201);
    let record: serde_json::Value = response.json().await.unwrap();
    assert_eq!(record["status"], "in_progress");
    assert_eq!(record["attempts"], 1);

    // One correct, one wrong: half marks.
    let response = submit(
        &client,
        &address,
        &student_token,
        exercise_id,
        &serde_json::json!({
            "answers": [
                {"question_index": 0, "answer": 1},
                {"question_index": 1, "answer": 3}
            ],
            "time_spent_seconds": 120
        }),
    )
    .await;
    assert_eq!(response.status().as_u16(), 200);
    let result: serde_json::Value = response.json().await.unwrap();
    assert_eq!(result["total_score"], 50.0);
    assert_eq!(result["max_score"], 100.0);
    assert_eq!(result["percentage"], 50.0);
    assert_eq!(result["passed"], false);
    assert_eq!(result["requires_manual_grading"], false);
    assert_eq!(result["feedback"].as_array().unwrap().len(), 2);

    // Single-attempt exercise: a second submission is rejected.
    let response = submit(
        &client,
        &address,
        &student_token,
        exercise_id,
        &serde_json::json!({
            "answers": [{"question_index": 0, "answer": 1}]
        }),
    )
    .await;
    assert_eq!(response.status().as_u16(), 409);

    // The progress listing reflects the completed attempt.
    let entries: serde_json::Value = client
        .get(format!("{}/api/progress", address))
        .header("Authorization", format!("Bearer {}", student_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let entries = entries.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["status"], "completed");
    assert_eq!(entries[0]["score"], 50.0);
    assert_eq!(entries[0]["exercise_title"], "Basic Arithmetic");
}

#[tokio::test]
async fn start_is_idempotent_while_in_progress() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let prof_token = signup(&client, &address, "professor").await;
    let student_token = signup(&client, &address, "student").await;
    let exercise_id = create_exercise(&client, &address, &prof_token, two_question_exercise(1)).await;

    let response = start(&client, &address, &student_token, exercise_id).await;
    assert_eq!(response.status().as_u16(), 201);

    let response = start(&client, &address, &student_token, exercise_id).await;
    assert_eq!(response.status().as_u16(), 200);
    let record: serde_json::Value = response.json().await.unwrap();
    assert_eq!(record["attempts"], 1);
    assert_eq!(record["status"], "in_progress");
}

#[tokio::test]
async fn submit_without_prior_start_conflicts() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let prof_token = signup(&client, &address, "professor").await;
    let student_token = signup(&client, &address, "student").await;
    let exercise_id = create_exercise(&client, &address, &prof_token, two_question_exercise(1)).await;

    let response = submit(
        &client,
        &address,
        &student_token,
        exercise_id,
        &serde_json::json!({
            "answers": [{"question_index": 0, "answer": 1}]
        }),
    )
    .await;
    assert_eq!(response.status().as_u16(), 409);
}

#[tokio::test]
async fn submit_rejects_empty_answers() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let prof_token = signup(&client, &address, "professor").await;
    let student_token = signup(&client, &address, "student").await;
    let exercise_id = create_exercise(&client, &address, &prof_token, two_question_exercise(1)).await;

    start(&client, &address, &student_token, exercise_id).await;

    let response = submit(
        &client,
        &address,
        &student_token,
        exercise_id,
        &serde_json::json!({ "answers": [] }),
    )
    .await;
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn only_students_attempt_and_only_published_exercises() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let prof_token = signup(&client, &address, "professor").await;
    let student_token = signup(&client, &address, "student").await;

    // Professors cannot attempt their own material.
    let exercise_id = create_exercise(&client, &address, &prof_token, two_question_exercise(1)).await;
    let response = start(&client, &address, &prof_token, exercise_id).await;
    assert_eq!(response.status().as_u16(), 403);

    // Unpublished exercises are not startable even when the id is known.
    let mut draft = two_question_exercise(1);
    draft["is_published"] = serde_json::json!(false);
    // The creator can see an unpublished exercise, so fetch the id directly.
    let draft_id = {
        let response = client
            .post(format!("{}/api/exercises", address))
            .header("Authorization", format!("Bearer {}", prof_token))
            .json(&draft)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 201);
        let body: serde_json::Value = response.json().await.unwrap();
        body["id"].as_i64().unwrap()
    };
    let response = start(&client, &address, &student_token, draft_id).await;
    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn course_exercises_require_enrollment() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let prof_token = signup(&client, &address, "professor").await;
    let student_token = signup(&client, &address, "student").await;

    let course: serde_json::Value = client
        .post(format!("{}/api/courses", address))
        .header("Authorization", format!("Bearer {}", prof_token))
        .json(&serde_json::json!({
            "title": "Algebra 101",
            "description": "Introductory algebra"
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let course_id = course["id"].as_i64().unwrap();

    let mut payload = two_question_exercise(1);
    payload["course_id"] = serde_json::json!(course_id);
    let exercise_id = create_exercise(&client, &address, &prof_token, payload).await;

    // Not enrolled yet.
    let response = start(&client, &address, &student_token, exercise_id).await;
    assert_eq!(response.status().as_u16(), 403);

    let response = client
        .post(format!("{}/api/courses/{}/enroll", address, course_id))
        .header("Authorization", format!("Bearer {}", student_token))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);

    let response = start(&client, &address, &student_token, exercise_id).await;
    assert_eq!(response.status().as_u16(), 201);
}

#[tokio::test]
async fn calculation_answers_respect_tolerance() {
    let scoring = ScoringConfig {
        absolute_tolerance: 0.5,
        relative_tolerance: 0.0,
    };
    let (address, _pool) = spawn_app_with_scoring(scoring).await;
    let client = reqwest::Client::new();

    let prof_token = signup(&client, &address, "professor").await;
    let exercise_id = create_exercise(
        &client,
        &address,
        &prof_token,
        serde_json::json!({
            "title": "Measurement",
            "subject": "Physics",
            "difficulty": "medium",
            "question_type": "calculation",
            "questions": [{"text": "Compute the velocity in m/s"}],
            "solutions": [{"answer": 10.0}],
            "max_score": 100.0,
            "is_published": true
        }),
    )
    .await;

    // Within |10.4 - 10.0| <= 0.5: full credit.
    let student_a = signup(&client, &address, "student").await;
    start(&client, &address, &student_a, exercise_id).await;
    let result: serde_json::Value = submit(
        &client,
        &address,
        &student_a,
        exercise_id,
        &serde_json::json!({"answers": [{"question_index": 0, "answer": 10.4}]}),
    )
    .await
    .json()
    .await
    .unwrap();
    assert_eq!(result["total_score"], 100.0);
    assert_eq!(result["passed"], true);

    // Just outside the tolerance: no credit.
    let student_b = signup(&client, &address, "student").await;
    start(&client, &address, &student_b, exercise_id).await;
    let result: serde_json::Value = submit(
        &client,
        &address,
        &student_b,
        exercise_id,
        &serde_json::json!({"answers": [{"question_index": 0, "answer": 10.6}]}),
    )
    .await
    .json()
    .await
    .unwrap();
    assert_eq!(result["total_score"], 0.0);
    assert_eq!(result["passed"], false);
}

#[tokio::test]
async fn retries_keep_the_best_score() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let prof_token = signup(&client, &address, "professor").await;
    let student_token = signup(&client, &address, "student").await;
    let exercise_id = create_exercise(&client, &address, &prof_token, two_question_exercise(3)).await;

    start(&client, &address, &student_token, exercise_id).await;

    let all_wrong = serde_json::json!({
        "answers": [
            {"question_index": 0, "answer": 0},
            {"question_index": 1, "answer": 0}
        ]
    });
    let all_right = serde_json::json!({
        "answers": [
            {"question_index": 0, "answer": 1},
            {"question_index": 1, "answer": 1}
        ]
    });

    // Attempt 1: everything wrong.
    let result: serde_json::Value = submit(&client, &address, &student_token, exercise_id, &all_wrong)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(result["total_score"], 0.0);

    // Attempt 2: direct re-submission, everything right.
    let result: serde_json::Value = submit(&client, &address, &student_token, exercise_id, &all_right)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(result["total_score"], 100.0);

    // Attempt 3: wrong again. The response reports this submission, but the
    // stored score stays at the best across attempts.
    let result: serde_json::Value = submit(&client, &address, &student_token, exercise_id, &all_wrong)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(result["total_score"], 0.0);

    let entries: serde_json::Value = client
        .get(format!("{}/api/progress", address))
        .header("Authorization", format!("Bearer {}", student_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(entries[0]["score"], 100.0);
    assert_eq!(entries[0]["attempts"], 3);

    // The stored answers and feedback belong to the best attempt, not the
    // latest one: everything still reads as correct.
    let feedback: String =
        sqlx::query_scalar("SELECT feedback FROM progress_records WHERE exercise_id = ?")
            .bind(exercise_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    let feedback: serde_json::Value = serde_json::from_str(&feedback).unwrap();
    assert!(
        feedback
            .as_array()
            .unwrap()
            .iter()
            .all(|f| f["is_correct"] == true)
    );
    let answers: String =
        sqlx::query_scalar("SELECT answers FROM progress_records WHERE exercise_id = ?")
            .bind(exercise_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    let answers: serde_json::Value = serde_json::from_str(&answers).unwrap();
    assert!(
        answers
            .as_array()
            .unwrap()
            .iter()
            .all(|a| a["answer"] == 1)
    );

    // The attempt limit is now exhausted.
    let response = submit(&client, &address, &student_token, exercise_id, &all_right).await;
    assert_eq!(response.status().as_u16(), 409);
}

#[tokio::test]
async fn reopening_an_attempt_clears_the_completion_timestamp() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let prof_token = signup(&client, &address, "professor").await;
    let student_token = signup(&client, &address, "student").await;
    let exercise_id = create_exercise(&client, &address, &prof_token, two_question_exercise(2)).await;

    start(&client, &address, &student_token, exercise_id).await;
    let response = submit(
        &client,
        &address,
        &student_token,
        exercise_id,
        &serde_json::json!({
            "answers": [
                {"question_index": 0, "answer": 1},
                {"question_index": 1, "answer": 1}
            ]
        }),
    )
    .await;
    assert_eq!(response.status().as_u16(), 200);

    // Re-starting brings the record back in progress: the best score
    // survives, the completion timestamp does not.
    let response = start(&client, &address, &student_token, exercise_id).await;
    assert_eq!(response.status().as_u16(), 200);
    let record: serde_json::Value = response.json().await.unwrap();
    assert_eq!(record["status"], "in_progress");
    assert_eq!(record["attempts"], 2);
    assert_eq!(record["score"], 100.0);
    assert!(record["completed_at"].is_null());
}

#[tokio::test]
async fn late_submissions_are_accepted_and_flagged() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let prof_token = signup(&client, &address, "professor").await;
    let student_token = signup(&client, &address, "student").await;

    let mut payload = two_question_exercise(1);
    payload["time_limit_seconds"] = serde_json::json!(60);
    let exercise_id = create_exercise(&client, &address, &prof_token, payload).await;

    start(&client, &address, &student_token, exercise_id).await;
    let response = submit(
        &client,
        &address,
        &student_token,
        exercise_id,
        &serde_json::json!({
            "answers": [
                {"question_index": 0, "answer": 1},
                {"question_index": 1, "answer": 1}
            ],
            "time_spent_seconds": 120
        }),
    )
    .await;
    assert_eq!(response.status().as_u16(), 200);

    let is_late: bool =
        sqlx::query_scalar("SELECT is_late FROM progress_records WHERE exercise_id = ?")
            .bind(exercise_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert!(is_late);
}

#[tokio::test]
async fn concurrent_submissions_have_one_winner() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let prof_token = signup(&client, &address, "professor").await;
    let student_token = signup(&client, &address, "student").await;
    let exercise_id = create_exercise(&client, &address, &prof_token, two_question_exercise(1)).await;

    start(&client, &address, &student_token, exercise_id).await;

    let payload = serde_json::json!({
        "answers": [
            {"question_index": 0, "answer": 1},
            {"question_index": 1, "answer": 1}
        ]
    });

    let first = {
        let client = client.clone();
        let address = address.clone();
        let token = student_token.clone();
        let payload = payload.clone();
        tokio::spawn(
            async move { submit(&client, &address, &token, exercise_id, &payload).await },
        )
    };
    let second = {
        let client = client.clone();
        let address = address.clone();
        let token = student_token.clone();
        let payload = payload.clone();
        tokio::spawn(
            async move { submit(&client, &address, &token, exercise_id, &payload).await },
        )
    };

    let (first, second) = tokio::join!(first, second);
    let mut statuses = vec![
        first.unwrap().status().as_u16(),
        second.unwrap().status().as_u16(),
    ];
    statuses.sort();
    assert_eq!(statuses, vec![200, 409]);
}

#[tokio::test]
async fn essay_submissions_await_manual_grading() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let prof_token = signup(&client, &address, "professor").await;
    let student_token = signup(&client, &address, "student").await;
    let exercise_id = create_exercise(
        &client,
        &address,
        &prof_token,
        serde_json::json!({
            "title": "Essay on Thermodynamics",
            "subject": "Physics",
            "difficulty": "hard",
            "question_type": "essay",
            "questions": [{"text": "Explain the second law in your own words."}],
            "solutions": [{}],
            "is_published": true
        }),
    )
    .await;

    start(&client, &address, &student_token, exercise_id).await;
    let result: serde_json::Value = submit(
        &client,
        &address,
        &student_token,
        exercise_id,
        &serde_json::json!({
            "answers": [{"question_index": 0, "answer": "Entropy never decreases..."}]
        }),
    )
    .await
    .json()
    .await
    .unwrap();

    assert_eq!(result["requires_manual_grading"], true);
    assert!(result["passed"].is_null());

    // Manually-graded work counts toward completion but never toward the
    // average score.
    let snapshot: serde_json::Value = client
        .get(format!("{}/api/dashboard/me", address))
        .header("Authorization", format!("Bearer {}", student_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(snapshot["summary"]["completed_attempts"], 1);
    assert_eq!(snapshot["summary"]["completion_rate"], 100.0);
    assert!(snapshot["summary"]["average_score"].is_null());
}

#[tokio::test]
async fn dashboards_aggregate_completed_attempts() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let prof_token = signup(&client, &address, "professor").await;
    let student_token = signup(&client, &address, "student").await;

    let exercise_a = create_exercise(&client, &address, &prof_token, two_question_exercise(1)).await;
    let mut physics = two_question_exercise(1);
    physics["subject"] = serde_json::json!("Physics");
    physics["difficulty"] = serde_json::json!("hard");
    let exercise_b = create_exercise(&client, &address, &prof_token, physics).await;

    // 100% on the first exercise, 0% on the second.
    start(&client, &address, &student_token, exercise_a).await;
    submit(
        &client,
        &address,
        &student_token,
        exercise_a,
        &serde_json::json!({
            "answers": [
                {"question_index": 0, "answer": 1},
                {"question_index": 1, "answer": 1}
            ]
        }),
    )
    .await;
    start(&client, &address, &student_token, exercise_b).await;
    submit(
        &client,
        &address,
        &student_token,
        exercise_b,
        &serde_json::json!({
            "answers": [
                {"question_index": 0, "answer": 0},
                {"question_index": 1, "answer": 0}
            ]
        }),
    )
    .await;

    // Student's own dashboard.
    let snapshot: serde_json::Value = client
        .get(format!("{}/api/dashboard/me", address))
        .header("Authorization", format!("Bearer {}", student_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(snapshot["summary"]["total_attempts"], 2);
    assert_eq!(snapshot["summary"]["completed_attempts"], 2);
    assert_eq!(snapshot["summary"]["completion_rate"], 100.0);
    assert_eq!(snapshot["summary"]["average_score"], 50.0);
    assert_eq!(snapshot["score_distribution"]["90-100"], 1);
    assert_eq!(snapshot["score_distribution"]["below-60"], 1);
    assert_eq!(
        snapshot["subject_breakdown"]["Physics"]["average_score"],
        0.0
    );
    assert_eq!(
        snapshot["difficulty_breakdown"]["easy"]["average_score"],
        100.0
    );
    assert_eq!(snapshot["performance_trend"].as_array().unwrap().len(), 1);

    // Students cannot read class analytics.
    let response = client
        .get(format!("{}/api/dashboard/class", address))
        .header("Authorization", format!("Bearer {}", student_token))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);

    // The professor sees attempts on their own exercises.
    let snapshot: serde_json::Value = client
        .get(format!("{}/api/dashboard/class", address))
        .header("Authorization", format!("Bearer {}", prof_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(snapshot["summary"]["total_attempts"], 2);

    // Subject filter narrows the row set.
    let snapshot: serde_json::Value = client
        .get(format!(
            "{}/api/dashboard/class?subject=Physics",
            address
        ))
        .header("Authorization", format!("Bearer {}", prof_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(snapshot["summary"]["total_attempts"], 1);
    assert_eq!(snapshot["summary"]["average_score"], 0.0);

    // Admin overview totals.
    let admin = unique_name("admin");
    client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "username": admin,
            "password": "password123"
        }))
        .send()
        .await
        .unwrap();
    sqlx::query("UPDATE users SET role = 'admin' WHERE username = ?")
        .bind(&admin)
        .execute(&pool)
        .await
        .unwrap();
    let admin_token = {
        let body: serde_json::Value = client
            .post(format!("{}/api/auth/login", address))
            .json(&serde_json::json!({
                "username": admin,
                "password": "password123"
            }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        body["token"].as_str().unwrap().to_string()
    };

    let overview: serde_json::Value = client
        .get(format!("{}/api/dashboard/overview", address))
        .header("Authorization", format!("Bearer {}", admin_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(overview["system_overview"]["total_exercises"], 2);
    assert_eq!(overview["system_overview"]["total_submissions"], 2);
    assert_eq!(
        overview["popular_subjects"].as_array().unwrap().len(),
        2
    );
}

#[tokio::test]
async fn empty_dashboard_is_zeroed_not_an_error() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let student_token = signup(&client, &address, "student").await;

    let snapshot: serde_json::Value = client
        .get(format!("{}/api/dashboard/me", address))
        .header("Authorization", format!("Bearer {}", student_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(snapshot["summary"]["total_attempts"], 0);
    assert_eq!(snapshot["summary"]["completion_rate"], 0.0);
    assert!(snapshot["summary"]["average_score"].is_null());
    assert_eq!(snapshot["score_distribution"]["90-100"], 0);
    assert!(snapshot["performance_trend"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn deleting_an_attempted_exercise_is_blocked() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let prof_token = signup(&client, &address, "professor").await;
    let student_token = signup(&client, &address, "student").await;
    let exercise_id = create_exercise(&client, &address, &prof_token, two_question_exercise(1)).await;

    start(&client, &address, &student_token, exercise_id).await;

    let response = client
        .delete(format!("{}/api/exercises/{}", address, exercise_id))
        .header("Authorization", format!("Bearer {}", prof_token))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 409);
}
