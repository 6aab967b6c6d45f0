// tests/attempt_tests.rs

mod common;

use common::{DEMO_CSV, TestApp, spawn_app};

/// Uploads the two-question demo exam (Q1 correct=D, Q2 correct=C) and returns its id.
async fn seed_demo(app: &TestApp) -> i64 {
    let admin = app.admin_token().await;
    let body: serde_json::Value = app
        .upload(&admin, "Quick Demo", "demo.csv", DEMO_CSV.as_bytes())
        .await
        .json()
        .await
        .unwrap();
    body["id"].as_i64().unwrap()
}

async fn start(app: &TestApp, token: &str, exam_id: i64) -> i64 {
    let response = app.start_attempt(token, exam_id).await;
    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    body["attempt_id"].as_i64().unwrap()
}

/// Question ids in display order, as served by the take endpoint.
async fn question_ids(app: &TestApp, token: &str, attempt_id: i64) -> Vec<i64> {
    let body: serde_json::Value = app
        .get(token, &format!("/exam/take/{}", attempt_id))
        .await
        .json()
        .await
        .unwrap();
    body["questions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|q| q["id"].as_i64().unwrap())
        .collect()
}

fn answers(pairs: &[(i64, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(id, choice)| (format!("q_{}", id), choice.to_string()))
        .collect()
}

#[tokio::test]
async fn resubmission_replaces_previous_answers() {
    let app = spawn_app().await;
    let exam_id = seed_demo(&app).await;
    let user = app.user_token("student@example.com").await;

    let attempt_id = start(&app, &user, exam_id).await;
    assert_eq!(
        app.count("SELECT COUNT(*) FROM attempts WHERE completed_at IS NULL AND raw = 0").await,
        1
    );

    let ids = question_ids(&app, &user, attempt_id).await;
    assert_eq!(ids.len(), 2);

    let first = app
        .submit(&user, attempt_id, &answers(&[(ids[0], "D"), (ids[1], "A")]))
        .await;
    assert_eq!(first.status().as_u16(), 200);
    let body: serde_json::Value = first.json().await.unwrap();
    assert_eq!(body["raw"], 1);
    assert_eq!(app.count("SELECT COUNT(*) FROM attempt_answers").await, 2);
    assert_eq!(
        app.count("SELECT COUNT(*) FROM attempts WHERE completed_at IS NOT NULL").await,
        1
    );

    let second = app
        .submit(&user, attempt_id, &answers(&[(ids[0], "D"), (ids[1], "C")]))
        .await;
    let body: serde_json::Value = second.json().await.unwrap();
    assert_eq!(body["raw"], 2);
    assert_eq!(app.count("SELECT COUNT(*) FROM attempt_answers").await, 2);
    assert_eq!(app.count("SELECT raw FROM attempts").await, 2);
    assert_eq!(
        app.count("SELECT COUNT(*) FROM attempt_answers WHERE selected = 'A'").await,
        0
    );

    let result: serde_json::Value = app
        .get(&user, &format!("/exam/result/{}", attempt_id))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(result["total"], 2);
    assert_eq!(result["raw"], 2);
    assert_eq!(result["questions"][0]["selected"], "D");
    assert_eq!(result["questions"][1]["selected"], "C");
    assert_eq!(result["questions"][1]["is_correct"], true);
}

#[tokio::test]
async fn take_hides_correct_answers_and_keeps_order() {
    let app = spawn_app().await;
    let exam_id = seed_demo(&app).await;
    let user = app.user_token("student@example.com").await;
    let attempt_id = start(&app, &user, exam_id).await;

    let response = app.get(&user, &format!("/exam/take/{}", attempt_id)).await;
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();

    assert_eq!(body["exam"]["title"], "Quick Demo");
    let questions = body["questions"].as_array().unwrap();
    assert_eq!(questions[0]["text"], "2 + 2 = ?");
    assert_eq!(questions[0]["choices"]["D"], "4");
    assert_eq!(questions[1]["order_index"], 2);
    assert!(questions.iter().all(|q| q.get("correct").is_none()));

    // Before submission the result does not reveal the key either
    let result: serde_json::Value = app
        .get(&user, &format!("/exam/result/{}", attempt_id))
        .await
        .json()
        .await
        .unwrap();
    assert!(result["completed_at"].is_null());
    assert!(result["questions"][0].get("correct").is_none());
}

#[tokio::test]
async fn invalid_choices_are_not_stored_or_scored() {
    let app = spawn_app().await;
    let exam_id = seed_demo(&app).await;
    let user = app.user_token("student@example.com").await;
    let attempt_id = start(&app, &user, exam_id).await;
    let ids = question_ids(&app, &user, attempt_id).await;

    let response = app
        .submit(&user, attempt_id, &answers(&[(ids[0], "E"), (ids[1], "")]))
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["raw"], 0);
    assert_eq!(body["answered"], 0);
    assert_eq!(app.count("SELECT COUNT(*) FROM attempt_answers").await, 0);

    let result: serde_json::Value = app
        .get(&user, &format!("/exam/result/{}", attempt_id))
        .await
        .json()
        .await
        .unwrap();
    assert!(result["questions"][0]["selected"].is_null());
    assert_eq!(result["questions"][0]["is_correct"], false);
}

#[tokio::test]
async fn other_users_attempts_are_forbidden() {
    let app = spawn_app().await;
    let exam_id = seed_demo(&app).await;
    let owner = app.user_token("owner@example.com").await;
    let intruder = app.user_token("intruder@example.com").await;
    let attempt_id = start(&app, &owner, exam_id).await;
    let ids = question_ids(&app, &owner, attempt_id).await;

    let take = app.get(&intruder, &format!("/exam/take/{}", attempt_id)).await;
    assert_eq!(take.status().as_u16(), 403);
    let body: serde_json::Value = take.json().await.unwrap();
    assert!(body.get("questions").is_none());

    let result = app.get(&intruder, &format!("/exam/result/{}", attempt_id)).await;
    assert_eq!(result.status().as_u16(), 403);

    let submit = app
        .submit(&intruder, attempt_id, &answers(&[(ids[0], "D")]))
        .await;
    assert_eq!(submit.status().as_u16(), 403);
    assert_eq!(app.count("SELECT COUNT(*) FROM attempt_answers").await, 0);
    assert_eq!(
        app.count("SELECT COUNT(*) FROM attempts WHERE completed_at IS NOT NULL").await,
        0
    );

    let missing = app.get(&owner, "/exam/take/9999").await;
    assert_eq!(missing.status().as_u16(), 404);
}

#[tokio::test]
async fn exam_without_questions_cannot_be_started() {
    let app = spawn_app().await;
    let user = app.user_token("student@example.com").await;
    let exam_id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO exams (title, created_at) VALUES ('Empty Exam', ?) RETURNING id",
    )
    .bind(chrono::Utc::now())
    .fetch_one(&app.pool)
    .await
    .unwrap();

    let response = app.start_attempt(&user, exam_id).await;

    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "This exam has no questions yet.");
    assert_eq!(app.count("SELECT COUNT(*) FROM attempts").await, 0);

    let unknown = app.start_attempt(&user, 424242).await;
    assert_eq!(unknown.status().as_u16(), 404);
}

#[tokio::test]
async fn start_with_missing_or_garbled_exam_id_is_404() {
    let app = spawn_app().await;
    seed_demo(&app).await;
    let user = app.user_token("student@example.com").await;

    let bodies: [&[(&str, &str)]; 3] = [&[("exam_id", "abc")], &[("exam_id", "")], &[]];
    for form in bodies {
        let response = app
            .client
            .post(app.url("/exam/start"))
            .bearer_auth(&user)
            .form(form)
            .send()
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 404);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["error"], "Exam not found");
    }

    assert_eq!(app.count("SELECT COUNT(*) FROM attempts").await, 0);
}
