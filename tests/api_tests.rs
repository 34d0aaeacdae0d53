// tests/api_tests.rs

use std::sync::Arc;

use quiz_live::{
    config::Config,
    routes,
    state::AppState,
    store::{MemoryStore, Store},
};
use serde_json::{Value, json};

struct TestApp {
    address: String,
    state: AppState,
}

/// Helper function to spawn the app on a random port for testing.
/// Uses the in-memory store, so no database is needed.
async fn spawn_app_with(config: Config) -> TestApp {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let state = AppState::new(store, config);

    let app = routes::create_router(state.clone());

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp { address, state }
}

async fn spawn_app() -> TestApp {
    spawn_app_with(Config::for_tests()).await
}

fn sample_quiz() -> Value {
    json!({
        "title": "Địa lý Việt Nam",
        "questions": [
            {
                "type": "multiple_choice",
                "question_text": "Thủ đô của Việt Nam?",
                "options": ["Hà Nội", "Huế", "Đà Nẵng"],
                "correct_answer": "Hà Nội",
                "timer": 20,
                "points": 100
            },
            {
                "type": "text_input",
                "question_text": "Sông dài nhất?",
                "correct_answer": "Mekong"
            }
        ]
    })
}

async fn create_quiz(client: &reqwest::Client, address: &str, body: &Value) -> Value {
    let response = client
        .post(format!("{}/api/quizzes", address))
        .json(body)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 201);
    response.json().await.unwrap()
}

#[tokio::test]
async fn unknown_path_is_404() {
    // Arrange
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    // Act
    let response = client
        .get(format!("{}/random_path_that_does_not_exist", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn health_check_works() {
    let app = spawn_app().await;

    let response = reqwest::get(format!("{}/api/health", app.address))
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn register_fails_validation() {
    // Arrange
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    // Act: Send a username that is too short
    let response = client
        .post(format!("{}/api/auth/register", app.address))
        .json(&json!({
            "username": "yo",
            "password": "password123"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn teacher_routes_need_a_token_when_auth_is_required() {
    // Arrange
    let config = Config {
        require_auth: true,
        ..Config::for_tests()
    };
    let app = spawn_app_with(config).await;
    let client = reqwest::Client::new();

    // Act & Assert: no token
    let response = client
        .get(format!("{}/api/quizzes", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    let response = client
        .get(format!("{}/api/quizzes/{}/events", app.address, uuid::Uuid::new_v4()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    // Register two teachers and log both in
    let mut tokens = Vec::new();
    for name in ["co_lan", "thay_minh"] {
        let register = client
            .post(format!("{}/api/auth/register", app.address))
            .json(&json!({ "username": name, "password": "password123" }))
            .send()
            .await
            .unwrap();
        assert_eq!(register.status().as_u16(), 201);
        let body: Value = register.json().await.unwrap();
        assert!(body.get("password").is_none());

        let login: Value = client
            .post(format!("{}/api/auth/login", app.address))
            .json(&json!({ "username": name, "password": "password123" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        tokens.push(login["token"].as_str().expect("Token not found").to_string());
    }

    // Duplicate username
    let duplicate = client
        .post(format!("{}/api/auth/register", app.address))
        .json(&json!({ "username": "co_lan", "password": "password123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(duplicate.status().as_u16(), 409);

    // Wrong password
    let bad_login = client
        .post(format!("{}/api/auth/login", app.address))
        .json(&json!({ "username": "co_lan", "password": "nope-nope" }))
        .send()
        .await
        .unwrap();
    assert_eq!(bad_login.status().as_u16(), 401);

    // Owner creates a quiz
    let created = client
        .post(format!("{}/api/quizzes", app.address))
        .header("Authorization", format!("Bearer {}", tokens[0]))
        .json(&sample_quiz())
        .send()
        .await
        .unwrap();
    assert_eq!(created.status().as_u16(), 201);
    let quiz: Value = created.json().await.unwrap();
    let quiz_id = quiz["id"].as_str().unwrap();

    // The other teacher can neither read nor delete it
    let foreign = client
        .get(format!("{}/api/quizzes/{}", app.address, quiz_id))
        .header("Authorization", format!("Bearer {}", tokens[1]))
        .send()
        .await
        .unwrap();
    assert_eq!(foreign.status().as_u16(), 403);

    let listed: Vec<Value> = client
        .get(format!("{}/api/quizzes", app.address))
        .header("Authorization", format!("Bearer {}", tokens[1]))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(listed.is_empty());

    // Garbage token
    let garbage = client
        .get(format!("{}/api/quizzes", app.address))
        .header("Authorization", "Bearer not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(garbage.status().as_u16(), 401);
}

#[tokio::test]
async fn teacher_routes_are_open_when_auth_is_off() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let quiz = create_quiz(&client, &app.address, &sample_quiz()).await;

    let pin = quiz["pin"].as_str().unwrap();
    assert_eq!(pin.len(), 6);
    assert!(pin.chars().all(|c| c.is_ascii_digit()));
    assert_eq!(quiz["questions"].as_array().unwrap().len(), 2);
    assert_eq!(quiz["questions"][0]["order_index"], 0);
    assert_eq!(quiz["questions"][1]["timer"], 30);
    assert_eq!(quiz["required_fields"]["name"], true);
}

#[tokio::test]
async fn create_quiz_rejects_incomplete_questions() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let cases = [
        json!({ "title": "  ", "questions": sample_quiz()["questions"] }),
        json!({ "title": "Empty", "questions": [] }),
        json!({ "title": "No options", "questions": [
            { "type": "multiple_choice", "question_text": "Q", "options": [], "correct_answer": "A" }
        ]}),
        json!({ "title": "Blank option", "questions": [
            { "type": "multiple_choice", "question_text": "Q", "options": ["A", " "], "correct_answer": "A" }
        ]}),
        json!({ "title": "No answer", "questions": [
            { "type": "text_input", "question_text": "Q", "correct_answer": "" }
        ]}),
        json!({ "title": "Too many points", "questions": [
            { "type": "text_input", "question_text": "Q", "correct_answer": "A", "points": 2147483647 }
        ]}),
    ];

    for body in cases {
        let response = client
            .post(format!("{}/api/quizzes", app.address))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 400, "accepted {}", body);
    }

    let quizzes = app.state.store.list_quizzes(None).await.unwrap();
    assert!(quizzes.is_empty());
}

#[tokio::test]
async fn quiz_text_is_sanitized() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let quiz = create_quiz(
        &client,
        &app.address,
        &json!({
            "title": "<script>alert(1)</script>Toán",
            "questions": [
                { "type": "text_input", "question_text": "<b>2</b> + 2 = ?", "correct_answer": "4" }
            ]
        }),
    )
    .await;

    assert_eq!(quiz["title"], "Toán");
    assert_eq!(quiz["questions"][0]["question_text"], "2 + 2 = ?");
}

#[tokio::test]
async fn entity_encoded_markup_is_sanitized() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let quiz = create_quiz(
        &client,
        &app.address,
        &json!({
            "title": "&lt;script&gt;alert(1)&lt;/script&gt;Toán",
            "questions": [
                { "type": "text_input", "question_text": "&lt;img src=x onerror=alert(1)&gt;Q?", "correct_answer": "A &amp; B" }
            ]
        }),
    )
    .await;

    assert_eq!(quiz["title"], "Toán");
    assert_eq!(quiz["questions"][0]["question_text"], "Q?");
    assert_eq!(quiz["questions"][0]["correct_answer"], "A & B");
}

#[tokio::test]
async fn imported_points_are_capped() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let content = json!({
        "title": "Big",
        "questions": [
            { "type": "text_input", "question": "Q", "correct_answer": "A", "points": 2147483647, "timer": 99999 }
        ]
    })
    .to_string();

    let response = client
        .post(format!("{}/api/quizzes/import", app.address))
        .json(&json!({ "filename": "big.json", "content": content }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 201);
    let quiz: Value = response.json().await.unwrap();
    assert_eq!(quiz["questions"][0]["points"], 100_000);
    assert_eq!(quiz["questions"][0]["timer"], 3600);
}

#[tokio::test]
async fn csv_import_creates_quiz() {
    // Arrange
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let content = "question,type,correct_answer,option1,option2\n2+2?,multiple_choice,4,3,4\n";

    // Act
    let response = client
        .post(format!("{}/api/quizzes/import", app.address))
        .json(&json!({ "filename": "toan.csv", "content": content }))
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status().as_u16(), 201);
    let quiz: Value = response.json().await.unwrap();
    assert_eq!(quiz["title"], "Quiz từ CSV");
    let question = &quiz["questions"][0];
    assert_eq!(question["question_type"], "multiple_choice");
    assert_eq!(question["options"], json!(["3", "4"]));
    assert_eq!(question["correct_answer"], "4");
    assert_eq!(question["timer"], 30);
    assert_eq!(question["points"], 100);
}

#[tokio::test]
async fn csv_with_missing_headers_writes_nothing() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/quizzes/import", app.address))
        .json(&json!({ "filename": "bad.csv", "content": "question,timer\nQ,10\n" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "File CSV thiếu các cột: type, correct_answer");
    assert!(app.state.store.list_quizzes(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn unsupported_file_is_rejected() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/quizzes/parse", app.address))
        .json(&json!({ "filename": "notes.txt", "content": "hello" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn parse_previews_without_saving() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let content = json!({
        "title": "Loose",
        "questions": [
            { "question": "Q1", "type": "text_input", "correctAnswer": "a" }
        ]
    })
    .to_string();

    let response = client
        .post(format!("{}/api/quizzes/parse", app.address))
        .json(&json!({ "filename": "loose.json", "content": content }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    let parsed: Value = response.json().await.unwrap();
    assert_eq!(parsed["title"], "Loose");
    assert_eq!(parsed["questions"].as_array().unwrap().len(), 1);
    assert!(app.state.store.list_quizzes(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn exported_bob_file_imports_back() {
    // Arrange
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let quiz = create_quiz(&client, &app.address, &sample_quiz()).await;

    // Act: export the saved quiz
    let response = client
        .get(format!("{}/api/quizzes/{}/export", app.address, quiz["id"].as_str().unwrap()))
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status().as_u16(), 200);
    let disposition = response
        .headers()
        .get("content-disposition")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.ends_with(".bob\""), "{}", disposition);

    let content = response.text().await.unwrap();
    let bob: Value = serde_json::from_str(&content).unwrap();
    assert_eq!(bob["version"], "1.0");
    assert_eq!(bob["quiz"]["questions"][0]["type"], "multiple-choice");
    assert_eq!(bob["quiz"]["questions"][1]["type"], "fill-in-blank");

    // Re-import
    let imported: Value = client
        .post(format!("{}/api/quizzes/import", app.address))
        .json(&json!({ "filename": "copy.bob", "content": content }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(imported["title"], quiz["title"]);
    assert_ne!(imported["pin"], quiz["pin"]);
    for (a, b) in imported["questions"]
        .as_array()
        .unwrap()
        .iter()
        .zip(quiz["questions"].as_array().unwrap())
    {
        assert_ne!(a["id"], b["id"]);
        assert_eq!(a["question_text"], b["question_text"]);
        assert_eq!(a["question_type"], b["question_type"]);
        assert_eq!(a["options"], b["options"]);
        assert_eq!(a["correct_answer"], b["correct_answer"]);
        assert_eq!(a["timer"], b["timer"]);
    }
}

#[tokio::test]
async fn draft_export_names_the_file_after_the_title() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/quizzes/export", app.address))
        .json(&json!({
            "title": "My Quiz!",
            "questions": [
                { "type": "text_input", "question_text": "Q", "correct_answer": "A", "timer": 45 }
            ]
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(
        response.headers().get("content-disposition").unwrap(),
        "attachment; filename=\"my_quiz_.bob\""
    );
    let bob: Value = response.json().await.unwrap();
    assert_eq!(bob["quiz"]["questions"][0]["timer"], 45);
    assert_eq!(bob["quiz"]["studentCount"], 50);
}

#[tokio::test]
async fn unknown_pin_creates_no_participant() {
    // Arrange
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let quiz = create_quiz(&client, &app.address, &sample_quiz()).await;
    let session: Value = client
        .post(format!("{}/api/quizzes/{}/sessions", app.address, quiz["id"].as_str().unwrap()))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let wrong_pin = if quiz["pin"] == "999999" { "100000" } else { "999999" };

    // Act
    let lookup = client
        .get(format!("{}/api/play/{}", app.address, wrong_pin))
        .send()
        .await
        .unwrap();
    let register = client
        .post(format!("{}/api/play/{}/participants", app.address, wrong_pin))
        .json(&json!({ "name": "An" }))
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(lookup.status().as_u16(), 404);
    let body: Value = lookup.json().await.unwrap();
    assert_eq!(body["error"], "Mã PIN không đúng. Vui lòng thử lại.");
    assert_eq!(register.status().as_u16(), 404);

    let session_id = session["id"].as_str().unwrap().parse().unwrap();
    let participants = app.state.store.list_participants(session_id).await.unwrap();
    assert!(participants.is_empty());

    let malformed = client
        .get(format!("{}/api/play/12ab", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(malformed.status().as_u16(), 400);
}

#[tokio::test]
async fn pin_without_session_reports_missing_session() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let quiz = create_quiz(&client, &app.address, &sample_quiz()).await;

    let response = client
        .get(format!("{}/api/play/{}", app.address, quiz["pin"].as_str().unwrap()))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Không tìm thấy phiên chơi. Vui lòng liên hệ người tổ chức.");
}

#[tokio::test]
async fn lookup_hides_correct_answers() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let quiz = create_quiz(&client, &app.address, &sample_quiz()).await;
    client
        .post(format!("{}/api/quizzes/{}/sessions", app.address, quiz["id"].as_str().unwrap()))
        .send()
        .await
        .unwrap();

    let view: Value = client
        .get(format!("{}/api/play/{}", app.address, quiz["pin"].as_str().unwrap()))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(view["session"]["status"], "waiting");
    assert_eq!(view["quiz"]["title"], "Địa lý Việt Nam");
    for question in view["questions"].as_array().unwrap() {
        assert!(question.get("correct_answer").is_none());
    }
}

#[tokio::test]
async fn registration_enforces_required_fields() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let mut body = sample_quiz();
    body["required_fields"] = json!({ "name": true, "email": true, "phone": true });
    let quiz = create_quiz(&client, &app.address, &body).await;
    client
        .post(format!("{}/api/quizzes/{}/sessions", app.address, quiz["id"].as_str().unwrap()))
        .send()
        .await
        .unwrap();
    let url = format!("{}/api/play/{}/participants", app.address, quiz["pin"].as_str().unwrap());

    let missing = client.post(&url).json(&json!({ "name": "An" })).send().await.unwrap();
    assert_eq!(missing.status().as_u16(), 400);

    let bad_phone = client
        .post(&url)
        .json(&json!({ "name": "An", "email": "an@example.com", "phone": "12" }))
        .send()
        .await
        .unwrap();
    assert_eq!(bad_phone.status().as_u16(), 400);

    let ok = client
        .post(&url)
        .json(&json!({ "name": " An ", "email": "an@example.com", "phone": "0901234567" }))
        .send()
        .await
        .unwrap();
    assert_eq!(ok.status().as_u16(), 201);
    let participant: Value = ok.json().await.unwrap();
    assert_eq!(participant["name"], "An");
    assert_eq!(participant["score"], 0);
    assert_eq!(participant["phone"], "0901234567");
}

#[tokio::test]
async fn deleting_a_quiz_removes_its_sessions() {
    // Arrange
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let quiz = create_quiz(&client, &app.address, &sample_quiz()).await;
    let quiz_id = quiz["id"].as_str().unwrap();
    let session: Value = client
        .post(format!("{}/api/quizzes/{}/sessions", app.address, quiz_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let participant: Value = client
        .post(format!("{}/api/play/{}/participants", app.address, quiz["pin"].as_str().unwrap()))
        .json(&json!({ "name": "An" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // Act
    let response = client
        .delete(format!("{}/api/quizzes/{}", app.address, quiz_id))
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status().as_u16(), 204);

    let gone = client
        .get(format!("{}/api/sessions/{}", app.address, session["id"].as_str().unwrap()))
        .send()
        .await
        .unwrap();
    assert_eq!(gone.status().as_u16(), 404);

    let participant_id = participant["id"].as_str().unwrap().parse().unwrap();
    assert!(app.state.store.get_participant(participant_id).await.unwrap().is_none());

    let again = client
        .delete(format!("{}/api/quizzes/{}", app.address, quiz_id))
        .send()
        .await
        .unwrap();
    assert_eq!(again.status().as_u16(), 404);
}
