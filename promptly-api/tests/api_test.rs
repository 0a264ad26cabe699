//! End-to-end tests over the full router with the mock AI service.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use promptly_api::auth::AuthState;
use promptly_api::routes::build_router_with_db;
use promptly_api::store::Store;
use promptly_common::Config;

const TEST_SECRET: &str = "sk_test_secret-key-32-bytes-long!!";

struct TestApp {
    router: Router,
    auth: AuthState,
    dir: TempDir,
}

impl TestApp {
    fn token(&self, user_id: &str) -> String {
        self.auth
            .issue_session(user_id, Some("quinn@example.com"))
            .unwrap()
    }

    /// Open a second handle on the same database file, for asserting the
    /// absence of side effects.
    fn store(&self) -> Store {
        Store::new(&self.dir.path().join("promptly.db")).unwrap()
    }
}

fn create_test_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();

    let mut config = Config::default();
    config.auth.publishable_key = Some("pk_test_abc".to_string());
    config.auth.secret_key = Some(TEST_SECRET.to_string());

    let router = build_router_with_db(&config, Some(dir.path().join("promptly.db"))).unwrap();

    TestApp {
        router,
        auth: AuthState::new(TEST_SECRET),
        dir,
    }
}

async fn request_json(
    app: &TestApp,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    let request = match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn sample_profile() -> Value {
    json!({
        "gender": "man",
        "targetGender": "women",
        "tones": ["playful", "witty"],
        "interests": ["tennis", "cooking"],
        "specificLove": "fermenting my own kimchi"
    })
}

// ----------------------------------------------------------------------
// Service surface
// ----------------------------------------------------------------------

#[tokio::test]
async fn test_health() {
    let app = create_test_app();
    let (status, body) = request_json(&app, "GET", "/api/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "OK");
    assert!(body["uptime"].is_number());
    assert!(body["timestamp"].is_number());
}

#[tokio::test]
async fn test_unknown_route_returns_404() {
    let app = create_test_app();
    let (status, body) = request_json(&app, "GET", "/api/nope", None, None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], true);
    assert_eq!(body["message"], "Route not found");
}

// ----------------------------------------------------------------------
// Auth
// ----------------------------------------------------------------------

#[tokio::test]
async fn test_missing_token_rejected_without_side_effects() {
    let app = create_test_app();

    let (status, body) = request_json(&app, "GET", "/api/users/profile", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], true);
    assert_eq!(body["message"], "Authentication required");

    // The auto-create on profile fetch must not have run
    assert_eq!(app.store().count_users().unwrap(), 0);
}

#[tokio::test]
async fn test_invalid_token_rejected() {
    let app = create_test_app();
    let (status, body) =
        request_json(&app, "GET", "/api/prompts/user", Some("garbage"), None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Authentication required");
}

#[tokio::test]
async fn test_token_signed_with_wrong_secret_rejected() {
    let app = create_test_app();
    let other = AuthState::new("sk_test_some-other-secret");
    let token = other.issue_session("user_2abc", None).unwrap();

    let (status, _) =
        request_json(&app, "GET", "/api/users/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ----------------------------------------------------------------------
// User profiles
// ----------------------------------------------------------------------

#[tokio::test]
async fn test_get_profile_auto_creates() {
    let app = create_test_app();
    let token = app.token("user_2abc");

    let (status, body) =
        request_json(&app, "GET", "/api/users/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User profile retrieved");
    assert_eq!(body["userId"], "user_2abc");
    assert_eq!(body["data"]["clerkUserId"], "user_2abc");
    assert_eq!(body["data"]["profileCompleted"], false);

    // Second fetch returns the same row, not a new one
    let (status, _) = request_json(&app, "GET", "/api/users/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.store().count_users().unwrap(), 1);
}

#[tokio::test]
async fn test_update_profile_upserts() {
    let app = create_test_app();
    let token = app.token("user_2abc");

    // Creates the row with no prior GET
    let (status, body) = request_json(
        &app,
        "PUT",
        "/api/users/profile",
        Some(&token),
        Some(json!({
            "name": "Quinn",
            "age": 29,
            "interests": ["tennis", "matcha"],
            "profileCompleted": true
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User profile updated successfully");
    assert_eq!(body["data"]["name"], "Quinn");
    assert_eq!(body["data"]["age"], 29);
    assert_eq!(body["data"]["profileCompleted"], true);

    // Same key updates in place
    let (status, body) = request_json(
        &app,
        "PUT",
        "/api/users/profile",
        Some(&token),
        Some(json!({ "name": "Quinn R", "profileCompleted": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Quinn R");
    assert_eq!(app.store().count_users().unwrap(), 1);
}

// ----------------------------------------------------------------------
// Prompt persistence
// ----------------------------------------------------------------------

#[tokio::test]
async fn test_create_prompt_requires_existing_user() {
    let app = create_test_app();
    let token = app.token("user_2abc");

    let (status, body) = request_json(
        &app,
        "POST",
        "/api/prompts/generate",
        Some(&token),
        Some(json!({ "category": "hobbies", "responseText": "I hike" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "User not found");
}

#[tokio::test]
async fn test_create_prompt_validation() {
    let app = create_test_app();
    let token = app.token("user_2abc");

    let (status, body) = request_json(
        &app,
        "POST",
        "/api/prompts/generate",
        Some(&token),
        Some(json!({ "category": "hobbies" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Category and response text are required");
}

#[tokio::test]
async fn test_create_and_list_prompts() {
    let app = create_test_app();
    let token = app.token("user_2abc");

    // Establish the user row
    request_json(&app, "GET", "/api/users/profile", Some(&token), None).await;

    let (status, body) = request_json(
        &app,
        "POST",
        "/api/prompts/generate",
        Some(&token),
        Some(json!({ "category": "hobbies", "responseText": "I hike every weekend" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Prompt generated and saved successfully");
    assert_eq!(body["data"]["promptType"], "GENERATED");
    assert_eq!(body["data"]["aiGenerated"], true);

    // Explicit type disables the generated flag
    let (status, body) = request_json(
        &app,
        "POST",
        "/api/prompts/generate",
        Some(&token),
        Some(json!({
            "category": "hobbies",
            "responseText": "I wrote this one myself",
            "promptType": "USER_WRITTEN"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["aiGenerated"], false);

    let (status, body) =
        request_json(&app, "GET", "/api/prompts/user", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User prompts retrieved successfully");
    let prompts = body["data"].as_array().unwrap();
    assert_eq!(prompts.len(), 2);
    // Newest first
    assert_eq!(prompts[0]["responseText"], "I wrote this one myself");
}

#[tokio::test]
async fn test_list_prompts_requires_existing_user() {
    let app = create_test_app();
    let token = app.token("user_2abc");

    let (status, body) =
        request_json(&app, "GET", "/api/prompts/user", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "User not found");
}

#[tokio::test]
async fn test_update_prompt_marks_edited() {
    let app = create_test_app();
    let token = app.token("user_2abc");
    request_json(&app, "GET", "/api/users/profile", Some(&token), None).await;

    let (_, body) = request_json(
        &app,
        "POST",
        "/api/prompts/generate",
        Some(&token),
        Some(json!({ "category": "hobbies", "responseText": "I hike" })),
    )
    .await;
    let prompt_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = request_json(
        &app,
        "PUT",
        &format!("/api/prompts/{prompt_id}"),
        Some(&token),
        Some(json!({ "responseText": "I hike and climb" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Prompt updated successfully");
    assert_eq!(body["data"]["responseText"], "I hike and climb");
    assert_eq!(body["data"]["promptType"], "EDITED");
}

#[tokio::test]
async fn test_update_prompt_not_found() {
    let app = create_test_app();
    let token = app.token("user_2abc");
    request_json(&app, "GET", "/api/users/profile", Some(&token), None).await;

    let (status, body) = request_json(
        &app,
        "PUT",
        "/api/prompts/no-such-prompt",
        Some(&token),
        Some(json!({ "responseText": "anything" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Prompt not found");

    // Empty body fails validation before the lookup
    let (status, body) = request_json(
        &app,
        "PUT",
        "/api/prompts/no-such-prompt",
        Some(&token),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Response text is required");
}

#[tokio::test]
async fn test_usage_record() {
    let app = create_test_app();
    let token = app.token("user_2abc");
    request_json(&app, "GET", "/api/users/profile", Some(&token), None).await;

    let (_, body) = request_json(
        &app,
        "POST",
        "/api/prompts/generate",
        Some(&token),
        Some(json!({ "category": "hobbies", "responseText": "I hike" })),
    )
    .await;
    let prompt_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = request_json(
        &app,
        "POST",
        "/api/prompts/usage_record",
        Some(&token),
        Some(json!({ "promptId": prompt_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Prompt usage record saved successfully");
    assert_eq!(body["data"]["promptId"], prompt_id);
    assert_eq!(body["data"]["operationUser"], "user_2abc");

    let (status, _) = request_json(
        &app,
        "POST",
        "/api/prompts/usage_record",
        Some(&token),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ----------------------------------------------------------------------
// AI routes (mock service)
// ----------------------------------------------------------------------

#[tokio::test]
async fn test_generate_suggestions_shape() {
    let app = create_test_app();
    let token = app.token("user_2abc");

    let (status, body) = request_json(
        &app,
        "POST",
        "/api/prompts/generate-suggestions",
        Some(&token),
        Some(json!({ "userProfile": sample_profile() })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["chosenPrompt"].is_string());

    let responses = body["responses"].as_array().unwrap();
    assert_eq!(responses.len(), 3);

    let labels = ["Top-Tier", "Great Potential", "Room to Grow", "Needs Work"];
    for candidate in responses {
        let scores = &candidate["scores"];
        for dim in [
            "personality",
            "tone_fit",
            "brevity_clarity",
            "originality",
            "conversation_spark",
        ] {
            assert!(scores[dim].is_number(), "missing dimension {dim}");
        }
        assert!(labels.contains(&candidate["label"].as_str().unwrap()));
        assert!(candidate["overall_score"].as_f64().unwrap() <= 10.0);
    }
}

#[tokio::test]
async fn test_generate_suggestions_requires_profile() {
    let app = create_test_app();
    let token = app.token("user_2abc");

    let (status, body) = request_json(
        &app,
        "POST",
        "/api/prompts/generate-suggestions",
        Some(&token),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "User profile is required");
}

#[tokio::test]
async fn test_generate_suggestions_idempotent() {
    let app = create_test_app();
    let token = app.token("user_2abc");
    let body = json!({ "userProfile": sample_profile() });

    let (_, first) = request_json(
        &app,
        "POST",
        "/api/prompts/generate-suggestions",
        Some(&token),
        Some(body.clone()),
    )
    .await;
    let (_, second) = request_json(
        &app,
        "POST",
        "/api/prompts/generate-suggestions",
        Some(&token),
        Some(body),
    )
    .await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_generate_suggestions_for_selected_prompt() {
    let app = create_test_app();
    let token = app.token("user_2abc");

    let (status, body) = request_json(
        &app,
        "POST",
        "/api/prompts/generate-suggestions-for-prompt",
        Some(&token),
        Some(json!({
            "userProfile": sample_profile(),
            "selectedPrompt": "A perfect day for me looks like"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    // The caller's topic is echoed back, not replaced
    assert_eq!(body["chosenPrompt"], "A perfect day for me looks like");
    assert_eq!(body["responses"].as_array().unwrap().len(), 3);

    let (status, _) = request_json(
        &app,
        "POST",
        "/api/prompts/generate-suggestions-for-prompt",
        Some(&token),
        Some(json!({ "userProfile": sample_profile() })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_evaluate_then_revise_roundtrip() {
    let app = create_test_app();
    let token = app.token("user_2abc");

    let (status, evaluation) = request_json(
        &app,
        "POST",
        "/api/prompts/evaluate-custom",
        Some(&token),
        Some(json!({
            "prompt": "I won't shut up about",
            "response": "my sourdough starter"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(evaluation["scores"]["personality"].is_number());
    assert!(evaluation["suggestions"].as_array().unwrap().len() >= 1);

    // The evaluation payload feeds straight back into revision
    let suggestions = evaluation["suggestions"].clone();
    let (status, body) = request_json(
        &app,
        "POST",
        "/api/prompts/revise-custom",
        Some(&token),
        Some(json!({
            "prompt": "I won't shut up about",
            "response": "my sourdough starter",
            "evaluation": evaluation,
            "suggestions": suggestions
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["revisedResponse"].is_string());
}

#[tokio::test]
async fn test_evaluate_validation() {
    let app = create_test_app();
    let token = app.token("user_2abc");

    let (status, body) = request_json(
        &app,
        "POST",
        "/api/prompts/evaluate-custom",
        Some(&token),
        Some(json!({ "prompt": "I won't shut up about" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Prompt and response are required");
}

#[tokio::test]
async fn test_revise_suggestion() {
    let app = create_test_app();
    let token = app.token("user_2abc");

    // Take a generated candidate and ask for a revision of it
    let (_, suggestions) = request_json(
        &app,
        "POST",
        "/api/prompts/generate-suggestions",
        Some(&token),
        Some(json!({ "userProfile": sample_profile() })),
    )
    .await;
    let candidate = &suggestions["responses"][0];

    let (status, body) = request_json(
        &app,
        "POST",
        "/api/prompts/revise-suggestion",
        Some(&token),
        Some(json!({
            "prompt": suggestions["chosenPrompt"],
            "response": candidate["text"],
            "evaluation": {
                "scores": candidate["scores"],
                "explanations": candidate["explanations"]
            },
            "feedback": "Make it shorter and funnier"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["revisedResponse"].is_string());

    let (status, body) = request_json(
        &app,
        "POST",
        "/api/prompts/revise-suggestion",
        Some(&token),
        Some(json!({ "prompt": "x", "response": "y" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Missing required fields for revision");
}
