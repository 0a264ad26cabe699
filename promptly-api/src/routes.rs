//! HTTP routes for the Promptly API.
//!
//! All `/api/prompts` and `/api/users` routes sit behind the bearer-token
//! auth middleware. AI-backed routes return the provider payload directly;
//! persistence routes wrap their data in a `{ message, userId, data }`
//! envelope.

use axum::extract::{Path as AxumPath, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{middleware, Extension, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use promptly_common::Config;

use crate::ai::{
    self, AiService, CandidateEvaluation, Evaluation, PromptSuggestionSet, Revision, UserProfile,
};
use crate::auth::{auth_middleware, AuthState, AuthUser};
use crate::error::ApiError;
use crate::store::{ProfileUpdate, PromptType, Store};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthState,
    pub store: Store,
    pub ai: Arc<dyn AiService>,
}

/// Build the router from config, storing data at the configured path.
pub fn build_router(config: &Config) -> anyhow::Result<Router> {
    build_router_with_db(config, None)
}

/// Build the router with an explicit database path (used by tests).
pub fn build_router_with_db(config: &Config, db_path: Option<PathBuf>) -> anyhow::Result<Router> {
    let auth = AuthState::new(config.auth_secret());
    let db_path = db_path.unwrap_or_else(|| config.database.resolved_path());
    let store = Store::new(&db_path)?;
    let ai = ai::create_service(&config.ai);

    info!(provider = %config.ai.provider, db = %db_path.display(), "Promptly API state initialized");

    let state = AppState { auth: auth.clone(), store, ai };

    let prompt_routes = Router::new()
        .route("/generate-suggestions", post(generate_suggestions))
        .route(
            "/generate-suggestions-for-prompt",
            post(generate_suggestions_for_prompt),
        )
        .route("/revise-suggestion", post(revise_suggestion))
        .route("/evaluate-custom", post(evaluate_custom))
        .route("/revise-custom", post(revise_custom))
        .route("/generate", post(create_prompt))
        .route("/user", get(list_prompts))
        .route("/:prompt_id", put(update_prompt))
        .route("/usage_record", post(record_usage));

    let user_routes = Router::new().route("/profile", get(get_profile).put(update_profile));

    let router = Router::new()
        .route("/", get(root))
        .route("/api/health", get(health))
        .nest(
            "/api/prompts",
            prompt_routes.layer(middleware::from_fn_with_state(auth.clone(), auth_middleware)),
        )
        .nest(
            "/api/users",
            user_routes.layer(middleware::from_fn_with_state(auth, auth_middleware)),
        )
        .fallback(not_found)
        .layer(CorsLayer::permissive())
        .with_state(state);

    Ok(router)
}

// ----------------------------------------------------------------------
// Service routes
// ----------------------------------------------------------------------

async fn root() -> &'static str {
    "Promptly API is running"
}

static STARTED_AT: OnceLock<Instant> = OnceLock::new();

async fn health() -> Json<Value> {
    let started = STARTED_AT.get_or_init(Instant::now);
    Json(json!({
        "uptime": started.elapsed().as_secs_f64(),
        "message": "OK",
        "timestamp": chrono::Utc::now().timestamp_millis(),
    }))
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": true, "message": "Route not found" })),
    )
}

// ----------------------------------------------------------------------
// AI routes
// ----------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateSuggestionsRequest {
    #[serde(default)]
    user_profile: Option<UserProfile>,
}

async fn generate_suggestions(
    State(state): State<AppState>,
    Json(body): Json<GenerateSuggestionsRequest>,
) -> Result<Json<PromptSuggestionSet>, ApiError> {
    let profile = body
        .user_profile
        .ok_or_else(|| ApiError::validation("User profile is required"))?;

    let suggestions = state.ai.generate_prompt_suggestions(&profile).await.map_err(|e| {
        error!(error = %e, "Suggestion generation failed");
        ApiError::internal("Failed to generate suggestions")
    })?;

    Ok(Json(suggestions))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SuggestionsForPromptRequest {
    #[serde(default)]
    user_profile: Option<UserProfile>,
    #[serde(default)]
    selected_prompt: Option<String>,
}

async fn generate_suggestions_for_prompt(
    State(state): State<AppState>,
    Json(body): Json<SuggestionsForPromptRequest>,
) -> Result<Json<PromptSuggestionSet>, ApiError> {
    let (profile, prompt) = match (body.user_profile, body.selected_prompt) {
        (Some(profile), Some(prompt)) if !prompt.trim().is_empty() => (profile, prompt),
        _ => return Err(ApiError::validation("User profile and selected prompt are required")),
    };

    let suggestions = state
        .ai
        .generate_suggestions_for_prompt(&profile, &prompt)
        .await
        .map_err(|e| {
            error!(error = %e, "Suggestion generation failed");
            ApiError::internal("Failed to generate suggestions")
        })?;

    Ok(Json(suggestions))
}

#[derive(Debug, Deserialize)]
struct ReviseSuggestionRequest {
    #[serde(default)]
    prompt: Option<String>,
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    evaluation: Option<CandidateEvaluation>,
    #[serde(default)]
    feedback: Option<String>,
}

async fn revise_suggestion(
    State(state): State<AppState>,
    Json(body): Json<ReviseSuggestionRequest>,
) -> Result<Json<Revision>, ApiError> {
    let (prompt, response, evaluation, feedback) =
        match (body.prompt, body.response, body.evaluation, body.feedback) {
            (Some(p), Some(r), Some(e), Some(f)) => (p, r, e, f),
            _ => return Err(ApiError::validation("Missing required fields for revision")),
        };

    let revision = state
        .ai
        .revise_prompt_suggestion(&prompt, &response, &evaluation, &feedback)
        .await
        .map_err(|e| {
            error!(error = %e, "Suggestion revision failed");
            ApiError::internal("Failed to revise suggestion")
        })?;

    Ok(Json(revision))
}

#[derive(Debug, Deserialize)]
struct EvaluateRequest {
    #[serde(default)]
    prompt: Option<String>,
    #[serde(default)]
    response: Option<String>,
}

async fn evaluate_custom(
    State(state): State<AppState>,
    Json(body): Json<EvaluateRequest>,
) -> Result<Json<Evaluation>, ApiError> {
    let (prompt, response) = match (body.prompt, body.response) {
        (Some(p), Some(r)) => (p, r),
        _ => return Err(ApiError::validation("Prompt and response are required")),
    };

    let evaluation = state.ai.evaluate_user_prompt(&prompt, &response).await.map_err(|e| {
        error!(error = %e, "Evaluation failed");
        ApiError::internal("Failed to evaluate user prompt")
    })?;

    Ok(Json(evaluation))
}

#[derive(Debug, Deserialize)]
struct ReviseCustomRequest {
    #[serde(default)]
    prompt: Option<String>,
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    evaluation: Option<Evaluation>,
    #[serde(default)]
    suggestions: Option<Vec<String>>,
}

async fn revise_custom(
    State(state): State<AppState>,
    Json(body): Json<ReviseCustomRequest>,
) -> Result<Json<Revision>, ApiError> {
    let (prompt, response, evaluation, suggestions) =
        match (body.prompt, body.response, body.evaluation, body.suggestions) {
            (Some(p), Some(r), Some(e), Some(s)) => (p, r, e, s),
            _ => return Err(ApiError::validation("Missing required fields for revision")),
        };

    let revision = state
        .ai
        .revise_user_prompt(&prompt, &response, &evaluation, &suggestions)
        .await
        .map_err(|e| {
            error!(error = %e, "User prompt revision failed");
            ApiError::internal("Failed to revise user prompt")
        })?;

    Ok(Json(revision))
}

// ----------------------------------------------------------------------
// Persistence routes
// ----------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePromptRequest {
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    response_text: Option<String>,
    #[serde(default)]
    prompt_type: Option<PromptType>,
}

async fn create_prompt(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<CreatePromptRequest>,
) -> Result<Json<Value>, ApiError> {
    let (category, response_text) = match (body.category, body.response_text) {
        (Some(c), Some(r)) if !c.trim().is_empty() && !r.trim().is_empty() => (c, r),
        _ => return Err(ApiError::validation("Category and response text are required")),
    };

    let owner = state
        .store
        .get_user_by_external_id(&user.user_id)
        .map_err(|e| {
            error!(error = %e, "User lookup failed");
            ApiError::internal("Failed to generate prompt")
        })?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let prompt_type = body.prompt_type.unwrap_or(PromptType::Generated);
    let prompt = state
        .store
        .insert_prompt(&owner.id, &category, &response_text, prompt_type)
        .map_err(|e| {
            error!(error = %e, "Prompt insert failed");
            ApiError::internal("Failed to generate prompt")
        })?;

    info!(user_id = %user.user_id, prompt_id = %prompt.id, "Prompt saved");

    Ok(Json(json!({
        "message": "Prompt generated and saved successfully",
        "userId": user.user_id,
        "data": prompt,
    })))
}

async fn list_prompts(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, ApiError> {
    let owner = state
        .store
        .get_user_by_external_id(&user.user_id)
        .map_err(|e| {
            error!(error = %e, "User lookup failed");
            ApiError::internal("Failed to fetch user prompts")
        })?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let prompts = state.store.list_active_prompts(&owner.id).map_err(|e| {
        error!(error = %e, "Prompt listing failed");
        ApiError::internal("Failed to fetch user prompts")
    })?;

    Ok(Json(json!({
        "message": "User prompts retrieved successfully",
        "userId": user.user_id,
        "data": prompts,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdatePromptRequest {
    #[serde(default)]
    response_text: Option<String>,
}

async fn update_prompt(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AxumPath(prompt_id): AxumPath<String>,
    Json(body): Json<UpdatePromptRequest>,
) -> Result<Json<Value>, ApiError> {
    let response_text = match body.response_text {
        Some(text) if !text.trim().is_empty() => text,
        _ => return Err(ApiError::validation("Response text is required")),
    };

    let owner = state
        .store
        .get_user_by_external_id(&user.user_id)
        .map_err(|e| {
            error!(error = %e, "User lookup failed");
            ApiError::internal("Failed to update prompt")
        })?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let prompt = state
        .store
        .update_prompt_text(&prompt_id, &owner.id, &response_text)
        .map_err(|e| {
            error!(error = %e, "Prompt update failed");
            ApiError::internal("Failed to update prompt")
        })?
        .ok_or_else(|| ApiError::not_found("Prompt not found"))?;

    Ok(Json(json!({
        "message": "Prompt updated successfully",
        "userId": user.user_id,
        "data": prompt,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordUsageRequest {
    #[serde(default)]
    prompt_id: Option<String>,
}

async fn record_usage(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<RecordUsageRequest>,
) -> Result<Json<Value>, ApiError> {
    let prompt_id = match body.prompt_id {
        Some(id) if !id.trim().is_empty() => id,
        _ => return Err(ApiError::validation("Prompt ID is required")),
    };

    state
        .store
        .get_user_by_external_id(&user.user_id)
        .map_err(|e| {
            error!(error = %e, "User lookup failed");
            ApiError::internal("Failed to save prompt usage record")
        })?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let usage = state.store.record_usage(&prompt_id, &user.user_id).map_err(|e| {
        error!(error = %e, "Usage record failed");
        ApiError::internal("Failed to save prompt usage record")
    })?;

    Ok(Json(json!({
        "message": "Prompt usage record saved successfully",
        "userId": user.user_id,
        "data": usage,
    })))
}

async fn get_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, ApiError> {
    let lookup = state.store.get_user_by_external_id(&user.user_id).map_err(|e| {
        error!(error = %e, "Profile lookup failed");
        ApiError::internal("Failed to fetch user profile")
    })?;

    // First contact creates an empty profile row
    let profile = match lookup {
        Some(profile) => profile,
        None => state
            .store
            .create_user(&user.user_id, user.email.as_deref())
            .map_err(|e| {
                error!(error = %e, "Profile auto-create failed");
                ApiError::internal("Failed to fetch user profile")
            })?,
    };

    Ok(Json(json!({
        "message": "User profile retrieved",
        "userId": user.user_id,
        "data": profile,
    })))
}

async fn update_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<ProfileUpdate>,
) -> Result<Json<Value>, ApiError> {
    let profile = state.store.upsert_profile(&user.user_id, &body).map_err(|e| {
        error!(error = %e, "Profile upsert failed");
        ApiError::internal("Failed to update user profile")
    })?;

    Ok(Json(json!({
        "message": "User profile updated successfully",
        "userId": user.user_id,
        "data": profile,
    })))
}
