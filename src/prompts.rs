//! Guided prompt gateway.

use axum::{extract::Extension, routing::post, Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;

use crate::completion::{ChatTurn, CompletionProvider};
use crate::entitlements::api::MeteredResponse;
use crate::entitlements::enforcer::QuotaEnforcer;
use crate::entitlements::policy::ResourceType;
use crate::error::{AppError, AppResult};
use crate::extractor::AuthUser;

const PROMPT_PREAMBLE: &str = "You are Attune running a guided reflection prompt. \
Work through the exercise the user has chosen, one step at a time.";

#[derive(Deserialize)]
pub struct RunPromptRequest {
    pub prompt: String,
}

#[derive(Serialize)]
pub struct PromptResult {
    pub output: String,
}

pub async fn run_prompt(
    Extension(pool): Extension<PgPool>,
    Extension(provider): Extension<Arc<dyn CompletionProvider>>,
    AuthUser { user_id }: AuthUser,
    Json(payload): Json<RunPromptRequest>,
) -> AppResult<Json<MeteredResponse<PromptResult>>> {
    let prompt = payload.prompt.trim().to_string();
    if prompt.is_empty() {
        return Err(AppError::BadRequest("Prompt must not be empty".into()));
    }

    let enforcer = QuotaEnforcer::new(pool);
    let decision = enforcer
        .check_and_reserve(user_id, ResourceType::Prompt, Utc::now())
        .await?;
    if !decision.allowed {
        return Err(decision.deny_error());
    }

    let turns = [ChatTurn::system(PROMPT_PREAMBLE), ChatTurn::user(prompt)];
    let output = provider
        .complete(&turns)
        .await
        .map_err(|e| AppError::Provider(e.to_string()))?;

    Ok(Json(decision.into_envelope(PromptResult { output })))
}

pub fn routes() -> Router {
    Router::new().route("/api/prompts/run", post(run_prompt))
}
