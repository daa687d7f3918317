//! Decode analysis gateway: the premium, monthly-windowed action.

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

const DECODE_PREAMBLE: &str = "You are Attune performing a decode analysis. \
Read the passage closely and return the recurring themes, emotional patterns \
and one concrete suggestion, as short labelled sections.";

#[derive(Deserialize)]
pub struct DecodeRequest {
    pub text: String,
}

#[derive(Serialize)]
pub struct DecodeResult {
    pub analysis: String,
}

pub async fn decode(
    Extension(pool): Extension<PgPool>,
    Extension(provider): Extension<Arc<dyn CompletionProvider>>,
    AuthUser { user_id }: AuthUser,
    Json(payload): Json<DecodeRequest>,
) -> AppResult<Json<MeteredResponse<DecodeResult>>> {
    let text = payload.text.trim().to_string();
    if text.is_empty() {
        return Err(AppError::BadRequest("Text must not be empty".into()));
    }

    let enforcer = QuotaEnforcer::new(pool);
    let decision = enforcer
        .check_and_reserve(user_id, ResourceType::Decode, Utc::now())
        .await?;
    if !decision.allowed {
        return Err(decision.deny_error());
    }

    let turns = [ChatTurn::system(DECODE_PREAMBLE), ChatTurn::user(text)];
    let analysis = provider
        .complete(&turns)
        .await
        .map_err(|e| AppError::Provider(e.to_string()))?;

    Ok(Json(decision.into_envelope(DecodeResult { analysis })))
}

pub fn routes() -> Router {
    Router::new().route("/api/decode", post(decode))
}
