//! Voice response gateway.

use axum::{extract::Extension, routing::post, Json, Router};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;

use crate::completion::CompletionProvider;
use crate::entitlements::api::MeteredResponse;
use crate::entitlements::enforcer::QuotaEnforcer;
use crate::entitlements::policy::ResourceType;
use crate::error::{AppError, AppResult};
use crate::extractor::AuthUser;

#[derive(Deserialize)]
pub struct SpeakRequest {
    pub text: String,
}

#[derive(Serialize)]
pub struct VoiceResult {
    /// Base64-encoded audio bytes.
    pub audio: String,
    pub format: &'static str,
}

pub async fn speak(
    Extension(pool): Extension<PgPool>,
    Extension(provider): Extension<Arc<dyn CompletionProvider>>,
    AuthUser { user_id }: AuthUser,
    Json(payload): Json<SpeakRequest>,
) -> AppResult<Json<MeteredResponse<VoiceResult>>> {
    let text = payload.text.trim().to_string();
    if text.is_empty() {
        return Err(AppError::BadRequest("Text must not be empty".into()));
    }

    let enforcer = QuotaEnforcer::new(pool);
    let decision = enforcer
        .check_and_reserve(user_id, ResourceType::Voice, Utc::now())
        .await?;
    if !decision.allowed {
        return Err(decision.deny_error());
    }

    let audio = provider
        .synthesize(&text)
        .await
        .map_err(|e| AppError::Provider(e.to_string()))?;

    Ok(Json(decision.into_envelope(VoiceResult {
        audio: BASE64.encode(audio),
        format: "mp3",
    })))
}

pub fn routes() -> Router {
    Router::new().route("/api/voice/speak", post(speak))
}
