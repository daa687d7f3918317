//! Chat message gateway: the highest-volume metered action.
//!
//! Quota is reserved before the provider call (a failed call still consumes
//! the unit) and the reservation transaction is never held open across it.

use axum::{
    extract::Extension,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use std::sync::Arc;

use crate::completion::{ChatTurn, CompletionProvider};
use crate::entitlements::api::MeteredResponse;
use crate::entitlements::enforcer::QuotaEnforcer;
use crate::entitlements::policy::ResourceType;
use crate::error::{AppError, AppResult};
use crate::extractor::AuthUser;

const SYSTEM_PROMPT: &str = "You are Attune, a calm and supportive conversational assistant. \
Respond briefly, warmly and concretely.";

/// Turns replayed to the provider as conversation context.
const CONTEXT_TURNS: i64 = 20;

#[derive(Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

#[derive(Serialize)]
pub struct ChatReply {
    pub reply: String,
}

#[derive(Serialize, FromRow)]
pub struct ChatMessage {
    pub id: i64,
    pub role: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

pub async fn send_message(
    Extension(pool): Extension<PgPool>,
    Extension(provider): Extension<Arc<dyn CompletionProvider>>,
    AuthUser { user_id }: AuthUser,
    Json(payload): Json<SendMessageRequest>,
) -> AppResult<Json<MeteredResponse<ChatReply>>> {
    let content = payload.content.trim().to_string();
    if content.is_empty() {
        return Err(AppError::BadRequest("Message must not be empty".into()));
    }

    let enforcer = QuotaEnforcer::new(pool.clone());
    let decision = enforcer
        .check_and_reserve(user_id, ResourceType::Message, Utc::now())
        .await?;
    if !decision.allowed {
        return Err(decision.deny_error());
    }

    let mut turns = vec![ChatTurn::system(SYSTEM_PROMPT)];
    let history: Vec<(String, String)> = sqlx::query_as(
        "SELECT role, content FROM (
             SELECT id, role, content FROM chat_messages
             WHERE account_id = $1 ORDER BY id DESC LIMIT $2
         ) recent ORDER BY id ASC",
    )
    .bind(user_id)
    .bind(CONTEXT_TURNS)
    .fetch_all(&pool)
    .await?;
    for (role, text) in history {
        turns.push(ChatTurn { role, content: text });
    }
    turns.push(ChatTurn::user(content.clone()));

    let reply = provider
        .complete(&turns)
        .await
        .map_err(|e| AppError::Provider(e.to_string()))?;

    sqlx::query(
        "INSERT INTO chat_messages (account_id, role, content)
         VALUES ($1, 'user', $2), ($1, 'assistant', $3)",
    )
    .bind(user_id)
    .bind(&content)
    .bind(&reply)
    .execute(&pool)
    .await?;

    Ok(Json(decision.into_envelope(ChatReply { reply })))
}

pub async fn list_messages(
    Extension(pool): Extension<PgPool>,
    AuthUser { user_id }: AuthUser,
) -> AppResult<Json<Vec<ChatMessage>>> {
    let messages = sqlx::query_as::<_, ChatMessage>(
        "SELECT id, role, content, created_at FROM chat_messages
         WHERE account_id = $1 ORDER BY id ASC LIMIT 200",
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await?;
    Ok(Json(messages))
}

pub fn routes() -> Router {
    Router::new().route(
        "/api/chat/messages",
        get(list_messages).post(send_message),
    )
}
