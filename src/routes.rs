use axum::{
    routing::{get, post},
    Router,
};

use crate::{auth, billing, chat, decode, entitlements, prompts, voice};

pub fn api_routes() -> Router {
    Router::new()
        .route("/api/register", post(auth::register_user))
        .route("/api/login", post(auth::login_user))
        .route("/api/logout", post(auth::logout_user))
        .route("/api/me", get(auth::current_user))
        .merge(entitlements::api::routes())
        .merge(chat::routes())
        .merge(prompts::routes())
        .merge(voice::routes())
        .merge(decode::routes())
        .merge(billing::routes())
}
