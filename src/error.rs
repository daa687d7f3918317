use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::entitlements::api::UsageInfo;
use crate::entitlements::policy::ResourceType;
use crate::entitlements::tiers::EffectiveTier;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("completion provider error: {0}")]
    Provider(String),
    #[error("not found")]
    NotFound,
    #[error("unauthorized")]
    Unauthorized,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("{resource} is not available on the {tier} tier")]
    UpgradeRequired {
        tier: EffectiveTier,
        resource: ResourceType,
    },
    #[error("{resource} quota exhausted for the current window")]
    QuotaExhausted {
        resource: ResourceType,
        usage: UsageInfo,
        upgrade_required: bool,
    },
    #[error("{0}")]
    Message(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::UpgradeRequired { .. } => {
                tracing::info!(%self, "metered action denied");
                let body = json!({ "error": self.to_string(), "upgradeRequired": true });
                (StatusCode::FORBIDDEN, Json(body)).into_response()
            }
            AppError::QuotaExhausted {
                ref usage,
                upgrade_required,
                ..
            } => {
                tracing::info!(%self, "metered action denied");
                let body = json!({
                    "error": self.to_string(),
                    "upgradeRequired": upgrade_required,
                    "usage": usage,
                });
                (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response()
            }
            _ => {
                let status = match self {
                    AppError::NotFound => StatusCode::NOT_FOUND,
                    AppError::Unauthorized => StatusCode::UNAUTHORIZED,
                    AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
                    AppError::Provider(_) => StatusCode::BAD_GATEWAY,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                tracing::error!(?self);
                (status, self.to_string()).into_response()
            }
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
