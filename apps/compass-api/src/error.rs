//! Error types for the Legal Compass API

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use marketplace_core::{FieldError, QuotaError, TemplateError, TransitionError};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error(transparent)]
    Quota(#[from] QuotaError),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Too many requests: {0}")]
    RateLimited(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<Vec<FieldError>>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    trial_exhausted: bool,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) | ApiError::Transition(TransitionError::Invalid { .. }) => {
                StatusCode::CONFLICT
            }
            ApiError::Transition(TransitionError::Forbidden { .. }) => StatusCode::FORBIDDEN,
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Validation(_) | ApiError::Template(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Quota(_) => StatusCode::PAYMENT_REQUIRED,
            ApiError::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized => "UNAUTHORIZED",
            ApiError::InvalidCredentials => "INVALID_CREDENTIALS",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::InvalidRequest(_) => "INVALID_REQUEST",
            ApiError::Validation(_) => "VALIDATION_FAILED",
            ApiError::Quota(QuotaError::TrialExhausted) => "TRIAL_EXHAUSTED",
            ApiError::Quota(_) => "QUOTA_EXCEEDED",
            ApiError::Transition(_) => "INVALID_TRANSITION",
            ApiError::Template(_) => "TEMPLATE_ERROR",
            ApiError::NotConfigured(_) => "NOT_CONFIGURED",
            ApiError::Upstream(_) => "UPSTREAM_ERROR",
            ApiError::RateLimited(_) => "RATE_LIMIT_EXCEEDED",
            ApiError::Database(_) => "DATABASE_ERROR",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let message = match &self {
            ApiError::Database(e) => {
                tracing::error!("Database error: {}", e);
                "Database error".to_string()
            }
            ApiError::Internal(e) => {
                tracing::error!("Internal error: {:#}", e);
                "Internal error".to_string()
            }
            ApiError::Validation(errors) => marketplace_core::intake::summarize(errors),
            other => other.to_string(),
        };

        let body = ErrorResponse {
            success: false,
            error: message,
            code,
            fields: match self {
                ApiError::Validation(errors) => Some(errors),
                _ => None,
            },
            trial_exhausted: code == "TRIAL_EXHAUSTED",
        };

        (status, Json(body)).into_response()
    }
}

/// Unique-constraint violations surface as conflicts
pub fn conflict_on_unique(message: &str) -> impl FnOnce(sqlx::Error) -> ApiError + '_ {
    move |e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            ApiError::Conflict(message.to_string())
        }
        _ => ApiError::Database(e),
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
