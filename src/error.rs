use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StorageError::Conflict(db.message().to_string())
            }
            _ => StorageError::Database(err),
        }
    }
}

/// Error returned by request handlers. `message` names the operation that failed.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}: {detail}")]
    BadRequest { message: &'static str, detail: String },

    #[error("{message}: {detail}")]
    Conflict { message: &'static str, detail: String },

    #[error("Invalid username or password")]
    Unauthorized,

    #[error("{message}: {cause}")]
    Internal {
        message: &'static str,
        cause: anyhow::Error,
    },
}

impl ApiError {
    pub fn payload(message: &'static str, rejection: JsonRejection) -> Self {
        ApiError::BadRequest {
            message,
            detail: rejection.body_text(),
        }
    }

    pub fn storage(message: &'static str, err: StorageError) -> Self {
        match err {
            StorageError::Conflict(detail) => ApiError::Conflict { message, detail },
            StorageError::Database(err) => ApiError::Internal {
                message,
                cause: err.into(),
            },
        }
    }

    pub fn internal(message: &'static str, cause: impl Into<anyhow::Error>) -> Self {
        ApiError::Internal {
            message,
            cause: cause.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::BadRequest { message, detail } => {
                tracing::debug!(%detail, "{}", message);
                json!({ "message": message, "error": detail })
            }
            ApiError::Conflict { message, detail } => {
                tracing::warn!(%detail, "{}", message);
                json!({ "message": message, "error": detail })
            }
            ApiError::Unauthorized => json!({ "message": self.to_string() }),
            ApiError::Internal { message, cause } => {
                tracing::error!(error = ?cause, "{}", message);
                json!({ "message": message, "error": "internal server error" })
            }
        };

        (status, Json(body)).into_response()
    }
}
