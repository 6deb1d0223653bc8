use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::auth::IdentityError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("User is not authenticated")]
    AuthRequired,

    #[error("{0}")]
    Validation(String),

    #[error("reading {path} failed: {message}")]
    RemoteRead {
        path: String,
        code: Option<String>,
        message: String,
    },

    #[error("writing {path} failed: {message}")]
    RemoteWrite {
        path: String,
        code: Option<String>,
        message: String,
    },

    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    Identity(#[from] IdentityError),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn read(path: &str, code: Option<String>, message: impl ToString) -> Self {
        AppError::RemoteRead {
            path: path.to_string(),
            code,
            message: message.to_string(),
        }
    }

    pub fn write(path: &str, code: Option<String>, message: impl ToString) -> Self {
        AppError::RemoteWrite {
            path: path.to_string(),
            code,
            message: message.to_string(),
        }
    }

    /// Provider error code, when the failing collaborator reported one.
    pub fn code(&self) -> Option<&str> {
        match self {
            AppError::RemoteRead { code, .. } | AppError::RemoteWrite { code, .. } => {
                code.as_deref()
            }
            AppError::Identity(e) => Some(e.code()),
            _ => None,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::AuthRequired => StatusCode::UNAUTHORIZED,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::RemoteRead { .. } | AppError::RemoteWrite { .. } => StatusCode::BAD_GATEWAY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Identity(e) => match e {
                IdentityError::InvalidCredential | IdentityError::Unauthenticated => {
                    StatusCode::UNAUTHORIZED
                }
                IdentityError::EmailAlreadyInUse => StatusCode::CONFLICT,
                IdentityError::InvalidEmail | IdentityError::WeakPassword => {
                    StatusCode::BAD_REQUEST
                }
                IdentityError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, code = ?self.code(), "request failed");
        }
        let body = json!({
            "error": self.to_string(),
            "code": self.code(),
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_errors_keep_provider_code() {
        let err = AppError::write("recipes/r1", Some("23505".into()), "duplicate key");
        assert_eq!(err.code(), Some("23505"));
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert!(err.to_string().contains("recipes/r1"));
    }

    #[test]
    fn identity_errors_map_to_http_status() {
        let conflict = AppError::from(IdentityError::EmailAlreadyInUse);
        assert_eq!(conflict.status(), StatusCode::CONFLICT);
        assert_eq!(conflict.code(), Some("auth/email-already-in-use"));

        assert_eq!(AppError::AuthRequired.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::NotFound("recipe r9".into()).status(),
            StatusCode::NOT_FOUND
        );
    }
}
