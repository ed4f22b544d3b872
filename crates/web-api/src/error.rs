use application::ApplicationError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::DomainError;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                code,
                message: message.into(),
            },
        }
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", message)
    }

    pub fn internal_server_error() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            "internal server error",
        )
    }
}

impl From<ApplicationError> for ApiError {
    fn from(error: ApplicationError) -> Self {
        if error.is_internal() {
            // 存储细节只写日志，不回显给客户端
            tracing::error!(error = %error, "store operation failed");
            return ApiError::internal_server_error();
        }

        match error {
            ApplicationError::Domain(err @ DomainError::Validation { .. }) => {
                ApiError::unprocessable(err.to_string())
            }
            ApplicationError::Domain(err @ DomainError::SenderNotRegistered { .. }) => {
                ApiError::new(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "SENDER_NOT_REGISTERED",
                    err.to_string(),
                )
            }
            ApplicationError::Domain(err @ DomainError::NameTaken { .. }) => {
                ApiError::new(StatusCode::CONFLICT, "NAME_TAKEN", err.to_string())
            }
            ApplicationError::Domain(err @ DomainError::ParticipantNotFound { .. }) => {
                ApiError::new(StatusCode::NOT_FOUND, "PARTICIPANT_NOT_FOUND", err.to_string())
            }
            ApplicationError::Repository(_) => {
                ApiError::new(StatusCode::CONFLICT, "CONFLICT", "resource already exists")
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::unprocessable(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
