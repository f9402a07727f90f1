use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Record kinds named in domain errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Trip,
    Participant,
    Activity,
    Link,
}

impl Entity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Entity::Trip => "trip",
            Entity::Participant => "participant",
            Entity::Activity => "activity",
            Entity::Link => "link",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("mail error: {0}")]
    Mail(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("{0} not found")]
    NotFound(Entity),
    #[error("{0} already confirmed")]
    AlreadyConfirmed(Entity),
    #[error("storage failure")]
    Storage,
}

impl AppError {
    pub fn invalid(message: impl Into<String>) -> Self {
        AppError::InvalidInput(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) | AppError::NotFound(_) | AppError::AlreadyConfirmed(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Config(_)
            | AppError::Io(_)
            | AppError::Database(_)
            | AppError::Migrate(_)
            | AppError::Mail(_)
            | AppError::Storage => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            if !matches!(self, AppError::Storage) {
                error!("request failed: {self:?}");
            }
            "something went wrong, try again".to_string()
        } else {
            self.to_string()
        };

        (status, Json(ErrorBody { message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_are_bad_requests() {
        assert_eq!(
            AppError::NotFound(Entity::Participant).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::AlreadyConfirmed(Entity::Trip).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::invalid("bad").to_string(),
            "invalid input: bad"
        );
    }

    #[test]
    fn internal_errors_hide_details() {
        let response = AppError::Mail("smtp exploded".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            AppError::NotFound(Entity::Trip).to_string(),
            "trip not found"
        );
    }
}
