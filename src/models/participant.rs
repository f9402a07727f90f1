use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::validate_email;
use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Participant {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub email: String,
    pub is_confirmed: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InviteParticipantRequest {
    pub email: String,
}

impl InviteParticipantRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_email("email", &self.email)
    }

    pub fn normalized_email(&self) -> String {
        normalize_email(&self.email)
    }
}

/// Emails are compared and stored trimmed and lowercased.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
