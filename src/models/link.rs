use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use url::Url;
use uuid::Uuid;

use super::require_text;
use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Link {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateLinkRequest {
    pub title: String,
    pub url: String,
}

impl CreateLinkRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        require_text("title", &self.title)?;
        let url = Url::parse(self.url.trim())
            .map_err(|err| AppError::invalid(format!("url is not valid: {err}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AppError::invalid("url must use http or https"));
        }
        Ok(())
    }
}
