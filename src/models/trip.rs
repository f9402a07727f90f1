use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{participant::normalize_email, require_text, validate_email};
use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Trip {
    pub id: Uuid,
    pub destination: String,
    pub owner_name: String,
    pub owner_email: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub is_confirmed: bool,
}

impl Trip {
    /// Whether `at` falls inside the trip, both ends inclusive.
    pub fn covers(&self, at: DateTime<Utc>) -> bool {
        self.starts_at <= at && at <= self.ends_at
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTripRequest {
    pub destination: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub owner_name: String,
    pub owner_email: String,
    #[serde(default)]
    pub emails_to_invite: Vec<String>,
}

impl CreateTripRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        require_text("destination", &self.destination)?;
        require_text("owner_name", &self.owner_name)?;
        validate_email("owner_email", &self.owner_email)?;
        validate_range(self.starts_at, self.ends_at)?;
        for email in &self.emails_to_invite {
            validate_email("emails_to_invite", email)?;
        }
        Ok(())
    }

    /// Normalized invite list with duplicates removed, first occurrence wins.
    pub fn invitees(&self) -> Vec<String> {
        let mut seen = Vec::with_capacity(self.emails_to_invite.len());
        for email in &self.emails_to_invite {
            let email = normalize_email(email);
            if !seen.contains(&email) {
                seen.push(email);
            }
        }
        seen
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateTripRequest {
    pub destination: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

impl UpdateTripRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        require_text("destination", &self.destination)?;
        validate_range(self.starts_at, self.ends_at)
    }
}

/// Outcome of confirming a trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripConfirmation {
    /// This call flipped the flag and scheduled the participant fan-out.
    Confirmed,
    /// The trip was confirmed earlier; nothing was scheduled.
    AlreadyConfirmed,
}

fn validate_range(starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> Result<(), AppError> {
    if starts_at > ends_at {
        return Err(AppError::invalid("starts_at must not be after ends_at"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn request() -> CreateTripRequest {
        CreateTripRequest {
            destination: "Paris".into(),
            starts_at: Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap(),
            ends_at: Utc.with_ymd_and_hms(2025, 6, 10, 0, 0, 0).unwrap(),
            owner_name: "A".into(),
            owner_email: "a@x.com".into(),
            emails_to_invite: vec![],
        }
    }

    #[test]
    fn accepts_single_day_trip() {
        let mut req = request();
        req.ends_at = req.starts_at;
        assert!(req.validate().is_ok());
    }

    #[test]
    fn rejects_inverted_range() {
        let mut req = request();
        std::mem::swap(&mut req.starts_at, &mut req.ends_at);
        let err = req.validate().unwrap_err();
        assert!(err.to_string().contains("starts_at"));
    }

    #[test]
    fn rejects_bad_invite() {
        let mut req = request();
        req.emails_to_invite = vec!["b@x.com".into(), "nope".into()];
        assert!(matches!(req.validate(), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn invitees_are_deduplicated() {
        let mut req = request();
        req.emails_to_invite = vec![
            "b@x.com".into(),
            " b@x.com ".into(),
            "B@X.com".into(),
            "c@x.com".into(),
        ];
        assert_eq!(req.invitees(), vec!["b@x.com", "c@x.com"]);
    }

    #[test]
    fn covers_is_inclusive() {
        let req = request();
        let trip = Trip {
            id: Uuid::new_v4(),
            destination: req.destination,
            owner_name: req.owner_name,
            owner_email: req.owner_email,
            starts_at: req.starts_at,
            ends_at: req.ends_at,
            is_confirmed: false,
        };
        assert!(trip.covers(trip.starts_at));
        assert!(trip.covers(trip.ends_at));
        assert!(!trip.covers(trip.ends_at + chrono::Duration::seconds(1)));
    }
}
