use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    db::DbPool,
    models::{
        activity::{Activity, CreateActivityRequest},
        link::{CreateLinkRequest, Link},
        participant::Participant,
        trip::{CreateTripRequest, Trip, UpdateTripRequest},
    },
};

#[derive(Debug, Error)]
pub enum StoreError {
    /// The addressed row does not exist.
    #[error("no rows")]
    NoRows,
    /// A child row referenced a trip that does not exist.
    #[error("referenced trip does not exist")]
    MissingTrip,
    #[error("row already exists")]
    Duplicate,
    #[error(transparent)]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if matches!(err, sqlx::Error::RowNotFound) {
            return StoreError::NoRows;
        }
        if let sqlx::Error::Database(db) = &err {
            if db.is_foreign_key_violation() {
                return StoreError::MissingTrip;
            }
            if db.is_unique_violation() {
                return StoreError::Duplicate;
            }
        }
        StoreError::Database(err)
    }
}

/// Persistence for trips and the records hanging off them.
///
/// Every write is a single statement or a single transaction. The two
/// `confirm_*` methods are conditional updates: they return `true` only for
/// the call that actually moved the flag from false to true.
#[async_trait]
pub trait Store: Send + Sync {
    /// Inserts the trip and one unconfirmed participant per invitee atomically.
    async fn create_trip(
        &self,
        trip: &CreateTripRequest,
        invitees: &[String],
    ) -> Result<Uuid, StoreError>;
    async fn get_trip(&self, trip_id: Uuid) -> Result<Trip, StoreError>;
    /// Overwrites destination and dates. Never touches `is_confirmed`.
    async fn update_trip(&self, trip_id: Uuid, changes: &UpdateTripRequest)
        -> Result<(), StoreError>;
    async fn confirm_trip(&self, trip_id: Uuid) -> Result<bool, StoreError>;
    async fn delete_trip(&self, trip_id: Uuid) -> Result<(), StoreError>;

    async fn create_participant(&self, trip_id: Uuid, email: &str) -> Result<Uuid, StoreError>;
    async fn get_participant(&self, participant_id: Uuid) -> Result<Participant, StoreError>;
    async fn confirm_participant(&self, participant_id: Uuid) -> Result<bool, StoreError>;
    async fn list_participants(&self, trip_id: Uuid) -> Result<Vec<Participant>, StoreError>;

    async fn create_activity(
        &self,
        trip_id: Uuid,
        activity: &CreateActivityRequest,
    ) -> Result<Uuid, StoreError>;
    async fn list_activities(&self, trip_id: Uuid) -> Result<Vec<Activity>, StoreError>;

    async fn create_link(&self, trip_id: Uuid, link: &CreateLinkRequest)
        -> Result<Uuid, StoreError>;
    async fn list_links(&self, trip_id: Uuid) -> Result<Vec<Link>, StoreError>;
}

#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn create_trip(
        &self,
        trip: &CreateTripRequest,
        invitees: &[String],
    ) -> Result<Uuid, StoreError> {
        let trip_id = Uuid::new_v4();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"INSERT INTO trips (id, destination, owner_name, owner_email, starts_at, ends_at, is_confirmed)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0)"#,
        )
        .bind(trip_id)
        .bind(&trip.destination)
        .bind(&trip.owner_name)
        .bind(trip.owner_email.trim())
        .bind(trip.starts_at)
        .bind(trip.ends_at)
        .execute(&mut *tx)
        .await?;

        for email in invitees {
            sqlx::query(
                "INSERT INTO participants (id, trip_id, email, is_confirmed) VALUES (?1, ?2, ?3, 0)",
            )
            .bind(Uuid::new_v4())
            .bind(trip_id)
            .bind(email)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(trip_id)
    }

    async fn get_trip(&self, trip_id: Uuid) -> Result<Trip, StoreError> {
        let trip = sqlx::query_as::<_, Trip>(
            r#"SELECT id, destination, owner_name, owner_email, starts_at, ends_at, is_confirmed
               FROM trips WHERE id = ?1"#,
        )
        .bind(trip_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(trip)
    }

    async fn update_trip(
        &self,
        trip_id: Uuid,
        changes: &UpdateTripRequest,
    ) -> Result<(), StoreError> {
        let result =
            sqlx::query("UPDATE trips SET destination = ?1, starts_at = ?2, ends_at = ?3 WHERE id = ?4")
                .bind(&changes.destination)
                .bind(changes.starts_at)
                .bind(changes.ends_at)
                .bind(trip_id)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NoRows);
        }
        Ok(())
    }

    async fn confirm_trip(&self, trip_id: Uuid) -> Result<bool, StoreError> {
        let result =
            sqlx::query("UPDATE trips SET is_confirmed = 1 WHERE id = ?1 AND is_confirmed = 0")
                .bind(trip_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete_trip(&self, trip_id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM trips WHERE id = ?1")
            .bind(trip_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NoRows);
        }
        Ok(())
    }

    async fn create_participant(&self, trip_id: Uuid, email: &str) -> Result<Uuid, StoreError> {
        let participant_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO participants (id, trip_id, email, is_confirmed) VALUES (?1, ?2, ?3, 0)",
        )
        .bind(participant_id)
        .bind(trip_id)
        .bind(email)
        .execute(&self.pool)
        .await?;
        Ok(participant_id)
    }

    async fn get_participant(&self, participant_id: Uuid) -> Result<Participant, StoreError> {
        let participant = sqlx::query_as::<_, Participant>(
            "SELECT id, trip_id, email, is_confirmed FROM participants WHERE id = ?1",
        )
        .bind(participant_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(participant)
    }

    async fn confirm_participant(&self, participant_id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE participants SET is_confirmed = 1 WHERE id = ?1 AND is_confirmed = 0",
        )
        .bind(participant_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn list_participants(&self, trip_id: Uuid) -> Result<Vec<Participant>, StoreError> {
        let participants = sqlx::query_as::<_, Participant>(
            "SELECT id, trip_id, email, is_confirmed FROM participants WHERE trip_id = ?1 ORDER BY email",
        )
        .bind(trip_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(participants)
    }

    async fn create_activity(
        &self,
        trip_id: Uuid,
        activity: &CreateActivityRequest,
    ) -> Result<Uuid, StoreError> {
        let activity_id = Uuid::new_v4();
        sqlx::query("INSERT INTO activities (id, trip_id, title, occurs_at) VALUES (?1, ?2, ?3, ?4)")
            .bind(activity_id)
            .bind(trip_id)
            .bind(&activity.title)
            .bind(activity.occurs_at)
            .execute(&self.pool)
            .await?;
        Ok(activity_id)
    }

    async fn list_activities(&self, trip_id: Uuid) -> Result<Vec<Activity>, StoreError> {
        let mut activities = sqlx::query_as::<_, Activity>(
            "SELECT id, trip_id, title, occurs_at FROM activities WHERE trip_id = ?1",
        )
        .bind(trip_id)
        .fetch_all(&self.pool)
        .await?;
        // occurs_at is stored as text with varying offsets, so order on the decoded instant.
        activities.sort_by_key(|activity| activity.occurs_at);
        Ok(activities)
    }

    async fn create_link(
        &self,
        trip_id: Uuid,
        link: &CreateLinkRequest,
    ) -> Result<Uuid, StoreError> {
        let link_id = Uuid::new_v4();
        sqlx::query("INSERT INTO links (id, trip_id, title, url) VALUES (?1, ?2, ?3, ?4)")
            .bind(link_id)
            .bind(trip_id)
            .bind(&link.title)
            .bind(link.url.trim())
            .execute(&self.pool)
            .await?;
        Ok(link_id)
    }

    async fn list_links(&self, trip_id: Uuid) -> Result<Vec<Link>, StoreError> {
        let links = sqlx::query_as::<_, Link>(
            "SELECT id, trip_id, title, url FROM links WHERE trip_id = ?1 ORDER BY rowid",
        )
        .bind(trip_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(links)
    }
}
