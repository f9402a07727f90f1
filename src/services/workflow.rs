//! Trip and participant lifecycle.
//!
//! Every operation touches one aggregate through the [`Store`] and, for
//! trip creation and trip confirmation, hands a job to the
//! [`NotificationDispatcher`] after the write has committed. The engine keeps
//! no mutable state of its own.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info};
use uuid::Uuid;

use super::{
    notifications::{NotificationDispatcher, NotificationJob},
    store::{Store, StoreError},
};
use crate::{
    error::{AppError, Entity},
    models::{
        activity::{group_by_day, ActivityDay, CreateActivityRequest},
        link::{CreateLinkRequest, Link},
        participant::{InviteParticipantRequest, Participant},
        trip::{CreateTripRequest, Trip, TripConfirmation, UpdateTripRequest},
    },
};

pub struct Workflow {
    store: Arc<dyn Store>,
    notifications: NotificationDispatcher,
}

impl Workflow {
    pub fn new(store: Arc<dyn Store>, notifications: NotificationDispatcher) -> Self {
        Self {
            store,
            notifications,
        }
    }

    pub fn notifications(&self) -> &NotificationDispatcher {
        &self.notifications
    }

    /// Creates an unconfirmed trip plus its initial invitations and schedules
    /// the owner confirmation email.
    pub async fn create_trip(&self, request: CreateTripRequest) -> Result<Uuid, AppError> {
        request.validate()?;
        let invitees = request.invitees();

        let trip_id = self
            .store
            .create_trip(&request, &invitees)
            .await
            .map_err(|err| translate("create_trip", Entity::Trip, None, err))?;

        info!(%trip_id, invitees = invitees.len(), "trip created");
        self.notifications
            .dispatch(NotificationJob::OwnerConfirmation { trip_id });
        Ok(trip_id)
    }

    pub async fn get_trip(&self, trip_id: Uuid) -> Result<Trip, AppError> {
        self.store
            .get_trip(trip_id)
            .await
            .map_err(|err| translate("get_trip", Entity::Trip, Some(trip_id), err))
    }

    /// Replaces destination and dates. The confirmation flag is left alone.
    pub async fn update_trip(
        &self,
        trip_id: Uuid,
        request: UpdateTripRequest,
    ) -> Result<(), AppError> {
        request.validate()?;
        self.store
            .update_trip(trip_id, &request)
            .await
            .map_err(|err| translate("update_trip", Entity::Trip, Some(trip_id), err))?;
        info!(%trip_id, "trip updated");
        Ok(())
    }

    pub async fn delete_trip(&self, trip_id: Uuid) -> Result<(), AppError> {
        self.store
            .delete_trip(trip_id)
            .await
            .map_err(|err| translate("delete_trip", Entity::Trip, Some(trip_id), err))?;
        info!(%trip_id, "trip deleted");
        Ok(())
    }

    /// Confirms the trip. Only the call that flips the flag schedules the
    /// participant fan-out; repeats succeed without side effects.
    pub async fn confirm_trip(&self, trip_id: Uuid) -> Result<TripConfirmation, AppError> {
        let trip = self.get_trip(trip_id).await?;
        if trip.is_confirmed {
            return Ok(TripConfirmation::AlreadyConfirmed);
        }

        let flipped = self
            .store
            .confirm_trip(trip_id)
            .await
            .map_err(|err| translate("confirm_trip", Entity::Trip, Some(trip_id), err))?;
        if !flipped {
            // Either a concurrent confirmation won or the trip was deleted meanwhile.
            self.get_trip(trip_id).await?;
            return Ok(TripConfirmation::AlreadyConfirmed);
        }

        info!(%trip_id, "trip confirmed");
        self.notifications
            .dispatch(NotificationJob::TripConfirmed { trip_id });
        Ok(TripConfirmation::Confirmed)
    }

    pub async fn invite_participant(
        &self,
        trip_id: Uuid,
        request: InviteParticipantRequest,
    ) -> Result<Uuid, AppError> {
        request.validate()?;
        let participant_id = self
            .store
            .create_participant(trip_id, &request.normalized_email())
            .await
            .map_err(|err| {
                translate("invite_participant", Entity::Participant, Some(trip_id), err)
            })?;
        info!(%trip_id, %participant_id, "participant invited");
        Ok(participant_id)
    }

    pub async fn list_participants(&self, trip_id: Uuid) -> Result<Vec<Participant>, AppError> {
        self.get_trip(trip_id).await?;
        self.store
            .list_participants(trip_id)
            .await
            .map_err(|err| translate("list_participants", Entity::Trip, Some(trip_id), err))
    }

    /// Marks the participant as attending. A second confirmation is an error,
    /// never a silent success.
    pub async fn confirm_participant(&self, participant_id: Uuid) -> Result<(), AppError> {
        let participant = self
            .store
            .get_participant(participant_id)
            .await
            .map_err(|err| {
                translate("get_participant", Entity::Participant, Some(participant_id), err)
            })?;
        if participant.is_confirmed {
            return Err(AppError::AlreadyConfirmed(Entity::Participant));
        }

        let flipped = self
            .store
            .confirm_participant(participant_id)
            .await
            .map_err(|err| {
                translate(
                    "confirm_participant",
                    Entity::Participant,
                    Some(participant_id),
                    err,
                )
            })?;
        if !flipped {
            self.store
                .get_participant(participant_id)
                .await
                .map_err(|err| {
                    translate("get_participant", Entity::Participant, Some(participant_id), err)
                })?;
            return Err(AppError::AlreadyConfirmed(Entity::Participant));
        }

        info!(%participant_id, trip_id = %participant.trip_id, "participant confirmed");
        Ok(())
    }

    /// Adds an activity. It must happen within the trip's dates.
    pub async fn create_activity(
        &self,
        trip_id: Uuid,
        request: CreateActivityRequest,
    ) -> Result<Uuid, AppError> {
        request.validate()?;
        let trip = self.get_trip(trip_id).await?;
        if !trip.covers(request.occurs_at.with_timezone(&Utc)) {
            return Err(AppError::invalid(
                "occurs_at must fall between the trip's starts_at and ends_at",
            ));
        }

        let activity_id = self
            .store
            .create_activity(trip_id, &request)
            .await
            .map_err(|err| translate("create_activity", Entity::Activity, Some(trip_id), err))?;
        info!(%trip_id, %activity_id, "activity created");
        Ok(activity_id)
    }

    pub async fn list_activities(&self, trip_id: Uuid) -> Result<Vec<ActivityDay>, AppError> {
        self.get_trip(trip_id).await?;
        let activities = self
            .store
            .list_activities(trip_id)
            .await
            .map_err(|err| translate("list_activities", Entity::Trip, Some(trip_id), err))?;
        Ok(group_by_day(activities))
    }

    pub async fn create_link(
        &self,
        trip_id: Uuid,
        request: CreateLinkRequest,
    ) -> Result<Uuid, AppError> {
        request.validate()?;
        let link_id = self
            .store
            .create_link(trip_id, &request)
            .await
            .map_err(|err| translate("create_link", Entity::Link, Some(trip_id), err))?;
        info!(%trip_id, %link_id, "link created");
        Ok(link_id)
    }

    pub async fn list_links(&self, trip_id: Uuid) -> Result<Vec<Link>, AppError> {
        self.get_trip(trip_id).await?;
        self.store
            .list_links(trip_id)
            .await
            .map_err(|err| translate("list_links", Entity::Trip, Some(trip_id), err))
    }
}

/// Maps store outcomes to domain errors. Backend failures are logged here with
/// the operation and id, and leave as a bare [`AppError::Storage`].
fn translate(
    operation: &'static str,
    entity: Entity,
    id: Option<Uuid>,
    err: StoreError,
) -> AppError {
    match err {
        StoreError::NoRows => AppError::NotFound(entity),
        StoreError::MissingTrip => AppError::NotFound(Entity::Trip),
        StoreError::Duplicate => AppError::invalid(format!("{entity} already exists")),
        StoreError::Database(err) => {
            match id {
                Some(id) => error!(operation, %id, error = %err, "storage failure"),
                None => error!(operation, error = %err, "storage failure"),
            }
            AppError::Storage
        }
    }
}
