use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::{json_body, parse_id};
use crate::{
    error::{AppError, Entity},
    models::{
        activity::{ActivityDay, CreateActivityRequest},
        link::{CreateLinkRequest, Link},
        participant::{InviteParticipantRequest, Participant},
        trip::{CreateTripRequest, Trip, UpdateTripRequest},
    },
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_trip))
        .route(
            "/:trip_id",
            get(get_trip).put(update_trip).delete(delete_trip),
        )
        .route("/:trip_id/confirm", get(confirm_trip))
        .route("/:trip_id/invites", post(invite_participant))
        .route("/:trip_id/participants", get(list_participants))
        .route(
            "/:trip_id/activities",
            get(list_activities).post(create_activity),
        )
        .route("/:trip_id/links", get(list_links).post(create_link))
}

#[derive(Serialize)]
struct CreateTripResponse {
    #[serde(rename = "tripId")]
    trip_id: Uuid,
}

async fn create_trip(
    State(state): State<AppState>,
    payload: Result<Json<CreateTripRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let request = json_body(payload)?;
    let trip_id = state.workflow.create_trip(request).await?;
    Ok((StatusCode::CREATED, Json(CreateTripResponse { trip_id })))
}

#[derive(Serialize)]
struct TripDetails {
    id: Uuid,
    destination: String,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    is_confirmed: bool,
}

impl From<Trip> for TripDetails {
    fn from(trip: Trip) -> Self {
        Self {
            id: trip.id,
            destination: trip.destination,
            starts_at: trip.starts_at,
            ends_at: trip.ends_at,
            is_confirmed: trip.is_confirmed,
        }
    }
}

#[derive(Serialize)]
struct TripResponse {
    trip: TripDetails,
}

async fn get_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<String>,
) -> Result<Json<TripResponse>, AppError> {
    let trip_id = parse_id(&trip_id, Entity::Trip)?;
    let trip = state.workflow.get_trip(trip_id).await?;
    Ok(Json(TripResponse { trip: trip.into() }))
}

async fn update_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<String>,
    payload: Result<Json<UpdateTripRequest>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    let trip_id = parse_id(&trip_id, Entity::Trip)?;
    let request = json_body(payload)?;
    state.workflow.update_trip(trip_id, request).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let trip_id = parse_id(&trip_id, Entity::Trip)?;
    state.workflow.delete_trip(trip_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn confirm_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let trip_id = parse_id(&trip_id, Entity::Trip)?;
    state.workflow.confirm_trip(trip_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
struct InviteResponse {
    #[serde(rename = "participantId")]
    participant_id: Uuid,
}

async fn invite_participant(
    State(state): State<AppState>,
    Path(trip_id): Path<String>,
    payload: Result<Json<InviteParticipantRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let trip_id = parse_id(&trip_id, Entity::Trip)?;
    let request = json_body(payload)?;
    let participant_id = state.workflow.invite_participant(trip_id, request).await?;
    Ok((StatusCode::CREATED, Json(InviteResponse { participant_id })))
}

#[derive(Serialize)]
struct ParticipantsResponse {
    participants: Vec<Participant>,
}

async fn list_participants(
    State(state): State<AppState>,
    Path(trip_id): Path<String>,
) -> Result<Json<ParticipantsResponse>, AppError> {
    let trip_id = parse_id(&trip_id, Entity::Trip)?;
    let participants = state.workflow.list_participants(trip_id).await?;
    Ok(Json(ParticipantsResponse { participants }))
}

#[derive(Serialize)]
struct ActivitiesResponse {
    activities: Vec<ActivityDay>,
}

async fn list_activities(
    State(state): State<AppState>,
    Path(trip_id): Path<String>,
) -> Result<Json<ActivitiesResponse>, AppError> {
    let trip_id = parse_id(&trip_id, Entity::Trip)?;
    let activities = state.workflow.list_activities(trip_id).await?;
    Ok(Json(ActivitiesResponse { activities }))
}

#[derive(Serialize)]
struct CreateActivityResponse {
    #[serde(rename = "activityId")]
    activity_id: Uuid,
}

async fn create_activity(
    State(state): State<AppState>,
    Path(trip_id): Path<String>,
    payload: Result<Json<CreateActivityRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let trip_id = parse_id(&trip_id, Entity::Trip)?;
    let request = json_body(payload)?;
    let activity_id = state.workflow.create_activity(trip_id, request).await?;
    Ok((StatusCode::CREATED, Json(CreateActivityResponse { activity_id })))
}

#[derive(Serialize)]
struct LinksResponse {
    links: Vec<Link>,
}

async fn list_links(
    State(state): State<AppState>,
    Path(trip_id): Path<String>,
) -> Result<Json<LinksResponse>, AppError> {
    let trip_id = parse_id(&trip_id, Entity::Trip)?;
    let links = state.workflow.list_links(trip_id).await?;
    Ok(Json(LinksResponse { links }))
}

#[derive(Serialize)]
struct CreateLinkResponse {
    #[serde(rename = "linkId")]
    link_id: Uuid,
}

async fn create_link(
    State(state): State<AppState>,
    Path(trip_id): Path<String>,
    payload: Result<Json<CreateLinkRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let trip_id = parse_id(&trip_id, Entity::Trip)?;
    let request = json_body(payload)?;
    let link_id = state.workflow.create_link(trip_id, request).await?;
    Ok((StatusCode::CREATED, Json(CreateLinkResponse { link_id })))
}
