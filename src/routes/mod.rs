pub mod participants;
pub mod trips;

use axum::{extract::rejection::JsonRejection, Json, Router};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::{
    error::{AppError, Entity},
    state::AppState,
};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/trips", trips::router())
        .nest("/participants", participants::router())
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

/// Parses a path id, reporting which kind of id was malformed.
pub(crate) fn parse_id(raw: &str, entity: Entity) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::invalid(format!("invalid {entity} id")))
}

pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::invalid(format!("invalid JSON: {}", rejection.body_text())))
}
