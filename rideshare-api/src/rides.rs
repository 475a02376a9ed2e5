use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use rideshare_core::{Caller, RideOffer};
use rideshare_matching::{parse_preferences, MatchResult, SearchCriteria};
use rideshare_rides::{Decision, NewRide, RequestOutcome};
use serde::Deserialize;
use uuid::Uuid;

use crate::{error::AppError, state::AppState};

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub pickup: Option<String>,
    pub drop: Option<String>,
    /// RFC 3339 timestamp.
    pub departure_time: Option<String>,
    /// JSON object of preference name to wanted value.
    pub preferences: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    pub ride_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct RespondRequest {
    pub ride_id: Uuid,
    pub rider_id: Uuid,
    pub status: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/rides", post(create_ride))
        .route("/v1/rides/mine", get(list_my_rides))
        .route("/v1/rides/search", get(search_rides))
        .route("/v1/rides/request", post(request_ride))
        .route("/v1/rides/respond", put(respond_to_request))
        .route("/v1/rides/{id}", get(get_ride))
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn create_ride(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<NewRide>, JsonRejection>,
) -> Result<(StatusCode, Json<RideOffer>), AppError> {
    let Json(new_ride) = payload?;
    let ride = state.rides.create_ride(&caller, new_ride).await?;
    Ok((StatusCode::CREATED, Json(ride)))
}

pub async fn list_my_rides(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Vec<RideOffer>>, AppError> {
    Ok(Json(state.rides.list_driver_rides(&caller).await?))
}

pub async fn search_rides(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Vec<MatchResult>>, AppError> {
    let Query(params) = params?;

    let departure_time = params
        .departure_time
        .as_deref()
        .map(parse_departure)
        .transpose()?;
    let preferences = parse_preferences(params.preferences.as_deref())?;
    let criteria = SearchCriteria::new(
        params.pickup.as_deref().unwrap_or_default(),
        params.drop.as_deref().unwrap_or_default(),
        departure_time,
        preferences,
    )?;

    Ok(Json(state.rides.search(&caller, &criteria).await?))
}

pub async fn get_ride(
    State(state): State<AppState>,
    ride_id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<RideOffer>, AppError> {
    let Path(ride_id) = ride_id?;
    Ok(Json(state.rides.get_ride(ride_id).await?))
}

pub async fn request_ride(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<JoinRequest>, JsonRejection>,
) -> Result<Json<RideOffer>, AppError> {
    let Json(req) = payload?;
    Ok(Json(state.rides.request_to_join(&caller, req.ride_id).await?))
}

pub async fn respond_to_request(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<RespondRequest>, JsonRejection>,
) -> Result<Json<RequestOutcome>, AppError> {
    let Json(req) = payload?;
    let decision = Decision::parse(&req.status).ok_or_else(|| {
        AppError::ValidationError("Invalid status. Use 'approve' or 'reject'.".to_string())
    })?;

    let outcome = state
        .rides
        .respond_to_request(&caller, req.ride_id, req.rider_id, decision)
        .await?;
    Ok(Json(outcome))
}

fn parse_departure(raw: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| AppError::ValidationError(format!("Invalid departure_time: {}", raw)))
}
