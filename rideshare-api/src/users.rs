use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post, put},
    Extension, Json, Router,
};
use rideshare_core::models::{EmergencyContact, PrivacySettings};
use rideshare_core::Caller;
use rideshare_users::{CallReport, DeliveryReport, Location, ProfileUpdate, ProfileView};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct ContactsRequest {
    pub contacts: Vec<EmergencyContact>,
}

#[derive(Debug, Serialize)]
pub struct ContactsResponse {
    pub message: &'static str,
    pub contacts: Vec<EmergencyContact>,
}

#[derive(Debug, Serialize)]
pub struct PrivacyResponse {
    pub message: &'static str,
    pub privacy: PrivacySettings,
}

#[derive(Debug, Serialize)]
pub struct LocationResponse {
    pub message: &'static str,
    pub deliveries: Vec<DeliveryReport>,
}

#[derive(Debug, Deserialize)]
pub struct CallRequest {
    pub user_id: Uuid,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/users/profile", get(get_profile).put(update_profile))
        .route("/v1/users/privacy", put(update_privacy))
        .route("/v1/users/emergency-contacts", put(set_emergency_contacts))
        .route("/v1/users/location", post(share_location))
        .route("/v1/users/call", post(call_user))
}

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<ProfileView>, AppError> {
    Ok(Json(state.accounts.profile(&caller).await?))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<ProfileUpdate>, JsonRejection>,
) -> Result<Json<ProfileView>, AppError> {
    let Json(update) = payload?;
    Ok(Json(state.accounts.update_profile(&caller, update).await?))
}

pub async fn update_privacy(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<PrivacySettings>, JsonRejection>,
) -> Result<Json<PrivacyResponse>, AppError> {
    let Json(settings) = payload?;
    let privacy = state.accounts.update_privacy(&caller, settings).await?;
    Ok(Json(PrivacyResponse { message: "Privacy settings updated successfully", privacy }))
}

pub async fn set_emergency_contacts(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<ContactsRequest>, JsonRejection>,
) -> Result<Json<ContactsResponse>, AppError> {
    let Json(req) = payload?;
    let contacts = state.accounts.set_emergency_contacts(&caller, req.contacts).await?;
    Ok(Json(ContactsResponse { message: "Emergency contacts updated", contacts }))
}

pub async fn share_location(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<Location>, JsonRejection>,
) -> Result<Json<LocationResponse>, AppError> {
    let Json(location) = payload?;
    let deliveries = state.accounts.share_live_location(&caller, location).await?;
    Ok(Json(LocationResponse { message: "Live location shared with emergency contacts", deliveries }))
}

pub async fn call_user(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<CallRequest>, JsonRejection>,
) -> Result<Json<CallReport>, AppError> {
    let Json(req) = payload?;
    Ok(Json(state.accounts.call_user(&caller, req.user_id).await?))
}
