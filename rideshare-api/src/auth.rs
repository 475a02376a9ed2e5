use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Extension, Json, Router,
};
use rideshare_core::Caller;
use rideshare_users::{NewUser, ProfileView};
use serde::Serialize;

use crate::{error::AppError, middleware::issue_token, state::AppState};

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<ProfileView>,
}

pub fn public_routes() -> Router<AppState> {
    Router::new().route("/v1/auth/register", post(register))
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/auth/refresh", post(refresh))
}

async fn register(
    State(state): State<AppState>,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let Json(new_user) = payload?;
    let user = state.accounts.register(new_user).await?;
    let token = issue_token(&state.auth, user.id, user.role)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse { token, user: Some(ProfileView::from(&user)) }),
    ))
}

async fn refresh(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<AuthResponse>, AppError> {
    let token = issue_token(&state.auth, caller.user_id, caller.role)?;
    Ok(Json(AuthResponse { token, user: None }))
}
