use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use rideshare_core::{Caller, Message};
use serde::Deserialize;
use uuid::Uuid;

use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub receiver: Uuid,
    pub message: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/messages", post(send_message))
        .route("/v1/messages/{other_id}", get(get_conversation))
}

pub async fn send_message(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Message>), AppError> {
    let Json(req) = payload?;
    let message = state.messages.send(&caller, req.receiver, &req.message).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn get_conversation(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    other_id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Vec<Message>>, AppError> {
    let Path(other_id) = other_id?;
    Ok(Json(state.messages.conversation(&caller, other_id).await?))
}
