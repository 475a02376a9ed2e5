use chrono::{DateTime, Utc};
use rideshare_core::models::Vehicle;
use rideshare_core::{CoreError, RideOffer, RidePreferences, RideStateError};
use rideshare_matching::MatchError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ride details as submitted by a Driver. Required fields are optional here
/// so a missing one is reported as a validation error rather than a parse error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewRide {
    pub pickup_location: Option<String>,
    pub drop_location: Option<String>,
    pub departure_time: Option<DateTime<Utc>>,
    pub available_seats: Option<i32>,
    pub vehicle: Option<Vehicle>,
    pub preferences: Option<RidePreferences>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    pub fn parse(value: &str) -> Option<Decision> {
        match value {
            "approve" => Some(Decision::Approve),
            "reject" => Some(Decision::Reject),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationDispatch {
    /// Handed to a background task; failures arrive on the event stream.
    Queued,
    NotRequired,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestOutcome {
    pub ride: RideOffer,
    pub rider_id: Uuid,
    pub decision: Decision,
    pub notification: NotificationDispatch,
}

#[derive(Debug, thiserror::Error)]
pub enum RideError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// Concurrent writers kept winning the ride update; safe to retry.
    #[error("{0}")]
    Busy(String),

    #[error("Dependency failed: {0}")]
    Dependency(String),

    #[error("Storage failure: {0}")]
    Storage(String),
}

impl From<CoreError> for RideError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ValidationError(msg) => RideError::Validation(msg),
            CoreError::NotFound(msg) => RideError::NotFound(msg),
            CoreError::Conflict(msg) => RideError::Conflict(msg),
            CoreError::DependencyError(msg) => RideError::Dependency(msg),
            CoreError::StorageError(msg) => RideError::Storage(msg),
        }
    }
}

impl From<RideStateError> for RideError {
    fn from(err: RideStateError) -> Self {
        match err {
            RideStateError::NoPendingRequest => RideError::NotFound(err.to_string()),
            RideStateError::NoSeats
            | RideStateError::AlreadyRequested
            | RideStateError::AlreadyPassenger => RideError::Conflict(err.to_string()),
        }
    }
}

impl From<MatchError> for RideError {
    fn from(err: MatchError) -> Self {
        RideError::Validation(err.to_string())
    }
}
