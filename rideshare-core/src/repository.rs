use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{Message, RideOffer, User};
use crate::CoreResult;

/// Coarse storage-level filter for ride search. Stores must return exactly the
/// rides for which [`CandidateQuery::matches`] holds; ranking happens later.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateQuery {
    pub pickup: String,
    pub drop: String,
    pub min_departure: DateTime<Utc>,
}

impl CandidateQuery {
    pub fn matches(&self, ride: &RideOffer) -> bool {
        contains_ignore_case(&ride.pickup_location, &self.pickup)
            && contains_ignore_case(&ride.drop_location, &self.drop)
            && ride.available_seats > 0
            && ride.departure_time >= self.min_departure
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Repository trait for ride offers
#[async_trait]
pub trait RideStore: Send + Sync {
    async fn insert_ride(&self, ride: &RideOffer) -> CoreResult<()>;

    async fn find_ride(&self, id: Uuid) -> CoreResult<Option<RideOffer>>;

    async fn find_candidates(&self, query: &CandidateQuery) -> CoreResult<Vec<RideOffer>>;

    async fn list_by_driver(&self, driver_id: Uuid) -> CoreResult<Vec<RideOffer>>;

    /// Persist `ride` only if the stored version still equals `expected_version`,
    /// bumping it by one. Returns `false` when another writer got there first.
    async fn update_ride(&self, ride: &RideOffer, expected_version: i64) -> CoreResult<bool>;
}

/// Repository trait for user accounts
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `CoreError::Conflict` when the email is already registered.
    async fn insert_user(&self, user: &User) -> CoreResult<()>;

    async fn find_user(&self, id: Uuid) -> CoreResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> CoreResult<Option<User>>;

    async fn update_user(&self, user: &User) -> CoreResult<()>;
}

/// Repository trait for Rider/Driver private messages
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn insert_message(&self, message: &Message) -> CoreResult<()>;

    /// Messages exchanged between `a` and `b` in either direction, oldest first.
    async fn conversation(&self, a: Uuid, b: Uuid) -> CoreResult<Vec<Message>>;
}
