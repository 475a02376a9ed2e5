//! In-process stores used by tests and when no database is configured.
//! They honour the same contracts as the Postgres implementations,
//! including compare-and-swap on ride versions.

use std::collections::HashMap;

use async_trait::async_trait;
use rideshare_core::{
    CandidateQuery, CoreError, CoreResult, Message, MessageStore, RideOffer, RideStore, User, UserStore,
};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryRideStore {
    // Insertion order is kept so candidate lists are deterministic.
    rides: RwLock<Vec<RideOffer>>,
}

impl MemoryRideStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RideStore for MemoryRideStore {
    async fn insert_ride(&self, ride: &RideOffer) -> CoreResult<()> {
        let mut rides = self.rides.write().await;
        if rides.iter().any(|r| r.id == ride.id) {
            return Err(CoreError::Conflict(format!("ride {} already exists", ride.id)));
        }
        rides.push(ride.clone());
        Ok(())
    }

    async fn find_ride(&self, id: Uuid) -> CoreResult<Option<RideOffer>> {
        Ok(self.rides.read().await.iter().find(|r| r.id == id).cloned())
    }

    async fn find_candidates(&self, query: &CandidateQuery) -> CoreResult<Vec<RideOffer>> {
        let mut found: Vec<RideOffer> = self
            .rides
            .read()
            .await
            .iter()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();
        found.sort_by_key(|r| r.departure_time);
        Ok(found)
    }

    async fn list_by_driver(&self, driver_id: Uuid) -> CoreResult<Vec<RideOffer>> {
        let mut found: Vec<RideOffer> = self
            .rides
            .read()
            .await
            .iter()
            .filter(|r| r.driver_id == driver_id)
            .cloned()
            .collect();
        found.sort_by_key(|r| r.departure_time);
        Ok(found)
    }

    async fn update_ride(&self, ride: &RideOffer, expected_version: i64) -> CoreResult<bool> {
        let mut rides = self.rides.write().await;
        let stored = rides
            .iter_mut()
            .find(|r| r.id == ride.id)
            .ok_or_else(|| CoreError::NotFound(format!("ride {}", ride.id)))?;

        if stored.version != expected_version {
            return Ok(false);
        }

        *stored = RideOffer {
            version: expected_version + 1,
            ..ride.clone()
        };
        Ok(true)
    }
}

#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert_user(&self, user: &User) -> CoreResult<()> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(CoreError::Conflict(format!("email {} is already registered", user.email)));
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> CoreResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> CoreResult<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn update_user(&self, user: &User) -> CoreResult<()> {
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|u| u.id != user.id && u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(CoreError::Conflict(format!("email {} is already registered", user.email)));
        }
        match users.get_mut(&user.id) {
            Some(stored) => {
                *stored = user.clone();
                Ok(())
            }
            None => Err(CoreError::NotFound(format!("user {}", user.id))),
        }
    }
}

#[derive(Default)]
pub struct MemoryMessageStore {
    messages: RwLock<Vec<Message>>,
}

impl MemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageStore for MemoryMessageStore {
    async fn insert_message(&self, message: &Message) -> CoreResult<()> {
        self.messages.write().await.push(message.clone());
        Ok(())
    }

    async fn conversation(&self, a: Uuid, b: Uuid) -> CoreResult<Vec<Message>> {
        let mut found: Vec<Message> = self
            .messages
            .read()
            .await
            .iter()
            .filter(|m| {
                (m.sender_id == a && m.receiver_id == b) || (m.sender_id == b && m.receiver_id == a)
            })
            .cloned()
            .collect();
        found.sort_by_key(|m| m.sent_at);
        Ok(found)
    }
}
