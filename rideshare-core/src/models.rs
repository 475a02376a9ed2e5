use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use rideshare_shared::pii::{abbreviate_name, mask_phone};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Identity
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Role {
    Driver,
    Rider,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Driver => "Driver",
            Role::Rider => "Rider",
        }
    }

    pub fn parse(value: &str) -> Option<Role> {
        match value {
            "Driver" => Some(Role::Driver),
            "Rider" => Some(Role::Rider),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authenticated caller, supplied by the identity layer and trusted as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Uuid,
    pub role: Role,
}

impl Caller {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is(&self, role: Role) -> bool {
        self.role == role
    }
}

// ============================================================================
// Users
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrivacySettings {
    #[serde(default)]
    pub hide_full_name: bool,
    #[serde(default)]
    pub blur_profile_picture: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmergencyContact {
    pub name: String,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: Role,
    pub profile_picture: Option<String>,
    pub privacy: PrivacySettings,
    pub emergency_contacts: Vec<EmergencyContact>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: String, email: String, phone: String, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            email,
            phone,
            role,
            profile_picture: None,
            privacy: PrivacySettings::default(),
            emergency_contacts: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

/// Who drives a ride, as shown next to search results. The phone is always
/// masked and the name follows the driver's privacy settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DriverSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: Role,
}

impl From<&User> for DriverSummary {
    fn from(user: &User) -> Self {
        let name = if user.privacy.hide_full_name {
            abbreviate_name(&user.name)
        } else {
            user.name.clone()
        };
        Self {
            id: user.id,
            name,
            email: user.email.clone(),
            phone: mask_phone(&user.phone),
            role: user.role,
        }
    }
}

// ============================================================================
// Rides
// ============================================================================

/// Named boolean attributes a Driver publishes with a ride. Open-ended key set.
pub type RidePreferences = BTreeMap<String, bool>;

/// Keys every new ride carries unless the Driver says otherwise.
pub const DEFAULT_PREFERENCE_KEYS: [&str; 3] = ["music", "smoking", "pets_allowed"];

pub fn default_ride_preferences() -> RidePreferences {
    DEFAULT_PREFERENCE_KEYS
        .iter()
        .map(|key| (key.to_string(), false))
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Vehicle {
    pub model: Option<String>,
    pub license_plate: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RideOffer {
    pub id: Uuid,
    pub driver_id: Uuid,
    pub pickup_location: String,
    pub drop_location: String,
    pub departure_time: DateTime<Utc>,
    pub available_seats: i32,
    pub vehicle: Option<Vehicle>,
    pub preferences: RidePreferences,
    pub requests: Vec<Uuid>,
    pub passengers: Vec<Uuid>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, thiserror::Error, PartialEq, Eq)]
pub enum RideStateError {
    #[error("No seats available in this ride")]
    NoSeats,
    #[error("Rider has already requested this ride")]
    AlreadyRequested,
    #[error("Rider is already a passenger on this ride")]
    AlreadyPassenger,
    #[error("Rider has no pending request for this ride")]
    NoPendingRequest,
}

impl RideOffer {
    pub fn new(
        driver_id: Uuid,
        pickup_location: String,
        drop_location: String,
        departure_time: DateTime<Utc>,
        available_seats: i32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            driver_id,
            pickup_location,
            drop_location,
            departure_time,
            available_seats,
            vehicle: None,
            preferences: default_ride_preferences(),
            requests: Vec::new(),
            passengers: Vec::new(),
            version: 0,
            created_at: Utc::now(),
        }
    }

    pub fn has_seats(&self) -> bool {
        self.available_seats > 0
    }

    pub fn has_requested(&self, rider_id: Uuid) -> bool {
        self.requests.contains(&rider_id)
    }

    pub fn is_passenger(&self, rider_id: Uuid) -> bool {
        self.passengers.contains(&rider_id)
    }

    /// Record a join request. A rider sits in at most one of requests/passengers.
    pub fn add_request(&mut self, rider_id: Uuid) -> Result<(), RideStateError> {
        if !self.has_seats() {
            return Err(RideStateError::NoSeats);
        }
        if self.is_passenger(rider_id) {
            return Err(RideStateError::AlreadyPassenger);
        }
        if self.has_requested(rider_id) {
            return Err(RideStateError::AlreadyRequested);
        }
        self.requests.push(rider_id);
        Ok(())
    }

    /// Move a pending rider to passengers, taking exactly one seat.
    pub fn approve(&mut self, rider_id: Uuid) -> Result<(), RideStateError> {
        if !self.has_requested(rider_id) {
            return Err(RideStateError::NoPendingRequest);
        }
        if !self.has_seats() {
            return Err(RideStateError::NoSeats);
        }
        self.requests.retain(|id| *id != rider_id);
        self.passengers.push(rider_id);
        self.available_seats -= 1;
        Ok(())
    }

    pub fn reject(&mut self, rider_id: Uuid) -> Result<(), RideStateError> {
        if !self.has_requested(rider_id) {
            return Err(RideStateError::NoPendingRequest);
        }
        self.requests.retain(|id| *id != rider_id);
        Ok(())
    }
}

// ============================================================================
// Messaging
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

impl Message {
    pub fn new(sender_id: Uuid, receiver_id: Uuid, body: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender_id,
            receiver_id,
            body,
            sent_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ride(seats: i32) -> RideOffer {
        RideOffer::new(Uuid::new_v4(), "Downtown".into(), "Airport".into(), Utc::now(), seats)
    }

    #[test]
    fn test_request_then_approve_moves_rider() {
        let mut ride = ride(2);
        let rider = Uuid::new_v4();

        ride.add_request(rider).unwrap();
        assert_eq!(ride.add_request(rider), Err(RideStateError::AlreadyRequested));

        ride.approve(rider).unwrap();
        assert!(ride.is_passenger(rider));
        assert!(!ride.has_requested(rider));
        assert_eq!(ride.available_seats, 1);
        assert_eq!(ride.add_request(rider), Err(RideStateError::AlreadyPassenger));
    }

    #[test]
    fn test_approve_never_oversells() {
        let mut ride = ride(1);
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        ride.add_request(first).unwrap();
        ride.add_request(second).unwrap();

        ride.approve(first).unwrap();
        assert_eq!(ride.approve(second), Err(RideStateError::NoSeats));
        assert_eq!(ride.available_seats, 0);
        assert!(ride.has_requested(second));
    }

    #[test]
    fn test_reject_leaves_seats_and_passengers() {
        let mut ride = ride(3);
        let rider = Uuid::new_v4();
        ride.add_request(rider).unwrap();

        ride.reject(rider).unwrap();
        assert!(ride.requests.is_empty());
        assert!(ride.passengers.is_empty());
        assert_eq!(ride.available_seats, 3);
        assert_eq!(ride.reject(rider), Err(RideStateError::NoPendingRequest));
    }

    #[test]
    fn test_driver_summary_respects_privacy() {
        let mut user = User::new("Dana Driver".into(), "dana@example.com".into(), "+15550001234".into(), Role::Driver);
        let open = DriverSummary::from(&user);
        assert_eq!(open.name, "Dana Driver");
        assert_eq!(open.phone, "+XX-XXXXXX1234");

        user.privacy.hide_full_name = true;
        let hidden = DriverSummary::from(&user);
        assert_eq!(hidden.name, abbreviate_name("Dana Driver"));
        assert_ne!(hidden.name, "Dana Driver");
    }

    #[test]
    fn test_role_round_trip() {
        assert_eq!(Role::parse("Driver"), Some(Role::Driver));
        assert_eq!(Role::parse("driver"), None);
        assert_eq!(serde_json::to_string(&Role::Rider).unwrap(), "\"Rider\"");
    }
}
