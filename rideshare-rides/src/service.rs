use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rideshare_core::models::default_ride_preferences;
use rideshare_core::{Caller, DriverSummary, NotificationService, RideOffer, RideStore, Role, User, UserStore};
use rideshare_matching::{rank_rides_at, MatchResult, SearchCriteria};
use rideshare_shared::{Masked, RideEvent};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::models::{Decision, NewRide, NotificationDispatch, RequestOutcome, RideError};

/// Lost compare-and-swap rounds tolerated before reporting the ride as busy.
/// Every lost round means another writer committed.
const MAX_UPDATE_ATTEMPTS: u32 = 64;
const UPDATE_BACKOFF_BASE_MS: u64 = 2;
const UPDATE_BACKOFF_MAX_MS: u64 = 50;

/// Ride lifecycle: publishing, searching, joining and approving.
pub struct RideService {
    rides: Arc<dyn RideStore>,
    users: Arc<dyn UserStore>,
    notifier: Arc<dyn NotificationService>,
    events: broadcast::Sender<RideEvent>,
}

impl RideService {
    pub fn new(
        rides: Arc<dyn RideStore>,
        users: Arc<dyn UserStore>,
        notifier: Arc<dyn NotificationService>,
        events: broadcast::Sender<RideEvent>,
    ) -> Self {
        Self { rides, users, notifier, events }
    }

    /// Publish a new ride offer. Driver only.
    pub async fn create_ride(&self, caller: &Caller, new_ride: NewRide) -> Result<RideOffer, RideError> {
        require_role(caller, Role::Driver, "Only Drivers can create rides")?;

        let (pickup, drop, departure, seats) = match (
            non_blank(new_ride.pickup_location),
            non_blank(new_ride.drop_location),
            new_ride.departure_time,
            new_ride.available_seats,
        ) {
            (Some(p), Some(d), Some(t), Some(s)) => (p, d, t, s),
            _ => return Err(RideError::Validation("All required fields must be filled".to_string())),
        };
        if seats < 1 {
            return Err(RideError::Validation("available_seats must be at least 1".to_string()));
        }

        let mut ride = RideOffer::new(caller.user_id, pickup, drop, departure, seats);
        ride.vehicle = new_ride.vehicle;
        let mut preferences = default_ride_preferences();
        preferences.extend(new_ride.preferences.unwrap_or_default());
        ride.preferences = preferences;

        self.rides.insert_ride(&ride).await?;
        info!("Ride {} created by driver {}", ride.id, caller.user_id);

        self.publish(RideEvent::RideCreated {
            ride_id: ride.id,
            driver_id: ride.driver_id,
            timestamp: Utc::now().timestamp(),
        });

        Ok(ride)
    }

    pub async fn get_ride(&self, ride_id: Uuid) -> Result<RideOffer, RideError> {
        self.rides
            .find_ride(ride_id)
            .await?
            .ok_or_else(|| RideError::NotFound("Ride not found".to_string()))
    }

    /// The caller's own rides, earliest departure first. Driver only.
    pub async fn list_driver_rides(&self, caller: &Caller) -> Result<Vec<RideOffer>, RideError> {
        require_role(caller, Role::Driver, "Only Drivers have published rides")?;
        Ok(self.rides.list_by_driver(caller.user_id).await?)
    }

    /// Candidate lookup followed by ranking. Rider only.
    pub async fn search(&self, caller: &Caller, criteria: &SearchCriteria) -> Result<Vec<MatchResult>, RideError> {
        require_role(caller, Role::Rider, "Only Riders can search and request rides")?;

        let now = Utc::now();
        let candidates = self.rides.find_candidates(&criteria.candidate_query(now)).await?;
        let mut ranked = rank_rides_at(criteria, candidates, now);
        self.attach_drivers(&mut ranked).await?;

        info!(
            "Ride search {} -> {} returned {} candidates",
            criteria.pickup_location,
            criteria.drop_location,
            ranked.len()
        );
        Ok(ranked)
    }

    /// Load each distinct driver once and attach their public summary.
    async fn attach_drivers(&self, results: &mut [MatchResult]) -> Result<(), RideError> {
        let mut drivers: HashMap<Uuid, Option<DriverSummary>> = HashMap::new();
        for result in results.iter_mut() {
            let driver_id = result.ride.driver_id;
            if !drivers.contains_key(&driver_id) {
                let summary = self.users.find_user(driver_id).await?.as_ref().map(DriverSummary::from);
                if summary.is_none() {
                    warn!("Ride {} has no driver account {}", result.ride.id, driver_id);
                }
                drivers.insert(driver_id, summary);
            }
            result.driver = drivers.get(&driver_id).cloned().flatten();
        }
        Ok(())
    }

    /// Ask to join a ride. Rider only.
    pub async fn request_to_join(&self, caller: &Caller, ride_id: Uuid) -> Result<RideOffer, RideError> {
        require_role(caller, Role::Rider, "Only Riders can request rides")?;

        let rider_id = caller.user_id;
        let ride = self
            .mutate_ride(ride_id, |ride| Ok(ride.add_request(rider_id)?))
            .await?;
        info!("Rider {} requested ride {}", rider_id, ride_id);

        self.publish(RideEvent::RideRequested {
            ride_id,
            driver_id: ride.driver_id,
            rider_id,
            timestamp: Utc::now().timestamp(),
        });

        Ok(ride)
    }

    /// Approve or reject a pending request on one of the caller's rides.
    pub async fn respond_to_request(
        &self,
        caller: &Caller,
        ride_id: Uuid,
        rider_id: Uuid,
        decision: Decision,
    ) -> Result<RequestOutcome, RideError> {
        require_role(caller, Role::Driver, "Only Drivers can respond to ride requests")?;

        let ride = self.get_ride(ride_id).await?;
        ensure_owner(caller, &ride)?;

        let ride = self
            .mutate_ride(ride_id, |ride| {
                ensure_owner(caller, ride)?;
                match decision {
                    Decision::Approve => ride.approve(rider_id)?,
                    Decision::Reject => ride.reject(rider_id)?,
                }
                Ok(())
            })
            .await?;

        let timestamp = Utc::now().timestamp();
        let notification = match decision {
            Decision::Approve => {
                info!("Driver {} approved rider {} on ride {}", caller.user_id, rider_id, ride_id);
                self.publish(RideEvent::RequestApproved {
                    ride_id,
                    driver_id: ride.driver_id,
                    rider_id,
                    seats_left: ride.available_seats,
                    timestamp,
                });
                self.dispatch_approval_notice(&ride, rider_id).await
            }
            Decision::Reject => {
                info!("Driver {} rejected rider {} on ride {}", caller.user_id, rider_id, ride_id);
                self.publish(RideEvent::RequestRejected {
                    ride_id,
                    driver_id: ride.driver_id,
                    rider_id,
                    timestamp,
                });
                NotificationDispatch::NotRequired
            }
        };

        Ok(RequestOutcome { ride, rider_id, decision, notification })
    }

    /// Load, apply and compare-and-swap, retrying with backoff when another
    /// writer committed in between. The closure sees the freshest stored
    /// state, so a domain rejection always reflects the current ride.
    async fn mutate_ride<F>(&self, ride_id: Uuid, apply: F) -> Result<RideOffer, RideError>
    where
        F: Fn(&mut RideOffer) -> Result<(), RideError>,
    {
        for attempt in 1..=MAX_UPDATE_ATTEMPTS {
            let mut ride = self.get_ride(ride_id).await?;
            let expected_version = ride.version;
            apply(&mut ride)?;

            if self.rides.update_ride(&ride, expected_version).await? {
                ride.version = expected_version + 1;
                return Ok(ride);
            }

            debug!("Ride {} changed concurrently (attempt {}), retrying", ride_id, attempt);
            let backoff_ms = UPDATE_BACKOFF_BASE_MS
                .saturating_mul(u64::from(attempt))
                .min(UPDATE_BACKOFF_MAX_MS);
            tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
        }

        warn!("Ride {} still contended after {} attempts", ride_id, MAX_UPDATE_ATTEMPTS);
        Err(RideError::Busy(
            "Ride is busy with other updates, retry shortly".to_string(),
        ))
    }

    /// Fire-and-forget SMS to the approved rider. The approval is already
    /// committed; a delivery failure is reported on the event stream.
    async fn dispatch_approval_notice(&self, ride: &RideOffer, rider_id: Uuid) -> NotificationDispatch {
        let rider = match self.users.find_user(rider_id).await {
            Ok(Some(rider)) => rider,
            Ok(None) => {
                self.report_notification_failure(ride.id, rider_id, "rider account not found".to_string());
                return NotificationDispatch::Queued;
            }
            Err(e) => {
                self.report_notification_failure(ride.id, rider_id, e.to_string());
                return NotificationDispatch::Queued;
            }
        };
        let driver_name = match self.users.find_user(ride.driver_id).await {
            Ok(Some(User { name, .. })) => name,
            _ => "your driver".to_string(),
        };

        let notifier = Arc::clone(&self.notifier);
        let events = self.events.clone();
        let ride_id = ride.id;
        let phone = Masked(rider.phone);
        let body = format!("Your ride with {} has been approved!", driver_name);

        tokio::spawn(async move {
            match notifier.send_sms(&phone, &body).await {
                Ok(delivery_id) => info!("Approval SMS for ride {} sent ({})", ride_id, delivery_id),
                Err(e) => {
                    error!("Approval SMS for ride {} to {} failed: {}", ride_id, phone, e);
                    let _ = events.send(RideEvent::NotificationFailed {
                        ride_id: Some(ride_id),
                        recipient_id: rider_id,
                        reason: e.to_string(),
                        timestamp: Utc::now().timestamp(),
                    });
                }
            }
        });

        NotificationDispatch::Queued
    }

    fn report_notification_failure(&self, ride_id: Uuid, rider_id: Uuid, reason: String) {
        error!("Cannot notify rider {} for ride {}: {}", rider_id, ride_id, reason);
        self.publish(RideEvent::NotificationFailed {
            ride_id: Some(ride_id),
            recipient_id: rider_id,
            reason,
            timestamp: Utc::now().timestamp(),
        });
    }

    fn publish(&self, event: RideEvent) {
        // No live subscribers is fine.
        let _ = self.events.send(event);
    }
}

fn require_role(caller: &Caller, role: Role, message: &str) -> Result<(), RideError> {
    if caller.is(role) {
        Ok(())
    } else {
        Err(RideError::Forbidden(message.to_string()))
    }
}

fn ensure_owner(caller: &Caller, ride: &RideOffer) -> Result<(), RideError> {
    if ride.driver_id == caller.user_id {
        Ok(())
    } else {
        Err(RideError::Forbidden("Ride is not owned by the caller".to_string()))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration};
    use rideshare_core::{RecordingNotifier, RidePreferences};
    use rideshare_matching::RiderPreferences;
    use rideshare_store::{MemoryRideStore, MemoryUserStore};
    use std::time::Duration as StdDuration;

    struct Harness {
        service: Arc<RideService>,
        users: Arc<MemoryUserStore>,
        notifier: Arc<RecordingNotifier>,
        events: broadcast::Sender<RideEvent>,
        driver: Caller,
    }

    async fn harness(notifier: RecordingNotifier) -> Harness {
        let users = Arc::new(MemoryUserStore::new());
        let notifier = Arc::new(notifier);
        let (events, _) = broadcast::channel(64);
        let service = Arc::new(RideService::new(
            Arc::new(MemoryRideStore::new()),
            users.clone(),
            notifier.clone(),
            events.clone(),
        ));

        let driver = User::new("Dana Driver".into(), "dana@example.com".into(), "+15550000001".into(), Role::Driver);
        users.insert_user(&driver).await.unwrap();

        Harness {
            service,
            users,
            notifier,
            events,
            driver: Caller::new(driver.id, Role::Driver),
        }
    }

    async fn add_rider(h: &Harness, n: u32) -> Caller {
        let rider = User::new(
            format!("Rider {}", n),
            format!("rider{}@example.com", n),
            format!("+1555100{:04}", n),
            Role::Rider,
        );
        h.users.insert_user(&rider).await.unwrap();
        Caller::new(rider.id, Role::Rider)
    }

    fn new_ride(seats: i32, departure: DateTime<Utc>) -> NewRide {
        NewRide {
            pickup_location: Some("Downtown".into()),
            drop_location: Some("Airport".into()),
            departure_time: Some(departure),
            available_seats: Some(seats),
            ..NewRide::default()
        }
    }

    #[tokio::test]
    async fn test_create_ride_validation() {
        let h = harness(RecordingNotifier::new()).await;
        let rider = add_rider(&h, 1).await;
        let departure = Utc::now() + Duration::hours(1);

        let err = h.service.create_ride(&rider, new_ride(2, departure)).await.unwrap_err();
        assert!(matches!(err, RideError::Forbidden(_)));

        let missing = NewRide { pickup_location: Some("  ".into()), ..new_ride(2, departure) };
        assert!(matches!(h.service.create_ride(&h.driver, missing).await, Err(RideError::Validation(_))));

        let no_seats = NewRide { available_seats: None, ..new_ride(2, departure) };
        assert!(matches!(h.service.create_ride(&h.driver, no_seats).await, Err(RideError::Validation(_))));

        let mut extra = RidePreferences::new();
        extra.insert("music".into(), true);
        extra.insert("ac".into(), true);
        let with_prefs = NewRide { preferences: Some(extra), ..new_ride(2, departure) };
        let ride = h.service.create_ride(&h.driver, with_prefs).await.unwrap();
        assert_eq!(ride.preferences.get("music"), Some(&true));
        assert_eq!(ride.preferences.get("smoking"), Some(&false));
        assert_eq!(ride.preferences.get("ac"), Some(&true));
    }

    #[tokio::test]
    async fn test_request_to_join_rules() {
        let h = harness(RecordingNotifier::new()).await;
        let rider = add_rider(&h, 1).await;
        let ride = h.service.create_ride(&h.driver, new_ride(1, Utc::now() + Duration::hours(1))).await.unwrap();

        let err = h.service.request_to_join(&h.driver, ride.id).await.unwrap_err();
        assert!(matches!(err, RideError::Forbidden(_)));

        let err = h.service.request_to_join(&rider, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, RideError::NotFound(_)));

        let updated = h.service.request_to_join(&rider, ride.id).await.unwrap();
        assert_eq!(updated.requests, vec![rider.user_id]);

        let err = h.service.request_to_join(&rider, ride.id).await.unwrap_err();
        assert!(matches!(err, RideError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_approve_moves_rider_and_notifies() {
        let h = harness(RecordingNotifier::new()).await;
        let rider = add_rider(&h, 7).await;
        let ride = h.service.create_ride(&h.driver, new_ride(1, Utc::now() + Duration::hours(1))).await.unwrap();
        h.service.request_to_join(&rider, ride.id).await.unwrap();

        let outcome = h
            .service
            .respond_to_request(&h.driver, ride.id, rider.user_id, Decision::Approve)
            .await
            .unwrap();

        assert_eq!(outcome.ride.available_seats, 0);
        assert_eq!(outcome.ride.passengers, vec![rider.user_id]);
        assert!(outcome.ride.requests.is_empty());
        assert_eq!(outcome.notification, NotificationDispatch::Queued);

        // Delivery happens on a background task.
        for _ in 0..50 {
            if !h.notifier.sent().is_empty() {
                break;
            }
            tokio::time::sleep(StdDuration::from_millis(10)).await;
        }
        let sent = h.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "+15551000007");
        assert_eq!(sent[0].body.as_deref(), Some("Your ride with Dana Driver has been approved!"));

        // A seat-less ride no longer accepts requests.
        let late = add_rider(&h, 8).await;
        assert!(matches!(h.service.request_to_join(&late, ride.id).await, Err(RideError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_reject_keeps_seats_and_passengers() {
        let h = harness(RecordingNotifier::new()).await;
        let rider = add_rider(&h, 1).await;
        let ride = h.service.create_ride(&h.driver, new_ride(2, Utc::now() + Duration::hours(1))).await.unwrap();
        h.service.request_to_join(&rider, ride.id).await.unwrap();

        let outcome = h
            .service
            .respond_to_request(&h.driver, ride.id, rider.user_id, Decision::Reject)
            .await
            .unwrap();

        assert_eq!(outcome.ride.available_seats, 2);
        assert!(outcome.ride.passengers.is_empty());
        assert!(outcome.ride.requests.is_empty());
        assert_eq!(outcome.notification, NotificationDispatch::NotRequired);
        assert!(h.notifier.sent().is_empty());

        let err = h
            .service
            .respond_to_request(&h.driver, ride.id, rider.user_id, Decision::Reject)
            .await
            .unwrap_err();
        assert!(matches!(err, RideError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_only_owner_can_respond() {
        let h = harness(RecordingNotifier::new()).await;
        let rider = add_rider(&h, 1).await;
        let ride = h.service.create_ride(&h.driver, new_ride(2, Utc::now() + Duration::hours(1))).await.unwrap();
        h.service.request_to_join(&rider, ride.id).await.unwrap();

        let other_driver = Caller::new(Uuid::new_v4(), Role::Driver);
        let err = h
            .service
            .respond_to_request(&other_driver, ride.id, rider.user_id, Decision::Approve)
            .await
            .unwrap_err();
        assert!(matches!(err, RideError::Forbidden(_)));

        let stored = h.service.get_ride(ride.id).await.unwrap();
        assert_eq!(stored.requests, vec![rider.user_id]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_approvals_never_oversell() {
        let h = harness(RecordingNotifier::new()).await;
        let ride = h.service.create_ride(&h.driver, new_ride(1, Utc::now() + Duration::hours(1))).await.unwrap();

        let mut riders = Vec::new();
        for n in 0..8 {
            let rider = add_rider(&h, n).await;
            h.service.request_to_join(&rider, ride.id).await.unwrap();
            riders.push(rider);
        }

        let ride_id = ride.id;
        let handles: Vec<_> = riders
            .iter()
            .map(|rider| {
                let service = Arc::clone(&h.service);
                let driver = h.driver;
                let rider_id = rider.user_id;
                tokio::spawn(async move {
                    service.respond_to_request(&driver, ride_id, rider_id, Decision::Approve).await
                })
            })
            .collect();

        let mut approved = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => approved += 1,
                Err(RideError::Conflict(_)) => {}
                Err(other) => panic!("unexpected error: {:?}", other),
            }
        }

        let stored = h.service.get_ride(ride.id).await.unwrap();
        assert_eq!(approved, 1);
        assert_eq!(stored.available_seats, 0);
        assert_eq!(stored.passengers.len(), 1);
        assert_eq!(stored.requests.len(), 7);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_join_requests_all_land() {
        let h = harness(RecordingNotifier::new()).await;
        let ride = h.service.create_ride(&h.driver, new_ride(50, Utc::now() + Duration::hours(1))).await.unwrap();
        let ride_id = ride.id;

        let mut expected = 0;
        for round in 0..4u32 {
            let mut riders = Vec::new();
            for n in 0..32u32 {
                riders.push(add_rider(&h, round * 100 + n).await);
            }

            let handles: Vec<_> = riders
                .into_iter()
                .map(|rider| {
                    let service = Arc::clone(&h.service);
                    tokio::spawn(async move { service.request_to_join(&rider, ride_id).await })
                })
                .collect();

            for handle in handles {
                if let Err(e) = handle.await.unwrap() {
                    panic!("contention surfaced as an error: {:?}", e);
                }
            }
            expected += 32;
        }

        let stored = h.service.get_ride(ride_id).await.unwrap();
        assert_eq!(stored.requests.len(), expected);
        assert_eq!(stored.available_seats, 50);
    }

    #[tokio::test]
    async fn test_notification_failure_does_not_roll_back() {
        let h = harness(RecordingNotifier::failing()).await;
        let rider = add_rider(&h, 1).await;
        let ride = h.service.create_ride(&h.driver, new_ride(1, Utc::now() + Duration::hours(1))).await.unwrap();
        h.service.request_to_join(&rider, ride.id).await.unwrap();

        let mut rx = h.events.subscribe();
        let outcome = h
            .service
            .respond_to_request(&h.driver, ride.id, rider.user_id, Decision::Approve)
            .await
            .unwrap();
        assert_eq!(outcome.notification, NotificationDispatch::Queued);

        let failure = tokio::time::timeout(StdDuration::from_secs(2), async {
            loop {
                if let Ok(event @ RideEvent::NotificationFailed { .. }) = rx.recv().await {
                    return event;
                }
            }
        })
        .await
        .expect("notification failure should be reported");
        assert!(failure.is_for(rider.user_id));

        let stored = h.service.get_ride(ride.id).await.unwrap();
        assert_eq!(stored.passengers, vec![rider.user_id]);
        assert_eq!(stored.available_seats, 0);
    }

    #[tokio::test]
    async fn test_search_ranks_candidates() {
        let h = harness(RecordingNotifier::new()).await;
        let rider = add_rider(&h, 1).await;
        let t = Utc::now() + Duration::hours(2);

        let exact = h.service.create_ride(&h.driver, new_ride(2, t + Duration::minutes(10))).await.unwrap();
        let partial = NewRide { drop_location: Some("Airport Cargo Gate".into()), ..new_ride(2, t + Duration::minutes(50)) };
        let partial = h.service.create_ride(&h.driver, partial).await.unwrap();
        let elsewhere = NewRide { pickup_location: Some("Harbor".into()), ..new_ride(2, t) };
        h.service.create_ride(&h.driver, elsewhere).await.unwrap();

        let criteria = SearchCriteria::new("downtown", "airport", Some(t), RiderPreferences::new()).unwrap();
        let results = h.service.search(&rider, &criteria).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].ride.id, exact.id);
        assert_eq!(results[1].ride.id, partial.id);
        assert!((results[0].match_score - 1.0).abs() < 1e-9);

        let driver = results[0].driver.as_ref().expect("driver summary attached");
        assert_eq!(driver.id, h.driver.user_id);
        assert_eq!(driver.name, "Dana Driver");
        assert_eq!(driver.role, Role::Driver);
        assert_eq!(driver.phone, "+XX-XXXXXX0001");
        assert_eq!(results[1].driver.as_ref().map(|d| d.id), Some(h.driver.user_id));

        let mut private = h.users.find_user(h.driver.user_id).await.unwrap().unwrap();
        private.privacy.hide_full_name = true;
        h.users.update_user(&private).await.unwrap();
        let results = h.service.search(&rider, &criteria).await.unwrap();
        let shown = results[0].driver.as_ref().map(|d| d.name.clone()).unwrap();
        assert_ne!(shown, "Dana Driver");
        assert!(shown.starts_with('D'));

        assert!(matches!(h.service.search(&h.driver, &criteria).await, Err(RideError::Forbidden(_))));
    }
}
