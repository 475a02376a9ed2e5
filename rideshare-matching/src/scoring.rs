//! Three-factor compatibility score between a search and a ride offer.

use chrono::{DateTime, Utc};
use rideshare_core::{RideOffer, RidePreferences};

use crate::criteria::{RiderPreferences, SearchCriteria};

pub const LOCATION_WEIGHT: f64 = 0.4;
pub const TIMING_WEIGHT: f64 = 0.4;
pub const PREFERENCE_WEIGHT: f64 = 0.2;

const ENDPOINT_EXACT: f64 = 0.5;
const ENDPOINT_PARTIAL: f64 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBreakdown {
    pub location: f64,
    pub timing: f64,
    pub preference: f64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        (self.location * LOCATION_WEIGHT)
            + (self.timing * TIMING_WEIGHT)
            + (self.preference * PREFERENCE_WEIGHT)
    }
}

/// Each endpoint earns 0.5 on a case-insensitive exact match and 0.25
/// otherwise, so the result is one of 0.5, 0.75 or 1.0.
pub fn location_score(pickup: &str, drop: &str, ride: &RideOffer) -> f64 {
    endpoint_score(pickup, &ride.pickup_location) + endpoint_score(drop, &ride.drop_location)
}

fn endpoint_score(requested: &str, offered: &str) -> f64 {
    if requested.to_lowercase() == offered.to_lowercase() {
        ENDPOINT_EXACT
    } else {
        ENDPOINT_PARTIAL
    }
}

/// Bucketed closeness of departure times. Bucket bounds are inclusive.
pub fn timing_score(requested: DateTime<Utc>, offered: DateTime<Utc>) -> f64 {
    let diff_minutes = (requested - offered).num_milliseconds().abs() as f64 / 60_000.0;

    if diff_minutes <= 15.0 {
        1.0
    } else if diff_minutes <= 30.0 {
        0.8
    } else if diff_minutes <= 60.0 {
        0.5
    } else {
        0.2
    }
}

/// Share of the Rider's preference keys the ride agrees with. No keys means
/// no opinion, which counts as fully compatible.
pub fn preference_score(wanted: &RiderPreferences, offered: &RidePreferences) -> f64 {
    if wanted.is_empty() {
        return 1.0;
    }

    let matched = wanted
        .iter()
        .filter(|(key, value)| match (value.as_bool(), offered.get(key.as_str())) {
            (Some(want), Some(have)) => want == *have,
            _ => false,
        })
        .count();

    matched as f64 / wanted.len() as f64
}

pub fn score_ride(criteria: &SearchCriteria, reference_time: DateTime<Utc>, ride: &RideOffer) -> ScoreBreakdown {
    ScoreBreakdown {
        location: location_score(&criteria.pickup_location, &criteria.drop_location, ride),
        timing: timing_score(reference_time, ride.departure_time),
        preference: preference_score(&criteria.preferences, &ride.preferences),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;
    use uuid::Uuid;

    fn ride(pickup: &str, drop: &str) -> RideOffer {
        RideOffer::new(Uuid::new_v4(), pickup.into(), drop.into(), Utc::now(), 2)
    }

    #[test]
    fn test_location_floor() {
        let offer = ride("Downtown", "Airport");
        assert_eq!(location_score("DOWNTOWN", "airport", &offer), 1.0);
        assert_eq!(location_score("Downtown", "Airport T2", &offer), 0.75);
        assert_eq!(location_score("Down", "Air", &offer), 0.5);
    }

    #[test]
    fn test_timing_buckets_are_inclusive() {
        let t = Utc::now();
        assert_eq!(timing_score(t, t), 1.0);
        assert_eq!(timing_score(t, t + Duration::minutes(15)), 1.0);
        assert_eq!(timing_score(t, t + Duration::minutes(15) + Duration::seconds(1)), 0.8);
        assert_eq!(timing_score(t, t - Duration::minutes(30)), 0.8);
        assert_eq!(timing_score(t, t + Duration::minutes(31)), 0.5);
        assert_eq!(timing_score(t, t + Duration::minutes(60)), 0.5);
        assert_eq!(timing_score(t, t + Duration::minutes(61)), 0.2);
        assert_eq!(timing_score(t, t - Duration::days(3)), 0.2);
    }

    #[test]
    fn test_empty_preferences_are_fully_compatible() {
        let mut offered = RidePreferences::new();
        offered.insert("smoking".into(), true);
        assert_eq!(preference_score(&RiderPreferences::new(), &offered), 1.0);
        assert_eq!(preference_score(&RiderPreferences::new(), &RidePreferences::new()), 1.0);
    }

    #[test]
    fn test_preference_share_and_degradation() {
        let mut offered = RidePreferences::new();
        offered.insert("music".into(), true);
        offered.insert("smoking".into(), false);

        let mut wanted = RiderPreferences::new();
        wanted.insert("music".into(), json!(true));
        wanted.insert("smoking".into(), json!("false"));
        wanted.insert("pets_allowed".into(), json!(true));
        wanted.insert("ac".into(), json!(false));

        // music matches; a string value and keys the ride lacks do not.
        assert_eq!(preference_score(&wanted, &offered), 0.25);
    }

    #[test]
    fn test_breakdown_total_uses_weights() {
        let breakdown = ScoreBreakdown { location: 0.5, timing: 0.2, preference: 0.0 };
        assert!((breakdown.total() - 0.28).abs() < 1e-9);

        let perfect = ScoreBreakdown { location: 1.0, timing: 1.0, preference: 1.0 };
        assert!((perfect.total() - 1.0).abs() < 1e-9);
    }
}
