use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use rideshare_core::{DriverSummary, RideOffer};
use serde::{Deserialize, Serialize};

use crate::criteria::SearchCriteria;
use crate::scoring::score_ride;

/// A candidate ride with its compatibility score. `driver` is filled in by
/// the caller once driver accounts are loaded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchResult {
    #[serde(flatten)]
    pub ride: RideOffer,
    pub match_score: f64,
    #[serde(default)]
    pub driver: Option<DriverSummary>,
}

/// Score and order candidates best-first, timing against the requested
/// departure or the current time when none was given.
pub fn rank_rides(criteria: &SearchCriteria, candidates: Vec<RideOffer>) -> Vec<MatchResult> {
    rank_rides_at(criteria, candidates, Utc::now())
}

/// Pure form of [`rank_rides`]. Equal scores fall back to the earlier
/// departure, then to the order the candidates arrived in.
pub fn rank_rides_at(
    criteria: &SearchCriteria,
    candidates: Vec<RideOffer>,
    now: DateTime<Utc>,
) -> Vec<MatchResult> {
    let reference_time = criteria.reference_time(now);

    let mut results: Vec<MatchResult> = candidates
        .into_iter()
        .map(|ride| {
            let breakdown = score_ride(criteria, reference_time, &ride);
            tracing::debug!(
                ride_id = %ride.id,
                location = breakdown.location,
                timing = breakdown.timing,
                preference = breakdown.preference,
                "scored candidate ride"
            );
            MatchResult {
                match_score: breakdown.total(),
                ride,
                driver: None,
            }
        })
        .collect();

    // sort_by is stable, so input order survives full ties.
    results.sort_by(|a, b| {
        b.match_score
            .partial_cmp(&a.match_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.ride.departure_time.cmp(&b.ride.departure_time))
    });

    results
}
