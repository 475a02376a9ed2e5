use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rideshare_core::CandidateQuery;
use serde::{Deserialize, Serialize};

/// What the Rider asked for. Values are kept untyped so a non-boolean value
/// scores as a non-match instead of failing the search.
pub type RiderPreferences = BTreeMap<String, serde_json::Value>;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum MatchError {
    #[error("pickup and drop locations are required")]
    MissingRoute,
    #[error("invalid preferences: {0}")]
    InvalidPreferences(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchCriteria {
    pub pickup_location: String,
    pub drop_location: String,
    pub departure_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub preferences: RiderPreferences,
}

impl SearchCriteria {
    pub fn new(
        pickup_location: &str,
        drop_location: &str,
        departure_time: Option<DateTime<Utc>>,
        preferences: RiderPreferences,
    ) -> Result<Self, MatchError> {
        let pickup_location = pickup_location.trim();
        let drop_location = drop_location.trim();
        if pickup_location.is_empty() || drop_location.is_empty() {
            return Err(MatchError::MissingRoute);
        }

        Ok(Self {
            pickup_location: pickup_location.to_string(),
            drop_location: drop_location.to_string(),
            departure_time,
            preferences,
        })
    }

    /// Requested departure, or `now` when the Rider gave none.
    pub fn reference_time(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.departure_time.unwrap_or(now)
    }

    /// Storage filter that produces the candidate list for these criteria.
    pub fn candidate_query(&self, now: DateTime<Utc>) -> CandidateQuery {
        CandidateQuery {
            pickup: self.pickup_location.clone(),
            drop: self.drop_location.clone(),
            min_departure: self.reference_time(now),
        }
    }
}

/// Parse the query-string form of the preference mapping (a JSON object).
pub fn parse_preferences(raw: Option<&str>) -> Result<RiderPreferences, MatchError> {
    let raw = match raw.map(str::trim) {
        None | Some("") => return Ok(RiderPreferences::new()),
        Some(raw) => raw,
    };

    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| MatchError::InvalidPreferences(e.to_string()))?;

    match value {
        serde_json::Value::Object(map) => Ok(map.into_iter().collect()),
        other => Err(MatchError::InvalidPreferences(format!(
            "expected a JSON object, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_parse_preferences() {
        assert!(parse_preferences(None).unwrap().is_empty());
        assert!(parse_preferences(Some("  ")).unwrap().is_empty());

        let prefs = parse_preferences(Some(r#"{"music": true, "smoking": "no"}"#)).unwrap();
        assert_eq!(prefs["music"], serde_json::json!(true));
        assert_eq!(prefs["smoking"], serde_json::json!("no"));

        assert!(matches!(
            parse_preferences(Some("{music: true")),
            Err(MatchError::InvalidPreferences(_))
        ));
        assert!(matches!(
            parse_preferences(Some("[true]")),
            Err(MatchError::InvalidPreferences(_))
        ));
    }

    #[test]
    fn test_route_is_required() {
        let err = SearchCriteria::new(" ", "Airport", None, RiderPreferences::new()).unwrap_err();
        assert_eq!(err, MatchError::MissingRoute);
    }

    #[test]
    fn test_candidate_query_defaults_to_now() {
        let now = Utc::now();
        let criteria = SearchCriteria::new("Downtown", "Airport", None, RiderPreferences::new()).unwrap();
        assert_eq!(criteria.candidate_query(now).min_departure, now);

        let later = now + Duration::hours(2);
        let criteria = SearchCriteria { departure_time: Some(later), ..criteria };
        let query = criteria.candidate_query(now);
        assert_eq!(query.min_departure, later);
        assert_eq!(query.pickup, "Downtown");
    }
}
