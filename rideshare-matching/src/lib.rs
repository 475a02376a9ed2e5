pub mod criteria;
pub mod scoring;
pub mod ranker;

pub use criteria::{parse_preferences, MatchError, RiderPreferences, SearchCriteria};
pub use ranker::{rank_rides, rank_rides_at, MatchResult};
