pub mod models;
pub mod service;

pub use models::{Decision, NewRide, NotificationDispatch, RequestOutcome, RideError};
pub use service::RideService;
