pub mod models;
pub mod repository;
pub mod notification;

pub use models::{Caller, DriverSummary, Message, RideOffer, RidePreferences, RideStateError, Role, User};
pub use repository::{CandidateQuery, MessageStore, RideStore, UserStore};
pub use notification::{LoggingNotifier, NotificationService, RecordingNotifier};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Storage error: {0}")]
    StorageError(String),
    #[error("Dependency failed: {0}")]
    DependencyError(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
