pub mod models;
pub mod pii;

pub use models::events::RideEvent;
pub use pii::Masked;
