pub mod models;
pub mod validation;
pub mod accounts;
pub mod messaging;

pub use models::{AccountError, CallReport, DeliveryReport, Location, NewUser, ProfileUpdate, ProfileView};
pub use accounts::AccountService;
pub use messaging::MessageService;
