pub mod app_config;
pub mod database;
pub mod ride_repo;
pub mod user_repo;
pub mod message_repo;
pub mod memory;
pub mod redis_repo;
pub mod sms;

pub use database::DbClient;
pub use memory::{MemoryMessageStore, MemoryRideStore, MemoryUserStore};
pub use message_repo::PgMessageStore;
pub use redis_repo::RedisClient;
pub use ride_repo::PgRideStore;
pub use user_repo::PgUserStore;
pub use sms::TwilioNotifier;
