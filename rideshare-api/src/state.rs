use std::sync::Arc;

use rideshare_core::{MessageStore, NotificationService, RideStore, UserStore};
use rideshare_rides::RideService;
use rideshare_shared::RideEvent;
use rideshare_store::app_config::RateLimitConfig;
use rideshare_store::RedisClient;
use rideshare_users::{AccountService, MessageService};
use tokio::sync::broadcast;

/// Buffered events per live-stream subscriber before it starts lagging.
const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub rides: Arc<RideService>,
    pub accounts: Arc<AccountService>,
    pub messages: Arc<MessageService>,
    /// Absent when no Redis is configured; requests are then not rate limited.
    pub redis: Option<Arc<RedisClient>>,
    pub events: broadcast::Sender<RideEvent>,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
}

impl AppState {
    /// Wire the services over the given stores and notification provider.
    pub fn new(
        rides: Arc<dyn RideStore>,
        users: Arc<dyn UserStore>,
        messages: Arc<dyn MessageStore>,
        notifier: Arc<dyn NotificationService>,
        auth: AuthConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            rides: Arc::new(RideService::new(rides, users.clone(), notifier.clone(), events.clone())),
            accounts: Arc::new(AccountService::new(users.clone(), notifier)),
            messages: Arc::new(MessageService::new(users, messages, events.clone())),
            redis: None,
            events,
            auth,
            rate_limit: RateLimitConfig::default(),
        }
    }

    pub fn with_rate_limit(mut self, redis: Arc<RedisClient>, limits: RateLimitConfig) -> Self {
        self.redis = Some(redis);
        self.rate_limit = limits;
        self
    }
}
