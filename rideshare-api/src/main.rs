use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use rideshare_api::middleware::{BreakerNotifier, CircuitBreaker};
use rideshare_api::{app, AppState, AuthConfig};
use rideshare_core::{LoggingNotifier, MessageStore, NotificationService, RideStore, UserStore};
use rideshare_store::app_config::Config;
use rideshare_store::{
    DbClient, MemoryMessageStore, MemoryRideStore, MemoryUserStore, PgMessageStore, PgRideStore,
    PgUserStore, RedisClient, TwilioNotifier,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rideshare_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting ride-sharing API on port {}", config.server.port);

    // Persistence
    let (rides, users, messages): (Arc<dyn RideStore>, Arc<dyn UserStore>, Arc<dyn MessageStore>) =
        match &config.database {
            Some(db_config) => {
                let db = DbClient::new(&db_config.url, db_config.max_connections)
                    .await
                    .context("Failed to connect to Postgres")?;
                db.migrate().await.context("Failed to run migrations")?;
                (
                    Arc::new(PgRideStore::new(db.pool.clone())),
                    Arc::new(PgUserStore::new(db.pool.clone())),
                    Arc::new(PgMessageStore::new(db.pool.clone())),
                )
            }
            None => {
                tracing::warn!("No database configured, using in-memory stores");
                (
                    Arc::new(MemoryRideStore::new()),
                    Arc::new(MemoryUserStore::new()),
                    Arc::new(MemoryMessageStore::new()),
                )
            }
        };

    // Notification provider behind a circuit breaker
    let provider: Arc<dyn NotificationService> = match &config.notifications.twilio {
        Some(twilio) => Arc::new(TwilioNotifier::new(twilio.clone()).context("Failed to build Twilio client")?),
        None => {
            tracing::warn!("No SMS provider configured, notifications are only logged");
            Arc::new(LoggingNotifier)
        }
    };
    let notifier = Arc::new(BreakerNotifier::new(
        provider,
        CircuitBreaker::new(
            "notifications",
            config.notifications.breaker_threshold,
            Duration::from_secs(config.notifications.breaker_reset_seconds),
        ),
    ));

    let mut app_state = AppState::new(
        rides,
        users,
        messages,
        notifier,
        AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
        },
    );

    // Redis Connection
    if let Some(redis_config) = &config.redis {
        let redis_client = RedisClient::new(&redis_config.url)
            .await
            .context("Failed to configure Redis")?;
        app_state = app_state.with_rate_limit(Arc::new(redis_client), config.rate_limit.clone());
    } else {
        tracing::warn!("No Redis configured, rate limiting disabled");
    }

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
