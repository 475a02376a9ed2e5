use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rideshare_core::{CoreError, CoreResult, NotificationService};
use rideshare_shared::Masked;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CircuitState {
    Closed,   // Normal operation
    Open,     // Failure detected, failing fast
    HalfOpen, // Testing if service is back
}

pub struct CircuitBreaker {
    pub name: String,
    state: RwLock<CircuitState>,
    failure_count: AtomicUsize,
    failure_threshold: usize,
    reset_timeout: Duration,
    last_failure: RwLock<Option<Instant>>,
}

impl CircuitBreaker {
    pub fn new(name: &str, threshold: usize, timeout: Duration) -> Self {
        Self {
            name: name.to_string(),
            state: RwLock::new(CircuitState::Closed),
            failure_count: AtomicUsize::new(0),
            failure_threshold: threshold.max(1),
            reset_timeout: timeout,
            last_failure: RwLock::new(None),
        }
    }

    pub async fn state(&self) -> CircuitState {
        *self.state.read().await
    }

    /// Whether a call may go through right now.
    pub async fn check(&self) -> bool {
        let state = *self.state.read().await;
        if state == CircuitState::Closed {
            return true;
        }

        if state == CircuitState::Open {
            let last_fail = *self.last_failure.read().await;
            if let Some(instant) = last_fail {
                if instant.elapsed() > self.reset_timeout {
                    let mut s = self.state.write().await;
                    *s = CircuitState::HalfOpen;
                    tracing::info!("Circuit Breaker [{}] moving to Half-Open", self.name);
                    return true;
                }
            }
            return false;
        }

        // Half-Open lets a trial request through
        true
    }

    pub async fn record_success(&self) {
        let mut state = self.state.write().await;
        if *state == CircuitState::HalfOpen {
            *state = CircuitState::Closed;
            self.failure_count.store(0, Ordering::SeqCst);
            tracing::info!("Circuit Breaker [{}] recovered to Closed", self.name);
        } else if *state == CircuitState::Closed {
            self.failure_count.store(0, Ordering::SeqCst);
        }
    }

    pub async fn record_failure(&self) {
        let count = self.failure_count.fetch_add(1, Ordering::SeqCst) + 1;
        let mut state = self.state.write().await;

        if count >= self.failure_threshold || *state == CircuitState::HalfOpen {
            *state = CircuitState::Open;
            let mut last = self.last_failure.write().await;
            *last = Some(Instant::now());
            tracing::error!("Circuit Breaker [{}] TRIPPED to Open. Failures: {}", self.name, count);
        }
    }
}

/// Notification provider guarded by a circuit breaker. While the circuit is
/// open, deliveries fail immediately with a dependency error.
pub struct BreakerNotifier {
    inner: Arc<dyn NotificationService>,
    breaker: CircuitBreaker,
}

impl BreakerNotifier {
    pub fn new(inner: Arc<dyn NotificationService>, breaker: CircuitBreaker) -> Self {
        Self { inner, breaker }
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    async fn guard(&self, result: CoreResult<String>) -> CoreResult<String> {
        match &result {
            Ok(_) => self.breaker.record_success().await,
            Err(_) => self.breaker.record_failure().await,
        }
        result
    }

    fn open_error(&self) -> CoreError {
        CoreError::DependencyError(format!("Circuit Breaker [{}] is OPEN", self.breaker.name))
    }
}

#[async_trait]
impl NotificationService for BreakerNotifier {
    async fn send_sms(&self, to: &Masked<String>, body: &str) -> CoreResult<String> {
        if !self.breaker.check().await {
            return Err(self.open_error());
        }
        let result = self.inner.send_sms(to, body).await;
        self.guard(result).await
    }

    async fn place_call(&self, to: &Masked<String>) -> CoreResult<String> {
        if !self.breaker.check().await {
            return Err(self.open_error());
        }
        let result = self.inner.place_call(to).await;
        self.guard(result).await
    }
}
