use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use rideshare_shared::Masked;
use uuid::Uuid;

use crate::{CoreError, CoreResult};

/// Outbound SMS/call provider. Returns the provider's delivery id.
#[async_trait]
pub trait NotificationService: Send + Sync {
    async fn send_sms(&self, to: &Masked<String>, body: &str) -> CoreResult<String>;

    /// Connect a call to `to` without revealing the caller's number.
    async fn place_call(&self, to: &Masked<String>) -> CoreResult<String>;
}

/// Development notifier: writes deliveries to the log instead of a provider.
pub struct LoggingNotifier;

#[async_trait]
impl NotificationService for LoggingNotifier {
    async fn send_sms(&self, to: &Masked<String>, body: &str) -> CoreResult<String> {
        let delivery_id = format!("log-sms-{}", Uuid::new_v4().simple());
        tracing::info!(to = %to, delivery_id = %delivery_id, "SMS: {}", body);
        Ok(delivery_id)
    }

    async fn place_call(&self, to: &Masked<String>) -> CoreResult<String> {
        let delivery_id = format!("log-call-{}", Uuid::new_v4().simple());
        tracing::info!(to = %to, delivery_id = %delivery_id, "Masked call");
        Ok(delivery_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentNotification {
    pub to: String,
    pub body: Option<String>,
}

/// In-memory notifier that records what it was asked to send and can be
/// switched into a failing mode. Used by tests across the workspace.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentNotification>>,
    failing: AtomicBool,
    failing_numbers: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let notifier = Self::default();
        notifier.set_failing(true);
        notifier
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Fail only deliveries addressed to `phone`.
    pub fn fail_for(&self, phone: &str) {
        if let Ok(mut numbers) = self.failing_numbers.lock() {
            numbers.push(phone.to_string());
        }
    }

    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    fn record(&self, to: &Masked<String>, body: Option<&str>) -> CoreResult<String> {
        let blocked = self
            .failing_numbers
            .lock()
            .map(|n| n.contains(to.expose()))
            .unwrap_or(false);
        if self.failing.load(Ordering::SeqCst) || blocked {
            return Err(CoreError::DependencyError(format!("delivery to {} failed", to)));
        }

        let mut sent = self
            .sent
            .lock()
            .map_err(|_| CoreError::DependencyError("recorder poisoned".to_string()))?;
        sent.push(SentNotification {
            to: to.expose().clone(),
            body: body.map(str::to_string),
        });
        Ok(format!("rec-{}", sent.len()))
    }
}

#[async_trait]
impl NotificationService for RecordingNotifier {
    async fn send_sms(&self, to: &Masked<String>, body: &str) -> CoreResult<String> {
        self.record(to, Some(body))
    }

    async fn place_call(&self, to: &Masked<String>) -> CoreResult<String> {
        self.record(to, None)
    }
}
