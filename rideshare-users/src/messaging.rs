use std::sync::Arc;

use chrono::Utc;
use rideshare_core::{Caller, Message, MessageStore, UserStore};
use rideshare_shared::RideEvent;
use tokio::sync::broadcast;
use tracing::info;
use uuid::Uuid;

use crate::models::AccountError;

/// Direct messages between a Rider and a Driver.
pub struct MessageService {
    users: Arc<dyn UserStore>,
    messages: Arc<dyn MessageStore>,
    events: broadcast::Sender<RideEvent>,
}

impl MessageService {
    pub fn new(
        users: Arc<dyn UserStore>,
        messages: Arc<dyn MessageStore>,
        events: broadcast::Sender<RideEvent>,
    ) -> Self {
        Self { users, messages, events }
    }

    pub async fn send(&self, caller: &Caller, receiver_id: Uuid, body: &str) -> Result<Message, AccountError> {
        let body = body.trim();
        if body.is_empty() {
            return Err(AccountError::Validation("Receiver and message are required".to_string()));
        }

        let receiver = self
            .users
            .find_user(receiver_id)
            .await?
            .ok_or_else(|| AccountError::NotFound("Receiver not found".to_string()))?;

        if receiver.role == caller.role {
            return Err(AccountError::Forbidden(
                "Messages can only be exchanged between a Rider and a Driver".to_string(),
            ));
        }

        let message = Message::new(caller.user_id, receiver.id, body.to_string());
        self.messages.insert_message(&message).await?;
        info!("Message {} from {} to {}", message.id, caller.user_id, receiver.id);

        let _ = self.events.send(RideEvent::MessageSent {
            message_id: message.id,
            sender_id: message.sender_id,
            receiver_id: message.receiver_id,
            timestamp: Utc::now().timestamp(),
        });

        Ok(message)
    }

    /// Both directions of the exchange with `other_id`, oldest first.
    pub async fn conversation(&self, caller: &Caller, other_id: Uuid) -> Result<Vec<Message>, AccountError> {
        Ok(self.messages.conversation(caller.user_id, other_id).await?)
    }
}
