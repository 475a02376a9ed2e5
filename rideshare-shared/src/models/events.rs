use uuid::Uuid;

/// Events fanned out to live subscribers (SSE) after a state change commits.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RideEvent {
    RideCreated {
        ride_id: Uuid,
        driver_id: Uuid,
        timestamp: i64,
    },
    RideRequested {
        ride_id: Uuid,
        driver_id: Uuid,
        rider_id: Uuid,
        timestamp: i64,
    },
    RequestApproved {
        ride_id: Uuid,
        driver_id: Uuid,
        rider_id: Uuid,
        seats_left: i32,
        timestamp: i64,
    },
    RequestRejected {
        ride_id: Uuid,
        driver_id: Uuid,
        rider_id: Uuid,
        timestamp: i64,
    },
    NotificationFailed {
        ride_id: Option<Uuid>,
        recipient_id: Uuid,
        reason: String,
        timestamp: i64,
    },
    MessageSent {
        message_id: Uuid,
        sender_id: Uuid,
        receiver_id: Uuid,
        timestamp: i64,
    },
}

impl RideEvent {
    /// Users who should see this event on their live stream.
    pub fn audience(&self) -> Vec<Uuid> {
        match self {
            RideEvent::RideCreated { driver_id, .. } => vec![*driver_id],
            RideEvent::RideRequested { driver_id, rider_id, .. } => vec![*driver_id, *rider_id],
            RideEvent::RequestApproved { driver_id, rider_id, .. }
            | RideEvent::RequestRejected { driver_id, rider_id, .. } => vec![*driver_id, *rider_id],
            RideEvent::NotificationFailed { recipient_id, .. } => vec![*recipient_id],
            RideEvent::MessageSent { sender_id, receiver_id, .. } => vec![*sender_id, *receiver_id],
        }
    }

    pub fn is_for(&self, user_id: Uuid) -> bool {
        self.audience().contains(&user_id)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RideEvent::RideCreated { .. } => "ride_created",
            RideEvent::RideRequested { .. } => "ride_requested",
            RideEvent::RequestApproved { .. } => "request_approved",
            RideEvent::RequestRejected { .. } => "request_rejected",
            RideEvent::NotificationFailed { .. } => "notification_failed",
            RideEvent::MessageSent { .. } => "message_sent",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audience_routing() {
        let driver = Uuid::new_v4();
        let rider = Uuid::new_v4();
        let stranger = Uuid::new_v4();

        let event = RideEvent::RequestApproved {
            ride_id: Uuid::new_v4(),
            driver_id: driver,
            rider_id: rider,
            seats_left: 0,
            timestamp: 0,
        };

        assert!(event.is_for(driver));
        assert!(event.is_for(rider));
        assert!(!event.is_for(stranger));
    }

    #[test]
    fn test_event_tagging() {
        let event = RideEvent::NotificationFailed {
            ride_id: None,
            recipient_id: Uuid::nil(),
            reason: "provider down".to_string(),
            timestamp: 42,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "notification_failed");
        assert_eq!(event.kind(), "notification_failed");
    }
}
