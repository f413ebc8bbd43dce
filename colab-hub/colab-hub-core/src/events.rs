use serde::Serialize;
use tokio::sync::broadcast;

/// Change announced to connected clients. Every event is addressed to one user.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HubEvent {
    TreeSaved { user_id: String },
    InvitationCreated { id: String, to_user_id: String },
    InvitationAccepted { id: String, from_user_id: String },
    InvitationDeclined { id: String, from_user_id: String },
    ParticipantRemoved { project_id: String, user_id: String },
    NotificationRead { id: String, user_id: String },
    AllNotificationsRead { user_id: String, updated: usize },
}

impl HubEvent {
    /// User whose view the event changes.
    pub fn recipient(&self) -> &str {
        match self {
            HubEvent::TreeSaved { user_id }
            | HubEvent::ParticipantRemoved { user_id, .. }
            | HubEvent::NotificationRead { user_id, .. }
            | HubEvent::AllNotificationsRead { user_id, .. } => user_id,
            HubEvent::InvitationCreated { to_user_id, .. } => to_user_id,
            HubEvent::InvitationAccepted { from_user_id, .. }
            | HubEvent::InvitationDeclined { from_user_id, .. } => from_user_id,
        }
    }
}

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<HubEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(100);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HubEvent> {
        self.tx.subscribe()
    }

    /// Publish to current subscribers. Dropped silently when nobody listens.
    pub fn send(&self, event: HubEvent) {
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_see_events_in_order() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        bus.send(HubEvent::InvitationCreated {
            id: "i1".into(),
            to_user_id: "bob".into(),
        });
        bus.send(HubEvent::InvitationDeclined {
            id: "i1".into(),
            from_user_id: "alice".into(),
        });

        let first = rx.recv().await.unwrap();
        assert_eq!(first.recipient(), "bob");
        let second = rx.recv().await.unwrap();
        assert_eq!(second.recipient(), "alice");
        assert_eq!(
            serde_json::to_value(&second).unwrap(),
            serde_json::json!({"type": "invitation_declined", "id": "i1", "from_user_id": "alice"})
        );
    }
}
