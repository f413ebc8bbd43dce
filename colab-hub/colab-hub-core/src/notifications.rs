//! Per-user notification feed derived from invitation events.

use crate::collaboration::Invitation;
use crate::error::{HubError, HubResult};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ProjectInvite,
    InviteAccepted,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum NotificationData {
    #[serde(rename_all = "camelCase")]
    ProjectInvite {
        invitation_id: String,
        project_id: String,
        project_title: String,
        from_user_id: String,
        from_user_name: String,
    },
    #[serde(rename_all = "camelCase")]
    InviteAccepted {
        project_id: String,
        user_id: String,
        user_name: String,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub data: NotificationData,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_at: Option<DateTime<Utc>>,
}

impl Notification {
    /// Tell the invitee about a new invitation.
    pub fn project_invite(invitation: &Invitation) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: invitation.to_user_id.clone(),
            kind: NotificationKind::ProjectInvite,
            title: "New project invitation".to_string(),
            message: format!(
                "{} invited you to join the project \"{}\"",
                invitation.from_user_name, invitation.project_title
            ),
            data: NotificationData::ProjectInvite {
                invitation_id: invitation.id.clone(),
                project_id: invitation.project_id.clone(),
                project_title: invitation.project_title.clone(),
                from_user_id: invitation.from_user_id.clone(),
                from_user_name: invitation.from_user_name.clone(),
            },
            read: false,
            created_at: Utc::now(),
            read_at: None,
        }
    }

    /// Tell the inviter their invitation was accepted.
    pub fn invite_accepted(invitation: &Invitation) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: invitation.from_user_id.clone(),
            kind: NotificationKind::InviteAccepted,
            title: "Invitation accepted".to_string(),
            message: format!(
                "{} accepted the invitation to the project \"{}\"",
                invitation.to_user_name, invitation.project_title
            ),
            data: NotificationData::InviteAccepted {
                project_id: invitation.project_id.clone(),
                user_id: invitation.to_user_id.clone(),
                user_name: invitation.to_user_name.clone(),
            },
            read: false,
            created_at: Utc::now(),
            read_at: None,
        }
    }
}

/// Notifications in creation order. Entries are never removed.
#[derive(Default)]
pub struct NotificationFeed {
    entries: RwLock<Vec<Notification>>,
}

impl NotificationFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<Notification>) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }

    pub fn push(&self, notification: Notification) {
        debug!(id = %notification.id, user_id = %notification.user_id, "notification added");
        self.entries.write().push(notification);
    }

    /// Newest first. Equal timestamps are ordered by creation sequence.
    pub fn list_for_user(&self, user_id: &str, unread_only: bool) -> Vec<Notification> {
        let entries = self.entries.read();
        let mut matching: Vec<(usize, &Notification)> = entries
            .iter()
            .enumerate()
            .filter(|(_, n)| n.user_id == user_id && (!unread_only || !n.read))
            .collect();
        matching.sort_by(|(ia, a), (ib, b)| {
            b.created_at.cmp(&a.created_at).then_with(|| ib.cmp(ia))
        });
        matching.into_iter().map(|(_, n)| n.clone()).collect()
    }

    pub fn unread_count(&self, user_id: &str) -> usize {
        self.entries
            .read()
            .iter()
            .filter(|n| n.user_id == user_id && !n.read)
            .count()
    }

    /// Mark one notification read. Already-read notifications are left as is.
    pub fn mark_read(&self, id: &str) -> HubResult<Notification> {
        let mut entries = self.entries.write();
        let notification = entries
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| HubError::NotFound(format!("notification {id}")))?;
        if !notification.read {
            notification.read = true;
            notification.read_at = Some(Utc::now());
        }
        Ok(notification.clone())
    }

    /// Mark every unread notification of `user_id` read; returns how many changed.
    pub fn mark_all_read(&self, user_id: &str) -> usize {
        let now = Utc::now();
        let mut changed = 0;
        for n in self
            .entries
            .write()
            .iter_mut()
            .filter(|n| n.user_id == user_id && !n.read)
        {
            n.read = true;
            n.read_at = Some(now);
            changed += 1;
        }
        changed
    }

    pub fn snapshot(&self) -> Vec<Notification> {
        self.entries.read().clone()
    }
}
