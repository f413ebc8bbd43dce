//! Project invitations and the shared-project views derived from them.
//!
//! Each invitation moves `pending -> accepted` or `pending -> declined` and
//! never leaves a terminal state. A user's shared projects and a project's
//! participants are computed from accepted invitations on every call.

use crate::directory::{UserDirectory, UserProfile};
use crate::error::{HubError, HubResult};
use crate::notifications::{Notification, NotificationFeed};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

pub mod state;

use state::CollabState;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Declined,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::Pending => "pending",
            InvitationStatus::Accepted => "accepted",
            InvitationStatus::Declined => "declined",
        }
    }
}

impl std::fmt::Display for InvitationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Invitation {
    pub id: String,
    pub project_id: String,
    pub project_title: String,
    #[serde(default)]
    pub project_description: String,
    pub project_owner_id: String,
    pub from_user_id: String,
    pub from_user_name: String,
    pub to_user_id: String,
    pub to_user_name: String,
    pub status: InvitationStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declined_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InviteRequest {
    pub project_id: String,
    pub project_title: String,
    #[serde(default)]
    pub project_description: String,
    pub from_user_id: String,
    pub to_user_id: String,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SharedProjectView {
    pub project_id: String,
    pub project_title: String,
    pub project_description: String,
    pub shared_by: String,
    pub shared_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    Owner,
    Collaborator,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct Participant {
    pub id: String,
    pub name: String,
    pub username: String,
    pub initials: String,
    pub role: ParticipantRole,
}

impl Participant {
    fn from_profile(user: &UserProfile, role: ParticipantRole) -> Self {
        Self {
            id: user.id.clone(),
            name: user.display_name().to_string(),
            username: user.username.clone(),
            initials: user.initials(),
            role,
        }
    }
}

/// Invitation records plus the project-owner registry.
#[derive(Default)]
pub struct InvitationRepository {
    invitations: Vec<Invitation>,
    owners: BTreeMap<String, String>,
}

impl InvitationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&Invitation> {
        self.invitations.iter().find(|inv| inv.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut Invitation> {
        self.invitations.iter_mut().find(|inv| inv.id == id)
    }

    pub fn pending_for(&self, project_id: &str, to_user_id: &str) -> Option<&Invitation> {
        self.invitations.iter().find(|inv| {
            inv.project_id == project_id
                && inv.to_user_id == to_user_id
                && inv.status == InvitationStatus::Pending
        })
    }

    pub fn owner(&self, project_id: &str) -> Option<&str> {
        self.owners.get(project_id).map(String::as_str)
    }

    fn owner_or_register(&mut self, project_id: &str, candidate: &str) -> String {
        self.owners
            .entry(project_id.to_string())
            .or_insert_with(|| candidate.to_string())
            .clone()
    }

    fn accepted(&self) -> impl Iterator<Item = &Invitation> {
        self.invitations
            .iter()
            .filter(|inv| inv.status == InvitationStatus::Accepted)
    }

    pub fn len(&self) -> usize {
        self.invitations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invitations.is_empty()
    }
}

pub struct CollaborationEngine {
    repo: RwLock<InvitationRepository>,
    feed: Arc<NotificationFeed>,
    directory: Arc<dyn UserDirectory>,
    state_file: Option<PathBuf>,
    persist_lock: Mutex<()>,
}

impl CollaborationEngine {
    pub fn new(directory: Arc<dyn UserDirectory>) -> Self {
        Self {
            repo: RwLock::new(InvitationRepository::new()),
            feed: Arc::new(NotificationFeed::new()),
            directory,
            state_file: None,
            persist_lock: Mutex::new(()),
        }
    }

    /// Engine whose invitations, owners and notifications are written to
    /// `path` after every change and reloaded from it here.
    pub fn with_state_file(
        directory: Arc<dyn UserDirectory>,
        path: impl Into<PathBuf>,
    ) -> anyhow::Result<Self> {
        let path = path.into();
        let state = CollabState::load(&path)?;
        info!(
            path = %path.display(),
            invitations = state.invitations.len(),
            notifications = state.notifications.len(),
            "collaboration state loaded"
        );
        Ok(Self {
            repo: RwLock::new(InvitationRepository {
                invitations: state.invitations,
                owners: state.owners,
            }),
            feed: Arc::new(NotificationFeed::from_entries(state.notifications)),
            directory,
            state_file: Some(path),
            persist_lock: Mutex::new(()),
        })
    }

    pub fn feed(&self) -> &NotificationFeed {
        &self.feed
    }

    pub fn get_invitation(&self, id: &str) -> Option<Invitation> {
        self.repo.read().get(id).cloned()
    }

    pub fn project_owner(&self, project_id: &str) -> Option<String> {
        self.repo.read().owner(project_id).map(str::to_string)
    }

    pub async fn find_user(&self, user_id: &str) -> HubResult<UserProfile> {
        self.directory
            .find_user(user_id)
            .await
            .ok_or_else(|| HubError::UserNotFound(user_id.to_string()))
    }

    /// Record `owner_id` as the creator of `project_id`.
    pub fn register_project(&self, project_id: &str, owner_id: &str) -> HubResult<()> {
        require("projectId", project_id)?;
        require("ownerId", owner_id)?;
        {
            let mut repo = self.repo.write();
            match repo.owner(project_id) {
                Some(existing) if existing != owner_id => {
                    return Err(HubError::Conflict(format!(
                        "project {project_id} is already owned by {existing}"
                    )))
                }
                Some(_) => return Ok(()),
                None => {
                    repo.owners
                        .insert(project_id.to_string(), owner_id.to_string());
                }
            }
        }
        self.persist();
        Ok(())
    }

    pub async fn invite(&self, req: InviteRequest) -> HubResult<(Invitation, Notification)> {
        require("projectId", &req.project_id)?;
        require("projectTitle", &req.project_title)?;
        require("fromUserId", &req.from_user_id)?;
        require("toUserId", &req.to_user_id)?;

        let from = self.find_user(&req.from_user_id).await?;
        let to = self.find_user(&req.to_user_id).await?;

        let invitation = {
            let mut repo = self.repo.write();
            if repo.pending_for(&req.project_id, &req.to_user_id).is_some() {
                return Err(HubError::DuplicateInvite(format!(
                    "{} already has a pending invitation to \"{}\"",
                    to.display_name(),
                    req.project_title
                )));
            }
            let owner = repo.owner_or_register(&req.project_id, &req.from_user_id);
            let invitation = Invitation {
                id: Uuid::new_v4().to_string(),
                project_id: req.project_id,
                project_title: req.project_title,
                project_description: req.project_description,
                project_owner_id: owner,
                from_user_id: from.id.clone(),
                from_user_name: from.display_name().to_string(),
                to_user_id: to.id.clone(),
                to_user_name: to.display_name().to_string(),
                status: InvitationStatus::Pending,
                created_at: Utc::now(),
                accepted_at: None,
                declined_at: None,
            };
            repo.invitations.push(invitation.clone());
            invitation
        };

        let notification = Notification::project_invite(&invitation);
        self.feed.push(notification.clone());
        self.persist();
        info!(
            invitation_id = %invitation.id,
            project_id = %invitation.project_id,
            from = %invitation.from_user_id,
            to = %invitation.to_user_id,
            "invitation created"
        );
        Ok((invitation, notification))
    }

    pub fn accept(&self, invitation_id: &str, user_id: &str) -> HubResult<(Invitation, Notification)> {
        let invitation = self.resolve(invitation_id, user_id, InvitationStatus::Accepted)?;
        let notification = Notification::invite_accepted(&invitation);
        self.feed.push(notification.clone());
        self.persist();
        info!(invitation_id, user_id, project_id = %invitation.project_id, "invitation accepted");
        Ok((invitation, notification))
    }

    pub fn decline(&self, invitation_id: &str, user_id: &str) -> HubResult<Invitation> {
        let invitation = self.resolve(invitation_id, user_id, InvitationStatus::Declined)?;
        self.persist();
        info!(invitation_id, user_id, project_id = %invitation.project_id, "invitation declined");
        Ok(invitation)
    }

    /// Move a pending invitation addressed to `user_id` into `outcome`.
    fn resolve(
        &self,
        invitation_id: &str,
        user_id: &str,
        outcome: InvitationStatus,
    ) -> HubResult<Invitation> {
        let mut repo = self.repo.write();
        let invitation = repo
            .get_mut(invitation_id)
            .ok_or_else(|| HubError::NotFound(format!("invitation {invitation_id}")))?;
        if invitation.to_user_id != user_id {
            return Err(HubError::Forbidden(format!(
                "invitation {invitation_id} is not addressed to {user_id}"
            )));
        }
        if invitation.status != InvitationStatus::Pending {
            return Err(HubError::InvalidState(format!(
                "invitation {invitation_id} is already {}",
                invitation.status
            )));
        }
        let now = Utc::now();
        invitation.status = outcome;
        match outcome {
            InvitationStatus::Accepted => invitation.accepted_at = Some(now),
            InvitationStatus::Declined => invitation.declined_at = Some(now),
            InvitationStatus::Pending => {}
        }
        Ok(invitation.clone())
    }

    /// Pending invitations addressed to `user_id`, oldest first.
    pub fn pending_invitations(&self, user_id: &str) -> Vec<Invitation> {
        self.repo
            .read()
            .invitations
            .iter()
            .filter(|inv| inv.to_user_id == user_id && inv.status == InvitationStatus::Pending)
            .cloned()
            .collect()
    }

    pub fn list_shared_projects(&self, user_id: &str) -> Vec<SharedProjectView> {
        self.repo
            .read()
            .accepted()
            .filter(|inv| inv.to_user_id == user_id)
            .map(|inv| SharedProjectView {
                project_id: inv.project_id.clone(),
                project_title: inv.project_title.clone(),
                project_description: inv.project_description.clone(),
                shared_by: inv.from_user_name.clone(),
                shared_at: inv.accepted_at,
            })
            .collect()
    }

    /// Owner first, then everyone holding an accepted invitation. Ids that no
    /// longer resolve in the directory are skipped.
    pub async fn list_participants(&self, project_id: &str) -> Vec<Participant> {
        let (owner, members) = {
            let repo = self.repo.read();
            let owner = repo.owner(project_id).map(str::to_string);
            let mut members: Vec<String> = Vec::new();
            for inv in repo.accepted().filter(|inv| inv.project_id == project_id) {
                if Some(inv.to_user_id.as_str()) != owner.as_deref()
                    && !members.contains(&inv.to_user_id)
                {
                    members.push(inv.to_user_id.clone());
                }
            }
            (owner, members)
        };

        let mut participants = Vec::with_capacity(members.len() + 1);
        if let Some(owner_id) = owner {
            match self.directory.find_user(&owner_id).await {
                Some(user) => participants.push(Participant::from_profile(&user, ParticipantRole::Owner)),
                None => warn!(project_id, owner_id = %owner_id, "project owner not in directory"),
            }
        }
        for member in members {
            match self.directory.find_user(&member).await {
                Some(user) => {
                    participants.push(Participant::from_profile(&user, ParticipantRole::Collaborator))
                }
                None => warn!(project_id, user_id = %member, "participant not in directory"),
            }
        }
        participants
    }

    /// Drop every accepted invitation linking `user_id` to `project_id`.
    pub fn remove_participant(&self, project_id: &str, user_id: &str) -> HubResult<usize> {
        require("userId", user_id)?;
        let removed = {
            let mut repo = self.repo.write();
            let before = repo.invitations.len();
            repo.invitations.retain(|inv| {
                !(inv.project_id == project_id
                    && inv.to_user_id == user_id
                    && inv.status == InvitationStatus::Accepted)
            });
            before - repo.invitations.len()
        };
        if removed > 0 {
            self.persist();
        }
        info!(project_id, user_id, removed, "participant removed");
        Ok(removed)
    }

    /// Notification entry points that also write the state file.
    pub fn mark_notification_read(&self, id: &str) -> HubResult<Notification> {
        let notification = self.feed.mark_read(id)?;
        self.persist();
        Ok(notification)
    }

    pub fn mark_all_notifications_read(&self, user_id: &str) -> usize {
        let changed = self.feed.mark_all_read(user_id);
        if changed > 0 {
            self.persist();
        }
        changed
    }

    /// Best effort: the in-memory change is already committed.
    fn persist(&self) {
        let Some(path) = &self.state_file else {
            return;
        };
        let _guard = self.persist_lock.lock();
        let state = {
            let repo = self.repo.read();
            CollabState {
                invitations: repo.invitations.clone(),
                owners: repo.owners.clone(),
                notifications: self.feed.snapshot(),
            }
        };
        if let Err(e) = state.save(path) {
            warn!(path = %path.display(), error = %e, "failed to write collaboration state");
        }
    }
}

fn require(field: &str, value: &str) -> HubResult<()> {
    if value.trim().is_empty() {
        return Err(HubError::Validation(format!("{field} is required")));
    }
    Ok(())
}
