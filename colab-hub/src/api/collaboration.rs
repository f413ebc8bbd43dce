use super::{ApiJson, ApiResult, AppState};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use colab_hub_core::collaboration::InviteRequest;
use colab_hub_core::events::HubEvent;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct UserBody {
    #[serde(default)]
    user_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct OwnerBody {
    #[serde(default)]
    owner_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct NotificationParams {
    #[serde(default)]
    unread_only: bool,
}

pub(super) async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let user = state.collab.find_user(&user_id).await?;
    Ok(Json(json!({
        "success": true,
        "user": {
            "id": user.id,
            "username": user.username,
            "fullName": user.display_name(),
            "initials": user.initials(),
        },
    })))
}

pub(super) async fn invite(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<InviteRequest>,
) -> ApiResult<Json<Value>> {
    info!(project_id = %req.project_id, from = %req.from_user_id, to = %req.to_user_id, "sending invitation");
    let (invitation, notification) = state.collab.invite(req).await?;
    state.events.send(HubEvent::InvitationCreated {
        id: invitation.id.clone(),
        to_user_id: invitation.to_user_id.clone(),
    });
    Ok(Json(json!({
        "success": true,
        "invitation": invitation,
        "notification": notification,
    })))
}

pub(super) async fn accept(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<UserBody>,
) -> ApiResult<Json<Value>> {
    let (invitation, notification) = state.collab.accept(&id, &body.user_id)?;
    state.events.send(HubEvent::InvitationAccepted {
        id: invitation.id.clone(),
        from_user_id: invitation.from_user_id.clone(),
    });
    Ok(Json(json!({
        "success": true,
        "invitation": invitation,
        "notification": notification,
    })))
}

pub(super) async fn decline(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<UserBody>,
) -> ApiResult<Json<Value>> {
    let invitation = state.collab.decline(&id, &body.user_id)?;
    state.events.send(HubEvent::InvitationDeclined {
        id: invitation.id.clone(),
        from_user_id: invitation.from_user_id.clone(),
    });
    Ok(Json(json!({ "success": true, "invitation": invitation })))
}

pub(super) async fn pending_invitations(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Json<Value> {
    let invitations = state.collab.pending_invitations(&user_id);
    Json(json!({ "success": true, "invitations": invitations }))
}

pub(super) async fn shared_projects(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Json<Value> {
    let shared = state.collab.list_shared_projects(&user_id);
    Json(json!({ "success": true, "sharedProjects": shared }))
}

pub(super) async fn participants(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Json<Value> {
    let participants = state.collab.list_participants(&project_id).await;
    Json(json!({ "success": true, "participants": participants }))
}

pub(super) async fn register_owner(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    ApiJson(body): ApiJson<OwnerBody>,
) -> ApiResult<Json<Value>> {
    state.collab.register_project(&project_id, &body.owner_id)?;
    Ok(Json(json!({ "success": true, "projectId": project_id, "ownerId": body.owner_id })))
}

pub(super) async fn remove_user(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    ApiJson(body): ApiJson<UserBody>,
) -> ApiResult<Json<Value>> {
    let removed = state.collab.remove_participant(&project_id, &body.user_id)?;
    state.events.send(HubEvent::ParticipantRemoved {
        project_id,
        user_id: body.user_id,
    });
    Ok(Json(json!({
        "success": true,
        "message": "User removed from project",
        "removedCount": removed,
    })))
}

pub(super) async fn notifications(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<NotificationParams>,
) -> Json<Value> {
    let feed = state.collab.feed();
    let notifications = feed.list_for_user(&user_id, params.unread_only);
    Json(json!({
        "success": true,
        "notifications": notifications,
        "unreadCount": feed.unread_count(&user_id),
    }))
}

pub(super) async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let notification = state.collab.mark_notification_read(&id)?;
    state.events.send(HubEvent::NotificationRead {
        id,
        user_id: notification.user_id.clone(),
    });
    Ok(Json(json!({ "success": true, "notification": notification })))
}

pub(super) async fn mark_all_read(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Json<Value> {
    let updated = state.collab.mark_all_notifications_read(&user_id);
    if updated > 0 {
        state.events.send(HubEvent::AllNotificationsRead {
            user_id: user_id.clone(),
            updated,
        });
    }
    Json(json!({ "success": true, "updated": updated }))
}
