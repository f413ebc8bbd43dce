//! HTTP API layer exposing the file-tree and collaboration endpoints.

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use colab_hub_core::collaboration::CollaborationEngine;
use colab_hub_core::events::EventBus;
use colab_hub_core::gateway::TreeGateway;
use colab_hub_core::HubError;
use serde_json::json;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

mod collaboration;
mod events;
mod filesystem;

pub use filesystem::PathCommand;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub trees: Arc<dyn TreeGateway>,
    pub collab: Arc<CollaborationEngine>,
    pub events: EventBus,
}

impl AppState {
    pub fn new(trees: Arc<dyn TreeGateway>, collab: Arc<CollaborationEngine>) -> Self {
        Self {
            trees,
            collab,
            events: EventBus::new(),
        }
    }
}

/// Error body: `{"success": false, "error": ..., "code": ...}`.
#[derive(Debug)]
pub struct ApiError(pub HubError);

impl From<HubError> for ApiError {
    fn from(err: HubError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            HubError::Validation(_) => StatusCode::BAD_REQUEST,
            HubError::NotFound(_) | HubError::UserNotFound(_) => StatusCode::NOT_FOUND,
            HubError::Forbidden(_) => StatusCode::FORBIDDEN,
            HubError::InvalidState(_)
            | HubError::Cycle(_)
            | HubError::DuplicateInvite(_)
            | HubError::Conflict(_) => StatusCode::CONFLICT,
            HubError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        } else {
            tracing::debug!(error = %self.0, "request rejected");
        }
        let body = Json(json!({
            "success": false,
            "error": self.0.to_string(),
            "code": self.0.code(),
        }));
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(HubError::Validation(rejection.body_text()))
    }
}

/// `Json` extractor whose rejections use the standard error body.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/filesystem/{user_id}",
            get(filesystem::load_tree).post(filesystem::save_tree),
        )
        .route(
            "/filesystem/{user_id}/commands",
            post(filesystem::apply_command),
        )
        .route("/collaboration/user/{user_id}", get(collaboration::get_user))
        .route("/collaboration/invite", post(collaboration::invite))
        .route(
            "/collaboration/invite/{id}/accept",
            post(collaboration::accept),
        )
        .route(
            "/collaboration/invite/{id}/decline",
            post(collaboration::decline),
        )
        .route(
            "/collaboration/invitations/{user_id}",
            get(collaboration::pending_invitations),
        )
        .route(
            "/collaboration/projects/{user_id}",
            get(collaboration::shared_projects),
        )
        .route(
            "/collaboration/project/{project_id}/participants",
            get(collaboration::participants),
        )
        .route(
            "/collaboration/project/{project_id}/owner",
            post(collaboration::register_owner),
        )
        .route(
            "/collaboration/project/{project_id}/remove-user",
            post(collaboration::remove_user),
        )
        .route(
            "/collaboration/notifications/{id}",
            get(collaboration::notifications),
        )
        .route(
            "/collaboration/notifications/{id}/read",
            post(collaboration::mark_read),
        )
        .route(
            "/collaboration/notifications/{id}/read-all",
            post(collaboration::mark_all_read),
        )
        .route("/events/{user_id}", get(events::event_stream))
        .route("/health", get(|| async { "OK" }))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
