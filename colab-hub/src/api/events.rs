use super::AppState;
use axum::{
    extract::{Path, State},
    response::sse::{self, KeepAlive, Sse},
};
use futures::{Stream, StreamExt};
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};

/// Server-sent events addressed to `user_id`: tree saves, invitation changes
/// and notification reads. Clients refetch the affected view on each event.
pub(super) async fn event_stream(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Sse<impl Stream<Item = Result<sse::Event, Infallible>>> {
    debug!(user_id = %user_id, "event stream opened");
    let rx = state.events.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(move |res| {
        let user_id = user_id.clone();
        async move {
            match res {
                Ok(evt) if evt.recipient() == user_id => {
                    let data = serde_json::to_string(&evt).ok()?;
                    Some(Ok(sse::Event::default().data(data)))
                }
                Ok(_) => None,
                Err(e) => {
                    warn!(user_id = %user_id, error = %e, "event stream lagged");
                    None
                }
            }
        }
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}
