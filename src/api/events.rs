//! Domain event stream for the notification subsystem

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use std::convert::Infallible;
use tokio_stream::{
    wrappers::{errors::BroadcastStreamRecvError, BroadcastStream},
    Stream, StreamExt,
};

use crate::{error::AppResult, AppState};

use super::AuthenticatedUser;

/// Server-sent stream of booking and completion events
#[utoipa::path(
    get,
    path = "/events",
    tag = "events",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Event stream, one JSON document per event", content_type = "text/event-stream"),
        (status = 403, description = "Administrator rights required")
    )
)]
pub async fn stream_events(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    claims.require_admin()?;

    let stream = BroadcastStream::new(state.services.events.subscribe()).filter_map(|message| match message {
        Ok(event) => Event::default()
            .event(event.kind.name())
            .id(event.id.to_string())
            .json_data(&event)
            .ok()
            .map(Ok),
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::warn!(skipped, "Event subscriber lagged behind");
            None
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
