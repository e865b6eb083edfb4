//! `GET /ops/events`: a server-sent-events stream of [`NanoClawEvent`]s
//! off the same bus the router, scheduler, governance loop, and health
//! checker publish to (spec.md §4.F, §6).

use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;

use crate::state::AppState;

/// Stream every [`NanoClawEvent`](nanoclaw_core::NanoClawEvent) published
/// after subscription as a JSON-encoded SSE data frame. Events already
/// published before the subscriber connected are not replayed; the bus
/// only fans out live broadcasts.
pub async fn events_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.events.subscribe();
    let stream = futures::stream::unfold(receiver, |mut receiver| async move {
        let event = receiver.recv().await?;
        let payload = serde_json::to_string(&event).unwrap_or_else(|_| "null".to_string());
        Some((Ok(Event::default().data(payload)), receiver))
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}
