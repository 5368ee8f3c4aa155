use crate::events::Event;
use crate::AppState;
use axum::{
    extract::State,
    response::sse::{Event as SseEvent, KeepAlive, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::debug;

/// Stream placement, reservation and inventory events to the client.
pub(crate) async fn sse_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = state.event_hub.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result: Result<Event, _>| match result {
        Ok(event) => match serde_json::to_string(&event) {
            Ok(json) => Some(Ok(SseEvent::default().event(event.event_type()).data(json))),
            Err(e) => {
                debug!("Dropping unserializable event: {e}");
                None
            }
        },
        // Lagged subscriber: skip what was missed and keep streaming.
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
