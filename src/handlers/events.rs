use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, Sse};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::{BroadcastStream, IntervalStream};
use tokio_stream::StreamExt;

use crate::state::AppState;

// GET /api/dev/events (SSE: host commands and theme changes)
pub async fn events_stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let commands = BroadcastStream::new(state.relay.subscribe()).filter_map(|result| match result {
        Ok(command) => {
            let data = serde_json::to_string(&command).unwrap_or_default();
            Some(Ok::<_, Infallible>(Event::default().data(data).event("host_command")))
        }
        Err(BroadcastStreamRecvError::Lagged(_)) => None,
    });

    let themes = BroadcastStream::new(state.theme_bus.subscribe()).filter_map(|result| match result {
        Ok(change) => {
            let data = serde_json::to_string(&change).unwrap_or_default();
            Some(Ok::<_, Infallible>(Event::default().data(data).event("theme_change")))
        }
        Err(BroadcastStreamRecvError::Lagged(_)) => None,
    });

    let keepalive = IntervalStream::new(tokio::time::interval(Duration::from_secs(30)))
        .map(|_| Ok::<_, Infallible>(Event::default().comment("keepalive")));

    Sse::new(commands.merge(themes).merge(keepalive))
}
