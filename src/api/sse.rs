//! Server-Sent Events support

use crate::render::SessionView;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tokio_stream::StreamExt;

/// Stream every published view, starting with the current one
pub fn sse_stream(
    view_rx: watch::Receiver<SessionView>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // WatchStream yields the current value first, then each change
    let views = WatchStream::new(view_rx).map(|view| Ok(view_event(&view)));

    Sse::new(views).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn view_event(view: &SessionView) -> Event {
    match Event::default().event("view").json_data(view) {
        Ok(event) => event,
        Err(e) => {
            tracing::error!(session_id = %view.session_id, error = %e, "Failed to encode view");
            Event::default().event("error").data(e.to_string())
        }
    }
}
