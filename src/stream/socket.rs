use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::{
        sse::{Event, KeepAlive, Sse},
        Response,
    },
};
use async_trait::async_trait;
use futures::stream::{SplitSink, StreamExt};
use futures::SinkExt;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};
use uuid::Uuid;

use super::publisher::{serve_viewer, Viewer};
use crate::error::ViewerError;
use crate::AppState;

// ─── WebSocket viewer ────────────────────────────────────────────

/// Write half of an upgraded socket.
pub struct WsViewer {
    sink: SplitSink<WebSocket, Message>,
}

#[async_trait]
impl Viewer for WsViewer {
    async fn send(&mut self, frame: &str) -> Result<(), ViewerError> {
        self.sink
            .send(Message::Text(frame.to_owned()))
            .await
            .map_err(|e| ViewerError::Transport(e.to_string()))
    }

    async fn close(&mut self) {
        let _ = self.sink.send(Message::Close(None)).await;
        let _ = self.sink.close().await;
    }
}

// ─── GET /ws ─────────────────────────────────────────────────────
/// Push stream: one text frame per finished round, nothing is read
/// from the client except its close.

pub async fn viewer_socket(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    // Subscribe before the upgrade so the viewer starts at the next round
    let frames = state.publisher.subscribe();
    let cancel = state.shutdown.child_token();

    ws.on_upgrade(move |socket| async move {
        let id = Uuid::new_v4();
        let (sink, mut incoming) = socket.split();

        let closed_by_peer = async {
            while let Some(msg) = incoming.next().await {
                match msg {
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        debug!(viewer = %id, error = %e, "viewer read error");
                        break;
                    }
                }
            }
        };

        tokio::select! {
            _ = serve_viewer(id, frames, WsViewer { sink }, cancel) => {}
            _ = closed_by_peer => debug!(viewer = %id, "viewer closed the socket"),
        }
    })
}

// ─── GET /api/stream ─────────────────────────────────────────────
/// Server-Sent Events variant of the same stream, for `EventSource`.
/// A lagging client skips frames; a disconnected one is dropped by axum.

pub async fn sample_stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let frames = BroadcastStream::new(state.publisher.subscribe());
    let cancel = state.shutdown.child_token();

    let stream = frames
        .filter_map(|frame| async move {
            match frame {
                Ok(frame) => Some(Ok::<_, Infallible>(Event::default().data(&*frame))),
                Err(e) => {
                    warn!(error = %e, "sse viewer lagging");
                    None
                }
            }
        })
        // End the response on shutdown so graceful shutdown can finish
        .take_until(async move { cancel.cancelled().await });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
