//! WebSocket Notice Stream
//!
//! Streams settlement notices to a connected participant in real time.
//! Each connection names the participant it speaks for; it receives
//! notices addressed to that participant directly and notices broadcast
//! to whatever zone the participant currently occupies.

use super::handlers::AppState;
use crate::directory::Directory;
use crate::notice::{Audience, Notice};
use crate::types::ParticipantId;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// GET /ws query parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct NoticeStreamQuery {
    pub participant: String,
}

/// Handle WebSocket upgrade for the notice stream.
pub async fn notice_stream_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<NoticeStreamQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let participant = ParticipantId::from(query.participant);
    let rx = state.engine.subscribe_notices();
    let directory = state.directory.clone();
    ws.on_upgrade(move |socket| stream_notices(socket, participant, rx, directory))
}

async fn stream_notices(
    socket: WebSocket,
    participant: ParticipantId,
    mut rx: broadcast::Receiver<Notice>,
    directory: Arc<crate::directory::InMemoryDirectory>,
) {
    info!("notice stream opened for {}", participant);
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            inbound = receiver.next() => match inbound {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("notice stream error for {}: {}", participant, e);
                    break;
                }
            },
            outbound = rx.recv() => match outbound {
                Ok(notice) => {
                    if !delivers_to(&notice, &participant, directory.as_ref()) {
                        continue;
                    }
                    let message = match serde_json::to_string(&notice) {
                        Ok(text) => Message::Text(text),
                        Err(e) => {
                            error!("failed to serialize notice: {}", e);
                            continue;
                        }
                    };
                    if sender.send(message).await.is_err() {
                        debug!("notice stream client {} went away", participant);
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("notice stream for {} lagged, {} notices skipped", participant, skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    info!("notice stream closed for {}", participant);
}

/// Whether a notice reaches this participant: addressed directly, or
/// broadcast to the zone they are currently in.
fn delivers_to(notice: &Notice, participant: &ParticipantId, directory: &dyn Directory) -> bool {
    match &notice.audience {
        Audience::Participant { id } => id == participant,
        Audience::Zone { zone } => directory.presence(participant).zone() == Some(zone),
    }
}
