//! WebSocket upgrade handler

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::MatchCommand;
use crate::matchmaking::Seat;
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let conn_id = Uuid::new_v4();
    info!(%conn_id, "New WebSocket connection");

    let (ws_sink, mut ws_stream) = socket.split();
    let (outbox, outbox_rx) = mpsc::unbounded_channel::<Arc<str>>();

    // Writer task: pre-serialized frames -> WebSocket
    let writer_handle = tokio::spawn(write_frames(conn_id, ws_sink, outbox_rx));

    let rate_limiter = ConnectionRateLimiter::new();
    let mut seat: Option<Seat> = None;

    // Reader loop: WebSocket -> match actor
    while let Some(result) = ws_stream.next().await {
        let text = match result {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => {
                debug!(%conn_id, "Client initiated close");
                break;
            }
            Ok(Message::Binary(_)) => {
                debug!(%conn_id, "Ignoring binary frame");
                continue;
            }
            Ok(_) => continue,
            Err(e) => {
                debug!(%conn_id, error = %e, "WebSocket error");
                break;
            }
        };

        if !rate_limiter.check_input() {
            warn!(%conn_id, "Rate limited input message");
            continue;
        }

        let msg = match serde_json::from_str::<ClientMsg>(&text) {
            Ok(msg) => msg,
            Err(e) => {
                debug!(%conn_id, error = %e, "Dropping malformed client message");
                continue;
            }
        };

        if let ClientMsg::Join { name, external_id } = msg {
            if seat.is_some() {
                debug!(%conn_id, "Ignoring repeated join");
                continue;
            }
            seat = state
                .matchmaking
                .join(conn_id, &name, external_id.as_deref(), outbox.clone())
                .await;
            if seat.is_none() {
                send_error(&outbox, "join_failed", "No match available");
            }
            continue;
        }

        let (Some(seat), Some(command)) = (&seat, to_command(conn_id, msg)) else {
            debug!(%conn_id, "Ignoring action before join");
            continue;
        };
        if !seat.handle.send(command) {
            debug!(%conn_id, match_id = %seat.handle.id, "Match is gone");
        }
    }

    if let Some(seat) = seat {
        seat.handle.send(MatchCommand::Leave { conn_id });
    }
    drop(outbox);
    writer_handle.abort();

    info!(%conn_id, "WebSocket connection closed");
}

/// In-match actions; joins are routed through matchmaking instead
fn to_command(conn_id: Uuid, msg: ClientMsg) -> Option<MatchCommand> {
    let command = match msg {
        ClientMsg::Join { .. } => return None,
        ClientMsg::Ready => MatchCommand::Ready { conn_id },
        ClientMsg::Waypoint { x, y } => MatchCommand::Waypoint { conn_id, x, y },
        ClientMsg::FireTorpedo => MatchCommand::FireTorpedo { conn_id },
        ClientMsg::LayMine => MatchCommand::LayMine { conn_id },
    };
    Some(command)
}

fn send_error(outbox: &mpsc::UnboundedSender<Arc<str>>, code: &str, message: &str) {
    let msg = ServerMsg::Error {
        code: code.to_string(),
        message: message.to_string(),
    };
    if let Ok(json) = serde_json::to_string(&msg) {
        let _ = outbox.send(Arc::from(json));
    }
}

/// Forward frames until the socket fails or every sender is gone
async fn write_frames(
    conn_id: Uuid,
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut frames: mpsc::UnboundedReceiver<Arc<str>>,
) {
    while let Some(frame) = frames.recv().await {
        if let Err(e) = ws_sink.send(Message::Text(frame.to_string())).await {
            debug!(%conn_id, error = %e, "WebSocket send failed");
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_map_onto_match_commands() {
        let conn_id = Uuid::new_v4();
        assert!(matches!(
            to_command(conn_id, ClientMsg::Waypoint { x: 1.0, y: 2.0 }),
            Some(MatchCommand::Waypoint { x, y, .. }) if x == 1.0 && y == 2.0
        ));
        assert!(matches!(to_command(conn_id, ClientMsg::Ready), Some(MatchCommand::Ready { .. })));
        assert!(matches!(to_command(conn_id, ClientMsg::FireTorpedo), Some(MatchCommand::FireTorpedo { .. })));
        assert!(matches!(to_command(conn_id, ClientMsg::LayMine), Some(MatchCommand::LayMine { .. })));
        assert!(to_command(
            conn_id,
            ClientMsg::Join {
                name: "Ahab".into(),
                external_id: None
            }
        )
        .is_none());
    }

    #[test]
    fn errors_are_framed_as_json() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        send_error(&tx, "join_failed", "No match available");
        let frame = rx.try_recv().unwrap();
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["type"], "error");
        assert_eq!(value["code"], "join_failed");
    }
}
