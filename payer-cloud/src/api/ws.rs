//! Realtime WebSocket endpoint
//!
//! GET /api/ws
//!
//! Protocol (JSON text frames `{event, data}`):
//! - Client → Server: ClientCommand (join/leave merchant or order rooms)
//! - Server → Client: ServerEvent (joined, newOrder, orderStatusUpdate, qrCodeUpdate, error)

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use shared::realtime::{ClientCommand, ServerEvent};
use tokio::time::Duration;

use crate::live::{ConnId, RoomBroker};
use crate::state::AppState;

const PING_INTERVAL: Duration = Duration::from_secs(30);

/// GET /api/ws
pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| ws_session(socket, state))
}

async fn ws_session(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();
    let broker = state.broker.clone();
    let (conn, mut events) = broker.connect();

    tracing::info!(conn_id = %conn, "WS connected");

    let mut ping_interval = tokio::time::interval(PING_INTERVAL);
    ping_interval.tick().await; // skip immediate

    loop {
        tokio::select! {
            _ = ping_interval.tick() => {
                if sink.send(Message::Ping(vec![].into())).await.is_err() {
                    break;
                }
            }

            event = events.recv() => {
                let Some(event) = event else { break };
                if send_event(&mut sink, &event).await.is_err() {
                    break;
                }
            }

            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) = handle_command(broker.as_ref(), conn, text.as_str()).await
                            && send_event(&mut sink, &reply).await.is_err()
                        {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }

    broker.disconnect(conn).await;
    tracing::info!(conn_id = %conn, "WS disconnected");
}

/// Apply one client frame; the returned event is sent back to that client only
async fn handle_command(broker: &dyn RoomBroker, conn: ConnId, text: &str) -> Option<ServerEvent> {
    let cmd = match serde_json::from_str::<ClientCommand>(text) {
        Ok(cmd) => cmd,
        Err(e) => {
            tracing::debug!(conn_id = %conn, "Unrecognised WS frame: {e}");
            return Some(ServerEvent::Error {
                message: format!("Unrecognised command: {e}"),
            });
        }
    };

    match cmd.room() {
        (room, true) => broker.join(conn, room).await.then(|| ServerEvent::Joined {
            room: room.to_string(),
        }),
        (room, false) => {
            broker.leave(conn, room).await;
            None
        }
    }
}

async fn send_event<S>(sink: &mut S, event: &ServerEvent) -> Result<(), ()>
where
    S: futures::Sink<Message, Error = axum::Error> + Unpin,
{
    let json = serde_json::to_string(event).map_err(|_| ())?;
    sink.send(Message::Text(json.into())).await.map_err(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live::LocalRoomBroker;
    use shared::realtime::RoomKey;

    #[tokio::test]
    async fn join_is_acknowledged_with_room_name() {
        let broker = LocalRoomBroker::new();
        let (conn, _rx) = broker.connect();

        let reply = handle_command(
            &broker,
            conn,
            r#"{"event":"joinMerchantRoom","data":{"merchantId":1}}"#,
        )
        .await;
        assert_eq!(
            reply,
            Some(ServerEvent::Joined {
                room: "merchant:1".into()
            })
        );
        assert_eq!(broker.room_size(RoomKey::Merchant(1)), 1);
    }

    #[tokio::test]
    async fn leave_is_silent() {
        let broker = LocalRoomBroker::new();
        let (conn, _rx) = broker.connect();
        handle_command(&broker, conn, r#"{"event":"joinOrderRoom","data":{"orderId":9}}"#).await;

        let reply =
            handle_command(&broker, conn, r#"{"event":"leaveOrderRoom","data":{"orderId":9}}"#)
                .await;
        assert!(reply.is_none());
        assert_eq!(broker.room_size(RoomKey::Order(9)), 0);
    }

    #[tokio::test]
    async fn bad_frame_gets_error_event() {
        let broker = LocalRoomBroker::new();
        let (conn, _rx) = broker.connect();

        let reply = handle_command(&broker, conn, "not json").await;
        assert!(matches!(reply, Some(ServerEvent::Error { .. })));
    }

    #[tokio::test]
    async fn unknown_connection_is_not_joined() {
        let broker = LocalRoomBroker::new();
        let reply = handle_command(
            &broker,
            uuid::Uuid::new_v4(),
            r#"{"event":"joinOrderRoom","data":{"orderId":1}}"#,
        )
        .await;
        assert!(reply.is_none());
    }
}
