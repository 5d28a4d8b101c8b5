use crate::http::AppState;
use crate::room::RoomCommand;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use onair_core::{ConnectionId, SignalMessage};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let conn = ConnectionId::new();
    info!("New WebSocket connection: {}", conn);

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let signaling = state.signaling.clone();
    signaling.add_connection(conn, tx);
    signaling.send_signal(
        &conn,
        SignalMessage::Welcome {
            connection_id: conn,
            ice_servers: signaling.get_ice_servers(),
        },
    );

    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    let recv_task = tokio::spawn({
        let state = state.clone();

        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => handle_frame(&state, conn, text.as_str()).await,
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    });

    finish_connection(&state, conn, send_task, recv_task).await;
    info!("WebSocket disconnected: {}", conn);
}

/// Waits for either half of the socket to end and stops the other one. The
/// connection leaves its rooms only after both tasks are gone, so a command
/// still in flight cannot add a membership behind the cleanup.
pub async fn finish_connection(
    state: &AppState,
    conn: ConnectionId,
    mut send_task: JoinHandle<()>,
    mut recv_task: JoinHandle<()>,
) {
    let send_ended = tokio::select! {
        _ = (&mut send_task) => true,
        _ = (&mut recv_task) => false,
    };

    if send_ended {
        recv_task.abort();
        let _ = recv_task.await;
    } else {
        send_task.abort();
        let _ = send_task.await;
    }

    if let Err(e) = state.coordinator.dispatch(conn, RoomCommand::Disconnect).await {
        warn!("Cleanup for {} failed: {}", conn, e);
    }
    state.signaling.remove_connection(&conn);
}

/// Handles one text frame from `conn`.
///
/// Malformed or unexpected frames are logged and dropped; failed commands
/// are answered with an `error` frame. The connection stays open either way.
pub async fn handle_frame(state: &AppState, conn: ConnectionId, text: &str) {
    let signal = match serde_json::from_str::<SignalMessage>(text) {
        Ok(signal) => signal,
        Err(e) => {
            warn!("Invalid SignalMessage from {}: {}", conn, e);
            return;
        }
    };

    let command = match RoomCommand::try_from(signal) {
        Ok(command) => command,
        Err(frame) => {
            warn!("Ignoring server-only frame from {}: {:?}", conn, frame);
            return;
        }
    };

    debug!("{} -> {:?}", conn, command);
    if let Err(e) = state.coordinator.dispatch(conn, command).await {
        debug!("Command from {} failed: {}", conn, e);
        state.signaling.send_signal(&conn, e.to_signal());
    }
}
