//! Live log stream over WebSocket.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, Instant};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tokio::time::interval;
use tracing::{debug, info, warn};

use reel_models::WsMessage;

use crate::state::AppState;

static ACTIVE_WS_CONNECTIONS: AtomicI64 = AtomicI64::new(0);

const WS_SEND_BUFFER_SIZE: usize = 64;
const WS_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Number of log stream clients currently connected.
pub fn active_connections() -> i64 {
    ACTIVE_WS_CONNECTIONS.load(Ordering::SeqCst)
}

/// Send a message through the bounded outbound queue.
async fn send_ws_message(tx: &mpsc::Sender<Message>, msg: &WsMessage) -> bool {
    let json = match serde_json::to_string(msg) {
        Ok(j) => j,
        Err(_) => return false,
    };
    match tx.try_send(Message::Text(json)) {
        Ok(_) => true,
        Err(mpsc::error::TrySendError::Full(message)) => {
            debug!("WebSocket send buffer full, applying backpressure");
            tx.send(message).await.is_ok()
        }
        Err(mpsc::error::TrySendError::Closed(_)) => false,
    }
}

/// Subscribe to every log line, render state change and completion event.
pub async fn ws_logs(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ACTIVE_WS_CONNECTIONS.fetch_add(1, Ordering::SeqCst);
    ws.on_upgrade(|socket| async move {
        handle_log_socket(socket, state).await;
        ACTIVE_WS_CONNECTIONS.fetch_sub(1, Ordering::SeqCst);
    })
}

async fn handle_log_socket(socket: WebSocket, state: AppState) {
    let (ws_sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<Message>(WS_SEND_BUFFER_SIZE);

    let send_task = tokio::spawn(async move {
        let mut ws_sender = ws_sender;
        while let Some(msg) = rx.recv().await {
            if ws_sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    // Subscribe before greeting so nothing published in between is missed.
    let mut events = state.log.subscribe();
    info!(clients = active_connections(), "Log stream client connected");
    if !send_ws_message(&tx, &WsMessage::log("connected to log stream")).await {
        send_task.abort();
        return;
    }

    let mut heartbeat = interval(WS_HEARTBEAT_INTERVAL);
    let mut last_activity = Instant::now();

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Ok(message) => {
                        last_activity = Instant::now();
                        if !send_ws_message(&tx, &message).await {
                            warn!("WebSocket send failed, client disconnected");
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Log stream client lagging, dropped messages");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            _ = heartbeat.tick() => {
                if last_activity.elapsed() > WS_HEARTBEAT_INTERVAL / 2
                    && tx.send(Message::Ping(vec![])).await.is_err()
                {
                    warn!("Heartbeat failed, client disconnected");
                    break;
                }
            }
            client_msg = receiver.next() => {
                match client_msg {
                    Some(Ok(Message::Pong(_))) => last_activity = Instant::now(),
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => {
                        info!("Log stream client closed connection");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    drop(tx);
    let _ = send_task.await;
}
