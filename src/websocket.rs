use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};
use warp::ws::{Message, WebSocket};

/// Pushes `initial` and then every broadcast snapshot to the socket until
/// either side goes away.
pub async fn forward_snapshots(
    ws: WebSocket,
    mut rx: broadcast::Receiver<String>,
    initial: String,
) {
    debug!("New WebSocket connection established");
    let (mut ws_tx, mut ws_rx) = ws.split();

    // Drain incoming frames so a close is noticed.
    let mut receive_task = tokio::spawn(async move {
        while let Some(result) = ws_rx.next().await {
            match result {
                Ok(msg) => {
                    if msg.is_close() {
                        debug!("WebSocket connection closed by client");
                        break;
                    }
                }
                Err(e) => {
                    warn!("WebSocket receive error: {}", e);
                    break;
                }
            }
        }
    });

    let mut forward_task = tokio::spawn(async move {
        if let Err(e) = ws_tx.send(Message::text(initial)).await {
            warn!("WebSocket send error: {}", e);
            return;
        }
        loop {
            let snapshot = match rx.recv().await {
                Ok(snapshot) => snapshot,
                // A slow page only needs the latest state.
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "WebSocket client lagging");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };
            if let Err(e) = ws_tx.send(Message::text(snapshot)).await {
                warn!("WebSocket send error: {}", e);
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut receive_task => forward_task.abort(),
        _ = &mut forward_task => receive_task.abort(),
    }
}
