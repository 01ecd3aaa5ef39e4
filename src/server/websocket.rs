/// WebSocket handler pushing fresh render contexts on a timer

use axum::{
    extract::ws::{Message, WebSocket},
    extract::{State, WebSocketUpgrade},
    response::Response,
};
use futures::{sink::SinkExt, stream::StreamExt};
use std::sync::Arc;
use tokio::time::interval;

use crate::app::AppContext;

pub async fn ws_dashboard_handler(
    State(ctx): State<Arc<AppContext>>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_dashboard_websocket(socket, ctx))
}

async fn handle_dashboard_websocket(socket: WebSocket, ctx: Arc<AppContext>) {
    let (mut sender, mut receiver) = socket.split();

    let mut interval = interval(ctx.config().refresh);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let context = ctx.render().await;

                match serde_json::to_string(&context) {
                    Ok(json) => {
                        if sender.send(Message::Text(json)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::error!("failed to serialize render context: {}", e),
                }
            }

            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    tracing::debug!("dashboard websocket closed");
}
