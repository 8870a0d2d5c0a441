//! Websocket dashboard.
//!
//! Browsers connect to `/ws`, receive rating and info notices as
//! `{"command": .., "data": ..}` objects and send commands in the same shape.
use std::net::SocketAddr;

use anyhow::Context;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State as AxumState;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use kibitz_client::{ControlEvent, Notice, Query, RunnerHandle};
use serde::Deserialize;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// A message from a dashboard client.
#[derive(Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Request {
    Query(Query),
    Control(ControlEvent),
}

pub fn router(handle: RunnerHandle) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/healthz", get(healthz))
        .with_state(handle)
}

pub async fn serve(port: u16, handle: RunnerHandle) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Could not bind dashboard to {addr}"))?;
    info!(%addr, "dashboard listening");
    axum::serve(listener, router(handle)).await?;
    Ok(())
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    AxumState(handle): AxumState<RunnerHandle>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, handle))
}

async fn healthz() -> &'static str {
    "ok"
}

async fn handle_socket(socket: WebSocket, handle: RunnerHandle) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Notice>();
    let notices = handle.subscribe();

    let write_task = tokio::spawn(async move {
        while let Some(notice) = rx.recv().await {
            let Ok(text) = serde_json::to_string(&notice) else {
                continue;
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let broadcast_task = {
        let tx = tx.clone();
        tokio::spawn(forward_notices(notices, tx))
    };

    while let Some(Ok(message)) = receiver.next().await {
        match message {
            Message::Text(text) => match serde_json::from_str::<Request>(&text) {
                Ok(request) => {
                    if !handle_request(request, &handle, &tx).await {
                        break;
                    }
                }
                Err(err) => warn!(?err, "invalid dashboard message"),
            },
            Message::Close(_) => break,
            _ => {}
        }
    }
    debug!("dashboard client disconnected");

    write_task.abort();
    broadcast_task.abort();
}

async fn forward_notices(
    mut notices: broadcast::Receiver<Notice>,
    tx: mpsc::UnboundedSender<Notice>,
) {
    loop {
        match notices.recv().await {
            Ok(notice) => {
                if tx.send(notice).is_err() {
                    break;
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "dashboard client lagged, dropped notices");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

/// Returns false once the bot has stopped.
async fn handle_request(
    request: Request,
    handle: &RunnerHandle,
    tx: &mpsc::UnboundedSender<Notice>,
) -> bool {
    match request {
        Request::Query(query) => match handle.query(query).await {
            Some(notice) => {
                let _ = tx.send(notice);
                true
            }
            None => false,
        },
        Request::Control(event) => {
            debug!(?event, "dashboard control");
            handle.send(event).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_requests() {
        let parse = |text: &str| serde_json::from_str::<Request>(text).ok();
        assert_eq!(
            parse(r#"{"command":"init_rating"}"#),
            Some(Request::Query(Query::RatingHistory))
        );
        assert_eq!(
            parse(r#"{"command":"info","data":null}"#),
            Some(Request::Query(Query::Info))
        );
        assert_eq!(
            parse(r#"{"command":"auto_start","data":true}"#),
            Some(Request::Control(ControlEvent::AutoStart(true)))
        );
        assert_eq!(
            parse(r#"{"command":"depth","data":8}"#),
            Some(Request::Control(ControlEvent::EngineDepth(8)))
        );
        assert_eq!(
            parse(r#"{"command":"kick_if_lose","data":false}"#),
            Some(Request::Control(ControlEvent::KickIfLose(false)))
        );
        assert_eq!(parse(r#"{"command":"depth","data":"deep"}"#), None);
        assert_eq!(parse(r#"{"data":1}"#), None);
    }

    #[tokio::test]
    async fn test_forwarding_survives_lag() {
        let (notices_tx, notices) = broadcast::channel(1);
        let (tx, mut rx) = mpsc::unbounded_channel();
        notices_tx.send(Notice::RatingAdded(vec![1500])).unwrap();
        notices_tx.send(Notice::RatingAdded(vec![1510])).unwrap();
        let task = tokio::spawn(forward_notices(notices, tx));

        assert_eq!(rx.recv().await, Some(Notice::RatingAdded(vec![1510])));
        notices_tx.send(Notice::RatingAdded(vec![1520])).unwrap();
        assert_eq!(rx.recv().await, Some(Notice::RatingAdded(vec![1520])));

        drop(notices_tx);
        task.await.unwrap();
        assert_eq!(rx.recv().await, None);
    }
}
