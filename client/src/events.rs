use std::future::Future;

use crate::{Error, Result};
use futures_util::{
    stream::{SplitSink, SplitStream},
    SinkExt, Stream as FutStream, StreamExt,
};
use kibitz_types::Payload;
use tokio::{net::TcpStream, sync::mpsc};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        client::IntoClientRequest,
        http::{header, HeaderValue},
        Message,
    },
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, error, info, trace, warn};
use url::Url;

pub(crate) const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

const LOBBY_COOKIE: &str = "kt=cckn";

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Stream of payloads from the WebSocket connection
pub struct Stream {
    receiver: mpsc::Receiver<Result<Payload>>,
    _handle: Option<tokio::task::JoinHandle<()>>,
}

impl Drop for Stream {
    fn drop(&mut self) {
        if let Some(handle) = &self._handle {
            handle.abort();
        }
    }
}

impl Stream {
    fn capacity_or_default(capacity: usize) -> usize {
        if capacity == 0 {
            DEFAULT_CHANNEL_CAPACITY
        } else {
            capacity
        }
    }

    fn spawn_reader<S>(ws: S, tx: mpsc::Sender<Result<Payload>>) -> tokio::task::JoinHandle<()>
    where
        S: FutStream<Item = std::result::Result<Message, tokio_tungstenite::tungstenite::Error>>
            + Unpin
            + Send
            + 'static,
    {
        tokio::spawn(async move {
            let mut ws = ws;
            while let Some(msg) = ws.next().await {
                let decoded = match msg {
                    Ok(Message::Text(text)) => decode(text.as_bytes()),
                    Ok(Message::Binary(data)) => decode(&data),
                    Ok(Message::Close(frame)) => {
                        debug!(?frame, "WebSocket closed");
                        let _ = tx.send(Err(Error::ConnectionClosed)).await;
                        break;
                    }
                    Ok(_) => continue, // Ignore ping/pong frames
                    Err(e) => {
                        error!("WebSocket error: {}", e);
                        let _ = tx.send(Err(e.into())).await;
                        break;
                    }
                };
                let Some(decoded) = decoded else {
                    continue;
                };
                let failed = decoded.is_err();
                if tx.send(decoded).await.is_err() {
                    break; // Receiver dropped
                }
                if failed {
                    break;
                }
            }
        })
    }

    pub(crate) fn new<S>(ws: S, capacity: usize) -> Self
    where
        S: FutStream<Item = std::result::Result<Message, tokio_tungstenite::tungstenite::Error>>
            + Unpin
            + Send
            + 'static,
    {
        let (tx, rx) = mpsc::channel(Self::capacity_or_default(capacity));
        let handle = Self::spawn_reader(ws, tx);
        Self {
            receiver: rx,
            _handle: Some(handle),
        }
    }

    /// Creates a stream fed by the returned sender instead of a socket.
    pub fn channel(capacity: usize) -> (mpsc::Sender<Result<Payload>>, Self) {
        let (tx, rx) = mpsc::channel(Self::capacity_or_default(capacity));
        (
            tx,
            Self {
                receiver: rx,
                _handle: None,
            },
        )
    }

    /// Receive the next payload from the stream
    pub async fn next(&mut self) -> Option<Result<Payload>> {
        self.receiver.recv().await
    }
}

impl FutStream for Stream {
    type Item = Result<Payload>;

    fn poll_next(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

/// Empty frames are skipped; anything else must decode.
fn decode(data: &[u8]) -> Option<Result<Payload>> {
    if data.is_empty() {
        return None;
    }
    trace!(len = data.len(), "received websocket message");
    let text = String::from_utf8_lossy(data);
    match Payload::from_json(&text) {
        Ok(payload) => Some(Ok(payload)),
        Err(e) => {
            warn!(len = data.len(), error = %e, "failed to decode websocket message");
            Some(Err(e.into()))
        }
    }
}

/// Destination for outgoing payloads.
pub trait PayloadSink: Send {
    fn send(&mut self, payload: Payload) -> impl Future<Output = Result<()>> + Send;

    /// Sends a close frame and stops accepting payloads.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;
}

/// Write half of the lobby websocket.
pub struct Writer {
    sink: SplitSink<Socket, Message>,
}

impl PayloadSink for Writer {
    async fn send(&mut self, payload: Payload) -> Result<()> {
        let text = payload.to_json()?;
        trace!(%text, "sending websocket message");
        self.sink.send(Message::Text(text)).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.sink.close().await?;
        Ok(())
    }
}

impl PayloadSink for mpsc::UnboundedSender<Payload> {
    async fn send(&mut self, payload: Payload) -> Result<()> {
        mpsc::UnboundedSender::send(self, payload).map_err(|_| Error::ConnectionClosed)
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Dials the lobby with the headers it expects from a browser.
pub async fn connect(
    url: &Url,
    user_agent: &str,
    origin: &str,
    capacity: usize,
) -> Result<(Writer, Stream)> {
    match url.scheme() {
        "ws" | "wss" => {}
        other => return Err(Error::InvalidScheme(other.to_string())),
    }
    let mut request = url.as_str().into_client_request()?;
    let headers = request.headers_mut();
    headers.insert(header::COOKIE, HeaderValue::from_static(LOBBY_COOKIE));
    headers.insert(header::USER_AGENT, HeaderValue::from_str(user_agent)?);
    headers.insert(header::ORIGIN, HeaderValue::from_str(origin)?);

    let (ws, response) = connect_async(request).await?;
    info!(%url, status = %response.status(), "connected to lobby");
    let (sink, stream): (SplitSink<Socket, Message>, SplitStream<Socket>) = ws.split();
    Ok((Writer { sink }, Stream::new(stream, capacity)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use tokio_tungstenite::tungstenite;

    fn frames(
        items: Vec<std::result::Result<Message, tungstenite::Error>>,
    ) -> impl FutStream<Item = std::result::Result<Message, tungstenite::Error>> + Unpin + Send + 'static
    {
        stream::iter(items)
    }

    #[tokio::test]
    async fn test_reader_decodes_text_and_skips_empty() {
        let mut stream = Stream::new(
            frames(vec![
                Ok(Message::Text(String::new())),
                Ok(Message::Text(r#"{"i":[33,1500]}"#.to_string())),
                Ok(Message::Binary(br#"{"i":[18],"s":["bot"]}"#.to_vec())),
                Ok(Message::Close(None)),
            ]),
            0,
        );

        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first, Payload::ints(vec![33, 1500]));
        let second = stream.next().await.unwrap().unwrap();
        assert_eq!(second.s, vec!["bot".to_string()]);
        assert!(matches!(
            stream.next().await,
            Some(Err(Error::ConnectionClosed))
        ));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_reader_stops_on_malformed_message() {
        let mut stream = Stream::new(
            frames(vec![
                Ok(Message::Text("not json".to_string())),
                Ok(Message::Text(r#"{"i":[1]}"#.to_string())),
            ]),
            4,
        );
        assert!(matches!(stream.next().await, Some(Err(Error::Decode(_)))));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_reader_forwards_socket_errors() {
        let mut stream = Stream::new(
            frames(vec![Err(tungstenite::Error::ConnectionClosed)]),
            4,
        );
        assert!(matches!(
            stream.next().await,
            Some(Err(Error::Tungstenite(_)))
        ));
    }

    #[tokio::test]
    async fn test_connect_rejects_http_scheme() {
        let url = Url::parse("https://example.com/ws/").unwrap();
        let result = connect(&url, "agent", "http://example.com/", 0).await;
        assert!(matches!(result, Err(Error::InvalidScheme(scheme)) if scheme == "https"));
    }

    #[tokio::test]
    async fn test_unbounded_sender_sink() {
        let (mut tx, mut rx) = mpsc::unbounded_channel();
        PayloadSink::send(&mut tx, Payload::ints(vec![2])).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), Payload::ints(vec![2]));
        drop(rx);
        assert!(PayloadSink::send(&mut tx, Payload::ints(vec![2])).await.is_err());
    }
}
