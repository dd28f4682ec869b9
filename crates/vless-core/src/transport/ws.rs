//! WebSocket message channel adapter.
//!
//! `WsChannel` wraps a `WebSocketStream` and exposes it as a duplex message
//! channel of binary frames:
//! - binary frames are yielded as-is, text frames as their UTF-8 bytes
//! - ping/pong and raw frames are consumed by the WebSocket layer
//! - a close frame (or a closed connection) ends the stream
//! - outbound items are sent as binary frames

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::{Sink, Stream};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::{
    WebSocketStream,
    tungstenite::{Error as WsError, Message},
};

/// Frame-preserving WebSocket channel.
pub struct WsChannel<S> {
    ws: WebSocketStream<S>,
    read_closed: bool,
}

impl<S> WsChannel<S> {
    /// Create a new WebSocket channel adapter.
    pub fn new(ws: WebSocketStream<S>) -> Self {
        Self {
            ws,
            read_closed: false,
        }
    }
}

impl<S> Stream for WsChannel<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.read_closed {
            return Poll::Ready(None);
        }
        loop {
            match Pin::new(&mut self.ws).poll_next(cx) {
                Poll::Ready(Some(Ok(msg))) => match msg {
                    Message::Binary(data) => return Poll::Ready(Some(Ok(Bytes::from(data)))),
                    Message::Text(text) => {
                        return Poll::Ready(Some(Ok(Bytes::from(text.into_bytes()))));
                    }
                    Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
                    Message::Close(_) => {
                        self.read_closed = true;
                        return Poll::Ready(None);
                    }
                },
                Poll::Ready(Some(Err(err))) => {
                    self.read_closed = true;
                    return match err {
                        WsError::ConnectionClosed | WsError::AlreadyClosed => Poll::Ready(None),
                        other => Poll::Ready(Some(Err(ws_err(other)))),
                    };
                }
                Poll::Ready(None) => {
                    self.read_closed = true;
                    return Poll::Ready(None);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

impl<S> Sink<Bytes> for WsChannel<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    type Error = io::Error;

    fn poll_ready(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.ws).poll_ready(cx).map_err(ws_err)
    }

    fn start_send(mut self: Pin<&mut Self>, item: Bytes) -> io::Result<()> {
        Pin::new(&mut self.ws)
            .start_send(Message::Binary(item.to_vec()))
            .map_err(ws_err)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.ws).poll_flush(cx).map_err(ws_err)
    }

    fn poll_close(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match Pin::new(&mut self.ws).poll_close(cx) {
            Poll::Ready(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) => {
                Poll::Ready(Ok(()))
            }
            other => other.map_err(ws_err),
        }
    }
}

fn ws_err(err: WsError) -> io::Error {
    match err {
        WsError::Io(e) => e,
        other => io::Error::other(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::{SinkExt, StreamExt};
    use tokio::io::{DuplexStream, duplex};
    use tokio_tungstenite::tungstenite::protocol::Role;

    async fn pair() -> (WsChannel<DuplexStream>, WebSocketStream<DuplexStream>) {
        let (a, b) = duplex(64 * 1024);
        let server = WebSocketStream::from_raw_socket(a, Role::Server, None).await;
        let client = WebSocketStream::from_raw_socket(b, Role::Client, None).await;
        (WsChannel::new(server), client)
    }

    #[tokio::test]
    async fn binary_and_text_frames_become_bytes() {
        let (mut channel, mut client) = pair().await;

        client.send(Message::Binary(vec![1, 2, 3])).await.unwrap();
        client.send(Message::Text("hi".into())).await.unwrap();

        assert_eq!(channel.next().await.unwrap().unwrap(), Bytes::from_static(&[1, 2, 3]));
        assert_eq!(channel.next().await.unwrap().unwrap(), Bytes::from_static(b"hi"));
    }

    #[tokio::test]
    async fn outbound_items_are_binary_frames() {
        let (mut channel, mut client) = pair().await;

        channel.send(Bytes::from_static(b"reply")).await.unwrap();
        match client.next().await.unwrap().unwrap() {
            Message::Binary(data) => assert_eq!(data, b"reply"),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[tokio::test]
    async fn close_frame_ends_stream() {
        let (mut channel, mut client) = pair().await;

        client.close(None).await.unwrap();
        assert!(channel.next().await.is_none());
        // Stays ended.
        assert!(channel.next().await.is_none());
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let (mut channel, _client) = pair().await;

        channel.close().await.unwrap();
        channel.close().await.unwrap();
    }
}
