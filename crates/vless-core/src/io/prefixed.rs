//! Prefixed stream adapter for replaying buffered data.
//!
//! The listener has to read the HTTP request head before it knows whether a
//! connection is a WebSocket upgrade. `PrefixedStream` replays those bytes to
//! the WebSocket acceptor so nothing read during inspection is lost.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// A stream wrapper that yields a prefetched prefix before reading from the inner stream.
pub struct PrefixedStream<S> {
    prefix: Bytes,
    pos: usize,
    inner: S,
}

impl<S> PrefixedStream<S> {
    /// Create a new prefixed stream.
    pub fn new(prefix: Bytes, inner: S) -> Self {
        Self {
            prefix,
            pos: 0,
            inner,
        }
    }

    /// Returns the remaining unread prefix bytes.
    pub fn prefix_remaining(&self) -> usize {
        self.prefix.len().saturating_sub(self.pos)
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for PrefixedStream<S> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        if self.pos < self.prefix.len() {
            let remaining = &self.prefix[self.pos..];
            let to_copy = remaining.len().min(buf.remaining());
            buf.put_slice(&remaining[..to_copy]);
            self.pos += to_copy;
            return Poll::Ready(Ok(()));
        }
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for PrefixedStream<S> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        data: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, data)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, duplex};

    #[tokio::test]
    async fn replays_prefix_before_inner() {
        let (mut client, server) = duplex(1024);
        let mut prefixed = PrefixedStream::new(Bytes::from_static(b"GET / "), server);

        client.write_all(b"HTTP/1.1").await.unwrap();
        drop(client);

        let mut out = Vec::new();
        prefixed.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"GET / HTTP/1.1");
        assert_eq!(prefixed.prefix_remaining(), 0);
    }

    #[tokio::test]
    async fn small_reads_drain_prefix_in_pieces() {
        let (_client, server) = duplex(64);
        let mut prefixed = PrefixedStream::new(Bytes::from_static(b"abcdef"), server);

        let mut buf = [0u8; 4];
        let n = prefixed.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"abcd");
        assert_eq!(prefixed.prefix_remaining(), 2);

        let n = prefixed.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"ef");
    }

    #[tokio::test]
    async fn writes_go_to_inner() {
        let (mut client, server) = duplex(64);
        let mut prefixed = PrefixedStream::new(Bytes::new(), server);

        prefixed.write_all(b"pong").await.unwrap();
        let mut buf = [0u8; 4];
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"pong");
    }
}
