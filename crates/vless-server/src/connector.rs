//! Destination connectors.
//!
//! A session only knows a `(host, port)` pair; turning that into a byte
//! stream is the connector's job. Host is either an IP literal or a domain
//! passed to the system resolver as-is.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpStream, lookup_host};
use tracing::debug;
use vless_config::ServerConfig;

use crate::util::connect_with_buffers;

/// Opens destination streams for relay sessions.
///
/// A connection that cannot be made within the connector's own bound must
/// fail with [`io::ErrorKind::TimedOut`].
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    async fn connect(&self, host: &str, port: u16) -> io::Result<Self::Stream>;
}

/// Plain TCP connector with a bounded connect time.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    connect_timeout: Duration,
    no_delay: bool,
    send_buffer: usize,
    recv_buffer: usize,
}

impl TcpConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            no_delay: true,
            send_buffer: 0,
            recv_buffer: 0,
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            no_delay: config.tcp.no_delay,
            send_buffer: config.tcp.send_buffer,
            recv_buffer: config.tcp.recv_buffer,
        }
    }

    async fn connect_any(&self, host: &str, port: u16) -> io::Result<TcpStream> {
        let mut last_err = None;
        for addr in lookup_host((host, port)).await? {
            match connect_with_buffers(addr, self.send_buffer, self.recv_buffer).await {
                Ok(stream) => {
                    if self.no_delay {
                        stream.set_nodelay(true)?;
                    }
                    return Ok(stream);
                }
                Err(err) => {
                    debug!(%addr, error = %err, "connect attempt failed");
                    last_err = Some(err);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no addresses for {host}"))
        }))
    }
}

#[async_trait]
impl Connector for TcpConnector {
    type Stream = TcpStream;

    async fn connect(&self, host: &str, port: u16) -> io::Result<TcpStream> {
        tokio::time::timeout(self.connect_timeout, self.connect_any(host, port))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "connect timed out"))?
    }
}
