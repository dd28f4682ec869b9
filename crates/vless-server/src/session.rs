//! Per-connection relay state machine.
//!
//! ```text
//! AwaitingHandshake ──first frame──▶ Connecting ──connected──▶ Streaming ──▶ Closed
//!         │                               │
//!         └──── timeout / bad header ─────┴──── connect failure ───────────▶ Closed
//! ```
//!
//! Nothing is ever written to the client before the destination is connected.
//! Every pre-stream failure looks the same from outside: the channel closes.

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{Instant, timeout, timeout_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};
use vless_auth::CredentialGuard;
use vless_config::ServerConfig;
use vless_core::defaults;
use vless_core::transport::MessageChannel;
use vless_metrics::{record_bytes_downstream, record_bytes_upstream, record_target_connected};
use vless_proto::{decode_handshake, encode_acceptance};

use crate::connector::Connector;
use crate::error::SessionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingHandshake,
    Connecting,
    Streaming,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionState::AwaitingHandshake => "awaiting_handshake",
            SessionState::Connecting => "connecting",
            SessionState::Streaming => "streaming",
            SessionState::Closed => "closed",
        })
    }
}

/// Timing and buffer knobs shared by every session.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Time allowed between channel open and the first non-empty frame.
    pub handshake_timeout: Duration,
    /// Upper bound on the Connecting state, whatever the connector does.
    pub connect_timeout: Duration,
    /// Read size for destination-to-client copies.
    pub relay_buffer_size: usize,
    /// Upper bound on a single close/shutdown once the session is ending.
    pub close_timeout: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_secs(defaults::DEFAULT_HANDSHAKE_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(defaults::DEFAULT_CONNECT_TIMEOUT_SECS),
            relay_buffer_size: defaults::DEFAULT_RELAY_BUFFER_SIZE,
            close_timeout: Duration::from_millis(defaults::DEFAULT_CLOSE_TIMEOUT_MS),
        }
    }
}

impl SessionSettings {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            handshake_timeout: Duration::from_secs(config.handshake_timeout_secs),
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            relay_buffer_size: config.relay_buffer_size,
            ..Self::default()
        }
    }
}

/// Bytes moved by a session, counted after the handshake header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    /// Client to destination, including the handshake's trailing payload.
    pub upstream: u64,
    /// Destination to client, excluding the acceptance reply.
    pub downstream: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Target {
    host: String,
    port: u16,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// One client channel relayed to one destination stream.
pub struct RelaySession<C, K> {
    channel: C,
    guard: Arc<CredentialGuard>,
    connector: Arc<K>,
    settings: SessionSettings,
    peer: Option<SocketAddr>,
}

impl<C, K> RelaySession<C, K>
where
    C: MessageChannel,
    K: Connector,
{
    pub fn new(
        channel: C,
        guard: Arc<CredentialGuard>,
        connector: Arc<K>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            channel,
            guard,
            connector,
            settings,
            peer: None,
        }
    }

    pub fn with_peer(mut self, peer: Option<SocketAddr>) -> Self {
        self.peer = peer;
        self
    }

    /// Drive the session to completion.
    ///
    /// The channel is always closed on return. `Ok` with zero stats means
    /// the client went away before sending a handshake.
    #[instrument(name = "session", level = "debug", skip_all, fields(peer = ?self.peer))]
    pub async fn run(mut self) -> Result<RelayStats, SessionError> {
        let frame = match self.await_handshake().await {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                debug!("channel ended before handshake");
                return self.close(RelayStats::default()).await;
            }
            Err(err) => return self.fail(err).await,
        };

        let (target, payload) = match self.accept_handshake(&frame) {
            Ok(parsed) => parsed,
            Err(err) => return self.fail(err).await,
        };

        enter(SessionState::Connecting);
        debug!(%target, payload = payload.len(), "connecting");
        let start = Instant::now();
        let connect = self.connector.connect(&target.host, target.port);
        let mut dest = match timeout(self.settings.connect_timeout, connect).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(err)) => return self.fail(SessionError::from_connect(err)).await,
            Err(_) => return self.fail(SessionError::ConnectTimeout).await,
        };
        record_target_connected(start.elapsed().as_secs_f64());

        if !payload.is_empty()
            && let Err(err) = dest.write_all(&payload).await
        {
            return self.fail(SessionError::Io(err)).await;
        }
        record_bytes_upstream(payload.len() as u64);

        if let Err(err) = self
            .channel
            .send(Bytes::copy_from_slice(&encode_acceptance()))
            .await
        {
            return self.fail(SessionError::Io(err)).await;
        }

        enter(SessionState::Streaming);
        let mut stats = stream_until_closed(self.channel, dest, &self.settings).await;
        stats.upstream += payload.len() as u64;
        enter(SessionState::Closed);
        debug!(
            %target,
            upstream = stats.upstream,
            downstream = stats.downstream,
            "relay finished"
        );
        Ok(stats)
    }

    /// Wait for the first non-empty frame, bounded by the handshake timeout.
    async fn await_handshake(&mut self) -> Result<Option<Bytes>, SessionError> {
        enter(SessionState::AwaitingHandshake);
        let deadline = Instant::now() + self.settings.handshake_timeout;
        loop {
            match timeout_at(deadline, self.channel.next()).await {
                Err(_) => return Err(SessionError::HandshakeTimeout),
                Ok(None) => return Ok(None),
                Ok(Some(Err(err))) => return Err(SessionError::Io(err)),
                Ok(Some(Ok(frame))) if frame.is_empty() => continue,
                Ok(Some(Ok(frame))) => return Ok(Some(frame)),
            }
        }
    }

    /// Decode and authenticate the handshake frame.
    ///
    /// Returns the destination and whatever followed the header.
    fn accept_handshake(&self, frame: &Bytes) -> Result<(Target, Bytes), SessionError> {
        let request = decode_handshake(frame)?;
        self.guard.verify(request.id)?;
        let target = Target {
            host: request.address.host.to_string(),
            port: request.address.port,
        };
        Ok((target, frame.slice(request.header_len..)))
    }

    async fn fail(mut self, err: SessionError) -> Result<RelayStats, SessionError> {
        debug!(error = %err, "session aborted");
        close_channel(&mut self.channel, self.settings.close_timeout).await;
        enter(SessionState::Closed);
        Err(err)
    }

    async fn close(mut self, stats: RelayStats) -> Result<RelayStats, SessionError> {
        close_channel(&mut self.channel, self.settings.close_timeout).await;
        enter(SessionState::Closed);
        Ok(stats)
    }
}

fn enter(state: SessionState) {
    debug!(%state, "session state");
}

async fn close_channel<C: MessageChannel>(channel: &mut C, limit: Duration) {
    let _ = timeout(limit, channel.close()).await;
}

/// Copy in both directions until either side ends, then tear both down.
async fn stream_until_closed<C, D>(channel: C, dest: D, settings: &SessionSettings) -> RelayStats
where
    C: MessageChannel,
    D: AsyncRead + AsyncWrite + Unpin + Send,
{
    let (mut outbound, mut inbound): (SplitSink<C, Bytes>, SplitStream<C>) = channel.split();
    let (mut dest_read, mut dest_write) = tokio::io::split(dest);
    let cancel = CancellationToken::new();

    let upstream = async {
        let mut bytes = 0u64;
        let result = tokio::select! {
            r = copy_frames_to_stream(&mut inbound, &mut dest_write, &mut bytes) => r,
            () = cancel.cancelled() => Ok(()),
        };
        cancel.cancel();
        let _ = timeout(settings.close_timeout, dest_write.shutdown()).await;
        if let Err(err) = result {
            debug!(error = %err, "client to destination copy ended");
        }
        bytes
    };

    let downstream = async {
        let mut bytes = 0u64;
        let result = tokio::select! {
            r = copy_stream_to_frames(
                &mut dest_read,
                &mut outbound,
                settings.relay_buffer_size,
                &mut bytes,
            ) => r,
            () = cancel.cancelled() => Ok(()),
        };
        cancel.cancel();
        let _ = timeout(settings.close_timeout, outbound.close()).await;
        if let Err(err) = result {
            debug!(error = %err, "destination to client copy ended");
        }
        bytes
    };

    let (upstream, downstream) = tokio::join!(upstream, downstream);
    RelayStats {
        upstream,
        downstream,
    }
}

/// Write every inbound frame to `writer`, verbatim and in order.
async fn copy_frames_to_stream<S, W>(
    frames: &mut S,
    writer: &mut W,
    total: &mut u64,
) -> io::Result<()>
where
    S: Stream<Item = io::Result<Bytes>> + Unpin,
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = frames.next().await {
        let frame = frame?;
        if frame.is_empty() {
            continue;
        }
        writer.write_all(&frame).await?;
        *total += frame.len() as u64;
        record_bytes_upstream(frame.len() as u64);
    }
    Ok(())
}

/// Forward each read from `reader` as one outbound frame.
async fn copy_stream_to_frames<R, S>(
    reader: &mut R,
    frames: &mut S,
    buffer_size: usize,
    total: &mut u64,
) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    S: Sink<Bytes, Error = io::Error> + Unpin,
{
    let mut buf = BytesMut::with_capacity(buffer_size);
    loop {
        buf.reserve(buffer_size);
        let n = reader.read_buf(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        frames.send(buf.split().freeze()).await?;
        *total += n as u64;
        record_bytes_downstream(n as u64);
    }
}
