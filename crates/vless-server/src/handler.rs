//! Per-connection HTTP handling ahead of the relay.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tracing::debug;
use vless_config::WebSocketConfig;
use vless_core::transport::WsChannel;
use vless_metrics::{record_connection_rejected, record_http_page};

use crate::connector::TcpConnector;
use crate::dispatcher::Dispatcher;
use crate::error::ServerError;
use crate::ws::{
    HttpInspect, INITIAL_BUFFER_SIZE, accept_ws, inspect_request, select_page, send_page,
    send_reject,
};

/// Shared state for every accepted connection.
pub struct ServerState {
    pub dispatcher: Dispatcher<TcpConnector>,
    pub websocket: WebSocketConfig,
    pub max_header_bytes: usize,
    /// Bound on receiving a complete request head.
    pub head_timeout: Duration,
}

/// Inspect the request head, then upgrade, answer with a page, or drop.
pub async fn handle_conn<S>(
    mut stream: S,
    state: Arc<ServerState>,
    peer: SocketAddr,
) -> Result<(), ServerError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let mut buf = BytesMut::with_capacity(INITIAL_BUFFER_SIZE);
    let verdict = tokio::time::timeout(
        state.head_timeout,
        read_request_head(&mut stream, &mut buf, &state),
    )
    .await
    .map_err(|_| ServerError::HeadTimeout)??;

    match verdict {
        None | Some(HttpInspect::NeedMore) => Ok(()),
        Some(HttpInspect::NotHttp) => {
            debug!(peer = %peer, "non-http bytes, dropping connection");
            record_connection_rejected("not_http");
            Ok(())
        }
        Some(HttpInspect::Reject(reason)) => {
            record_connection_rejected("websocket_mismatch");
            send_reject(stream, reason).await
        }
        Some(HttpInspect::Page(request)) => {
            let page = select_page(&request, state.dispatcher.guard(), &state.websocket);
            debug!(peer = %peer, path = %request.path, page = page.label(), "http page");
            record_http_page(page.label());
            send_page(stream, page.body()).await
        }
        Some(HttpInspect::Upgrade) => {
            let ws = accept_ws(stream, buf.freeze(), &state.websocket).await?;
            state.dispatcher.serve(WsChannel::new(ws), Some(peer)).await;
            Ok(())
        }
    }
}

/// Read until the head is complete. `None` means the peer went away or the
/// head outgrew `max_header_bytes`.
async fn read_request_head<S>(
    stream: &mut S,
    buf: &mut BytesMut,
    state: &ServerState,
) -> Result<Option<HttpInspect>, ServerError>
where
    S: AsyncRead + Unpin,
{
    loop {
        if stream.read_buf(buf).await? == 0 {
            return Ok(None);
        }
        match inspect_request(buf, &state.websocket) {
            HttpInspect::NeedMore => {
                if buf.len() > state.max_header_bytes {
                    debug!(
                        bytes = buf.len(),
                        max = state.max_header_bytes,
                        "request head too large"
                    );
                    record_connection_rejected("header_too_large");
                    return Ok(None);
                }
            }
            verdict => return Ok(Some(verdict)),
        }
    }
}
