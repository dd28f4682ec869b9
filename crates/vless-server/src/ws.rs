//! HTTP front door: request inspection, WebSocket upgrade and plain pages.
//!
//! Only the request head is inspected here. Anything that is not a WebSocket
//! upgrade on the configured path gets a small text page; bytes that are not
//! HTTP at all are dropped without a reply.

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_tungstenite::{
    WebSocketStream, accept_hdr_async_with_config,
    tungstenite::{
        handshake::server::{Request, Response},
        protocol::WebSocketConfig,
    },
};
use tracing::{debug, warn};
use vless_auth::{Credential, CredentialGuard};
use vless_config::WebSocketConfig as WsCfg;
use vless_core::defaults::{DEFAULT_SHARE_PORT, STATUS_PAGE_BODY};
use vless_core::io::PrefixedStream;

use crate::error::ServerError;

/// Initial buffer size for reading the HTTP request head.
pub const INITIAL_BUFFER_SIZE: usize = 2048;

const HTTP_HEADER_END: &[u8] = b"\r\n\r\n";

/// Outcome of inspecting the buffered request head.
#[derive(Debug, PartialEq, Eq)]
pub enum HttpInspect {
    /// Head not complete yet.
    NeedMore,
    /// Not an HTTP/1.x request.
    NotHttp,
    /// WebSocket upgrade on the configured path and host.
    Upgrade,
    /// Ordinary request, answered with a page.
    Page(PageRequest),
    /// Upgrade that must be refused with 400.
    Reject(&'static str),
}

/// The parts of a plain request that select a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub method: String,
    pub path: String,
    pub host: Option<String>,
}

/// Inspect buffered bytes for a complete HTTP request head.
pub fn inspect_request(buf: &[u8], cfg: &WsCfg) -> HttpInspect {
    let Some(header_end) = find_header_end(buf) else {
        if !buf.is_empty() && !looks_like_http(buf) {
            return HttpInspect::NotHttp;
        }
        return HttpInspect::NeedMore;
    };
    let Ok(head) = std::str::from_utf8(&buf[..header_end]) else {
        return HttpInspect::NotHttp;
    };
    let mut lines = head.split("\r\n");
    let Some(request_line) = lines.next() else {
        return HttpInspect::NotHttp;
    };
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or("");
    let path = parts.next().unwrap_or("");
    let version = parts.next().unwrap_or("");
    if !version.starts_with("HTTP/") {
        return HttpInspect::NotHttp;
    }

    let mut upgrade = false;
    let mut connection_upgrade = false;
    let mut ws_key = false;
    let mut host: Option<&str> = None;

    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match name.trim().to_ascii_lowercase().as_str() {
            "upgrade" => upgrade |= value.to_ascii_lowercase().contains("websocket"),
            "connection" => connection_upgrade |= value.to_ascii_lowercase().contains("upgrade"),
            "sec-websocket-key" => ws_key |= !value.is_empty(),
            "host" => host = Some(value),
            _ => {}
        }
    }

    if method != "GET" || !upgrade || !connection_upgrade || !ws_key {
        return HttpInspect::Page(PageRequest {
            method: method.to_string(),
            path: path.to_string(),
            host: host.map(str::to_string),
        });
    }

    if !path_matches(cfg, path) || !host_matches(cfg, host) {
        return HttpInspect::Reject("websocket path/host mismatch");
    }

    HttpInspect::Upgrade
}

/// Accept a WebSocket upgrade on the given stream.
///
/// `initial` holds the bytes already read while inspecting the head.
pub async fn accept_ws<S>(
    stream: S,
    initial: Bytes,
    cfg: &WsCfg,
) -> Result<WebSocketStream<PrefixedStream<S>>, ServerError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let max_frame = if cfg.max_frame_bytes == 0 {
        None
    } else {
        Some(cfg.max_frame_bytes)
    };
    let ws_cfg = WebSocketConfig {
        max_frame_size: max_frame,
        max_message_size: max_frame,
        ..WebSocketConfig::default()
    };
    let prefixed = PrefixedStream::new(initial, stream);
    accept_hdr_async_with_config(
        prefixed,
        |req: &Request, resp: Response| {
            debug!(path = %req.uri().path(), "websocket upgrade");
            Ok(resp)
        },
        Some(ws_cfg),
    )
    .await
    .map_err(|e| ServerError::WebSocket(format!("handshake failed: {e}")))
}

/// Which page a plain request is answered with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Page {
    Status,
    Share(String),
}

impl Page {
    /// Label used for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Page::Status => "status",
            Page::Share(_) => "share",
        }
    }

    pub fn body(&self) -> &str {
        match self {
            Page::Status => STATUS_PAGE_BODY,
            Page::Share(body) => body,
        }
    }
}

/// Pick the page for a plain request.
///
/// `GET /<credential>` yields the share page; everything else, including a
/// well-formed but different UUID, gets the status page.
pub fn select_page(request: &PageRequest, guard: &CredentialGuard, cfg: &WsCfg) -> Page {
    if request.method != "GET" {
        return Page::Status;
    }
    let path_only = request.path.split('?').next().unwrap_or("");
    let Ok(candidate) = path_only.trim_start_matches('/').parse::<Credential>() else {
        return Page::Status;
    };
    if guard.verify(candidate.as_bytes()).is_err() {
        return Page::Status;
    }
    let host = request
        .host
        .as_deref()
        .map(host_without_port)
        .filter(|h| !h.is_empty())
        .or(cfg.host.as_deref())
        .unwrap_or("localhost");
    Page::Share(share_page(&candidate, host, &cfg.path))
}

/// Client share link for this deployment.
pub fn share_link(credential: &Credential, host: &str, path: &str) -> String {
    format!(
        "vless://{credential}@{host}:{DEFAULT_SHARE_PORT}?encryption=none&security=tls&type=ws&host={host}&path={path}#{host}",
        path = urlencoding::encode(path),
    )
}

fn share_page(credential: &Credential, host: &str, path: &str) -> String {
    format!(
        "{link}\n\n\
         address: {host}\n\
         port: {DEFAULT_SHARE_PORT}\n\
         id: {credential}\n\
         encryption: none\n\
         network: ws\n\
         host: {host}\n\
         path: {path}\n\
         tls: on\n",
        link = share_link(credential, host, path),
    )
}

/// Write a `200 OK` text page and close the write side.
pub async fn send_page<S>(mut stream: S, body: &str) -> Result<(), ServerError>
where
    S: AsyncWrite + Unpin,
{
    let head = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    stream.write_all(head.as_bytes()).await?;
    stream.write_all(body.as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}

/// Send an HTTP 400 Bad Request response to reject the connection.
pub async fn send_reject<S>(mut stream: S, reason: &'static str) -> Result<(), ServerError>
where
    S: AsyncWrite + Unpin,
{
    warn!(reason, "websocket rejected");
    stream
        .write_all(b"HTTP/1.1 400 Bad Request\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
        .await?;
    stream.shutdown().await?;
    Ok(())
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(HTTP_HEADER_END.len())
        .position(|w| w == HTTP_HEADER_END)
        .map(|idx| idx + HTTP_HEADER_END.len())
}

/// Early check so binary garbage is dropped without waiting for a full head.
fn looks_like_http(buf: &[u8]) -> bool {
    let token_len = buf
        .iter()
        .position(|b| *b == b' ')
        .unwrap_or(buf.len());
    token_len <= 16 && buf[..token_len].iter().all(u8::is_ascii_uppercase)
}

fn path_matches(cfg: &WsCfg, path: &str) -> bool {
    path.split('?').next().unwrap_or("") == cfg.path
}

fn host_matches(cfg: &WsCfg, host: Option<&str>) -> bool {
    let Some(expected) = cfg.host.as_deref() else {
        return true;
    };
    host.is_some_and(|h| host_without_port(h).eq_ignore_ascii_case(expected))
}

/// Strip a trailing `:port`, keeping bracketed IPv6 literals intact.
fn host_without_port(host: &str) -> &str {
    if host.starts_with('[') {
        return match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        };
    }
    host.split(':').next().unwrap_or("")
}
