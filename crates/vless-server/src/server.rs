//! Main server loop and connection handling.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use vless_auth::CredentialGuard;
use vless_config::Config;
use vless_core::defaults;
use vless_metrics::{ERROR_IO, record_connection_accepted, record_connection_rejected, record_error};

use crate::connector::TcpConnector;
use crate::dispatcher::Dispatcher;
use crate::error::ServerError;
use crate::handler::{ServerState, handle_conn};
use crate::session::SessionSettings;
use crate::util::{ConnectionTracker, create_listener};

/// Default graceful shutdown timeout.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration =
    Duration::from_secs(defaults::DEFAULT_SHUTDOWN_TIMEOUT_SECS);

/// Pause after a failed accept so descriptor exhaustion does not spin.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(50);

/// Run the server until the process is killed.
pub async fn run(config: Config) -> Result<(), ServerError> {
    run_with_shutdown(config, CancellationToken::new()).await
}

/// Run the server with a cancellation token for graceful shutdown.
pub async fn run_with_shutdown(
    config: Config,
    shutdown: CancellationToken,
) -> Result<(), ServerError> {
    let listen: SocketAddr = config
        .server
        .listen
        .parse()
        .map_err(|_| ServerError::Config("invalid listen address".into()))?;
    let backlog = config.server.tcp.backlog;
    let listener = create_listener(listen, backlog)?;
    info!(address = %listen, backlog, "listening");
    serve(listener, config, shutdown).await
}

/// Wait for `tracker` to reach zero before `deadline`.
async fn drain(kind: &'static str, tracker: &ConnectionTracker, deadline: Instant) -> bool {
    let active = tracker.count();
    if active == 0 {
        return true;
    }
    info!(active, kind, "waiting to drain");
    let left = deadline.saturating_duration_since(Instant::now());
    if tracker.wait_for_zero(left).await {
        info!(kind, "drained");
        true
    } else {
        warn!(remaining = tracker.count(), kind, "shutdown timeout, still active");
        false
    }
}

/// Serve connections from an already bound listener.
pub async fn serve(
    listener: TcpListener,
    config: Config,
    shutdown: CancellationToken,
) -> Result<(), ServerError> {
    let credential = config
        .credential()
        .map_err(|e| ServerError::Config(e.to_string()))?;
    let sessions = ConnectionTracker::new();
    let dispatcher = Dispatcher::new(
        CredentialGuard::new(credential),
        TcpConnector::from_config(&config.server),
        SessionSettings::from_config(&config.server),
    )
    .with_tracker(sessions.clone());
    let state = Arc::new(ServerState {
        dispatcher,
        websocket: config.websocket.clone(),
        max_header_bytes: config.server.max_header_bytes,
        head_timeout: Duration::from_secs(config.server.handshake_timeout_secs),
    });
    let no_delay = config.server.tcp.no_delay;
    let tracker = ConnectionTracker::new();

    // Connection limiter (None = unlimited)
    let conn_limit: Option<Arc<Semaphore>> = config.server.max_connections.map(|n| {
        info!(max_connections = n, "connection limit enabled");
        Arc::new(Semaphore::new(n))
    });

    loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                info!("shutdown signal received, stopping accept loop");
                break;
            }

            result = listener.accept() => {
                let (tcp, peer) = match result {
                    Ok(accepted) => accepted,
                    Err(err) => {
                        record_error(ERROR_IO);
                        warn!(error = %err, "accept failed");
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                        continue;
                    }
                };

                let permit: Option<OwnedSemaphorePermit> = match &conn_limit {
                    Some(sem) => match sem.clone().try_acquire_owned() {
                        Ok(p) => Some(p),
                        Err(_) => {
                            debug!(peer = %peer, reason = "max_connections", "connection rejected");
                            record_connection_rejected("max_connections");
                            drop(tcp);
                            continue;
                        }
                    },
                    None => None,
                };

                if no_delay && let Err(err) = tcp.set_nodelay(true) {
                    debug!(peer = %peer, error = %err, "failed to set TCP_NODELAY");
                }
                debug!(peer = %peer, "new connection");

                let state = state.clone();
                let guard = tracker.track();

                tokio::spawn(async move {
                    let _guard = guard;
                    let _permit = permit;
                    record_connection_accepted();
                    let start = Instant::now();

                    let result = handle_conn(tcp, state, peer).await;

                    let duration_secs = start.elapsed().as_secs_f64();
                    if let Err(ref err) = result {
                        record_error(err.error_type());
                        warn!(peer = %peer, duration_secs, error = %err, "connection closed with error");
                    } else {
                        debug!(peer = %peer, duration_secs, "connection closed");
                    }
                });
            }
        }
    }

    // Graceful drain: relay sessions first, then any connection still serving a page
    let deadline = Instant::now() + DEFAULT_SHUTDOWN_TIMEOUT;
    if drain("sessions", &sessions, deadline).await {
        drain("connections", &tracker, deadline).await;
    }

    info!("server stopped");
    Ok(())
}
