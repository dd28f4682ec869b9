//! Hands accepted message channels to relay sessions.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use vless_auth::CredentialGuard;
use vless_core::transport::MessageChannel;
use vless_metrics::{
    record_auth_failure, record_error, record_session_closed, record_session_started,
};

use crate::connector::Connector;
use crate::error::SessionError;
use crate::session::{RelaySession, SessionSettings};
use crate::util::ConnectionTracker;

/// Process-wide entry point for sessions.
///
/// Holds the credential guard and connector shared by every session. There
/// is no registry of live sessions beyond a counter used for draining.
pub struct Dispatcher<K> {
    guard: Arc<CredentialGuard>,
    connector: Arc<K>,
    settings: SessionSettings,
    tracker: ConnectionTracker,
}

impl<K> Clone for Dispatcher<K> {
    fn clone(&self) -> Self {
        Self {
            guard: self.guard.clone(),
            connector: self.connector.clone(),
            settings: self.settings.clone(),
            tracker: self.tracker.clone(),
        }
    }
}

impl<K: Connector> Dispatcher<K> {
    pub fn new(guard: CredentialGuard, connector: K, settings: SessionSettings) -> Self {
        Self {
            guard: Arc::new(guard),
            connector: Arc::new(connector),
            settings,
            tracker: ConnectionTracker::new(),
        }
    }

    /// Count sessions on a tracker the caller also holds.
    pub fn with_tracker(mut self, tracker: ConnectionTracker) -> Self {
        self.tracker = tracker;
        self
    }

    pub fn guard(&self) -> &CredentialGuard {
        &self.guard
    }

    /// Sessions currently running.
    pub fn tracker(&self) -> &ConnectionTracker {
        &self.tracker
    }

    /// Run a new session for `channel` on its own task.
    pub fn dispatch<C>(&self, channel: C, peer: Option<SocketAddr>) -> JoinHandle<()>
    where
        C: MessageChannel + 'static,
    {
        let this = self.clone();
        tokio::spawn(async move { this.serve(channel, peer).await })
    }

    /// Run a session for `channel` on the current task and report its outcome.
    pub async fn serve<C>(&self, channel: C, peer: Option<SocketAddr>)
    where
        C: MessageChannel,
    {
        let _guard = self.tracker.track();
        record_session_started();
        let start = Instant::now();

        let result = RelaySession::new(
            channel,
            self.guard.clone(),
            self.connector.clone(),
            self.settings.clone(),
        )
        .with_peer(peer)
        .run()
        .await;

        let duration_secs = start.elapsed().as_secs_f64();
        record_session_closed(duration_secs);

        match result {
            Ok(stats) => debug!(
                ?peer,
                duration_secs,
                upstream = stats.upstream,
                downstream = stats.downstream,
                "session closed"
            ),
            Err(err) => {
                record_error(err.error_type());
                match err {
                    SessionError::Auth(_) => {
                        record_auth_failure();
                        warn!(?peer, "authentication failed");
                    }
                    SessionError::Connect(_) | SessionError::ConnectTimeout => {
                        info!(?peer, duration_secs, error = %err, "destination unreachable");
                    }
                    _ => debug!(?peer, duration_secs, error = %err, "session closed with error"),
                }
            }
        }
    }
}
