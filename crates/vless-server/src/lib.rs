//! vless server library.
//!
//! Listener, HTTP front door, relay sessions and the dispatcher that ties
//! them together. Exposed for the binaries, integration tests and embedding.

pub mod cli;
mod connector;
mod dispatcher;
mod error;
mod handler;
mod server;
mod session;
mod util;
pub mod ws;

pub use cli::ServerArgs;
pub use connector::{Connector, TcpConnector};
pub use dispatcher::Dispatcher;
pub use error::{ServerError, SessionError};
pub use server::{DEFAULT_SHUTDOWN_TIMEOUT, run, run_with_shutdown, serve};
pub use session::{RelaySession, RelayStats, SessionSettings, SessionState};
pub use tokio_util::sync::CancellationToken;
pub use util::{ConnectionGuard, ConnectionTracker, create_listener};
