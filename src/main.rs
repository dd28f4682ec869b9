//! Unified vless-rs CLI.
//!
//! - `vless server` - run the relay
//! - `vless uuid` - print a freshly generated credential
//!
//! The server is also available as the standalone `vless-server` binary.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use vless_auth::Credential;

/// vless-rs unified CLI.
#[derive(Parser)]
#[command(
    name = "vless",
    version,
    about = "A WebSocket tunneling relay speaking the VLESS handshake",
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the relay server.
    #[command(name = "server", alias = "serve")]
    Server(Box<vless_server::ServerArgs>),

    /// Generate a new credential for `auth.uuid` / `VLESS_UUID`.
    #[command(name = "uuid")]
    Uuid,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Server(args) => vless_server::cli::run(*args).await,
        Commands::Uuid => {
            println!("{}", Credential::generate());
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
