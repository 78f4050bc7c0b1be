//! linecho: a newline-delimited TCP echo server
//!
//! Every complete line a client sends is answered with `Echo: <line>`.
//! A configurable sentinel line gets a farewell and closes the connection.
//!
//! Features:
//! - One cooperative task per connection on a single-threaded runtime
//! - Input buffered per connection until a full line arrives
//! - Maximum line length to bound per-connection memory
//! - Configuration via CLI arguments or TOML file

mod config;
mod protocols;
mod runtime;
mod server;

use config::Config;
use server::Server;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(
        listen = %config.listen,
        read_chunk_size = config.read_chunk_size,
        max_line_length = config.max_line_length,
        sentinel = %config.sentinel,
        "Starting linecho server"
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(serve(config))?;
    Ok(())
}

/// Run the accept loop until Ctrl-C.
async fn serve(config: Config) -> std::io::Result<()> {
    let server = Server::bind(&config)?;

    tokio::select! {
        result = server.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
            Ok(())
        }
    }
}
