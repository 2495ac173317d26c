//! cmdwire agent: executes commands sent by a controller.
//!
//! ```bash
//! cmdwire-agent --host 0.0.0.0 --port 6767
//! RUST_LOG=debug cmdwire-agent
//! ```

use std::time::Duration;

use clap::Parser;
use cmdwire::protocol::DEFAULT_MAX_FRAME_SIZE;
use cmdwire::transport::{DEFAULT_HOST, DEFAULT_PORT};
use cmdwire::Server;

#[derive(Debug, Parser)]
#[command(name = "cmdwire-agent", version, about = "Serve cmdwire commands over TCP")]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,

    /// Port to listen on
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Per read/write deadline in seconds (0 disables it)
    #[arg(long, default_value_t = 300)]
    io_timeout_secs: u64,

    /// Largest frame accepted, in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_FRAME_SIZE)]
    max_frame_size: usize,
}

#[tokio::main]
async fn main() -> cmdwire::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let io_timeout = (args.io_timeout_secs > 0).then(|| Duration::from_secs(args.io_timeout_secs));

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "cmdwire agent starting");

    let server = Server::builder()
        .io_timeout(io_timeout)
        .max_frame_size(args.max_frame_size)
        .bind((args.host.as_str(), args.port))
        .await?;

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await
}
