use clap::Parser;
use rpcstress_server::config::DEFAULT_ADDRESS;
use rpcstress_server::{Server, ServerConfig};
use std::net::SocketAddr;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rpcstress-server", about = "Reference RPC service for rpcstress")]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = DEFAULT_ADDRESS)]
    address: SocketAddr,

    /// Artificial latency added to every call, e.g. `1ms` or `250ms`.
    #[arg(long, value_parser = humantime::parse_duration, default_value = "0s")]
    delay: Duration,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let (ready_tx, ready_rx) = tokio::sync::oneshot::channel();

    // Print "Listening on <addr>" once the server signals it is bound.
    tokio::spawn(async move {
        if let Ok(addr) = ready_rx.await {
            println!("Listening on {}", addr);
        }
    });

    Server::new(ServerConfig { address: args.address, delay: args.delay }).run(ready_tx).await?;
    Ok(())
}
