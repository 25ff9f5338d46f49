use std::net::SocketAddr;

use clap::Parser;
use tally_server::{Server, DEFAULT_LISTEN_ADDR};
use tally_store_memory::MemoryStore;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[clap(name = "tally-server")]
struct Opt {
    /// Address to accept client connections on
    #[clap(long, default_value = DEFAULT_LISTEN_ADDR)]
    listen_addr: SocketAddr,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let opts = Opt::parse();

    let server = Server::bind(opts.listen_addr, MemoryStore::new()).await?;
    println!("Listening on {}", server.local_addr()?);

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
        }
    }

    Ok(())
}
