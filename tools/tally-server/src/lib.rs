use std::net::SocketAddr;

use futures::{SinkExt, StreamExt};
use tally::{
    error::Error,
    procedure::Procedure,
    store::protocol::{Request, Response, WireError},
    Namespace, Reply, Store,
};
use tally_store_memory::MemoryStore;
use tally_store_remote::MAX_FRAME_LENGTH;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::{Framed, LinesCodec};

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:7400";

/// Serves a [`MemoryStore`] to `tally-store-remote` clients.
///
/// Every connection gets its own task, but all of them submit to the same
/// store, so procedures from different clients are still applied one at a time.
pub struct Server {
    listener: TcpListener,
    store: MemoryStore,
}

impl Server {
    pub async fn bind(address: SocketAddr, store: MemoryStore) -> Result<Self, Error> {
        let listener = TcpListener::bind(address).await?;
        Ok(Server { listener, store })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, Error> {
        Ok(self.listener.local_addr()?)
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// Accepts connections until the listener fails
    pub async fn run(self) -> Result<(), Error> {
        tracing::info!(address = %self.local_addr()?, "listening");
        loop {
            let (stream, peer) = self.listener.accept().await?;
            let store = self.store.clone();
            tokio::spawn(async move {
                tracing::info!(%peer, "client connected");
                if let Err(e) = handle_connection(stream, store).await {
                    tracing::warn!(%peer, error = %e, "connection closed with error");
                }
                tracing::info!(%peer, "client disconnected");
            });
        }
    }
}

async fn handle_connection(stream: TcpStream, store: MemoryStore) -> Result<(), Error> {
    stream.set_nodelay(true)?;
    let mut framed = Framed::new(stream, LinesCodec::new_with_max_length(MAX_FRAME_LENGTH));

    while let Some(line) = framed.next().await {
        let line = line.map_err(|e| Error::OtherWithContext(e.to_string()))?;
        if line.trim().is_empty() {
            continue;
        }
        let response = process(&store, &line).await;
        let frame = serde_json::to_string(&response)?;
        framed
            .send(frame)
            .await
            .map_err(|e| Error::OtherWithContext(e.to_string()))?;
    }
    Ok(())
}

/// Answers one request frame
pub async fn process<S: Store + ?Sized>(store: &S, line: &str) -> Response {
    let request = match serde_json::from_str::<Request>(line) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(error = %e, "malformed request");
            return Response {
                id: 0,
                result: Err(WireError::from(Error::from(e))),
            };
        }
    };

    let id = request.id;
    let result = dispatch(store, request).await.map_err(|e| {
        tracing::warn!(id, kind = %e.enum_to_string(), error = %e, "request failed");
        WireError::from(e)
    });
    Response { id, result }
}

async fn dispatch<S: Store + ?Sized>(store: &S, request: Request) -> Result<Reply, Error> {
    let procedure = request.procedure.parse::<Procedure>()?;
    let namespace = Namespace::new(request.namespace)?;
    store.eval(procedure, &namespace, request.args).await
}
