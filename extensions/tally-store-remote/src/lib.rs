use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tally::{
    config::{StoreSetting, DEFAULT_TIMEOUT_MS},
    error::Error,
    procedure::Procedure,
    store::protocol::{Request, Response},
    sync::Arc,
    Extension, Namespace, Reply, Store,
};
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};

/// Upper bound on a single frame, in bytes
pub const MAX_FRAME_LENGTH: usize = 16 * 1024 * 1024;

type Connection = Framed<TcpStream, LinesCodec>;

/// Client for a store served over TCP by `tally-server`.
///
/// One request is in flight per handle at a time. A request that fails or
/// times out drops the connection and the next call reconnects. Nothing is
/// retried: after [`Error::Timeout`] the procedure may or may not have run.
#[derive(Clone)]
pub struct RemoteStore {
    address: SocketAddr,
    timeout: Duration,
    connection: Arc<tokio::sync::Mutex<Option<Connection>>>,
    next_id: Arc<AtomicU64>,
}

impl std::fmt::Debug for RemoteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteStore")
            .field("address", &self.address)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Extension for RemoteStore {
    fn id(&self) -> String {
        String::from("tally-store-remote")
    }

    fn name(&self) -> String {
        format!("Remote Procedure Store ({})", self.address)
    }
}

impl RemoteStore {
    /// Creates a handle without connecting. The first call opens the connection.
    pub fn new(address: SocketAddr, timeout: Duration) -> Self {
        RemoteStore {
            address,
            timeout,
            connection: Default::default(),
            next_id: Default::default(),
        }
    }

    /// Creates a handle and opens the connection right away
    pub async fn connect(address: SocketAddr, timeout: Duration) -> Result<Self, Error> {
        let store = RemoteStore::new(address, timeout);
        let connection = store.open().await?;
        *store.connection.lock().await = Some(connection);
        Ok(store)
    }

    pub fn from_setting(setting: &StoreSetting) -> Result<Self, Error> {
        match setting {
            StoreSetting::Remote {
                address,
                timeout_ms,
            } => Ok(RemoteStore::new(
                *address,
                Duration::from_millis(*timeout_ms),
            )),
            StoreSetting::Memory => Err(Error::StoreUnavailable),
        }
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    async fn open(&self) -> Result<Connection, Error> {
        let stream = tokio::time::timeout(self.timeout, TcpStream::connect(self.address))
            .await
            .map_err(|_| Error::Timeout)??;
        stream.set_nodelay(true)?;
        tracing::debug!(address = %self.address, "connected to store");
        Ok(Framed::new(
            stream,
            LinesCodec::new_with_max_length(MAX_FRAME_LENGTH),
        ))
    }

    async fn exchange(
        connection: &mut Connection,
        request: &Request,
    ) -> Result<Response, Error> {
        let line = serde_json::to_string(request)?;
        connection.send(line).await.map_err(codec_error)?;
        let line = connection
            .next()
            .await
            .ok_or(Error::ConnectionClosed)?
            .map_err(codec_error)?;
        Ok(serde_json::from_str(&line)?)
    }
}

impl Default for RemoteStore {
    fn default() -> Self {
        RemoteStore::new(
            SocketAddr::from(([127, 0, 0, 1], 7400)),
            Duration::from_millis(DEFAULT_TIMEOUT_MS),
        )
    }
}

fn codec_error(error: LinesCodecError) -> Error {
    match error {
        LinesCodecError::Io(e) => Error::IoError(e),
        LinesCodecError::MaxLineLengthExceeded => {
            Error::OtherWithContext("frame exceeds maximum length".into())
        }
    }
}

#[async_trait::async_trait]
impl Store for RemoteStore {
    async fn eval(
        &self,
        procedure: Procedure,
        namespace: &Namespace,
        args: Vec<String>,
    ) -> Result<Reply, Error> {
        let request = Request {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            procedure: procedure.to_string(),
            namespace: namespace.to_string(),
            args,
        };

        let mut guard = self.connection.lock().await;
        let mut connection = match guard.take() {
            Some(connection) => connection,
            None => self.open().await?,
        };

        let response = match tokio::time::timeout(
            self.timeout,
            Self::exchange(&mut connection, &request),
        )
        .await
        {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                tracing::warn!(address = %self.address, %procedure, error = %e, "request failed");
                return Err(e);
            }
            Err(_) => {
                tracing::warn!(address = %self.address, %procedure, "request timed out");
                return Err(Error::Timeout);
            }
        };

        if response.id != request.id {
            tracing::warn!(
                expected = request.id,
                received = response.id,
                "response does not match request"
            );
            return Err(Error::UnexpectedReply);
        }

        *guard = Some(connection);
        response.result.map_err(Error::from)
    }
}
