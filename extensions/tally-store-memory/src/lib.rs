use futures::{
    channel::{
        mpsc::{Receiver, Sender},
        oneshot::Sender as OneshotSender,
    },
    SinkExt, StreamExt,
};
use tally::{
    error::Error,
    keyspace::MemoryKeyspace,
    procedure::{self, Procedure},
    sync::Arc,
    Extension, Namespace, Reply, Store,
};

enum StoreCommand {
    Eval {
        procedure: Procedure,
        namespace: Namespace,
        args: Vec<String>,
        response: OneshotSender<Result<Reply, Error>>,
    },
    Snapshot {
        response: OneshotSender<MemoryKeyspace>,
    },
}

/// In-process store.
///
/// The keyspace is owned by a single background task that runs submitted
/// procedures one after another, each to completion, so no two procedures
/// ever interleave. Handles are cheap to clone and share the same keyspace.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    tx: Sender<StoreCommand>,
    task: Arc<tokio::task::JoinHandle<()>>,
}

impl Drop for MemoryStore {
    fn drop(&mut self) {
        if Arc::strong_count(&self.task) == 1 && !self.task.is_finished() {
            self.task.abort();
        }
    }
}

impl Extension for MemoryStore {
    fn id(&self) -> String {
        String::from("tally-store-memory")
    }

    fn name(&self) -> String {
        String::from("In-Memory Procedure Store")
    }
}

impl MemoryStore {
    /// Starts an empty store. Must be called from within a tokio runtime.
    pub fn new() -> Self {
        Self::with_keyspace(MemoryKeyspace::new())
    }

    /// Starts a store over an existing keyspace. Must be called from within a tokio runtime.
    pub fn with_keyspace(keyspace: MemoryKeyspace) -> Self {
        let (tx, rx) = futures::channel::mpsc::channel(0);
        let task = tokio::spawn(run(keyspace, rx));
        MemoryStore {
            tx,
            task: Arc::new(task),
        }
    }

    /// Copy of the keyspace as of one consistent instant
    pub async fn snapshot(&self) -> Result<MemoryKeyspace, Error> {
        let (tx, rx) = futures::channel::oneshot::channel();
        self.tx
            .clone()
            .send(StoreCommand::Snapshot { response: tx })
            .await
            .map_err(|_| Error::SenderChannelUnavailable)?;
        rx.await.map_err(|_| Error::ReceiverChannelUnavailable)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

async fn run(mut keyspace: MemoryKeyspace, mut rx: Receiver<StoreCommand>) {
    while let Some(command) = rx.next().await {
        match command {
            StoreCommand::Eval {
                procedure,
                namespace,
                args,
                response,
            } => {
                let result = keyspace
                    .atomically(|tx| procedure::execute(tx, procedure, &namespace, &args));
                if let Err(e) = result.as_ref() {
                    tracing::debug!(%namespace, %procedure, error = %e, "procedure failed and was rolled back");
                }
                let _ = response.send(result);
            }
            StoreCommand::Snapshot { response } => {
                let _ = response.send(keyspace.clone());
            }
        }
    }
    tracing::trace!("memory store task finished");
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    async fn eval(
        &self,
        procedure: Procedure,
        namespace: &Namespace,
        args: Vec<String>,
    ) -> Result<Reply, Error> {
        let (tx, rx) = futures::channel::oneshot::channel();
        self.tx
            .clone()
            .send(StoreCommand::Eval {
                procedure,
                namespace: namespace.clone(),
                args,
                response: tx,
            })
            .await
            .map_err(|_| Error::SenderChannelUnavailable)?;
        rx.await.map_err(|_| Error::ReceiverChannelUnavailable)?
    }
}
