use std::net::SocketAddr;
use std::time::Duration;

use tally::{
    error::Error,
    keyspace::Keyspace,
    procedure::Procedure,
    store::protocol::{Response, WireError},
    Classifier, Namespace, Reply, Store, WordTokenizer,
};
use tally_server::{process, Server};
use tally_store_memory::MemoryStore;
use tally_store_remote::RemoteStore;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

const TIMEOUT: Duration = Duration::from_secs(5);

async fn spawn_server() -> anyhow::Result<(SocketAddr, MemoryStore)> {
    let store = MemoryStore::new();
    let server = Server::bind("127.0.0.1:0".parse()?, store.clone()).await?;
    let address = server.local_addr()?;
    tokio::spawn(server.run());
    Ok((address, store))
}

fn classifier(store: RemoteStore, namespace: &str) -> anyhow::Result<Classifier<WordTokenizer>> {
    Ok(Classifier::builder()
        .set_namespace(namespace)
        .set_tokenizer(WordTokenizer::new())
        .set_store(store)
        .finalize()?)
}

#[tokio::test]
async fn scenario_over_the_network() -> anyhow::Result<()> {
    let (address, store) = spawn_server().await?;
    let classifier = classifier(RemoteStore::connect(address, TIMEOUT).await?, "net:")?;

    classifier.train("ham", "good message").await?;
    classifier.train("spam", "nigeria help").await?;

    let scores = classifier.scores("nigeria help").await?;
    assert!(scores["spam"] > scores["ham"]);
    assert_eq!(classifier.classify("nigeria help").await?, Some("spam".into()));

    classifier.untrain("spam", "nigeria help").await?;
    assert_eq!(
        classifier.scores("nigeria").await?.keys().collect::<Vec<_>>(),
        vec!["ham"]
    );

    classifier.flush().await?;
    assert!(store.snapshot().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn clients_share_one_keyspace() -> anyhow::Result<()> {
    let (address, store) = spawn_server().await?;
    let first = classifier(RemoteStore::new(address, TIMEOUT), "shared:")?;
    let second = classifier(RemoteStore::new(address, TIMEOUT), "shared:")?;

    let mut handles = vec![];
    for classifier in [first.clone(), second.clone()] {
        handles.push(tokio::spawn(async move {
            for _ in 0..20 {
                classifier.train("ham", "good day").await?;
            }
            Ok::<_, Error>(())
        }));
    }
    for handle in handles {
        handle.await??;
    }

    let namespace = Namespace::new("shared:")?;
    let snapshot = store.snapshot().await?;
    assert_eq!(snapshot.counter(&namespace.tally_key("ham"))?, Some(80));
    assert_eq!(snapshot.field(&namespace.table_key("ham"), "good")?, Some(40));
    Ok(())
}

#[tokio::test]
async fn store_errors_keep_their_kind() -> anyhow::Result<()> {
    let (address, _store) = spawn_server().await?;
    let remote = RemoteStore::new(address, TIMEOUT);
    let namespace = Namespace::new("err:")?;

    let result = remote
        .eval(Procedure::Train, &namespace, vec!["ham".into(), "3".into()])
        .await;
    assert!(matches!(result, Err(Error::InvalidArguments(_))));

    // The connection is still usable after a store-side error.
    let reply = remote.eval(Procedure::Flush, &namespace, vec![]).await?;
    assert_eq!(reply, Reply::Ok);
    Ok(())
}

#[tokio::test]
async fn unknown_procedure_is_reported() -> anyhow::Result<()> {
    let (address, _store) = spawn_server().await?;
    let stream = TcpStream::connect(address).await?;
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();

    write
        .write_all(b"{\"id\":42,\"procedure\":\"evalsha\",\"namespace\":\"x:\",\"args\":[]}\n")
        .await?;
    let line = lines.next_line().await?.expect("response line");
    let response: Response = serde_json::from_str(&line)?;
    assert_eq!(response.id, 42);
    assert_eq!(
        response.result,
        Err(WireError::ProcedureNotRegistered {
            name: "evalsha".into()
        })
    );

    write.write_all(b"not json\n").await?;
    let line = lines.next_line().await?.expect("response line");
    let response: Response = serde_json::from_str(&line)?;
    assert!(matches!(
        response.result,
        Err(WireError::MalformedRequest { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn process_rejects_empty_namespace() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let response = process(
        &store,
        r#"{"id":1,"procedure":"flush","namespace":"","args":[]}"#,
    )
    .await;
    assert_eq!(response.result, Err(WireError::NamespaceRequired));
    Ok(())
}

#[tokio::test]
async fn silent_store_times_out() -> anyhow::Result<()> {
    // Accepts connections but never answers.
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let address = listener.local_addr()?;
    tokio::spawn(async move {
        let mut held = vec![];
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });

    let remote = RemoteStore::new(address, Duration::from_millis(200));
    let namespace = Namespace::new("slow:")?;
    let result = remote.eval(Procedure::Flush, &namespace, vec![]).await;
    assert!(matches!(result, Err(Error::Timeout)));
    Ok(())
}

#[tokio::test]
async fn unreachable_store_fails() -> anyhow::Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let address = listener.local_addr()?;
    drop(listener);

    let result = RemoteStore::connect(address, TIMEOUT).await;
    assert!(result.is_err());
    Ok(())
}
