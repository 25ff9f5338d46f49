use std::{net::SocketAddr, path::PathBuf};

use clap::{Parser, Subcommand};
use tally::{
    config::{Config, StoreSetting},
    Classifier, WordTokenizer,
};
use tally_store_remote::RemoteStore;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[clap(name = "tally-client")]
struct Opt {
    /// Configuration file in TOML format. Defaults to a local development setup
    #[clap(long)]
    config: Option<PathBuf>,

    /// Address of the tally server. Overrides the configuration file
    #[clap(long)]
    server: Option<SocketAddr>,

    /// Namespace prefix for every key. Overrides the configuration file
    #[clap(long)]
    namespace: Option<String>,

    /// Correction constant used for unseen tokens. Overrides the configuration file
    #[clap(long)]
    correction: Option<f64>,

    /// Ignore tokens shorter than this many characters
    #[clap(long, default_value_t = 1)]
    min_token_length: usize,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Add the tokens of TEXT to LABEL
    Train { label: String, text: Vec<String> },
    /// Remove the tokens of TEXT from LABEL
    Untrain { label: String, text: Vec<String> },
    /// Print the best label for TEXT
    Classify { text: Vec<String> },
    /// Print the score of TEXT under every label
    Scores { text: Vec<String> },
    /// Remove every label in the namespace
    Flush,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let opts = Opt::parse();

    let mut config = match opts.config.as_ref() {
        Some(path) => Config::from_file(path)?,
        None => Config::development(),
    };
    if let Some(namespace) = opts.namespace {
        config.namespace = namespace;
    }
    if let Some(correction) = opts.correction {
        config.correction = correction;
    }
    if let Some(address) = opts.server {
        config.store = match config.store {
            StoreSetting::Remote { timeout_ms, .. } => StoreSetting::Remote {
                address,
                timeout_ms,
            },
            StoreSetting::Memory => StoreSetting::Remote {
                address,
                timeout_ms: tally::config::DEFAULT_TIMEOUT_MS,
            },
        };
    }

    let store = RemoteStore::from_setting(&config.store)
        .map_err(|_| anyhow::anyhow!("tally-client requires a remote store setting"))?;

    let classifier = Classifier::builder()
        .set_config(&config)
        .set_tokenizer(WordTokenizer::with_min_length(opts.min_token_length))
        .set_store(store)
        .finalize()?;

    match opts.command {
        Command::Train { label, text } => {
            let tokens = classifier.train(&label, &text.join(" ")).await?;
            println!("trained {label} with {} tokens", tokens.len());
        }
        Command::Untrain { label, text } => {
            let tokens = classifier.untrain(&label, &text.join(" ")).await?;
            println!("untrained {label} with {} tokens", tokens.len());
        }
        Command::Classify { text } => match classifier.classify(&text.join(" ")).await? {
            Some(label) => println!("{label}"),
            None => println!("(none)"),
        },
        Command::Scores { text } => {
            for (label, score) in classifier.scores(&text.join(" ")).await? {
                println!("{label}\t{score:.6}");
            }
        }
        Command::Flush => {
            classifier.flush().await?;
            println!("flushed {}", classifier.namespace());
        }
    }

    Ok(())
}
