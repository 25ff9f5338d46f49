use std::collections::BTreeMap;

use crate::config::{Config, DEFAULT_CORRECTION};
use crate::error::Error;
use crate::namespace::Namespace;
use crate::procedure::{args, Procedure};
use crate::store::Store;
use crate::tokenizer::{self, TokenCounts, Tokenizer};

/// Naive Bayes classifier whose state lives entirely in a [`Store`].
///
/// Nothing is cached between calls. Every operation tokenizes its input and
/// submits exactly one procedure to the store, which applies it atomically.
/// Concurrent callers sharing the namespace observe each operation either
/// fully applied or not at all.
#[derive(Clone)]
pub struct Classifier<T: Tokenizer> {
    namespace: Namespace,
    correction: f64,
    tokenizer: T,
    store: Box<dyn Store>,
}

impl<T: Tokenizer> std::fmt::Debug for Classifier<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Classifier")
            .field("namespace", &self.namespace)
            .field("correction", &self.correction)
            .field("store", &self.store.id())
            .finish()
    }
}

impl<T: Tokenizer> Classifier<T> {
    pub fn builder() -> ClassifierBuilder<T> {
        ClassifierBuilder::default()
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn correction(&self) -> f64 {
        self.correction
    }

    fn tokenize(&self, item: &T::Item) -> Result<TokenCounts, Error> {
        let tokens = self.tokenizer.tokenize(item);
        tokenizer::validate(&tokens)?;
        Ok(tokens)
    }

    /// Adds the tokens of `item` to `label`. Returns the occurrence map that was applied.
    #[tracing::instrument(skip(self, item), fields(namespace = %self.namespace))]
    pub async fn train(&self, label: &str, item: &T::Item) -> Result<TokenCounts, Error> {
        if label.is_empty() {
            return Err(Error::InvalidLabel);
        }
        let tokens = self.tokenize(item)?;
        self.store
            .eval(
                Procedure::Train,
                &self.namespace,
                args::encode_label(label, &tokens),
            )
            .await?
            .into_ok()?;
        Ok(tokens)
    }

    /// Removes the tokens of `item` from `label`. The label is deleted once its tally reaches zero.
    #[tracing::instrument(skip(self, item), fields(namespace = %self.namespace))]
    pub async fn untrain(&self, label: &str, item: &T::Item) -> Result<TokenCounts, Error> {
        if label.is_empty() {
            return Err(Error::InvalidLabel);
        }
        let tokens = self.tokenize(item)?;
        self.store
            .eval(
                Procedure::Untrain,
                &self.namespace,
                args::encode_label(label, &tokens),
            )
            .await?
            .into_ok()?;
        Ok(tokens)
    }

    /// Highest scoring label for `item`.
    ///
    /// `None` when no label holds a token of `item`, even though
    /// [`Classifier::scores`] still ranks the labels on the correction constant
    /// alone. Otherwise the argmax of `scores`, ties going to the
    /// lexicographically smallest label.
    #[tracing::instrument(skip(self, item), fields(namespace = %self.namespace))]
    pub async fn classify(&self, item: &T::Item) -> Result<Option<String>, Error> {
        let tokens = self.tokenize(item)?;
        self.store
            .eval(
                Procedure::Classify,
                &self.namespace,
                args::encode_correction(self.correction, &tokens),
            )
            .await?
            .into_label()
    }

    /// Log-likelihood of `item` under every label with a positive tally
    #[tracing::instrument(skip(self, item), fields(namespace = %self.namespace))]
    pub async fn scores(&self, item: &T::Item) -> Result<BTreeMap<String, f64>, Error> {
        let tokens = self.tokenize(item)?;
        let scores = self
            .store
            .eval(
                Procedure::Scores,
                &self.namespace,
                args::encode_correction(self.correction, &tokens),
            )
            .await?
            .into_scores()?;
        Ok(scores.into_iter().collect())
    }

    /// Removes every label this classifier could have created
    #[tracing::instrument(skip(self), fields(namespace = %self.namespace))]
    pub async fn flush(&self) -> Result<(), Error> {
        self.store
            .eval(Procedure::Flush, &self.namespace, vec![])
            .await?
            .into_ok()
    }
}

pub struct ClassifierBuilder<T: Tokenizer> {
    namespace: Option<String>,
    correction: f64,
    tokenizer: Option<T>,
    store: Option<Box<dyn Store>>,
}

impl<T: Tokenizer> Default for ClassifierBuilder<T> {
    fn default() -> Self {
        ClassifierBuilder {
            namespace: None,
            correction: DEFAULT_CORRECTION,
            tokenizer: None,
            store: None,
        }
    }
}

impl<T: Tokenizer> ClassifierBuilder<T> {
    /// Takes namespace and correction from `config`. The store is chosen by the caller.
    pub fn set_config(mut self, config: &Config) -> Self {
        self.namespace = Some(config.namespace.clone());
        self.correction = config.correction;
        self
    }

    pub fn set_namespace<S: Into<String>>(mut self, namespace: S) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn set_correction(mut self, correction: f64) -> Self {
        self.correction = correction;
        self
    }

    pub fn set_tokenizer(mut self, tokenizer: T) -> Self {
        self.tokenizer = Some(tokenizer);
        self
    }

    pub fn set_store<S: Store + 'static>(mut self, store: S) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    pub fn finalize(self) -> Result<Classifier<T>, Error> {
        let namespace = Namespace::new(self.namespace.unwrap_or_default())?;
        let tokenizer = self.tokenizer.ok_or(Error::TokenizerRequired)?;
        let store = self.store.ok_or(Error::StoreRequired)?;
        if !args::is_valid_correction(self.correction) {
            return Err(Error::InvalidCorrection(self.correction));
        }

        tracing::debug!(%namespace, store = %store.name(), "classifier ready");

        Ok(Classifier {
            namespace,
            correction: self.correction,
            tokenizer,
            store,
        })
    }
}
