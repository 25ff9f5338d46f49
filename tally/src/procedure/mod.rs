//! The store-side procedures.
//!
//! Each procedure receives a namespace and a flat argument vector and runs
//! against a [`Keyspace`] as one indivisible unit. Stores guarantee that no
//! other procedure is interleaved while one is running and that a failing
//! procedure leaves nothing behind. Procedures never call each other.
pub mod args;
pub mod score;

use std::str::FromStr;

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::keyspace::Keyspace;
use crate::namespace::Namespace;
use crate::store::Reply;
use crate::tokenizer::TokenCounts;

#[derive(Hash, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Display)]
#[serde(rename_all = "lowercase")]
pub enum Procedure {
    /// Removes every label of the namespace along with the label set
    #[display(fmt = "flush")]
    Flush,

    /// Adds token counts to a label, creating it if needed
    #[display(fmt = "train")]
    Train,

    /// Removes token counts from a label, deleting it once exhausted
    #[display(fmt = "untrain")]
    Untrain,

    /// Log-likelihood of the query under every active label
    #[display(fmt = "scores")]
    Scores,

    /// Highest scoring label for the query
    #[display(fmt = "classify")]
    Classify,
}

impl Procedure {
    pub const ALL: [Procedure; 5] = [
        Procedure::Flush,
        Procedure::Train,
        Procedure::Untrain,
        Procedure::Scores,
        Procedure::Classify,
    ];
}

impl FromStr for Procedure {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Procedure::ALL
            .into_iter()
            .find(|procedure| procedure.to_string() == name)
            .ok_or_else(|| Error::ProcedureNotRegistered(name.to_string()))
    }
}

/// Runs `procedure` against `keyspace`.
///
/// The caller must hold exclusive access to the keyspace for the duration of
/// the call and discard the writes if an error is returned.
pub fn execute<K: Keyspace + ?Sized>(
    keyspace: &mut K,
    procedure: Procedure,
    namespace: &Namespace,
    args: &[String],
) -> Result<Reply, Error> {
    tracing::trace!(%namespace, %procedure, args = args.len(), "executing procedure");
    match procedure {
        Procedure::Flush => flush(keyspace, namespace).map(|_| Reply::Ok),
        Procedure::Train => {
            let (label, tokens) = args::decode_label(args)?;
            train(keyspace, namespace, &label, &tokens).map(|_| Reply::Ok)
        }
        Procedure::Untrain => {
            let (label, tokens) = args::decode_label(args)?;
            untrain(keyspace, namespace, &label, &tokens).map(|_| Reply::Ok)
        }
        Procedure::Scores => {
            let (correction, tokens) = args::decode_correction(args)?;
            score::scores(keyspace, namespace, tokens.keys(), correction).map(Reply::Scores)
        }
        Procedure::Classify => {
            let (correction, tokens) = args::decode_correction(args)?;
            score::classify(keyspace, namespace, tokens.keys(), correction).map(Reply::Label)
        }
    }
}

pub fn flush<K: Keyspace + ?Sized>(keyspace: &mut K, namespace: &Namespace) -> Result<(), Error> {
    let labels_key = namespace.labels_key();
    let labels = keyspace.members(&labels_key)?;
    for label in labels.iter() {
        keyspace.delete(&namespace.table_key(label))?;
        keyspace.delete(&namespace.tally_key(label))?;
    }
    keyspace.delete(&labels_key)?;
    tracing::debug!(%namespace, labels = labels.len(), "flushed namespace");
    Ok(())
}

pub fn train<K: Keyspace + ?Sized>(
    keyspace: &mut K,
    namespace: &Namespace,
    label: &str,
    tokens: &TokenCounts,
) -> Result<(), Error> {
    let total = checked_sum(tokens.values().copied())
        .ok_or_else(|| Error::InvalidArguments("token counts overflow".into()))?;
    if total <= 0 {
        return Ok(());
    }

    if keyspace.add_member(&namespace.labels_key(), label)? {
        tracing::debug!(%namespace, label, "created label");
    }

    let table_key = namespace.table_key(label);
    for (token, delta) in tokens.iter() {
        keyspace.increment_field(&table_key, token, *delta)?;
    }
    keyspace.increment_counter(&namespace.tally_key(label), total)?;
    Ok(())
}

pub fn untrain<K: Keyspace + ?Sized>(
    keyspace: &mut K,
    namespace: &Namespace,
    label: &str,
    tokens: &TokenCounts,
) -> Result<(), Error> {
    let table_key = namespace.table_key(label);
    for (token, delta) in tokens.iter() {
        let current = keyspace.field(&table_key, token)?.unwrap_or_default();
        if current > *delta {
            keyspace.increment_field(&table_key, token, -delta)?;
        } else {
            keyspace.remove_field(&table_key, token)?;
        }
    }

    // Recount from the table: deletions above may have removed less than `delta`.
    let tally = checked_sum(keyspace.field_values(&table_key)?)
        .ok_or_else(|| Error::InvalidArguments(format!("tally of {label} overflows")))?;
    let tally_key = namespace.tally_key(label);
    if tally <= 0 {
        keyspace.delete(&table_key)?;
        keyspace.delete(&tally_key)?;
        keyspace.remove_member(&namespace.labels_key(), label)?;
        tracing::debug!(%namespace, label, "label exhausted and removed");
    } else {
        keyspace.set_counter(&tally_key, tally)?;
    }
    Ok(())
}

fn checked_sum<I: IntoIterator<Item = i64>>(values: I) -> Option<i64> {
    values
        .into_iter()
        .try_fold(0i64, |total, value| total.checked_add(value))
}
