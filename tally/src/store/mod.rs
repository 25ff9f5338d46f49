pub mod protocol;

use dyn_clone::DynClone;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::namespace::Namespace;
use crate::procedure::Procedure;
use crate::Extension;

/// Result of a procedure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "value")]
pub enum Reply {
    /// Mutation applied
    Ok,
    /// Label/score pairs, ordered by label
    Scores(Vec<(String, f64)>),
    /// Winning label, if any
    Label(Option<String>),
}

impl Reply {
    pub fn into_scores(self) -> Result<Vec<(String, f64)>, Error> {
        match self {
            Reply::Scores(scores) => Ok(scores),
            _ => Err(Error::UnexpectedReply),
        }
    }

    pub fn into_label(self) -> Result<Option<String>, Error> {
        match self {
            Reply::Label(label) => Ok(label),
            _ => Err(Error::UnexpectedReply),
        }
    }

    pub fn into_ok(self) -> Result<(), Error> {
        match self {
            Reply::Ok => Ok(()),
            _ => Err(Error::UnexpectedReply),
        }
    }
}

/// Shared key-value store able to run a [`Procedure`] as one indivisible unit.
///
/// Implementations must never interleave two procedures and must not let a
/// failed procedure leave partial writes behind. A [`Error::Timeout`] means the
/// effect of the call is unknown.
#[async_trait::async_trait]
pub trait Store: Extension + Send + Sync + DynClone {
    async fn eval(
        &self,
        procedure: Procedure,
        namespace: &Namespace,
        args: Vec<String>,
    ) -> Result<Reply, Error>;
}

dyn_clone::clone_trait_object!(Store);
