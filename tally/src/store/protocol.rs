//! Frames exchanged between a networked store and its clients.
//!
//! Each frame is one line of JSON. A client sends a [`Request`] naming the
//! procedure and receives exactly one [`Response`] carrying the same id.
//! Responses on a connection arrive in request order.

use serde::{Deserialize, Serialize};

use super::Reply;
use crate::error::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub id: u64,
    pub procedure: String,
    pub namespace: String,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub id: u64,
    pub result: Result<Reply, WireError>,
}

/// Store-side failure as carried on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WireError {
    ProcedureNotRegistered { name: String },
    InvalidArguments { reason: String },
    WrongType { key: String },
    NamespaceRequired,
    MalformedRequest { message: String },
    Other { message: String },
}

impl From<Error> for WireError {
    fn from(error: Error) -> Self {
        match error {
            Error::ProcedureNotRegistered(name) => WireError::ProcedureNotRegistered { name },
            Error::InvalidArguments(reason) => WireError::InvalidArguments { reason },
            Error::WrongType { key } => WireError::WrongType { key },
            Error::NamespaceRequired => WireError::NamespaceRequired,
            Error::SerdeJsonError(e) => WireError::MalformedRequest {
                message: e.to_string(),
            },
            other => WireError::Other {
                message: other.to_string(),
            },
        }
    }
}

impl From<WireError> for Error {
    fn from(error: WireError) -> Self {
        match error {
            WireError::ProcedureNotRegistered { name } => Error::ProcedureNotRegistered(name),
            WireError::InvalidArguments { reason } => Error::InvalidArguments(reason),
            WireError::WrongType { key } => Error::WrongType { key },
            WireError::NamespaceRequired => Error::NamespaceRequired,
            WireError::MalformedRequest { message } | WireError::Other { message } => {
                Error::OtherWithContext(message)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::{Request, Response, WireError};
    use crate::error::Error;
    use crate::store::Reply;

    #[test]
    fn request_frame() -> anyhow::Result<()> {
        let request: Request = serde_json::from_str(
            r#"{"id":7,"procedure":"train","namespace":"ns:","args":["ham","1","good","1"]}"#,
        )?;
        assert_eq!(request.id, 7);
        assert_eq!(request.procedure, "train");
        assert_eq!(request.args.len(), 4);

        let flush: Request =
            serde_json::from_str(r#"{"id":8,"procedure":"flush","namespace":"ns:"}"#)?;
        assert!(flush.args.is_empty());
        Ok(())
    }

    #[test]
    fn response_frames() -> anyhow::Result<()> {
        let response = Response {
            id: 1,
            result: Ok(Reply::Scores(vec![("spam".into(), -1.5)])),
        };
        let line = serde_json::to_string(&response)?;
        assert!(!line.contains('\n'));
        assert_eq!(serde_json::from_str::<Response>(&line)?, response);

        let line = serde_json::to_string(&Response {
            id: 2,
            result: Err(WireError::ProcedureNotRegistered {
                name: "nope".into(),
            }),
        })?;
        assert!(line.contains("procedure_not_registered"));
        Ok(())
    }

    #[test]
    fn errors_survive_the_wire() {
        let error: Error = WireError::from(Error::ProcedureNotRegistered("x".into())).into();
        assert!(matches!(error, Error::ProcedureNotRegistered(name) if name == "x"));

        let error: Error = WireError::from(Error::WrongType { key: "k".into() }).into();
        assert!(matches!(error, Error::WrongType { key } if key == "k"));

        let error: Error = WireError::from(Error::StoreUnavailable).into();
        assert!(matches!(error, Error::OtherWithContext(_)));
    }
}
