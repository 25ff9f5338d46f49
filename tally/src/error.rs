/// Errors produced by the classifier, its procedures and the store backends.
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    //Configuration Errors
    #[error("Namespace is required and cannot be empty")]
    NamespaceRequired,
    #[error("Tokenizer is required")]
    TokenizerRequired,
    #[error("Store is required")]
    StoreRequired,
    #[error("Correction constant must be a positive finite number. Supplied: {0}")]
    InvalidCorrection(f64),

    //Facade Errors
    #[error("Label cannot be empty")]
    InvalidLabel,
    #[error("Tokenizer produced count {count} for token \"{token}\". Counts must be positive")]
    TokenizerContract { token: String, count: i64 },

    //Procedure Errors
    #[error("Procedure \"{0}\" is not registered with the store")]
    ProcedureNotRegistered(String),
    #[error("Invalid procedure arguments: {0}")]
    InvalidArguments(String),
    #[error("Key \"{key}\" holds a value of the wrong kind for this operation")]
    WrongType { key: String },
    #[error("Reply does not match the procedure that was invoked")]
    UnexpectedReply,

    //Store Errors
    #[error("Store is unavailable")]
    StoreUnavailable,
    #[error("Request timed out. The procedure may or may not have been applied")]
    Timeout,
    #[error("Connection to the store was closed")]
    ConnectionClosed,
    #[error("Sender Channel Unavailable")]
    SenderChannelUnavailable,
    #[error("Receiver Channel Unavailable")]
    ReceiverChannelUnavailable,

    //Misc
    #[error("{0}")]
    OtherWithContext(String),
    #[error("{0}")]
    SerdeJsonError(#[from] serde_json::Error),
    #[error("{0}")]
    TomlError(#[from] toml::de::Error),
    #[error(transparent)]
    Any(#[from] anyhow::Error),
    #[error("{0}")]
    IoError(#[from] std::io::Error),
    #[error("An unknown error has occurred")]
    Other,
}

impl Error {
    /// Short, stable identifier of the variant. Used as the error kind on the wire.
    pub fn enum_to_string(&self) -> String {
        match self {
            Error::NamespaceRequired => "namespace_required",
            Error::TokenizerRequired => "tokenizer_required",
            Error::StoreRequired => "store_required",
            Error::InvalidCorrection(_) => "invalid_correction",
            Error::InvalidLabel => "invalid_label",
            Error::TokenizerContract { .. } => "tokenizer_contract",
            Error::ProcedureNotRegistered(_) => "procedure_not_registered",
            Error::InvalidArguments(_) => "invalid_arguments",
            Error::WrongType { .. } => "wrong_type",
            Error::UnexpectedReply => "unexpected_reply",
            Error::StoreUnavailable => "store_unavailable",
            Error::Timeout => "timeout",
            Error::ConnectionClosed => "connection_closed",
            Error::SenderChannelUnavailable => "sender_channel_unavailable",
            Error::ReceiverChannelUnavailable => "receiver_channel_unavailable",
            Error::OtherWithContext(_) => "other_with_context",
            Error::SerdeJsonError(_) => "serde_json_error",
            Error::TomlError(_) => "toml_error",
            Error::Any(_) => "any",
            Error::IoError(_) => "io_error",
            Error::Other => "other",
        }
        .into()
    }
}
