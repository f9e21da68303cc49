use std::io;

use thiserror::Error;

/// The error type for training, persistence and decoding.
#[derive(Debug, Error)]
pub enum Error {
    /// A corpus or observation line could not be parsed.
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    /// A label name outside the closed label set.
    #[error("unknown label: {0}")]
    UnknownLabel(String),

    /// Decoding was requested for a sequence without tokens.
    #[error("empty observation sequence")]
    EmptySequence,

    /// An argument or parameter value was rejected.
    #[error("{0}")]
    InvalidArgument(String),

    /// A serialized model is malformed.
    #[error("invalid model: {0}")]
    InvalidModel(&'static str),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn parse<M: Into<String>>(line: usize, message: M) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }

    pub(crate) fn invalid_argument<M: Into<String>>(message: M) -> Self {
        Self::InvalidArgument(message.into())
    }
}

/// A specialized Result type.
pub type Result<T, E = Error> = std::result::Result<T, E>;
