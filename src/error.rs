//! Error types.
//!
//! User input errors (bad literals, bad line directives) carry the position
//! the tracker had reached when the problem was detected and render like
//! `line 3:14, overflow of integer literal '...'`. Internal consistency
//! errors mean the grammar misused the builder and are reported separately.

use thiserror::Error;

use crate::codec::DecodeError;
use crate::literal::LiteralError;
use crate::position::Position;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ErrorKind {
    MalformedLiteral,
    NumericOverflow,
    NumericUnderflow,
    MalformedEscape,
    MalformedReposition,
    InternalConsistency,
    BufferTooShort,
    SizeMismatch,
    Io,
}

/// Errors produced while building, writing or decoding a tree.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum Error {
    /// A token could not be turned into a literal node.
    #[error("line {position}, {source}")]
    Literal {
        position: Position,
        source: LiteralError,
    },
    /// A `#line`-style directive did not parse.
    #[error("line {position}, could not parse line directive '{directive}'")]
    MalformedReposition { position: Position, directive: String },
    /// The builder was used in a way that can only be a bug in the caller.
    #[error("internal consistency error: {0}")]
    InternalConsistency(String),
    /// Encoded bytes are not a well-formed node.
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// Writing the tree failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an internal consistency error.
    pub fn internal(message: impl Into<String>) -> Self {
        Error::InternalConsistency(message.into())
    }

    /// The classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Literal { source, .. } => source.kind(),
            Error::MalformedReposition { .. } => ErrorKind::MalformedReposition,
            Error::InternalConsistency(_) => ErrorKind::InternalConsistency,
            Error::Decode(err) => err.kind(),
            Error::Io(_) => ErrorKind::Io,
        }
    }

    /// The source position this error was reported at, if any.
    pub fn position(&self) -> Option<Position> {
        match self {
            Error::Literal { position, .. } | Error::MalformedReposition { position, .. } => {
                Some(*position)
            }
            _ => None,
        }
    }

    /// Whether this error is a defect in the caller rather than bad input.
    pub fn is_internal(&self) -> bool {
        self.kind() == ErrorKind::InternalConsistency
    }
}
