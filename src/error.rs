//! Error types
//!
//! Only startup (bind, thread and runtime creation) and client-side decoding can
//! fail in a way a caller sees. Per-connection write failures never surface here;
//! they prune the connection instead.

use std::fmt;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug)]
pub enum Error {
    /// Socket or thread I/O failure
    Io(std::io::Error),
    /// Malformed status line
    Protocol(ProtocolError),
    /// An execution context could not be started
    Runtime(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Protocol(e) => write!(f, "Protocol error: {}", e),
            Error::Runtime(msg) => write!(f, "Runtime error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Protocol(e) => Some(e),
            Error::Runtime(_) => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        Error::Protocol(e)
    }
}

/// Errors raised while decoding a `pc=...|` status line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Line does not start with `pc=`
    MissingPrefix,
    /// Line does not end with `|`
    MissingTerminator,
    /// Wrong number of `;`-separated fields
    FieldCount(usize),
    /// A field could not be parsed as a number
    InvalidField {
        field: &'static str,
        value: String,
    },
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::MissingPrefix => write!(f, "Status line is missing the 'pc=' prefix"),
            ProtocolError::MissingTerminator => write!(f, "Status line is missing the '|' terminator"),
            ProtocolError::FieldCount(n) => write!(f, "Expected 4 fields, found {}", n),
            ProtocolError::InvalidField { field, value } => {
                write!(f, "Invalid {} field: {:?}", field, value)
            }
        }
    }
}

impl std::error::Error for ProtocolError {}
