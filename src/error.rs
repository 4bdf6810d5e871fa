//! Error types
//!
//! Malformed client input (a garbled `Range` or `If-None-Match` value) is never
//! reported here; those surface as ordinary result values. The variants below
//! describe caller misuse, contradictory requests, and I/O failures.

use std::io;

/// Errors raised while evaluating or sending a response
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing resource identity or a timestamp that cannot be interpreted
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The request combined cache-direction and precondition-direction headers
    #[error("undefined result: {0}")]
    UndefinedResult(String),

    /// The response was already committed when the handler was invoked
    #[error("cannot create response, headers already sent")]
    HeadersSent,

    /// Resource open/read/close or sink failure
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub(crate) fn undefined_result(message: impl Into<String>) -> Self {
        Self::UndefinedResult(message.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            Error::invalid_argument("no validators").to_string(),
            "invalid argument: no validators"
        );
        assert_eq!(
            Error::undefined_result("conflict").to_string(),
            "undefined result: conflict"
        );
        assert_eq!(
            Error::HeadersSent.to_string(),
            "cannot create response, headers already sent"
        );
    }

    #[test]
    fn test_io_conversion() {
        let err: Error = io::Error::new(io::ErrorKind::UnexpectedEof, "short read").into();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.to_string(), "short read");
    }
}
