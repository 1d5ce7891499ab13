//! Error taxonomy of the crate reader.

use std::io;

use thiserror::Error;

/// Fatal decode errors.
///
/// Errors are raised through [anyhow::Error], so callers recover the kind with
/// `err.downcast_ref::<usdc::Error>()`.
#[derive(Error, Debug)]
pub enum Error {
    /// Structurally invalid file: bad magic, unsupported version, length mismatch,
    /// malformed table of contents, out of range index.
    #[error("Malformed crate data: {0}")]
    Format(String),

    /// A read returned fewer bytes than requested.
    #[error("Unexpected end of data while reading {what}")]
    Truncated {
        what: String,
        #[source]
        source: io::Error,
    },

    /// Flag combination that is invalid for a value type (inlined array, compressed inline value, ...).
    #[error("Unsupported value representation: {0}")]
    UnsupportedValue(String),
}

impl Error {
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedValue(msg.into())
    }

    pub fn truncated(what: impl Into<String>, source: io::Error) -> Self {
        Self::Truncated {
            what: what.into(),
            source,
        }
    }

    /// Whether this is a format-class error (truncation counts as one).
    #[inline]
    pub fn is_format(&self) -> bool {
        matches!(self, Error::Format(_) | Error::Truncated { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind() {
        let err = Error::truncated("pod", io::Error::from(io::ErrorKind::UnexpectedEof));
        assert!(err.is_format());
        assert!(err.to_string().contains("pod"));

        assert!(Error::format("bad magic").is_format());
        assert!(!Error::unsupported("inlined array").is_format());
    }

    #[test]
    fn test_downcast_through_context() {
        use anyhow::Context as _;

        let result: anyhow::Result<()> = Err(anyhow::Error::new(Error::format("bad magic")));
        let err = result.context("Unable to read header").unwrap_err();

        let kind = err.downcast_ref::<Error>().expect("typed error must survive context");
        assert!(kind.is_format());
    }
}
