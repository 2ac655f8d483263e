//! # Error Types
//!
//! This module defines the crate-wide error enum and `Result` alias. Every
//! fallible operation in the driver surfaces one of five kinds:
//!
//! - [`XbaseError::Truncated`]: end of file reached inside a structure or
//!   record read. Always fatal to the operation that encountered it.
//! - [`XbaseError::Corrupt`]: a sentinel or cross-check mismatch, such as a
//!   DBT block header that does not start with `FF FF 08 00`, or an MDX tag
//!   header that disagrees with its descriptor.
//! - [`XbaseError::Unsupported`]: a variant of the file format this driver
//!   does not handle, such as an unknown MDX key type letter or a date key
//!   lookup against an NDX.
//! - [`XbaseError::InvalidArgument`]: caller error, such as a replace at
//!   BOF/EOF, an out-of-range field number, or a bad block number.
//! - [`XbaseError::Io`]: an underlying disk failure, passed through.
//!
//! No operation retries on error. A failed record read can leave the decoded
//! value set partially populated; callers should reposition the cursor.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, XbaseError>;

/// The error type for all DBF, DBT, NDX, and MDX operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum XbaseError {
    /// End of file encountered inside a structure read.
    #[error("unexpected end of file while reading {context}")]
    Truncated {
        /// What was being read when the file ran out.
        context: &'static str,
    },

    /// A sentinel or cross-check mismatch; the file is assumed corrupt.
    #[error("corrupt file: {detail}")]
    Corrupt {
        /// Description of the failed check.
        detail: String,
    },

    /// A file-format variant this driver does not implement.
    #[error("unsupported {what}: {detail}")]
    Unsupported {
        /// The category of the unsupported input.
        what: &'static str,
        /// The offending value.
        detail: String,
    },

    /// The caller passed an argument that cannot be honored.
    #[error("{0}")]
    InvalidArgument(String),

    /// A lower-level disk failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl XbaseError {
    pub(crate) fn corrupt(detail: impl Into<String>) -> Self {
        XbaseError::Corrupt {
            detail: detail.into(),
        }
    }

    pub(crate) fn unsupported(what: &'static str, detail: impl Into<String>) -> Self {
        XbaseError::Unsupported {
            what,
            detail: detail.into(),
        }
    }

    pub(crate) fn invalid(detail: impl Into<String>) -> Self {
        XbaseError::InvalidArgument(detail.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncated_names_its_context() {
        let err = XbaseError::Truncated {
            context: "DBF header",
        };
        assert_eq!(
            err.to_string(),
            "unexpected end of file while reading DBF header"
        );
    }

    #[test]
    fn io_errors_pass_through() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = XbaseError::from(io);
        assert!(matches!(err, XbaseError::Io(_)));
    }
}
