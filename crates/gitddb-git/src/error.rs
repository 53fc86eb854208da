//! Error types for git operations.
//!
//! [`GitError`] is the single error type returned by all
//! [`DocRepo`](crate::DocRepo) trait methods. Variants are coarse on purpose:
//! the engine crate maps them onto its own user-facing taxonomy, so all this
//! layer needs to distinguish is "missing", "invalid input", "I/O", and
//! "backend said no".

use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by [`DocRepo`](crate::DocRepo) operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// A requested object or path was not found.
    #[error("not found: {message}")]
    NotFound {
        /// Human-readable description of what was missing.
        message: String,
    },

    /// A repository could not be opened or initialized.
    #[error("cannot open repository at {}: {message}", path.display())]
    CannotOpen {
        /// Path that was being opened.
        path: PathBuf,
        /// Details from the backend.
        message: String,
    },

    /// An OID string could not be parsed or was otherwise invalid.
    #[error("invalid OID `{value}`: {reason}")]
    InvalidOid {
        /// The raw value that failed validation.
        value: String,
        /// Why validation failed.
        reason: String,
    },

    /// An I/O error occurred (file system access below the git layer).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The underlying git backend returned an unclassified error.
    ///
    /// The `message` should include enough context to diagnose the failure.
    #[error("git backend error: {message}")]
    Backend {
        /// Freeform error description from the backend.
        message: String,
    },
}

impl GitError {
    pub(crate) fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    pub(crate) fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }
}
