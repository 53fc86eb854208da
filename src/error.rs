//! The unified error type for database operations.
//!
//! Every public operation returns [`Error`]. Validation variants surface
//! synchronously (before a task reaches the queue); I/O and domain variants
//! surface through the operation's future; lifecycle variants can surface
//! either way depending on when the database state changed.

use std::path::PathBuf;

use thiserror::Error;

use gitddb_git::GitError;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by database operations.
#[derive(Debug, Error)]
pub enum Error {
    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------
    /// The combined working-directory path exceeds the platform limit.
    #[error(
        "working directory path is too long ({len} > {max}): {}",
        path.display()
    )]
    InvalidWorkingDirectoryPathLength {
        /// The offending path.
        path: PathBuf,
        /// Its length in characters.
        len: usize,
        /// The enforced maximum.
        max: usize,
    },

    /// A document id contains a forbidden character or shape.
    #[error("invalid character in document id '{id}': {reason}")]
    InvalidIdCharacter {
        /// The rejected id.
        id: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A document id is empty or longer than the configured maximum.
    #[error("invalid document id length for '{id}': {len} not in 1..={max}")]
    InvalidIdLength {
        /// The rejected id.
        id: String,
        /// Its length in characters.
        len: usize,
        /// The enforced maximum.
        max: usize,
    },

    /// A sub-directory / collection path contains a forbidden character.
    #[error("invalid character in collection path '{path}': {reason}")]
    InvalidCollectionPathCharacter {
        /// The rejected path.
        path: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A document body could not be parsed or serialized as a JSON object.
    #[error("invalid JSON object: {message}")]
    InvalidJsonObject {
        /// Parser or shape diagnostics.
        message: String,
    },

    /// A top-level property name is reserved (leading `_` other than
    /// `_id` / `_deleted`).
    #[error("invalid property name in document: '{name}'")]
    InvalidPropertyNameInDocument {
        /// The offending property name.
        name: String,
    },

    /// No document id was given and the body carries no `_id`.
    #[error("document id is undefined")]
    UndefinedDocumentId,

    /// The database name is missing or empty.
    #[error("database name is undefined")]
    UndefinedDatabaseName,

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------
    /// The operation needs an open repository handle.
    #[error("repository is not open")]
    RepositoryNotOpen,

    /// The database is closing; no new operations are accepted.
    #[error("database is closing")]
    DatabaseClosing,

    /// A graceful close did not drain the task queue within its timeout.
    #[error("database close timed out after {timeout_ms} ms")]
    DatabaseCloseTimeout {
        /// The timeout that elapsed.
        timeout_ms: u64,
    },

    /// The on-disk repository could not be opened or initialized.
    #[error("cannot open repository at {}: {message}", path.display())]
    CannotOpenRepository {
        /// The working directory.
        path: PathBuf,
        /// Backend diagnostics.
        message: String,
    },

    // -----------------------------------------------------------------------
    // I/O
    // -----------------------------------------------------------------------
    /// A directory under the working tree could not be created.
    #[error("cannot create directory {}: {source}", path.display())]
    CannotCreateDirectory {
        /// The directory that failed.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A document file could not be written.
    #[error("cannot write data at {}: {source}", path.display())]
    CannotWriteData {
        /// The file that failed.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A document file could not be removed.
    #[error("cannot delete data at {}: {source}", path.display())]
    CannotDeleteData {
        /// The file that failed.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A tree or index entry could not be read.
    #[error("cannot get entry '{path}': {message}")]
    CannotGetEntry {
        /// The path being resolved.
        path: String,
        /// Backend diagnostics.
        message: String,
    },

    /// The repository contents contradict what the engine wrote.
    #[error("corrupted repository: {message}")]
    CorruptedRepository {
        /// What was found to be inconsistent.
        message: String,
    },

    // -----------------------------------------------------------------------
    // Domain
    // -----------------------------------------------------------------------
    /// The addressed document does not exist.
    #[error("document not found: '{id}'")]
    DocumentNotFound {
        /// The id that failed to resolve.
        id: String,
    },

    /// `insert` was called for an id that already exists.
    #[error("a document with id '{id}' already exists")]
    SameIdExists {
        /// The conflicting id.
        id: String,
    },

    /// A back-number outside the representable range was requested.
    #[error("invalid back number: {value}")]
    InvalidBackNumber {
        /// The rejected value.
        value: i64,
    },

    // -----------------------------------------------------------------------
    // Bridge
    // -----------------------------------------------------------------------
    /// An unclassified failure from the git layer.
    #[error(transparent)]
    Git(#[from] GitError),
}
