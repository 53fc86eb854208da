//! gitddb — an embedded, git-backed JSON document database.
//!
//! Every document is a file on disk under a git working tree, and every
//! mutation is a commit on the current branch. The version history of the
//! database is therefore a real git repository: clonable, diffable, and
//! mergeable with ordinary git tooling, while the API surface stays a small
//! key-value document store.
//!
//! The entry point is [`GitDocumentDb`]; see its docs for an end-to-end
//! example. Mutations are serialized through an internal single-worker
//! queue, so concurrent callers never race on the repository index, and
//! awaited results always respect call order.

mod codec;
mod crud;
mod db;
mod error;
mod queue;
mod repository;
mod types;
pub mod validate;
mod walker;

pub use codec::{
    DELETED_PROPERTY, Document, ID_PROPERTY, deserialize_document, serialize_document,
};
pub use db::GitDocumentDb;
pub use error::{Error, Result};
pub use repository::{DATABASE_CREATOR, DATABASE_VERSION, MARKER_PATH};
pub use types::{
    AllDocsOptions, AllDocsResult, CloseOptions, DEFAULT_CLOSE_TIMEOUT, DEFAULT_LOCAL_DIR,
    DatabaseInfo, DatabaseOptions, DeleteOptions, DeleteResult, DocRow, EnqueueCallback,
    PutOptions, PutResult, TaskMetadata, default_identity,
};

pub use gitddb_git::{GitOid, Identity};
