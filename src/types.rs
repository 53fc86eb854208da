//! Public result, option, and metadata types.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use gitddb_git::{GitOid, Identity};

use crate::codec::Document;

/// Default parent directory for databases when none is configured.
pub const DEFAULT_LOCAL_DIR: &str = "./git-documentdb";

/// Default timeout for a graceful close.
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Identity stamped on commits when none is configured.
#[must_use]
pub fn default_identity() -> Identity {
    Identity::new("GitDocumentDB", "system@gdd.localhost")
}

// ---------------------------------------------------------------------------
// Constructor options
// ---------------------------------------------------------------------------

/// Options for constructing a [`GitDocumentDb`](crate::GitDocumentDb).
#[derive(Clone, Debug)]
pub struct DatabaseOptions {
    /// Name of the database; becomes the final component of the working
    /// directory. Required.
    pub db_name: String,
    /// Parent directory the working directory lives under.
    pub local_dir: PathBuf,
    /// Author/committer identity for generated commits.
    pub identity: Identity,
    /// Maximum accepted document-id length.
    pub max_document_id_length: usize,
}

impl DatabaseOptions {
    /// Options with defaults for everything but the database name.
    pub fn new(db_name: impl Into<String>) -> Self {
        Self {
            db_name: db_name.into(),
            local_dir: PathBuf::from(DEFAULT_LOCAL_DIR),
            identity: default_identity(),
            max_document_id_length: crate::validate::MAX_DOCUMENT_ID_LENGTH,
        }
    }

    /// Place the database under `local_dir` instead of the default.
    #[must_use]
    pub fn local_dir(mut self, local_dir: impl Into<PathBuf>) -> Self {
        self.local_dir = local_dir.into();
        self
    }

    /// Stamp commits with `identity` instead of the default.
    #[must_use]
    pub fn identity(mut self, identity: Identity) -> Self {
        self.identity = identity;
        self
    }
}

// ---------------------------------------------------------------------------
// Open classification
// ---------------------------------------------------------------------------

/// What [`open`](crate::GitDocumentDb::open) found on disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatabaseInfo {
    /// A fresh repository was initialized by this open call.
    pub is_new: bool,
    /// The marker document identifies this system as the repository creator.
    pub is_created_by_gitddb: bool,
    /// The marker's version matches the running engine version.
    pub is_valid_version: bool,
    /// The database id recorded in the marker, when present.
    pub db_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Operation results
// ---------------------------------------------------------------------------

/// Result of a successful put / insert / update.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PutResult {
    /// The document id.
    pub id: String,
    /// OID of the committed document blob. A pure function of the canonical
    /// encoding of the body.
    pub file_oid: GitOid,
    /// OID of the commit that recorded the mutation.
    pub commit_oid: GitOid,
}

/// Result of a successful delete.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeleteResult {
    /// The document id.
    pub id: String,
    /// OID of the blob as it existed *before* deletion.
    pub file_oid: GitOid,
    /// OID of the commit that recorded the deletion.
    pub commit_oid: GitOid,
}

/// One row of an [`all_docs`](crate::GitDocumentDb::all_docs) listing.
#[derive(Clone, Debug, PartialEq)]
pub struct DocRow {
    /// The document id (full path, without the `.json` extension).
    pub id: String,
    /// OID of the document blob.
    pub file_oid: GitOid,
    /// The parsed document, when `include_docs` was requested.
    pub doc: Option<Document>,
}

/// Result of an [`all_docs`](crate::GitDocumentDb::all_docs) scan.
#[derive(Clone, Debug, PartialEq)]
pub struct AllDocsResult {
    /// Number of rows; equals `rows.len()`.
    pub total_rows: usize,
    /// The commit the listing was taken from; `None` when the repository
    /// has no commits or the targeted sub-directory is absent.
    pub commit_oid: Option<GitOid>,
    /// The listed documents, in walk order.
    pub rows: Vec<DocRow>,
}

impl AllDocsResult {
    pub(crate) const fn empty() -> Self {
        Self {
            total_rows: 0,
            commit_oid: None,
            rows: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Task metadata
// ---------------------------------------------------------------------------

/// Metadata describing a queued mutation, handed to enqueue callbacks.
#[derive(Clone, Debug)]
pub struct TaskMetadata {
    /// Caller-supplied or generated task id.
    pub task_id: String,
    /// The operation kind: `"put"`, `"insert"`, `"update"`, or `"delete"`.
    pub label: &'static str,
    /// The document id the task targets.
    pub target_id: String,
    /// When the task entered the queue.
    pub enqueued_at: SystemTime,
}

/// Callback invoked once a mutation has been accepted by the queue.
pub type EnqueueCallback = Arc<dyn Fn(&TaskMetadata) + Send + Sync>;

// ---------------------------------------------------------------------------
// Operation options
// ---------------------------------------------------------------------------

/// Options for put / insert / update.
#[derive(Clone, Default)]
pub struct PutOptions {
    /// Replaces the generated `insert:`/`update:` commit message.
    pub commit_message: Option<String>,
    /// Explicit task id; generated when absent.
    pub task_id: Option<String>,
    /// Invoked with the task metadata once the mutation is enqueued.
    pub enqueue_callback: Option<EnqueueCallback>,
}

/// Options for delete.
#[derive(Clone, Default)]
pub struct DeleteOptions {
    /// Replaces the generated `delete:` commit message.
    pub commit_message: Option<String>,
    /// Explicit task id; generated when absent.
    pub task_id: Option<String>,
    /// Invoked with the task metadata once the mutation is enqueued.
    pub enqueue_callback: Option<EnqueueCallback>,
}

/// Options for [`all_docs`](crate::GitDocumentDb::all_docs).
#[derive(Clone, Debug, Default)]
pub struct AllDocsOptions {
    /// Parse and attach each document body.
    pub include_docs: bool,
    /// Invert the name ordering at every directory level.
    pub descending: bool,
    /// Restrict the walk to a sub-directory of the root tree.
    pub sub_directory: Option<String>,
    /// Descend into subdirectories (breadth-first).
    pub recursive: bool,
}

/// Options for [`close_with`](crate::GitDocumentDb::close_with).
#[derive(Clone, Debug)]
pub struct CloseOptions {
    /// Discard pending tasks instead of draining them.
    pub force: bool,
    /// How long a graceful close waits for the queue to drain.
    pub timeout: Duration,
}

impl Default for CloseOptions {
    fn default() -> Self {
        Self {
            force: false,
            timeout: DEFAULT_CLOSE_TIMEOUT,
        }
    }
}
