//! The [`DocRepo`] trait — the single abstraction boundary between the
//! document engine and git.
//!
//! The engine crate interacts with git exclusively through this trait. The
//! trait is object-safe so callers can share an `Arc<dyn DocRepo>` between
//! the queue worker and concurrent readers.
//!
//! # Concurrency
//!
//! Implementations must be `Send + Sync`, but the *mutating* method
//! ([`commit_changes`](DocRepo::commit_changes)) is not internally
//! synchronized against itself — the engine's task queue guarantees at most
//! one mutation is in flight. Read methods may run concurrently with the
//! single active writer.

use std::path::Path;

use crate::error::GitError;
use crate::types::{CommitInfo, GitOid, Identity, TreeChange, TreeEntry};

/// The git abstraction trait used by the document engine.
///
/// Implementations may be backed by gix (the shipped backend) or a test
/// double.
pub trait DocRepo: Send + Sync {
    /// The working directory the repository was opened at.
    fn workdir(&self) -> &Path;

    // -----------------------------------------------------------------------
    // Commit graph
    // -----------------------------------------------------------------------

    /// Resolve HEAD to its commit, returning `None` when the branch is
    /// unborn (no commits yet).
    fn head_commit(&self) -> Result<Option<GitOid>, GitError>;

    /// Read a commit object's tree, parents, message, and author.
    fn read_commit(&self, oid: GitOid) -> Result<CommitInfo, GitError>;

    // -----------------------------------------------------------------------
    // Object read
    // -----------------------------------------------------------------------

    /// Read the entries of a tree object (one level deep, not recursive).
    fn read_tree(&self, oid: GitOid) -> Result<Vec<TreeEntry>, GitError>;

    /// Resolve the subtree at a slash-separated path inside a commit's root
    /// tree. Returns `None` when the path does not exist or is not a tree.
    fn subtree_at(&self, commit: GitOid, path: &str) -> Result<Option<GitOid>, GitError>;

    /// Resolve the blob at a slash-separated path inside a commit's root
    /// tree. Returns `None` when the path does not exist or is not a blob.
    fn blob_at(&self, commit: GitOid, path: &str) -> Result<Option<GitOid>, GitError>;

    /// Read the contents of a blob object.
    fn read_blob(&self, oid: GitOid) -> Result<Vec<u8>, GitError>;

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Write a blob to the object store and return its OID.
    ///
    /// The OID is a pure function of `data`, which is what makes document
    /// file oids reproducible across processes.
    fn write_blob(&self, data: &[u8]) -> Result<GitOid, GitError>;

    /// Apply `changes` to the current root tree and commit the result.
    ///
    /// Edits HEAD's tree (or the empty tree when HEAD is unborn), writes the
    /// new tree, creates a commit with HEAD as sole parent (none on the
    /// first commit), advances HEAD, and refreshes the on-disk index to
    /// match the committed tree. Returns the new commit OID.
    ///
    /// Atomic at the git level: either the commit lands and HEAD moves, or
    /// the repository is left untouched.
    fn commit_changes(
        &self,
        changes: &[TreeChange],
        message: &str,
        who: &Identity,
    ) -> Result<GitOid, GitError>;

    // -----------------------------------------------------------------------
    // Index
    // -----------------------------------------------------------------------

    /// Look up the staged blob OID for a path in the index.
    ///
    /// Returns `None` when the index is absent (fresh repository) or the
    /// path is not staged.
    fn index_blob(&self, path: &str) -> Result<Option<GitOid>, GitError>;
}
