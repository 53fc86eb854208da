//! The gix-backed implementation of [`DocRepo`].

use std::path::{Path, PathBuf};

use crate::error::GitError;
use crate::repo::DocRepo;
use crate::types::{CommitInfo, GitOid, Identity, TreeChange, TreeEntry};

/// A [`DocRepo`] implementation backed by [gix](https://github.com/GitoxideLabs/gitoxide).
///
/// Construct via [`GixDocRepo::open_or_init`]. Internally holds a
/// [`gix::ThreadSafeRepository`] and derives a thread-local
/// [`gix::Repository`] per operation, so the handle can be shared between
/// the queue worker and concurrent readers.
pub struct GixDocRepo {
    inner: gix::ThreadSafeRepository,
    workdir: PathBuf,
}

impl GixDocRepo {
    /// Open the repository at `workdir`, initializing a fresh one (initial
    /// branch `main`, non-bare) when no `.git` directory exists yet.
    ///
    /// Returns the handle and whether a new repository was initialized.
    /// The directory itself is created when missing.
    pub fn open_or_init(workdir: &Path) -> Result<(Self, bool), GitError> {
        let initialized = !workdir.join(".git").exists();

        let repo = if initialized {
            std::fs::create_dir_all(workdir)?;
            gix::init(workdir).map_err(|e| GitError::CannotOpen {
                path: workdir.to_path_buf(),
                message: e.to_string(),
            })?
        } else {
            // Exact-path open, isolated from user/global configuration so
            // commit identity and branch naming stay deterministic.
            gix::open_opts(workdir, gix::open::Options::isolated()).map_err(|e| {
                GitError::CannotOpen {
                    path: workdir.to_path_buf(),
                    message: e.to_string(),
                }
            })?
        };

        let workdir = repo
            .workdir()
            .map_or_else(|| workdir.to_path_buf(), Path::to_path_buf);

        Ok((
            Self {
                inner: repo.into_sync(),
                workdir,
            },
            initialized,
        ))
    }

    /// Derive the thread-local repository for the calling thread.
    fn local(&self) -> gix::Repository {
        self.inner.to_thread_local()
    }
}

impl DocRepo for GixDocRepo {
    fn workdir(&self) -> &Path {
        &self.workdir
    }

    // === Commit graph ===
    fn head_commit(&self) -> Result<Option<GitOid>, GitError> {
        crate::objects_impl::head_commit(&self.local())
    }

    fn read_commit(&self, oid: GitOid) -> Result<CommitInfo, GitError> {
        crate::objects_impl::read_commit(&self.local(), oid)
    }

    // === Object read ===
    fn read_tree(&self, oid: GitOid) -> Result<Vec<TreeEntry>, GitError> {
        crate::objects_impl::read_tree(&self.local(), oid)
    }

    fn subtree_at(&self, commit: GitOid, path: &str) -> Result<Option<GitOid>, GitError> {
        crate::objects_impl::subtree_at(&self.local(), commit, path)
    }

    fn blob_at(&self, commit: GitOid, path: &str) -> Result<Option<GitOid>, GitError> {
        crate::objects_impl::blob_at(&self.local(), commit, path)
    }

    fn read_blob(&self, oid: GitOid) -> Result<Vec<u8>, GitError> {
        crate::objects_impl::read_blob(&self.local(), oid)
    }

    // === Mutation ===
    fn write_blob(&self, data: &[u8]) -> Result<GitOid, GitError> {
        crate::objects_impl::write_blob(&self.local(), data)
    }

    fn commit_changes(
        &self,
        changes: &[TreeChange],
        message: &str,
        who: &Identity,
    ) -> Result<GitOid, GitError> {
        crate::objects_impl::commit_changes(&self.local(), changes, message, who)
    }

    // === Index ===
    fn index_blob(&self, path: &str) -> Result<Option<GitOid>, GitError> {
        crate::index_impl::index_blob(&self.local(), path)
    }
}
