//! Index (staging area) operations for [`GixDocRepo`](crate::GixDocRepo).

use gix::bstr::ByteSlice;

use crate::error::GitError;
use crate::objects_impl::from_gix_oid;
use crate::types::GitOid;

/// Rebuild the on-disk index from a committed tree.
///
/// This reads the tree into a fresh index state without touching the working
/// tree, equivalent to `git reset <tree>`. Called after every commit so that
/// the index always mirrors HEAD.
pub fn refresh_index_to(repo: &gix::Repository, tree: gix::ObjectId) -> Result<(), GitError> {
    let state = gix::index::State::from_tree(&tree, &repo.objects, Default::default())
        .map_err(|e| GitError::backend(format!("failed to create index from tree: {e}")))?;

    let mut index_file = gix::index::File::from_state(state, repo.index_path());
    index_file
        .write(Default::default())
        .map_err(|e| GitError::backend(format!("failed to write index: {e}")))?;

    Ok(())
}

/// Look up the staged blob OID for `path`.
///
/// A missing index file (repository with no commits yet) reads as an empty
/// index rather than an error.
pub fn index_blob(repo: &gix::Repository, path: &str) -> Result<Option<GitOid>, GitError> {
    let Ok(index) = repo.open_index() else {
        return Ok(None);
    };

    for entry in index.entries() {
        let Ok(entry_path) = entry.path(&index).to_str() else {
            continue;
        };
        if entry_path == path {
            return Ok(Some(from_gix_oid(entry.id)?));
        }
    }
    Ok(None)
}
