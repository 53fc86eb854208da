//! gix-backed object read/write, path lookup, and commit creation.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::GitError;
use crate::types::{CommitInfo, EntryMode, GitOid, Identity, TreeChange, TreeEntry};

/// Convert our `GitOid` to a `gix::ObjectId`.
pub(crate) fn to_gix_oid(oid: GitOid) -> gix::ObjectId {
    gix::ObjectId::from_bytes_or_panic(oid.as_bytes())
}

/// Convert a `gix::ObjectId` to our `GitOid`.
pub(crate) fn from_gix_oid(oid: gix::ObjectId) -> Result<GitOid, GitError> {
    let bytes: [u8; 20] = oid.as_bytes().try_into().map_err(|_| GitError::InvalidOid {
        value: oid.to_string(),
        reason: "expected a 20-byte SHA-1 object id".to_owned(),
    })?;
    Ok(GitOid::from_bytes(bytes))
}

fn from_gix_entry_mode(mode: gix::objs::tree::EntryMode) -> EntryMode {
    match mode.kind() {
        gix::objs::tree::EntryKind::Tree => EntryMode::Tree,
        gix::objs::tree::EntryKind::Blob => EntryMode::Blob,
        gix::objs::tree::EntryKind::BlobExecutable => EntryMode::BlobExecutable,
        gix::objs::tree::EntryKind::Link => EntryMode::Link,
        gix::objs::tree::EntryKind::Commit => EntryMode::Commit,
    }
}

pub fn head_commit(repo: &gix::Repository) -> Result<Option<GitOid>, GitError> {
    let head = repo
        .head()
        .map_err(|e| GitError::backend(format!("failed to resolve HEAD: {e}")))?;
    if head.is_unborn() {
        return Ok(None);
    }
    let id = head
        .into_peeled_id()
        .map_err(|e| GitError::backend(format!("failed to peel HEAD: {e}")))?;
    Ok(Some(from_gix_oid(id.detach())?))
}

pub fn read_commit(repo: &gix::Repository, oid: GitOid) -> Result<CommitInfo, GitError> {
    let gix_oid = to_gix_oid(oid);
    let commit = repo
        .find_commit(gix_oid)
        .map_err(|e| GitError::not_found(format!("commit {oid}: {e}")))?;

    let decoded = commit
        .decode()
        .map_err(|e| GitError::backend(format!("failed to decode commit {oid}: {e}")))?;

    let tree_oid = from_gix_oid(decoded.tree())?;
    let parents = decoded
        .parents()
        .map(from_gix_oid)
        .collect::<Result<Vec<_>, _>>()?;
    let message = decoded.message.to_string();
    let author_sig = decoded.author();
    let author = format!("{} <{}>", author_sig.name, author_sig.email);

    Ok(CommitInfo {
        tree_oid,
        parents,
        message,
        author,
    })
}

pub fn read_tree(repo: &gix::Repository, oid: GitOid) -> Result<Vec<TreeEntry>, GitError> {
    let gix_oid = to_gix_oid(oid);
    let tree = repo
        .find_tree(gix_oid)
        .map_err(|e| GitError::not_found(format!("tree {oid}: {e}")))?;

    let mut entries = Vec::new();
    for result in tree.iter() {
        let entry = result
            .map_err(|e| GitError::backend(format!("failed to decode tree entry: {e}")))?;
        entries.push(TreeEntry {
            name: entry.inner.filename.to_string(),
            mode: from_gix_entry_mode(entry.inner.mode),
            oid: from_gix_oid(entry.inner.oid.to_owned())?,
        });
    }
    Ok(entries)
}

/// Look up the entry at `path` inside a commit's root tree.
///
/// Returns the object kind and id, or `None` when no entry exists at that
/// path.
fn entry_at(
    repo: &gix::Repository,
    commit: GitOid,
    path: &str,
) -> Result<Option<(gix::object::Kind, GitOid)>, GitError> {
    let info = read_commit(repo, commit)?;
    let tree = repo
        .find_tree(to_gix_oid(info.tree_oid))
        .map_err(|e| GitError::not_found(format!("tree {}: {e}", info.tree_oid)))?;

    let Some(entry) = tree
        .lookup_entry_by_path(path)
        .map_err(|e| GitError::backend(format!("failed to look up '{path}': {e}")))?
    else {
        return Ok(None);
    };

    let object = entry
        .object()
        .map_err(|e| GitError::backend(format!("failed to read object at '{path}': {e}")))?;
    let oid = from_gix_oid(object.id)?;
    Ok(Some((object.kind, oid)))
}

pub fn subtree_at(
    repo: &gix::Repository,
    commit: GitOid,
    path: &str,
) -> Result<Option<GitOid>, GitError> {
    match entry_at(repo, commit, path)? {
        Some((gix::object::Kind::Tree, oid)) => Ok(Some(oid)),
        _ => Ok(None),
    }
}

pub fn blob_at(
    repo: &gix::Repository,
    commit: GitOid,
    path: &str,
) -> Result<Option<GitOid>, GitError> {
    match entry_at(repo, commit, path)? {
        Some((gix::object::Kind::Blob, oid)) => Ok(Some(oid)),
        _ => Ok(None),
    }
}

pub fn read_blob(repo: &gix::Repository, oid: GitOid) -> Result<Vec<u8>, GitError> {
    let gix_oid = to_gix_oid(oid);
    let mut blob = repo
        .find_blob(gix_oid)
        .map_err(|e| GitError::not_found(format!("blob {oid}: {e}")))?;
    Ok(blob.take_data())
}

pub fn write_blob(repo: &gix::Repository, data: &[u8]) -> Result<GitOid, GitError> {
    let id = repo
        .write_blob(data)
        .map_err(|e| GitError::backend(format!("failed to write blob: {e}")))?;
    from_gix_oid(id.detach())
}

/// Apply `changes` to HEAD's tree (or the empty tree when HEAD is unborn),
/// write the result, and commit it on HEAD.
///
/// The on-disk index is rebuilt from the committed tree afterwards. An index
/// refresh failure does not undo the commit — the commit is already part of
/// the repository — so it is logged and swallowed.
pub fn commit_changes(
    repo: &gix::Repository,
    changes: &[TreeChange],
    message: &str,
    who: &Identity,
) -> Result<GitOid, GitError> {
    let head = head_commit(repo)?;

    let (base_tree, parents): (gix::ObjectId, Vec<gix::ObjectId>) = match head {
        Some(oid) => {
            let info = read_commit(repo, oid)?;
            (to_gix_oid(info.tree_oid), vec![to_gix_oid(oid)])
        }
        None => {
            // First commit: materialize the empty tree so the editor has a base.
            let empty = repo
                .write_object(&gix::objs::Tree { entries: Vec::new() })
                .map_err(|e| GitError::backend(format!("failed to write empty tree: {e}")))?;
            (empty.detach(), Vec::new())
        }
    };

    let mut editor = repo
        .edit_tree(base_tree)
        .map_err(|e| GitError::backend(format!("failed to create tree editor: {e}")))?;

    for change in changes {
        match change {
            TreeChange::Upsert { path, oid } => {
                editor
                    .upsert(
                        path.as_str(),
                        gix::objs::tree::EntryKind::Blob,
                        to_gix_oid(*oid),
                    )
                    .map_err(|e| GitError::backend(format!("tree upsert '{path}': {e}")))?;
            }
            TreeChange::Remove { path } => {
                editor
                    .remove(path.as_str())
                    .map_err(|e| GitError::backend(format!("tree remove '{path}': {e}")))?;
            }
        }
    }

    let new_tree = editor
        .write()
        .map_err(|e| GitError::backend(format!("failed to write edited tree: {e}")))?
        .detach();

    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64;
    let sig = gix::actor::Signature {
        name: who.name.as_str().into(),
        email: who.email.as_str().into(),
        time: gix::date::Time {
            seconds,
            offset: 0,
        },
    };
    let mut time_buf = gix::date::parse::TimeBuf::default();
    let sig_ref = sig.to_ref(&mut time_buf);

    let commit_id = repo
        .commit_as(sig_ref, sig_ref, "HEAD", message, new_tree, parents)
        .map_err(|e| GitError::backend(format!("failed to create commit: {e}")))?;

    if let Err(e) = crate::index_impl::refresh_index_to(repo, new_tree) {
        tracing::warn!("index refresh after commit failed: {e}");
    }

    from_gix_oid(commit_id.detach())
}
