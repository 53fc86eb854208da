//! CRUD executors.
//!
//! Mutations ([`execute_put`], [`execute_delete`]) run inside queued tasks
//! on the blocking pool; reads ([`execute_get`], [`execute_get_back_number`])
//! run directly against the repository handle. Id validation and body
//! encoding have already happened by the time these run — executors deal in
//! canonical bytes and repository state only.

use std::fs;
use std::path::Path;

use gitddb_git::{DocRepo, Identity, TreeChange};

use crate::codec::{self, Document};
use crate::error::{Error, Result};
use crate::types::{DeleteResult, PutResult};

/// Existence precondition of a put-shaped mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PutMode {
    /// Create or overwrite.
    Upsert,
    /// Fail with [`Error::SameIdExists`] when the id already exists.
    Insert,
    /// Fail with [`Error::DocumentNotFound`] when the id does not exist.
    Update,
}

/// A fully validated, encoded put waiting for the worker.
#[derive(Debug)]
pub(crate) struct PutRequest {
    pub id: String,
    /// Canonical on-disk encoding of the body.
    pub content: String,
    pub mode: PutMode,
    pub commit_message: Option<String>,
}

/// Relative repository path of a document.
pub(crate) fn doc_path(id: &str) -> String {
    format!("{id}.json")
}

pub(crate) fn execute_put(
    repo: &dyn DocRepo,
    identity: &Identity,
    req: &PutRequest,
) -> Result<PutResult> {
    let rel_path = doc_path(&req.id);
    let file_path = repo.workdir().join(&rel_path);

    let head = repo.head_commit()?;
    let existing = match head {
        Some(commit) => repo.blob_at(commit, &rel_path)?,
        None => None,
    };
    match req.mode {
        PutMode::Insert if existing.is_some() => {
            return Err(Error::SameIdExists {
                id: req.id.clone(),
            });
        }
        PutMode::Update if existing.is_none() => {
            return Err(Error::DocumentNotFound {
                id: req.id.clone(),
            });
        }
        _ => {}
    }

    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent).map_err(|source| Error::CannotCreateDirectory {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(&file_path, &req.content).map_err(|source| Error::CannotWriteData {
        path: file_path.clone(),
        source,
    })?;

    let file_oid = repo.write_blob(req.content.as_bytes())?;
    let verb = if existing.is_some() { "update" } else { "insert" };
    let message = req.commit_message.clone().unwrap_or_else(|| {
        format!("{verb}: {rel_path}({})", file_oid.short())
    });

    let commit_oid = repo.commit_changes(
        &[TreeChange::Upsert {
            path: rel_path,
            oid: file_oid,
        }],
        &message,
        identity,
    )?;

    Ok(PutResult {
        id: req.id.clone(),
        file_oid,
        commit_oid,
    })
}

pub(crate) fn execute_delete(
    repo: &dyn DocRepo,
    identity: &Identity,
    id: &str,
    commit_message: Option<&str>,
) -> Result<DeleteResult> {
    let rel_path = doc_path(id);

    // The index mirrors HEAD between mutations; the staged entry is both the
    // existence check and the pre-deletion blob oid.
    let file_oid = repo
        .index_blob(&rel_path)?
        .ok_or_else(|| Error::DocumentNotFound { id: id.to_owned() })?;

    let message = commit_message.map_or_else(
        || format!("delete: {rel_path}({})", file_oid.short()),
        ToOwned::to_owned,
    );

    let commit_oid = repo.commit_changes(
        &[TreeChange::Remove {
            path: rel_path.clone(),
        }],
        &message,
        identity,
    )?;

    // Mirror the commit in the working tree.
    let file_path = repo.workdir().join(&rel_path);
    match fs::remove_file(&file_path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(source) => {
            return Err(Error::CannotDeleteData {
                path: file_path,
                source,
            });
        }
    }
    if let Some(parent) = file_path.parent() {
        prune_empty_parents(repo.workdir(), parent);
    }

    Ok(DeleteResult {
        id: id.to_owned(),
        file_oid,
        commit_oid,
    })
}

/// Remove now-empty directories from `dir` upward, stopping at (and never
/// touching) the working directory root. `remove_dir` refuses non-empty
/// directories, which is what terminates the walk.
fn prune_empty_parents(workdir: &Path, mut dir: &Path) {
    while dir != workdir && dir.starts_with(workdir) {
        if fs::remove_dir(dir).is_err() {
            break;
        }
        match dir.parent() {
            Some(parent) => dir = parent,
            None => break,
        }
    }
}

pub(crate) fn execute_get(repo: &dyn DocRepo, id: &str) -> Result<Option<Document>> {
    let Some(head) = repo.head_commit()? else {
        return Ok(None);
    };
    let rel_path = doc_path(id);
    let Some(oid) = repo.blob_at(head, &rel_path)? else {
        return Ok(None);
    };
    let bytes = repo.read_blob(oid)?;
    Ok(Some(codec::deserialize_document(&bytes, id)?))
}

/// Read an older revision of a document.
///
/// Walks the first-parent chain from HEAD collecting the commits in which
/// the blob at the document's path changed (create, update, or delete),
/// newest first; `back_number` indexes into that list and the document as of
/// that commit is returned. Index 0 is therefore the current state, a
/// delete-change reads as `None`, and an exhausted chain reads as `None`.
pub(crate) fn execute_get_back_number(
    repo: &dyn DocRepo,
    id: &str,
    back_number: usize,
) -> Result<Option<Document>> {
    if back_number == 0 {
        return execute_get(repo, id);
    }

    let Some(head) = repo.head_commit()? else {
        return Ok(None);
    };
    let rel_path = doc_path(id);

    let mut change_index = 0usize;
    let mut current = Some(head);
    while let Some(commit) = current {
        let info = repo.read_commit(commit)?;
        let parent = info.parents.first().copied();

        let here = repo.blob_at(commit, &rel_path)?;
        let before = match parent {
            Some(p) => repo.blob_at(p, &rel_path)?,
            None => None,
        };

        if here != before {
            if change_index == back_number {
                return match here {
                    Some(oid) => {
                        let bytes = repo.read_blob(oid)?;
                        Ok(Some(codec::deserialize_document(&bytes, id)?))
                    }
                    // The n-th older change was the deletion itself.
                    None => Ok(None),
                };
            }
            change_index += 1;
        }

        current = parent;
    }

    Ok(None)
}
