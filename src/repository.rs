//! Repository lifecycle and identity.
//!
//! Opens or initializes the on-disk git repository and manages the marker —
//! a tracked document at [`MARKER_PATH`] that stamps the repository with its
//! creator, engine version, and a generated database id. The marker is an
//! ordinary commit, so it survives clones and is visible to plain git
//! tooling.

use std::path::Path;
use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};

use gitddb_git::{DocRepo, GitError, GixDocRepo, Identity, TreeChange};

use crate::error::{Error, Result};
use crate::types::DatabaseInfo;

/// Path of the tracked marker document, relative to the working directory.
pub const MARKER_PATH: &str = ".gitddb/info.json";

/// Creator string recorded in (and expected from) the marker.
pub const DATABASE_CREATOR: &str = "GitDocumentDB";

/// Engine version recorded in the marker.
pub const DATABASE_VERSION: &str = "1.0";

/// The marker document contents.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct Marker {
    creator: String,
    version: String,
    db_id: String,
}

/// Open the repository at `working_dir`, initializing it (and writing the
/// marker as its first commit) when absent, and classify what was found.
pub(crate) fn open_or_init(
    working_dir: &Path,
    identity: &Identity,
) -> Result<(Arc<dyn DocRepo>, DatabaseInfo)> {
    let (repo, is_new) = GixDocRepo::open_or_init(working_dir).map_err(|e| match e {
        GitError::Io(source) => Error::CannotCreateDirectory {
            path: working_dir.to_path_buf(),
            source,
        },
        GitError::CannotOpen { path, message } => Error::CannotOpenRepository { path, message },
        other => Error::Git(other),
    })?;
    let repo: Arc<dyn DocRepo> = Arc::new(repo);

    let info = if is_new {
        let marker = Marker {
            creator: DATABASE_CREATOR.to_owned(),
            version: DATABASE_VERSION.to_owned(),
            db_id: generate_db_id(),
        };
        write_marker(repo.as_ref(), &marker, identity)?;
        DatabaseInfo {
            is_new: true,
            is_created_by_gitddb: true,
            is_valid_version: true,
            db_id: Some(marker.db_id),
        }
    } else {
        match read_marker(repo.as_ref())? {
            Some(marker) => DatabaseInfo {
                is_new: false,
                is_created_by_gitddb: marker.creator == DATABASE_CREATOR,
                is_valid_version: marker.version == DATABASE_VERSION,
                db_id: Some(marker.db_id),
            },
            // A foreign repository (or one from before the marker existed).
            None => DatabaseInfo {
                is_new: false,
                is_created_by_gitddb: false,
                is_valid_version: false,
                db_id: None,
            },
        }
    };

    Ok((repo, info))
}

fn write_marker(repo: &dyn DocRepo, marker: &Marker, identity: &Identity) -> Result<()> {
    let content = serde_json::to_string_pretty(marker).map_err(|e| Error::InvalidJsonObject {
        message: e.to_string(),
    })?;

    // The marker lives in the working tree like any other document, so the
    // tree stays clean under plain git tooling.
    let file_path = repo.workdir().join(MARKER_PATH);
    if let Some(parent) = file_path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| Error::CannotCreateDirectory {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(&file_path, &content).map_err(|source| Error::CannotWriteData {
        path: file_path,
        source,
    })?;

    let oid = repo.write_blob(content.as_bytes())?;
    repo.commit_changes(
        &[TreeChange::Upsert {
            path: MARKER_PATH.to_owned(),
            oid,
        }],
        "create database",
        identity,
    )?;
    Ok(())
}

fn read_marker(repo: &dyn DocRepo) -> Result<Option<Marker>> {
    let Some(head) = repo.head_commit()? else {
        return Ok(None);
    };
    let Some(oid) = repo.blob_at(head, MARKER_PATH)? else {
        return Ok(None);
    };
    let bytes = repo.read_blob(oid)?;
    match serde_json::from_slice::<Marker>(&bytes) {
        Ok(marker) => Ok(Some(marker)),
        Err(e) => {
            // A malformed marker makes the repository foreign, not broken.
            tracing::warn!("unreadable marker at {MARKER_PATH}: {e}");
            Ok(None)
        }
    }
}

/// A fresh random database id: 32 lowercase hex characters.
fn generate_db_id() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    let mut out = String::with_capacity(32);
    for byte in bytes {
        use std::fmt::Write;
        let _ = write!(out, "{byte:02x}");
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
