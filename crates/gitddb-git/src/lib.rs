//! Git abstraction layer for gitddb.
//!
//! Exposes the object-safe [`DocRepo`] trait — the single boundary between
//! the document engine and git — together with its gix-backed
//! implementation [`GixDocRepo`] and the shared vocabulary types.

mod error;
mod gix_repo;
mod index_impl;
mod objects_impl;
mod repo;
mod types;

pub use error::GitError;
pub use gix_repo::GixDocRepo;
pub use repo::DocRepo;
pub use types::{CommitInfo, EntryMode, GitOid, Identity, OidParseError, TreeChange, TreeEntry};
