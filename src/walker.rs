//! Breadth-first enumeration of documents (`all_docs`).

use std::collections::VecDeque;

use gitddb_git::{DocRepo, GitOid};

use crate::codec;
use crate::error::Result;
use crate::types::{AllDocsOptions, AllDocsResult, DocRow};

/// Walk the tree of the current HEAD commit and collect document rows.
///
/// Each directory's entries are emitted in byte-wise name order (inverted by
/// `descending`), and a directory's rows are fully emitted before any of its
/// subtrees' rows (breadth-first). Entries whose name starts with `.` are
/// system paths (`.gitddb`) and never enumerated.
pub(crate) fn execute_all_docs(repo: &dyn DocRepo, opts: &AllDocsOptions) -> Result<AllDocsResult> {
    let Some(head) = repo.head_commit()? else {
        return Ok(AllDocsResult::empty());
    };

    let (start_tree, start_prefix) = match opts.sub_directory.as_deref() {
        Some(dir) => {
            let dir = dir.strip_suffix('/').unwrap_or(dir);
            match repo.subtree_at(head, dir)? {
                Some(tree) => (tree, format!("{dir}/")),
                None => return Ok(AllDocsResult::empty()),
            }
        }
        None => (repo.read_commit(head)?.tree_oid, String::new()),
    };

    let mut work: VecDeque<(GitOid, String)> = VecDeque::new();
    work.push_back((start_tree, start_prefix));
    let mut rows = Vec::new();

    while let Some((tree, prefix)) = work.pop_front() {
        let mut entries = repo.read_tree(tree)?;
        entries.sort_by(|a, b| {
            let ordering = a.name.as_bytes().cmp(b.name.as_bytes());
            if opts.descending {
                ordering.reverse()
            } else {
                ordering
            }
        });

        for entry in entries {
            if entry.name.starts_with('.') {
                continue;
            }
            if entry.mode.is_blob() {
                let Some(stem) = entry.name.strip_suffix(".json") else {
                    continue;
                };
                let id = format!("{prefix}{stem}");
                let doc = if opts.include_docs {
                    let bytes = repo.read_blob(entry.oid)?;
                    Some(codec::deserialize_document(&bytes, &id)?)
                } else {
                    None
                };
                rows.push(DocRow {
                    id,
                    file_oid: entry.oid,
                    doc,
                });
            } else if entry.mode.is_tree() && opts.recursive {
                work.push_back((entry.oid, format!("{prefix}{}/", entry.name)));
            }
        }
    }

    Ok(AllDocsResult {
        total_rows: rows.len(),
        commit_oid: Some(head),
        rows,
    })
}
