//! Pure validation rules for ids, collection paths, and the working
//! directory.
//!
//! All functions here are side-effect free and run *before* a mutation is
//! enqueued, so validation failures surface synchronously instead of
//! travelling through the task queue.

use std::path::Path;

use crate::error::Error;

/// Default maximum length of a document id, in characters.
pub const MAX_DOCUMENT_ID_LENGTH: usize = 64;

/// Maximum length of the working-directory path, in characters.
///
/// Matches the most restrictive platform the on-disk layout targets.
pub const MAX_WORKING_DIRECTORY_LENGTH: usize = 195;

/// Characters allowed in document ids and collection paths, besides
/// alphanumerics.
const ALLOWED_PUNCTUATION: &[char] = &['_', '-', '.', '(', ')', '[', ']', '/'];

fn is_allowed_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || ALLOWED_PUNCTUATION.contains(&c)
}

/// Validate a document id against the character, shape, and length rules.
///
/// Ids may contain letters, digits, `_ - . ( ) [ ]` and `/` (which nests the
/// document under directories). No path segment may start with `_` or `.`,
/// no segment may be empty, and the id may not end with `.` or `/`.
///
/// # Errors
/// [`Error::InvalidIdLength`] when empty or longer than `max_len`;
/// [`Error::InvalidIdCharacter`] for every other violation.
pub fn validate_document_id(id: &str, max_len: usize) -> Result<(), Error> {
    let len = id.chars().count();
    if len == 0 || len > max_len {
        return Err(Error::InvalidIdLength {
            id: id.to_owned(),
            len,
            max: max_len,
        });
    }

    if let Some(c) = id.chars().find(|c| !is_allowed_char(*c)) {
        return Err(Error::InvalidIdCharacter {
            id: id.to_owned(),
            reason: format!("character '{c}' is not allowed"),
        });
    }

    if id.ends_with('.') || id.ends_with('/') {
        return Err(Error::InvalidIdCharacter {
            id: id.to_owned(),
            reason: "id must not end with '.' or '/'".to_owned(),
        });
    }

    for segment in id.split('/') {
        if segment.is_empty() {
            return Err(Error::InvalidIdCharacter {
                id: id.to_owned(),
                reason: "id must not contain empty path segments".to_owned(),
            });
        }
        if segment.starts_with('_') || segment.starts_with('.') {
            return Err(Error::InvalidIdCharacter {
                id: id.to_owned(),
                reason: format!("segment '{segment}' must not start with '_' or '.'"),
            });
        }
    }

    Ok(())
}

/// Validate a sub-directory path for [`all_docs`](crate::GitDocumentDb::all_docs).
///
/// Same character set and segment rules as document ids, without a length
/// cap. A single trailing `/` is tolerated (and ignored by the walker).
///
/// # Errors
/// [`Error::InvalidCollectionPathCharacter`] on any violation.
pub fn validate_sub_directory(path: &str) -> Result<(), Error> {
    let trimmed = path.strip_suffix('/').unwrap_or(path);
    if trimmed.is_empty() {
        return Err(Error::InvalidCollectionPathCharacter {
            path: path.to_owned(),
            reason: "path must not be empty".to_owned(),
        });
    }

    if let Some(c) = trimmed.chars().find(|c| !is_allowed_char(*c)) {
        return Err(Error::InvalidCollectionPathCharacter {
            path: path.to_owned(),
            reason: format!("character '{c}' is not allowed"),
        });
    }

    for segment in trimmed.split('/') {
        if segment.is_empty() {
            return Err(Error::InvalidCollectionPathCharacter {
                path: path.to_owned(),
                reason: "path must not contain empty segments".to_owned(),
            });
        }
        if segment.starts_with('_') || segment.starts_with('.') {
            return Err(Error::InvalidCollectionPathCharacter {
                path: path.to_owned(),
                reason: format!("segment '{segment}' must not start with '_' or '.'"),
            });
        }
    }

    Ok(())
}

/// Validate the working-directory path length.
///
/// # Errors
/// [`Error::InvalidWorkingDirectoryPathLength`] when the path exceeds
/// [`MAX_WORKING_DIRECTORY_LENGTH`]. Fatal at construction time.
pub fn validate_working_dir(path: &Path) -> Result<(), Error> {
    let len = path.to_string_lossy().chars().count();
    if len > MAX_WORKING_DIRECTORY_LENGTH {
        return Err(Error::InvalidWorkingDirectoryPathLength {
            path: path.to_owned(),
            len,
            max: MAX_WORKING_DIRECTORY_LENGTH,
        });
    }
    Ok(())
}

/// Validate the database name given at construction.
///
/// # Errors
/// [`Error::UndefinedDatabaseName`] when empty.
pub fn validate_db_name(name: &str) -> Result<(), Error> {
    if name.is_empty() {
        return Err(Error::UndefinedDatabaseName);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
