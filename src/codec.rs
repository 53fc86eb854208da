//! Canonical JSON encoding and decoding for documents.
//!
//! The on-disk form of a document must be a pure function of its contents so
//! that the blob oid of a put is reproducible across machines. The canonical
//! form is:
//!
//! - two-space indentation, `": "` after keys (serde_json pretty style);
//! - object keys sorted byte-wise ascending at every depth;
//! - `_id` forced to the end of the top-level object;
//! - array order preserved;
//! - no trailing newline.
//!
//! Keys are sorted by this module rather than relying on map iteration
//! order, so the encoding stays canonical even if a `preserve_order`
//! feature leaks into the dependency graph.

use serde_json::Value;

use crate::error::Error;

/// A document body: a JSON object.
pub type Document = serde_json::Map<String, Value>;

/// The reserved property carrying the document id.
pub const ID_PROPERTY: &str = "_id";

/// The reserved property marking tombstones in replicated data sets.
pub const DELETED_PROPERTY: &str = "_deleted";

/// Reject reserved top-level property names.
///
/// Names beginning with `_` are reserved for the engine; only
/// [`ID_PROPERTY`] and [`DELETED_PROPERTY`] are permitted.
///
/// # Errors
/// [`Error::InvalidPropertyNameInDocument`] for the first offending key.
pub fn check_property_names(doc: &Document) -> Result<(), Error> {
    for name in doc.keys() {
        if name.starts_with('_') && name != ID_PROPERTY && name != DELETED_PROPERTY {
            return Err(Error::InvalidPropertyNameInDocument { name: name.clone() });
        }
    }
    Ok(())
}

/// Serialize a document to its canonical on-disk form.
///
/// `id` replaces any `_id` the body carries and is emitted as the last
/// property of the top-level object.
///
/// # Errors
/// [`Error::InvalidJsonObject`] if a string key or value fails to serialize
/// (practically unreachable for `serde_json::Value` inputs).
pub fn serialize_document(doc: &Document, id: &str) -> Result<String, Error> {
    let mut out = String::new();

    let mut keys: Vec<&String> = doc.keys().filter(|k| k.as_str() != ID_PROPERTY).collect();
    keys.sort_unstable();

    out.push('{');
    let mut first = true;
    for key in keys {
        push_entry_separator(&mut out, &mut first, 1);
        write_string(&mut out, key)?;
        out.push_str(": ");
        write_value(&mut out, &doc[key.as_str()], 1)?;
    }
    push_entry_separator(&mut out, &mut first, 1);
    write_string(&mut out, ID_PROPERTY)?;
    out.push_str(": ");
    write_string(&mut out, id)?;
    out.push('\n');
    out.push('}');

    Ok(out)
}

/// Parse a document blob and re-attach the id taken from the filename.
///
/// # Errors
/// [`Error::InvalidJsonObject`] when the bytes are not valid JSON or the
/// top-level value is not an object.
pub fn deserialize_document(bytes: &[u8], id: &str) -> Result<Document, Error> {
    let value: Value = serde_json::from_slice(bytes).map_err(|e| Error::InvalidJsonObject {
        message: e.to_string(),
    })?;
    let Value::Object(mut doc) = value else {
        return Err(Error::InvalidJsonObject {
            message: "top-level JSON value must be an object".to_owned(),
        });
    };
    doc.insert(ID_PROPERTY.to_owned(), Value::String(id.to_owned()));
    Ok(doc)
}

fn push_entry_separator(out: &mut String, first: &mut bool, indent: usize) {
    if *first {
        *first = false;
    } else {
        out.push(',');
    }
    out.push('\n');
    for _ in 0..indent {
        out.push_str("  ");
    }
}

fn write_value(out: &mut String, value: &Value, indent: usize) -> Result<(), Error> {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => write_string(out, s)?,
        Value::Array(items) => {
            if items.is_empty() {
                out.push_str("[]");
                return Ok(());
            }
            out.push('[');
            let mut first = true;
            for item in items {
                push_entry_separator(out, &mut first, indent + 1);
                write_value(out, item, indent + 1)?;
            }
            close_container(out, indent, ']');
        }
        Value::Object(map) => {
            if map.is_empty() {
                out.push_str("{}");
                return Ok(());
            }
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_unstable();
            out.push('{');
            let mut first = true;
            for key in keys {
                push_entry_separator(out, &mut first, indent + 1);
                write_string(out, key)?;
                out.push_str(": ");
                write_value(out, &map[key.as_str()], indent + 1)?;
            }
            close_container(out, indent, '}');
        }
    }
    Ok(())
}

fn close_container(out: &mut String, indent: usize, closer: char) {
    out.push('\n');
    for _ in 0..indent {
        out.push_str("  ");
    }
    out.push(closer);
}

fn write_string(out: &mut String, s: &str) -> Result<(), Error> {
    let escaped = serde_json::to_string(s).map_err(|e| Error::InvalidJsonObject {
        message: e.to_string(),
    })?;
    out.push_str(&escaped);
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
