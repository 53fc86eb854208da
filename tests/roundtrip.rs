//! Codec round-trip property: for any JSON document built from objects,
//! arrays, strings, numbers, booleans, and nulls, `parse(encode(v)) == v`
//! and `encode(parse(encode(v))) == encode(v)` byte-for-byte.

use proptest::prelude::*;
use serde_json::{Value, json};

use gitddb::{Document, deserialize_document, serialize_document};

fn arb_key() -> impl Strategy<Value = String> {
    // No leading underscore: those names are reserved at the top level.
    "[a-z][a-z0-9_]{0,7}"
}

fn arb_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        // Printable ASCII, including quotes and backslashes, to exercise
        // string escaping.
        "[ -~]{0,16}".prop_map(Value::String),
    ]
}

fn arb_value() -> impl Strategy<Value = Value> {
    arb_leaf().prop_recursive(3, 32, 4, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            proptest::collection::btree_map(arb_key(), inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

fn arb_document() -> impl Strategy<Value = Document> {
    proptest::collection::btree_map(arb_key(), arb_value(), 0..5)
        .prop_map(|m| m.into_iter().collect())
}

proptest! {
    #[test]
    fn encode_parse_roundtrip(doc in arb_document()) {
        let encoded = serialize_document(&doc, "prop01").expect("encode");

        let parsed = deserialize_document(encoded.as_bytes(), "prop01").expect("parse");
        prop_assert_eq!(parsed.get("_id"), Some(&json!("prop01")));
        for (key, value) in &doc {
            prop_assert_eq!(parsed.get(key), Some(value), "key {}", key);
        }
        // Nothing beyond the original keys plus the attached id.
        prop_assert_eq!(parsed.len(), doc.len() + 1);

        let reencoded = serialize_document(&parsed, "prop01").expect("re-encode");
        prop_assert_eq!(encoded, reencoded);
    }

    #[test]
    fn encoding_is_stable_under_key_insertion_order(doc in arb_document()) {
        // Rebuild the map in reverse insertion order; canonical output must
        // not depend on it.
        let reversed: Document = doc.iter().rev().map(|(k, v)| (k.clone(), v.clone())).collect();
        let a = serialize_document(&doc, "prop01").expect("encode");
        let b = serialize_document(&reversed, "prop01").expect("encode reversed");
        prop_assert_eq!(a, b);
    }
}
