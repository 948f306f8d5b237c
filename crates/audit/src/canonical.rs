//! Canonical JSON: sorted keys, no insignificant whitespace, and non-ASCII
//! characters escaped as `\u` sequences.
//!
//! Sorting is not free for an arbitrary `T: Serialize` — `serde_json`
//! writes a derived struct's fields in declaration order, not key order.
//! Routing the value through `serde_json::Value` first is what makes the
//! sort real: `Value`'s object variant is a `BTreeMap` (without the
//! `preserve_order` feature), so re-serializing the `Value` emits keys in
//! sorted order regardless of the source type's field order.

use schemas::{EngineError, Result};
use serde::Serialize;

pub fn canonical_json<T: Serialize>(value: &T) -> Result<String> {
    let value = serde_json::to_value(value)
        .map_err(|e| EngineError::ValidationFailure(format!("canonicalize: {e}")))?;
    let compact = serde_json::to_string(&value)
        .map_err(|e| EngineError::ValidationFailure(format!("canonicalize: {e}")))?;
    Ok(escape_non_ascii(&compact))
}

fn escape_non_ascii(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        if ch.is_ascii() {
            out.push(ch);
        } else {
            let mut buf = [0u16; 2];
            for unit in ch.encode_utf16(&mut buf) {
                out.push_str(&format!("\\u{unit:04x}"));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keys_come_out_sorted() {
        let value = json!({"b": 1, "a": 2});
        let canonical = canonical_json(&value).unwrap();
        assert_eq!(canonical, r#"{"a":2,"b":1}"#);
    }

    #[test]
    fn no_insignificant_whitespace() {
        let value = json!({"a": [1, 2, 3]});
        let canonical = canonical_json(&value).unwrap();
        assert!(!canonical.contains(' '));
    }

    #[test]
    fn non_ascii_is_escaped() {
        let value = json!({"name": "caf\u{e9}"});
        let canonical = canonical_json(&value).unwrap();
        assert!(canonical.contains("\\u00e9"));
        assert!(!canonical.contains('\u{e9}'));
    }

    #[test]
    fn astral_plane_uses_surrogate_pair() {
        let value = json!({"emoji": "\u{1F600}"});
        let canonical = canonical_json(&value).unwrap();
        assert!(canonical.contains("\\ud83d\\ude00"));
    }

    #[test]
    fn struct_fields_are_sorted_even_though_declared_out_of_order() {
        #[derive(Serialize)]
        struct OutOfOrder {
            zebra: u8,
            apple: u8,
        }
        let canonical = canonical_json(&OutOfOrder { zebra: 1, apple: 2 }).unwrap();
        assert_eq!(canonical, r#"{"apple":2,"zebra":1}"#);
    }
}
