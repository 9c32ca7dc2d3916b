//! # Canonical Serialization: JCS-Compatible Byte Production
//!
//! This module defines `CanonicalBytes`, the sole construction path for bytes
//! used in signing and digest computation across the Lockbox stack.
//!
//! ## Security Invariant
//!
//! The `CanonicalBytes` newtype has a private inner field. The only way to
//! construct it is through `CanonicalBytes::new()`, which prunes null-valued
//! object members and then serializes with RFC 8785 (JSON Canonicalization
//! Scheme) rules.
//!
//! Any function that signs or hashes a record must accept `&CanonicalBytes`,
//! so a signature produced on one machine re-verifies on any other that
//! rebuilds the same record.
//!
//! ## Rules
//!
//! 1. **Sorted members**: object members ordered by UTF-16 code unit
//!    comparison of their names (ordinal order for every BMP name).
//! 2. **Arrays keep their order.**
//! 3. **Minimal escaping**: only `"`, `\` and control characters are escaped.
//! 4. **ES6 number rendering**: integers never carry an exponent or `.0`.
//! 5. **No insignificant whitespace.**
//! 6. **Null members omitted**: `{"a":null,"b":1}` canonicalizes to `{"b":1}`.
//!    Nulls inside arrays are positional and are kept.

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// Bytes produced exclusively by JCS canonicalization with null pruning.
///
/// # Invariants
///
/// - The only constructor is `CanonicalBytes::new()`.
/// - No object in the encoded tree has a null-valued member.
/// - Serialization uses sorted keys with compact separators (RFC 8785).
/// - The bytes are valid UTF-8.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Construct canonical bytes from any serializable value.
    ///
    /// This is the ONLY way to construct `CanonicalBytes`.
    ///
    /// # Errors
    ///
    /// Returns `CanonicalizationError::SerializationFailed` if the value
    /// cannot be represented as JSON (for example a map with non-string keys).
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        let pruned = prune_null_members(value);
        let text = serde_jcs::to_string(&pruned)?;
        Ok(Self(text.into_bytes()))
    }

    /// Access the canonical bytes for digest computation.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The canonical text. Always valid UTF-8 because JCS emits UTF-8.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or_default()
    }

    /// Returns the length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the canonical byte sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume the wrapper and return the owned bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Display for CanonicalBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonicalize any serializable value to its JCS text.
pub fn canonicalize(obj: &impl Serialize) -> Result<String, CanonicalizationError> {
    let bytes = CanonicalBytes::new(obj)?;
    Ok(bytes.as_str().to_owned())
}

/// Drop null-valued object members, recursively.
fn prune_null_members(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, prune_null_members(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(prune_null_members).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn simple_object_sorted_compact() {
        let data = json!({"b": 2, "a": 1, "c": "hello"});
        let cb = CanonicalBytes::new(&data).expect("should canonicalize");
        assert_eq!(cb.as_str(), r#"{"a":1,"b":2,"c":"hello"}"#);
    }

    #[test]
    fn nested_objects_sorted_arrays_kept() {
        let data = json!({
            "outer": {"b": 2, "a": 1},
            "list": [3, 2, 1]
        });
        let cb = CanonicalBytes::new(&data).unwrap();
        assert_eq!(cb.as_str(), r#"{"list":[3,2,1],"outer":{"a":1,"b":2}}"#);
    }

    #[test]
    fn null_members_omitted() {
        let data = json!({"key": null, "keep": {"inner": null, "x": 1}});
        let cb = CanonicalBytes::new(&data).unwrap();
        assert_eq!(cb.as_str(), r#"{"keep":{"x":1}}"#);
    }

    #[test]
    fn nulls_inside_arrays_are_positional() {
        let data = json!({"list": [1, null, 2]});
        let cb = CanonicalBytes::new(&data).unwrap();
        assert_eq!(cb.as_str(), r#"{"list":[1,null,2]}"#);
    }

    #[test]
    fn integers_render_without_fraction() {
        let data = json!({"whole": 10.0, "big": 9999999999i64, "neg": -42});
        let cb = CanonicalBytes::new(&data).unwrap();
        assert_eq!(cb.as_str(), r#"{"big":9999999999,"neg":-42,"whole":10}"#);
    }

    #[test]
    fn minimal_string_escaping() {
        let data = json!({"s": "quote\" slash/ tab\t \u{00e9}"});
        let cb = CanonicalBytes::new(&data).unwrap();
        assert_eq!(cb.as_str(), "{\"s\":\"quote\\\" slash/ tab\\t \u{00e9}\"}");
    }

    #[test]
    fn empty_containers() {
        assert_eq!(CanonicalBytes::new(&json!({})).unwrap().as_bytes(), b"{}");
        assert_eq!(CanonicalBytes::new(&json!([])).unwrap().as_bytes(), b"[]");
    }

    #[test]
    fn key_order_of_input_is_irrelevant() {
        let a: Value = serde_json::from_str(r#"{"z":1,"a":{"y":2,"b":3}}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"a":{"b":3,"y":2},"z":1}"#).unwrap();
        assert_eq!(canonicalize(&a).unwrap(), canonicalize(&b).unwrap());
    }

    #[test]
    fn struct_with_optional_none_matches_absent_member() {
        #[derive(Serialize)]
        struct Record {
            name: &'static str,
            note: Option<&'static str>,
        }
        let text = canonicalize(&Record { name: "x", note: None }).unwrap();
        assert_eq!(text, r#"{"name":"x"}"#);
    }

    #[test]
    fn display_matches_text() {
        let cb = CanonicalBytes::new(&json!({"a": true})).unwrap();
        assert_eq!(cb.to_string(), r#"{"a":true}"#);
        assert_eq!(cb.len(), 10);
        assert!(!cb.is_empty());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn json_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| serde_json::json!(n)),
            "[a-zA-Z0-9_ ]{0,50}".prop_map(Value::String),
        ];
        leaf.prop_recursive(4, 64, 8, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..8).prop_map(Value::Array),
                prop::collection::btree_map("[a-z]{1,10}", inner, 0..8)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    /// Re-emit an object tree with its members in reverse insertion order.
    fn reversed_text(value: &Value) -> String {
        match value {
            Value::Object(map) => {
                let members: Vec<String> = map
                    .iter()
                    .rev()
                    .map(|(k, v)| format!("{}:{}", Value::String(k.clone()), reversed_text(v)))
                    .collect();
                format!("{{{}}}", members.join(","))
            }
            Value::Array(items) => {
                let parts: Vec<String> = items.iter().map(reversed_text).collect();
                format!("[{}]", parts.join(","))
            }
            other => other.to_string(),
        }
    }

    proptest! {
        #[test]
        fn canonicalization_is_order_independent(value in json_value()) {
            let reordered: Value = serde_json::from_str(&reversed_text(&value)).unwrap();
            prop_assert_eq!(canonicalize(&value).unwrap(), canonicalize(&reordered).unwrap());
        }

        #[test]
        fn canonical_output_is_idempotent(value in json_value()) {
            let once = canonicalize(&value).unwrap();
            let reparsed: Value = serde_json::from_str(&once).unwrap();
            prop_assert_eq!(canonicalize(&reparsed).unwrap(), once);
        }

        #[test]
        fn canonical_output_has_no_null_members(value in json_value()) {
            let text = canonicalize(&value).unwrap();
            prop_assert!(!text.contains(":null"));
        }
    }
}
