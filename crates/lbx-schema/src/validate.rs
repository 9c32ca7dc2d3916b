//! # Entry Document Schema Validation
//!
//! The entry schema (Draft 2020-12) is embedded at compile time from
//! `schemas/entry.schema.json` and compiled once per [`EntrySchema`].
//! `additionalProperties: false` is set on the entry and every descriptor
//! except the protected signature header and `extensions`, which are open.
//!
//! Violations carry stable codes so they can be printed in the same
//! `[code] message (path)` form as semantic validation issues:
//!
//! - `schema.unknown_member`: a member the schema does not define.
//! - `schema.invalid`: any other structural violation.
//! - `core.validation.timestamp_not_utc`: `timestamp` or
//!   `anchor.anchored_at` without a `Z` designator.

use lbx_core::temporal::is_utc_designated;
use lbx_core::ValidationIssue;
use serde_json::Value;
use thiserror::Error;

/// Embedded entry schema source.
pub const ENTRY_SCHEMA_JSON: &str = include_str!("../schemas/entry.schema.json");

/// Code for members the schema does not define.
pub const UNKNOWN_MEMBER: &str = "schema.unknown_member";
/// Code for every other structural violation.
pub const INVALID: &str = "schema.invalid";
/// Code for timestamps without a UTC designator.
pub const TIMESTAMP_NOT_UTC: &str = "core.validation.timestamp_not_utc";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors building the schema validator.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// The embedded schema is not valid JSON.
    #[error("failed to parse entry schema: {0}")]
    Parse(#[from] serde_json::Error),

    /// The schema could not be compiled into a validator.
    #[error("failed to compile entry schema: {0}")]
    Compile(String),
}

/// One structural violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    /// Stable code (see module docs).
    pub code: &'static str,
    /// JSON Pointer to the violating value (`""` for the root).
    pub instance_path: String,
    /// Human-readable description.
    pub message: String,
}

impl SchemaViolation {
    /// Convert into a [`ValidationIssue`] with a dotted field path.
    pub fn to_issue(&self) -> ValidationIssue {
        ValidationIssue::new(self.code, self.message.clone(), pointer_to_path(&self.instance_path))
    }
}

impl std::fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "path={}: {}", self.instance_path, self.message)
    }
}

// ---------------------------------------------------------------------------
// EntrySchema
// ---------------------------------------------------------------------------

/// A compiled validator for entry documents.
pub struct EntrySchema {
    validator: jsonschema::Validator,
}

impl std::fmt::Debug for EntrySchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntrySchema").finish_non_exhaustive()
    }
}

impl EntrySchema {
    /// Compile the embedded entry schema.
    pub fn new() -> Result<Self, SchemaError> {
        let schema: Value = serde_json::from_str(ENTRY_SCHEMA_JSON)?;
        let validator = jsonschema::options()
            .with_draft(jsonschema::Draft::Draft202012)
            .build(&schema)
            .map_err(|e| SchemaError::Compile(e.to_string()))?;
        Ok(Self { validator })
    }

    /// Validate a raw entry document, returning every violation.
    pub fn validate(&self, document: &Value) -> Vec<SchemaViolation> {
        let mut violations: Vec<SchemaViolation> = self
            .validator
            .iter_errors(document)
            .map(|err| {
                let code = match err.kind {
                    jsonschema::error::ValidationErrorKind::AdditionalProperties { .. } => {
                        UNKNOWN_MEMBER
                    }
                    _ => INVALID,
                };
                SchemaViolation {
                    code,
                    instance_path: err.instance_path.to_string(),
                    message: err.to_string(),
                }
            })
            .collect();

        for pointer in ["/timestamp", "/anchor/anchored_at"] {
            if let Some(raw) = document.pointer(pointer).and_then(Value::as_str) {
                if !is_utc_designated(raw) {
                    violations.push(SchemaViolation {
                        code: TIMESTAMP_NOT_UTC,
                        instance_path: pointer.to_string(),
                        message: format!("{} must be expressed in UTC", pointer_to_path(pointer)),
                    });
                }
            }
        }

        tracing::debug!(violations = violations.len(), "entry document checked");
        violations
    }

    /// Whether the document has no structural violations.
    pub fn is_valid(&self, document: &Value) -> bool {
        self.validate(document).is_empty()
    }
}

/// `/signatures/0/protected/alg` becomes `signatures[0].protected.alg`.
pub fn pointer_to_path(pointer: &str) -> String {
    let mut path = String::new();
    for segment in pointer.split('/').filter(|s| !s.is_empty()) {
        let segment = segment.replace("~1", "/").replace("~0", "~");
        if segment.chars().all(|c| c.is_ascii_digit()) {
            path.push('[');
            path.push_str(&segment);
            path.push(']');
        } else {
            if !path.is_empty() {
                path.push('.');
            }
            path.push_str(&segment);
        }
    }
    if path.is_empty() {
        "$".to_string()
    } else {
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    pub(super) fn document() -> Value {
        json!({
            "id": "3f2b8c1e-9a4d-4c6e-8f10-2b7d5e9a1c34",
            "version": "1.0",
            "storage": {
                "protocol": "ipfs",
                "integrity_proof": "ni:///sha-256;uU0nuZNNPgilLlLX2n2r-sSE7-N6U4DukIj3rOLvzek",
                "media_type": "application/pdf",
                "size_bytes": 11,
                "location": {"region": "us-east-1", "jurisdiction": "US/DE", "provider": "IPFS"}
            },
            "identity": {"org": "did:example:org", "artifact": "quarterly-report"},
            "timestamp": "2024-05-01T12:00:00Z",
            "anchor": {"chain": "stellar:testnet", "anchor_ref": "abcd", "hash_alg": "sha-256"},
            "signatures": [{
                "protected": {"alg": "EdDSA", "kid": "key-1", "typ": "x"},
                "signature": "AAAA"
            }],
            "extensions": {"anything": [1, 2, {"goes": true}]}
        })
    }

    #[test]
    fn embedded_schema_compiles() {
        assert!(EntrySchema::new().is_ok());
    }

    #[test]
    fn well_formed_document_passes() {
        let schema = EntrySchema::new().unwrap();
        let violations = schema.validate(&document());
        assert!(violations.is_empty(), "unexpected: {violations:?}");
    }

    #[test]
    fn legacy_tx_hash_is_accepted() {
        let schema = EntrySchema::new().unwrap();
        let mut doc = document();
        let anchor = doc["anchor"].as_object_mut().unwrap();
        let reference = anchor.remove("anchor_ref").unwrap();
        anchor.insert("tx_hash".to_string(), reference);
        assert!(schema.is_valid(&doc));
    }

    #[test]
    fn unknown_root_member_is_reported() {
        let schema = EntrySchema::new().unwrap();
        let mut doc = document();
        doc["surprise"] = json!(1);
        let violations = schema.validate(&doc);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].code, UNKNOWN_MEMBER);
    }

    #[test]
    fn unknown_nested_member_is_reported_with_path() {
        let schema = EntrySchema::new().unwrap();
        let mut doc = document();
        doc["storage"]["location"]["rack"] = json!("r1");
        let violations = schema.validate(&doc);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].code, UNKNOWN_MEMBER);
        assert_eq!(violations[0].instance_path, "/storage/location");
        assert_eq!(violations[0].to_issue().path, "storage.location");
    }

    #[test]
    fn wrong_type_is_invalid() {
        let schema = EntrySchema::new().unwrap();
        let mut doc = document();
        doc["storage"]["size_bytes"] = json!("eleven");
        let violations = schema.validate(&doc);
        assert!(violations
            .iter()
            .any(|v| v.code == INVALID && v.instance_path == "/storage/size_bytes"));
    }

    #[test]
    fn missing_required_member_is_invalid() {
        let schema = EntrySchema::new().unwrap();
        let mut doc = document();
        doc.as_object_mut().unwrap().remove("anchor");
        let violations = schema.validate(&doc);
        assert!(violations.iter().any(|v| v.code == INVALID));
    }

    #[test]
    fn offset_timestamp_is_not_utc() {
        let schema = EntrySchema::new().unwrap();
        let mut doc = document();
        doc["timestamp"] = json!("2024-05-01T14:00:00+02:00");
        doc["anchor"]["anchored_at"] = json!("2024-05-01T14:00:00+02:00");
        let violations = schema.validate(&doc);
        let paths: Vec<String> = violations
            .iter()
            .filter(|v| v.code == TIMESTAMP_NOT_UTC)
            .map(|v| v.to_issue().path)
            .collect();
        assert_eq!(paths, vec!["timestamp", "anchor.anchored_at"]);
    }

    #[test]
    fn pointer_conversion() {
        assert_eq!(pointer_to_path("/signatures/0/protected/alg"), "signatures[0].protected.alg");
        assert_eq!(pointer_to_path(""), "$");
        assert_eq!(pointer_to_path("/a~1b"), "a/b");
    }
}
