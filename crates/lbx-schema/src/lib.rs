//! # lbx-schema: Structural Validation of Entry Documents
//!
//! Validates raw JSON entry documents before they are deserialized into
//! [`lbx_core::Entry`]. Serde silently ignores unknown members and reports
//! only the first type error; this crate reports every unknown member, type
//! mismatch and missing member with its JSON Pointer path, and checks that
//! timestamps carry a UTC designator.
//!
//! Semantic checks (UUID versions, digest URIs, chain identifiers) live in
//! [`lbx_core::validation`].

pub mod validate;

pub use validate::{EntrySchema, SchemaError, SchemaViolation};
