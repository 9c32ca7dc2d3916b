//! # lbx-core: Foundational Types for the Lockbox Provenance Stack
//!
//! This crate defines the trust core every other crate in the workspace
//! builds on: the [`Entry`] provenance record, the canonical encoding used
//! for signing and hashing, content digests, the `ni:///` digest URI codec,
//! semantic entry validation, and revision-chain traversal.
//!
//! ## Key Design Principles
//!
//! 1. **`CanonicalBytes` newtype.** ALL digest and signing input flows through
//!    `CanonicalBytes::new()`. No raw `serde_json::to_vec()` for digests.
//!
//! 2. **Signatures never sign themselves.** [`Entry::canonical_payload()`]
//!    serializes a borrowed view of the entry that has no `signatures` member.
//!
//! 3. **UTC-only timestamps.** [`Timestamp`] refuses non-UTC offsets at the
//!    parse boundary, so canonical output always carries a `Z` designator.
//!
//! 4. **Revision links are ids, not pointers.** The revision graph walks
//!    `previous_id` references through an [`EntryResolver`] with an explicit
//!    seen-set.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `lbx-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod entry;
pub mod error;
pub mod ni_uri;
pub mod revision;
pub mod temporal;
pub mod validation;

// Re-export primary types for ergonomic imports.
pub use canonical::{canonicalize, CanonicalBytes};
pub use digest::{hash, sha256_digest, ContentDigest, HashAlgorithm};
pub use entry::{
    AnchorProof, EncryptionDescriptor, EncryptionPolicy, Entry, EntryBuilder, IdentityDescriptor,
    ProtectedHeader, SignableEntry, SignatureProof, StorageDescriptor, StorageLocation,
};
pub use error::{CanonicalizationError, EntryBuildError, LbxError, NiUriError};
pub use ni_uri::NiUri;
pub use revision::{
    EntryResolver, IssueSeverity, RevisionGraph, RevisionIssue, RevisionIssueCode,
    RevisionTraversal,
};
pub use temporal::Timestamp;
pub use validation::{EntryValidator, ValidationContext, ValidationIssue, ValidationReport};
