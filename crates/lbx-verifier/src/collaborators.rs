//! # Pipeline Collaborators
//!
//! External services the pipeline consumes but does not implement: storage
//! providers, anchor verification, certificate validation and storage
//! location resolution. Entry lookup for revision chains uses
//! [`lbx_core::EntryResolver`].
//!
//! All traits are `Send + Sync` and object safe; the verifier holds them as
//! `Arc<dyn Trait>` so one instance can serve concurrent runs.
//!
//! [`InMemoryStorageAdapter`] and [`StaticAnchorVerifier`] are in-process
//! implementations for tests and local tooling.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use lbx_core::{AnchorProof, Entry, StorageLocation};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CollaboratorError;

/// Metadata a storage provider reports for a stored object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageMetadata {
    /// Digest URI of the stored bytes as computed by the provider.
    pub integrity_proof: String,
    pub media_type: String,
    pub size_bytes: u64,
    pub location: StorageLocation,
}

/// A storage provider for one protocol.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Whether an object exists at `location`.
    async fn exists(&self, location: &str) -> Result<bool, CollaboratorError>;

    /// Provider-reported metadata for the object at `location`.
    async fn get_metadata(&self, location: &str) -> Result<StorageMetadata, CollaboratorError>;
}

/// Checks an anchor proof on its ledger.
///
/// ## Security Invariant
///
/// Return `Ok(true)` only when the ledger record referenced by the anchor
/// binds the entry's anchor digest. A lookup failure is an `Err`, not
/// `Ok(false)`.
#[async_trait]
pub trait AnchorVerifier: Send + Sync {
    async fn verify_anchor(
        &self,
        anchor: &AnchorProof,
        entry: &Entry,
        network: &str,
    ) -> Result<bool, CollaboratorError>;
}

/// A certificate issued over an entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateDescriptor {
    pub id: String,
    /// Encoding, e.g. `vc-jwt` or `x509`.
    pub format: String,
    pub issuer: String,
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<lbx_core::Timestamp>,
    /// Format-specific certificate body.
    #[serde(default)]
    pub payload: Value,
}

/// Outcome of certificate validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateValidation {
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

#[async_trait]
pub trait CertificateValidator: Send + Sync {
    async fn validate_certificate(
        &self,
        certificate: &CertificateDescriptor,
        entry: &Entry,
    ) -> Result<CertificateValidation, CollaboratorError>;
}

/// Maps an entry to the provider-specific identifier of its stored object
/// (a CID, an object key).
#[async_trait]
pub trait StorageLocationResolver: Send + Sync {
    async fn resolve_location(&self, entry: &Entry) -> Result<Option<String>, CollaboratorError>;
}

#[async_trait]
impl<F> StorageLocationResolver for F
where
    F: Fn(&Entry) -> Option<String> + Send + Sync,
{
    async fn resolve_location(&self, entry: &Entry) -> Result<Option<String>, CollaboratorError> {
        Ok(self(entry))
    }
}

// ─── InMemoryStorageAdapter ──────────────────────────────────────────────

/// Storage adapter over an in-process map of location to metadata.
#[derive(Debug, Default)]
pub struct InMemoryStorageAdapter {
    objects: DashMap<String, StorageMetadata>,
}

impl InMemoryStorageAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an object at `location`, replacing any previous one.
    pub fn insert(&self, location: impl Into<String>, metadata: StorageMetadata) {
        self.objects.insert(location.into(), metadata);
    }
}

#[async_trait]
impl StorageAdapter for InMemoryStorageAdapter {
    async fn exists(&self, location: &str) -> Result<bool, CollaboratorError> {
        Ok(self.objects.contains_key(location))
    }

    async fn get_metadata(&self, location: &str) -> Result<StorageMetadata, CollaboratorError> {
        self.objects
            .get(location)
            .map(|m| m.value().clone())
            .ok_or_else(|| CollaboratorError::NotFound(location.to_string()))
    }
}

// ─── StaticAnchorVerifier ────────────────────────────────────────────────

/// Anchor verifier that returns a fixed answer and counts calls.
#[derive(Debug)]
pub struct StaticAnchorVerifier {
    outcome: Result<bool, CollaboratorError>,
    calls: AtomicUsize,
}

impl StaticAnchorVerifier {
    pub fn accepting() -> Self {
        Self::with_outcome(Ok(true))
    }

    pub fn rejecting() -> Self {
        Self::with_outcome(Ok(false))
    }

    pub fn with_outcome(outcome: Result<bool, CollaboratorError>) -> Self {
        Self {
            outcome,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of `verify_anchor` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnchorVerifier for StaticAnchorVerifier {
    async fn verify_anchor(
        &self,
        anchor: &AnchorProof,
        _entry: &Entry,
        network: &str,
    ) -> Result<bool, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(chain = %anchor.chain, network, "static anchor verification");
        self.outcome.clone()
    }
}
