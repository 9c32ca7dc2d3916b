//! # Entry Model
//!
//! The [`Entry`] is the signed, anchored unit of provenance. It describes a
//! stored artifact (where it lives, its integrity proof, size and media type),
//! who produced it, optional custody encryption, an external anchor and the
//! signatures over its canonical payload.
//!
//! ## Signing payload
//!
//! [`Entry::canonical_payload()`] canonicalizes a [`SignableEntry`], a
//! borrowed view with every member except `signatures`. Adding a signature
//! therefore never changes the payload the other signers signed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::canonical::CanonicalBytes;
use crate::digest::{ContentDigest, HashAlgorithm};
use crate::error::{CanonicalizationError, EntryBuildError};
use crate::temporal::Timestamp;

/// A provenance entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// UUIDv4 identifier.
    pub id: String,
    /// UUIDv4 of the entry this one revises.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_id: Option<String>,
    /// Semantic version string of the entry format.
    pub version: String,
    /// Where the artifact is stored and how to check it.
    pub storage: StorageDescriptor,
    /// Custody encryption, when the artifact is encrypted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption: Option<EncryptionDescriptor>,
    /// Who produced the artifact.
    pub identity: IdentityDescriptor,
    /// When the entry was created.
    pub timestamp: Timestamp,
    /// External anchor binding the entry digest to a point in time.
    pub anchor: AnchorProof,
    /// Signatures over the canonical payload.
    #[serde(default)]
    pub signatures: Vec<SignatureProof>,
    /// Opaque application data. Included in the signing payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

/// Storage location and integrity data for the referenced artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageDescriptor {
    /// Adapter key, e.g. `ipfs` or `s3`.
    pub protocol: String,
    /// `ni:///` digest URI of the artifact bytes.
    pub integrity_proof: String,
    /// RFC 6838 media type.
    pub media_type: String,
    /// Artifact size in bytes.
    pub size_bytes: u64,
    /// Descriptive placement of the artifact.
    pub location: StorageLocation,
}

/// Descriptive placement metadata. Informational, not authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StorageLocation {
    pub region: String,
    pub jurisdiction: String,
    pub provider: String,
}

/// Custody encryption of the stored artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionDescriptor {
    /// Content encryption algorithm, e.g. `AES-256-GCM`.
    pub algorithm: String,
    /// Custody model, e.g. `org-managed` or `multi-sig`.
    pub key_ownership: String,
    /// Key release policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<EncryptionPolicy>,
    /// Public keys of the custodians.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_keys: Option<Vec<String>>,
    /// Key ids that last held control of the content key.
    #[serde(default)]
    pub last_controlled_by: Vec<String>,
}

impl EncryptionDescriptor {
    /// Custody model string for multi-signature ownership.
    pub const MULTI_SIG: &'static str = "multi-sig";

    /// Whether custody is held under a multi-signature policy.
    pub fn is_multi_sig(&self) -> bool {
        self.key_ownership.eq_ignore_ascii_case(Self::MULTI_SIG)
    }

    /// The policy threshold, when a positive one is declared.
    pub fn threshold(&self) -> Option<u32> {
        self.policy
            .as_ref()
            .and_then(|p| p.threshold)
            .filter(|t| *t > 0)
    }
}

/// Key release policy, e.g. `{"type":"threshold","threshold":2,"total":3}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionPolicy {
    #[serde(rename = "type")]
    pub policy_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u32>,
}

/// Identity of the producer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityDescriptor {
    /// Organization: DID, Stellar account or CAIP-10 account.
    pub org: String,
    /// Subordinate process identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process: Option<String>,
    /// Artifact name within the organization.
    pub artifact: String,
    /// Subject the artifact is about.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

/// External anchor of the entry digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorProof {
    /// CAIP-2 chain id (`stellar:testnet`, `eip155:1`) or a non-ledger kind.
    pub chain: String,
    /// Ledger-specific reference, usually a transaction hash.
    #[serde(alias = "tx_hash")]
    pub anchor_ref: String,
    /// Hash algorithm used to digest the canonical payload for anchoring.
    pub hash_alg: String,
    /// Token id for NFT-style anchors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_id: Option<String>,
    /// Contract address for NFT-style anchors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,
    /// When the anchor was recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchored_at: Option<Timestamp>,
}

impl AnchorProof {
    /// The declared hash algorithm, when supported.
    pub fn hash_algorithm(&self) -> Option<HashAlgorithm> {
        HashAlgorithm::parse(&self.hash_alg)
    }
}

/// A detached signature over the entry's canonical payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureProof {
    /// Protected header naming the algorithm and signing key.
    #[serde(rename = "protected")]
    pub protected_header: ProtectedHeader,
    /// Unpadded base64url signature value.
    pub signature: String,
}

/// Protected signature header. Unknown members are preserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedHeader {
    pub alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ProtectedHeader {
    /// Header with an algorithm and key id and no extra members.
    pub fn new(alg: impl Into<String>, kid: impl Into<String>) -> Self {
        Self {
            alg: alg.into(),
            kid: Some(kid.into()),
            extra: BTreeMap::new(),
        }
    }
}

/// Borrowed view of an [`Entry`] without its signatures.
///
/// This is the exact shape that gets signed and anchored.
#[derive(Debug, Serialize)]
pub struct SignableEntry<'a> {
    pub id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_id: Option<&'a str>,
    pub version: &'a str,
    pub storage: &'a StorageDescriptor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption: Option<&'a EncryptionDescriptor>,
    pub identity: &'a IdentityDescriptor,
    pub timestamp: &'a Timestamp,
    pub anchor: &'a AnchorProof,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<&'a Value>,
}

impl Entry {
    /// Start building an entry.
    pub fn builder() -> EntryBuilder {
        EntryBuilder::default()
    }

    /// Borrow the signable portion of this entry.
    pub fn signable(&self) -> SignableEntry<'_> {
        SignableEntry {
            id: &self.id,
            previous_id: self.previous_id.as_deref(),
            version: &self.version,
            storage: &self.storage,
            encryption: self.encryption.as_ref(),
            identity: &self.identity,
            timestamp: &self.timestamp,
            anchor: &self.anchor,
            extensions: self.extensions.as_ref(),
        }
    }

    /// Canonical bytes of the entry with `signatures` excluded.
    pub fn canonical_payload(&self) -> Result<CanonicalBytes, CanonicalizationError> {
        CanonicalBytes::new(&self.signable())
    }

    /// Digest of the canonical payload under `algorithm`.
    pub fn hash(&self, algorithm: HashAlgorithm) -> Result<ContentDigest, CanonicalizationError> {
        let payload = self.canonical_payload()?;
        Ok(ContentDigest::of_canonical(algorithm, &payload))
    }

    /// The declared predecessor id, ignoring blank values.
    pub fn predecessor(&self) -> Option<&str> {
        self.previous_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// Builder for [`Entry`].
#[derive(Debug, Default, Clone)]
pub struct EntryBuilder {
    id: Option<String>,
    previous_id: Option<String>,
    version: Option<String>,
    storage: Option<StorageDescriptor>,
    encryption: Option<EncryptionDescriptor>,
    identity: Option<IdentityDescriptor>,
    timestamp: Option<Timestamp>,
    anchor: Option<AnchorProof>,
    signatures: Vec<SignatureProof>,
    extensions: Option<Value>,
}

impl EntryBuilder {
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn previous_id(mut self, previous_id: impl Into<String>) -> Self {
        self.previous_id = Some(previous_id.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn storage(mut self, storage: StorageDescriptor) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn encryption(mut self, encryption: EncryptionDescriptor) -> Self {
        self.encryption = Some(encryption);
        self
    }

    pub fn identity(mut self, identity: IdentityDescriptor) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn anchor(mut self, anchor: AnchorProof) -> Self {
        self.anchor = Some(anchor);
        self
    }

    pub fn signature(mut self, signature: SignatureProof) -> Self {
        self.signatures.push(signature);
        self
    }

    pub fn signatures(mut self, signatures: impl IntoIterator<Item = SignatureProof>) -> Self {
        self.signatures.extend(signatures);
        self
    }

    pub fn extensions(mut self, extensions: Value) -> Self {
        self.extensions = Some(extensions);
        self
    }

    /// Build a signed entry. Requires at least one signature.
    pub fn build(self) -> Result<Entry, EntryBuildError> {
        if self.signatures.is_empty() {
            return Err(EntryBuildError::NoSignatures);
        }
        self.build_unsigned()
    }

    /// Build an entry that may have no signatures yet, for signing flows.
    ///
    /// The `timestamp` defaults to now when unset.
    pub fn build_unsigned(self) -> Result<Entry, EntryBuildError> {
        Ok(Entry {
            id: self.id.ok_or(EntryBuildError::MissingField("id"))?,
            previous_id: self.previous_id,
            version: self.version.ok_or(EntryBuildError::MissingField("version"))?,
            storage: self.storage.ok_or(EntryBuildError::MissingField("storage"))?,
            encryption: self.encryption,
            identity: self
                .identity
                .ok_or(EntryBuildError::MissingField("identity"))?,
            timestamp: self.timestamp.unwrap_or_else(Timestamp::now),
            anchor: self.anchor.ok_or(EntryBuildError::MissingField("anchor"))?,
            signatures: self.signatures,
            extensions: self.extensions,
        })
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub const ENTRY_ID: &str = "3f2b8c1e-9a4d-4c6e-8f10-2b7d5e9a1c34";
    pub const PREVIOUS_ID: &str = "a1b2c3d4-e5f6-4a7b-8c9d-0e1f2a3b4c5d";

    pub fn storage() -> StorageDescriptor {
        StorageDescriptor {
            protocol: "ipfs".to_string(),
            integrity_proof: "ni:///sha-256;uU0nuZNNPgilLlLX2n2r-sSE7-N6U4DukIj3rOLvzek"
                .to_string(),
            media_type: "application/pdf".to_string(),
            size_bytes: 11,
            location: StorageLocation {
                region: "us-east-1".to_string(),
                jurisdiction: "US/DE".to_string(),
                provider: "IPFS".to_string(),
            },
        }
    }

    pub fn identity() -> IdentityDescriptor {
        IdentityDescriptor {
            org: "did:example:org".to_string(),
            process: None,
            artifact: "quarterly-report".to_string(),
            subject: None,
        }
    }

    pub fn anchor() -> AnchorProof {
        AnchorProof {
            chain: "stellar:testnet".to_string(),
            anchor_ref: "a".repeat(64),
            hash_alg: "sha-256".to_string(),
            token_id: None,
            contract_address: None,
            anchored_at: None,
        }
    }

    pub fn signature() -> SignatureProof {
        SignatureProof {
            protected_header: ProtectedHeader::new("EdDSA", "key-1"),
            signature: "c2lnbmF0dXJl".to_string(),
        }
    }

    pub fn entry() -> Entry {
        Entry::builder()
            .id(ENTRY_ID)
            .version("1.0")
            .storage(storage())
            .identity(identity())
            .timestamp(Timestamp::parse("2024-05-01T12:00:00Z").unwrap())
            .anchor(anchor())
            .signature(signature())
            .build()
            .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn builder_requires_signature() {
        let result = Entry::builder()
            .id(ENTRY_ID)
            .version("1.0")
            .storage(storage())
            .identity(identity())
            .anchor(anchor())
            .build();
        assert_eq!(result.unwrap_err(), EntryBuildError::NoSignatures);
    }

    #[test]
    fn builder_reports_first_missing_field() {
        let result = Entry::builder().id(ENTRY_ID).build_unsigned();
        assert_eq!(result.unwrap_err(), EntryBuildError::MissingField("version"));
    }

    #[test]
    fn canonical_payload_excludes_signatures() {
        let entry = entry();
        let payload = entry.canonical_payload().unwrap();
        assert!(!payload.as_str().contains("signatures"));
        assert!(payload.as_str().starts_with(r#"{"anchor":{"#));

        let mut resigned = entry.clone();
        resigned.signatures.push(signature());
        assert_eq!(resigned.canonical_payload().unwrap(), payload);
    }

    #[test]
    fn canonical_payload_changes_with_any_other_member() {
        let entry = entry();
        let mut changed = entry.clone();
        changed.version = "1.1".to_string();
        assert_ne!(
            entry.canonical_payload().unwrap(),
            changed.canonical_payload().unwrap()
        );
    }

    #[test]
    fn canonical_member_order_is_sorted() {
        let payload = entry().canonical_payload().unwrap();
        let text = payload.as_str();
        let positions: Vec<usize> = [
            "\"anchor\"",
            "\"id\"",
            "\"identity\"",
            "\"storage\"",
            "\"timestamp\"",
            "\"version\"",
        ]
        .iter()
        .map(|k| text.find(k).unwrap())
        .collect();
        let mut sorted = positions.clone();
        sorted.sort_unstable();
        assert_eq!(positions, sorted);
    }

    #[test]
    fn json_round_trip_preserves_header_extras() {
        let json = serde_json::json!({
            "id": ENTRY_ID,
            "version": "1.0",
            "storage": storage(),
            "identity": identity(),
            "timestamp": "2024-05-01T12:00:00Z",
            "anchor": {"chain": "eip155:1", "tx_hash": "0xabc", "hash_alg": "sha-256"},
            "signatures": [{
                "protected": {"alg": "EdDSA", "kid": "k", "typ": "lbx+jws"},
                "signature": "AA"
            }]
        });
        let entry: Entry = serde_json::from_value(json).unwrap();
        assert_eq!(entry.anchor.anchor_ref, "0xabc");
        let header = &entry.signatures[0].protected_header;
        assert_eq!(header.extra.get("typ").and_then(Value::as_str), Some("lbx+jws"));

        let back = serde_json::to_value(&entry).unwrap();
        assert_eq!(back["anchor"]["anchor_ref"], "0xabc");
        assert_eq!(back["signatures"][0]["protected"]["typ"], "lbx+jws");
    }

    #[test]
    fn missing_signatures_member_deserializes_empty() {
        let mut value = serde_json::to_value(entry()).unwrap();
        value.as_object_mut().unwrap().remove("signatures");
        let entry: Entry = serde_json::from_value(value).unwrap();
        assert!(entry.signatures.is_empty());
    }

    #[test]
    fn predecessor_ignores_blank() {
        let mut entry = entry();
        assert_eq!(entry.predecessor(), None);
        entry.previous_id = Some("  ".to_string());
        assert_eq!(entry.predecessor(), None);
        entry.previous_id = Some(PREVIOUS_ID.to_string());
        assert_eq!(entry.predecessor(), Some(PREVIOUS_ID));
    }

    #[test]
    fn multi_sig_detection_is_case_insensitive() {
        let enc = EncryptionDescriptor {
            algorithm: "AES-256-GCM".to_string(),
            key_ownership: "Multi-Sig".to_string(),
            policy: Some(EncryptionPolicy {
                policy_type: "threshold".to_string(),
                threshold: Some(2),
                total: Some(3),
            }),
            public_keys: None,
            last_controlled_by: vec!["key-1".to_string()],
        };
        assert!(enc.is_multi_sig());
        assert_eq!(enc.threshold(), Some(2));
    }
}
