//! # Entry Validation
//!
//! Semantic validation of a typed [`Entry`]: required members, UUID shapes,
//! digest URIs, media types, identity formats, chain identifiers and
//! signature headers.
//!
//! Every problem becomes a [`ValidationIssue`] with a stable dotted `code`,
//! a human readable message and the field `path` it concerns. Validation
//! never fails as an operation; callers inspect the returned
//! [`ValidationReport`].

use std::sync::OnceLock;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::digest::HashAlgorithm;
use crate::entry::{
    AnchorProof, EncryptionDescriptor, Entry, IdentityDescriptor, SignatureProof,
    StorageDescriptor,
};
use crate::ni_uri::NiUri;

/// Anchor kinds that are not ledgers and so carry no CAIP-2 chain id.
pub const NON_LEDGER_ANCHOR_KINDS: [&str; 3] = ["local", "notary", "rfc3161"];

/// Signature algorithm identifiers accepted in protected headers, including
/// the aliases the signing service normalizes.
const KNOWN_SIGNATURE_ALGORITHMS: [&str; 7] = [
    "eddsa",
    "ed25519",
    "es256k",
    "secp256k1",
    "rs256",
    "rsa",
    "rsassa-pkcs1-v1_5",
];

/// A single validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Stable dotted code, e.g. `core.storage.invalid_size`.
    pub code: String,
    /// Human readable explanation.
    pub message: String,
    /// Field path, e.g. `signatures[0].protected.alg`.
    pub path: String,
}

impl ValidationIssue {
    pub fn new(code: &str, message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            path: path.into(),
        }
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {} ({})", self.code, self.message, self.path)
    }
}

/// Errors and warnings from one validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// True when no errors were found. Warnings do not affect validity.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Whether any error carries `code`.
    pub fn has_error(&self, code: &str) -> bool {
        self.errors.iter().any(|e| e.code == code)
    }

    /// Whether any warning carries `code`.
    pub fn has_warning(&self, code: &str) -> bool {
        self.warnings.iter().any(|w| w.code == code)
    }

    fn error(&mut self, code: &str, message: impl Into<String>, path: impl Into<String>) {
        self.errors.push(ValidationIssue::new(code, message, path));
    }

    fn warning(&mut self, code: &str, message: impl Into<String>, path: impl Into<String>) {
        self.warnings.push(ValidationIssue::new(code, message, path));
    }
}

/// Caller-supplied validation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationContext {
    /// Expected anchor chain. When set, a different `anchor.chain` is an error.
    #[serde(default)]
    pub network: Option<String>,
    /// Whether an empty signature list is an error.
    #[serde(default = "default_true")]
    pub require_signatures: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ValidationContext {
    fn default() -> Self {
        Self {
            network: None,
            require_signatures: true,
        }
    }
}

impl ValidationContext {
    /// Context expecting anchors on `network`.
    pub fn for_network(network: impl Into<String>) -> Self {
        Self {
            network: Some(network.into()),
            ..Self::default()
        }
    }

    /// Context for entries that are not signed yet.
    pub fn unsigned() -> Self {
        Self {
            require_signatures: false,
            ..Self::default()
        }
    }
}

/// Stateless semantic validator for entries.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntryValidator;

impl EntryValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate `entry`, collecting every issue.
    pub fn validate(&self, entry: &Entry, context: &ValidationContext) -> ValidationReport {
        let mut report = ValidationReport::default();

        if entry.id.trim().is_empty() {
            report.error("core.validation.missing_field", "id is required", "id");
        } else {
            check_uuid_v4(&entry.id, "id", &mut report);
        }

        if let Some(previous) = entry.previous_id.as_deref() {
            if !previous.trim().is_empty() {
                check_uuid_v4(previous, "previous_id", &mut report);
            }
        }

        if entry.version.trim().is_empty() {
            report.error("core.validation.missing_field", "version is required", "version");
        }

        check_storage(&entry.storage, &mut report);
        if let Some(encryption) = &entry.encryption {
            check_encryption(encryption, &mut report);
        }
        check_identity(&entry.identity, &mut report);
        check_anchor(&entry.anchor, context, &mut report);
        check_signatures(&entry.signatures, context, &mut report);

        tracing::debug!(
            entry_id = %entry.id,
            errors = report.errors.len(),
            warnings = report.warnings.len(),
            "entry validated"
        );
        report
    }
}

fn check_uuid_v4(value: &str, path: &str, report: &mut ValidationReport) {
    match Uuid::parse_str(value.trim()) {
        Err(_) => report.error(
            "core.validation.invalid_guid",
            format!("{path} must be an RFC 4122 UUID"),
            path,
        ),
        Ok(uuid) if uuid.get_version_num() != 4 => report.error(
            "core.validation.invalid_guid_version",
            format!("{path} must be a UUID v4"),
            path,
        ),
        Ok(_) => {}
    }
}

// A pattern that fails to build matches nothing, so the field is rejected.
fn media_type_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?i)^[a-z0-9!#$&^_.+-]+/[a-z0-9!#$&^_.+-]+$").ok())
        .as_ref()
}

fn hex_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^(0x)?[0-9a-fA-F]+$").ok())
        .as_ref()
}

fn matches(pattern: Option<&Regex>, value: &str) -> bool {
    pattern.is_some_and(|p| p.is_match(value))
}

fn check_storage(storage: &StorageDescriptor, report: &mut ValidationReport) {
    if storage.protocol.trim().is_empty() {
        report.error(
            "core.validation.missing_field",
            "storage.protocol is required",
            "storage.protocol",
        );
    }

    if storage.integrity_proof.trim().is_empty() {
        report.error(
            "core.validation.missing_field",
            "storage.integrity_proof is required",
            "storage.integrity_proof",
        );
    } else if NiUri::try_parse(&storage.integrity_proof).is_err() {
        report.error(
            "core.storage.invalid_integrity_proof",
            "storage.integrity_proof must be an ni:/// digest URI",
            "storage.integrity_proof",
        );
    }

    if !matches(media_type_pattern(), storage.media_type.trim()) {
        report.error(
            "core.storage.invalid_media_type",
            "storage.media_type must be a valid RFC 6838 media type",
            "storage.media_type",
        );
    }

    if storage.size_bytes == 0 {
        report.error(
            "core.storage.invalid_size",
            "storage.size_bytes must be a positive integer",
            "storage.size_bytes",
        );
    }

    let location = &storage.location;
    for (value, code, field) in [
        (&location.region, "core.storage.missing_region", "region"),
        (&location.jurisdiction, "core.storage.missing_jurisdiction", "jurisdiction"),
        (&location.provider, "core.storage.missing_provider", "provider"),
    ] {
        if value.trim().is_empty() {
            report.error(
                code,
                format!("storage.location.{field} is required"),
                format!("storage.location.{field}"),
            );
        }
    }
}

fn check_encryption(encryption: &EncryptionDescriptor, report: &mut ValidationReport) {
    if encryption.algorithm.trim().is_empty() {
        report.error(
            "core.encryption.missing_algorithm",
            "encryption.algorithm is required when encryption is present",
            "encryption.algorithm",
        );
    }

    if encryption.key_ownership.trim().is_empty() {
        report.error(
            "core.encryption.missing_key_ownership",
            "encryption.key_ownership is required",
            "encryption.key_ownership",
        );
    }

    if encryption.last_controlled_by.is_empty() {
        report.error(
            "core.encryption.missing_last_controlled_by",
            "encryption.last_controlled_by must list at least one key",
            "encryption.last_controlled_by",
        );
    }
    for (i, key) in encryption.last_controlled_by.iter().enumerate() {
        if key.trim().is_empty() {
            report.error(
                "core.encryption.invalid_last_controlled_by",
                "last_controlled_by entries must be non-empty identifiers",
                format!("encryption.last_controlled_by[{i}]"),
            );
        }
    }

    for (i, key) in encryption.public_keys.iter().flatten().enumerate() {
        if key.trim().is_empty() {
            report.error(
                "core.encryption.invalid_public_key",
                "public_keys entries must be non-empty",
                format!("encryption.public_keys[{i}]"),
            );
        }
    }

    let Some(policy) = &encryption.policy else {
        return;
    };
    if policy.policy_type.trim().is_empty() {
        report.error(
            "core.encryption.invalid_policy",
            "encryption.policy.type is required when policy is provided",
            "encryption.policy.type",
        );
    }
    if policy.policy_type.eq_ignore_ascii_case("threshold") {
        let threshold = policy.threshold.filter(|t| *t > 0);
        let total = policy.total.filter(|t| *t > 0);
        if threshold.is_none() {
            report.error(
                "core.encryption.invalid_policy_threshold",
                "threshold policies must declare a positive threshold",
                "encryption.policy.threshold",
            );
        }
        match (threshold, total) {
            (_, None) => report.error(
                "core.encryption.invalid_policy_total",
                "threshold policies must declare a positive total",
                "encryption.policy.total",
            ),
            (Some(threshold), Some(total)) if threshold > total => report.error(
                "core.encryption.invalid_policy_threshold",
                "threshold cannot exceed total participants",
                "encryption.policy",
            ),
            _ => {}
        }
    }
}

/// DID, Stellar account (`stellar:G…`, 56 chars) or CAIP-10 account id.
pub fn is_valid_identity(value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() {
        return false;
    }
    if value.starts_with("did:") {
        return value.len() > 4;
    }
    if let Some(account) = value.strip_prefix("stellar:") {
        return account.len() == 56 && account.starts_with('G');
    }
    let parts: Vec<&str> = value.split(':').collect();
    parts.len() == 3 && parts.iter().all(|p| !p.is_empty())
}

fn check_identity(identity: &IdentityDescriptor, report: &mut ValidationReport) {
    if !is_valid_identity(&identity.org) {
        report.error(
            "core.identity.invalid_org",
            "identity.org must be a DID, Stellar account or CAIP-10 account",
            "identity.org",
        );
    }

    if let Some(process) = identity.process.as_deref().filter(|p| !p.trim().is_empty()) {
        if !is_valid_identity(process) {
            report.error(
                "core.identity.invalid_process",
                "identity.process must be a DID, Stellar account or CAIP-10 account",
                "identity.process",
            );
        }
    }

    if identity.artifact.trim().is_empty() {
        report.error(
            "core.identity.missing_artifact",
            "identity.artifact is required",
            "identity.artifact",
        );
    }

    if let Some(subject) = identity.subject.as_deref().filter(|s| !s.trim().is_empty()) {
        if !is_valid_identity(subject) {
            report.error(
                "core.identity.invalid_subject",
                "identity.subject must be a DID or account identifier",
                "identity.subject",
            );
        }
    }
}

/// CAIP-2 shaped chain id: `namespace:reference`, optionally with a third
/// segment, every segment non-empty.
pub fn is_caip2_chain(chain: &str) -> bool {
    let parts: Vec<&str> = chain.split(':').collect();
    (parts.len() == 2 || parts.len() == 3) && parts.iter().all(|p| !p.trim().is_empty())
}

/// Whether `chain` names a non-ledger anchor kind.
pub fn is_non_ledger_anchor(chain: &str) -> bool {
    NON_LEDGER_ANCHOR_KINDS
        .iter()
        .any(|kind| kind.eq_ignore_ascii_case(chain.trim()))
}

fn check_anchor(anchor: &AnchorProof, context: &ValidationContext, report: &mut ValidationReport) {
    let chain = anchor.chain.trim();
    let non_ledger = is_non_ledger_anchor(chain);

    if chain.is_empty() {
        report.error("core.anchor.missing_chain", "anchor.chain is required", "anchor.chain");
    } else {
        if !non_ledger && !is_caip2_chain(chain) {
            report.error(
                "core.anchor.invalid_chain",
                "anchor.chain must be a CAIP-2 identifier or a known anchor kind",
                "anchor.chain",
            );
        }

        if let Some(network) = context.network.as_deref().filter(|n| !n.trim().is_empty()) {
            if network != chain {
                report.error(
                    "core.anchor.network_mismatch",
                    format!("anchor.chain '{chain}' does not match configured network '{network}'"),
                    "anchor.chain",
                );
            }
        }
    }

    if anchor.hash_alg.trim().is_empty() {
        report.error(
            "core.anchor.missing_hash_algorithm",
            "anchor.hash_alg is required",
            "anchor.hash_alg",
        );
    } else {
        match anchor.hash_algorithm() {
            None => report.warning(
                "core.anchor.unsupported_hash_algorithm",
                format!("anchor.hash_alg '{}' is not a supported algorithm", anchor.hash_alg),
                "anchor.hash_alg",
            ),
            Some(alg) => {
                let stellar = chain.to_ascii_lowercase().starts_with("stellar:");
                if stellar && alg != HashAlgorithm::Sha256 {
                    report.error(
                        "core.anchor.invalid_hash_algorithm",
                        "Stellar anchors must use SHA-256",
                        "anchor.hash_alg",
                    );
                }
            }
        }
    }

    let anchor_ref = anchor.anchor_ref.trim();
    if anchor_ref.is_empty() {
        report.error(
            "core.anchor.missing_anchor_ref",
            "anchor.anchor_ref is required",
            "anchor.anchor_ref",
        );
    } else if !non_ledger && !matches(hex_pattern(), anchor_ref) {
        report.error(
            "core.anchor.invalid_anchor_ref",
            "ledger anchors must reference a hexadecimal transaction hash",
            "anchor.anchor_ref",
        );
    }

    let has_token = anchor.token_id.as_deref().is_some_and(|t| !t.trim().is_empty());
    let has_contract = anchor
        .contract_address
        .as_deref()
        .is_some_and(|c| !c.trim().is_empty());
    if has_token != has_contract {
        report.error(
            "core.anchor.incomplete_token_reference",
            "anchor.token_id and anchor.contract_address must be provided together",
            if has_token {
                "anchor.contract_address"
            } else {
                "anchor.token_id"
            },
        );
    }
}

fn check_signatures(
    signatures: &[SignatureProof],
    context: &ValidationContext,
    report: &mut ValidationReport,
) {
    if signatures.is_empty() {
        if context.require_signatures {
            report.error(
                "core.signatures.missing",
                "at least one signature proof is required",
                "signatures",
            );
        }
        return;
    }

    for (i, proof) in signatures.iter().enumerate() {
        let alg = proof.protected_header.alg.trim();
        if alg.is_empty() {
            report.error(
                "core.signatures.missing_algorithm",
                "signature protected header must declare alg",
                format!("signatures[{i}].protected.alg"),
            );
        } else if !KNOWN_SIGNATURE_ALGORITHMS
            .iter()
            .any(|known| known.eq_ignore_ascii_case(alg))
        {
            report.error(
                "core.signatures.unsupported_algorithm",
                format!("signature algorithm '{alg}' is not supported"),
                format!("signatures[{i}].protected.alg"),
            );
        }

        if proof
            .protected_header
            .kid
            .as_deref()
            .map_or(true, |k| k.trim().is_empty())
        {
            report.warning(
                "core.signatures.missing_key_id",
                "signature protected header has no kid; it cannot be verified",
                format!("signatures[{i}].protected.kid"),
            );
        }

        if proof.signature.trim().is_empty() {
            report.error(
                "core.signatures.missing_value",
                "signature value is required",
                format!("signatures[{i}].signature"),
            );
        } else if URL_SAFE_NO_PAD.decode(proof.signature.trim()).is_err() {
            report.error(
                "core.signatures.invalid_encoding",
                "signature value must be unpadded base64url",
                format!("signatures[{i}].signature"),
            );
        }
    }
}
