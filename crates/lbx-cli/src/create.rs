//! # Create Subcommand
//!
//! Builds an entry from flags, signs it when a key file is given, validates
//! it, and prints its canonical JSON and SHA-256 hash. The entry JSON goes
//! to `--output`, or to stdout after the hash.
//!
//! ```bash
//! lbx create \
//!     --content report.pdf --media-type application/pdf --protocol ipfs \
//!     --region us-east-1 --jurisdiction US/DE --provider IPFS \
//!     --org did:example:acme --artifact report.pdf \
//!     --chain stellar:testnet --anchor-ref 7d3c...e1 \
//!     --key acme-ops.json --output entry.json
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use lbx_core::{
    AnchorProof, EncryptionDescriptor, EncryptionPolicy, Entry, EntryValidator, HashAlgorithm,
    IdentityDescriptor, NiUri, StorageDescriptor, StorageLocation, Timestamp, ValidationContext,
};
use lbx_crypto::{InMemoryKeyStore, SigningKey, SigningService};
use lbx_verifier::VerifierConfig;

use crate::{report_canonical, report_issues, EXIT_INVALID, EXIT_OK};

/// Arguments for the create subcommand.
#[derive(Args, Debug, Default)]
pub struct CreateArgs {
    /// Entry id (UUID v4). Generated when omitted.
    #[arg(long)]
    pub id: Option<String>,

    /// Id of the entry this one revises.
    #[arg(long)]
    pub previous_id: Option<String>,

    /// Entry format version.
    #[arg(long = "entry-version", default_value = "1.0")]
    pub version: String,

    // ─── storage ───
    /// File whose bytes are described; derives integrity proof and size.
    #[arg(long, conflicts_with_all = ["integrity_proof", "size_bytes"])]
    pub content: Option<PathBuf>,

    /// Digest URI of the stored bytes (`ni:///sha-256;...`).
    #[arg(long)]
    pub integrity_proof: Option<String>,

    /// Size of the stored bytes.
    #[arg(long)]
    pub size_bytes: Option<u64>,

    /// Storage protocol, e.g. `ipfs`, `s3`, `gcs`.
    #[arg(long, default_value = "ipfs")]
    pub protocol: String,

    #[arg(long)]
    pub media_type: String,

    #[arg(long)]
    pub region: String,

    #[arg(long)]
    pub jurisdiction: String,

    #[arg(long)]
    pub provider: String,

    // ─── encryption ───
    /// Encryption algorithm. Enables the encryption descriptor.
    #[arg(long)]
    pub encryption_algorithm: Option<String>,

    /// Key ownership model, e.g. `org-managed` or `multi-sig`.
    #[arg(long, requires = "encryption_algorithm")]
    pub key_ownership: Option<String>,

    /// Key release policy type, e.g. `threshold`.
    #[arg(long, requires = "encryption_algorithm")]
    pub policy_type: Option<String>,

    #[arg(long, requires = "policy_type")]
    pub policy_threshold: Option<u32>,

    #[arg(long, requires = "policy_type")]
    pub policy_total: Option<u32>,

    /// Participant public key identifier. Repeatable.
    #[arg(long = "public-key", requires = "encryption_algorithm")]
    pub public_keys: Vec<String>,

    /// Key that last controlled the encrypted object. Repeatable.
    #[arg(long = "last-controlled-by", requires = "encryption_algorithm")]
    pub last_controlled_by: Vec<String>,

    // ─── identity ───
    #[arg(long)]
    pub org: String,

    #[arg(long)]
    pub process: Option<String>,

    #[arg(long)]
    pub artifact: String,

    #[arg(long)]
    pub subject: Option<String>,

    /// Creation time (RFC 3339, UTC). Defaults to now.
    #[arg(long)]
    pub timestamp: Option<String>,

    // ─── anchor ───
    /// CAIP-2 chain id or non-ledger anchor kind.
    #[arg(long)]
    pub chain: String,

    /// Ledger transaction hash or anchor reference.
    #[arg(long)]
    pub anchor_ref: String,

    #[arg(long, default_value = "sha-256")]
    pub hash_alg: String,

    #[arg(long, requires = "contract_address")]
    pub token_id: Option<String>,

    #[arg(long, requires = "token_id")]
    pub contract_address: Option<String>,

    #[arg(long)]
    pub anchored_at: Option<String>,

    /// Extension members as a JSON object.
    #[arg(long)]
    pub extensions: Option<String>,

    // ─── signing and output ───
    /// Key file written by `lbx keygen`. Signs the canonical payload.
    #[arg(long)]
    pub key: Option<PathBuf>,

    /// Signature algorithm. Defaults to the key's type.
    #[arg(long, requires = "key")]
    pub algorithm: Option<String>,

    /// Where to write the entry JSON. Stdout when omitted.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

/// Execute the create subcommand.
pub fn run_create(args: &CreateArgs, config: &VerifierConfig, out: &mut impl Write) -> Result<u8> {
    let mut entry = build_entry(args)?;

    if let Some(path) = &args.key {
        let key = read_key(path)?;
        let algorithm = args.algorithm.clone().unwrap_or_else(|| key.key_type.clone());
        let signing = SigningService::new(Arc::new(InMemoryKeyStore::new()));
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .context("starting signing runtime")?;
        runtime
            .block_on(signing.sign_entry(&mut entry, &key, &algorithm))
            .with_context(|| format!("signing with key {}", key.key_id))?;
        tracing::info!(entry_id = %entry.id, key_id = %key.key_id, "entry signed");
    }

    let context = ValidationContext {
        network: config.default_anchor_network.clone(),
        require_signatures: args.key.is_some(),
    };
    let report = EntryValidator::new().validate(&entry, &context);
    report_issues(out, &report.errors, &report.warnings)?;
    if !report.is_valid() {
        return Ok(EXIT_INVALID);
    }

    report_canonical(out, &entry)?;
    let json = serde_json::to_string_pretty(&entry)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, format!("{json}\n"))
                .with_context(|| format!("writing entry: {}", path.display()))?;
            writeln!(out, "written: {}", path.display())?;
        }
        None => writeln!(out, "{json}")?,
    }
    Ok(EXIT_OK)
}

/// Assemble the unsigned entry described by `args`.
pub fn build_entry(args: &CreateArgs) -> Result<Entry> {
    let declared = (&args.content, &args.integrity_proof, args.size_bytes);
    let (integrity_proof, size_bytes) = match declared {
        (Some(path), _, _) => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("reading content: {}", path.display()))?;
            (NiUri::for_content(HashAlgorithm::Sha256, &bytes), bytes.len() as u64)
        }
        (None, Some(proof), Some(size)) => (proof.clone(), size),
        _ => bail!("either --content or both --integrity-proof and --size-bytes are required"),
    };

    let storage = StorageDescriptor {
        protocol: args.protocol.clone(),
        integrity_proof,
        media_type: args.media_type.clone(),
        size_bytes,
        location: StorageLocation {
            region: args.region.clone(),
            jurisdiction: args.jurisdiction.clone(),
            provider: args.provider.clone(),
        },
    };

    let identity = IdentityDescriptor {
        org: args.org.clone(),
        process: args.process.clone(),
        artifact: args.artifact.clone(),
        subject: args.subject.clone(),
    };

    let anchor = AnchorProof {
        chain: args.chain.clone(),
        anchor_ref: args.anchor_ref.clone(),
        hash_alg: args.hash_alg.clone(),
        token_id: args.token_id.clone(),
        contract_address: args.contract_address.clone(),
        anchored_at: args.anchored_at.as_deref().map(parse_time).transpose()?,
    };

    let mut builder = Entry::builder()
        .id(args.id.clone().unwrap_or_else(|| uuid::Uuid::new_v4().to_string()))
        .version(args.version.as_str())
        .storage(storage)
        .identity(identity)
        .anchor(anchor);
    if let Some(previous_id) = &args.previous_id {
        builder = builder.previous_id(previous_id.as_str());
    }
    if let Some(timestamp) = &args.timestamp {
        builder = builder.timestamp(parse_time(timestamp)?);
    }
    if let Some(encryption) = encryption(args) {
        builder = builder.encryption(encryption);
    }
    if let Some(raw) = &args.extensions {
        let extensions: serde_json::Value =
            serde_json::from_str(raw).context("parsing --extensions JSON")?;
        builder = builder.extensions(extensions);
    }
    Ok(builder.build_unsigned()?)
}

fn encryption(args: &CreateArgs) -> Option<EncryptionDescriptor> {
    let algorithm = args.encryption_algorithm.clone()?;
    let policy = args.policy_type.as_ref().map(|policy_type| EncryptionPolicy {
        policy_type: policy_type.clone(),
        threshold: args.policy_threshold,
        total: args.policy_total,
    });
    Some(EncryptionDescriptor {
        algorithm,
        key_ownership: args.key_ownership.clone().unwrap_or_default(),
        policy,
        public_keys: (!args.public_keys.is_empty()).then(|| args.public_keys.clone()),
        last_controlled_by: args.last_controlled_by.clone(),
    })
}

fn parse_time(raw: &str) -> Result<Timestamp> {
    Timestamp::parse(raw).with_context(|| format!("invalid timestamp '{raw}'"))
}

fn read_key(path: &Path) -> Result<SigningKey> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading key file: {}", path.display()))?;
    let key: SigningKey = serde_json::from_str(&raw)
        .with_context(|| format!("parsing key file: {}", path.display()))?;
    if !key.has_private_key() {
        bail!("key file {} has no private key", path.display());
    }
    Ok(key)
}
