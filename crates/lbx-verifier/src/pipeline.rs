//! # Verification Pipeline
//!
//! Runs a fixed, ordered sequence of steps against one [`Entry`]:
//!
//! | # | Step | Consumes | Produces |
//! |---|---|---|---|
//! | 1 | Schema validation | entry | |
//! | 2 | Canonicalization | entry | canonical payload, anchor digest |
//! | 3 | Signature validation | payload | valid signer set |
//! | 4 | Integrity proof validation | entry | parsed digest URI |
//! | 5 | Storage verification | digest URI | |
//! | 6 | Anchor validation | anchor digest | |
//! | 7 | Encryption policy validation | valid signer set | |
//! | 8 | Revision chain validation | entry | |
//!
//! Steps run strictly in sequence because later steps consume values earlier
//! ones produce. Collaborator calls are awaited one at a time.
//!
//! ## Failure isolation
//!
//! A step records problems as messages and its status is derived from them.
//! An unexpected failure inside a step (a collaborator error the step does
//! not handle itself, or a panic raised while the step runs) becomes a
//! `verifier.step.exception` Error on that step and the pipeline moves on.
//!
//! ## Cancellation
//!
//! The [`CancellationToken`] is checked before every step, inside the
//! per-signature loop, and raced against every collaborator call. When it
//! fires, the current step is marked Skipped with `verifier.step.cancelled`
//! and the run ends with [`VerifyError::Cancelled`], which carries the steps
//! finalized so far.

use std::collections::{BTreeSet, HashMap};
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;

use lbx_core::{
    ContentDigest, Entry, EntryResolver, EntryValidator, IssueSeverity, NiUri, RevisionGraph,
    RevisionTraversal, ValidationContext,
};
use lbx_crypto::SigningService;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::collaborators::{
    AnchorVerifier, CertificateDescriptor, CertificateValidator, StorageAdapter,
    StorageLocationResolver,
};
use crate::config::VerifierConfig;
use crate::error::{CollaboratorError, VerifyError};
use crate::result::{StepContext, StepResult, StepStatus, VerificationResult};

/// The pipeline steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStep {
    Schema,
    Canonicalization,
    Signatures,
    Integrity,
    Storage,
    Anchor,
    Encryption,
    Revision,
}

impl PipelineStep {
    pub const ALL: [PipelineStep; 8] = [
        Self::Schema,
        Self::Canonicalization,
        Self::Signatures,
        Self::Integrity,
        Self::Storage,
        Self::Anchor,
        Self::Encryption,
        Self::Revision,
    ];

    /// Display name recorded on the step result.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Schema => "Schema validation",
            Self::Canonicalization => "Canonicalization",
            Self::Signatures => "Signature validation",
            Self::Integrity => "Integrity proof validation",
            Self::Storage => "Storage verification",
            Self::Anchor => "Anchor validation",
            Self::Encryption => "Encryption policy validation",
            Self::Revision => "Revision chain validation",
        }
    }
}

impl std::fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Name of the single step run by [`Verifier::verify_certificate`].
pub const CERTIFICATE_STEP: &str = "Certificate validation";

/// Why a step body stopped early.
#[derive(Debug)]
enum StepInterrupt {
    Cancelled,
    Failed(String),
}

impl From<CollaboratorError> for StepInterrupt {
    fn from(e: CollaboratorError) -> Self {
        Self::Failed(e.to_string())
    }
}

type StepOutcome = Result<(), StepInterrupt>;

/// Values produced by earlier steps for later ones.
#[derive(Default)]
struct RunState {
    payload: Option<lbx_core::CanonicalBytes>,
    anchor_digest: Option<ContentDigest>,
    valid_signers: BTreeSet<String>,
    integrity: Option<NiUri>,
}

/// Await a step body, turning a panic into [`StepInterrupt::Failed`].
async fn contained(fut: impl Future<Output = StepOutcome>) -> StepOutcome {
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(payload) => Err(StepInterrupt::Failed(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked".to_string()
    }
}

/// Await `fut` unless `cancel` fires first.
async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = T>,
) -> Result<T, StepInterrupt> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(StepInterrupt::Cancelled),
        out = fut => Ok(out),
    }
}

// ─── Verifier ────────────────────────────────────────────────────────────

/// Orchestrates verification of entries against injected collaborators.
///
/// Cheap to clone; collaborators are shared.
#[derive(Clone)]
pub struct Verifier {
    config: VerifierConfig,
    validator: EntryValidator,
    signing: SigningService,
    storage_adapters: HashMap<String, Arc<dyn StorageAdapter>>,
    location_resolver: Option<Arc<dyn StorageLocationResolver>>,
    anchor_verifier: Option<Arc<dyn AnchorVerifier>>,
    certificate_validator: Option<Arc<dyn CertificateValidator>>,
    entry_resolver: Option<Arc<dyn EntryResolver>>,
}

impl std::fmt::Debug for Verifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut protocols: Vec<&String> = self.storage_adapters.keys().collect();
        protocols.sort();
        f.debug_struct("Verifier")
            .field("config", &self.config)
            .field("storage_protocols", &protocols)
            .field("location_resolver", &self.location_resolver.is_some())
            .field("anchor_verifier", &self.anchor_verifier.is_some())
            .field("certificate_validator", &self.certificate_validator.is_some())
            .field("entry_resolver", &self.entry_resolver.is_some())
            .finish()
    }
}

impl Verifier {
    /// Start configuring a verifier around a signing service.
    pub fn builder(signing: SigningService) -> VerifierBuilder {
        VerifierBuilder {
            verifier: Self {
                config: VerifierConfig::default(),
                validator: EntryValidator::new(),
                signing,
                storage_adapters: HashMap::new(),
                location_resolver: None,
                anchor_verifier: None,
                certificate_validator: None,
                entry_resolver: None,
            },
        }
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Run the full pipeline against `entry`.
    ///
    /// # Errors
    ///
    /// Only [`VerifyError::Cancelled`]. Every other problem is reported
    /// inside the returned [`VerificationResult`].
    pub async fn verify(
        &self,
        entry: &Entry,
        cancel: &CancellationToken,
    ) -> Result<VerificationResult, VerifyError> {
        let span = tracing::info_span!("verify_entry", entry_id = %entry.id);
        self.run_pipeline(entry, cancel).instrument(span).await
    }

    async fn run_pipeline(
        &self,
        entry: &Entry,
        cancel: &CancellationToken,
    ) -> Result<VerificationResult, VerifyError> {
        let mut result = VerificationResult::default();
        let mut state = RunState::default();

        for step in PipelineStep::ALL {
            let mut step_result = StepResult::new(step.name());
            let outcome = if cancel.is_cancelled() {
                Err(StepInterrupt::Cancelled)
            } else {
                let mut ctx = StepContext::new(&mut step_result);
                contained(self.run_step(step, entry, &mut state, &mut ctx, cancel)).await
            };
            finish_step(&mut result, step_result, outcome)?;
        }

        tracing::info!(
            valid = result.is_valid(),
            errors = result.errors().len(),
            warnings = result.warnings().len(),
            "entry verified"
        );
        Ok(result)
    }

    async fn run_step(
        &self,
        step: PipelineStep,
        entry: &Entry,
        state: &mut RunState,
        ctx: &mut StepContext<'_>,
        cancel: &CancellationToken,
    ) -> StepOutcome {
        match step {
            PipelineStep::Schema => self.schema_step(entry, ctx),
            PipelineStep::Canonicalization => canonicalization_step(entry, state, ctx),
            PipelineStep::Signatures => self.signature_step(entry, state, ctx, cancel).await,
            PipelineStep::Integrity => integrity_step(entry, state, ctx),
            PipelineStep::Storage => self.storage_step(entry, state, ctx, cancel).await,
            PipelineStep::Anchor => self.anchor_step(entry, state, ctx, cancel).await,
            PipelineStep::Encryption => encryption_step(entry, state, ctx),
            PipelineStep::Revision => self.revision_step(entry, ctx),
        }
    }

    fn schema_step(&self, entry: &Entry, ctx: &mut StepContext<'_>) -> StepOutcome {
        let report = self.validator.validate(entry, &ValidationContext::default());
        for issue in &report.errors {
            ctx.add_error(&issue.code, issue.message.as_str(), Some(issue.path.as_str()));
        }
        for issue in &report.warnings {
            ctx.add_warning(&issue.code, issue.message.as_str(), Some(issue.path.as_str()));
        }
        Ok(())
    }

    async fn signature_step(
        &self,
        entry: &Entry,
        state: &mut RunState,
        ctx: &mut StepContext<'_>,
        cancel: &CancellationToken,
    ) -> StepOutcome {
        let Some(payload) = state.payload.as_ref() else {
            ctx.skip(
                "verifier.signatures.skipped",
                "canonical payload unavailable; signature validation skipped",
            );
            return Ok(());
        };
        if entry.signatures.is_empty() {
            ctx.add_error(
                "verifier.signatures.missing",
                "no signature proofs were supplied on the entry",
                Some("signatures"),
            );
            return Ok(());
        }

        for (i, proof) in entry.signatures.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(StepInterrupt::Cancelled);
            }
            let kid = proof.protected_header.kid.as_deref().unwrap_or_default();
            let path = format!("signatures[{i}]");
            match cancellable(cancel, self.signing.verify(payload.as_bytes(), proof)).await? {
                Ok(true) => {
                    if !kid.trim().is_empty() {
                        state.valid_signers.insert(kid.trim().to_string());
                    }
                }
                Ok(false) => ctx.add_error(
                    "verifier.signatures.invalid",
                    format!("signature with kid '{kid}' failed verification"),
                    Some(path.as_str()),
                ),
                Err(e) => ctx.add_error(
                    "verifier.signatures.exception",
                    format!("signature verification failed: {e}"),
                    Some(path.as_str()),
                ),
            }
        }

        let valid = state.valid_signers.len();
        if valid == 0 {
            ctx.add_error(
                "verifier.signatures.none_valid",
                "no valid signatures were found on the entry",
                None,
            );
        } else {
            ctx.add_metadata("valid_signatures", valid.to_string());
        }

        let required = self.required_signatures(entry);
        if valid < required {
            ctx.add_error(
                "verifier.signatures.threshold",
                format!(
                    "valid signature count {valid} does not satisfy required threshold {required}"
                ),
                None,
            );
        }
        Ok(())
    }

    fn required_signatures(&self, entry: &Entry) -> usize {
        if !self.config.require_signature_threshold_from_policy {
            return 1;
        }
        entry
            .encryption
            .as_ref()
            .and_then(|e| e.threshold())
            .map_or(1, |t| t as usize)
    }

    async fn storage_step(
        &self,
        entry: &Entry,
        state: &RunState,
        ctx: &mut StepContext<'_>,
        cancel: &CancellationToken,
    ) -> StepOutcome {
        let storage = &entry.storage;
        let protocol = storage.protocol.trim().to_ascii_lowercase();
        let Some(adapter) = self.storage_adapters.get(&protocol) else {
            ctx.add_error(
                "verifier.storage.adapter_missing",
                format!("no storage adapter registered for protocol '{}'", storage.protocol),
                Some("storage.protocol"),
            );
            return Ok(());
        };
        let Some(resolver) = self.location_resolver.as_ref() else {
            ctx.add_error(
                "verifier.storage.location_resolver_missing",
                "storage location resolver has not been configured",
                None,
            );
            return Ok(());
        };

        let location = cancellable(cancel, resolver.resolve_location(entry)).await??;
        let Some(location) = location.filter(|l| !l.trim().is_empty()) else {
            ctx.add_error(
                "verifier.storage.location_missing",
                "storage location resolver did not provide a resource identifier",
                None,
            );
            return Ok(());
        };
        ctx.add_metadata("storage_location", location.as_str());

        let exists = match cancellable(cancel, adapter.exists(&location)).await? {
            Ok(exists) => exists,
            Err(e) => {
                ctx.add_error(
                    "verifier.storage.adapter_error",
                    format!("storage adapter reported an error: {e}"),
                    None,
                );
                return Ok(());
            }
        };
        if !exists {
            ctx.add_error(
                "verifier.storage.not_found",
                "declared storage resource could not be located at the provider",
                None,
            );
            return Ok(());
        }

        let reported = match cancellable(cancel, adapter.get_metadata(&location)).await? {
            Ok(metadata) => metadata,
            Err(e) => {
                ctx.add_error(
                    "verifier.storage.adapter_error",
                    format!("storage adapter reported an error: {e}"),
                    None,
                );
                return Ok(());
            }
        };

        if reported.integrity_proof != storage.integrity_proof {
            ctx.add_error(
                "verifier.storage.integrity_mismatch",
                "stored integrity proof does not match the entry",
                Some("storage.integrity_proof"),
            );
        }
        if !reported.media_type.eq_ignore_ascii_case(&storage.media_type) {
            ctx.add_error(
                "verifier.storage.media_type_mismatch",
                format!(
                    "stored media type '{}' differs from declared '{}'",
                    reported.media_type, storage.media_type
                ),
                Some("storage.media_type"),
            );
        }
        if reported.size_bytes != storage.size_bytes {
            ctx.add_error(
                "verifier.storage.size_mismatch",
                format!(
                    "stored size {} does not match declared size {}",
                    reported.size_bytes, storage.size_bytes
                ),
                Some("storage.size_bytes"),
            );
        }
        if let Some(declared) = state.integrity.as_ref() {
            let digest_matches = NiUri::try_parse(&reported.integrity_proof).is_ok_and(|r| {
                r.algorithm.eq_ignore_ascii_case(&declared.algorithm) && r.digest == declared.digest
            });
            if !digest_matches {
                ctx.add_error(
                    "verifier.storage.integrity_digest_mismatch",
                    "storage provider digest does not match the entry integrity proof",
                    Some("storage.integrity_proof"),
                );
            }
        }

        let declared = &storage.location;
        let actual = &reported.location;
        if !actual.region.eq_ignore_ascii_case(&declared.region)
            || !actual.jurisdiction.eq_ignore_ascii_case(&declared.jurisdiction)
            || actual.provider != declared.provider
        {
            ctx.add_warning(
                "verifier.storage.location_metadata_mismatch",
                "storage location metadata differs from declared values",
                Some("storage.location"),
            );
        }
        Ok(())
    }

    async fn anchor_step(
        &self,
        entry: &Entry,
        state: &RunState,
        ctx: &mut StepContext<'_>,
        cancel: &CancellationToken,
    ) -> StepOutcome {
        let anchor = &entry.anchor;
        if anchor.chain.trim().is_empty() && anchor.anchor_ref.trim().is_empty() {
            ctx.add_error(
                "verifier.anchor.missing",
                "anchor proof is required for verification",
                Some("anchor"),
            );
            return Ok(());
        }
        let Some(verifier) = self.anchor_verifier.as_ref() else {
            ctx.add_error(
                "verifier.anchor.service_missing",
                "no anchor verifier has been configured",
                None,
            );
            return Ok(());
        };
        if state.anchor_digest.is_none() {
            ctx.add_error(
                "verifier.anchor.hash_unavailable",
                "anchor digest could not be computed during canonicalization",
                Some("anchor.hash_alg"),
            );
            return Ok(());
        }
        let Some(network) = self.config.resolve_anchor_network(&anchor.chain) else {
            ctx.add_error(
                "verifier.anchor.network_unresolved",
                "unable to resolve anchor network for verification",
                Some("anchor.chain"),
            );
            return Ok(());
        };
        ctx.add_metadata("anchor_network", network.as_str());

        match cancellable(cancel, verifier.verify_anchor(anchor, entry, &network)).await? {
            Ok(true) => {}
            Ok(false) => ctx.add_error(
                "verifier.anchor.invalid",
                format!("anchor proof could not be verified on network '{network}'"),
                Some("anchor"),
            ),
            Err(e) => ctx.add_error(
                "verifier.anchor.exception",
                format!("anchor verification failed: {e}"),
                Some("anchor"),
            ),
        }
        Ok(())
    }

    fn revision_step(&self, entry: &Entry, ctx: &mut StepContext<'_>) -> StepOutcome {
        if entry.predecessor().is_none() {
            ctx.skip(
                "verifier.revision.not_applicable",
                "entry does not declare a previous revision",
            );
            return Ok(());
        }
        let Some(resolver) = self.entry_resolver.as_ref() else {
            ctx.add_warning(
                "verifier.revision.resolver_missing",
                "no entry resolver configured; revision chain not traversed",
                Some("previous_id"),
            );
            return Ok(());
        };

        let traversal =
            RevisionGraph::traverse(entry, resolver.as_ref(), self.config.max_revision_depth);
        for issue in &traversal.issues {
            let path = issue.entry_id.as_deref();
            match issue.severity {
                IssueSeverity::Error => {
                    ctx.add_error(issue.code.as_str(), issue.message.as_str(), path)
                }
                IssueSeverity::Warning => {
                    ctx.add_warning(issue.code.as_str(), issue.message.as_str(), path)
                }
            }
        }
        ctx.add_metadata("revision_depth", traversal.depth().to_string());
        Ok(())
    }

    /// Validate a certificate issued over `entry` as a one-step result.
    ///
    /// # Errors
    ///
    /// [`VerifyError::Configuration`] without a certificate validator,
    /// [`VerifyError::Cancelled`] on cancellation.
    pub async fn verify_certificate(
        &self,
        certificate: &CertificateDescriptor,
        entry: &Entry,
        cancel: &CancellationToken,
    ) -> Result<VerificationResult, VerifyError> {
        let validator = self.certificate_validator.as_ref().ok_or_else(|| {
            VerifyError::Configuration("certificate validator has not been configured".to_string())
        })?;

        let mut result = VerificationResult::default();
        let mut step_result = StepResult::new(CERTIFICATE_STEP);
        let outcome = if cancel.is_cancelled() {
            Err(StepInterrupt::Cancelled)
        } else {
            let mut ctx = StepContext::new(&mut step_result);
            contained(certificate_step(
                validator.as_ref(),
                certificate,
                entry,
                &mut ctx,
                cancel,
            ))
            .await
        };
        finish_step(&mut result, step_result, outcome)?;
        Ok(result)
    }

    /// Resolve `entry_id` and walk its revision history.
    pub fn traverse_revision_chain(
        &self,
        entry_id: &str,
    ) -> Result<RevisionTraversal, VerifyError> {
        let entry_id = entry_id.trim();
        if entry_id.is_empty() {
            return Err(VerifyError::InvalidArgument(
                "entry id must not be empty".to_string(),
            ));
        }
        let resolver = self.entry_resolver.as_ref().ok_or_else(|| {
            VerifyError::Configuration("entry resolver has not been configured".to_string())
        })?;
        let head = resolver
            .resolve(entry_id)
            .ok_or_else(|| VerifyError::EntryNotFound(entry_id.to_string()))?;
        Ok(RevisionGraph::traverse(
            &head,
            resolver.as_ref(),
            self.config.max_revision_depth,
        ))
    }
}

/// Apply a step outcome, finalize the step and append it to `result`.
fn finish_step(
    result: &mut VerificationResult,
    mut step: StepResult,
    outcome: StepOutcome,
) -> Result<(), VerifyError> {
    match outcome {
        Ok(()) => {}
        Err(StepInterrupt::Failed(reason)) => {
            let name = step.name.clone();
            StepContext::new(&mut step).add_error(
                "verifier.step.exception",
                format!("unhandled failure during '{name}': {reason}"),
                None,
            );
        }
        Err(StepInterrupt::Cancelled) => {
            let name = step.name.clone();
            StepContext::new(&mut step).skip(
                "verifier.step.cancelled",
                format!("verification step '{name}' was cancelled"),
            );
            tracing::info!(step = %name, "verification cancelled");
            result.push(step);
            return Err(VerifyError::Cancelled {
                step: name,
                result: Box::new(std::mem::take(result)),
            });
        }
    }

    step.finalize_status();
    tracing::debug!(
        step = %step.name,
        status = %step.status,
        messages = step.messages.len(),
        "step finished"
    );
    if step.status == StepStatus::Failed {
        tracing::warn!(step = %step.name, "verification step failed");
    }
    result.push(step);
    Ok(())
}

async fn certificate_step(
    validator: &dyn CertificateValidator,
    certificate: &CertificateDescriptor,
    entry: &Entry,
    ctx: &mut StepContext<'_>,
    cancel: &CancellationToken,
) -> StepOutcome {
    let validation =
        cancellable(cancel, validator.validate_certificate(certificate, entry)).await??;
    if !validation.success {
        for error in &validation.errors {
            ctx.add_error("verifier.certificate.error", error.as_str(), None);
        }
    }
    for warning in &validation.warnings {
        ctx.add_warning("verifier.certificate.warning", warning.as_str(), None);
    }
    Ok(())
}

fn canonicalization_step(
    entry: &Entry,
    state: &mut RunState,
    ctx: &mut StepContext<'_>,
) -> StepOutcome {
    let payload = match entry.canonical_payload() {
        Ok(payload) => payload,
        Err(e) => {
            ctx.add_error(
                "verifier.canonicalization.failed",
                format!("failed to canonicalize entry: {e}"),
                None,
            );
            return Ok(());
        }
    };
    ctx.add_metadata("payload_length", payload.len().to_string());

    match entry.anchor.hash_algorithm() {
        Some(algorithm) => {
            let digest = ContentDigest::of_canonical(algorithm, &payload);
            ctx.add_metadata("anchor_hash_alg", algorithm.as_str());
            ctx.add_metadata("anchor_hash", digest.to_hex());
            state.anchor_digest = Some(digest);
        }
        None => ctx.add_warning(
            "verifier.canonicalization.unsupported_anchor_hash",
            format!("unsupported anchor hash algorithm '{}'", entry.anchor.hash_alg),
            Some("anchor.hash_alg"),
        ),
    }
    state.payload = Some(payload);
    Ok(())
}

fn integrity_step(entry: &Entry, state: &mut RunState, ctx: &mut StepContext<'_>) -> StepOutcome {
    match NiUri::try_parse(&entry.storage.integrity_proof) {
        Ok(uri) => {
            ctx.add_metadata("integrity_algorithm", uri.algorithm.as_str());
            ctx.add_metadata("integrity_digest", hex::encode(&uri.digest));
            state.integrity = Some(uri);
        }
        Err(e) => ctx.add_error(
            "verifier.integrity.invalid_ni",
            format!("storage.integrity_proof is not a valid ni digest URI: {e}"),
            Some("storage.integrity_proof"),
        ),
    }
    Ok(())
}

fn encryption_step(entry: &Entry, state: &RunState, ctx: &mut StepContext<'_>) -> StepOutcome {
    let Some(encryption) = entry.encryption.as_ref() else {
        ctx.skip(
            "verifier.encryption.not_applicable",
            "entry is not encrypted; skipping encryption policy checks",
        );
        return Ok(());
    };
    ctx.add_metadata("key_ownership", encryption.key_ownership.as_str());

    let valid = &state.valid_signers;
    let uncontrolled: Vec<&str> = encryption
        .last_controlled_by
        .iter()
        .map(|id| id.trim())
        .filter(|id| !id.is_empty() && !valid.contains(*id))
        .collect();

    if encryption.is_multi_sig() {
        if let Some(threshold) = encryption.threshold() {
            if threshold as usize > valid.len() {
                ctx.add_error(
                    "verifier.encryption.threshold_mismatch",
                    format!(
                        "encryption policy threshold {threshold} exceeds valid signer count {}",
                        valid.len()
                    ),
                    Some("encryption.policy.threshold"),
                );
            }
        }
        if !uncontrolled.is_empty() {
            ctx.add_error(
                "verifier.encryption.control_mismatch",
                format!(
                    "last_controlled_by keys lack corresponding valid signatures: {}",
                    uncontrolled.join(", ")
                ),
                Some("encryption.last_controlled_by"),
            );
        }
    } else if !uncontrolled.is_empty() {
        ctx.add_warning(
            "verifier.encryption.control_mismatch",
            format!(
                "last_controlled_by keys were not observed in valid signatures: {}",
                uncontrolled.join(", ")
            ),
            Some("encryption.last_controlled_by"),
        );
    }

    if let Some(public_keys) = encryption.public_keys.as_ref().filter(|k| !k.is_empty()) {
        let unmatched: Vec<&str> = valid
            .iter()
            .map(String::as_str)
            .filter(|kid| !public_keys.iter().any(|k| k.trim() == *kid))
            .collect();
        if !unmatched.is_empty() {
            ctx.add_warning(
                "verifier.encryption.unmatched_keys",
                format!(
                    "valid signers are not among the declared public keys: {}",
                    unmatched.join(", ")
                ),
                Some("encryption.public_keys"),
            );
        }
    }
    Ok(())
}

// ─── Builder ─────────────────────────────────────────────────────────────

/// Configures a [`Verifier`].
pub struct VerifierBuilder {
    verifier: Verifier,
}

impl VerifierBuilder {
    pub fn config(mut self, config: VerifierConfig) -> Self {
        self.verifier.config = config;
        self
    }

    /// Register the adapter for a storage protocol. Protocols match
    /// case-insensitively.
    pub fn storage_adapter(
        mut self,
        protocol: impl AsRef<str>,
        adapter: Arc<dyn StorageAdapter>,
    ) -> Self {
        self.verifier
            .storage_adapters
            .insert(protocol.as_ref().trim().to_ascii_lowercase(), adapter);
        self
    }

    pub fn location_resolver(mut self, resolver: Arc<dyn StorageLocationResolver>) -> Self {
        self.verifier.location_resolver = Some(resolver);
        self
    }

    pub fn anchor_verifier(mut self, verifier: Arc<dyn AnchorVerifier>) -> Self {
        self.verifier.anchor_verifier = Some(verifier);
        self
    }

    pub fn certificate_validator(mut self, validator: Arc<dyn CertificateValidator>) -> Self {
        self.verifier.certificate_validator = Some(validator);
        self
    }

    pub fn entry_resolver(mut self, resolver: Arc<dyn EntryResolver>) -> Self {
        self.verifier.entry_resolver = Some(resolver);
        self
    }

    pub fn build(self) -> Verifier {
        self.verifier
    }
}
