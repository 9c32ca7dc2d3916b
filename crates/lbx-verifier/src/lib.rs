//! # lbx-verifier: Entry Verification Pipeline
//!
//! Composes the canonicalizer, digest URI codec, signing service and
//! revision graph into an ordered, partial-failure-tolerant audit of one
//! [`Entry`](lbx_core::Entry).
//!
//! ## Usage
//!
//! ```ignore
//! let verifier = Verifier::builder(signing)
//!     .storage_adapter("ipfs", Arc::new(ipfs))
//!     .location_resolver(Arc::new(|e: &Entry| Some(cid_of(e))))
//!     .anchor_verifier(Arc::new(stellar))
//!     .build();
//! let result = verifier.verify(&entry, &CancellationToken::new()).await?;
//! for message in result.errors() {
//!     eprintln!("{message}");
//! }
//! ```
//!
//! ## Crate Policy
//!
//! - Collaborators are injected as trait objects; nothing here reaches a
//!   network or filesystem on its own.
//! - Cancellation is the only condition that aborts a run.

pub mod collaborators;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod result;

pub use collaborators::{
    AnchorVerifier, CertificateDescriptor, CertificateValidation, CertificateValidator,
    InMemoryStorageAdapter, StaticAnchorVerifier, StorageAdapter, StorageLocationResolver,
    StorageMetadata,
};
pub use config::VerifierConfig;
pub use error::{CollaboratorError, ConfigError, VerifyError};
pub use pipeline::{PipelineStep, Verifier, VerifierBuilder, CERTIFICATE_STEP};
pub use result::{
    MessageSeverity, StepContext, StepResult, StepStatus, VerificationMessage, VerificationResult,
};
pub use tokio_util::sync::CancellationToken;
