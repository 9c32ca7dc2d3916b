//! # lbx-cli: Lockbox Command-Line Interface
//!
//! Provides the `lbx` binary.
//!
//! ## Subcommands
//!
//! - `lbx create`: build an entry from flags, validate it, optionally sign
//!   it, and print its canonical JSON and hash.
//! - `lbx validate`: structural and semantic validation of an entry file.
//! - `lbx keygen`: generate an EdDSA, ES256K or RS256 key file.
//!
//! ```bash
//! lbx keygen --algorithm EdDSA --key-id acme-1 --output acme-1.json
//! lbx create --content report.pdf --media-type application/pdf ... --key acme-1.json
//! lbx validate entry.json --network stellar:testnet
//! ```
//!
//! ## Crate Policy
//!
//! - Argument parsing is separated from business logic; handlers delegate
//!   to the domain crates.
//! - Handlers return `anyhow::Result<u8>`: `Ok(EXIT_OK)` or
//!   `Ok(EXIT_INVALID)` for a completed run, `Err` for usage and I/O
//!   failures, which the binary maps to [`EXIT_FAILURE`].

pub mod create;
pub mod keygen;
pub mod validate;

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use lbx_core::ValidationIssue;
use lbx_verifier::VerifierConfig;

/// The command completed and the entry is valid.
pub const EXIT_OK: u8 = 0;
/// The command completed and validation reported errors.
pub const EXIT_INVALID: u8 = 1;
/// Usage, configuration or I/O failure.
pub const EXIT_FAILURE: u8 = 2;

/// Load the `--config` file, or defaults when none was given.
pub fn load_config(path: Option<&Path>) -> Result<VerifierConfig> {
    match path {
        Some(path) => VerifierConfig::from_path(path)
            .with_context(|| format!("loading configuration: {}", path.display())),
        None => Ok(VerifierConfig::default()),
    }
}

/// Print one `[code] message (path)` line per issue, errors first.
///
/// Errors are prefixed `error:` and warnings `warning:`.
pub fn report_issues(
    out: &mut impl Write,
    errors: &[ValidationIssue],
    warnings: &[ValidationIssue],
) -> std::io::Result<()> {
    for issue in errors {
        writeln!(out, "error: {issue}")?;
    }
    for issue in warnings {
        writeln!(out, "warning: {issue}")?;
    }
    Ok(())
}

/// Print the canonical payload and its SHA-256 hash.
pub fn report_canonical(out: &mut impl Write, entry: &lbx_core::Entry) -> Result<()> {
    let payload = entry
        .canonical_payload()
        .context("canonicalizing entry")?;
    let hash = lbx_core::sha256_digest(&payload);
    writeln!(out, "canonical: {}", payload.as_str())?;
    writeln!(out, "hash: {}", hash.to_hex())?;
    Ok(())
}
