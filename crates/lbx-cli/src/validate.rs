//! # Validate Subcommand
//!
//! Checks an entry file in four passes: structural schema validation of the
//! raw document, typed parse, semantic validation, and canonicalization.
//! Every issue is printed as `[code] message (path)`; the hash is printed
//! only for a valid entry.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use lbx_core::{Entry, EntryValidator, ValidationContext, ValidationIssue};
use lbx_schema::EntrySchema;
use lbx_verifier::VerifierConfig;
use serde_json::Value;

use crate::{report_canonical, report_issues, EXIT_INVALID, EXIT_OK};

/// Code for documents that are not JSON or do not parse into an entry.
pub const PARSE_ERROR: &str = "core.validation.parse_error";

/// Arguments for the validate subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Entry JSON file.
    pub file: PathBuf,

    /// Expected anchor chain identifier, e.g. `stellar:testnet`.
    /// Defaults to `default_anchor_network` from the config file.
    #[arg(long)]
    pub network: Option<String>,

    /// Accept entries without signatures.
    #[arg(long)]
    pub allow_unsigned: bool,
}

/// Execute the validate subcommand.
pub fn run_validate(
    args: &ValidateArgs,
    config: &VerifierConfig,
    out: &mut impl Write,
) -> Result<u8> {
    let raw = std::fs::read_to_string(&args.file)
        .with_context(|| format!("reading entry: {}", args.file.display()))?;

    let document: Value = match serde_json::from_str(&raw) {
        Ok(document) => document,
        Err(e) => {
            let issue =
                ValidationIssue::new(PARSE_ERROR, format!("entry is not valid JSON: {e}"), "");
            report_issues(out, &[issue], &[])?;
            return Ok(EXIT_INVALID);
        }
    };

    let schema = EntrySchema::new()?;
    let mut errors: Vec<ValidationIssue> = schema
        .validate(&document)
        .iter()
        .map(|violation| violation.to_issue())
        .collect();
    let mut warnings = Vec::new();

    let entry = match serde_json::from_value::<Entry>(document) {
        Ok(entry) => Some(entry),
        Err(e) => {
            errors.push(ValidationIssue::new(
                PARSE_ERROR,
                format!("entry could not be parsed: {e}"),
                "",
            ));
            None
        }
    };

    if let Some(entry) = &entry {
        let context = ValidationContext {
            network: args
                .network
                .clone()
                .or_else(|| config.default_anchor_network.clone()),
            require_signatures: !args.allow_unsigned,
        };
        let report = EntryValidator::new().validate(entry, &context);
        errors.extend(report.errors);
        warnings.extend(report.warnings);
    }

    tracing::info!(
        file = %args.file.display(),
        errors = errors.len(),
        warnings = warnings.len(),
        "entry validated"
    );
    report_issues(out, &errors, &warnings)?;

    match entry {
        Some(entry) if errors.is_empty() => {
            report_canonical(out, &entry)?;
            writeln!(out, "valid: {}", entry.id)?;
            Ok(EXIT_OK)
        }
        _ => Ok(EXIT_INVALID),
    }
}
